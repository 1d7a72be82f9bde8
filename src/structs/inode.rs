use std::fmt::Display;

use super::*;

impl TryFrom<u16> for InodeType {
    type Error = u16;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Unused),
            1 => Ok(Self::Directory),
            2 => Ok(Self::File),
            3 => Ok(Self::Device),
            other => Err(other),
        }
    }
}

impl Display for InodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unused => write!(f, "unused"),
            Self::Directory => write!(f, "directory"),
            Self::File => write!(f, "file"),
            Self::Device => write!(f, "device"),
        }
    }
}

impl Inode {
    pub fn new(r#type: InodeType) -> Self {
        Self {
            r#type: r#type as u16,
            nlink: 1,
            ..Default::default()
        }
    }

    /// Decoded type, or the raw value if it is none of the known ones
    pub fn kind(&self) -> Result<InodeType, u16> {
        InodeType::try_from(self.r#type)
    }

    pub fn direct(&self) -> &[u32] {
        &self.addrs[..NDIRECT]
    }

    pub fn indirect(&self) -> u32 {
        self.addrs[NDIRECT]
    }
}

impl OnDisk for Inode {
    fn swap_le(self) -> Self {
        Self {
            r#type: u16::from_le(self.r#type),
            major: u16::from_le(self.major),
            minor: u16::from_le(self.minor),
            nlink: u16::from_le(self.nlink),
            size: u32::from_le(self.size),
            addrs: self.addrs.map(u32::from_le),
        }
    }
}

impl Display for Inode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind() {
            Ok(kind) => writeln!(f, "type:     {kind}")?,
            Err(raw) => writeln!(f, "type:     invalid ({raw})")?,
        }
        writeln!(f, "device:   {}:{}", self.major, self.minor)?;
        writeln!(f, "nlink:    {}", self.nlink)?;
        writeln!(f, "size:     {}", self.size)?;
        writeln!(f, "direct:   {:?}", self.direct())?;
        write!(f, "indirect: {}", self.indirect())
    }
}
