use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct Version(pub block::Version);

impl Version {
    /// Little-endian bytes as they appear in the block header.
    pub fn to_header_bytes(self) -> [u8; 4] {
        self.0.to_consensus().to_le_bytes()
    }
}

impl FromStr for Version {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The as conversion matches Bitcoin's behaviour
        parse_word(s).map(|n| Self(block::Version::from_consensus(n as i32)))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0.to_consensus())
    }
}

impl From<block::Version> for Version {
    fn from(v: block::Version) -> Self {
        Self(v)
    }
}

impl From<Version> for block::Version {
    fn from(v: Version) -> Self {
        v.0
    }
}
