use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct Nbits(CompactTarget);

impl Nbits {
    pub fn to_compact(self) -> CompactTarget {
        self.0
    }

    /// The full network target this compact encoding expands to.
    pub fn network_target(self) -> Target {
        Target::from_compact(self.0)
    }
}

impl FromStr for Nbits {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_word(s).map(|bits| Nbits(CompactTarget::from_consensus(bits)))
    }
}

impl fmt::Display for Nbits {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0.to_consensus())
    }
}

impl From<Nbits> for CompactTarget {
    fn from(n: Nbits) -> CompactTarget {
        n.0
    }
}

impl From<CompactTarget> for Nbits {
    fn from(n: CompactTarget) -> Nbits {
        Nbits(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_bits_expand_to_difficulty_1_target() {
        let nbits = "1d00ffff".parse::<Nbits>().unwrap();
        assert_eq!(nbits.to_string(), "1d00ffff");
        assert_eq!(nbits.network_target(), Target::MAX);
    }

    #[test]
    fn network_target_bytes() {
        let nbits = "1c2ac4af".parse::<Nbits>().unwrap();
        let be = nbits.network_target().to_be_bytes();
        assert_eq!(&be[..7], &[0, 0, 0, 0, 0x2a, 0xc4, 0xaf]);
        assert!(be[7..].iter().all(|b| *b == 0));
    }

    #[test]
    fn serde_as_hex_string() {
        let nbits: Nbits = serde_json::from_str(r#""1c2ac4af""#).unwrap();
        assert_eq!(serde_json::to_string(&nbits).unwrap(), r#""1c2ac4af""#);
        assert!(serde_json::from_str::<Nbits>(r#""1c2ac4""#).is_err());
    }
}
