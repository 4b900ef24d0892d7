use super::*;

/// A Merkle branch sibling, hex as transmitted. The bytes are already in the order the fold
/// consumes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct MerkleNode([u8; 32]);

impl MerkleNode {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl FromStr for MerkleNode {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        hex_codec::decode_array::<32>(s).map(MerkleNode)
    }
}

impl fmt::Display for MerkleNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&hex_codec::encode(self.0))
    }
}

impl From<[u8; 32]> for MerkleNode {
    fn from(bytes: [u8; 32]) -> Self {
        MerkleNode(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_keeps_transmitted_order() {
        let hex = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f";
        let node = hex.parse::<MerkleNode>().unwrap();
        assert_eq!(node.as_bytes()[0], 0x00);
        assert_eq!(node.as_bytes()[31], 0x1f);
        assert_eq!(node.to_string(), hex);
    }

    #[test]
    fn short_node_is_rejected() {
        assert!("0001".parse::<MerkleNode>().is_err());
        assert!(serde_json::from_str::<Vec<MerkleNode>>(r#"["00"]"#).is_err());
    }
}
