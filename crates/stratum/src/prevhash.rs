use super::*;

/// Stratum sends the previous block hash as eight 32-bit words, each with its bytes swapped
/// relative to the header. Stored here in header (internal) byte order.
#[derive(Debug, PartialEq, Eq, Clone, Copy, DeserializeFromStr, SerializeDisplay)]
pub struct PrevHash(BlockHash);

impl PrevHash {
    /// The 32 bytes exactly as they are laid out in the block header.
    pub fn to_header_bytes(self) -> [u8; 32] {
        self.0.to_byte_array()
    }
}

impl FromStr for PrevHash {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex_codec::decode_array::<32>(s)?;

        let mut reordered = [0u8; 32];
        for (src, dst) in bytes.chunks_exact(4).zip(reordered.chunks_exact_mut(4)) {
            let word = BigEndian::read_u32(src);
            LittleEndian::write_u32(dst, word);
        }

        Ok(PrevHash(BlockHash::from_byte_array(reordered)))
    }
}

impl fmt::Display for PrevHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut swapped = [0u8; 32];
        for (src, dst) in self
            .0
            .as_byte_array()
            .chunks_exact(4)
            .zip(swapped.chunks_exact_mut(4))
        {
            let word = LittleEndian::read_u32(src);
            BigEndian::write_u32(dst, word);
        }

        f.write_str(&hex_codec::encode(swapped))
    }
}

impl From<BlockHash> for PrevHash {
    fn from(blockhash: BlockHash) -> Self {
        PrevHash(blockhash)
    }
}

impl From<PrevHash> for BlockHash {
    fn from(prevhash: PrevHash) -> Self {
        prevhash.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn case(prevhash_str: &str, blockhash_str: &str) {
        let prevhash = prevhash_str.parse::<PrevHash>().unwrap();
        assert_eq!(prevhash.to_string(), prevhash_str);

        let blockhash = BlockHash::from_str(blockhash_str).unwrap();
        assert_eq!(BlockHash::from(prevhash), blockhash);
        assert_eq!(prevhash, PrevHash::from(blockhash));

        let serialized = serde_json::to_string(&prevhash).unwrap();
        assert_eq!(serialized, format!("\"{}\"", prevhash_str));

        let round_trip = serde_json::from_str::<PrevHash>(&serialized).unwrap();
        assert_eq!(round_trip, prevhash);
    }

    #[test]
    fn roundtrip_prevhash() {
        case(
            "4d16b6f85af6e2198f44ae2a6de67f78487ae5611b77c6c0440b921e00000000",
            "00000000440b921e1b77c6c0487ae5616de67f788f44ae2a5af6e2194d16b6f8",
        );
    }

    #[test]
    fn roundtrip_another_prevhash() {
        case(
            "899cec175f2a0d2d6c05769137d3c09a536ae9a368bdbc7309efa16c0000030e",
            "0000030e09efa16c68bdbc73536ae9a337d3c09a6c0576915f2a0d2d899cec17",
        );
    }

    #[test]
    fn header_bytes_swap_each_word() {
        let prevhash = "4d16b6f85af6e2198f44ae2a6de67f78487ae5611b77c6c0440b921e00000000"
            .parse::<PrevHash>()
            .unwrap();

        assert_eq!(
            hex_codec::encode(prevhash.to_header_bytes()),
            "f8b6164d19e2f65a2aae448f787fe66d61e57a48c0c6771b1e920b4400000000"
        );
    }

    #[test]
    fn wrong_length_is_rejected() {
        assert!(matches!(
            "4d16b6f8".parse::<PrevHash>().unwrap_err(),
            InternalError::InvalidLength {
                expected: 32,
                actual: 4
            }
        ));
    }
}
