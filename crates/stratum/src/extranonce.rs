use super::*;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct Extranonce(Vec<u8>);

impl Extranonce {
    /// Big-endian encoding of `counter` in exactly `size` bytes. Wider sizes are zero padded on
    /// the left, narrower ones keep the low-order bytes.
    pub fn from_counter(counter: u64, size: usize) -> Self {
        let be = counter.to_be_bytes();
        let mut bytes = vec![0u8; size];

        let take = size.min(be.len());
        bytes[size - take..].copy_from_slice(&be[be.len() - take..]);

        Self(bytes)
    }

    /// Extranonce2 for `worker` of `workers` on its `roll`-th pass over the nonce space. Distinct
    /// workers never share a value within the same roll.
    pub fn for_worker(worker: usize, workers: usize, roll: u64, size: usize) -> Self {
        let counter = roll
            .wrapping_mul(workers as u64)
            .wrapping_add(worker as u64);

        Self::from_counter(counter, size)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex_codec::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(hex_codec::decode(s)?))
    }
}

impl Serialize for Extranonce {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Extranonce {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        let s = String::deserialize(de)?;
        Self::from_hex(&s).map_err(de::Error::custom)
    }
}

impl fmt::Display for Extranonce {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Extranonce {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_rejects_odd_length_hex() {
        assert!(
            "abc"
                .parse::<Extranonce>()
                .unwrap_err()
                .to_string()
                .contains("Odd number of digits")
        );
    }

    #[test]
    fn deserialize_rejects_non_hex() {
        assert!(
            "zz".parse::<Extranonce>()
                .unwrap_err()
                .to_string()
                .contains("Invalid character")
        );
    }

    #[test]
    fn valid_hex_roundtrip() {
        let extranonce: Extranonce = serde_json::from_str(r#""ABCD""#).unwrap();
        assert_eq!(extranonce.len(), 2);
        assert_eq!(extranonce.to_hex(), "abcd");
        assert_eq!(serde_json::to_string(&extranonce).unwrap(), r#""abcd""#);
    }

    #[test]
    fn counter_encoding() {
        assert_eq!(Extranonce::from_counter(1, 4).to_hex(), "00000001");
        assert_eq!(Extranonce::from_counter(0x0102, 2).to_hex(), "0102");
        assert_eq!(Extranonce::from_counter(0x010203, 2).to_hex(), "0203");
        assert_eq!(
            Extranonce::from_counter(u64::MAX, 10).to_hex(),
            "0000ffffffffffffffff"
        );
        assert!(Extranonce::from_counter(7, 0).is_empty());
    }

    #[test]
    fn worker_extranonces_are_distinct() {
        let mut seen = std::collections::HashSet::new();

        for roll in 0..4 {
            for worker in 0..3 {
                assert!(seen.insert(Extranonce::for_worker(worker, 3, roll, 4)));
            }
        }

        assert_eq!(Extranonce::for_worker(2, 3, 1, 4).to_hex(), "00000005");
    }
}
