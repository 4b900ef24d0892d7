//! Conversions between hex strings and bytes. Decoding accepts either case;
//! encoding is always lowercase.

use super::*;

pub fn decode(s: &str) -> Result<Vec<u8>> {
    hex::decode(s).context(error::MalformedHexSnafu)
}

pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    hex::encode(bytes)
}

/// Decodes a field that must be exactly `N` bytes long.
pub fn decode_array<const N: usize>(s: &str) -> Result<[u8; N]> {
    let bytes = decode(s)?;
    let actual = bytes.len();

    bytes
        .try_into()
        .map_err(|_| InternalError::InvalidLength {
            expected: N,
            actual,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_bytes() {
        let all: Vec<u8> = (0..=255).collect();
        assert_eq!(decode(&encode(&all)).unwrap(), all);
        assert_eq!(decode(&encode(Vec::<u8>::new())).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn encode_is_lowercase_and_even() {
        let encoded = encode([0xdeu8, 0xad, 0xBE, 0xef, 0x00]);
        assert_eq!(encoded, "deadbeef00");
        assert_eq!(encoded.len(), 10);
    }

    #[test]
    fn mixed_case_normalizes_to_lowercase() {
        for s in ["DEADBEEF", "DeAdBeEf", "0aF1", "ffFF00"] {
            assert_eq!(encode(decode(s).unwrap()), s.to_lowercase());
        }
    }

    #[test]
    fn odd_length_is_malformed() {
        let err = decode("abc").unwrap_err();
        assert!(matches!(err, InternalError::MalformedHex { .. }), "{err}");
        assert!(err.to_string().contains("Odd number of digits"), "{err}");
    }

    #[test]
    fn non_hex_character_is_malformed() {
        let err = decode("zz").unwrap_err();
        assert!(matches!(err, InternalError::MalformedHex { .. }), "{err}");
        assert!(err.to_string().contains("Invalid character"), "{err}");

        assert!(decode("0x00").is_err());
        assert!(decode("12 4").is_err());
    }

    #[test]
    fn fixed_length_fields() {
        assert_eq!(decode_array::<4>("0000ffff").unwrap(), [0, 0, 0xff, 0xff]);

        match decode_array::<4>("00ff").unwrap_err() {
            InternalError::InvalidLength { expected, actual } => {
                assert_eq!(expected, 4);
                assert_eq!(actual, 2);
            }
            err => panic!("unexpected error: {err}"),
        }

        assert!(matches!(
            decode_array::<4>("0000fffg").unwrap_err(),
            InternalError::MalformedHex { .. }
        ));
    }
}
