use {super::*, primitive_types::U256};

static DIFFICULTY_1_TARGET: LazyLock<U256> =
    LazyLock::new(|| U256::from_big_endian(&Target::MAX.to_be_bytes()));

/// Difficulty scaled by 2^32 so fractional pool difficulties survive the integer division.
const SCALE: f64 = 4_294_967_296.0;

/// Pool-assigned share difficulty. A difficulty of 1 corresponds to the genesis target
/// `0x00000000ffff0000…`; the share target is that value divided by the difficulty, computed
/// in 256-bit integer arithmetic so a higher difficulty never yields a larger target.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Difficulty(f64);

impl Difficulty {
    pub const ONE: Self = Self(1.0);

    pub fn new(difficulty: f64) -> Result<Self> {
        if !difficulty.is_finite() || difficulty <= 0.0 {
            return Err(InternalError::InvalidValue {
                reason: format!("difficulty must be finite and > 0, got {difficulty}"),
            });
        }

        Ok(Self(difficulty))
    }

    pub fn as_f64(self) -> f64 {
        self.0
    }

    pub fn to_target(self) -> Target {
        let scaled = (self.0 * SCALE).floor();

        let target = if scaled < 1.0 {
            U256::MAX
        } else {
            // Float to int casts saturate, so absurd difficulties clamp instead of wrapping.
            *DIFFICULTY_1_TARGET * U256::from(1u64 << 32) / U256::from(scaled as u128)
        };

        Target::from_be_bytes(target.to_big_endian())
    }

    /// Whether `hash` satisfies the share target at this difficulty.
    pub fn is_met_by(self, hash: BlockHash) -> bool {
        self.to_target().is_met_by(hash)
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<f64> for Difficulty {
    type Error = InternalError;

    fn try_from(difficulty: f64) -> Result<Self> {
        Self::new(difficulty)
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 && self.0 <= u64::MAX as f64 {
            ser.serialize_u64(self.0 as u64)
        } else {
            ser.serialize_f64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Int(u64),
            Float(f64),
        }

        let difficulty = match Wire::deserialize(de)? {
            Wire::Int(u) => u as f64,
            Wire::Float(x) => x,
        };

        Self::new(difficulty).map_err(de::Error::custom)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let d = self.0;

        if d >= 1.0 && d.fract() == 0.0 {
            write!(f, "{}", d as u64)
        } else if let Some(p) = f.precision() {
            write!(f, "{:.*}", p, d)
        } else {
            let s = format!("{:.8}", d);
            let s = s.trim_end_matches('0').trim_end_matches('.');
            f.write_str(s)
        }
    }
}
