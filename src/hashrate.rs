use super::*;

const SI_PREFIXES: &[(&str, f64)] = &[
    ("", 1.0),
    ("K", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
];

/// Hashes per second.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct HashRate(pub f64);

impl HashRate {
    pub const ZERO: Self = Self(0.0);

    pub fn measure(hashes: u64, elapsed: Duration) -> Self {
        if elapsed.is_zero() {
            return Self::ZERO;
        }

        Self(hashes as f64 / elapsed.as_secs_f64())
    }
}

impl fmt::Display for HashRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0 == 0.0 {
            return write!(f, "0 H/s");
        }

        let (prefix, divisor) = SI_PREFIXES
            .iter()
            .rev()
            .find(|(_, divisor)| self.0.abs() >= *divisor)
            .unwrap_or(&SI_PREFIXES[0]);

        let scaled = format!("{:.2}", self.0 / divisor);
        let scaled = scaled.trim_end_matches('0').trim_end_matches('.');

        write!(f, "{scaled} {prefix}H/s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        #[track_caller]
        fn case(value: f64, expected: &str) {
            assert_eq!(HashRate(value).to_string(), expected);
        }

        case(0.0, "0 H/s");
        case(512.0, "512 H/s");
        case(1e3, "1 KH/s");
        case(61_440.0, "61.44 KH/s");
        case(1.5e6, "1.5 MH/s");
        case(123.456e9, "123.46 GH/s");
        case(2e15, "2 PH/s");
    }

    #[test]
    fn measure() {
        assert_eq!(
            HashRate::measure(1_000_000, Duration::from_secs(4)),
            HashRate(250_000.0)
        );
        assert_eq!(HashRate::measure(10, Duration::ZERO), HashRate::ZERO);
    }
}
