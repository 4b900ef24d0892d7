use super::*;

pub type Result<T = (), E = InternalError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum InternalError {
    #[snafu(display("malformed hex: {source}"))]
    MalformedHex { source: hex::FromHexError },

    #[snafu(display("expected {expected} bytes, got {actual}"))]
    InvalidLength { expected: usize, actual: usize },

    #[snafu(display("{message}"))]
    Parse { message: String },

    #[snafu(display("invalid value: {reason}"))]
    InvalidValue { reason: String },
}

#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct JsonRpcError {
    pub error_code: i32,
    pub message: String,
    pub traceback: Option<Value>,
}

impl Serialize for JsonRpcError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (&self.error_code, &self.message, &self.traceback).serialize(serializer)
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.traceback {
            Some(traceback) => write!(
                f,
                "Stratum error {}: {} (traceback: {})",
                self.error_code,
                self.message,
                serde_json::to_string(traceback).unwrap_or_else(|_| "<invalid traceback>".into())
            ),
            None => write!(f, "Stratum error {}: {}", self.error_code, self.message),
        }
    }
}
