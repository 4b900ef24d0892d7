use super::*;

/// How a failure is recovered from. Transport and handshake failures are retried with backoff,
/// protocol and field-decode failures drop the offending message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    #[display("transport")]
    Transport,
    #[display("protocol")]
    Protocol,
    #[display("handshake")]
    Handshake,
    #[display("field decode")]
    FieldDecode,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MinerError {
    #[snafu(display("failed to connect to {endpoint}: {source}"))]
    Connect { endpoint: String, source: io::Error },

    #[snafu(display("timed out connecting to {endpoint}"))]
    ConnectTimeout { endpoint: String },

    #[snafu(display("pool link busy for {}ms", timeout.as_millis()))]
    LinkBusy { timeout: Duration },

    #[snafu(display("not connected to pool"))]
    NotConnected,

    #[snafu(display("reconnect backoff, next attempt in {}s", remaining.as_secs()))]
    Backoff { remaining: Duration },

    #[snafu(display("pool closed the connection"))]
    Closed,

    #[snafu(display("failed to read from pool: {source}"))]
    Read { source: LinesCodecError },

    #[snafu(display("failed to write to pool: {source}"))]
    Write { source: LinesCodecError },

    #[snafu(display("timed out writing to pool"))]
    SendTimeout,

    #[snafu(display("{message}"))]
    Protocol { message: String },

    #[snafu(display("failed to serialize message: {source}"))]
    Serialize { source: serde_json::Error },

    #[snafu(display("subscribe failed: {reason}"))]
    SubscribeFailed { reason: String },

    #[snafu(display("authorization failed: {reason}"))]
    AuthorizationFailed { reason: String },

    #[snafu(display("timed out waiting for {method} response"))]
    ResponseTimeout { method: String },

    #[snafu(display("malformed {field}: {source}"))]
    MalformedField {
        field: &'static str,
        source: stratum::InternalError,
    },

    #[snafu(display("no active job"))]
    IncompleteJob,
}

impl MinerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect { .. }
            | Self::ConnectTimeout { .. }
            | Self::LinkBusy { .. }
            | Self::NotConnected
            | Self::Backoff { .. }
            | Self::Closed
            | Self::Read { .. }
            | Self::Write { .. }
            | Self::SendTimeout => ErrorKind::Transport,
            Self::Protocol { .. } | Self::Serialize { .. } => ErrorKind::Protocol,
            Self::SubscribeFailed { .. }
            | Self::AuthorizationFailed { .. }
            | Self::ResponseTimeout { .. } => ErrorKind::Handshake,
            Self::MalformedField { .. } | Self::IncompleteJob => ErrorKind::FieldDecode,
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }
}
