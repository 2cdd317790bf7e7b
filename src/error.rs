use std::fmt;

#[derive(Debug)]
pub enum ScoutError {
    /// Base IP or subnet mask unparseable, or mask bits non-contiguous.
    /// Fatal at boot.
    InvalidNetworkConfig(String),
    /// Trust-all TLS context could not be constructed. Fatal at boot.
    TlsInit(String),
    /// Identification probe timed out (connect or read deadline).
    ProbeTimeout,
    /// Identification endpoint answered with a non-200 status.
    ProbeStatus(u16),
    /// Response body was not a well-formed RIMP document.
    ProbeBadBody(String),
    /// ICMP reachability check failed or timed out.
    Unreachable,
    /// Controller snapshot could not be built from the XML endpoint.
    Snapshot(String),
    /// Authenticated session handshake was rejected.
    AuthHandshake(String),
    /// Key/value store operation failed.
    Store(String),
    /// Message could not be published to the broker.
    QueuePublish(String),
}

impl fmt::Display for ScoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoutError::InvalidNetworkConfig(msg) => {
                write!(f, "invalid network config: {}", msg)
            }
            ScoutError::TlsInit(msg) => write!(f, "tls init error: {}", msg),
            ScoutError::ProbeTimeout => write!(f, "probe timed out"),
            ScoutError::ProbeStatus(code) => write!(f, "probe got status {}", code),
            ScoutError::ProbeBadBody(msg) => write!(f, "probe body invalid: {}", msg),
            ScoutError::Unreachable => write!(f, "host unreachable"),
            ScoutError::Snapshot(msg) => write!(f, "snapshot build failed: {}", msg),
            ScoutError::AuthHandshake(msg) => write!(f, "auth handshake failed: {}", msg),
            ScoutError::Store(msg) => write!(f, "store error: {}", msg),
            ScoutError::QueuePublish(msg) => write!(f, "queue publish error: {}", msg),
        }
    }
}

impl std::error::Error for ScoutError {}
