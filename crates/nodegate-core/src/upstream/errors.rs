use std::{borrow::Cow, io};
use thiserror::Error;

/// Raw failure reported by the upstream adapter, before classification.
///
/// Every variant exposes a machine-readable [`code`](Self::code). Transport failures carry
/// errno-style codes (`ECONNRESET`, `EHOSTUNREACH`, ...) derived from the underlying I/O error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum UpstreamError {
    /// Network-level failure reaching or talking to the node.
    #[error("Transport failure ({code}): {detail}")]
    Transport { code: Cow<'static, str>, detail: String },

    /// The call exceeded the client timeout.
    #[error("Request timeout")]
    Timeout,

    /// Non-2xx HTTP response without a JSON-RPC error body.
    ///
    /// First field is the HTTP status code, second is the (truncated) body.
    #[error("HTTP error {0}: {1}")]
    HttpError(u16, String),

    /// JSON-RPC error object returned by the node.
    ///
    /// First field is the RPC error code, second is the node's message.
    #[error("RPC error {0}: {1}")]
    RpcError(i32, String),

    /// Response could not be parsed as a JSON-RPC reply.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// No active session to forward the call to.
    #[error("Not connected")]
    NotConnected,
}

impl UpstreamError {
    /// Builds a transport error from an I/O error, deriving the errno-style code.
    #[must_use]
    pub fn from_io(error: &io::Error) -> Self {
        Self::Transport { code: Cow::Borrowed(errno_code(error.kind())), detail: error.to_string() }
    }

    /// Machine-readable code identifying the failure.
    #[must_use]
    pub fn code(&self) -> Cow<'static, str> {
        match self {
            Self::Transport { code, .. } => code.clone(),
            Self::Timeout => Cow::Borrowed("ETIMEDOUT"),
            Self::HttpError(status, _) => Cow::Owned(format!("HTTP_{status}")),
            Self::RpcError(code, _) => Cow::Owned(format!("RPC_{code}")),
            Self::InvalidResponse(_) => Cow::Borrowed("EBADRESPONSE"),
            Self::NotConnected => Cow::Borrowed("ENOTCONN"),
        }
    }

    /// Returns `true` if the node refused the session's credentials.
    ///
    /// A session that fails this way cannot recover and is torn down.
    #[must_use]
    pub fn is_session_loss(&self) -> bool {
        matches!(self, Self::HttpError(401 | 403, _))
    }
}

/// Maps an I/O error kind to the errno name a node client would report.
#[must_use]
pub fn errno_code(kind: io::ErrorKind) -> &'static str {
    match kind {
        io::ErrorKind::ConnectionReset => "ECONNRESET",
        io::ErrorKind::ConnectionAborted => "ECONNABORTED",
        io::ErrorKind::ConnectionRefused => "ECONNREFUSED",
        io::ErrorKind::HostUnreachable => "EHOSTUNREACH",
        io::ErrorKind::NetworkUnreachable => "ENETUNREACH",
        io::ErrorKind::NotConnected => "ENOTCONN",
        io::ErrorKind::TimedOut => "ETIMEDOUT",
        io::ErrorKind::BrokenPipe => "EPIPE",
        io::ErrorKind::AddrNotAvailable => "EADDRNOTAVAIL",
        io::ErrorKind::UnexpectedEof => "EOF",
        _ => "EIO",
    }
}

/// Closed set of user-facing failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The node dropped the connection mid-handshake.
    ConnectionReset,
    /// Network-level failure reaching the endpoint.
    HostUnreachable,
    /// Operation attempted before a session exists.
    NotConnected,
    /// The node answered with a protocol-level fault (e.g. unknown block).
    UpstreamRejected,
    /// Anything else. The message is the raw code.
    Unknown,
}

impl ErrorKind {
    /// Returns a static string representation for log fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConnectionReset => "connection_reset",
            Self::HostUnreachable => "host_unreachable",
            Self::NotConnected => "not_connected",
            Self::UpstreamRejected => "upstream_rejected",
            Self::Unknown => "unknown",
        }
    }
}

/// A raw failure mapped to an [`ErrorKind`] and a stable message.
///
/// `message` is what callers see; `detail` keeps the raw error for logging.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub detail: UpstreamError,
}

impl ClassifiedError {
    /// Classifies a raw upstream failure. Total: every input yields some kind.
    #[must_use]
    pub fn classify(raw: UpstreamError) -> Self {
        let (kind, message) = match &raw {
            UpstreamError::Transport { code, .. } if code == "ECONNRESET" => (
                ErrorKind::ConnectionReset,
                "Couldn't establish connection. Is your full node running?".to_string(),
            ),
            UpstreamError::Transport { code, .. } if code == "EHOSTUNREACH" => (
                ErrorKind::HostUnreachable,
                "Host unreachable. Check your internet connection".to_string(),
            ),
            UpstreamError::NotConnected => {
                (ErrorKind::NotConnected, crate::types::NOT_CONNECTED_MESSAGE.to_string())
            }
            UpstreamError::RpcError(_, message) => (ErrorKind::UpstreamRejected, message.clone()),
            other => (ErrorKind::Unknown, other.code().into_owned()),
        };

        Self { kind, message, detail: raw }
    }

    #[must_use]
    pub fn not_connected() -> Self {
        Self::classify(UpstreamError::NotConnected)
    }
}

impl From<UpstreamError> for ClassifiedError {
    fn from(raw: UpstreamError) -> Self {
        Self::classify(raw)
    }
}
