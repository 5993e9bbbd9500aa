use crate::{
    types::{GatewayResponse, ResponseStatus},
    upstream::errors::{ClassifiedError, ErrorKind},
};

/// Failure of a gateway operation, tagged with the phase it happened in.
///
/// The tag decides the status: connect failures are 401, query failures 400 (401 when the
/// session vanished between the guard and the call), internal failures 500.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Connect failed: {0}")]
    Connect(ClassifiedError),

    #[error("Query failed: {0}")]
    Query(ClassifiedError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    #[must_use]
    pub fn status(&self) -> ResponseStatus {
        match self {
            Self::Connect(_) => ResponseStatus::Unauthorized,
            Self::Query(err) if err.kind == ErrorKind::NotConnected => ResponseStatus::Unauthorized,
            Self::Query(_) => ResponseStatus::BadRequest,
            Self::Internal(_) => ResponseStatus::Internal,
        }
    }

    /// Message exposed to callers. Raw transport detail never appears here.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Connect(err) | Self::Query(err) => err.message.clone(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }

    /// Shapes the error into a `{ "message": ... }` response.
    #[must_use]
    pub fn into_response(self) -> GatewayResponse {
        GatewayResponse::message(self.status(), self.public_message())
    }
}
