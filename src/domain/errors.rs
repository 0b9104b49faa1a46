use thiserror::Error;

// Errors surfaced by the client to its callers.
#[derive(Debug, Error)]
pub enum ClientError {
    // No response reached us at all.
    #[error("Network error: Unable to connect to the server ({0})")]
    Network(String),
    // Non-2xx response; the message is shown to users verbatim.
    #[error("{message}")]
    Api { status: u16, message: String },
    // 2xx response whose body does not have the shape a caller needs.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Reservation(#[from] ReservationError),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// Session-specific failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication failed: No token received")]
    NoTokenReceived,
    #[error("session expired")]
    SessionExpired,
    #[error("another login or logout is already in progress")]
    OperationInFlight,
}

// Client-side reservation guards. These never reach the network.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReservationError {
    #[error("no tables left for restaurant {0}")]
    NoTablesLeft(i64),
    #[error("a reservation for restaurant {0} is already being submitted")]
    SubmissionInFlight(i64),
}

// Malformed bearer token. Absorbed by the token codec into "no identity".
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("expected 3 token segments, found {0}")]
    SegmentCount(usize),
    #[error("payload is not valid base64: {0}")]
    Base64(String),
    #[error("payload is not a json object: {0}")]
    Payload(String),
}
