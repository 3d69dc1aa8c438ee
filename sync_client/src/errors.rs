use collab_ot::{OperationError, ProtocolError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Operation(#[from] OperationError),

    /// A remote operation doesn't follow the local revision.
    #[error("Expected an operation based on revision {expected} but received one based on {received}")]
    RevisionGap { expected: u64, received: u64 },

    #[error("Received an acknowledgement for unknown operation {operation_id} at revision {revision}")]
    UnexpectedAck { operation_id: Uuid, revision: u64 },

    #[error("The client has been shut down")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::WebSocket(Box::new(error))
    }
}
