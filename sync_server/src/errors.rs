use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use collab_ot::{OperationError, protocol::RoomId};
use log::{error, info};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncServerError {
    #[error("Initialisation error: {0}")]
    InitError(#[source] anyhow::Error),

    #[error("Client error: {0:?}")]
    ClientError(#[source] anyhow::Error),

    #[error("Server error: {0:?}")]
    ServerError(#[source] anyhow::Error),

    #[error("Not found: {0}")]
    NotFound(#[source] anyhow::Error),

    #[error("Unauthorized: {0}")]
    Unauthorized(#[source] anyhow::Error),
}

impl SyncServerError {
    pub fn serialize(&self) -> SerializedError {
        match self {
            Self::InitError(error)
            | Self::ClientError(error)
            | Self::ServerError(error)
            | Self::NotFound(error)
            | Self::Unauthorized(error) => error.into(),
        }
    }
}

impl IntoResponse for SyncServerError {
    fn into_response(self) -> Response {
        let body = Json(self.serialize());

        match self {
            Self::InitError(_) | Self::ServerError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
            }
            Self::ClientError(_) => (StatusCode::BAD_REQUEST, body).into_response(),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, body).into_response(),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, body).into_response(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SerializedError {
    pub message: String,
    pub causes: Vec<String>,
}

impl From<&anyhow::Error> for SerializedError {
    fn from(error: &anyhow::Error) -> SerializedError {
        let mut causes = vec![];
        let mut current_error = error.source();
        while let Some(error) = current_error {
            causes.push(error.to_string());
            current_error = error.source();
        }

        SerializedError {
            message: error.to_string(),
            causes,
        }
    }
}

pub const fn init_error(error: anyhow::Error) -> SyncServerError {
    SyncServerError::InitError(error)
}

pub fn server_error(error: anyhow::Error) -> SyncServerError {
    error!("Server error: {error:?}");
    SyncServerError::ServerError(error)
}

pub fn client_error(error: anyhow::Error) -> SyncServerError {
    info!("Client error: {error:?}");
    SyncServerError::ClientError(error)
}

pub fn not_found_error(error: anyhow::Error) -> SyncServerError {
    info!("Not found error: {error:?}");
    SyncServerError::NotFound(error)
}

pub fn unauthorized_error(error: anyhow::Error) -> SyncServerError {
    info!("Unauthorized error: {error:?}");
    SyncServerError::Unauthorized(error)
}

/// Why a room refused a request.
#[derive(Error, Debug)]
pub enum RoomError {
    #[error(
        "Operation based on revision {base} is {gap} revisions behind the room, which can't be \
         replayed"
    )]
    ReplayGapTooLarge { base: u64, gap: u64 },

    #[error("Operation based on revision {base} but the room is only at revision {current}")]
    FutureRevision { base: u64, current: u64 },

    #[error("Timed out waiting for room '{0}'")]
    Busy(RoomId),

    #[error("Rejected operation: {0}")]
    InvalidOperation(#[from] OperationError),

    #[error("Room '{room_id}' is full ({capacity} clients)")]
    Full { room_id: RoomId, capacity: usize },

    #[error("User '{user}' cannot submit an operation authored by '{author}'")]
    ForeignAuthor { user: String, author: String },

    #[error("Room id '{0}' does not belong to the given project and file")]
    InvalidRoomId(RoomId),

    #[error("Room '{0}' does not exist")]
    NotFound(RoomId),

    #[error("Connection has not joined room '{0}'")]
    NotMember(RoomId),

    #[error("Room '{0}' has been closed")]
    Closed(RoomId),

    #[error("Document store error: {0:?}")]
    Store(#[source] anyhow::Error),
}

impl RoomError {
    /// Whether the client has to fetch a fresh snapshot before editing again.
    pub fn requires_sync(&self) -> bool {
        matches!(
            self,
            Self::ReplayGapTooLarge { .. }
                | Self::FutureRevision { .. }
                | Self::Busy(_)
                | Self::InvalidOperation(_)
                | Self::Store(_)
        )
    }
}
