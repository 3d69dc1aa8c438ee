use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::SyncServerError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingResponse {
    pub server_version: String,
}

#[axum::debug_handler]
pub async fn ping() -> Result<Json<PingResponse>, SyncServerError> {
    Ok(Json(PingResponse {
        server_version: env!("CARGO_PKG_VERSION").to_owned(),
    }))
}
