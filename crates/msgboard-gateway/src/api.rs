use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use msgboard_common::{Error, MessageId, MessageSummary, NewMessage};
use msgboard_db::ListQuery;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct CreateMessageRequest {
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub parent_message_id: Option<MessageId>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}

/// GET /messages: newest messages as `{id, content, timestamp}`.
pub async fn list_messages(State(state): State<SharedState>) -> Response {
    match state.messages.list(ListQuery::default()).await {
        Ok(messages) => {
            let body: Vec<MessageSummary> = messages.iter().map(MessageSummary::from).collect();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// POST /messages: store a new message from a JSON body.
pub async fn create_message(State(state): State<SharedState>, body: Bytes) -> Response {
    let request: CreateMessageRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return error_response(Error::Serialization(e)),
    };

    let Some(content) = request.content else {
        return error_response(Error::missing_field("content"));
    };

    let message = NewMessage {
        content,
        author: request.author,
        parent_message_id: request.parent_message_id,
    };

    match state.messages.insert(message).await {
        Ok(id) => {
            debug!("stored message {id}");
            (StatusCode::CREATED, Json(StatusResponse { status: "success" })).into_response()
        }
        Err(e) => error_response(e),
    }
}

/// Plain-text error response with the status matching the error kind.
pub fn error_response(err: Error) -> Response {
    let status = match &err {
        Error::Validation(_) | Error::Serialization(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!("request failed: {err}");
    }
    (status, err.to_string()).into_response()
}
