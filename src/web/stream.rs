// GET /ws/{user_id}: the persistent notification stream.
//
// The socket is split: the write half goes into the ConnectionRegistry as
// the user's StreamHandle, the read half is drained here until the client
// goes away. Client messages carry nothing and are ignored. When the reader
// ends it releases only its own connection, so a socket that was already
// replaced by a newer one can't evict it.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::notify::registry::{ConnectionRegistry, StreamHandle};
use crate::web::handlers::normalize_user_id;
use crate::web::{api_error, AppState};

/// Write half of a websocket, shared with the registry.
pub struct WsHandle {
    sink: Mutex<SplitSink<WebSocket, Message>>,
}

#[async_trait]
impl StreamHandle for WsHandle {
    async fn send_text(&self, text: String) -> Result<()> {
        self.sink
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .context("Failed to push websocket frame")
    }

    async fn close(&self) -> Result<()> {
        let mut sink = self.sink.lock().await;
        sink.send(Message::Close(None))
            .await
            .context("Failed to send websocket close frame")?;
        sink.close().await.context("Failed to close websocket")
    }
}

pub async fn connect(
    ws: WebSocketUpgrade,
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    // Same key the notify routes dispatch to
    let Some(user_id) = normalize_user_id(&user_id).map(str::to_string) else {
        return api_error(StatusCode::BAD_REQUEST, "user_id must not be empty");
    };
    let registry = Arc::clone(&state.registry);
    ws.on_upgrade(move |socket| serve_socket(socket, user_id, registry))
}

async fn serve_socket(socket: WebSocket, user_id: String, registry: Arc<ConnectionRegistry>) {
    let (sink, mut incoming) = socket.split();
    let handle = Arc::new(WsHandle {
        sink: Mutex::new(sink),
    });

    let connection = registry.connect(&user_id, handle).await;
    info!(user_id = %user_id, connection, "Stream connected");

    while let Some(message) = incoming.next().await {
        match message {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(user_id = %user_id, error = %e, "Stream read failed");
                break;
            }
        }
    }

    if registry.release(&user_id, connection).await {
        info!(user_id = %user_id, connection, "Stream disconnected");
    }
}
