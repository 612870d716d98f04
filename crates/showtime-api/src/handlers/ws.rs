//! WebSocket upgrade handler.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use showtime_core::types::OwnerId;
use showtime_realtime::SessionManager;
use showtime_realtime::message::OutboundMessage;
use showtime_realtime::message::serializer::serialize_outbound;

use crate::state::AppState;

/// Query parameters of the upgrade request.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// Caller identity. Omitted or blank means a per-connection guest.
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// GET /ws?owner_id={id}
pub async fn ws_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Response {
    let owner_id = query.owner_id.as_deref().and_then(OwnerId::parse);
    let sessions = state.realtime.sessions.clone();
    ws.on_upgrade(move |socket| handle_socket(sessions, owner_id, socket))
}

/// Pumps one established socket until either side ends the session.
async fn handle_socket(sessions: Arc<SessionManager>, owner_id: Option<OwnerId>, socket: WebSocket) {
    let (handle, mut outbound) = sessions.connect(owner_id).await;
    let (mut ws_tx, mut ws_rx) = socket.split();
    let conn_id = handle.id;

    info!(conn_id = %conn_id, owner_id = %handle.owner_id, "WebSocket connection established");

    loop {
        tokio::select! {
            biased;
            msg = outbound.recv() => match msg {
                Some(msg) => {
                    if send_message(&mut ws_tx, &msg).await.is_err() {
                        break;
                    }
                }
                None => break,
            },
            frame = ws_rx.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    sessions.handle_inbound(conn_id, text.as_str()).await;
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                    break;
                }
            },
            _ = handle.closed() => {
                // Flush what was queued before the close, e.g. `session_closed`.
                while let Ok(msg) = outbound.try_recv() {
                    if send_message(&mut ws_tx, &msg).await.is_err() {
                        break;
                    }
                }
                let _ = ws_tx.send(Message::Close(None)).await;
                break;
            }
        }
    }

    sessions.disconnect(&handle).await;
    info!(conn_id = %conn_id, owner_id = %handle.owner_id, "WebSocket connection closed");
}

async fn send_message(
    ws_tx: &mut SplitSink<WebSocket, Message>,
    msg: &OutboundMessage,
) -> Result<(), axum::Error> {
    match serialize_outbound(msg) {
        Ok(text) => ws_tx.send(Message::Text(text.into())).await,
        Err(e) => {
            debug!(error = %e, "Dropping unserializable outbound message");
            Ok(())
        }
    }
}
