//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{FieldGeometry, Outbound, PlayerSlot};
use crate::ws::protocol::ServerMsg;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    // Paddles start where the client first draws them
    let (slot, outbound_rx) = PlayerSlot::new(FieldGeometry::default().center().y);
    let slot_id = slot.id();
    info!(slot_id = %slot_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();

    // Spawn writer task: slot outbound queue -> WebSocket
    let writer_handle = tokio::spawn(write_outbound(slot_id, ws_sink, outbound_rx));

    if let Err(e) = state.registry.join(slot.clone()) {
        error!(slot_id = %slot_id, error = %e, "Could not seat player");
        slot.close();
        let _ = writer_handle.await;
        return;
    }

    // Reader loop: WebSocket -> session
    slot.receive_loop(ws_stream).await;

    writer_handle.abort();

    info!(slot_id = %slot_id, "WebSocket connection closed");
}

/// Drain the slot's outbound queue onto the socket
async fn write_outbound(
    slot_id: Uuid,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut outbound_rx: mpsc::Receiver<Outbound>,
) {
    while let Some(outbound) = outbound_rx.recv().await {
        match outbound {
            Outbound::Message(msg) => {
                if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                    debug!(slot_id = %slot_id, error = %e, "WebSocket send failed");
                    break;
                }
            }
            Outbound::Close => {
                debug!(slot_id = %slot_id, "Closing connection, match ended");
                let frame = CloseFrame {
                    code: close_code::NORMAL,
                    reason: "Match ended".into(),
                };
                let _ = ws_sink.send(Message::Close(Some(frame))).await;
                break;
            }
        }
    }
}

/// Send a message over WebSocket
async fn send_msg(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMsg) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
