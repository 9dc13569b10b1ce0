use crate::infer::FrameSubmission;
use crate::rooms::ConnectionHandle;
use crate::state::AppState;
use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use framelink_protocol::{ClientMessage, Role, ServerMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Room/role remembered by a connection for close-time cleanup. Set once,
/// by the first successful join. Later joins overwrite registry slots but
/// not this record, matching the deployed relay: a re-joined connection
/// leaves its newer slot bound until the socket closes.
struct Binding {
    role: Role,
    room_id: String,
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let connection_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let handle = ConnectionHandle::new(connection_id, tx);

    tracing::debug!(%connection_id, "websocket connection established");

    // Forward queued outbound messages to the socket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    let mut binding: Option<Binding> = None;

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                let client_msg: ClientMessage = match serde_json::from_str(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!(%connection_id, error = %e, "ignoring malformed message");
                        continue;
                    }
                };

                handle_client_message(&state, &handle, &mut binding, client_msg).await;
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::debug!(%connection_id, error = %e, "websocket error");
                break;
            }
            _ => {}
        }
    }

    // Release only the first-join slot, and only if it is still ours.
    if let Some(Binding { role, room_id }) = &binding {
        state.rooms.unbind(room_id, *role, connection_id).await;
    }

    send_task.abort();

    tracing::debug!(%connection_id, "websocket connection closed");
}

async fn handle_client_message(
    state: &AppState,
    handle: &ConnectionHandle,
    binding: &mut Option<Binding>,
    message: ClientMessage,
) {
    match message {
        ClientMessage::Join { role, room_id } => {
            tracing::info!(connection_id = %handle.id(), %role, room = %room_id, "join");

            // Occupancy for the notifications below is read from the
            // post-bind snapshot, i.e. room state at this join.
            let peers = state.rooms.bind(&room_id, role, handle.clone()).await;
            match role {
                Role::Viewer => {
                    if peers.phone.is_some() {
                        handle.send(&ServerMessage::Ready);
                    }
                }
                Role::Phone => {
                    if let Some(viewer) = &peers.viewer {
                        viewer.send(&ServerMessage::PhoneJoined);
                    }
                }
                Role::Infer => {}
            }
            handle.send(&ServerMessage::Joined {
                role,
                room_id: room_id.clone(),
            });

            if binding.is_none() {
                *binding = Some(Binding { role, room_id });
            }
        }

        ClientMessage::Signal { data, target, .. } => {
            let Some(Binding { room_id, .. }) = binding else {
                tracing::debug!(connection_id = %handle.id(), "signal before join ignored");
                return;
            };

            tracing::debug!(connection_id = %handle.id(), ?target, room = %room_id, "relaying signal");
            if let Some(peer) = state.rooms.peer(room_id, target.into()).await {
                peer.send(&ServerMessage::Signal { data });
            }
        }

        ClientMessage::InferFrame {
            frame_id,
            capture_ts,
            recv_ts,
            mime,
            data,
        } => {
            let Some(Binding { role, room_id }) = binding else {
                tracing::debug!(connection_id = %handle.id(), "infer_frame before join ignored");
                return;
            };
            if !matches!(*role, Role::Phone | Role::Viewer) {
                tracing::debug!(connection_id = %handle.id(), %role, "infer_frame from non-media role ignored");
                return;
            }

            tracing::debug!(connection_id = %handle.id(), %frame_id, room = %room_id, "received infer_frame");

            // Off the read loop: the engine call may take seconds and must
            // not stall signal relay on this connection.
            let bridge = state.inference.clone();
            let room_id = room_id.clone();
            let sender = handle.clone();
            let frame = FrameSubmission {
                frame_id,
                capture_ts,
                recv_ts,
                mime,
                data,
            };
            tokio::spawn(async move {
                bridge.submit_frame(&room_id, &sender, frame).await;
            });
        }
    }
}
