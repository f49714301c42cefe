//! WebSocket connection handlers.
//!
//! `/ws` と `/socket` は既定の名前空間、`/queries/ws` は queries 名前空間として扱います。

use std::{fmt::Display, net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ConnectInfo, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{HeaderMap, header},
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;

use crate::{
    domain::{ConnectionId, Namespace},
    infrastructure::dto::websocket::{ClientEvent, ErrorDto, EventRejection, ServerEvent},
    ui::state::AppState,
    usecase::{ClientInfo, JoinRequest},
};

/// `GET /ws`, `GET /socket`
pub async fn default_namespace_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    upgrade(ws, state, Namespace::Default, client_info(addr, &headers))
}

/// `GET /queries/ws`
pub async fn queries_namespace_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> impl IntoResponse {
    upgrade(ws, state, Namespace::Queries, client_info(addr, &headers))
}

fn client_info(addr: SocketAddr, headers: &HeaderMap) -> ClientInfo {
    ClientInfo {
        user_agent: headers
            .get(header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string),
        ip: Some(addr.ip().to_string()),
    }
}

fn upgrade(
    ws: WebSocketUpgrade,
    state: Arc<AppState>,
    namespace: Namespace,
    client: ClientInfo,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, namespace, client))
}

/// Spawns a task that receives messages from the rx channel and pushes them to the WebSocket sender.
///
/// Events addressed to this connection by any use case arrive through `rx`.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(Message::Text(msg.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    namespace: Namespace,
    client: ClientInfo,
) {
    let connection_id = ConnectionId::generate();
    let (tx, rx) = mpsc::unbounded_channel();

    if let Err(e) = state
        .connect_client_usecase
        .execute(connection_id.clone(), namespace, tx, client)
        .await
    {
        tracing::warn!(connection_id = %connection_id, "Failed to accept connection: {}", e);
        return;
    }

    let (sender, mut receiver) = socket.split();
    let mut send_task = pusher_loop(rx, sender);

    let recv_state = state.clone();
    let recv_connection_id = connection_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!(connection_id = %recv_connection_id, "WebSocket error: {}", e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    handle_text(&recv_state, namespace, &recv_connection_id, text.as_str()).await;
                }
                Message::Close(_) => {
                    tracing::debug!(connection_id = %recv_connection_id, "client requested close");
                    break;
                }
                _ => {}
            }
        }
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    if let Err(e) = state.disconnect_client_usecase.execute(&connection_id).await {
        tracing::warn!(connection_id = %connection_id, "Failed to notify disconnect: {}", e);
    }
}

/// 受信したテキストフレームを 1 件処理する
async fn handle_text(state: &AppState, namespace: Namespace, connection_id: &ConnectionId, text: &str) {
    let event = match ClientEvent::parse(text) {
        Ok(event) => event,
        Err(rejection) => {
            reject(state, connection_id, rejection).await;
            return;
        }
    };

    if namespace == Namespace::Queries {
        match event.into_query() {
            Some(query) => {
                let result = state
                    .query_thread_usecase
                    .handle(connection_id, namespace, query)
                    .await;
                report(connection_id, "query", result);
            }
            None => {
                let rejection = EventRejection {
                    event: None,
                    reason: "only query events are accepted on /queries".to_string(),
                };
                reject(state, connection_id, rejection).await;
            }
        }
        return;
    }

    match event {
        ClientEvent::UserJoin(payload) => {
            let request = JoinRequest {
                user_id: payload.id,
                name: payload.name,
                avatar: payload.avatar,
                room: payload.room,
            };
            let result = state.join_room_usecase.join(connection_id, request).await;
            report(connection_id, "user_join", result);
        }
        ClientEvent::JoinRoom(room) => {
            let result = state.join_room_usecase.switch(connection_id, room).await;
            report(connection_id, "join_room", result);
        }
        ClientEvent::SendMessage(payload) => {
            let result = state
                .relay_chat_usecase
                .send_message(connection_id, payload.content, payload.extra)
                .await;
            report(connection_id, "send_message", result);
        }
        ClientEvent::SendPrivateMessage(payload) => {
            let result = state
                .relay_chat_usecase
                .send_private_message(
                    connection_id,
                    payload.recipient_id,
                    payload.content,
                    payload.extra,
                )
                .await;
            report(connection_id, "send_private_message", result);
        }
        ClientEvent::TypingStart => {
            let result = state.typing_indicator_usecase.start(connection_id).await;
            report(connection_id, "typing_start", result);
        }
        ClientEvent::TypingStop => {
            let result = state.typing_indicator_usecase.stop(connection_id).await;
            report(connection_id, "typing_stop", result);
        }
        ClientEvent::AddReaction(payload) => {
            let result = state
                .relay_chat_usecase
                .add_reaction(connection_id, payload.message_id, payload.emoji)
                .await;
            report(connection_id, "add_reaction", result);
        }
        ClientEvent::ShareFile(file) => {
            let result = state.relay_chat_usecase.share_file(connection_id, file).await;
            report(connection_id, "share_file", result);
        }
        ClientEvent::SendVoiceMessage(voice) => {
            let result = state
                .relay_chat_usecase
                .send_voice_message(connection_id, voice)
                .await;
            report(connection_id, "send_voice_message", result);
        }
        ClientEvent::MarkMessageRead(message_id) => {
            let result = state.relay_chat_usecase.mark_read(connection_id, message_id).await;
            report(connection_id, "mark_message_read", result);
        }
        ClientEvent::UpdateStatus(status) => {
            let result = state
                .update_status_usecase
                .execute(connection_id, status)
                .await;
            report(connection_id, "update_status", result);
        }
        ClientEvent::NetworkPing(data) => {
            let result = state.network_monitor_usecase.ping(connection_id, data).await;
            report(connection_id, "network:ping", result);
        }
        ClientEvent::RequestNetworkStatus => {
            let result = state.network_monitor_usecase.send_status(connection_id).await;
            report(connection_id, "request:network:status", result);
        }
        ClientEvent::RequestSensorsData => {
            let result = state.sensor_network_usecase.send_status(connection_id).await;
            report(connection_id, "request:sensors:data", result);
        }
        ClientEvent::SensorControl(payload) => {
            state.sensor_network_usecase.control(payload).await;
        }
        ClientEvent::Query(query) => {
            let result = state
                .query_thread_usecase
                .handle(connection_id, namespace, query)
                .await;
            report(connection_id, "query", result);
        }
    }
}

/// 拒否したフレームを記録し、送信者に `error` を返す
async fn reject(state: &AppState, connection_id: &ConnectionId, rejection: EventRejection) {
    tracing::warn!(
        connection_id = %connection_id,
        event = rejection.event.as_deref().unwrap_or("-"),
        "Rejected frame: {}",
        rejection.reason
    );
    let reply = ServerEvent::Error(ErrorDto {
        event: rejection.event,
        reason: rejection.reason,
    });
    if let Err(e) = state.event_dispatcher.send_to(connection_id, &reply).await {
        tracing::debug!(connection_id = %connection_id, "Failed to send error reply: {}", e);
    }
}

fn report<T, E: Display>(connection_id: &ConnectionId, event: &'static str, result: Result<T, E>) {
    if let Err(e) = result {
        tracing::warn!(connection_id = %connection_id, event, "Failed to handle event: {}", e);
    }
}
