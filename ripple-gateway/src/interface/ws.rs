//! websocket 接入层
//!
//! 每连接一个状态机:Connecting (凭证校验) -> Authenticated
//! (登记在线 + 上线广播) -> Active (处理客户端事件) ->
//! Disconnected (清除在线 + 离线广播)。凭证缺失或无效直接进入
//! 终态,发一帧 `socket-error` 后关闭。事件处理中的意外错误只
//! 影响当前连接,进程内其余连接不受波及。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::HeaderMap,
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use ripple_common::auth::TokenService;
use ripple_common::error::RippleError;
use ripple_common::protocol::{ClientEvent, ServerFrame};
use ripple_common::utils::generate_id;
use tokio::sync::mpsc;
use tokio::time::interval;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::application::EventService;
use crate::config::GatewayConfig;
use crate::interface::clients::{ClientHandle, ClientRegistry};
use crate::metrics::{GatewayMetrics, REGISTRY};

/// 网关共享状态
pub struct GatewayState {
    pub config: Arc<GatewayConfig>,
    pub clients: Arc<ClientRegistry>,
    pub events: Arc<EventService>,
    pub tokens: Arc<TokenService>,
    pub metrics: Arc<GatewayMetrics>,
}

/// 构建网关路由
pub fn create_router(state: Arc<GatewayState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

async fn health_handler(State(state): State<Arc<GatewayState>>) -> impl IntoResponse {
    format!(
        r#"{{"status":"ok","clients":{}}}"#,
        state.clients.count()
    )
}

async fn metrics_handler() -> impl IntoResponse {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        warn!(error = %err, "failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// 从握手元数据提取 bearer 凭证
///
/// 与原始客户端约定一致:`Authorization: Bearer`、`token` 查询参数
/// 或 `accessToken` cookie,按此优先级取第一个命中的。
fn extract_credential(headers: &HeaderMap, params: &HashMap<String, String>) -> Option<String> {
    if let Some(value) = headers.get("authorization") {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Some(token.trim().to_string());
            }
        }
    }

    if let Some(token) = params.get("token") {
        if !token.is_empty() {
            return Some(token.clone());
        }
    }

    if let Some(value) = headers.get("cookie") {
        if let Ok(value) = value.to_str() {
            for part in value.split(';') {
                if let Some(token) = part.trim().strip_prefix("accessToken=") {
                    if !token.is_empty() {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    State(state): State<Arc<GatewayState>>,
) -> impl IntoResponse {
    let credential = extract_credential(&headers, &params);
    ws.on_upgrade(move |socket| handle_socket(socket, state, credential))
}

async fn handle_socket(
    mut socket: WebSocket,
    state: Arc<GatewayState>,
    credential: Option<String>,
) {
    // Connecting -> Rejected:凭证缺失或无效即终态
    let user_id = match credential
        .ok_or_else(|| RippleError::AuthFailure("missing access token".to_string()))
        .and_then(|token| state.tokens.verify(&token))
    {
        Ok(user_id) => user_id,
        Err(err) => {
            warn!(error = %err, "connection rejected");
            state
                .metrics
                .events_rejected_total
                .with_label_values(&[err.code()])
                .inc();
            let frame = ServerFrame::socket_error(err.code(), &err.to_string());
            let _ = socket.send(Message::Text(frame.to_json())).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let connection_id = generate_id();
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (frame_tx, frame_rx) = mpsc::unbounded_channel::<ServerFrame>();
    let (raw_tx, raw_rx) = mpsc::unbounded_channel::<Message>();

    // 单写者任务:业务帧与保活帧合流后写入 socket
    let send_task = tokio::spawn(forward_frames(ws_tx, frame_rx, raw_rx));

    let handle = Arc::new(ClientHandle::new(
        connection_id.clone(),
        user_id.clone(),
        frame_tx,
    ));
    state.clients.register(handle.clone());
    state
        .metrics
        .active_connections
        .set(state.clients.count() as i64);

    // Authenticated:登记在线并广播上线事件
    if let Err(err) = state.events.announce_online(&user_id, &connection_id).await {
        warn!(%user_id, error = %err, "failed to announce online, closing connection");
        let _ = handle.send(ServerFrame::socket_error(err.code(), &err.to_string()));
        state.clients.unregister(&connection_id);
        state
            .metrics
            .active_connections
            .set(state.clients.count() as i64);
        // 关闭两条发送通道,写任务排空拒绝帧后自行退出
        drop(handle);
        drop(raw_tx);
        let _ = send_task.await;
        return;
    }

    let idle_timeout = Duration::from_secs(state.config.idle_timeout_seconds);
    let idle = tokio::time::sleep(idle_timeout);
    tokio::pin!(idle);

    let mut ping_interval = interval(Duration::from_secs(state.config.ping_interval_seconds));
    ping_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // Active:单连接事件按接收顺序处理,send-message 只挂起本连接
    loop {
        tokio::select! {
            incoming = ws_rx.next() => {
                match incoming {
                    Some(Ok(message)) => {
                        idle.as_mut().reset(tokio::time::Instant::now() + idle_timeout);
                        match message {
                            Message::Text(text) => {
                                handle_client_text(&state, &handle, &text).await;
                            }
                            Message::Binary(data) => {
                                match String::from_utf8(data) {
                                    Ok(text) => handle_client_text(&state, &handle, &text).await,
                                    Err(_) => reject(&state, &handle,
                                        &RippleError::MalformedEvent("binary frame is not utf-8".to_string())),
                                }
                            }
                            Message::Ping(data) => {
                                let _ = raw_tx.send(Message::Pong(data));
                            }
                            Message::Pong(_) => {}
                            Message::Close(_) => break,
                        }
                    }
                    Some(Err(err)) => {
                        debug!(%connection_id, error = %err, "websocket transport error");
                        break;
                    }
                    None => break,
                }
            }
            _ = ping_interval.tick() => {
                if raw_tx.send(Message::Ping(Vec::new())).is_err() {
                    break;
                }
                state.events.refresh_online(&user_id, &connection_id).await;
            }
            _ = &mut idle => {
                info!(%user_id, %connection_id, "idle timeout reached, disconnecting");
                break;
            }
        }
    }

    // Disconnected:清除在线表项并广播离线事件
    state.clients.unregister(&connection_id);
    state
        .metrics
        .active_connections
        .set(state.clients.count() as i64);
    state.events.announce_offline(&user_id, &connection_id).await;
    send_task.abort();
}

/// 单写者合流循环
///
/// 业务帧优先于保活帧;两条通道都关闭后先排空积压的业务帧
/// 再退出,保证已入队的拒绝帧不会因连接收尾而丢失。
async fn forward_frames<S>(
    mut sink: S,
    mut frame_rx: mpsc::UnboundedReceiver<ServerFrame>,
    mut raw_rx: mpsc::UnboundedReceiver<Message>,
) where
    S: futures::Sink<Message> + Unpin,
{
    loop {
        let outgoing = tokio::select! {
            biased;
            frame = frame_rx.recv() => frame.map(|frame| Message::Text(frame.to_json())),
            raw = raw_rx.recv() => raw,
        };
        match outgoing {
            Some(message) => {
                if sink.send(message).await.is_err() {
                    break;
                }
            }
            None => break,
        }
    }
}

/// 处理一条入站文本帧
///
/// 意外错误一律回发 `socket-error` 并保持连接,不得影响
/// 本进程的其他连接。
async fn handle_client_text(state: &Arc<GatewayState>, handle: &Arc<ClientHandle>, text: &str) {
    let event = match ClientEvent::parse(text) {
        Ok(event) => event,
        Err(err) => {
            reject(state, handle, &err);
            return;
        }
    };

    match event {
        ClientEvent::CheckOnline { user_id } => match state.events.check_online(&user_id).await {
            Ok(is_online) => {
                let _ = handle.send(ServerFrame::online_status(is_online));
            }
            Err(err) => reject(state, handle, &err),
        },
        ClientEvent::Typing {
            conversation_id,
            user_id,
        } => {
            // 输入中信号尽力而为,失败不上报
            if let Err(err) = state.events.typing(&conversation_id, &user_id).await {
                debug!(%conversation_id, error = %err, "typing signal dropped");
            }
        }
        ClientEvent::SendMessage {
            conversation_id,
            sender_id,
            message_type,
            body,
        } => {
            if let Err(err) = state
                .events
                .send_message(conversation_id, sender_id, message_type, body)
                .await
            {
                reject(state, handle, &err);
            }
        }
        ClientEvent::JoinConversation { conversation_id } => {
            handle.join(&conversation_id);
        }
        ClientEvent::LeaveConversation { conversation_id } => {
            handle.leave(&conversation_id);
        }
    }
}

fn reject(state: &Arc<GatewayState>, handle: &Arc<ClientHandle>, err: &RippleError) {
    state
        .metrics
        .events_rejected_total
        .with_label_values(&[err.code()])
        .inc();
    let _ = handle.send(ServerFrame::socket_error(err.code(), &err.to_string()));
}
