//! Native chat client: `tokio-tungstenite`.
//!
//! - Background tokio task owns the socket
//! - Fixed-interval reconnection with a bounded attempt count
//! - Messages sent while reconnecting are queued and flushed on reconnect
//! - Online-user roster kept current from presence events
//! - Stream-based event delivery to the consumer

use std::pin::Pin;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_lock::RwLock;
use futures_util::stream::{SplitSink, SplitStream, Stream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::WsError;
use crate::session::SessionStore;
use crate::ws::{
    apply_presence, chat_url, ChatEvent, MessageOut, OnlineUser, ReadyState, TargetType,
    WsConfig, WsEvent, CLOSE_NORMAL, CLOSE_POLICY_VIOLATION,
};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;

// ─── Chat task commands ──────────────────────────────────────────────────────

enum Command {
    Send(MessageOut),
    Disconnect,
}

// ─── Why a session ended ─────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum DisconnectReason {
    UserRequested,
    NormalClose,
    Rejected,
    Error(String),
}

// ─── Chat task state ─────────────────────────────────────────────────────────

struct TaskState {
    config: WsConfig,
    url: String,
    event_tx: mpsc::Sender<WsEvent>,
    cmd_rx: mpsc::Receiver<Command>,
    pending_messages: Vec<MessageOut>,
    reconnect_attempts: u32,
    ready_state: Arc<AtomicU8>,
    online_users: Arc<RwLock<Vec<OnlineUser>>>,
}

impl TaskState {
    fn emit(&self, event: WsEvent) {
        if self.event_tx.try_send(event).is_err() {
            tracing::debug!("Chat event dropped: consumer not keeping up");
        }
    }

    fn set_state(&self, state: ReadyState) {
        self.ready_state.store(state as u8, Ordering::SeqCst);
    }

    fn should_reconnect(&self) -> bool {
        self.config.reconnect && self.reconnect_attempts < self.config.max_reconnect_attempts
    }
}

// ─── Public ChatClient ───────────────────────────────────────────────────────

/// Chat client over the platform WebSocket.
///
/// Uses a background tokio task for connection management. The public API
/// talks to it over mpsc channels.
pub struct ChatClient {
    config: WsConfig,
    session: SessionStore,
    cmd_tx: Option<mpsc::Sender<Command>>,
    event_rx: tokio::sync::Mutex<mpsc::Receiver<WsEvent>>,
    event_tx: mpsc::Sender<WsEvent>,
    task_handle: Option<JoinHandle<()>>,
    ready_state: Arc<AtomicU8>,
    online_users: Arc<RwLock<Vec<OnlineUser>>>,
}

impl ChatClient {
    /// Create a new chat client. Does not connect yet.
    pub fn new(config: WsConfig, session: SessionStore) -> Self {
        let (event_tx, event_rx) = mpsc::channel(256);
        Self {
            config,
            session,
            cmd_tx: None,
            event_rx: tokio::sync::Mutex::new(event_rx),
            event_tx,
            task_handle: None,
            ready_state: Arc::new(AtomicU8::new(ReadyState::Closed as u8)),
            online_users: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Connect with the session's token.
    ///
    /// Spawns the background task; the outcome of the handshake arrives as a
    /// [`WsEvent`]. Fails with [`WsError::NoToken`] when nobody is logged in.
    pub async fn connect(&mut self) -> Result<(), WsError> {
        // The task stops on its own after a 1000/1008 close or once reconnects
        // run out; a finished task is not a live connection.
        if self
            .task_handle
            .as_ref()
            .is_some_and(JoinHandle::is_finished)
        {
            self.task_handle = None;
            self.cmd_tx = None;
        }
        if self.cmd_tx.is_some() {
            return Ok(());
        }
        let token = self.session.token().await.ok_or(WsError::NoToken)?;

        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        self.cmd_tx = Some(cmd_tx);
        self.ready_state
            .store(ReadyState::Connecting as u8, Ordering::SeqCst);

        let state = TaskState {
            url: chat_url(&self.config.url, &token),
            config: self.config.clone(),
            event_tx: self.event_tx.clone(),
            cmd_rx,
            pending_messages: Vec::new(),
            reconnect_attempts: 0,
            ready_state: Arc::clone(&self.ready_state),
            online_users: Arc::clone(&self.online_users),
        };

        self.task_handle = Some(tokio::spawn(run_task(state)));
        Ok(())
    }

    /// Close the connection and wait for the background task to finish.
    pub async fn disconnect(&mut self) -> Result<(), WsError> {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(Command::Disconnect).await;
        }
        if let Some(handle) = self.task_handle.take() {
            let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
        }
        self.ready_state
            .store(ReadyState::Closed as u8, Ordering::SeqCst);
        self.online_users.write().await.clear();
        Ok(())
    }

    /// Queue a message for the server.
    ///
    /// Sent immediately when open, otherwise held until the next successful
    /// reconnect.
    pub fn send(&self, msg: MessageOut) -> Result<(), WsError> {
        match &self.cmd_tx {
            Some(tx) => tx.try_send(Command::Send(msg)).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    WsError::SendFailed("chat command queue is full".into())
                }
                mpsc::error::TrySendError::Closed(_) => WsError::NotConnected,
            }),
            None => Err(WsError::NotConnected),
        }
    }

    pub fn send_private_message(&self, receiver_id: i64, content: &str) -> Result<(), WsError> {
        self.send(MessageOut::private_message(receiver_id, content))
    }

    pub fn send_room_message(&self, room_id: i64, content: &str) -> Result<(), WsError> {
        self.send(MessageOut::room_message(room_id, content))
    }

    pub fn send_typing(
        &self,
        target_id: i64,
        target_type: TargetType,
        is_typing: bool,
    ) -> Result<(), WsError> {
        self.send(MessageOut::typing(target_id, target_type, is_typing))
    }

    pub fn mark_read(&self, message_id: i64) -> Result<(), WsError> {
        self.send(MessageOut::read_message(message_id))
    }

    /// Whether the socket is currently open.
    pub fn is_connected(&self) -> bool {
        self.ready_state() == ReadyState::Open
    }

    pub fn ready_state(&self) -> ReadyState {
        ReadyState::from(self.ready_state.load(Ordering::SeqCst))
    }

    /// Users the server last reported as online.
    pub async fn online_users(&self) -> Vec<OnlineUser> {
        self.online_users.read().await.clone()
    }

    pub async fn is_user_online(&self, user_id: i64) -> bool {
        self.online_users
            .read()
            .await
            .iter()
            .any(|u| u.user_id == user_id)
    }

    pub fn config(&self) -> &WsConfig {
        &self.config
    }

    /// Stream of events from the connection.
    ///
    /// Borrows the client: drop the stream before `disconnect()`.
    pub fn events(&self) -> Pin<Box<dyn Stream<Item = WsEvent> + Send + '_>> {
        Box::pin(futures_util::stream::unfold(
            &self.event_rx,
            |rx| async move {
                let mut guard = rx.lock().await;
                guard.recv().await.map(|event| (event, rx))
            },
        ))
    }
}

impl Drop for ChatClient {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

// ─── Chat task ───────────────────────────────────────────────────────────────

async fn run_task(mut state: TaskState) {
    loop {
        // ── 1. Dial the chat endpoint ────────────────────────────────────
        let timeout = Duration::from_millis(state.config.connect_timeout_ms);
        let (sink, stream) = match attempt_connect(&state.url, timeout).await {
            Ok(parts) => parts,
            Err(e) => {
                tracing::error!("Chat connection failed: {}", e);
                state.emit(WsEvent::Error(format!("Connection failed: {}", e)));
                if !reconnect_or_stop(&mut state).await {
                    return;
                }
                continue;
            }
        };

        // ── 2. Open: reset the attempt counter ───────────────────────────
        tracing::info!("Chat connected");
        state.reconnect_attempts = 0;
        state.set_state(ReadyState::Open);
        state.emit(WsEvent::Connected);

        // ── 3. Flush messages queued while away ──────────────────────────
        let mut sink = sink;
        flush_pending(&mut sink, &mut state.pending_messages).await;

        // ── 4. Connected loop ────────────────────────────────────────────
        let reason = run_connected(&mut state, sink, stream).await;

        // ── 5. Stop, or wait and redial ──────────────────────────────────
        state.set_state(ReadyState::Closed);
        state.online_users.write().await.clear();

        match reason {
            DisconnectReason::UserRequested | DisconnectReason::NormalClose => return,
            DisconnectReason::Rejected => {
                tracing::warn!("Chat server rejected the session token");
                return;
            }
            DisconnectReason::Error(reason) => {
                tracing::warn!("Chat connection lost: {}", reason);
                if !reconnect_or_stop(&mut state).await {
                    return;
                }
            }
        }
    }
}

/// Wait out the reconnect interval. Returns `false` when the task should stop.
async fn reconnect_or_stop(state: &mut TaskState) -> bool {
    if !state.config.reconnect {
        state.set_state(ReadyState::Closed);
        return false;
    }
    if !state.should_reconnect() {
        tracing::warn!(
            "Giving up after {} reconnect attempt(s)",
            state.reconnect_attempts
        );
        state.set_state(ReadyState::Closed);
        state.emit(WsEvent::MaxReconnectReached);
        return false;
    }

    state.set_state(ReadyState::Connecting);
    state.reconnect_attempts += 1;
    tracing::info!(
        "Reconnect attempt {}/{} in {}ms",
        state.reconnect_attempts,
        state.config.max_reconnect_attempts,
        state.config.reconnect_interval_ms
    );

    let sleep = tokio::time::sleep(Duration::from_millis(state.config.reconnect_interval_ms));
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            () = &mut sleep => return true,
            cmd = state.cmd_rx.recv() => match cmd {
                Some(Command::Send(msg)) => state.pending_messages.push(msg),
                Some(Command::Disconnect) | None => {
                    state.set_state(ReadyState::Closed);
                    return false;
                }
            }
        }
    }
}

/// The inner connected loop. Runs until the connection breaks.
async fn run_connected(
    state: &mut TaskState,
    mut sink: WsSink,
    mut stream: SplitStream<WsStream>,
) -> DisconnectReason {
    loop {
        tokio::select! {
            // ── a) Server frame ──────────────────────────────────────────
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let raw: &str = text.as_ref();
                        match ChatEvent::parse(raw) {
                            Ok(event) => {
                                let changed = {
                                    let mut roster = state.online_users.write().await;
                                    apply_presence(&mut roster, &event)
                                };
                                if changed {
                                    tracing::debug!("Online roster updated");
                                }
                                state.emit(WsEvent::Message(event));
                            }
                            Err(e) => {
                                tracing::warn!("Chat message rejected: {} (raw: {})", e, raw);
                                state.emit(WsEvent::Error(e.to_string()));
                            }
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = extract_close(frame.as_ref());
                        state.emit(WsEvent::Disconnected {
                            code: Some(code),
                            reason: reason.clone(),
                        });
                        return close_reason(code, reason);
                    }
                    Some(Ok(_)) => {} // Binary, Pong, Frame
                    Some(Err(e)) => {
                        let reason = e.to_string();
                        tracing::error!("Chat socket error: {}", reason);
                        state.emit(WsEvent::Disconnected {
                            code: None,
                            reason: reason.clone(),
                        });
                        return DisconnectReason::Error(reason);
                    }
                    None => {
                        state.emit(WsEvent::Disconnected {
                            code: None,
                            reason: "Stream ended".into(),
                        });
                        return DisconnectReason::Error("Stream ended".into());
                    }
                }
            }

            // ── b) Client command ────────────────────────────────────────
            cmd = state.cmd_rx.recv() => {
                match cmd {
                    Some(Command::Send(msg_out)) => {
                        if let Err(e) = send_msg(&mut sink, &msg_out).await {
                            tracing::warn!("Send failed, queueing for reconnect: {}", e);
                            state.pending_messages.push(msg_out);
                        }
                    }
                    Some(Command::Disconnect) | None => {
                        let _ = sink.send(Message::Close(Some(CloseFrame {
                            code: CloseCode::Normal,
                            reason: "Client disconnect".into(),
                        }))).await;
                        return DisconnectReason::UserRequested;
                    }
                }
            }
        }
    }
}

// ─── Socket helpers ──────────────────────────────────────────────────────────

async fn attempt_connect(
    url: &str,
    timeout: Duration,
) -> Result<(WsSink, SplitStream<WsStream>), String> {
    let (ws_stream, _) = tokio::time::timeout(timeout, connect_async(url))
        .await
        .map_err(|_| format!("no handshake within {}ms", timeout.as_millis()))?
        .map_err(|e| e.to_string())?;

    Ok(ws_stream.split())
}

async fn send_msg(sink: &mut WsSink, msg: &MessageOut) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json.into()))
        .await
        .map_err(|e| e.to_string())
}

/// Close code and reason; 1006 when the server sent no frame.
fn extract_close(frame: Option<&CloseFrame>) -> (u16, String) {
    match frame {
        Some(f) => (f.code.into(), f.reason.to_string()),
        None => (1006, "closed without a frame".into()),
    }
}

fn close_reason(code: u16, reason: String) -> DisconnectReason {
    match code {
        CLOSE_NORMAL => DisconnectReason::NormalClose,
        CLOSE_POLICY_VIOLATION => DisconnectReason::Rejected,
        _ => DisconnectReason::Error(reason),
    }
}

async fn flush_pending(sink: &mut WsSink, pending: &mut Vec<MessageOut>) {
    if pending.is_empty() {
        return;
    }
    tracing::info!("Flushing {} pending message(s)", pending.len());
    let messages = std::mem::take(pending);
    for (i, msg) in messages.iter().enumerate() {
        if let Err(e) = send_msg(sink, msg).await {
            tracing::warn!("Failed to flush pending message: {}", e);
            pending.extend(messages[i..].iter().cloned());
            return;
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ChatClient {
        ChatClient::new(WsConfig::default(), SessionStore::in_memory())
    }

    #[test]
    fn test_chat_client_new() {
        let client = client();
        assert!(client.cmd_tx.is_none());
        assert_eq!(client.ready_state(), ReadyState::Closed);
        assert!(!client.is_connected());
    }

    #[test]
    fn test_send_before_connect_fails() {
        let client = client();
        let result = client.send_private_message(1, "hi");
        assert!(matches!(result, Err(WsError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_without_token() {
        let mut client = client();
        assert!(matches!(client.connect().await, Err(WsError::NoToken)));
        assert!(client.cmd_tx.is_none());
    }

    #[test]
    fn test_close_frame_code_and_reason() {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "goodbye".into(),
        };
        let (code, reason) = extract_close(Some(&frame));
        assert_eq!(code, 1000);
        assert_eq!(reason, "goodbye");
    }

    #[test]
    fn test_missing_close_frame_is_abnormal() {
        let (code, reason) = extract_close(None);
        assert_eq!(code, 1006);
        assert_eq!(reason, "closed without a frame");
    }

    #[test]
    fn test_close_reason() {
        assert_eq!(close_reason(1000, String::new()), DisconnectReason::NormalClose);
        assert_eq!(close_reason(1008, String::new()), DisconnectReason::Rejected);
        assert_eq!(
            close_reason(1011, "boom".into()),
            DisconnectReason::Error("boom".into())
        );
    }

    #[tokio::test]
    async fn test_disconnect_before_connect_is_noop() {
        let mut client = client();
        assert!(client.disconnect().await.is_ok());
    }
}
