//! Session Socket Actor
//!
//! Owns the single realtime connection of an authenticated user. Auth
//! transitions, transport signals and reconnect timers are all messages to
//! this actor, so they are handled one at a time and never race.
//!
//! # States
//!
//! ```text
//!            login (token, no connection)
//!   Closed ────────────────────────────────► Connecting
//!     ▲                                          │ transport connected
//!     │ logout: send logout, close,              │ → send register
//!     │ clear ws_token                           ▼
//!     └─────────────────────────────────────── Open
//!     ▲                                          │
//!     └──────── transport close / error ─────────┘
//! ```
//!
//! Every connection attempt gets a number. Signals tagged with an older
//! attempt (a connect that finished after logout, a reader reporting the
//! close we initiated) are ignored, and a superseded transport is closed
//! as soon as it reports in.
//!
//! # Reconnection
//!
//! Off by default. When enabled, an abnormal close while still logged in
//! schedules a reconnect with exponential backoff, reset after a successful
//! registration.

use crate::config::{ClientConfig, ReconnectPolicy};
use crate::error::{Result, TextdataError};
use crate::session::protocol::{parse_inbound, InboundMessage, OutboundMessage};
use crate::session::tokens::SessionTokens;
use crate::session::transport::{Connector, EventSink, TransportEvent, TransportHandle};
use crate::types::{AuthState, ConnectionState, Notification};
use ractor::{Actor, ActorProcessingErr, ActorRef, RpcReplyPort};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Capacity of the notification broadcast channel
const NOTIFICATION_CAPACITY: usize = 64;

/// Settings for the session actor
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Realtime endpoint
    pub url: String,
    /// Handshake timeout
    pub connect_timeout: Duration,
    /// Reconnect behavior
    pub reconnect: ReconnectPolicy,
}

impl From<&ClientConfig> for SessionConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            url: config.realtime_url.clone(),
            connect_timeout: config.connect_timeout(),
            reconnect: config.reconnect.clone(),
        }
    }
}

/// Point-in-time view of the actor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    /// Number of the current (or last) connection attempt
    pub attempt: u64,
    /// Token the open connection registered with
    pub registered_token: Option<String>,
}

/// Messages for the session actor
pub enum SessionMessage {
    /// The application observed a new auth state
    AuthChanged(AuthState),

    /// A connection attempt completed its handshake
    Connected {
        attempt: u64,
        handle: Box<dyn TransportHandle>,
    },

    /// A connection attempt failed or timed out
    ConnectFailed { attempt: u64, error: String },

    /// Signal from the transport of an attempt
    Transport { attempt: u64, event: TransportEvent },

    /// Backoff elapsed for a reconnect
    Reconnect { attempt: u64 },

    /// Query the current state
    GetState(RpcReplyPort<SessionSnapshot>),
}

/// Arguments for spawning the actor
pub struct SessionArgs {
    pub config: SessionConfig,
    pub connector: Arc<dyn Connector>,
    pub tokens: Arc<SessionTokens>,
    pub notifications: broadcast::Sender<Notification>,
}

/// Session actor state
pub struct SessionState {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    tokens: Arc<SessionTokens>,
    notifications: broadcast::Sender<Notification>,

    connection: ConnectionState,
    handle: Option<Box<dyn TransportHandle>>,
    attempt: u64,

    /// Last auth state observed
    auth: AuthState,

    /// Token sent in the register frame of the open connection
    session_token: Option<String>,

    /// Consecutive failed reconnects (backoff exponent)
    reconnect_failures: u32,
}

impl SessionState {
    fn new(args: SessionArgs) -> Self {
        Self {
            config: args.config,
            connector: args.connector,
            tokens: args.tokens,
            notifications: args.notifications,
            connection: ConnectionState::Closed,
            handle: None,
            attempt: 0,
            auth: AuthState::default(),
            session_token: None,
            reconnect_failures: 0,
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.connection,
            attempt: self.attempt,
            registered_token: self.session_token.clone(),
        }
    }
}

/// Session socket actor implementation
pub struct SessionSocketActor;

impl SessionSocketActor {
    async fn handle_auth_changed(
        myself: &ActorRef<SessionMessage>,
        state: &mut SessionState,
        auth: AuthState,
    ) {
        state.auth = auth;

        if state.auth.logged_in {
            if state.connection != ConnectionState::Closed {
                debug!("Login observed with connection {}; nothing to do", state.connection);
                return;
            }
            if state.auth.usable_token().is_none() {
                debug!("Login observed without a usable token; not connecting");
                return;
            }
            Self::open(myself, state);
        } else {
            // Runs even when already closed so the session token never outlives the login
            Self::close_gracefully(state).await;
        }
    }

    /// Closed → Connecting
    fn open(myself: &ActorRef<SessionMessage>, state: &mut SessionState) {
        state.attempt += 1;
        state.connection = ConnectionState::Connecting;

        let attempt = state.attempt;
        let url = state.config.url.clone();
        let timeout = state.config.connect_timeout;
        let connector = state.connector.clone();

        info!("Opening realtime connection to {} (attempt {})", url, attempt);

        let sink_ref = myself.clone();
        let events: EventSink = Arc::new(move |event| {
            let _ = sink_ref.cast(SessionMessage::Transport { attempt, event });
        });

        let reply_ref = myself.clone();
        tokio::spawn(async move {
            let message = match tokio::time::timeout(timeout, connector.connect(&url, events)).await
            {
                Ok(Ok(handle)) => SessionMessage::Connected { attempt, handle },
                Ok(Err(e)) => SessionMessage::ConnectFailed {
                    attempt,
                    error: e.to_string(),
                },
                Err(_) => SessionMessage::ConnectFailed {
                    attempt,
                    error: format!("connect timed out after {:?}", timeout),
                },
            };
            if reply_ref.cast(message).is_err() {
                debug!("Session actor gone before attempt {} completed", attempt);
            }
        });
    }

    /// Connecting → Open
    async fn handle_connected(
        myself: &ActorRef<SessionMessage>,
        state: &mut SessionState,
        attempt: u64,
        mut handle: Box<dyn TransportHandle>,
    ) {
        if attempt != state.attempt || state.connection != ConnectionState::Connecting {
            info!("Closing superseded connection (attempt {})", attempt);
            if let Err(e) = handle.close().await {
                debug!("Closing superseded connection failed: {}", e);
            }
            return;
        }

        info!("WebSocket connection established");

        let primary = match state.auth.usable_token() {
            Some(token) => token.to_string(),
            None => {
                warn!("Connected without a usable token; closing");
                let _ = handle.close().await;
                state.connection = ConnectionState::Closed;
                return;
            }
        };

        let token = match state.tokens.derive_ws_token(&primary) {
            Ok(token) => token,
            Err(e) => {
                warn!("Failed to derive session token: {}; using primary token", e);
                primary
            }
        };

        let register = OutboundMessage::Register {
            token: token.clone(),
        };
        let sent = match register.to_json() {
            Ok(frame) => handle.send_text(frame).await,
            Err(e) => Err(e),
        };

        match sent {
            Ok(()) => {
                info!("Registration message sent");
                state.connection = ConnectionState::Open;
                state.handle = Some(handle);
                state.session_token = Some(token);
                state.reconnect_failures = 0;
            }
            Err(e) => {
                warn!("Failed to send registration message: {}", e);
                let _ = handle.close().await;
                state.connection = ConnectionState::Closed;
                Self::schedule_reconnect(myself, state);
            }
        }
    }

    /// Any state → Closed on logout
    async fn close_gracefully(state: &mut SessionState) {
        info!("Logging out of realtime session (was {})", state.connection);

        // Anything still in flight for the old attempt is now stale
        state.attempt += 1;

        if let Some(mut handle) = state.handle.take() {
            let token = state
                .session_token
                .clone()
                .or_else(|| state.tokens.session_token());

            if let Some(token) = token {
                let logout = OutboundMessage::Logout { token };
                match logout.to_json() {
                    Ok(frame) => {
                        if let Err(e) = handle.send_text(frame).await {
                            warn!("Failed to send logout message: {}", e);
                        }
                    }
                    Err(e) => warn!("Failed to encode logout message: {}", e),
                }
            }

            if let Err(e) = handle.close().await {
                warn!("Failed to close realtime connection: {}", e);
            }
        }

        if let Err(e) = state.tokens.clear_ws_token() {
            warn!("Failed to clear session token: {}", e);
        }

        state.session_token = None;
        state.connection = ConnectionState::Closed;
        state.reconnect_failures = 0;
    }

    fn handle_transport_event(
        myself: &ActorRef<SessionMessage>,
        state: &mut SessionState,
        attempt: u64,
        event: TransportEvent,
    ) {
        if attempt != state.attempt {
            debug!("Ignoring event from stale attempt {}: {:?}", attempt, event);
            return;
        }

        match event {
            TransportEvent::Text(text) => match parse_inbound(&text) {
                Some(InboundMessage::Notification { data }) => {
                    info!("Notification received: {}", data.notify_msg);
                    // No subscribers is fine
                    let _ = state.notifications.send(data);
                }
                None => info!("Message from server: {}", text),
            },
            TransportEvent::Closed { code, reason } => {
                warn!(
                    "WebSocket connection closed (code: {:?}, reason: {})",
                    code, reason
                );
                Self::mark_closed(myself, state);
            }
            TransportEvent::Error(error) => {
                warn!("WebSocket error: {}", error);
                Self::mark_closed(myself, state);
            }
        }
    }

    /// Any state → Closed on a transport failure
    fn mark_closed(myself: &ActorRef<SessionMessage>, state: &mut SessionState) {
        state.connection = ConnectionState::Closed;
        state.handle = None;
        state.session_token = None;
        Self::schedule_reconnect(myself, state);
    }

    fn schedule_reconnect(myself: &ActorRef<SessionMessage>, state: &mut SessionState) {
        if !state.config.reconnect.enabled || !state.auth.logged_in {
            return;
        }

        let delay = state.config.reconnect.delay_for(state.reconnect_failures);
        state.reconnect_failures = state.reconnect_failures.saturating_add(1);

        let attempt = state.attempt;
        let actor = myself.clone();
        debug!("Reconnecting in {:?}", delay);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = actor.cast(SessionMessage::Reconnect { attempt });
        });
    }

    fn handle_reconnect(myself: &ActorRef<SessionMessage>, state: &mut SessionState, attempt: u64) {
        if attempt != state.attempt || state.connection != ConnectionState::Closed {
            debug!("Dropping stale reconnect for attempt {}", attempt);
            return;
        }
        if !state.auth.logged_in || state.auth.usable_token().is_none() {
            debug!("Logged out since the connection dropped; not reconnecting");
            return;
        }
        Self::open(myself, state);
    }
}

#[ractor::async_trait]
impl Actor for SessionSocketActor {
    type Msg = SessionMessage;
    type State = SessionState;
    type Arguments = SessionArgs;

    async fn pre_start(
        &self,
        _myself: ActorRef<Self::Msg>,
        args: Self::Arguments,
    ) -> std::result::Result<Self::State, ActorProcessingErr> {
        debug!("Session socket actor starting ({})", args.config.url);
        Ok(SessionState::new(args))
    }

    async fn handle(
        &self,
        myself: ActorRef<Self::Msg>,
        message: Self::Msg,
        state: &mut Self::State,
    ) -> std::result::Result<(), ActorProcessingErr> {
        match message {
            SessionMessage::AuthChanged(auth) => {
                Self::handle_auth_changed(&myself, state, auth).await;
            }
            SessionMessage::Connected { attempt, handle } => {
                Self::handle_connected(&myself, state, attempt, handle).await;
            }
            SessionMessage::ConnectFailed { attempt, error } => {
                if attempt == state.attempt && state.connection == ConnectionState::Connecting {
                    warn!("Realtime connection failed: {}", error);
                    Self::mark_closed(&myself, state);
                } else {
                    debug!("Ignoring failure of stale attempt {}: {}", attempt, error);
                }
            }
            SessionMessage::Transport { attempt, event } => {
                Self::handle_transport_event(&myself, state, attempt, event);
            }
            SessionMessage::Reconnect { attempt } => {
                Self::handle_reconnect(&myself, state, attempt);
            }
            SessionMessage::GetState(reply) => {
                let _ = reply.send(state.snapshot());
            }
        }

        Ok(())
    }

    async fn post_stop(
        &self,
        _myself: ActorRef<Self::Msg>,
        state: &mut Self::State,
    ) -> std::result::Result<(), ActorProcessingErr> {
        if let Some(mut handle) = state.handle.take() {
            let _ = handle.close().await;
        }
        debug!("Session socket actor stopped");
        Ok(())
    }
}

/// Handle to a running session actor
pub struct SessionSocket {
    actor: ActorRef<SessionMessage>,
    notifications: broadcast::Sender<Notification>,
    join: JoinHandle<()>,
}

impl SessionSocket {
    /// Spawn the actor in the `Closed` state
    pub async fn spawn(
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        tokens: Arc<SessionTokens>,
    ) -> Result<Self> {
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        let args = SessionArgs {
            config,
            connector,
            tokens,
            notifications: notifications.clone(),
        };

        let (actor, join) = Actor::spawn(None, SessionSocketActor, args)
            .await
            .map_err(|e| TextdataError::Session(format!("failed to spawn session actor: {}", e)))?;

        Ok(Self {
            actor,
            notifications,
            join,
        })
    }

    /// Push an auth transition to the actor
    pub fn auth_changed(&self, auth: AuthState) -> Result<()> {
        self.actor
            .cast(SessionMessage::AuthChanged(auth))
            .map_err(|_| TextdataError::Session("session actor is not running".to_string()))
    }

    pub fn login(&self, token: impl Into<String>) -> Result<()> {
        self.auth_changed(AuthState::logged_in(token))
    }

    pub fn logout(&self) -> Result<()> {
        self.auth_changed(AuthState::logged_out())
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot> {
        ractor::call!(self.actor, SessionMessage::GetState)
            .map_err(|_| TextdataError::Session("session actor did not answer".to_string()))
    }

    pub async fn state(&self) -> Result<ConnectionState> {
        Ok(self.snapshot().await?.state)
    }

    /// Wait until the actor reports `want`, polling up to `timeout`
    pub async fn wait_for(&self, want: ConnectionState, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.state().await? == want {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(TextdataError::Session(format!(
                    "timed out waiting for state {}",
                    want
                )));
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Receive notifications pushed by the service
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Stop the actor, closing any open transport without a logout frame
    pub async fn shutdown(self) {
        self.actor.stop(None);
        let _ = self.join.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const WAIT: Duration = Duration::from_secs(2);

    /// Records every frame and close in order
    #[derive(Default)]
    struct FakeConnector {
        log: Arc<Mutex<Vec<String>>>,
        opened: AtomicUsize,
        sinks: Mutex<Vec<EventSink>>,
        delay: Duration,
        fail: bool,
    }

    impl FakeConnector {
        fn delayed(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }

        fn log(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        fn emit(&self, event: TransportEvent) {
            let sink = self.sinks.lock().unwrap().last().cloned().expect("a transport");
            sink(event);
        }
    }

    struct FakeHandle {
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl TransportHandle for FakeHandle {
        async fn send_text(&mut self, text: String) -> Result<()> {
            self.log.lock().unwrap().push(text);
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            self.log.lock().unwrap().push("close".to_string());
            Ok(())
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        async fn connect(&self, _url: &str, events: EventSink) -> Result<Box<dyn TransportHandle>> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(TextdataError::Other("connection refused".to_string()));
            }
            self.sinks.lock().unwrap().push(events);
            Ok(Box::new(FakeHandle {
                log: self.log.clone(),
            }))
        }
    }

    fn config(reconnect: ReconnectPolicy) -> SessionConfig {
        SessionConfig {
            url: "ws://localhost:8090/".to_string(),
            connect_timeout: Duration::from_secs(1),
            reconnect,
        }
    }

    async fn spawn_with(
        connector: Arc<FakeConnector>,
        tokens: Arc<SessionTokens>,
        reconnect: ReconnectPolicy,
    ) -> SessionSocket {
        SessionSocket::spawn(config(reconnect), connector, tokens)
            .await
            .unwrap()
    }

    fn register(token: &str) -> String {
        OutboundMessage::Register {
            token: token.to_string(),
        }
        .to_json()
        .unwrap()
    }

    fn logout(token: &str) -> String {
        OutboundMessage::Logout {
            token: token.to_string(),
        }
        .to_json()
        .unwrap()
    }

    #[tokio::test]
    async fn test_login_opens_and_registers() {
        let connector = Arc::new(FakeConnector::default());
        let tokens = Arc::new(SessionTokens::in_memory());
        let socket = spawn_with(connector.clone(), tokens.clone(), ReconnectPolicy::default()).await;

        assert_eq!(socket.state().await.unwrap(), ConnectionState::Closed);
        socket.login("T1").unwrap();
        socket.wait_for(ConnectionState::Open, WAIT).await.unwrap();

        assert_eq!(connector.opened.load(Ordering::SeqCst), 1);
        assert_eq!(connector.log(), vec![register("T1")]);
        assert_eq!(tokens.session_token().as_deref(), Some("T1"));
        assert_eq!(
            socket.snapshot().await.unwrap().registered_token.as_deref(),
            Some("T1")
        );

        socket.shutdown().await;
    }

    #[tokio::test]
    async fn test_register_uses_existing_session_token() {
        let connector = Arc::new(FakeConnector::default());
        let tokens = Arc::new(SessionTokens::in_memory());
        tokens.derive_ws_token("EARLIER").unwrap();

        let socket = spawn_with(connector.clone(), tokens, ReconnectPolicy::default()).await;
        socket.login("T1").unwrap();
        socket.wait_for(ConnectionState::Open, WAIT).await.unwrap();

        assert_eq!(connector.log(), vec![register("EARLIER")]);
        socket.shutdown().await;
    }

    #[tokio::test]
    async fn test_logout_sends_logout_before_close() {
        let connector = Arc::new(FakeConnector::default());
        let tokens = Arc::new(SessionTokens::in_memory());
        let socket = spawn_with(connector.clone(), tokens.clone(), ReconnectPolicy::default()).await;

        socket.login("T1").unwrap();
        socket.wait_for(ConnectionState::Open, WAIT).await.unwrap();
        socket.logout().unwrap();
        socket.wait_for(ConnectionState::Closed, WAIT).await.unwrap();

        assert_eq!(
            connector.log(),
            vec![register("T1"), logout("T1"), "close".to_string()]
        );
        assert_eq!(tokens.session_token(), None);
        assert_eq!(socket.snapshot().await.unwrap().registered_token, None);

        socket.shutdown().await;
    }

    #[tokio::test]
    async fn test_rapid_logins_open_one_transport() {
        let connector = Arc::new(FakeConnector::delayed(Duration::from_millis(50)));
        let tokens = Arc::new(SessionTokens::in_memory());
        let socket = spawn_with(connector.clone(), tokens, ReconnectPolicy::default()).await;

        socket.login("T1").unwrap();
        socket.login("T1").unwrap();
        socket.login("T1").unwrap();
        socket.wait_for(ConnectionState::Open, WAIT).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(connector.opened.load(Ordering::SeqCst), 1);
        assert_eq!(connector.log(), vec![register("T1")]);

        socket.shutdown().await;
    }

    #[tokio::test]
    async fn test_login_without_token_stays_closed() {
        let connector = Arc::new(FakeConnector::default());
        let socket = spawn_with(
            connector.clone(),
            Arc::new(SessionTokens::in_memory()),
            ReconnectPolicy::default(),
        )
        .await;

        socket
            .auth_changed(AuthState {
                logged_in: true,
                token: None,
            })
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(socket.state().await.unwrap(), ConnectionState::Closed);
        assert_eq!(connector.opened.load(Ordering::SeqCst), 0);

        socket.shutdown().await;
    }

    #[tokio::test]
    async fn test_logout_while_connecting_discards_late_connection() {
        let connector = Arc::new(FakeConnector::delayed(Duration::from_millis(100)));
        let tokens = Arc::new(SessionTokens::in_memory());
        let socket = spawn_with(connector.clone(), tokens.clone(), ReconnectPolicy::default()).await;

        socket.login("T1").unwrap();
        socket.wait_for(ConnectionState::Connecting, WAIT).await.unwrap();
        socket.logout().unwrap();
        socket.wait_for(ConnectionState::Closed, WAIT).await.unwrap();

        // The late transport is closed without registering
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(connector.log(), vec!["close".to_string()]);
        assert_eq!(socket.state().await.unwrap(), ConnectionState::Closed);
        assert_eq!(tokens.session_token(), None);

        socket.shutdown().await;
    }

    #[tokio::test]
    async fn test_transport_close_without_reconnect() {
        let connector = Arc::new(FakeConnector::default());
        let socket = spawn_with(
            connector.clone(),
            Arc::new(SessionTokens::in_memory()),
            ReconnectPolicy::default(),
        )
        .await;

        socket.login("T1").unwrap();
        socket.wait_for(ConnectionState::Open, WAIT).await.unwrap();

        connector.emit(TransportEvent::Closed {
            code: Some(1006),
            reason: "abnormal".to_string(),
        });
        socket.wait_for(ConnectionState::Closed, WAIT).await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(connector.opened.load(Ordering::SeqCst), 1);

        // A fresh login is needed to connect again
        socket.login("T1").unwrap();
        socket.wait_for(ConnectionState::Open, WAIT).await.unwrap();
        assert_eq!(connector.opened.load(Ordering::SeqCst), 2);

        socket.shutdown().await;
    }

    #[tokio::test]
    async fn test_logout_after_abnormal_close_clears_session_token() {
        let connector = Arc::new(FakeConnector::default());
        let tokens = Arc::new(SessionTokens::in_memory());
        let socket = spawn_with(connector.clone(), tokens.clone(), ReconnectPolicy::default()).await;

        socket.login("T1").unwrap();
        socket.wait_for(ConnectionState::Open, WAIT).await.unwrap();

        connector.emit(TransportEvent::Closed {
            code: Some(1006),
            reason: "abnormal".to_string(),
        });
        socket.wait_for(ConnectionState::Closed, WAIT).await.unwrap();

        socket.logout().unwrap();
        // The snapshot round trip orders after the logout message
        assert_eq!(socket.state().await.unwrap(), ConnectionState::Closed);
        assert_eq!(tokens.session_token(), None);

        socket.login("T2").unwrap();
        socket.wait_for(ConnectionState::Open, WAIT).await.unwrap();

        // No handle existed at logout, so no logout frame or close was issued
        assert_eq!(connector.log(), vec![register("T1"), register("T2")]);
        assert_eq!(tokens.session_token().as_deref(), Some("T2"));

        socket.shutdown().await;
    }

    #[tokio::test]
    async fn test_register_uses_token_as_given() {
        let connector = Arc::new(FakeConnector::default());
        let socket = spawn_with(
            connector.clone(),
            Arc::new(SessionTokens::in_memory()),
            ReconnectPolicy::default(),
        )
        .await;

        socket.login(" T1 ").unwrap();
        socket.wait_for(ConnectionState::Open, WAIT).await.unwrap();
        assert_eq!(connector.log(), vec![register(" T1 ")]);

        socket.shutdown().await;
    }

    #[tokio::test]
    async fn test_transport_error_reconnects_when_enabled() {
        let connector = Arc::new(FakeConnector::default());
        let socket = spawn_with(
            connector.clone(),
            Arc::new(SessionTokens::in_memory()),
            ReconnectPolicy {
                enabled: true,
                initial_delay_secs: 1,
                max_delay_secs: 1,
            },
        )
        .await;

        socket.login("T1").unwrap();
        socket.wait_for(ConnectionState::Open, WAIT).await.unwrap();

        connector.emit(TransportEvent::Error("reset by peer".to_string()));
        socket.wait_for(ConnectionState::Closed, WAIT).await.unwrap();
        socket
            .wait_for(ConnectionState::Open, Duration::from_secs(3))
            .await
            .unwrap();

        assert_eq!(connector.opened.load(Ordering::SeqCst), 2);
        assert_eq!(connector.log(), vec![register("T1"), register("T1")]);

        socket.shutdown().await;
    }

    #[tokio::test]
    async fn test_connect_failure_closes() {
        let connector = Arc::new(FakeConnector {
            fail: true,
            ..Default::default()
        });
        let socket = spawn_with(
            connector.clone(),
            Arc::new(SessionTokens::in_memory()),
            ReconnectPolicy::default(),
        )
        .await;

        socket.login("T1").unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        socket.wait_for(ConnectionState::Closed, WAIT).await.unwrap();
        assert_eq!(connector.opened.load(Ordering::SeqCst), 1);
        assert!(connector.log().is_empty());

        socket.shutdown().await;
    }

    #[tokio::test]
    async fn test_notifications_are_broadcast() {
        let connector = Arc::new(FakeConnector::default());
        let socket = spawn_with(
            connector.clone(),
            Arc::new(SessionTokens::in_memory()),
            ReconnectPolicy::default(),
        )
        .await;
        let mut rx = socket.subscribe();

        socket.login("T1").unwrap();
        socket.wait_for(ConnectionState::Open, WAIT).await.unwrap();

        connector.emit(TransportEvent::Text(r#"{"type":"hello"}"#.to_string()));
        connector.emit(TransportEvent::Text(
            r#"{"type":"notification","data":{"notify_msg":"New reply","notify_timestamp":"2024-03-01T10:00:00","notify_type":"reply","notify_read":false,"notify_delivered":false}}"#
                .to_string(),
        ));

        let notification = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(notification.notify_msg, "New reply");
        assert_eq!(socket.state().await.unwrap(), ConnectionState::Open);

        socket.shutdown().await;
    }
}
