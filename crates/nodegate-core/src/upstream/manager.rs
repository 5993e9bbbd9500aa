use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::{
    atomic::{AtomicU64, AtomicU8, Ordering},
    Arc,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::{
    cache::{CacheKey, ImmutableCache},
    types::{Credentials, Endpoint, RpcMethod, WELCOME_MESSAGE},
    upstream::{
        client::{NodeClient, NodeConnector},
        errors::{ClassifiedError, UpstreamError},
    },
};

/// Externally visible lifecycle state of the upstream session.
///
/// `Connecting` is only observable for the duration of a single connect call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

/// One authenticated, probed connection to the node.
struct Session {
    id: u64,
    endpoint: Endpoint,
    credentials: Credentials,
    client: Arc<dyn NodeClient>,
    connected_at: DateTime<Utc>,
}

/// Summary of the active session for health reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub endpoint: Endpoint,
    pub username: String,
    pub connected_at: DateTime<Utc>,
}

/// The single session slot. Absence of a session is not a dereferenceable value.
enum SessionSlot {
    Disconnected,
    Connected(Arc<Session>),
}

/// Resets the published state to `Disconnected` unless disarmed.
///
/// Covers a connect future dropped mid-probe, which would otherwise leave the state stuck at
/// `Connecting`.
struct ConnectingGuard<'a> {
    state: &'a AtomicU8,
    armed: bool,
}

impl<'a> ConnectingGuard<'a> {
    fn new(state: &'a AtomicU8) -> Self {
        state.store(ConnectionState::Connecting as u8, Ordering::Release);
        Self { state, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ConnectingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.state.store(ConnectionState::Disconnected as u8, Ordering::Release);
        }
    }
}

/// Owns the upstream session and mediates every upstream call.
///
/// # Thread Safety
///
/// The session slot sits behind a single `RwLock`. `connect` and `disconnect` take the write
/// lock for their whole duration (acquire, probe, install), so two connects can never race to
/// install different sessions. `invoke` clones the session handle under the read lock and
/// releases it before calling the node, so queries run in parallel.
///
/// The published [`ConnectionState`] is mirrored in an atomic that is only written while the
/// write lock is held, so [`is_connected`](Self::is_connected) never waits.
pub struct ConnectionManager {
    connector: Arc<dyn NodeConnector>,
    cache: Arc<ImmutableCache>,
    slot: RwLock<SessionSlot>,
    state: AtomicU8,
    next_session_id: AtomicU64,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(connector: Arc<dyn NodeConnector>, cache: Arc<ImmutableCache>) -> Self {
        Self {
            connector,
            cache,
            slot: RwLock::new(SessionSlot::Disconnected),
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            next_session_id: AtomicU64::new(1),
        }
    }

    /// Opens a session against `endpoint`, or returns immediately if one is already open.
    ///
    /// An existing session is kept as is: no probe, and `endpoint`/`credentials` are ignored.
    /// Switching nodes requires an explicit [`disconnect`](Self::disconnect) first.
    ///
    /// # Errors
    ///
    /// Returns the classified probe failure. The state is `Disconnected` afterwards.
    pub async fn connect(
        &self,
        endpoint: Endpoint,
        credentials: Credentials,
    ) -> Result<&'static str, ClassifiedError> {
        let mut slot = self.slot.write().await;

        if let SessionSlot::Connected(session) = &*slot {
            debug!(
                active = %session.endpoint,
                requested = %endpoint,
                "already connected, keeping existing session"
            );
            return Ok(WELCOME_MESSAGE);
        }

        let guard = ConnectingGuard::new(&self.state);
        info!(endpoint = %endpoint, username = %credentials.username, "connecting to node");

        match self.open_session(endpoint.clone(), credentials).await {
            Ok(session) => {
                info!(endpoint = %endpoint, session_id = session.id, "connected to node");
                *slot = SessionSlot::Connected(Arc::new(session));
                self.state.store(ConnectionState::Connected as u8, Ordering::Release);
                guard.disarm();
                Ok(WELCOME_MESSAGE)
            }
            Err(raw) => {
                drop(guard);
                let classified = ClassifiedError::classify(raw);
                warn!(
                    endpoint = %endpoint,
                    kind = classified.kind.as_str(),
                    code = %classified.detail.code(),
                    error = %classified.detail,
                    "connect failed"
                );
                Err(classified)
            }
        }
    }

    /// Builds a candidate session and probes it. Nothing is installed here.
    async fn open_session(
        &self,
        endpoint: Endpoint,
        credentials: Credentials,
    ) -> Result<Session, UpstreamError> {
        let client = self.connector.build(&endpoint, &credentials)?;
        client.call(RpcMethod::GetBlockchainInfo, json!([])).await?;

        Ok(Session {
            id: self.next_session_id.fetch_add(1, Ordering::Relaxed),
            endpoint,
            credentials,
            client,
            connected_at: Utc::now(),
        })
    }

    /// Drops the session, if any, and clears the cache. Always succeeds.
    pub async fn disconnect(&self) {
        let mut slot = self.slot.write().await;
        let previous = std::mem::replace(&mut *slot, SessionSlot::Disconnected);
        self.state.store(ConnectionState::Disconnected as u8, Ordering::Release);
        self.cache.clear();

        match previous {
            SessionSlot::Connected(session) => {
                info!(endpoint = %session.endpoint, session_id = session.id, "disconnected");
            }
            SessionSlot::Disconnected => debug!("disconnect requested while not connected"),
        }
    }

    /// Returns `true` once a probed session is installed.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Returns a summary of the active session without waiting on an in-flight connect.
    #[must_use]
    pub fn session_info(&self) -> Option<SessionInfo> {
        let slot = self.slot.try_read().ok()?;
        match &*slot {
            SessionSlot::Connected(session) => Some(SessionInfo {
                endpoint: session.endpoint.clone(),
                username: session.credentials.username.clone(),
                connected_at: session.connected_at,
            }),
            SessionSlot::Disconnected => None,
        }
    }

    /// Forwards a call to the active session.
    ///
    /// # Errors
    ///
    /// Returns a `NotConnected` classified error if no session is installed, otherwise the
    /// classified upstream failure. A credential rejection also tears the session down.
    pub async fn invoke(&self, method: RpcMethod, params: Value) -> Result<Value, ClassifiedError> {
        self.invoke_on_session(method, params).await.map(|(value, _)| value)
    }

    /// Forwards a call like [`invoke`](Self::invoke) and stores the reply under `key` when
    /// `is_final` holds for it.
    ///
    /// The reply is stored only while the session that produced it is still installed. The
    /// check and the insert happen under the slot's read lock, and every session change
    /// clears the cache under the write lock, so a reply never outlives its session.
    ///
    /// # Errors
    ///
    /// Same as [`invoke`](Self::invoke).
    pub async fn invoke_and_cache(
        &self,
        key: CacheKey,
        method: RpcMethod,
        params: Value,
        is_final: impl FnOnce(&Value) -> bool,
    ) -> Result<Value, ClassifiedError> {
        let (value, session_id) = self.invoke_on_session(method, params).await?;

        if is_final(&value) {
            let slot = self.slot.read().await;
            if matches!(&*slot, SessionSlot::Connected(session) if session.id == session_id) {
                self.cache.put(key, value.clone());
            } else {
                debug!(key = %key, session_id, "session changed during call, reply not cached");
            }
        }

        Ok(value)
    }

    /// Calls the installed session and reports which session served the reply.
    async fn invoke_on_session(
        &self,
        method: RpcMethod,
        params: Value,
    ) -> Result<(Value, u64), ClassifiedError> {
        let session = {
            let slot = self.slot.read().await;
            match &*slot {
                SessionSlot::Connected(session) => Arc::clone(session),
                SessionSlot::Disconnected => return Err(ClassifiedError::not_connected()),
            }
        };

        debug!(method = %method, session_id = session.id, "invoking upstream");

        match session.client.call(method, params).await {
            Ok(value) => Ok((value, session.id)),
            Err(raw) => {
                if raw.is_session_loss() {
                    self.drop_session(session.id).await;
                }
                let classified = ClassifiedError::classify(raw);
                warn!(
                    method = %method,
                    kind = classified.kind.as_str(),
                    code = %classified.detail.code(),
                    error = %classified.detail,
                    "upstream call failed"
                );
                Err(classified)
            }
        }
    }

    /// Tears down session `id` if it is still the installed one.
    async fn drop_session(&self, id: u64) {
        let mut slot = self.slot.write().await;
        let is_current = matches!(&*slot, SessionSlot::Connected(session) if session.id == id);
        if !is_current {
            return;
        }

        *slot = SessionSlot::Disconnected;
        self.state.store(ConnectionState::Disconnected as u8, Ordering::Release);
        self.cache.clear();
        warn!(session_id = id, "node rejected session credentials, session dropped");
    }
}
