//! Token lifecycle management with automatic refresh
//!
//! The TokenManager owns the access/refresh token pair, decides when the
//! access token is usable, refreshes it against the backend with
//! single-flight de-duplication and bounded retry, and schedules a proactive
//! renewal ahead of expiry. When retries are exhausted or the refresh token
//! itself has expired it clears the record and reports the session as
//! terminally expired.

use super::token_store::TokenStore;
use super::types::{
    AuthError, AuthResult, RefreshRequest, TokenConfig, TokenPair, TokenResponse,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type SessionExpiredCallback = Arc<dyn Fn() + Send + Sync>;

/// Mutable token state guarded by the manager
struct TokenState {
    tokens: Option<TokenPair>,
    failed_refresh_attempts: u32,
    /// Bumped on every record transition; lets refresh callers that waited
    /// on the gate tell "someone settled this already" from "the record I
    /// saw is still current".
    generation: u64,
}

struct Inner {
    http: reqwest::Client,
    refresh_url: String,
    config: TokenConfig,
    store: Option<TokenStore>,
    state: RwLock<TokenState>,
    /// Single-flight gate: at most one physical refresh runs at a time.
    /// Late arrivals block here, then re-check the record.
    refresh_gate: Mutex<()>,
    refreshing: AtomicBool,
    renewal_task: StdMutex<Option<JoinHandle<()>>>,
    on_session_expired: StdMutex<Option<SessionExpiredCallback>>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.renewal_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

/// Manages the token pair with automatic refresh and proactive renewal
#[derive(Clone)]
pub struct TokenManager {
    inner: Arc<Inner>,
}

impl TokenManager {
    /// Create an empty in-memory manager for the given backend base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_config(base_url, TokenConfig::default())
    }

    /// Create an empty in-memory manager with custom lifecycle configuration
    pub fn with_config(base_url: impl Into<String>, config: TokenConfig) -> Self {
        Self::build(base_url.into(), config, None)
    }

    /// Create a manager backed by the default on-disk token store,
    /// loading any record persisted by a previous session
    pub async fn new_file_based(base_url: impl Into<String>) -> AuthResult<Self> {
        let store = TokenStore::new(super::types::get_sdk_data_dir()?)?;
        Self::with_store(base_url, TokenConfig::default(), store).await
    }

    /// Create a manager backed by a specific token store
    pub async fn with_store(
        base_url: impl Into<String>,
        config: TokenConfig,
        store: TokenStore,
    ) -> AuthResult<Self> {
        let loaded = store.load().await?;
        let manager = Self::build(base_url.into(), config, Some(store));

        if let Some(pair) = loaded {
            debug!("restored persisted token record");
            manager.inner.state.write().await.tokens = Some(pair);
            manager.schedule_proactive_renewal().await;
        }

        Ok(manager)
    }

    fn build(base_url: String, config: TokenConfig, store: Option<TokenStore>) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            inner: Arc::new(Inner {
                http: reqwest::Client::new(),
                refresh_url: format!("{}{}", base, crate::routes::AUTH_REFRESH),
                config,
                store,
                state: RwLock::new(TokenState {
                    tokens: None,
                    failed_refresh_attempts: 0,
                    generation: 0,
                }),
                refresh_gate: Mutex::new(()),
                refreshing: AtomicBool::new(false),
                renewal_task: StdMutex::new(None),
                on_session_expired: StdMutex::new(None),
            }),
        }
    }

    /// Accept a new token pair from a login or refresh response.
    ///
    /// Fails with [`AuthError::InvalidToken`] when either expiry is not in
    /// the future; an expired pair is never stored. On success the record is
    /// persisted, the failure counter resets, and the proactive renewal
    /// timer is re-armed against the new expiry.
    pub async fn set_tokens(&self, response: TokenResponse) -> AuthResult<()> {
        let pair = TokenPair::from_response(&response)?;

        {
            let mut state = self.inner.state.write().await;
            state.tokens = Some(pair.clone());
            state.failed_refresh_attempts = 0;
            state.generation += 1;
        }

        if let Some(store) = &self.inner.store {
            // The in-memory record is authoritative; the store is a mirror
            // for restart survival.
            if let Err(err) = store.store(&pair).await {
                warn!("failed to persist token record: {err}");
            }
        }

        debug!("token pair accepted");
        self.schedule_proactive_renewal().await;
        Ok(())
    }

    /// Get a usable access token, refreshing first when the stored one is
    /// inside the proactive buffer or expired.
    ///
    /// Returns `Ok(None)` when no record exists; whether that is an error is
    /// the caller's decision.
    pub async fn get_access_token(&self) -> AuthResult<Option<String>> {
        let buffer = self.inner.config.refresh_buffer;
        {
            let state = self.inner.state.read().await;
            match &state.tokens {
                None => {
                    debug!("no access token available");
                    return Ok(None);
                }
                Some(pair) if !pair.within_refresh_buffer(buffer) => {
                    return Ok(Some(pair.access.clone()));
                }
                Some(_) => {}
            }
        }

        let _gate = self.inner.refresh_gate.lock().await;

        // Re-check under the gate: another caller may have renewed or
        // terminally expired the record while this task waited.
        {
            let state = self.inner.state.read().await;
            match &state.tokens {
                None => return Err(AuthError::SessionExpired),
                Some(pair) if !pair.within_refresh_buffer(buffer) => {
                    return Ok(Some(pair.access.clone()));
                }
                Some(_) => {}
            }
        }

        self.run_refresh_locked().await.map(Some)
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// Single-flight: while a refresh is in progress every additional caller
    /// waits for it and observes the same outcome instead of issuing a
    /// second request. Transient failures are retried with a fixed backoff
    /// up to the configured maximum; exhaustion or an expired refresh token
    /// clears the record, notifies the session-expired callback, and returns
    /// [`AuthError::SessionExpired`].
    pub async fn refresh_access_token(&self) -> AuthResult<String> {
        let entered_at = self.inner.state.read().await.generation;

        let _gate = self.inner.refresh_gate.lock().await;

        // A concurrent caller may have settled the refresh while this task
        // waited on the gate; observe its outcome instead of refreshing
        // again.
        {
            let state = self.inner.state.read().await;
            if state.generation != entered_at {
                return match &state.tokens {
                    Some(pair) if pair.access_valid() => Ok(pair.access.clone()),
                    _ => Err(AuthError::SessionExpired),
                };
            }
        }

        self.run_refresh_locked().await
    }

    /// Run the refresh loop; the caller must hold the refresh gate.
    async fn run_refresh_locked(&self) -> AuthResult<String> {
        self.inner.refreshing.store(true, Ordering::SeqCst);
        let result = self.perform_refresh().await;
        self.inner.refreshing.store(false, Ordering::SeqCst);
        result
    }

    /// Bounded retry loop around the physical refresh call.
    ///
    /// Runs with the refresh gate held. Exits on success, on attempt-count
    /// exhaustion, or on refresh-token expiry discovered mid-loop.
    async fn perform_refresh(&self) -> AuthResult<String> {
        loop {
            // Precondition: a live refresh token must exist before any
            // network attempt. The read guard must be released before
            // escalating, which takes the write lock on the same state.
            let refresh_token = {
                let state = self.inner.state.read().await;
                match &state.tokens {
                    Some(pair) if pair.refresh_valid() => Some(pair.refresh.clone()),
                    _ => None,
                }
            };
            let Some(refresh_token) = refresh_token else {
                warn!("no valid refresh token available");
                return Err(self.escalate_session_expired().await);
            };

            match self.request_refresh(&refresh_token).await {
                Ok(response) => {
                    let access = response.access.clone();
                    match self.set_tokens(response).await {
                        Ok(()) => {
                            info!("access token refreshed");
                            return Ok(access);
                        }
                        // The backend answered 2xx with an unusable pair;
                        // treat it like any other failed attempt.
                        Err(err) => {
                            if self.note_failed_attempt(&err).await {
                                return Err(self.escalate_session_expired().await);
                            }
                        }
                    }
                }
                Err(err) => {
                    if self.note_failed_attempt(&err).await {
                        return Err(self.escalate_session_expired().await);
                    }
                }
            }

            tokio::time::sleep(self.inner.config.retry_delay).await;
        }
    }

    /// Record a failed attempt; returns true when retries are exhausted
    async fn note_failed_attempt(&self, err: &AuthError) -> bool {
        let attempts = {
            let mut state = self.inner.state.write().await;
            state.failed_refresh_attempts += 1;
            state.failed_refresh_attempts
        };
        warn!(
            attempt = attempts,
            max = self.inner.config.max_refresh_retries,
            "token refresh attempt failed: {err}"
        );
        attempts >= self.inner.config.max_refresh_retries
    }

    /// Physical refresh call against the auth endpoint
    async fn request_refresh(&self, refresh_token: &str) -> AuthResult<TokenResponse> {
        debug!("refreshing access token");

        let response = self
            .inner
            .http
            .post(&self.inner.refresh_url)
            .json(&RefreshRequest {
                refresh: refresh_token,
            })
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(format!("token refresh request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::NetworkError(format!(
                "token refresh failed with status {status}: {body}"
            )));
        }

        response
            .json::<TokenResponse>()
            .await
            .map_err(|e| AuthError::InvalidResponse(format!("failed to parse token response: {e}")))
    }

    /// Terminal expiration: clear the record and notify the registered
    /// callback.
    ///
    /// A terminal event is the transition from a set record to the empty
    /// one, so the callback fires exactly once per expiration even when
    /// several callers observe the failure.
    async fn escalate_session_expired(&self) -> AuthError {
        let had_tokens = {
            let mut state = self.inner.state.write().await;
            let had = state.tokens.take().is_some();
            state.failed_refresh_attempts = 0;
            if had {
                state.generation += 1;
            }
            had
        };

        self.cancel_renewal_timer();

        if let Some(store) = &self.inner.store {
            if let Err(err) = store.clear().await {
                warn!("failed to clear persisted token record: {err}");
            }
        }

        if had_tokens {
            warn!("authentication session expired");
            // Clone the handler out of the guard before invoking it; a
            // callback that re-registers must not deadlock on the slot lock.
            let callback = self
                .inner
                .on_session_expired
                .lock()
                .ok()
                .and_then(|slot| slot.clone());
            if let Some(callback) = callback {
                callback();
            }
        }

        AuthError::SessionExpired
    }

    /// Arm the one-shot proactive renewal for the current record.
    ///
    /// Cancels any previously armed timer first, so at most one pending
    /// timer exists and it always reflects the most recently accepted
    /// expiry. No-op when the record is empty.
    // Returns a boxed future (rather than being an `async fn`) because this
    // function is indirectly recursive through the spawned renewal task;
    // boxing breaks the `Send` auto-trait inference cycle.
    pub fn schedule_proactive_renewal(
        &self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        Box::pin(self.schedule_proactive_renewal_inner())
    }

    async fn schedule_proactive_renewal_inner(&self) {
        let delay = {
            let state = self.inner.state.read().await;
            match &state.tokens {
                Some(pair) => pair.renewal_delay(self.inner.config.refresh_buffer),
                None => return,
            }
        };

        debug!(delay_secs = delay.as_secs(), "scheduling token renewal");

        let weak = Arc::downgrade(&self.inner);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let Some(inner) = weak.upgrade() else { return };
            // Run the renewal in its own task: the success path re-arms the
            // timer, and re-arming must never abort a live refresh. Going
            // through the staleness check means a record another caller
            // renewed in the meantime is not refreshed a second time.
            tokio::spawn(async move {
                let manager = TokenManager { inner };
                if let Err(err) = manager.get_access_token().await {
                    warn!("scheduled token refresh failed: {err}");
                }
            });
        });

        let previous = self
            .inner
            .renewal_task
            .lock()
            .map(|mut slot| slot.replace(handle))
            .unwrap_or(None);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn cancel_renewal_timer(&self) {
        if let Ok(mut slot) = self.inner.renewal_task.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }

    /// Reset the record to empty and cancel any pending renewal; idempotent
    pub async fn clear_tokens(&self) {
        {
            let mut state = self.inner.state.write().await;
            if state.tokens.take().is_some() {
                state.generation += 1;
            }
            state.failed_refresh_attempts = 0;
        }

        self.cancel_renewal_timer();

        if let Some(store) = &self.inner.store {
            if let Err(err) = store.clear().await {
                warn!("failed to clear persisted token record: {err}");
            }
        }

        debug!("token record cleared");
    }

    /// Register the callback invoked once per terminal expiration event
    pub fn on_session_expired(&self, callback: impl Fn() + Send + Sync + 'static) {
        if let Ok(mut slot) = self.inner.on_session_expired.lock() {
            *slot = Some(Arc::new(callback));
        }
    }

    /// `Authorization` header decoration for outgoing API requests, or
    /// `None` when no token is available
    pub async fn authorization_header(&self) -> AuthResult<Option<(&'static str, String)>> {
        Ok(self
            .get_access_token()
            .await?
            .map(|token| ("Authorization", format!("Bearer {token}"))))
    }

    /// Check whether a currently valid access token is held
    pub async fn is_authenticated(&self) -> bool {
        let state = self.inner.state.read().await;
        state
            .tokens
            .as_ref()
            .map(|pair| pair.access_valid())
            .unwrap_or(false)
    }

    /// Whether a physical refresh is in flight right now
    pub fn is_refreshing(&self) -> bool {
        self.inner.refreshing.load(Ordering::SeqCst)
    }

    /// Whether a proactive renewal timer is currently armed
    pub fn has_pending_renewal(&self) -> bool {
        self.inner
            .renewal_task
            .lock()
            .map(|slot| slot.as_ref().map(|h| !h.is_finished()).unwrap_or(false))
            .unwrap_or(false)
    }

    /// Consecutive failed refresh attempts since the last success
    pub async fn failed_refresh_attempts(&self) -> u32 {
        self.inner.state.read().await.failed_refresh_attempts
    }

    /// Snapshot of the current record, if any
    pub async fn current_tokens(&self) -> Option<TokenPair> {
        self.inner.state.read().await.tokens.clone()
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("refresh_url", &self.inner.refresh_url)
            .field("refreshing", &self.is_refreshing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::types::now_epoch;

    // Base URL that is never contacted by these tests.
    const UNREACHABLE: &str = "http://127.0.0.1:9";

    fn response(access_offset: i64, refresh_offset: i64) -> TokenResponse {
        let now = now_epoch() as i64;
        TokenResponse {
            access: "a1".to_string(),
            refresh: "r1".to_string(),
            access_expiry: (now + access_offset).to_string(),
            refresh_expiry: (now + refresh_offset).to_string(),
        }
    }

    #[tokio::test]
    async fn set_then_get_returns_token_without_refresh() {
        let manager = TokenManager::new(UNREACHABLE);
        manager.set_tokens(response(3600, 86400)).await.unwrap();

        let token = manager.get_access_token().await.unwrap();
        assert_eq!(token.as_deref(), Some("a1"));
        assert!(manager.is_authenticated().await);
        assert_eq!(manager.failed_refresh_attempts().await, 0);
    }

    #[tokio::test]
    async fn rejects_expired_pair_and_keeps_previous_record() {
        let manager = TokenManager::new(UNREACHABLE);
        manager.set_tokens(response(3600, 86400)).await.unwrap();

        let err = manager
            .set_tokens(response(-10, 86400))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));

        // The stored record is unchanged.
        let token = manager.get_access_token().await.unwrap();
        assert_eq!(token.as_deref(), Some("a1"));
    }

    #[tokio::test]
    async fn get_without_record_is_none() {
        let manager = TokenManager::new(UNREACHABLE);
        assert_eq!(manager.get_access_token().await.unwrap(), None);
        assert!(!manager.is_authenticated().await);
    }

    #[tokio::test]
    async fn clear_then_get_is_none_and_idempotent() {
        let manager = TokenManager::new(UNREACHABLE);
        manager.set_tokens(response(3600, 86400)).await.unwrap();

        manager.clear_tokens().await;
        manager.clear_tokens().await;

        assert_eq!(manager.get_access_token().await.unwrap(), None);
        assert!(!manager.has_pending_renewal());
    }

    #[tokio::test]
    async fn set_tokens_arms_renewal_timer() {
        let manager = TokenManager::new(UNREACHABLE);
        manager.set_tokens(response(3600, 86400)).await.unwrap();
        assert!(manager.has_pending_renewal());
    }

    #[tokio::test]
    async fn callback_may_reregister_without_deadlock() {
        use std::sync::atomic::AtomicUsize;
        use std::time::Duration;

        let manager = TokenManager::new(UNREACHABLE);
        manager.set_tokens(response(3600, 1)).await.unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let handle = manager.clone();
        manager.on_session_expired(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            let next = counter.clone();
            handle.on_session_expired(move || {
                next.fetch_add(1, Ordering::SeqCst);
            });
        });

        // Let the refresh token lapse so the refresh escalates terminally.
        tokio::time::sleep(Duration::from_millis(1100)).await;
        let err = manager.refresh_access_token().await.unwrap_err();
        assert!(matches!(err, AuthError::SessionExpired));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn refresh_with_empty_record_is_terminal_without_callback() {
        let manager = TokenManager::new(UNREACHABLE);

        let fired = Arc::new(AtomicBool::new(false));
        let flag = fired.clone();
        manager.on_session_expired(move || flag.store(true, Ordering::SeqCst));

        let err = manager.refresh_access_token().await.unwrap_err();
        assert!(matches!(err, AuthError::SessionExpired));
        // An already-empty record cannot expire again.
        assert!(!fired.load(Ordering::SeqCst));
    }
}
