//! Session Store: the one piece of process-wide mutable state.
//!
//! Holds the admin bearer token and its expiry, mirrors both into the
//! persisted key-value store, and evicts the token when it expires, either
//! lazily on `get()` or from a one-shot timer task. Both eviction paths run
//! the same code as an explicit `clear()`.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::storage::{KeyValueStore, ACCESS_TOKEN_EXPIRY_KEY, ACCESS_TOKEN_KEY};

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

struct Inner {
    clock: Arc<dyn Clock>,
    storage: Arc<dyn KeyValueStore>,
    state: Mutex<SessionState>,
    authenticated: watch::Sender<bool>,
}

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    timer: Option<JoinHandle<()>>,
    /// Bumped on every set/clear so a stale timer can tell it lost the race.
    generation: u64,
}

impl SessionStore {
    /// An empty store. Nothing is read from `storage`.
    pub fn new(clock: Arc<dyn Clock>, storage: Arc<dyn KeyValueStore>) -> Self {
        let (authenticated, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                clock,
                storage,
                state: Mutex::new(SessionState::default()),
                authenticated,
            }),
        }
    }

    /// Restores a persisted session at startup.
    /// An expired or malformed persisted token is evicted from storage.
    pub fn hydrate(clock: Arc<dyn Clock>, storage: Arc<dyn KeyValueStore>) -> Self {
        let store = Self::new(clock, storage);

        let token = store.inner.storage.get(ACCESS_TOKEN_KEY);
        let expires_at = store
            .inner
            .storage
            .get(ACCESS_TOKEN_EXPIRY_KEY)
            .and_then(|raw| DateTime::parse_from_rfc3339(&raw).ok())
            .map(|dt| dt.with_timezone(&Utc));

        match (token, expires_at) {
            (Some(token), Some(expires_at)) if expires_at > store.inner.clock.now() => {
                let remaining = (expires_at - store.inner.clock.now())
                    .to_std()
                    .unwrap_or(Duration::ZERO);
                let mut state = store.lock();
                state.token = Some(token);
                state.expires_at = Some(expires_at);
                state.generation += 1;
                state.timer = store.schedule_expiry(state.generation, remaining);
                drop(state);
                store.inner.authenticated.send_replace(true);
                info!("Restored admin session (expires at {expires_at})");
            }
            (None, None) => {}
            _ => {
                debug!("Discarding expired or incomplete persisted session");
                store.clear();
            }
        }

        store
    }

    /// Stores `token` for `ttl`, replacing any previous session and its timer.
    pub fn set(&self, token: impl Into<String>, ttl: Duration) {
        let now = self.inner.clock.now();
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut state = self.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
        }
        state.token = Some(token.into());
        state.expires_at = Some(expires_at);
        state.generation += 1;

        self.inner
            .storage
            .set(ACCESS_TOKEN_KEY, state.token.as_deref().unwrap_or_default());
        self.inner
            .storage
            .set(ACCESS_TOKEN_EXPIRY_KEY, &expires_at.to_rfc3339());

        state.timer = self.schedule_expiry(state.generation, ttl);
        drop(state);

        self.inner.authenticated.send_replace(true);
        info!("Admin session started (expires at {expires_at})");
    }

    /// The current token, or `None` if there is none or it has expired.
    /// Reading an expired token clears the session.
    pub fn get(&self) -> Option<String> {
        let now = self.inner.clock.now();
        let mut state = self.lock();
        match (&state.token, state.expires_at) {
            (Some(token), Some(expires_at)) if now < expires_at => Some(token.clone()),
            (None, _) => None,
            _ => {
                debug!("Access token expired on read");
                self.clear_locked(&mut state, true);
                None
            }
        }
    }

    /// Removes the token and cancels the pending expiry. Idempotent.
    pub fn clear(&self) {
        let mut state = self.lock();
        self.clear_locked(&mut state, true);
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.get()?;
        self.lock().expires_at
    }

    pub fn is_authenticated(&self) -> bool {
        self.get().is_some()
    }

    /// Watches the authenticated flag; flips to `false` on expiry or clear.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.authenticated.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clear_locked(&self, state: &mut SessionState, abort_timer: bool) {
        let had_token = state.token.is_some();
        if let Some(timer) = state.timer.take() {
            if abort_timer {
                timer.abort();
            }
        }
        state.token = None;
        state.expires_at = None;
        state.generation += 1;

        self.inner.storage.remove(ACCESS_TOKEN_KEY);
        self.inner.storage.remove(ACCESS_TOKEN_EXPIRY_KEY);
        self.inner.authenticated.send_replace(false);

        if had_token {
            info!("Admin session cleared");
        }
    }

    /// Spawns the one-shot expiry task. Without a tokio runtime only lazy
    /// eviction in `get()` applies.
    fn schedule_expiry(&self, generation: u64, ttl: Duration) -> Option<JoinHandle<()>> {
        let handle = tokio::runtime::Handle::try_current().ok()?;
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Some(handle.spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Some(inner) = weak.upgrade() {
                SessionStore { inner }.expire(generation);
            }
        }))
    }

    fn expire(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        warn!("Access token removed after its lifetime elapsed");
        // Running inside the timer task itself: detach rather than abort.
        self.clear_locked(&mut state, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn store_with_clock() -> (SessionStore, ManualClock, Arc<MemoryStore>) {
        let clock = ManualClock::default();
        let storage = Arc::new(MemoryStore::new());
        let store = SessionStore::new(Arc::new(clock.clone()), storage.clone());
        (store, clock, storage)
    }

    #[test]
    fn test_token_readable_until_ttl_elapses() {
        let (store, clock, _) = store_with_clock();
        store.set("abc", Duration::from_secs(60));

        assert_eq!(store.get().as_deref(), Some("abc"));
        clock.advance(chrono::Duration::seconds(59));
        assert_eq!(store.get().as_deref(), Some("abc"));
        clock.advance(chrono::Duration::seconds(1));
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_expired_read_clears_persisted_state() {
        let (store, clock, storage) = store_with_clock();
        store.set("abc", Duration::from_secs(10));
        assert!(storage.get(ACCESS_TOKEN_KEY).is_some());

        clock.advance(chrono::Duration::seconds(10));
        assert_eq!(store.get(), None);
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(storage.get(ACCESS_TOKEN_EXPIRY_KEY), None);
    }

    #[test]
    fn test_clear_then_get_is_none() {
        let (store, _, _) = store_with_clock();
        store.clear();
        assert_eq!(store.get(), None);

        store.set("abc", Duration::from_secs(60));
        store.clear();
        store.clear();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn test_set_replaces_previous_session() {
        let (store, clock, _) = store_with_clock();
        store.set("first", Duration::from_secs(10));
        clock.advance(chrono::Duration::seconds(5));
        store.set("second", Duration::from_secs(10));
        clock.advance(chrono::Duration::seconds(7));
        assert_eq!(store.get().as_deref(), Some("second"));
    }

    #[test]
    fn test_hydrate_restores_unexpired_token() {
        let clock = ManualClock::default();
        let storage = Arc::new(MemoryStore::new());
        SessionStore::new(Arc::new(clock.clone()), storage.clone())
            .set("persisted", Duration::from_secs(300));

        let restored = SessionStore::hydrate(Arc::new(clock.clone()), storage.clone());
        assert_eq!(restored.get().as_deref(), Some("persisted"));
        assert!(*restored.subscribe().borrow());
    }

    #[test]
    fn test_hydrate_evicts_expired_token() {
        let clock = ManualClock::default();
        let storage = Arc::new(MemoryStore::new());
        SessionStore::new(Arc::new(clock.clone()), storage.clone())
            .set("stale", Duration::from_secs(30));
        clock.advance(chrono::Duration::minutes(1));

        let restored = SessionStore::hydrate(Arc::new(clock), storage.clone());
        assert_eq!(restored.get(), None);
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
    }

    #[test]
    fn test_hydrate_evicts_token_without_expiry() {
        let storage = Arc::new(MemoryStore::new());
        storage.set(ACCESS_TOKEN_KEY, "orphan");
        let restored = SessionStore::hydrate(Arc::new(ManualClock::default()), storage.clone());
        assert_eq!(restored.get(), None);
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_expiry_matches_clear() {
        let (store, _clock, storage) = store_with_clock();
        let mut rx = store.subscribe();
        store.set("abc", Duration::from_secs(10));
        assert!(*rx.borrow_and_update());

        // The manual clock never moves, so only the timer can evict.
        tokio::time::sleep(Duration::from_secs(11)).await;

        assert!(rx.has_changed().unwrap());
        assert!(!*rx.borrow_and_update());
        assert_eq!(store.get(), None);
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hydrated_session_evicted_by_timer() {
        let clock = ManualClock::default();
        let storage = Arc::new(MemoryStore::new());
        let expires_at = clock.now() + chrono::Duration::seconds(10);
        storage.set(ACCESS_TOKEN_KEY, "persisted");
        storage.set(ACCESS_TOKEN_EXPIRY_KEY, &expires_at.to_rfc3339());

        let restored = SessionStore::hydrate(Arc::new(clock.clone()), storage.clone());
        let mut rx = restored.subscribe();
        assert!(*rx.borrow_and_update());
        assert_eq!(restored.expires_at(), Some(expires_at));

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(restored.is_authenticated());

        // The clock stays frozen; the remaining 10s run out on the timer.
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(rx.has_changed().unwrap());
        assert!(!*rx.borrow_and_update());
        assert!(!restored.is_authenticated());
        assert_eq!(restored.expires_at(), None);
        assert_eq!(storage.get(ACCESS_TOKEN_KEY), None);
        assert_eq!(storage.get(ACCESS_TOKEN_EXPIRY_KEY), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_cancels_earlier_timer() {
        let (store, _clock, _) = store_with_clock();
        store.set("first", Duration::from_secs(5));
        store.set("second", Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(store.get().as_deref(), Some("second"));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(store.get(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_cancels_timer() {
        let (store, _clock, _) = store_with_clock();
        store.set("first", Duration::from_secs(5));
        store.clear();
        store.set("second", Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(store.get().as_deref(), Some("second"));
    }
}
