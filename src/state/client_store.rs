use super::alert_timer::AlertTimer;
use crate::storage::DurableStorage;
use crate::types::{Alert, AlertClearPolicy, CurrentUser, Session, StoreSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const SESSION_STORAGE_KEY: &str = "jwt";

const DEFAULT_ALERT_CLEAR_DELAY_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    pub alert_clear_delay: Duration,
    pub alert_clear_policy: AlertClearPolicy,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            alert_clear_delay: Duration::from_millis(DEFAULT_ALERT_CLEAR_DELAY_MS),
            alert_clear_policy: AlertClearPolicy::TypeAndMessage,
        }
    }
}

/// The only ways the client state may change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    SetSession(Session),
    /// Session read back from storage; it is not written again.
    RestoreSession(Session),
    ClearSession,
    SetCurrentUser(CurrentUser),
    SetLoading(bool),
    SetAlert(Alert),
}

struct StoreState {
    session: Session,
    current_user: CurrentUser,
    is_loading: bool,
    alert: Alert,
    alert_timer: AlertTimer,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            session: Session::default(),
            current_user: CurrentUser::default(),
            is_loading: true,
            alert: Alert::default(),
            alert_timer: AlertTimer::default(),
        }
    }
}

#[derive(Clone)]
pub struct ClientStore {
    state: Arc<Mutex<StoreState>>,
    storage: Arc<dyn DurableStorage>,
    options: StoreOptions,
}

impl ClientStore {
    pub fn new(storage: Arc<dyn DurableStorage>, options: StoreOptions) -> Self {
        Self {
            state: Arc::new(Mutex::new(StoreState::default())),
            storage,
            options,
        }
    }

    pub async fn commit(&self, mutation: Mutation) {
        tracing::debug!(mutation = mutation_name(&mutation), "store commit");
        let mut state = self.state.lock().await;
        match mutation {
            Mutation::SetSession(session) => {
                self.persist_session(&session);
                state.session = session;
            }
            Mutation::RestoreSession(session) => state.session = session,
            Mutation::ClearSession => {
                if let Err(e) = self.storage.remove_item(SESSION_STORAGE_KEY) {
                    tracing::warn!(error = %e, "failed to remove session from storage");
                }
                state.session.access_token.clear();
            }
            Mutation::SetCurrentUser(user) => state.current_user = user,
            Mutation::SetLoading(flag) => state.is_loading = flag,
            Mutation::SetAlert(alert) => {
                state.alert = alert;
                let generation = state.alert_timer.supersede();
                let handle = self.spawn_alert_clear(generation);
                state.alert_timer.arm(handle);
            }
        }
    }

    pub async fn set_session(&self, session: Session) {
        self.commit(Mutation::SetSession(session)).await;
    }

    pub async fn clear_session(&self) {
        self.commit(Mutation::ClearSession).await;
    }

    pub async fn set_current_user(&self, user: CurrentUser) {
        self.commit(Mutation::SetCurrentUser(user)).await;
    }

    pub async fn set_loading(&self, flag: bool) {
        self.commit(Mutation::SetLoading(flag)).await;
    }

    pub async fn set_alert(&self, alert: Alert) {
        self.commit(Mutation::SetAlert(alert)).await;
    }

    /// Loads the persisted session, if any, into memory.
    pub async fn restore_session(&self) -> Option<Session> {
        let raw = match self.storage.get_item(SESSION_STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read session from storage");
                return None;
            }
        };

        let session = match serde_json::from_str::<Session>(&raw) {
            Ok(session) if session.is_authenticated() => session,
            Ok(_) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "stored session is not valid json, ignoring it");
                return None;
            }
        };

        self.commit(Mutation::RestoreSession(session.clone())).await;
        Some(session)
    }

    pub async fn snapshot(&self) -> StoreSnapshot {
        let state = self.state.lock().await;
        StoreSnapshot {
            session: state.session.clone(),
            current_user: state.current_user.clone(),
            is_loading: state.is_loading,
            alert: state.alert.clone(),
        }
    }

    pub async fn access_token(&self) -> String {
        self.state.lock().await.session.access_token.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.lock().await.is_loading
    }

    pub async fn alert(&self) -> Alert {
        self.state.lock().await.alert.clone()
    }

    pub async fn current_user(&self) -> CurrentUser {
        self.state.lock().await.current_user.clone()
    }

    fn persist_session(&self, session: &Session) {
        let value = match serde_json::to_string(session) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "failed to encode session");
                return;
            }
        };
        if let Err(e) = self.storage.set_item(SESSION_STORAGE_KEY, &value) {
            tracing::warn!(error = %e, "failed to persist session");
        }
    }

    fn spawn_alert_clear(&self, generation: u64) -> tokio::task::JoinHandle<()> {
        let state = Arc::clone(&self.state);
        let StoreOptions {
            alert_clear_delay,
            alert_clear_policy,
        } = self.options;

        tokio::spawn(async move {
            tokio::time::sleep(alert_clear_delay).await;
            let mut state = state.lock().await;
            if !state.alert_timer.is_current(generation) {
                return;
            }
            state.alert.message.clear();
            state.alert.request_id = None;
            if alert_clear_policy == AlertClearPolicy::TypeAndMessage {
                state.alert.kind.clear();
            }
            state.alert_timer.finish(generation);
            tracing::debug!("alert cleared");
        })
    }
}

fn mutation_name(mutation: &Mutation) -> &'static str {
    match mutation {
        Mutation::SetSession(_) => "set_session",
        Mutation::RestoreSession(_) => "restore_session",
        Mutation::ClearSession => "clear_session",
        Mutation::SetCurrentUser(_) => "set_current_user",
        Mutation::SetLoading(_) => "set_loading",
        Mutation::SetAlert(_) => "set_alert",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn store_with(options: StoreOptions) -> (ClientStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (ClientStore::new(storage.clone(), options), storage)
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test]
    async fn set_session_persists_only_the_token() {
        let (store, storage) = store_with(StoreOptions::default());
        store.set_session(Session::new("tok-1")).await;

        let raw = storage.get_item(SESSION_STORAGE_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({ "access_token": "tok-1" }));
        assert_eq!(store.access_token().await, "tok-1");
    }

    #[tokio::test]
    async fn clear_session_removes_key_and_blanks_token() {
        let (store, storage) = store_with(StoreOptions::default());
        store.set_session(Session::new("tok-1")).await;
        store.clear_session().await;

        assert!(!storage.contains(SESSION_STORAGE_KEY));
        assert_eq!(store.snapshot().await.session, Session::default());
    }

    #[tokio::test]
    async fn restore_session_reads_storage() {
        let (store, storage) = store_with(StoreOptions::default());
        storage
            .set_item(SESSION_STORAGE_KEY, r#"{"access_token":"boot"}"#)
            .unwrap();

        assert_eq!(store.restore_session().await, Some(Session::new("boot")));
        assert_eq!(store.access_token().await, "boot");
    }

    #[tokio::test]
    async fn restore_commit_does_not_touch_storage() {
        let (store, storage) = store_with(StoreOptions::default());
        store
            .commit(Mutation::RestoreSession(Session::new("mem-only")))
            .await;

        assert_eq!(store.access_token().await, "mem-only");
        assert!(!storage.contains(SESSION_STORAGE_KEY));
    }

    #[tokio::test]
    async fn restore_session_ignores_garbage() {
        let (store, storage) = store_with(StoreOptions::default());
        storage.set_item(SESSION_STORAGE_KEY, "not-json").unwrap();

        assert_eq!(store.restore_session().await, None);
        assert_eq!(store.access_token().await, "");
    }

    #[tokio::test]
    async fn loading_starts_true_and_is_replaced() {
        let (store, _) = store_with(StoreOptions::default());
        assert!(store.is_loading().await);
        store.set_loading(false).await;
        assert!(!store.is_loading().await);
    }

    #[tokio::test]
    async fn current_user_is_replaced_wholesale() {
        let (store, _) = store_with(StoreOptions::default());
        store
            .set_current_user(CurrentUser {
                id: 1,
                login: "a".to_string(),
                bio: "old".to_string(),
                ..CurrentUser::default()
            })
            .await;
        store
            .set_current_user(CurrentUser {
                id: 2,
                login: "b".to_string(),
                ..CurrentUser::default()
            })
            .await;

        let user = store.current_user().await;
        assert_eq!(user.id, 2);
        assert_eq!(user.bio, "");
    }

    #[tokio::test(start_paused = true)]
    async fn alert_clears_after_delay() {
        let (store, _) = store_with(StoreOptions::default());
        store.set_alert(Alert::new("x", "y")).await;

        advance(4999).await;
        assert_eq!(store.alert().await.message, "y");

        advance(2).await;
        let alert = store.alert().await;
        assert_eq!(alert.message, "");
        assert_eq!(alert.kind, "");
    }

    #[tokio::test(start_paused = true)]
    async fn newer_alert_cancels_previous_clear() {
        let (store, _) = store_with(StoreOptions::default());
        store.set_alert(Alert::new("first", "one")).await;
        advance(3000).await;
        store.set_alert(Alert::new("second", "two")).await;

        advance(2500).await;
        let alert = store.alert().await;
        assert_eq!(alert.kind, "second");
        assert_eq!(alert.message, "two");

        advance(2600).await;
        assert!(!store.alert().await.is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn message_only_policy_keeps_type() {
        let (store, _) = store_with(StoreOptions {
            alert_clear_policy: AlertClearPolicy::MessageOnly,
            ..StoreOptions::default()
        });
        store.set_alert(Alert::new("error", "boom")).await;

        advance(5001).await;
        let alert = store.alert().await;
        assert_eq!(alert.kind, "error");
        assert_eq!(alert.message, "");
    }
}
