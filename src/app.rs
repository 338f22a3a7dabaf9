use crate::endpoints;
use crate::http::{HttpAdapter, Method, RequestBody, RequestCallbacks, ReqwestTransport, Transport, TransportError};
use crate::settings::{ClientSettings, StorageSettings};
use crate::state::{ClientStore, SessionEvents};
use crate::storage::{DurableStorage, FileStorage, KeyringStorage, MemoryStorage, StorageError};
use crate::types::{CurrentUser, Session};
use serde_json::{json, Value};
use std::process::ExitCode;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;

#[derive(Debug, Error)]
pub enum BootError {
    #[error("failed to open storage")]
    Storage(#[from] StorageError),
    #[error("failed to build http client")]
    Transport(#[from] TransportError),
}

pub fn open_storage(settings: &StorageSettings) -> Result<Arc<dyn DurableStorage>, StorageError> {
    let storage: Arc<dyn DurableStorage> = match settings {
        StorageSettings::File { path } => Arc::new(FileStorage::open(path.clone())?),
        StorageSettings::Keyring { service } => {
            let storage = KeyringStorage::new(service.clone());
            if !storage.is_available() {
                tracing::warn!("OS keychain/secret service is unavailable, session will not persist");
            }
            Arc::new(storage)
        }
        StorageSettings::Memory => Arc::new(MemoryStorage::new()),
    };
    Ok(storage)
}

/// API responses wrap their payload as `{"request_id", "type", "data"}`.
fn unwrap_data(mut value: Value) -> Value {
    if let Value::Object(map) = &mut value {
        if let Some(inner) = map.remove("data") {
            return inner;
        }
    }
    value
}

#[derive(Clone)]
pub struct App {
    store: ClientStore,
    events: SessionEvents,
    adapter: HttpAdapter,
}

impl App {
    pub fn boot(settings: &ClientSettings) -> Result<Self, BootError> {
        let storage = open_storage(&settings.storage)?;
        let transport = Arc::new(ReqwestTransport::new(settings.request_timeout())?);
        Ok(Self::assemble(settings, storage, transport))
    }

    pub fn assemble(
        settings: &ClientSettings,
        storage: Arc<dyn DurableStorage>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let store = ClientStore::new(storage, settings.store_options());
        let events = SessionEvents::new();
        let adapter = HttpAdapter::new(
            store.clone(),
            transport,
            events.clone(),
            settings.api_base_url.clone(),
        )
        .with_network_error_message(settings.network_error_message.clone());
        Self {
            store,
            events,
            adapter,
        }
    }

    pub fn store(&self) -> &ClientStore {
        &self.store
    }

    pub fn events(&self) -> &SessionEvents {
        &self.events
    }

    pub fn adapter(&self) -> &HttpAdapter {
        &self.adapter
    }

    /// Restores the stored session and, if there is one, loads the current user.
    pub async fn start(&self) -> Option<CurrentUser> {
        if self.store.restore_session().await.is_none() {
            tracing::info!("no stored session, starting signed out");
            self.store.set_loading(false).await;
            return None;
        }
        self.load_current_user().await
    }

    pub async fn load_current_user(&self) -> Option<CurrentUser> {
        let token = self.store.access_token().await;
        let (tx, rx) = oneshot::channel();
        let handle = self.adapter.get(
            endpoints::USER_ME,
            token,
            move |data| {
                let _ = tx.send(data);
            },
            true,
        ).await;
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "current user request task failed");
        }

        let data = rx.await.ok()?;
        match serde_json::from_value::<CurrentUser>(unwrap_data(data)) {
            Ok(user) => {
                self.store.set_current_user(user.clone()).await;
                Some(user)
            }
            Err(e) => {
                tracing::warn!(error = %e, "current user payload is malformed");
                None
            }
        }
    }

    pub async fn login(&self, login: &str, password: &str) -> Option<Session> {
        let (tx, rx) = oneshot::channel();
        let callbacks = RequestCallbacks::new().on_success(move |data| {
            let _ = tx.send(data);
        });
        let handle = self.adapter.send_request(
            endpoints::AUTH_LOGIN,
            Method::POST,
            String::new(),
            RequestBody::Json(json!({ "login": login, "password": password })),
            callbacks,
            true,
        ).await;
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "login request task failed");
        }

        let data = rx.await.ok()?;
        let session = match serde_json::from_value::<Session>(unwrap_data(data)) {
            Ok(session) if session.is_authenticated() => session,
            Ok(_) => {
                tracing::warn!("login response carried an empty token");
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "login payload is malformed");
                return None;
            }
        };
        self.store.set_session(session.clone()).await;
        self.load_current_user().await;
        Some(session)
    }

    pub async fn logout(&self) {
        self.store.clear_session().await;
        self.store.set_current_user(CurrentUser::default()).await;
    }
}

/// Boots the client, optionally fetches `argv[1]`, and prints the resulting state.
pub async fn run() -> ExitCode {
    let settings = match ClientSettings::load(None) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "failed to load settings");
            return ExitCode::FAILURE;
        }
    };
    let app = match App::boot(&settings) {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "failed to start client");
            return ExitCode::FAILURE;
        }
    };

    let mut events = app.events().subscribe();
    tracing::info!(api = %settings.api_base_url, "microblog client starting");
    app.start().await;

    if let Some(path) = std::env::args().nth(1) {
        let token = app.store().access_token().await;
        let handle = app.adapter().get(
            path.clone(),
            token,
            move |data| tracing::info!(path, %data, "response"),
            true,
        ).await;
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "request task failed");
        }
    }

    while let Ok(event) = events.try_recv() {
        tracing::info!(redirect = event.redirect_path(), "navigation requested");
    }

    match serde_json::to_string_pretty(&app.store().snapshot().await) {
        Ok(snapshot) => {
            println!("{snapshot}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to encode state");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::fake::ScriptedTransport;
    use crate::state::SESSION_STORAGE_KEY;
    use crate::types::{ClientEvent, InvalidationReason};

    fn app_with(storage: Arc<MemoryStorage>, transport: Arc<ScriptedTransport>) -> App {
        App::assemble(&ClientSettings::default(), storage, transport)
    }

    #[tokio::test]
    async fn start_without_session_stays_signed_out() {
        let transport = Arc::new(ScriptedTransport::new());
        let app = app_with(Arc::new(MemoryStorage::new()), transport.clone());

        assert_eq!(app.start().await, None);
        assert!(!app.store().is_loading().await);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn start_restores_session_and_loads_me() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set_item(SESSION_STORAGE_KEY, r#"{"access_token":"tok"}"#)
            .unwrap();
        let transport = Arc::new(ScriptedTransport::new().respond(
            200,
            r#"{"request_id":"r1","type":"success","data":{"id":42,"login":"joe","name":"Joe","photo_url":"","bio":"","following":1,"followers":2}}"#,
        ));
        let app = app_with(storage, transport.clone());

        let user = app.start().await.unwrap();
        assert_eq!(user.login, "joe");
        assert_eq!(user.followers_count, 2);
        assert_eq!(app.store().current_user().await, user);
        assert!(!app.store().is_loading().await);

        let request = &transport.requests()[0];
        assert_eq!(request.url, "http://localhost:8080/user/me");
        assert_eq!(request.authorization, "tok");
    }

    #[tokio::test]
    async fn start_with_rejected_session_signs_out() {
        let storage = Arc::new(MemoryStorage::new());
        storage
            .set_item(SESSION_STORAGE_KEY, r#"{"access_token":"old"}"#)
            .unwrap();
        let app = app_with(storage.clone(), Arc::new(ScriptedTransport::new().respond(403, "")));
        let mut rx = app.events().subscribe();

        assert_eq!(app.start().await, None);
        assert!(!storage.contains(SESSION_STORAGE_KEY));
        assert_eq!(
            rx.recv().await.unwrap(),
            ClientEvent::SessionInvalidated {
                reason: InvalidationReason::Forbidden
            }
        );
    }

    #[tokio::test]
    async fn login_stores_token_and_fetches_user() {
        let storage = Arc::new(MemoryStorage::new());
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(200, r#"{"type":"success","data":{"access_token":"fresh"}}"#)
                .respond(200, r#"{"data":{"id":1,"login":"ann"}}"#),
        );
        let app = app_with(storage.clone(), transport.clone());

        assert_eq!(app.login("ann", "secret").await, Some(Session::new("fresh")));
        assert_eq!(
            storage.get_item(SESSION_STORAGE_KEY).unwrap().as_deref(),
            Some(r#"{"access_token":"fresh"}"#)
        );
        assert_eq!(app.store().current_user().await.login, "ann");

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(
            requests[0].body,
            RequestBody::Json(json!({ "login": "ann", "password": "secret" }))
        );
        assert_eq!(requests[1].authorization, "fresh");
    }

    #[tokio::test]
    async fn failed_login_raises_server_alert() {
        let transport = Arc::new(ScriptedTransport::new().respond(
            403,
            r#"{"request_id":"r2","type":"error","message":"invalid login or password"}"#,
        ));
        let app = app_with(Arc::new(MemoryStorage::new()), transport);

        assert_eq!(app.login("ann", "wrong").await, None);
        assert_eq!(app.store().alert().await.message, "invalid login or password");
        assert_eq!(app.store().access_token().await, "");
    }

    #[tokio::test]
    async fn logout_forgets_everything() {
        let storage = Arc::new(MemoryStorage::new());
        let app = app_with(storage.clone(), Arc::new(ScriptedTransport::new()));
        app.store().set_session(Session::new("tok")).await;
        app.store()
            .set_current_user(CurrentUser {
                id: 5,
                ..CurrentUser::default()
            })
            .await;

        app.logout().await;

        assert!(!storage.contains(SESSION_STORAGE_KEY));
        assert_eq!(app.store().current_user().await, CurrentUser::default());
    }

    #[test]
    fn unwrap_data_falls_back_to_whole_body() {
        assert_eq!(unwrap_data(json!({ "data": { "id": 1 } })), json!({ "id": 1 }));
        assert_eq!(unwrap_data(json!({ "id": 1 })), json!({ "id": 1 }));
    }

    #[test]
    fn memory_storage_backend_opens() {
        assert!(open_storage(&StorageSettings::Memory).is_ok());
    }
}
