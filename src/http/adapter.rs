use super::transport::{OutboundRequest, RawResponse, RequestBody, Transport, TransportError};
use crate::state::{ClientStore, SessionEvents};
use crate::types::{Alert, ClientEvent, InvalidationReason, ServerMessage, ALERT_TYPE_NETWORK_ERROR};
use reqwest::Method;
use serde_json::Value;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

pub const NETWORK_ERROR_MESSAGE: &str =
    "something went wrong. please, try later or contact support@microblog.local";

const NOT_LOGGED_IN_CODE: &str = "not_logged_in";

pub type SuccessCallback = Box<dyn FnOnce(Value) + Send + 'static>;
pub type ErrorCallback = Box<dyn FnOnce(RawResponse) + Send + 'static>;
pub type FinallyCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("request failed with status {status} {status_text}")]
    Status { status: u16, status_text: String },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("response body is not valid json")]
    Json(#[from] serde_json::Error),
}

/// Optional hooks for [`HttpAdapter::send_request`].
#[derive(Default)]
pub struct RequestCallbacks {
    on_success: Option<SuccessCallback>,
    on_error: Option<ErrorCallback>,
    on_finally: Option<FinallyCallback>,
}

impl RequestCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce(Value) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(RawResponse) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub fn on_finally(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_finally = Some(Box::new(f));
        self
    }
}

/// Authorized request helpers shared by every screen of the client.
///
/// Each call raises the loader (when asked) before it returns, then finishes as
/// its own task; outcomes reach the caller only through the callbacks, the
/// [`ClientStore`] and [`SessionEvents`]. The returned handle signals completion
/// and nothing else. A panicking callback is logged and does not skip the
/// finally stage or the loader clear.
#[derive(Clone)]
pub struct HttpAdapter {
    store: ClientStore,
    transport: Arc<dyn Transport>,
    events: SessionEvents,
    base_url: String,
    network_error_message: String,
}

impl HttpAdapter {
    pub fn new(
        store: ClientStore,
        transport: Arc<dyn Transport>,
        events: SessionEvents,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            events,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            network_error_message: NETWORK_ERROR_MESSAGE.to_string(),
        }
    }

    pub fn with_network_error_message(mut self, message: impl Into<String>) -> Self {
        self.network_error_message = message.into();
        self
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }

    pub async fn get<F>(
        &self,
        path: impl Into<String>,
        access_token: impl Into<String>,
        on_success: F,
        use_loader: bool,
    ) -> JoinHandle<()>
    where
        F: FnOnce(Value) + Send + 'static,
    {
        let path = path.into();
        let access_token = access_token.into();
        if use_loader {
            self.store.set_loading(true).await;
        }
        let adapter = self.clone();
        tokio::spawn(async move {
            adapter
                .perform_get(&path, &access_token, Box::new(on_success), use_loader)
                .await;
        })
    }

    pub async fn send_request(
        &self,
        path: impl Into<String>,
        method: Method,
        access_token: impl Into<String>,
        body: RequestBody,
        callbacks: RequestCallbacks,
        use_loader: bool,
    ) -> JoinHandle<()> {
        let path = path.into();
        let access_token = access_token.into();
        if use_loader {
            self.store.set_loading(true).await;
        }
        let adapter = self.clone();
        tokio::spawn(async move {
            adapter
                .perform_send(&path, method, &access_token, body, callbacks, use_loader)
                .await;
        })
    }

    async fn perform_get(
        &self,
        path: &str,
        access_token: &str,
        on_success: SuccessCallback,
        use_loader: bool,
    ) {
        match self.get_inner(path, access_token, on_success, use_loader).await {
            Ok(()) => {}
            Err(AdapterError::Transport(e)) => {
                tracing::error!(path, error = %e, "get request did not complete");
                self.store
                    .set_alert(Alert::new(
                        ALERT_TYPE_NETWORK_ERROR,
                        self.network_error_message.clone(),
                    ))
                    .await;
                // Loader is left on for transport failures.
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "get request failed");
            }
        }
    }

    async fn get_inner(
        &self,
        path: &str,
        access_token: &str,
        on_success: SuccessCallback,
        use_loader: bool,
    ) -> Result<(), AdapterError> {
        let response = self
            .transport
            .execute(OutboundRequest {
                method: Method::GET,
                url: self.url(path),
                authorization: access_token.to_string(),
                body: RequestBody::Empty,
            })
            .await?;

        match response.status {
            403 => {
                tracing::info!(path, "session rejected, signing out");
                self.store.clear_session().await;
                self.events.publish(ClientEvent::SessionInvalidated {
                    reason: InvalidationReason::Forbidden,
                });
                return Ok(());
            }
            404 => {
                if use_loader {
                    self.store.set_loading(false).await;
                }
                return Ok(());
            }
            _ if !response.is_success() => {
                return Err(AdapterError::Status {
                    status: response.status,
                    status_text: response.status_text,
                });
            }
            _ => {}
        }

        match response.json::<Value>() {
            Ok(data) => run_callback(path, "on_success", move || on_success(data)),
            Err(e) => tracing::warn!(path, error = %e, "get response is not valid json"),
        }

        if use_loader {
            self.store.set_loading(false).await;
        }
        Ok(())
    }

    async fn perform_send(
        &self,
        path: &str,
        method: Method,
        access_token: &str,
        body: RequestBody,
        callbacks: RequestCallbacks,
        use_loader: bool,
    ) {
        let RequestCallbacks {
            on_success,
            on_error,
            on_finally,
        } = callbacks;

        let request = OutboundRequest {
            method,
            url: self.url(path),
            authorization: access_token.to_string(),
            body,
        };
        if let Err(e) = self.send_inner(path, request, on_success, on_error).await {
            tracing::warn!(path, error = %e, "request error happened");
        }

        if let Some(on_finally) = on_finally {
            run_callback(path, "on_finally", on_finally);
        }
        if use_loader {
            self.store.set_loading(false).await;
        }
    }

    async fn send_inner(
        &self,
        path: &str,
        request: OutboundRequest,
        on_success: Option<SuccessCallback>,
        on_error: Option<ErrorCallback>,
    ) -> Result<(), AdapterError> {
        let response = self.transport.execute(request).await?;

        if !response.is_success() {
            match response.json::<ServerMessage>() {
                Ok(message) => self.store.set_alert(Alert::from(message)).await,
                Err(e) => {
                    tracing::warn!(path, status = response.status, error = %e, "error response is not valid json");
                }
            }
            if let Some(on_error) = on_error {
                run_callback(path, "on_error", move || on_error(response));
            }
            return Ok(());
        }

        let data: Value = if response.body.is_empty() {
            Value::Null
        } else {
            response.json()?
        };
        if data.get("code").and_then(Value::as_str) == Some(NOT_LOGGED_IN_CODE) {
            self.events.publish(ClientEvent::SessionInvalidated {
                reason: InvalidationReason::NotLoggedIn,
            });
            return Ok(());
        }

        if let Some(on_success) = on_success {
            run_callback(path, "on_success", move || on_success(data));
        }
        Ok(())
    }
}

fn run_callback(path: &str, stage: &'static str, f: impl FnOnce()) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        tracing::error!(
            path,
            stage,
            reason = panic_reason(payload.as_ref()),
            "request callback panicked"
        );
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}
