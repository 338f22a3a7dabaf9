use serde::{Deserialize, Serialize};

pub const ALERT_TYPE_NETWORK_ERROR: &str = "network-error";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        !self.access_token.trim().is_empty()
    }
}

/// Snapshot of the signed-in user as returned by `/user/me`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentUser {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub login: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub photo_url: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default, rename = "following", alias = "following_count")]
    pub following_count: u64,
    #[serde(default, rename = "followers", alias = "followers_count")]
    pub followers_count: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl Alert {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            request_id: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        !self.message.is_empty()
    }
}

/// Message envelope the API uses for errors and plain confirmations.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ServerMessage {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub message: String,
}

impl From<ServerMessage> for Alert {
    fn from(value: ServerMessage) -> Self {
        Self {
            kind: value.kind,
            message: value.message,
            request_id: value.request_id.filter(|id| !id.trim().is_empty()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertClearPolicy {
    /// Public site: both the category and the text are blanked.
    #[default]
    TypeAndMessage,
    /// Admin panel: only the text is blanked.
    MessageOnly,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoreSnapshot {
    pub session: Session,
    pub current_user: CurrentUser,
    pub is_loading: bool,
    pub alert: Alert,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvalidationReason {
    /// A `get` came back with 403.
    Forbidden,
    /// A successful response carried `code: "not_logged_in"`.
    NotLoggedIn,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    SessionInvalidated { reason: InvalidationReason },
}

pub const ROOT_PATH: &str = "/";

impl ClientEvent {
    pub fn redirect_path(&self) -> &'static str {
        match self {
            Self::SessionInvalidated { .. } => ROOT_PATH,
        }
    }
}
