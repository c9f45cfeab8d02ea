//! Remote data gateway.
//!
//! The traits here are the only surface the rest of the crate uses to talk to
//! the hosted backend; [`rest::SupabaseClient`] is the production implementation.

#[cfg(test)]
pub(crate) mod memory;
pub(crate) mod rest;

use crate::models::{Center, Profile, Program};
use crate::util::generate_id;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub(crate) use rest::SupabaseClient;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Backend unreachable, timed out, or failing on its side. Retryable.
    Connectivity,
    /// Backend rejected a write (constraint violation, bad payload).
    Validation,
    /// Target row does not exist.
    NotFound,
    /// Caller is not allowed to perform the operation.
    Authorization,
    /// Response did not have the expected shape.
    Parse,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub status: Option<u16>,
    /// Form field the error belongs to, for inline validation messages.
    pub field: Option<String>,
}

impl ApiError {
    fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            field: None,
        }
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Connectivity, message)
    }

    pub(crate) fn network(e: reqwest::Error) -> Self {
        Self::connectivity(format!("Network error: {e}"))
    }

    pub(crate) fn timeout(timeout_ms: u32) -> Self {
        Self::connectivity(format!("Request timed out after {timeout_ms} ms"))
    }

    pub fn parse(e: impl std::fmt::Display) -> Self {
        Self::new(ApiErrorKind::Parse, format!("Unexpected response: {e}"))
    }

    pub fn not_found(what: impl std::fmt::Display) -> Self {
        Self::new(ApiErrorKind::NotFound, format!("{what} not found"))
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Authorization, message)
    }

    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.to_string()),
            ..Self::new(ApiErrorKind::Validation, message)
        }
    }

    /// Map a non-success HTTP response. `body` is the raw response text.
    pub(crate) fn http(status: u16, body: &str, ctx: &str) -> Self {
        let detail = backend_message(body).unwrap_or_else(|| body.trim().to_string());
        let message = if detail.is_empty() {
            format!("{ctx} ({status})")
        } else {
            format!("{ctx} ({status}): {detail}")
        };

        let kind = match status {
            401 | 403 => ApiErrorKind::Authorization,
            404 | 406 => ApiErrorKind::NotFound,
            400 | 409 | 422 => ApiErrorKind::Validation,
            _ => ApiErrorKind::Connectivity,
        };

        Self {
            status: Some(status),
            ..Self::new(kind, message)
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind == ApiErrorKind::Connectivity
    }
}

/// Pull a human readable message out of a PostgREST or GoTrue error body.
fn backend_message(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    let get = |k: &str| {
        v.get(k)
            .and_then(|x| x.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let main = get("message")
        .or_else(|| get("msg"))
        .or_else(|| get("error_description"))
        .or_else(|| get("error"))?;

    Some(match get("details") {
        Some(details) => format!("{main} ({details})"),
        None => main,
    })
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Result of an update/delete by id.
///
/// The backend treats an unknown id as a successful no-op; callers need to be
/// able to tell that apart from a write that touched a row.
#[derive(Clone, Debug, PartialEq)]
pub enum WriteOutcome<T> {
    Applied(T),
    NoRowsAffected,
}

impl<T> WriteOutcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            WriteOutcome::Applied(v) => Some(v),
            WriteOutcome::NoRowsAffected => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeReport {
    pub status_code: u16,
    pub endpoint: String,
    /// Row count reported by the backend, when it sends one.
    pub row_count: Option<u64>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Credentials returned by a successful sign-in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthGrant {
    pub user: AuthUser,
    pub access_token: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthGrant),
    /// The account exists but the email address must be confirmed first.
    ConfirmationRequired,
}

/// Give a center an id before insertion if the caller left it blank.
pub(crate) fn prepare_create(mut center: Center) -> Center {
    if center.id.trim().is_empty() {
        center.id = generate_id();
    }
    center
}

#[async_trait(?Send)]
pub trait CenterGateway {
    /// Cheap reachability check against the `rec_centers` table.
    async fn probe(&self) -> ApiResult<ProbeReport>;
    async fn fetch_all(&self) -> ApiResult<Vec<Center>>;
    /// Unknown id reads as `None`, not as an error.
    async fn fetch_by_id(&self, id: &str) -> ApiResult<Option<Center>>;
    async fn fetch_programs(&self, center_id: &str) -> ApiResult<Vec<Program>>;
    async fn fetch_all_programs(&self) -> ApiResult<Vec<Program>>;
    async fn create(&self, center: Center) -> ApiResult<Center>;
    async fn update(&self, center: Center) -> ApiResult<WriteOutcome<Center>>;
    async fn delete(&self, id: &str) -> ApiResult<WriteOutcome<()>>;
}

#[async_trait(?Send)]
pub trait FavoriteGateway {
    async fn list_favorites(&self, user_id: &str) -> ApiResult<Vec<String>>;
    async fn add_favorite(&self, user_id: &str, center_id: &str) -> ApiResult<()>;
    async fn remove_favorite(&self, user_id: &str, center_id: &str) -> ApiResult<()>;
}

#[async_trait(?Send)]
pub trait AuthGateway {
    async fn sign_up(&self, email: &str, password: &str, username: &str)
        -> ApiResult<SignUpOutcome>;
    async fn sign_in(&self, email: &str, password: &str) -> ApiResult<AuthGrant>;
    async fn sign_out(&self, access_token: &str) -> ApiResult<()>;
    async fn current_user(&self, access_token: &str) -> ApiResult<Option<AuthUser>>;
    async fn has_role(&self, user_id: &str, role: &str) -> ApiResult<bool>;
}

#[async_trait(?Send)]
pub trait ProfileGateway {
    async fn fetch_profile(&self, user_id: &str) -> ApiResult<Option<Profile>>;
    async fn update_username(&self, user_id: &str, username: &str)
        -> ApiResult<WriteOutcome<Profile>>;
}
