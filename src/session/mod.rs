//! Explicit auth context.
//!
//! Created at start-up from the stored session, replaced on sign-in, torn down
//! on sign-out. Components get it from the app context instead of reading
//! any global.

use crate::api::{
    ApiError, ApiErrorKind, ApiResult, AuthGateway, AuthGrant, ProfileGateway, SignUpOutcome,
    WriteOutcome,
};
use crate::models::Profile;
use log::{info, warn};
use serde::{Deserialize, Serialize};

pub const ADMIN_ROLE: &str = "admin";
const MIN_PASSWORD_LEN: usize = 6;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    pub access_token: String,
    #[serde(default)]
    pub is_admin: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum SessionContext {
    #[default]
    SignedOut,
    SignedIn(Session),
}

impl SessionContext {
    pub fn from_stored(stored: Option<Session>) -> Self {
        match stored {
            Some(s) => Self::SignedIn(s),
            None => Self::SignedOut,
        }
    }

    /// Session persisted by a previous visit, if any.
    pub fn restore() -> Self {
        Self::from_stored(crate::storage::load_session())
    }

    /// Write the context through to localStorage.
    pub fn persist(&self) {
        match self {
            Self::SignedIn(s) => crate::storage::save_session(s),
            Self::SignedOut => crate::storage::clear_session(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::SignedIn(s) => Some(s),
            Self::SignedOut => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.session().map(|s| s.user_id.as_str())
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session().map(|s| s.access_token.as_str())
    }

    pub fn is_signed_in(&self) -> bool {
        self.session().is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.session().is_some_and(|s| s.is_admin)
    }

    /// Gate for admin-only operations, checked before anything is sent.
    pub fn require_admin(&self) -> ApiResult<&Session> {
        match self.session() {
            Some(s) if s.is_admin => Ok(s),
            Some(_) => Err(ApiError::unauthorized(
                "You do not have permission to manage recreation centers",
            )),
            None => Err(ApiError::unauthorized("Please sign in to continue")),
        }
    }

    pub fn require_user(&self) -> ApiResult<&Session> {
        self.session()
            .ok_or_else(|| ApiError::unauthorized("Please sign in to continue"))
    }
}

pub fn validate_credentials(email: &str, password: &str) -> ApiResult<()> {
    if !email.trim().contains('@') {
        return Err(ApiError::validation("email", "Please enter a valid email address"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

pub fn validate_sign_up(email: &str, password: &str, username: &str) -> ApiResult<()> {
    validate_credentials(email, password)?;
    if username.trim().is_empty() {
        return Err(ApiError::validation("username", "Username is required"));
    }
    Ok(())
}

/// Turn an auth grant into a session, looking up the admin role.
/// A failed role lookup signs the user in without admin rights.
async fn establish(gateway: &dyn AuthGateway, grant: AuthGrant) -> Session {
    let is_admin = match gateway.has_role(&grant.user.id, ADMIN_ROLE).await {
        Ok(v) => v,
        Err(e) => {
            warn!("role lookup failed, continuing without admin access: {e}");
            false
        }
    };
    info!("signed in as {}", grant.user.id);
    Session {
        user_id: grant.user.id,
        email: grant.user.email,
        access_token: grant.access_token,
        is_admin,
    }
}

pub async fn sign_in(gateway: &dyn AuthGateway, email: &str, password: &str) -> ApiResult<Session> {
    validate_credentials(email, password)?;
    let grant = gateway.sign_in(email.trim(), password).await?;
    Ok(establish(gateway, grant).await)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignUpResult {
    SignedIn(Session),
    ConfirmationRequired,
}

pub async fn sign_up(
    gateway: &dyn AuthGateway,
    email: &str,
    password: &str,
    username: &str,
) -> ApiResult<SignUpResult> {
    validate_sign_up(email, password, username)?;
    match gateway.sign_up(email.trim(), password, username.trim()).await? {
        SignUpOutcome::SignedIn(grant) => Ok(SignUpResult::SignedIn(establish(gateway, grant).await)),
        SignUpOutcome::ConfirmationRequired => Ok(SignUpResult::ConfirmationRequired),
    }
}

/// Tear down the local session. The backend call is best effort: if it
/// fails the user is still signed out locally and the error is logged.
pub async fn sign_out(gateway: &dyn AuthGateway, ctx: &mut SessionContext) {
    let previous = std::mem::take(ctx);
    if let SessionContext::SignedIn(s) = previous {
        if let Err(e) = gateway.sign_out(&s.access_token).await {
            warn!("backend sign out failed: {e}");
        }
        info!("signed out {}", s.user_id);
    }
}

/// Check a restored session against the backend.
///
/// A revoked token signs the user out; a connectivity failure keeps the
/// stored session so the app still works while the backend is down.
pub async fn revalidate(gateway: &dyn AuthGateway, session: Session) -> SessionContext {
    match gateway.current_user(&session.access_token).await {
        Ok(Some(user)) if user.id == session.user_id => {
            let is_admin = gateway
                .has_role(&user.id, ADMIN_ROLE)
                .await
                .unwrap_or(session.is_admin);
            SessionContext::SignedIn(Session {
                email: user.email.or(session.email),
                is_admin,
                ..session
            })
        }
        Ok(_) => {
            info!("stored session is no longer valid");
            SessionContext::SignedOut
        }
        Err(e) => {
            warn!("could not verify stored session: {e}");
            SessionContext::SignedIn(session)
        }
    }
}

/// Name shown in the header: the username when set, else the email.
pub fn display_name(session: &Session, profile: Option<&Profile>) -> String {
    profile
        .and_then(|p| p.username.as_deref())
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or_else(|| session.email.clone())
        .unwrap_or_else(|| "Account".to_string())
}

pub async fn load_profile(gateway: &dyn ProfileGateway, session: &Session) -> ApiResult<Option<Profile>> {
    gateway.fetch_profile(&session.user_id).await
}

pub async fn rename(gateway: &dyn ProfileGateway, session: &Session, username: &str) -> ApiResult<Profile> {
    match gateway.update_username(&session.user_id, username).await? {
        WriteOutcome::Applied(p) => Ok(p),
        WriteOutcome::NoRowsAffected => Err(ApiError::not_found("Profile")),
    }
}

pub fn is_auth_failure(e: &ApiError) -> bool {
    e.kind == ApiErrorKind::Authorization
}
