//! In-memory gateway used by unit tests, with failure injection.

use super::{
    prepare_create, ApiError, ApiResult, AuthGateway, AuthGrant, AuthUser, CenterGateway,
    FavoriteGateway, ProbeReport, ProfileGateway, SignUpOutcome, WriteOutcome,
};
use crate::models::{Center, Profile, Program};
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeSet, HashMap};

#[derive(Clone, Debug)]
struct Account {
    id: String,
    password: String,
}

#[derive(Default)]
pub(crate) struct MemoryBackend {
    centers: RefCell<Vec<Center>>,
    programs: RefCell<Vec<Program>>,
    favorites: RefCell<BTreeSet<(String, String)>>,
    roles: RefCell<BTreeSet<(String, String)>>,
    profiles: RefCell<HashMap<String, Profile>>,
    accounts: RefCell<HashMap<String, Account>>,
    tokens: RefCell<HashMap<String, AuthUser>>,

    failing_probes: Cell<u32>,
    failing_reads: Cell<u32>,
    failing_program_reads: Cell<bool>,
    failing_favorite_writes: Cell<bool>,
    failing_sign_out: Cell<bool>,
    require_confirmation: Cell<bool>,
    rejected_writes: RefCell<Option<String>>,
    writes: Cell<u32>,
}

fn take_failure(counter: &Cell<u32>) -> bool {
    let n = counter.get();
    if n > 0 {
        counter.set(n - 1);
        true
    } else {
        false
    }
}

fn offline() -> ApiError {
    ApiError::connectivity("Network error: connection refused")
}

impl MemoryBackend {
    pub(crate) fn with_centers(centers: Vec<Center>) -> Self {
        let b = Self::default();
        *b.centers.borrow_mut() = centers;
        b
    }

    pub(crate) fn with_programs(self, programs: Vec<Program>) -> Self {
        *self.programs.borrow_mut() = programs;
        self
    }

    /// Register an account that can sign in with `password`.
    pub(crate) fn add_account(&self, id: &str, email: &str, password: &str) {
        self.accounts.borrow_mut().insert(
            email.to_string(),
            Account {
                id: id.to_string(),
                password: password.to_string(),
            },
        );
        self.profiles.borrow_mut().insert(
            id.to_string(),
            Profile {
                id: id.to_string(),
                username: None,
                avatar_url: None,
            },
        );
    }

    pub(crate) fn grant_role(&self, user_id: &str, role: &str) {
        self.roles
            .borrow_mut()
            .insert((user_id.to_string(), role.to_string()));
    }

    pub(crate) fn fail_probes(&self, n: u32) {
        self.failing_probes.set(n);
    }

    /// The next `n` center reads fail with a connectivity error.
    pub(crate) fn fail_reads(&self, n: u32) {
        self.failing_reads.set(n);
    }

    pub(crate) fn fail_program_reads(&self, on: bool) {
        self.failing_program_reads.set(on);
    }

    pub(crate) fn fail_favorite_writes(&self, on: bool) {
        self.failing_favorite_writes.set(on);
    }

    pub(crate) fn fail_sign_out(&self, on: bool) {
        self.failing_sign_out.set(on);
    }

    pub(crate) fn require_confirmation(&self, on: bool) {
        self.require_confirmation.set(on);
    }

    /// Center writes fail as a backend constraint violation with `message`.
    pub(crate) fn reject_writes(&self, message: &str) {
        *self.rejected_writes.borrow_mut() = Some(message.to_string());
    }

    pub(crate) fn write_count(&self) -> u32 {
        self.writes.get()
    }

    pub(crate) fn favorite_ids(&self, user_id: &str) -> Vec<String> {
        self.favorites
            .borrow()
            .iter()
            .filter(|(u, _)| u == user_id)
            .map(|(_, c)| c.clone())
            .collect()
    }

    fn check_write(&self) -> ApiResult<()> {
        if let Some(msg) = self.rejected_writes.borrow().as_ref() {
            return Err(ApiError::http(409, &format!(r#"{{"message":"{msg}"}}"#), "Write rejected"));
        }
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn issue_token(&self, user: AuthUser) -> AuthGrant {
        let access_token = format!("token-{}-{}", user.id, self.tokens.borrow().len());
        self.tokens
            .borrow_mut()
            .insert(access_token.clone(), user.clone());
        AuthGrant { user, access_token }
    }
}

#[async_trait(?Send)]
impl CenterGateway for MemoryBackend {
    async fn probe(&self) -> ApiResult<ProbeReport> {
        if take_failure(&self.failing_probes) {
            return Err(offline());
        }
        Ok(ProbeReport {
            status_code: 200,
            endpoint: "memory://rec_centers".to_string(),
            row_count: Some(self.centers.borrow().len() as u64),
        })
    }

    async fn fetch_all(&self) -> ApiResult<Vec<Center>> {
        if take_failure(&self.failing_reads) {
            return Err(offline());
        }
        let mut out = self.centers.borrow().clone();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn fetch_by_id(&self, id: &str) -> ApiResult<Option<Center>> {
        if take_failure(&self.failing_reads) {
            return Err(offline());
        }
        Ok(self.centers.borrow().iter().find(|c| c.id == id).cloned())
    }

    async fn fetch_programs(&self, center_id: &str) -> ApiResult<Vec<Program>> {
        if self.failing_program_reads.get() {
            return Err(offline());
        }
        Ok(self
            .programs
            .borrow()
            .iter()
            .filter(|p| p.rec_center_id == center_id)
            .cloned()
            .collect())
    }

    async fn fetch_all_programs(&self) -> ApiResult<Vec<Program>> {
        if self.failing_program_reads.get() {
            return Err(offline());
        }
        Ok(self.programs.borrow().clone())
    }

    async fn create(&self, center: Center) -> ApiResult<Center> {
        self.check_write()?;
        let center = prepare_create(center);
        let mut centers = self.centers.borrow_mut();
        if centers.iter().any(|c| c.id == center.id) {
            return Err(ApiError::http(
                409,
                r#"{"message":"duplicate key value violates unique constraint"}"#,
                "Failed to create recreation center",
            ));
        }
        centers.push(center.clone());
        Ok(center)
    }

    async fn update(&self, center: Center) -> ApiResult<WriteOutcome<Center>> {
        self.check_write()?;
        let mut centers = self.centers.borrow_mut();
        Ok(match centers.iter_mut().find(|c| c.id == center.id) {
            Some(slot) => {
                *slot = center.clone();
                WriteOutcome::Applied(center)
            }
            None => WriteOutcome::NoRowsAffected,
        })
    }

    async fn delete(&self, id: &str) -> ApiResult<WriteOutcome<()>> {
        self.check_write()?;
        let mut centers = self.centers.borrow_mut();
        let before = centers.len();
        centers.retain(|c| c.id != id);
        Ok(if centers.len() == before {
            WriteOutcome::NoRowsAffected
        } else {
            WriteOutcome::Applied(())
        })
    }
}

#[async_trait(?Send)]
impl FavoriteGateway for MemoryBackend {
    async fn list_favorites(&self, user_id: &str) -> ApiResult<Vec<String>> {
        if take_failure(&self.failing_reads) {
            return Err(offline());
        }
        Ok(self.favorite_ids(user_id))
    }

    async fn add_favorite(&self, user_id: &str, center_id: &str) -> ApiResult<()> {
        if self.failing_favorite_writes.get() {
            return Err(offline());
        }
        self.favorites
            .borrow_mut()
            .insert((user_id.to_string(), center_id.to_string()));
        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, center_id: &str) -> ApiResult<()> {
        if self.failing_favorite_writes.get() {
            return Err(offline());
        }
        self.favorites
            .borrow_mut()
            .remove(&(user_id.to_string(), center_id.to_string()));
        Ok(())
    }
}

#[async_trait(?Send)]
impl AuthGateway for MemoryBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> ApiResult<SignUpOutcome> {
        if self.accounts.borrow().contains_key(email) {
            return Err(ApiError::http(
                422,
                r#"{"msg":"User already registered"}"#,
                "Sign up failed",
            ));
        }
        let id = format!("user-{}", self.accounts.borrow().len() + 1);
        self.add_account(&id, email, password);
        if let Some(p) = self.profiles.borrow_mut().get_mut(&id) {
            p.username = Some(username.to_string());
        }
        if self.require_confirmation.get() {
            return Ok(SignUpOutcome::ConfirmationRequired);
        }
        Ok(SignUpOutcome::SignedIn(self.issue_token(AuthUser {
            id,
            email: Some(email.to_string()),
        })))
    }

    async fn sign_in(&self, email: &str, password: &str) -> ApiResult<AuthGrant> {
        let account = self.accounts.borrow().get(email).cloned();
        match account {
            Some(a) if a.password == password => Ok(self.issue_token(AuthUser {
                id: a.id,
                email: Some(email.to_string()),
            })),
            _ => Err(ApiError::http(
                400,
                r#"{"error_description":"Invalid login credentials"}"#,
                "Sign in failed",
            )),
        }
    }

    async fn sign_out(&self, access_token: &str) -> ApiResult<()> {
        if self.failing_sign_out.get() {
            return Err(offline());
        }
        self.tokens.borrow_mut().remove(access_token);
        Ok(())
    }

    async fn current_user(&self, access_token: &str) -> ApiResult<Option<AuthUser>> {
        Ok(self.tokens.borrow().get(access_token).cloned())
    }

    async fn has_role(&self, user_id: &str, role: &str) -> ApiResult<bool> {
        Ok(self
            .roles
            .borrow()
            .contains(&(user_id.to_string(), role.to_string())))
    }
}

#[async_trait(?Send)]
impl ProfileGateway for MemoryBackend {
    async fn fetch_profile(&self, user_id: &str) -> ApiResult<Option<Profile>> {
        Ok(self.profiles.borrow().get(user_id).cloned())
    }

    async fn update_username(
        &self,
        user_id: &str,
        username: &str,
    ) -> ApiResult<WriteOutcome<Profile>> {
        let username = username.trim();
        if username.is_empty() {
            return Err(ApiError::validation("username", "Username cannot be empty"));
        }
        Ok(match self.profiles.borrow_mut().get_mut(user_id) {
            Some(p) => {
                p.username = Some(username.to_string());
                WriteOutcome::Applied(p.clone())
            }
            None => WriteOutcome::NoRowsAffected,
        })
    }
}
