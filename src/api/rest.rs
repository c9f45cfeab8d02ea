use super::{
    prepare_create, ApiError, ApiResult, AuthGateway, AuthGrant, AuthUser, CenterGateway,
    FavoriteGateway, ProbeReport, ProfileGateway, SignUpOutcome, WriteOutcome,
};
use crate::config::EnvConfig;
use crate::models::{Center, Favorite, Profile, Program, RowError};
use crate::util::with_timeout;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Method;
use serde::{Deserialize, Serialize};

const CENTERS: &str = "rec_centers";
const PROGRAMS: &str = "programs";
const FAVORITES: &str = "favorites";
const USER_ROLES: &str = "user_roles";
const PROFILES: &str = "profiles";

/// Bound a request by `timeout_ms`; expiry is a connectivity failure.
async fn timed<T>(fut: impl std::future::Future<Output = ApiResult<T>>, timeout_ms: u32) -> ApiResult<T> {
    with_timeout(fut, timeout_ms)
        .await
        .ok_or_else(|| ApiError::timeout(timeout_ms))?
}

/// Status, `Content-Range` and body of a finished request.
struct RawResponse {
    status: u16,
    content_range: Option<String>,
    body: String,
}

#[derive(Serialize, Clone, Debug)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpMetadata<'a>,
}

#[derive(Serialize, Clone, Debug)]
struct SignUpMetadata<'a> {
    username: &'a str,
}

#[derive(Serialize, Clone, Debug)]
struct PasswordGrantRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize, Clone, Debug)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

#[derive(Deserialize, Clone, Debug)]
struct FavoriteRow {
    rec_center_id: String,
}

/// Gateway over the hosted PostgREST (`/rest/v1`) and GoTrue (`/auth/v1`) APIs.
///
/// Holds no connection state; a fresh `reqwest::Client` is built per request.
#[derive(Clone, Debug)]
pub(crate) struct SupabaseClient {
    pub(crate) base_url: String,
    anon_key: String,
    access_token: Option<String>,
    timeout_ms: u32,
}

impl SupabaseClient {
    pub fn new(config: &EnvConfig) -> Self {
        Self {
            base_url: config.supabase_url.clone(),
            anon_key: config.supabase_anon_key.clone(),
            access_token: None,
            timeout_ms: config.request_timeout_ms,
        }
    }

    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token;
    }

    pub fn has_access_token(&self) -> bool {
        self.access_token.is_some()
    }

    fn rest_url(&self, table: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}/rest/v1/{}", self.base_url, table)
        } else {
            format!("{}/rest/v1/{}?{}", self.base_url, table, query)
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    fn bearer(&self) -> String {
        let token = self.access_token.as_deref().unwrap_or(&self.anon_key);
        format!("Bearer {}", token)
    }

    fn builder(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        debug!("{} {}", method, url);
        reqwest::Client::new()
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header("Authorization", self.bearer())
    }

    /// Send a request and read the body, all under the configured timeout.
    /// Non-2xx statuses become typed errors.
    async fn execute(&self, req: reqwest::RequestBuilder, ctx: &str) -> ApiResult<RawResponse> {
        let run = async {
            let res = req.send().await.map_err(ApiError::network)?;
            let status = res.status().as_u16();
            let content_range = res
                .headers()
                .get("content-range")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = res.text().await.map_err(ApiError::network)?;
            Ok::<_, ApiError>(RawResponse {
                status,
                content_range,
                body,
            })
        };

        let raw = timed(run, self.timeout_ms).await?;

        if (200..300).contains(&raw.status) {
            Ok(raw)
        } else {
            Err(ApiError::http(raw.status, &raw.body, ctx))
        }
    }

    async fn rows(&self, req: reqwest::RequestBuilder, ctx: &str) -> ApiResult<Vec<serde_json::Value>> {
        let raw = self.execute(req, ctx).await?;
        parse_rows(&raw.body)
    }

    fn representation(req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("Prefer", "return=representation")
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", urlencoding::encode(value))
}

fn parse_rows(body: &str) -> ApiResult<Vec<serde_json::Value>> {
    let data: serde_json::Value = serde_json::from_str(body).map_err(ApiError::parse)?;
    match data {
        serde_json::Value::Array(rows) => Ok(rows),
        other => Err(ApiError::parse(format!("expected a row array, got {other}"))),
    }
}

/// Parse a list response, skipping rows that fail validation.
fn parse_list<T>(
    rows: Vec<serde_json::Value>,
    parse: impl Fn(serde_json::Value) -> Result<T, RowError>,
) -> Vec<T> {
    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        match parse(row) {
            Ok(v) => out.push(v),
            Err(e) => warn!("skipping malformed row: {e}"),
        }
    }
    out
}

/// Parse a single-row write/read response: `None` when the array is empty.
fn parse_first<T>(
    rows: Vec<serde_json::Value>,
    parse: impl Fn(serde_json::Value) -> Result<T, RowError>,
) -> ApiResult<Option<T>> {
    match rows.into_iter().next() {
        Some(row) => Ok(Some(parse(row)?)),
        None => Ok(None),
    }
}

/// `Content-Range: 0-24/137` or `*/137` -> 137.
fn total_from_content_range(v: &str) -> Option<u64> {
    v.rsplit('/').next()?.trim().parse().ok()
}

fn profile_from_row(row: serde_json::Value) -> Result<Profile, RowError> {
    serde_json::from_value(row).map_err(|e| RowError::Shape {
        table: PROFILES,
        reason: e.to_string(),
    })
}

#[async_trait(?Send)]
impl CenterGateway for SupabaseClient {
    async fn probe(&self) -> ApiResult<ProbeReport> {
        let url = self.rest_url(CENTERS, "select=id");
        let req = self
            .builder(Method::HEAD, &url)
            .header("Prefer", "count=exact");
        let raw = self
            .execute(req, "Health check")
            .await?;
        Ok(ProbeReport {
            status_code: raw.status,
            endpoint: url,
            row_count: raw.content_range.as_deref().and_then(total_from_content_range),
        })
    }

    async fn fetch_all(&self) -> ApiResult<Vec<Center>> {
        let url = self.rest_url(CENTERS, "select=*&order=name.asc");
        let rows = self
            .rows(self.builder(Method::GET, &url), "Failed to fetch recreation centers")
            .await?;
        Ok(parse_list(rows, Center::from_row))
    }

    async fn fetch_by_id(&self, id: &str) -> ApiResult<Option<Center>> {
        let url = self.rest_url(CENTERS, &format!("select=*&id={}&limit=1", eq(id)));
        let rows = self
            .rows(self.builder(Method::GET, &url), "Failed to fetch recreation center")
            .await?;
        parse_first(rows, Center::from_row)
    }

    async fn fetch_programs(&self, center_id: &str) -> ApiResult<Vec<Program>> {
        let url = self.rest_url(PROGRAMS, &format!("select=*&rec_center_id={}", eq(center_id)));
        let rows = self
            .rows(self.builder(Method::GET, &url), "Failed to fetch center programs")
            .await?;
        Ok(parse_list(rows, Program::from_row))
    }

    async fn fetch_all_programs(&self) -> ApiResult<Vec<Program>> {
        let url = self.rest_url(PROGRAMS, "select=*");
        let rows = self
            .rows(self.builder(Method::GET, &url), "Failed to fetch programs")
            .await?;
        Ok(parse_list(rows, Program::from_row))
    }

    async fn create(&self, center: Center) -> ApiResult<Center> {
        let center = prepare_create(center);
        let url = self.rest_url(CENTERS, "");
        let req = Self::representation(self.builder(Method::POST, &url)).json(&[&center]);
        let rows = self
            .rows(req, "Failed to create recreation center")
            .await?;
        parse_first(rows, Center::from_row)?
            .ok_or_else(|| ApiError::parse("insert returned no row"))
    }

    async fn update(&self, center: Center) -> ApiResult<WriteOutcome<Center>> {
        if center.id.trim().is_empty() {
            return Err(ApiError::validation("id", "Cannot update a center without an id"));
        }
        let url = self.rest_url(CENTERS, &format!("id={}", eq(&center.id)));
        let req = Self::representation(self.builder(Method::PATCH, &url)).json(&center);
        let rows = self
            .rows(req, "Failed to update recreation center")
            .await?;
        Ok(match parse_first(rows, Center::from_row)? {
            Some(c) => WriteOutcome::Applied(c),
            None => WriteOutcome::NoRowsAffected,
        })
    }

    async fn delete(&self, id: &str) -> ApiResult<WriteOutcome<()>> {
        if id.trim().is_empty() {
            return Err(ApiError::validation("id", "Cannot delete a center without an id"));
        }
        let url = self.rest_url(CENTERS, &format!("id={}&select=id", eq(id)));
        let req = Self::representation(self.builder(Method::DELETE, &url));
        let rows = self
            .rows(req, "Failed to delete recreation center")
            .await?;
        Ok(if rows.is_empty() {
            WriteOutcome::NoRowsAffected
        } else {
            WriteOutcome::Applied(())
        })
    }
}

#[async_trait(?Send)]
impl FavoriteGateway for SupabaseClient {
    async fn list_favorites(&self, user_id: &str) -> ApiResult<Vec<String>> {
        let url = self.rest_url(FAVORITES, &format!("select=rec_center_id&user_id={}", eq(user_id)));
        let rows = self
            .rows(self.builder(Method::GET, &url), "Failed to load favorites")
            .await?;
        Ok(parse_list(rows, |row| {
            serde_json::from_value::<FavoriteRow>(row)
                .map(|r| r.rec_center_id)
                .map_err(|e| RowError::Shape {
                    table: FAVORITES,
                    reason: e.to_string(),
                })
        }))
    }

    async fn add_favorite(&self, user_id: &str, center_id: &str) -> ApiResult<()> {
        let url = self.rest_url(FAVORITES, "");
        let row = Favorite {
            user_id: user_id.to_string(),
            rec_center_id: center_id.to_string(),
        };
        let req = self
            .builder(Method::POST, &url)
            .header("Prefer", "return=minimal")
            .json(&row);
        self.execute(req, "Failed to add to favorites").await?;
        Ok(())
    }

    async fn remove_favorite(&self, user_id: &str, center_id: &str) -> ApiResult<()> {
        let url = self.rest_url(
            FAVORITES,
            &format!("user_id={}&rec_center_id={}", eq(user_id), eq(center_id)),
        );
        self.execute(self.builder(Method::DELETE, &url), "Failed to remove from favorites")
            .await?;
        Ok(())
    }
}

#[async_trait(?Send)]
impl AuthGateway for SupabaseClient {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> ApiResult<SignUpOutcome> {
        let req = self
            .builder(Method::POST, &self.auth_url("signup"))
            .json(&SignUpRequest {
                email,
                password,
                data: SignUpMetadata { username },
            });
        let raw = self.execute(req, "Sign up failed").await?;

        // With email confirmation enabled the response is the bare user object.
        match serde_json::from_str::<TokenResponse>(&raw.body) {
            Ok(t) => Ok(SignUpOutcome::SignedIn(AuthGrant {
                user: t.user,
                access_token: t.access_token,
            })),
            Err(_) => Ok(SignUpOutcome::ConfirmationRequired),
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> ApiResult<AuthGrant> {
        let req = self
            .builder(Method::POST, &self.auth_url("token?grant_type=password"))
            .json(&PasswordGrantRequest { email, password });
        let raw = self.execute(req, "Sign in failed").await?;
        let t: TokenResponse = serde_json::from_str(&raw.body).map_err(ApiError::parse)?;
        Ok(AuthGrant {
            user: t.user,
            access_token: t.access_token,
        })
    }

    async fn sign_out(&self, access_token: &str) -> ApiResult<()> {
        let req = self
            .builder(Method::POST, &self.auth_url("logout"))
            .header("Authorization", format!("Bearer {}", access_token));
        self.execute(req, "Sign out failed").await?;
        Ok(())
    }

    async fn current_user(&self, access_token: &str) -> ApiResult<Option<AuthUser>> {
        let req = self
            .builder(Method::GET, &self.auth_url("user"))
            .header("Authorization", format!("Bearer {}", access_token));
        match self.execute(req, "Session lookup failed").await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw.body).map_err(ApiError::parse)?)),
            // Expired or revoked token: there is no current user.
            Err(e) if e.kind == super::ApiErrorKind::Authorization => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn has_role(&self, user_id: &str, role: &str) -> ApiResult<bool> {
        let url = self.rest_url(
            USER_ROLES,
            &format!("select=role&user_id={}&role={}&limit=1", eq(user_id), eq(role)),
        );
        let rows = self
            .rows(self.builder(Method::GET, &url), "Failed to check user role")
            .await?;
        Ok(!rows.is_empty())
    }
}

#[async_trait(?Send)]
impl ProfileGateway for SupabaseClient {
    async fn fetch_profile(&self, user_id: &str) -> ApiResult<Option<Profile>> {
        let url = self.rest_url(
            PROFILES,
            &format!("select=id,username,avatar_url&id={}&limit=1", eq(user_id)),
        );
        let rows = self
            .rows(self.builder(Method::GET, &url), "Failed to load profile")
            .await?;
        parse_first(rows, profile_from_row)
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
        let url = self.rest_url(PROFILES, &format!("id={}", eq(user_id)));
        let req = Self::representation(self.builder(Method::PATCH, &url))
            .json(&serde_json::json!({ "username": username }));
        let rows = self
            .rows(req, "Failed to update profile")
            .await?;
        Ok(match parse_first(rows, profile_from_row)? {
            Some(p) => WriteOutcome::Applied(p),
            None => WriteOutcome::NoRowsAffected,
        })
    }
}
