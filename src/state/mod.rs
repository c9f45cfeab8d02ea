use crate::api::SupabaseClient;
use crate::config::EnvConfig;
use crate::favorites::FavoriteSet;
use crate::health::{probe_and_fetch, LoadTracker, LoadTrigger, RetryDecision, RetryPolicy};
use crate::models::Profile;
use crate::session::{self, SessionContext};
use crate::store::CenterStore;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::{set_timeout_with_handle, TimeoutHandle};
use log::{info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const NOTICE_TTL_MS: u64 = 4_000;
static NOTICE_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum NoticeKind {
    Info,
    Error,
}

/// Non-blocking notification shown in the page corner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    seq: u64,
}

#[derive(Clone, Copy)]
pub(crate) struct AppState {
    pub config: StoredValue<EnvConfig>,
    pub client: RwSignal<SupabaseClient>,
    pub session: RwSignal<SessionContext>,
    pub profile: RwSignal<Option<Profile>>,

    /// Canonical list + filtered view.
    pub store: RwSignal<CenterStore>,
    pub load: RwSignal<LoadTracker>,
    /// Pending auto-retry timer; cleared when the list unmounts.
    pub retry_timer: RwSignal<Option<TimeoutHandle>>,

    pub favorites: RwSignal<FavoriteSet>,
    pub search_query: RwSignal<String>,
    pub notice: RwSignal<Option<Notice>>,
}

impl AppState {
    pub fn new() -> Self {
        let config = EnvConfig::new();
        let session = SessionContext::restore();

        let mut client = SupabaseClient::new(&config);
        client.set_access_token(session.access_token().map(str::to_string));

        let favorites = match session.user_id() {
            Some(uid) => FavoriteSet::for_user(uid, Vec::new()),
            None => FavoriteSet::signed_out(),
        };

        Self {
            load: RwSignal::new(LoadTracker::new(RetryPolicy::from_config(&config))),
            config: StoredValue::new(config),
            client: RwSignal::new(client),
            session: RwSignal::new(session),
            profile: RwSignal::new(None),
            store: RwSignal::new(CenterStore::new()),
            retry_timer: RwSignal::new(None),
            favorites: RwSignal::new(favorites),
            search_query: RwSignal::new(crate::storage::load_last_query()),
            notice: RwSignal::new(None),
        }
    }

    pub fn notify(&self, kind: NoticeKind, message: impl Into<String>) {
        let seq = NOTICE_SEQ.fetch_add(1, Ordering::Relaxed);
        self.notice.set(Some(Notice {
            kind,
            message: message.into(),
            seq,
        }));

        let notice = self.notice;
        let scheduled = set_timeout_with_handle(
            move || {
                if notice.get_untracked().is_some_and(|n| n.seq == seq) {
                    notice.set(None);
                }
            },
            Duration::from_millis(NOTICE_TTL_MS),
        );
        if let Err(e) = scheduled {
            warn!("could not schedule notice dismissal: {e:?}");
        }
    }

    pub fn notify_error(&self, message: impl Into<String>) {
        self.notify(NoticeKind::Error, message);
    }

    /// Probe, fetch, and apply the result. Failures on the initial path
    /// schedule a bounded number of automatic retries.
    pub fn start_load(self, trigger: LoadTrigger) {
        if trigger == LoadTrigger::UserRetry {
            self.cancel_retry();
        }
        let Some(attempt) = self.load.try_update(|t| t.begin(trigger)) else {
            return;
        };
        let client = self.client.get_untracked();

        spawn_local(async move {
            let outcome = probe_and_fetch(&client, attempt).await;

            let mut decision = None;
            self.store.update(|store| {
                self.load
                    .update(|t| decision = t.finish(trigger, outcome, store));
            });

            match decision {
                Some(RetryDecision::AutoRetry { retry, delay_ms }) => {
                    warn!("load failed, auto retry {retry} in {delay_ms} ms");
                    self.schedule_retry(delay_ms);
                }
                Some(RetryDecision::WaitForUser) => {
                    if let Some(msg) = self.load.with_untracked(|t| t.error_banner().map(str::to_string)) {
                        self.notify_error(msg);
                    }
                }
                None => {}
            }
        });
    }

    fn schedule_retry(self, delay_ms: u32) {
        let handle = set_timeout_with_handle(
            move || {
                self.retry_timer.set(None);
                let due = self.load.try_update(|t| t.take_pending_retry()).unwrap_or(false);
                if due {
                    self.start_load(LoadTrigger::AutoRetry);
                }
            },
            Duration::from_millis(u64::from(delay_ms)),
        );
        match handle {
            Ok(h) => self.retry_timer.set(Some(h)),
            Err(e) => warn!("could not schedule retry: {e:?}"),
        }
    }

    /// Drop any scheduled auto retry. Already committed writes are untouched.
    pub fn cancel_retry(&self) {
        if let Some(h) = self.retry_timer.get_untracked() {
            h.clear();
        }
        self.retry_timer.set(None);
        self.load.update(|t| t.cancel_pending());
    }

    /// Install a new session context: token, persistence, per-user state.
    pub fn set_session(self, ctx: SessionContext) {
        ctx.persist();
        self.client
            .update(|c| c.set_access_token(ctx.access_token().map(str::to_string)));
        // Same user (e.g. a revalidated session): keep favorites so toggles
        // in flight stay pending.
        let same_user = self.favorites.with_untracked(|f| f.user_id() == ctx.user_id());
        if !same_user {
            self.profile.set(None);
            self.favorites.set(match ctx.user_id() {
                Some(uid) => FavoriteSet::for_user(uid, Vec::new()),
                None => FavoriteSet::signed_out(),
            });
        }
        let signed_in = ctx.is_signed_in();
        self.session.set(ctx);
        if signed_in {
            self.load_user_data();
        }
    }

    /// Favorites and profile of the signed-in user.
    pub fn load_user_data(self) {
        let Some(s) = self.session.get_untracked().session().cloned() else {
            return;
        };
        let client = self.client.get_untracked();
        spawn_local(async move {
            match FavoriteSet::load(&client, &s.user_id).await {
                // Ignore a result for a user who signed out meanwhile.
                Ok(set) if self.session.get_untracked().user_id() == Some(s.user_id.as_str()) => {
                    self.favorites.update(|f| f.merge_loaded(set));
                }
                Ok(_) => {}
                Err(e) => self.notify_error(format!("Failed to load favorites: {e}")),
            }
            match session::load_profile(&client, &s).await {
                Ok(p) => self.profile.set(p),
                Err(e) => warn!("profile unavailable: {e}"),
            }
        });
    }

    /// Check a restored session against the backend once at start-up.
    pub fn revalidate_session(self) {
        let Some(s) = self.session.get_untracked().session().cloned() else {
            return;
        };
        let client = self.client.get_untracked();
        spawn_local(async move {
            let ctx = session::revalidate(&client, s).await;
            if !ctx.is_signed_in() {
                info!("stored session expired");
            }
            self.set_session(ctx);
        });
    }

    /// Optimistic favorite toggle; the local change is reverted if the
    /// backend write fails.
    pub fn toggle_favorite(self, center_id: String) {
        let pending = match self.favorites.try_update(|f| f.begin_toggle(&center_id)) {
            Some(Ok(p)) => p,
            Some(Err(e)) => {
                self.notify_error(e.to_string());
                return;
            }
            None => return,
        };
        let client = self.client.get_untracked();
        spawn_local(async move {
            let result = FavoriteSet::send(&client, &pending).await;
            match self.favorites.try_update(|f| f.settle(pending, result)) {
                Some(Ok(true)) => self.notify(NoticeKind::Info, "Added to favorites"),
                Some(Ok(false)) => self.notify(NoticeKind::Info, "Removed from favorites"),
                Some(Err(e)) => self.notify_error(e.to_string()),
                None => {}
            }
        });
    }

    pub fn sign_out(self) {
        let mut ctx = self.session.get_untracked();
        let client = self.client.get_untracked();
        spawn_local(async move {
            session::sign_out(&client, &mut ctx).await;
            self.set_session(ctx);
            self.notify(NoticeKind::Info, "Signed out");
        });
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
pub(crate) struct AppContext(pub AppState);
