//! Per-user favorite set, mirrored to the backend with optimistic updates.
//!
//! A toggle is two-phase: [`FavoriteSet::begin_toggle`] applies the tentative
//! local change and hands back a [`PendingToggle`]; once the backend answers,
//! [`FavoriteSet::settle`] either commits it or reverts to the pre-toggle state.

use crate::api::{ApiError, FavoriteGateway};
use log::{error, info};
use std::collections::BTreeSet;

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FavoriteError {
    #[error("Please sign in to save favorites")]
    AuthenticationRequired,
    #[error("A change to favorite {0} is still being saved")]
    ToggleInFlight(String),
    #[error(transparent)]
    Backend(#[from] ApiError),
}

/// Tentative local change waiting for backend confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[must_use = "a pending toggle must be settled"]
pub struct PendingToggle {
    pub user_id: String,
    pub center_id: String,
    /// `true` when the toggle adds the favorite.
    pub adding: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FavoriteSet {
    user_id: Option<String>,
    ids: BTreeSet<String>,
    pending: BTreeSet<String>,
}

impl FavoriteSet {
    /// Empty and inert: every toggle is rejected.
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn for_user(user_id: impl Into<String>, ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            ids: ids.into_iter().collect(),
            pending: BTreeSet::new(),
        }
    }

    pub async fn load(gateway: &dyn FavoriteGateway, user_id: &str) -> Result<Self, ApiError> {
        let ids = gateway.list_favorites(user_id).await?;
        info!("loaded {} favorites", ids.len());
        Ok(Self::for_user(user_id, ids))
    }

    /// Take a fresh backend listing. For the same user, ids with a toggle in
    /// flight keep their tentative state and stay pending; a listing for
    /// another user replaces the set outright.
    pub fn merge_loaded(&mut self, loaded: FavoriteSet) {
        if self.user_id != loaded.user_id {
            *self = loaded;
            return;
        }
        let mut ids = loaded.ids;
        for id in &self.pending {
            if self.ids.contains(id) {
                ids.insert(id.clone());
            } else {
                ids.remove(id);
            }
        }
        self.ids = ids;
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn is_favorite(&self, center_id: &str) -> bool {
        self.ids.contains(center_id)
    }

    pub fn is_pending(&self, center_id: &str) -> bool {
        self.pending.contains(center_id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.ids.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Apply the tentative local change. Rejected without any state change
    /// when signed out or when a toggle for the same id is still pending.
    pub fn begin_toggle(&mut self, center_id: &str) -> Result<PendingToggle, FavoriteError> {
        let user_id = self
            .user_id
            .clone()
            .ok_or(FavoriteError::AuthenticationRequired)?;
        if self.pending.contains(center_id) {
            return Err(FavoriteError::ToggleInFlight(center_id.to_string()));
        }

        let adding = !self.ids.contains(center_id);
        if adding {
            self.ids.insert(center_id.to_string());
        } else {
            self.ids.remove(center_id);
        }
        self.pending.insert(center_id.to_string());

        Ok(PendingToggle {
            user_id,
            center_id: center_id.to_string(),
            adding,
        })
    }

    /// Commit on success, revert on failure.
    ///
    /// A toggle begun for a user who has since signed out is dropped: the set
    /// it belonged to no longer exists.
    pub fn settle(&mut self, toggle: PendingToggle, result: Result<(), ApiError>) -> Result<bool, FavoriteError> {
        if self.user_id.as_deref() != Some(toggle.user_id.as_str()) {
            return result.map(|_| toggle.adding).map_err(FavoriteError::from);
        }
        self.pending.remove(&toggle.center_id);

        match result {
            // Write the confirmed state rather than trusting the tentative one
            // to still be in place.
            Ok(()) => {
                if toggle.adding {
                    self.ids.insert(toggle.center_id);
                } else {
                    self.ids.remove(&toggle.center_id);
                }
                Ok(toggle.adding)
            }
            Err(e) => {
                error!("favorite toggle for {} failed, reverting: {e}", toggle.center_id);
                if toggle.adding {
                    self.ids.remove(&toggle.center_id);
                } else {
                    self.ids.insert(toggle.center_id);
                }
                Err(FavoriteError::Backend(e))
            }
        }
    }

    /// Backend half of a toggle. Takes no `&self` so the UI can release its
    /// borrow of the set while the request is in flight.
    pub async fn send(gateway: &dyn FavoriteGateway, toggle: &PendingToggle) -> Result<(), ApiError> {
        if toggle.adding {
            gateway.add_favorite(&toggle.user_id, &toggle.center_id).await
        } else {
            gateway.remove_favorite(&toggle.user_id, &toggle.center_id).await
        }
    }

    /// Toggle and wait for the backend. Returns the new favorite state.
    pub async fn toggle(&mut self, gateway: &dyn FavoriteGateway, center_id: &str) -> Result<bool, FavoriteError> {
        let pending = self.begin_toggle(center_id)?;
        let result = Self::send(gateway, &pending).await;
        self.settle(pending, result)
    }
}
