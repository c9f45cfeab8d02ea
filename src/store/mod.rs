//! Local list store: the canonical catalog plus the filtered view derived from it.

use crate::api::{ApiResult, CenterGateway, WriteOutcome};
use crate::models::{Center, CenterDraft, Program};
use crate::search;
use log::{info, warn};

/// Everything the list page needs from one load.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Catalog {
    pub centers: Vec<Center>,
    pub programs: Vec<Program>,
}

/// Fetch centers and the programs the search joins against.
///
/// A failed program fetch does not fail the load: the centers are still
/// usable, only program-name matching is lost.
pub async fn fetch_catalog(gateway: &dyn CenterGateway) -> ApiResult<Catalog> {
    let centers = gateway.fetch_all().await?;
    let programs = match gateway.fetch_all_programs().await {
        Ok(p) => p,
        Err(e) => {
            warn!("program list unavailable, searching without programs: {e}");
            Vec::new()
        }
    };
    info!("loaded {} centers, {} programs", centers.len(), programs.len());
    Ok(Catalog { centers, programs })
}

#[derive(Clone, Debug, PartialEq)]
pub enum SavedCenter {
    Created(Center),
    Updated(Center),
    /// Update affected no rows: the id is gone or the write was not permitted.
    Missing(String),
}

/// Validate an admin draft and write it: insert when it has no id, update otherwise.
pub async fn save_center(gateway: &dyn CenterGateway, draft: CenterDraft) -> ApiResult<SavedCenter> {
    let is_new = draft.is_new();
    let center = draft.into_center()?;
    if is_new {
        return Ok(SavedCenter::Created(gateway.create(center).await?));
    }

    let id = center.id.clone();
    Ok(match gateway.update(center).await? {
        WriteOutcome::Applied(c) => SavedCenter::Updated(c),
        WriteOutcome::NoRowsAffected => SavedCenter::Missing(id),
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchSummary {
    pub query: Option<String>,
    pub shown: usize,
    pub total: usize,
}

/// Holds the canonical list and the filtered view.
///
/// `filtered` is only ever recomputed from `canonical` and the last query;
/// there is no way to mutate it directly.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CenterStore {
    canonical: Vec<Center>,
    programs: Vec<Program>,
    filtered: Vec<Center>,
    query: String,
    loaded: bool,
}

impl CenterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn canonical(&self) -> &[Center] {
        &self.canonical
    }

    pub fn filtered(&self) -> &[Center] {
        &self.filtered
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn get(&self, id: &str) -> Option<&Center> {
        self.canonical.iter().find(|c| c.id == id)
    }

    pub fn programs_for(&self, center_id: &str) -> Vec<&Program> {
        self.programs
            .iter()
            .filter(|p| p.rec_center_id == center_id)
            .collect()
    }

    /// Centers whose ids are in `ids`, in canonical order.
    pub fn resolve<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> Vec<Center> {
        let wanted: std::collections::HashSet<&str> = ids.into_iter().collect();
        self.canonical
            .iter()
            .filter(|c| wanted.contains(c.id.as_str()))
            .cloned()
            .collect()
    }

    /// Replace the catalog wholesale. The most recent caller wins; the
    /// filtered view is rebuilt under the current query.
    pub fn replace_catalog(&mut self, catalog: Catalog) {
        self.canonical = catalog.centers;
        self.programs = catalog.programs;
        self.loaded = true;
        self.refilter();
    }

    pub async fn load(&mut self, gateway: &dyn CenterGateway) -> ApiResult<usize> {
        let catalog = fetch_catalog(gateway).await?;
        let n = catalog.centers.len();
        self.replace_catalog(catalog);
        Ok(n)
    }

    pub fn apply_search(&mut self, query: &str) {
        self.query = query.to_string();
        self.refilter();
    }

    /// Append a freshly created center. A center whose id is already present
    /// replaces the existing entry instead, keeping ids unique.
    pub fn reconcile_after_create(&mut self, center: Center) {
        match self.canonical.iter_mut().find(|c| c.id == center.id) {
            Some(existing) => *existing = center,
            None => self.canonical.push(center),
        }
        self.refilter();
    }

    /// Replace in place by id. Returns `false` (and changes nothing) for an
    /// id that is not in the canonical list.
    pub fn reconcile_after_update(&mut self, updated: Center) -> bool {
        let Some(slot) = self.canonical.iter_mut().find(|c| c.id == updated.id) else {
            return false;
        };
        *slot = updated;
        self.refilter();
        true
    }

    pub fn reconcile_after_delete(&mut self, id: &str) -> bool {
        let before = self.canonical.len();
        self.canonical.retain(|c| c.id != id);
        self.programs.retain(|p| p.rec_center_id != id);
        let removed = self.canonical.len() != before;
        if removed {
            self.refilter();
        }
        removed
    }

    pub fn apply_saved(&mut self, saved: &SavedCenter) {
        match saved {
            SavedCenter::Created(c) => self.reconcile_after_create(c.clone()),
            SavedCenter::Updated(c) => {
                self.reconcile_after_update(c.clone());
            }
            // Zero rows can also mean the write was filtered out; the list
            // stays as it is and the caller reports the condition.
            SavedCenter::Missing(_) => {}
        }
    }

    pub fn summary(&self) -> SearchSummary {
        SearchSummary {
            query: search::normalize_query(&self.query).map(|_| self.query.clone()),
            shown: self.filtered.len(),
            total: self.canonical.len(),
        }
    }

    fn refilter(&mut self) {
        self.filtered = search::filter(&self.query, &self.canonical, &self.programs);
    }
}
