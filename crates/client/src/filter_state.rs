//! Client filter state controller.
//!
//! Owns the [`FilterModel`] for a browsing session. The model is imported
//! from the page URL exactly once, then every edit is mirrored back to the
//! URL with a history *replace*. An edit only counts as a change when the
//! serialized selection differs from the previous serialization, and a
//! change always asks for a replace-fetch from offset zero.

use std::collections::BTreeSet;

use thiserror::Error;

use codex_kernel::catalog::vocabulary::{TAXA, is_all_taxa};
use codex_kernel::catalog::{
    FilterModel, RarityTag, SearchMode, SortKey, StatMode, StatRange, TypeTag, parse_filters,
    to_query_string,
};

use crate::history::HistoryPort;

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    /// Filters were imported from the URL; the initial fetch is pending.
    Hydrated,
    /// Listening for edits.
    Steady,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("filters were already hydrated")]
    AlreadyHydrated,

    #[error("controller is {0:?}, expected {1:?}")]
    WrongPhase(Phase, Phase),
}

/// A single user edit to the facet controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEdit {
    ToggleType(TypeTag),
    ToggleRarity(RarityTag),
    ToggleCabin(String),
    ToggleSet(String),
    /// Toggling the "All Taxa" sentinel selects the whole vocabulary, or
    /// clears it when everything is already selected.
    ToggleTaxon(String),
    ToggleWeather(String),
    ToggleTrait(String),
    ToggleIllustrator(String),
    SetCost(StatRange),
    SetAttack(StatMode, StatRange),
    SetDefense(StatMode, StatRange),
    SetSearchMode(SearchMode),
    SetSort(SortKey),
    ClearTaxa,
    ClearAll,
}

/// Owns the filter selection and its URL mirror.
pub struct FilterStateController<H> {
    phase: Phase,
    filters: FilterModel,
    /// Raw search input not yet folded into `filters`.
    pending_search: String,
    /// Serialization of `filters` without the pagination window.
    last_serialized: String,
    page_limit: i64,
    history: H,
}

impl<H: HistoryPort> FilterStateController<H> {
    pub fn new(history: H, page_limit: i64) -> Self {
        Self {
            phase: Phase::Uninitialized,
            filters: FilterModel::default().with_window(0, page_limit),
            pending_search: String::new(),
            last_serialized: String::new(),
            page_limit,
            history,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Current filters, positioned at the first page.
    pub fn filters(&self) -> &FilterModel {
        &self.filters
    }

    pub fn pending_search(&self) -> &str {
        &self.pending_search
    }

    /// The URL query the filters are mirrored to.
    pub fn query_string(&self) -> &str {
        &self.last_serialized
    }

    /// Import filters from the page URL. Allowed exactly once.
    ///
    /// Returns the filters for the initial replace-fetch. The URL is
    /// rewritten only when its canonical form differs from what was loaded.
    pub fn hydrate(&mut self, url_query: &str) -> Result<FilterModel, ControllerError> {
        if self.phase != Phase::Uninitialized {
            return Err(ControllerError::AlreadyHydrated);
        }

        let mut filters = parse_filters(url_query);
        filters.taxa = normalize_taxa(filters.taxa);
        self.filters = filters.with_window(0, self.page_limit);
        self.pending_search = self.filters.search_text.clone();
        self.last_serialized = to_query_string(&self.filters, false);

        let raw = url_query.strip_prefix('?').unwrap_or(url_query);
        if raw != self.last_serialized {
            self.history.replace(&self.last_serialized);
        }

        self.phase = Phase::Hydrated;
        tracing::debug!(query = %self.last_serialized, "filters hydrated from URL");
        Ok(self.filters.clone())
    }

    /// Start listening for edits once the initial fetch has been issued.
    pub fn listen(&mut self) -> Result<(), ControllerError> {
        if self.phase != Phase::Hydrated {
            return Err(ControllerError::WrongPhase(self.phase, Phase::Hydrated));
        }
        self.phase = Phase::Steady;
        Ok(())
    }

    /// Apply an edit. Returns the filters to replace-fetch when the
    /// selection actually changed.
    pub fn edit(&mut self, edit: FilterEdit) -> Result<Option<FilterModel>, ControllerError> {
        self.require_steady()?;

        let mut next = self.filters.clone();
        match edit {
            FilterEdit::ToggleType(tag) => toggle(&mut next.types, tag),
            FilterEdit::ToggleRarity(tag) => toggle(&mut next.rarities, tag),
            FilterEdit::ToggleCabin(name) => toggle(&mut next.cabins, name),
            FilterEdit::ToggleSet(name) => toggle(&mut next.sets, name),
            FilterEdit::ToggleTaxon(taxon) if is_all_taxa(&taxon) => {
                let everything: BTreeSet<String> = TAXA.iter().map(|t| t.to_string()).collect();
                next.taxa = if next.taxa == everything {
                    BTreeSet::new()
                } else {
                    everything
                };
            }
            FilterEdit::ToggleTaxon(taxon) => toggle(&mut next.taxa, taxon),
            FilterEdit::ToggleWeather(name) => toggle(&mut next.weather, name),
            FilterEdit::ToggleTrait(name) => toggle(&mut next.traits, name),
            FilterEdit::ToggleIllustrator(name) => toggle(&mut next.illustrators, name),
            FilterEdit::SetCost(range) => next.cost = range,
            FilterEdit::SetAttack(mode, range) => {
                next.attack_mode = mode;
                next.attack = range;
            }
            FilterEdit::SetDefense(mode, range) => {
                next.defense_mode = mode;
                next.defense = range;
            }
            FilterEdit::SetSearchMode(mode) => next.search_mode = mode,
            FilterEdit::SetSort(sort) => next.sort = sort,
            FilterEdit::ClearTaxa => next.taxa.clear(),
            FilterEdit::ClearAll => {
                next = FilterModel::default();
                self.pending_search.clear();
            }
        }

        Ok(self.commit(next))
    }

    /// Record raw search input. Nothing is fetched until
    /// [`commit_search`](Self::commit_search) runs after the debounce window.
    pub fn set_search_input(&mut self, text: &str) {
        self.pending_search = text.to_string();
    }

    /// Fold the pending search input into the filters.
    pub fn commit_search(&mut self) -> Result<Option<FilterModel>, ControllerError> {
        self.require_steady()?;
        let mut next = self.filters.clone();
        next.search_text = self.pending_search.trim().to_string();
        Ok(self.commit(next))
    }

    fn commit(&mut self, next: FilterModel) -> Option<FilterModel> {
        // Keep edits that do not serialize (a search mode with no text) so
        // they apply once the selection does change.
        self.filters = next.with_window(0, self.page_limit);
        let serialized = to_query_string(&self.filters, false);
        if serialized == self.last_serialized {
            return None;
        }

        self.last_serialized = serialized;
        self.history.replace(&self.last_serialized);
        tracing::debug!(query = %self.last_serialized, "filters changed");
        Some(self.filters.clone())
    }

    fn require_steady(&self) -> Result<(), ControllerError> {
        if self.phase == Phase::Steady {
            Ok(())
        } else {
            Err(ControllerError::WrongPhase(self.phase, Phase::Steady))
        }
    }
}

fn toggle<T: Ord>(set: &mut BTreeSet<T>, value: T) {
    if !set.remove(&value) {
        set.insert(value);
    }
}

/// Expand an "All Taxa" token from the URL into the full vocabulary.
fn normalize_taxa(taxa: BTreeSet<String>) -> BTreeSet<String> {
    if taxa.iter().any(|t| is_all_taxa(t)) {
        TAXA.iter().map(|t| t.to_string()).collect()
    } else {
        taxa
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::history::MemoryHistory;
    use codex_kernel::catalog::{COST_DEFAULT, DEFAULT_LIMIT};

    fn steady(query: &str) -> (FilterStateController<MemoryHistory>, MemoryHistory) {
        let history = MemoryHistory::new();
        let mut controller = FilterStateController::new(history.clone(), DEFAULT_LIMIT);
        controller.hydrate(query).unwrap();
        controller.listen().unwrap();
        (controller, history)
    }

    #[test]
    fn hydrates_exactly_once() {
        let mut controller = FilterStateController::new(MemoryHistory::new(), DEFAULT_LIMIT);
        assert_eq!(controller.phase(), Phase::Uninitialized);

        let filters = controller.hydrate("?type=cryptid&offset=48").unwrap();
        assert!(filters.types.contains(&TypeTag::Cryptid));
        assert_eq!(filters.offset, 0);
        assert_eq!(controller.phase(), Phase::Hydrated);

        assert_eq!(
            controller.hydrate("type=trail"),
            Err(ControllerError::AlreadyHydrated)
        );
        assert!(controller.filters().types.contains(&TypeTag::Cryptid));
    }

    #[test]
    fn edits_rejected_before_listening() {
        let mut controller = FilterStateController::new(MemoryHistory::new(), DEFAULT_LIMIT);
        assert!(controller.edit(FilterEdit::ClearAll).is_err());
        controller.hydrate("").unwrap();
        assert!(controller.edit(FilterEdit::ClearAll).is_err());
        controller.listen().unwrap();
        assert!(controller.listen().is_err());
    }

    #[test]
    fn canonical_url_is_not_rewritten_on_hydrate() {
        let history = MemoryHistory::new();
        let mut controller = FilterStateController::new(history.clone(), DEFAULT_LIMIT);
        controller.hydrate("type=cryptid").unwrap();
        assert!(history.replacements().is_empty());

        let history = MemoryHistory::new();
        let mut controller = FilterStateController::new(history.clone(), DEFAULT_LIMIT);
        controller.hydrate("type=cryptid,bogus&page=3").unwrap();
        assert_eq!(history.replacements(), vec!["type=cryptid".to_string()]);
    }

    #[test]
    fn change_replaces_history_and_resets_offset() {
        let (mut controller, history) = steady("");
        let reset = controller
            .edit(FilterEdit::ToggleType(TypeTag::Lantern))
            .unwrap()
            .expect("toggling a type is a change");
        assert_eq!(reset.offset, 0);
        assert_eq!(reset.limit, DEFAULT_LIMIT);
        assert_eq!(history.current().as_deref(), Some("type=lantern"));
    }

    #[test]
    fn identical_value_is_not_a_change() {
        let (mut controller, history) = steady("costMin=1&costMax=3");

        let same = controller
            .edit(FilterEdit::SetCost(StatRange::new(3, 1)))
            .unwrap();
        assert!(same.is_none());
        assert!(history.replacements().is_empty());

        let changed = controller
            .edit(FilterEdit::SetCost(COST_DEFAULT))
            .unwrap();
        assert!(changed.is_some());
        assert_eq!(history.current().as_deref(), Some(""));
    }

    #[test]
    fn toggle_twice_returns_to_original_selection() {
        let (mut controller, history) = steady("");
        controller
            .edit(FilterEdit::ToggleCabin("Quartz".into()))
            .unwrap();
        let back = controller
            .edit(FilterEdit::ToggleCabin("Quartz".into()))
            .unwrap();
        assert!(back.unwrap().cabins.is_empty());
        assert_eq!(
            history.replacements(),
            vec!["cabin=Quartz".to_string(), String::new()]
        );
    }

    #[test]
    fn all_taxa_sentinel_expands_to_vocabulary() {
        let (mut controller, _history) = steady("");
        let all = controller
            .edit(FilterEdit::ToggleTaxon("All Taxa".into()))
            .unwrap()
            .unwrap();
        assert_eq!(all.taxa.len(), TAXA.len());
        assert!(!all.taxa.iter().any(|t| is_all_taxa(t)));

        let cleared = controller
            .edit(FilterEdit::ToggleTaxon("All Taxa".into()))
            .unwrap()
            .unwrap();
        assert!(cleared.taxa.is_empty());
    }

    #[test]
    fn sentinel_in_url_expands_on_hydrate() {
        let (controller, _history) = steady("taxa=All%20Taxa");
        assert_eq!(controller.filters().taxa.len(), TAXA.len());
    }

    #[test]
    fn search_input_waits_for_commit() {
        let (mut controller, history) = steady("");
        controller.set_search_input("m");
        controller.set_search_input("mot");
        controller.set_search_input("moth ");
        assert!(history.replacements().is_empty());
        assert_eq!(controller.filters().search_text, "");

        let reset = controller.commit_search().unwrap().unwrap();
        assert_eq!(reset.search_text, "moth");
        assert_eq!(history.current().as_deref(), Some("search=moth"));

        // Committing the same text again changes nothing.
        assert!(controller.commit_search().unwrap().is_none());
    }

    #[test]
    fn search_mode_switch_without_text_is_not_a_change() {
        let (mut controller, _history) = steady("");
        assert!(
            controller
                .edit(FilterEdit::SetSearchMode(SearchMode::Both))
                .unwrap()
                .is_none()
        );
        controller.set_search_input("howl");
        let reset = controller.commit_search().unwrap().unwrap();
        assert_eq!(reset.search_mode, SearchMode::Both);
        assert_eq!(controller.query_string(), "combinedSearch=howl");
    }

    #[test]
    fn clear_all_drops_pending_search() {
        let (mut controller, _history) = steady("search=yeti&type=trail");
        assert_eq!(controller.pending_search(), "yeti");
        let reset = controller.edit(FilterEdit::ClearAll).unwrap().unwrap();
        assert_eq!(reset, FilterModel::default());
        assert_eq!(controller.pending_search(), "");
    }
}
