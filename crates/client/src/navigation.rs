//! Previous/next navigation over the full result order.

use std::collections::HashMap;

use codex_kernel::catalog::FilterModel;

use crate::fetcher::{CardFetcher, FetchError};

/// Ids adjacent to a card in the result order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Neighbors {
    pub previous: Option<String>,
    pub next: Option<String>,
}

/// Every id matching a filter selection, in listing order.
#[derive(Debug, Clone, Default)]
pub struct ResultOrder {
    ids: Vec<String>,
    positions: HashMap<String, usize>,
}

impl ResultOrder {
    pub fn from_ids(ids: Vec<String>) -> Self {
        let mut positions = HashMap::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            positions.entry(id.clone()).or_insert(i);
        }
        Self { ids, positions }
    }

    /// Load the order for `filters` from the all-ids endpoint.
    pub async fn load(
        fetcher: &dyn CardFetcher,
        filters: &FilterModel,
    ) -> Result<Self, FetchError> {
        let ids = fetcher.fetch_all_ids(filters).await?;
        tracing::debug!(count = ids.len(), "result order loaded");
        Ok(Self::from_ids(ids))
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// `None` when `id` is not part of this result order.
    pub fn neighbors(&self, id: &str) -> Option<Neighbors> {
        let at = self.position(id)?;
        Some(Neighbors {
            previous: at.checked_sub(1).map(|i| self.ids[i].clone()),
            next: self.ids.get(at + 1).cloned(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order(ids: &[&str]) -> ResultOrder {
        ResultOrder::from_ids(ids.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn middle_card_has_both_neighbors() {
        let n = order(&["a", "b", "c"]).neighbors("b").unwrap();
        assert_eq!(n.previous.as_deref(), Some("a"));
        assert_eq!(n.next.as_deref(), Some("c"));
    }

    #[test]
    fn ends_have_one_neighbor() {
        let o = order(&["a", "b", "c"]);
        assert_eq!(o.neighbors("a").unwrap().previous, None);
        assert_eq!(o.neighbors("c").unwrap().next, None);
        assert_eq!(o.neighbors("z"), None);
    }

    #[test]
    fn single_card_has_none() {
        assert_eq!(order(&["a"]).neighbors("a"), Some(Neighbors::default()));
        assert!(order(&[]).is_empty());
    }
}
