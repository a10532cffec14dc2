//! Query-string codec for the filter model.
//!
//! The listing endpoint and the client URL mirror share these parameter
//! names, so one codec serves both directions. Facet values are forgiving
//! (unknown tokens are dropped, malformed numbers fall back to the facet
//! default); the pagination window is structural and rejected when invalid.

use std::collections::BTreeSet;

use thiserror::Error;
use url::form_urlencoded;

use super::filter::{
    COMBAT_DEFAULT, COST_DEFAULT, FilterModel, RarityTag, SearchMode, SortKey, StatMode,
    StatRange, TypeTag,
};

/// Invalid pagination window in a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParamError {
    #[error("{name} must be an integer, got {value:?}")]
    NotAnInteger { name: &'static str, value: String },

    #[error("{name} must be at least {min}, got {value}")]
    OutOfRange {
        name: &'static str,
        value: i64,
        min: i64,
    },
}

/// Parsed `offset`/`limit` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: i64,
    pub limit: i64,
}

struct QueryPairs(Vec<(String, String)>);

impl QueryPairs {
    fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        Self(form_urlencoded::parse(query.as_bytes()).into_owned().collect())
    }

    /// First non-blank value for `key`.
    fn first(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .find(|v| !v.is_empty())
    }

    /// All comma-separated tokens for `key`, across repeated keys.
    fn tokens<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k == key)
            .flat_map(|(_, v)| v.split(','))
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    fn string_set(&self, key: &str) -> BTreeSet<String> {
        self.tokens(key).map(str::to_string).collect()
    }

    fn int_or(&self, key: &str, default: i32) -> i32 {
        match self.first(key) {
            Some(raw) => raw.parse().unwrap_or_else(|_| {
                tracing::debug!(param = key, value = raw, "non-numeric value, using default");
                default
            }),
            None => default,
        }
    }

    fn range(&self, min_key: &str, max_key: &str, default: StatRange) -> StatRange {
        StatRange::new(
            self.int_or(min_key, default.min),
            self.int_or(max_key, default.max),
        )
    }

    /// Exact-mode value when `key` is present and numeric, else range mode.
    fn stat(
        &self,
        key: &str,
        min_key: &str,
        max_key: &str,
        default: StatRange,
    ) -> (StatMode, StatRange) {
        if let Some(raw) = self.first(key) {
            match raw.parse::<i32>() {
                Ok(value) => return (StatMode::Exact, StatRange::exact(value)),
                Err(_) => {
                    tracing::debug!(param = key, value = raw, "non-numeric value, ignoring");
                }
            }
        }
        (StatMode::Range, self.range(min_key, max_key, default))
    }

    fn window_value(&self, name: &'static str, default: i64, min: i64) -> Result<i64, ParamError> {
        let Some(raw) = self.first(name) else {
            return Ok(default);
        };
        let value = raw.parse::<i64>().map_err(|_| ParamError::NotAnInteger {
            name,
            value: raw.to_string(),
        })?;
        if value < min {
            return Err(ParamError::OutOfRange { name, value, min });
        }
        Ok(value)
    }
}

/// Parse the facet, search and sort parameters of a query string.
///
/// The returned model has the default pagination window; see
/// [`parse_window`] for `offset`/`limit`.
pub fn parse_filters(query: &str) -> FilterModel {
    let pairs = QueryPairs::parse(query);

    let types = pairs
        .tokens("type")
        .filter_map(|t| {
            let tag = TypeTag::parse(t);
            if tag.is_none() {
                tracing::debug!(value = t, "dropping unknown type filter");
            }
            tag
        })
        .collect();

    let rarities = pairs
        .tokens("rarity")
        .filter_map(|t| {
            let tag = RarityTag::parse(t);
            if tag.is_none() {
                tracing::debug!(value = t, "dropping unknown rarity filter");
            }
            tag
        })
        .collect();

    let (attack_mode, attack) = pairs.stat("attack", "attackMin", "attackMax", COMBAT_DEFAULT);
    let (defense_mode, defense) =
        pairs.stat("defense", "defenseMin", "defenseMax", COMBAT_DEFAULT);

    let (search_text, search_mode) = if let Some(text) = pairs.first("combinedSearch") {
        (text.to_string(), SearchMode::Both)
    } else if let Some(text) = pairs.first("search") {
        (text.to_string(), SearchMode::Name)
    } else if let Some(text) = pairs.first("effect") {
        (text.to_string(), SearchMode::Effect)
    } else {
        (String::new(), SearchMode::Name)
    };

    let sort = pairs
        .first("sort")
        .and_then(SortKey::parse)
        .unwrap_or_default();

    FilterModel {
        types,
        cabins: pairs.string_set("cabin"),
        rarities,
        sets: pairs.string_set("set"),
        taxa: pairs.string_set("taxa"),
        weather: pairs.string_set("weather"),
        traits: pairs.string_set("traits"),
        illustrators: pairs.string_set("illustrators"),
        cost: pairs.range("costMin", "costMax", COST_DEFAULT),
        attack_mode,
        attack,
        defense_mode,
        defense,
        search_text,
        search_mode,
        sort,
        ..FilterModel::default()
    }
}

/// Parse `offset` and `limit`, capping `limit` at `max_limit`.
pub fn parse_window(
    query: &str,
    default_limit: i64,
    max_limit: i64,
) -> Result<PageWindow, ParamError> {
    let pairs = QueryPairs::parse(query);
    let offset = pairs.window_value("offset", 0, 0)?;
    let requested = pairs.window_value("limit", default_limit, 1)?;

    let limit = if requested > max_limit {
        tracing::warn!(
            requested = requested,
            capped = max_limit,
            "limit exceeds maximum, capping"
        );
        max_limit
    } else {
        requested
    };

    Ok(PageWindow { offset, limit })
}

/// Parse filters and pagination window together.
pub fn parse_listing(
    query: &str,
    default_limit: i64,
    max_limit: i64,
) -> Result<FilterModel, ParamError> {
    let window = parse_window(query, default_limit, max_limit)?;
    let mut filters = parse_filters(query);
    filters.offset = window.offset;
    filters.limit = window.limit;
    Ok(filters)
}

/// Serialize a filter model to a query string.
///
/// Defaults are omitted and keys are emitted in a fixed order, so equal
/// models always produce equal strings. `offset`/`limit` are appended only
/// when `include_window` is set.
pub fn to_query_string(filters: &FilterModel, include_window: bool) -> String {
    let mut out = form_urlencoded::Serializer::new(String::new());

    fn join<'a>(values: impl Iterator<Item = &'a str>) -> String {
        values.collect::<Vec<_>>().join(",")
    }

    if !filters.types.is_empty() {
        out.append_pair("type", &join(filters.types.iter().map(|t| t.as_str())));
    }
    if !filters.cabins.is_empty() {
        out.append_pair("cabin", &join(filters.cabins.iter().map(String::as_str)));
    }
    if !filters.rarities.is_empty() {
        out.append_pair("rarity", &join(filters.rarities.iter().map(|r| r.as_str())));
    }
    for (key, values) in [
        ("set", &filters.sets),
        ("taxa", &filters.taxa),
        ("weather", &filters.weather),
        ("traits", &filters.traits),
        ("illustrators", &filters.illustrators),
    ] {
        if !values.is_empty() {
            out.append_pair(key, &join(values.iter().map(String::as_str)));
        }
    }

    if filters.cost != COST_DEFAULT {
        out.append_pair("costMin", &filters.cost.min.to_string());
        out.append_pair("costMax", &filters.cost.max.to_string());
    }

    for (exact_key, min_key, max_key, mode, range) in [
        (
            "attack",
            "attackMin",
            "attackMax",
            filters.attack_mode,
            filters.attack,
        ),
        (
            "defense",
            "defenseMin",
            "defenseMax",
            filters.defense_mode,
            filters.defense,
        ),
    ] {
        match mode {
            StatMode::Exact => {
                out.append_pair(exact_key, &range.min.to_string());
            }
            StatMode::Range if range != COMBAT_DEFAULT => {
                out.append_pair(min_key, &range.min.to_string());
                out.append_pair(max_key, &range.max.to_string());
            }
            StatMode::Range => {}
        }
    }

    if let Some(term) = filters.search_term() {
        let key = match filters.search_mode {
            SearchMode::Name => "search",
            SearchMode::Effect => "effect",
            SearchMode::Both => "combinedSearch",
        };
        out.append_pair(key, term);
    }

    if filters.sort != SortKey::default() {
        out.append_pair("sort", filters.sort.as_str());
    }

    if include_window {
        out.append_pair("offset", &filters.offset.to_string());
        out.append_pair("limit", &filters.limit.to_string());
    }

    out.finish()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::catalog::filter::{DEFAULT_LIMIT, Direction, SortField};

    #[test]
    fn empty_query_is_default_model() {
        assert_eq!(parse_filters(""), FilterModel::default());
        assert_eq!(parse_filters("?"), FilterModel::default());
    }

    #[test]
    fn multi_valued_params_split_on_commas() {
        let f = parse_filters("type=cryptid,trail&taxa=Avian,%20Fae&taxa=Golem&cabin=,Quartz,");
        assert_eq!(
            f.types,
            [TypeTag::Cryptid, TypeTag::Trail].into_iter().collect()
        );
        assert_eq!(
            f.taxa,
            ["Avian", "Fae", "Golem"]
                .into_iter()
                .map(String::from)
                .collect()
        );
        assert_eq!(f.cabins.len(), 1);
    }

    #[test]
    fn unknown_type_and_rarity_dropped() {
        let f = parse_filters("type=cryptid,wizard&rarity=mythic,rare");
        assert_eq!(f.types, [TypeTag::Cryptid].into_iter().collect());
        assert_eq!(f.rarities, [RarityTag::Rare].into_iter().collect());
    }

    #[test]
    fn malformed_numbers_fall_back_to_defaults() {
        let f = parse_filters("costMin=abc&costMax=4&attackMin=NaN&attackMax=x");
        assert_eq!(f.cost, StatRange { min: 0, max: 4 });
        assert_eq!(f.attack_mode, StatMode::Range);
        assert_eq!(f.attack, COMBAT_DEFAULT);
    }

    #[test]
    fn reversed_range_is_swapped() {
        let f = parse_filters("costMin=5&costMax=2");
        assert_eq!(f.cost, StatRange { min: 2, max: 5 });
    }

    #[test]
    fn exact_attack_wins_over_range() {
        let f = parse_filters("attack=7&attackMin=1&attackMax=3&defenseMin=2&defenseMax=9");
        assert_eq!(f.attack_mode, StatMode::Exact);
        assert_eq!(f.attack.min, 7);
        assert_eq!(f.defense_mode, StatMode::Range);
        assert_eq!(f.defense, StatRange { min: 2, max: 9 });
    }

    #[test]
    fn search_precedence() {
        let f = parse_filters("search=a&effect=b&combinedSearch=c");
        assert_eq!((f.search_text.as_str(), f.search_mode), ("c", SearchMode::Both));

        let f = parse_filters("search=a&effect=b");
        assert_eq!((f.search_text.as_str(), f.search_mode), ("a", SearchMode::Name));

        let f = parse_filters("effect=b&search=");
        assert_eq!((f.search_text.as_str(), f.search_mode), ("b", SearchMode::Effect));
    }

    #[test]
    fn unknown_sort_uses_default() {
        assert_eq!(parse_filters("sort=random").sort, SortKey::default());
        assert_eq!(
            parse_filters("sort=def_desc").sort,
            SortKey::new(SortField::Defense, Direction::Desc)
        );
    }

    #[test]
    fn window_defaults_and_caps() {
        assert_eq!(
            parse_window("", DEFAULT_LIMIT, 100).unwrap(),
            PageWindow {
                offset: 0,
                limit: DEFAULT_LIMIT
            }
        );
        assert_eq!(
            parse_window("offset=24&limit=500", DEFAULT_LIMIT, 100).unwrap(),
            PageWindow {
                offset: 24,
                limit: 100
            }
        );
    }

    #[test]
    fn window_rejects_structural_errors() {
        assert!(matches!(
            parse_window("offset=1.5", DEFAULT_LIMIT, 100),
            Err(ParamError::NotAnInteger { name: "offset", .. })
        ));
        assert!(matches!(
            parse_window("offset=-12", DEFAULT_LIMIT, 100),
            Err(ParamError::OutOfRange { name: "offset", .. })
        ));
        assert!(matches!(
            parse_window("limit=0", DEFAULT_LIMIT, 100),
            Err(ParamError::OutOfRange { name: "limit", .. })
        ));
    }

    #[test]
    fn default_model_serializes_empty() {
        assert_eq!(to_query_string(&FilterModel::default(), false), "");
        assert_eq!(
            to_query_string(&FilterModel::default(), true),
            "offset=0&limit=12"
        );
    }

    #[test]
    fn serialization_is_order_independent() {
        let mut a = FilterModel::default();
        a.types.insert(TypeTag::Trail);
        a.types.insert(TypeTag::Cryptid);
        let mut b = FilterModel::default();
        b.types.insert(TypeTag::Cryptid);
        b.types.insert(TypeTag::Trail);
        assert_eq!(to_query_string(&a, false), to_query_string(&b, false));
        assert_eq!(to_query_string(&a, false), "type=cryptid%2Ctrail");
    }

    #[test]
    fn serialized_model_parses_back() {
        let mut f = FilterModel::default();
        f.types.insert(TypeTag::SpecialLantern);
        f.rarities.insert(RarityTag::Unique);
        f.cabins.insert("Lapis".to_string());
        f.weather.insert("Rain".to_string());
        f.cost = StatRange::new(1, 3);
        f.attack_mode = StatMode::Exact;
        f.attack = StatRange::exact(4);
        f.defense = StatRange::new(2, 8);
        f.search_text = "moth & man".to_string();
        f.search_mode = SearchMode::Both;
        f.sort = SortKey::new(SortField::SetNumber, Direction::Desc);

        let query = to_query_string(&f, false);
        assert_eq!(parse_filters(&query), f);
    }
}
