//! Filter model for the card catalog.
//!
//! A `FilterModel` is a plain value describing the active facet selection.
//! Set-valued facets use `BTreeSet` so iteration order (and therefore the
//! order of bound parameters and the serialized query string) depends only
//! on the selected values, never on the order they were chosen in.

use std::collections::BTreeSet;
use std::fmt;

/// Default page size for the listing endpoint.
pub const DEFAULT_LIMIT: i64 = 12;

/// Full-range default for cost.
pub const COST_DEFAULT: StatRange = StatRange { min: 0, max: 6 };

/// Full-range default for attack and defense.
pub const COMBAT_DEFAULT: StatRange = StatRange { min: 0, max: 15 };

/// Card type facet.
///
/// Each tag maps to exactly one boolean column through a closed match in the
/// query builder; there is no string path from user input to a column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TypeTag {
    Cryptid,
    Lantern,
    Trail,
    Supply,
    Memory,
    Trap,
    Environment,
    Czo,
    SpecialLantern,
}

impl TypeTag {
    pub const ALL: [TypeTag; 9] = [
        TypeTag::Cryptid,
        TypeTag::Lantern,
        TypeTag::Trail,
        TypeTag::Supply,
        TypeTag::Memory,
        TypeTag::Trap,
        TypeTag::Environment,
        TypeTag::Czo,
        TypeTag::SpecialLantern,
    ];

    /// Canonical query-string token.
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Cryptid => "cryptid",
            TypeTag::Lantern => "lantern",
            TypeTag::Trail => "trail",
            TypeTag::Supply => "supply",
            TypeTag::Memory => "memory",
            TypeTag::Trap => "trap",
            TypeTag::Environment => "environment",
            TypeTag::Czo => "czo",
            TypeTag::SpecialLantern => "special-lantern",
        }
    }

    /// Parse a user-supplied token. Returns `None` for anything outside the
    /// vocabulary.
    pub fn parse(token: &str) -> Option<Self> {
        let normalized = token.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "cryptid" => Some(TypeTag::Cryptid),
            "lantern" => Some(TypeTag::Lantern),
            "trail" => Some(TypeTag::Trail),
            "supply" => Some(TypeTag::Supply),
            "memory" | "memory-trap" => Some(TypeTag::Memory),
            "trap" => Some(TypeTag::Trap),
            "environment" => Some(TypeTag::Environment),
            "czo" => Some(TypeTag::Czo),
            "special-lantern" => Some(TypeTag::SpecialLantern),
            _ => None,
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Card rarity facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RarityTag {
    Common,
    Uncommon,
    Rare,
    Unique,
}

impl RarityTag {
    pub const ALL: [RarityTag; 4] = [
        RarityTag::Common,
        RarityTag::Uncommon,
        RarityTag::Rare,
        RarityTag::Unique,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RarityTag::Common => "common",
            RarityTag::Uncommon => "uncommon",
            RarityTag::Rare => "rare",
            RarityTag::Unique => "unique",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.trim().to_ascii_lowercase().as_str() {
            "common" => Some(RarityTag::Common),
            "uncommon" => Some(RarityTag::Uncommon),
            "rare" => Some(RarityTag::Rare),
            "unique" => Some(RarityTag::Unique),
            _ => None,
        }
    }
}

impl fmt::Display for RarityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive numeric range for a stat facet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatRange {
    pub min: i32,
    pub max: i32,
}

impl StatRange {
    /// Build a range, swapping reversed bounds and clamping to non-negative.
    pub fn new(min: i32, max: i32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            min: min.max(0),
            max: max.max(0),
        }
    }

    pub fn exact(value: i32) -> Self {
        Self::new(value, value)
    }

    pub fn is_single_value(&self) -> bool {
        self.min == self.max
    }
}

/// How a combat stat filter is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatMode {
    /// Match `min` exactly; `max` is ignored.
    Exact,
    #[default]
    Range,
}

/// Which columns free-text search applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    #[default]
    Name,
    Effect,
    Both,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Column a listing is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Name,
    Cost,
    Attack,
    Defense,
    SetNumber,
}

/// Sort key, e.g. `atk_desc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: Direction,
}

impl Default for SortKey {
    fn default() -> Self {
        Self {
            field: SortField::Name,
            direction: Direction::Asc,
        }
    }
}

impl SortKey {
    pub fn new(field: SortField, direction: Direction) -> Self {
        Self { field, direction }
    }

    /// Parse a sort token. Unknown tokens yield `None`; callers fall back to
    /// the default.
    pub fn parse(token: &str) -> Option<Self> {
        let (field, direction) = token.trim().rsplit_once('_')?;
        let direction = match direction {
            "asc" => Direction::Asc,
            "desc" => Direction::Desc,
            _ => return None,
        };
        let field = match field {
            "name" => SortField::Name,
            "cost" => SortField::Cost,
            "atk" => SortField::Attack,
            "def" => SortField::Defense,
            "set_number" => SortField::SetNumber,
            _ => return None,
        };
        Some(Self { field, direction })
    }

    pub fn as_str(&self) -> &'static str {
        match (self.field, self.direction) {
            (SortField::Name, Direction::Asc) => "name_asc",
            (SortField::Name, Direction::Desc) => "name_desc",
            (SortField::Cost, Direction::Asc) => "cost_asc",
            (SortField::Cost, Direction::Desc) => "cost_desc",
            (SortField::Attack, Direction::Asc) => "atk_asc",
            (SortField::Attack, Direction::Desc) => "atk_desc",
            (SortField::Defense, Direction::Asc) => "def_asc",
            (SortField::Defense, Direction::Desc) => "def_desc",
            (SortField::SetNumber, Direction::Asc) => "set_number_asc",
            (SortField::SetNumber, Direction::Desc) => "set_number_desc",
        }
    }
}

/// The active facet selection plus sort and pagination window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterModel {
    pub types: BTreeSet<TypeTag>,
    pub cabins: BTreeSet<String>,
    pub rarities: BTreeSet<RarityTag>,
    pub sets: BTreeSet<String>,
    pub taxa: BTreeSet<String>,
    pub weather: BTreeSet<String>,
    pub traits: BTreeSet<String>,
    pub illustrators: BTreeSet<String>,
    pub cost: StatRange,
    pub attack_mode: StatMode,
    pub attack: StatRange,
    pub defense_mode: StatMode,
    pub defense: StatRange,
    pub search_text: String,
    pub search_mode: SearchMode,
    pub sort: SortKey,
    pub offset: i64,
    pub limit: i64,
}

impl Default for FilterModel {
    fn default() -> Self {
        Self {
            types: BTreeSet::new(),
            cabins: BTreeSet::new(),
            rarities: BTreeSet::new(),
            sets: BTreeSet::new(),
            taxa: BTreeSet::new(),
            weather: BTreeSet::new(),
            traits: BTreeSet::new(),
            illustrators: BTreeSet::new(),
            cost: COST_DEFAULT,
            attack_mode: StatMode::Range,
            attack: COMBAT_DEFAULT,
            defense_mode: StatMode::Range,
            defense: COMBAT_DEFAULT,
            search_text: String::new(),
            search_mode: SearchMode::Name,
            sort: SortKey::default(),
            offset: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl FilterModel {
    /// Copy of this model positioned at a different page window.
    pub fn with_window(&self, offset: i64, limit: i64) -> Self {
        Self {
            offset,
            limit,
            ..self.clone()
        }
    }

    /// True when the facet selection, search and sort match `other`,
    /// ignoring the pagination window.
    pub fn same_selection(&self, other: &Self) -> bool {
        self.with_window(0, DEFAULT_LIMIT) == other.with_window(0, DEFAULT_LIMIT)
    }

    /// Trimmed search text, or `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        let term = self.search_text.trim();
        (!term.is_empty()).then_some(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tag_aliases() {
        assert_eq!(TypeTag::parse("Cryptid"), Some(TypeTag::Cryptid));
        assert_eq!(TypeTag::parse("special lantern"), Some(TypeTag::SpecialLantern));
        assert_eq!(TypeTag::parse("special_lantern"), Some(TypeTag::SpecialLantern));
        assert_eq!(TypeTag::parse("special-lantern"), Some(TypeTag::SpecialLantern));
        assert_eq!(TypeTag::parse("Memory Trap"), Some(TypeTag::Memory));
        assert_eq!(TypeTag::parse("is_cryptid; DROP TABLE card"), None);
        assert_eq!(TypeTag::parse(""), None);
    }

    #[test]
    fn type_tag_round_trips_through_token() {
        for tag in TypeTag::ALL {
            assert_eq!(TypeTag::parse(tag.as_str()), Some(tag));
        }
        for tag in RarityTag::ALL {
            assert_eq!(RarityTag::parse(tag.as_str()), Some(tag));
        }
    }

    #[test]
    fn sort_key_parsing() {
        assert_eq!(
            SortKey::parse("set_number_desc"),
            Some(SortKey::new(SortField::SetNumber, Direction::Desc))
        );
        assert_eq!(
            SortKey::parse("atk_asc"),
            Some(SortKey::new(SortField::Attack, Direction::Asc))
        );
        assert_eq!(SortKey::parse("name"), None);
        assert_eq!(SortKey::parse("power_asc"), None);
        assert_eq!(SortKey::parse("name_sideways"), None);
    }

    #[test]
    fn stat_range_normalizes() {
        assert_eq!(StatRange::new(4, 2), StatRange { min: 2, max: 4 });
        assert_eq!(StatRange::new(-3, 2), StatRange { min: 0, max: 2 });
        assert!(StatRange::exact(3).is_single_value());
    }

    #[test]
    fn same_selection_ignores_window() {
        let a = FilterModel::default();
        let b = a.with_window(24, 12);
        assert!(a.same_selection(&b));

        let mut c = a.clone();
        c.types.insert(TypeTag::Trail);
        assert!(!a.same_selection(&c));
    }

    #[test]
    fn blank_search_is_none() {
        let mut model = FilterModel::default();
        model.search_text = "   ".to_string();
        assert_eq!(model.search_term(), None);
        model.search_text = " yeti ".to_string();
        assert_eq!(model.search_term(), Some("yeti"));
    }
}
