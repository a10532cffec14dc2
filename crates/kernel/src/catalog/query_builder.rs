//! Catalog query builder using SeaQuery.
//!
//! Translates a [`FilterModel`] into a parameterized PostgreSQL statement
//! over `card LEFT JOIN cabin`. Every user-supplied value is a bound
//! parameter; identifiers only ever come from the [`CardTable`] and
//! [`CabinTable`] enums.
//!
//! The page, id-list and count statements share [`CatalogQueryBuilder::condition`]
//! and the same ORDER BY, so their row order cannot drift apart.

use sea_query::{
    Alias, Asterisk, Cond, Condition, Expr, Func, Iden, NullOrdering, Order, PostgresQueryBuilder,
    Query, SelectStatement, SimpleExpr, Value,
};
use thiserror::Error;

use super::filter::{
    COMBAT_DEFAULT, COST_DEFAULT, Direction, FilterModel, RarityTag, SearchMode, SortField,
    StatMode, StatRange, TypeTag,
};
use super::vocabulary::ALL_TAXA;

#[derive(Debug, Clone, Copy, Iden)]
#[iden = "card"]
pub enum CardTable {
    Table,
    Id,
    Name,
    Cost,
    Attack,
    Defense,
    Taxon,
    TextBox,
    SubText,
    FlavorText,
    Advantage,
    SetName,
    SetNumber,
    Illustrator,
    ImageUrl,
    WatermarkUrl,
    CabinId,
    IsCryptid,
    IsLantern,
    IsTrail,
    IsSupply,
    IsMemory,
    IsTrap,
    IsEnvironment,
    IsCzo,
    IsSpecialLantern,
    IsCommon,
    IsUncommon,
    IsRare,
    IsUnique,
    IsPromo,
    CanBeSerialized,
    SerializedOutOf,
}

#[derive(Debug, Clone, Copy, Iden)]
#[iden = "cabin"]
pub enum CabinTable {
    Table,
    Id,
    Name,
}

/// Card columns selected for listing rows, in `Card` field order.
const CARD_COLUMNS: [CardTable; 31] = [
    CardTable::Id,
    CardTable::Name,
    CardTable::Cost,
    CardTable::Attack,
    CardTable::Defense,
    CardTable::Taxon,
    CardTable::TextBox,
    CardTable::SubText,
    CardTable::FlavorText,
    CardTable::Advantage,
    CardTable::SetName,
    CardTable::SetNumber,
    CardTable::Illustrator,
    CardTable::ImageUrl,
    CardTable::WatermarkUrl,
    CardTable::IsCryptid,
    CardTable::IsLantern,
    CardTable::IsTrail,
    CardTable::IsSupply,
    CardTable::IsMemory,
    CardTable::IsTrap,
    CardTable::IsEnvironment,
    CardTable::IsCzo,
    CardTable::IsSpecialLantern,
    CardTable::IsCommon,
    CardTable::IsUncommon,
    CardTable::IsRare,
    CardTable::IsUnique,
    CardTable::IsPromo,
    CardTable::CanBeSerialized,
    CardTable::SerializedOutOf,
];

// `set_number` is `<index>/<total>`; rows that don't match sort as NULL.
const SET_TOTAL_EXPR: &str = r#"CASE WHEN "card"."set_number" ~ '^[0-9]+/[0-9]+$' THEN CAST(split_part("card"."set_number", '/', 2) AS INTEGER) END"#;
const SET_INDEX_EXPR: &str = r#"CASE WHEN "card"."set_number" ~ '^[0-9]+/[0-9]+$' THEN CAST(split_part("card"."set_number", '/', 1) AS INTEGER) END"#;

/// A bound statement parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Text(String),
    Int(i32),
    BigInt(i64),
    Bool(bool),
}

/// Statement text plus parameters in placeholder order (`$1`, `$2`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// Structurally invalid builder input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryBuildError {
    #[error("limit must be at least 1, got {0}")]
    InvalidLimit(i64),

    #[error("offset must not be negative, got {0}")]
    InvalidOffset(i64),

    #[error("unsupported parameter value: {0}")]
    UnsupportedValue(String),
}

/// Fixed card pools used by the deck wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckPool {
    Lanterns,
    Trails,
    /// Everything that is neither a lantern nor a trail.
    MainDeck,
}

/// Query builder for catalog listings.
pub struct CatalogQueryBuilder<'a> {
    filters: &'a FilterModel,
}

impl<'a> CatalogQueryBuilder<'a> {
    pub fn new(filters: &'a FilterModel) -> Self {
        Self { filters }
    }

    /// Build the paginated row query.
    pub fn build_page(&self) -> Result<BuiltQuery, QueryBuildError> {
        if self.filters.limit < 1 {
            return Err(QueryBuildError::InvalidLimit(self.filters.limit));
        }
        if self.filters.offset < 0 {
            return Err(QueryBuildError::InvalidOffset(self.filters.offset));
        }

        let mut query = card_select();
        self.apply(&mut query);
        // Both are validated non-negative above.
        query.limit(self.filters.limit.unsigned_abs());
        query.offset(self.filters.offset.unsigned_abs());

        finish(&query)
    }

    /// Build the row query without a pagination window.
    pub fn build_unpaged(&self) -> Result<BuiltQuery, QueryBuildError> {
        let mut query = card_select();
        self.apply(&mut query);
        finish(&query)
    }

    /// Build the ordered id-list query (same WHERE and ORDER BY, no window).
    pub fn build_ids(&self) -> Result<BuiltQuery, QueryBuildError> {
        let mut query = Query::select();
        query
            .column((CardTable::Table, CardTable::Id))
            .from(CardTable::Table);
        join_cabin(&mut query);
        self.apply(&mut query);
        finish(&query)
    }

    /// Build a COUNT query over the same filters.
    pub fn build_count(&self) -> Result<BuiltQuery, QueryBuildError> {
        let mut query = Query::select();
        query
            .expr_as(Expr::col(Asterisk).count(), Alias::new("total"))
            .from(CardTable::Table);
        join_cabin(&mut query);
        query.cond_where(self.condition());
        finish(&query)
    }

    fn apply(&self, query: &mut SelectStatement) {
        query.cond_where(self.condition());
        self.add_sorts(query);
    }

    /// The full WHERE condition. Clauses across facets are ANDed.
    pub fn condition(&self) -> Condition {
        let f = self.filters;
        let mut cond = Cond::all();

        // Taxa: card must contain every selected taxon, or be tagged with
        // the wildcard that matches every taxon.
        if !f.taxa.is_empty() {
            let every = f.taxa.iter().fold(Cond::all(), |all, taxon| {
                all.add(contains(card_col(CardTable::Taxon), taxon))
            });
            cond = cond.add(
                Cond::any()
                    .add(every)
                    .add(contains(card_col(CardTable::Taxon), &all_taxa_tag())),
            );
        }

        // Type: any selected flag.
        if !f.types.is_empty() {
            let any = f.types.iter().fold(Cond::any(), |any, tag| {
                any.add(card_col(type_column(*tag)).eq(true))
            });
            cond = cond.add(any);
        }

        // Rarity: any selected flag.
        if !f.rarities.is_empty() {
            let any = f.rarities.iter().fold(Cond::any(), |any, tag| {
                any.add(card_col(rarity_column(*tag)).eq(true))
            });
            cond = cond.add(any);
        }

        if !f.sets.is_empty() {
            cond = cond.add(card_col(CardTable::SetName).is_in(f.sets.iter().cloned()));
        }

        if !f.cabins.is_empty() {
            let names: Vec<String> = f.cabins.iter().map(|c| c.to_lowercase()).collect();
            cond = cond.add(
                Expr::expr(Func::lower(Expr::col((CabinTable::Table, CabinTable::Name))))
                    .is_in(names),
            );
        }

        cond = cond.add(stat_condition(
            CardTable::Cost,
            StatMode::Range,
            f.cost,
            COST_DEFAULT,
        ));
        cond = cond.add(stat_condition(
            CardTable::Attack,
            f.attack_mode,
            f.attack,
            COMBAT_DEFAULT,
        ));
        cond = cond.add(stat_condition(
            CardTable::Defense,
            f.defense_mode,
            f.defense,
            COMBAT_DEFAULT,
        ));

        if let Some(term) = f.search_term() {
            cond = cond.add(match f.search_mode {
                SearchMode::Name => Cond::all().add(contains(card_col(CardTable::Name), term)),
                SearchMode::Effect => {
                    Cond::all().add(contains(card_col(CardTable::TextBox), term))
                }
                SearchMode::Both => Cond::any()
                    .add(contains(card_col(CardTable::Name), term))
                    .add(contains(card_col(CardTable::TextBox), term)),
            });
        }

        // Weather is an in-text "Condition: effect" convention, or named
        // after the condition itself.
        for condition in &f.weather {
            cond = cond.add(
                Cond::any()
                    .add(contains(
                        card_col(CardTable::TextBox),
                        &format!("{condition}:"),
                    ))
                    .add(contains(card_col(CardTable::Name), condition)),
            );
        }

        for trait_text in &f.traits {
            cond = cond.add(contains(card_col(CardTable::TextBox), trait_text));
        }

        if !f.illustrators.is_empty() {
            cond = cond.add(
                card_col(CardTable::Illustrator).is_in(f.illustrators.iter().cloned()),
            );
        }

        // Sorting by a combat stat hides cards that don't have it.
        match f.sort.field {
            SortField::Attack => cond = cond.add(card_col(CardTable::Attack).is_not_null()),
            SortField::Defense => cond = cond.add(card_col(CardTable::Defense).is_not_null()),
            _ => {}
        }

        cond
    }

    /// Add ORDER BY clauses, ending with the id tie-break.
    fn add_sorts(&self, query: &mut SelectStatement) {
        let order = match self.filters.sort.direction {
            Direction::Asc => Order::Asc,
            Direction::Desc => Order::Desc,
        };

        match self.filters.sort.field {
            SortField::Name => {
                query.order_by_expr(lower_name(), order);
            }
            SortField::Cost => {
                query.order_by_with_nulls(
                    (CardTable::Table, CardTable::Cost),
                    order,
                    NullOrdering::Last,
                );
            }
            SortField::Attack => {
                query.order_by_with_nulls(
                    (CardTable::Table, CardTable::Attack),
                    order,
                    NullOrdering::Last,
                );
            }
            SortField::Defense => {
                query.order_by_with_nulls(
                    (CardTable::Table, CardTable::Defense),
                    order,
                    NullOrdering::Last,
                );
            }
            SortField::SetNumber => {
                query
                    .order_by_expr_with_nulls(
                        Expr::cust(SET_TOTAL_EXPR),
                        order.clone(),
                        NullOrdering::Last,
                    )
                    .order_by_expr_with_nulls(
                        Expr::cust(SET_INDEX_EXPR),
                        order,
                        NullOrdering::Last,
                    );
            }
        }

        query.order_by((CardTable::Table, CardTable::Id), Order::Asc);
    }
}

/// Build the single-card lookup.
pub fn build_card_by_id(id: &str) -> Result<BuiltQuery, QueryBuildError> {
    let mut query = card_select();
    query.and_where(card_col(CardTable::Id).eq(id));
    finish(&query)
}

/// Build a deck-wizard pool query, sorted by name.
pub fn build_pool(pool: DeckPool) -> Result<BuiltQuery, QueryBuildError> {
    let mut query = card_select();
    match pool {
        DeckPool::Lanterns => {
            query.and_where(card_col(CardTable::IsLantern).eq(true));
        }
        DeckPool::Trails => {
            query.and_where(card_col(CardTable::IsTrail).eq(true));
        }
        DeckPool::MainDeck => {
            query
                .and_where(card_col(CardTable::IsLantern).eq(false))
                .and_where(card_col(CardTable::IsTrail).eq(false));
        }
    }
    query
        .order_by_expr(lower_name(), Order::Asc)
        .order_by((CardTable::Table, CardTable::Id), Order::Asc);
    finish(&query)
}

/// Column holding the flag for a type tag.
pub fn type_column(tag: TypeTag) -> CardTable {
    match tag {
        TypeTag::Cryptid => CardTable::IsCryptid,
        TypeTag::Lantern => CardTable::IsLantern,
        TypeTag::Trail => CardTable::IsTrail,
        TypeTag::Supply => CardTable::IsSupply,
        TypeTag::Memory => CardTable::IsMemory,
        TypeTag::Trap => CardTable::IsTrap,
        TypeTag::Environment => CardTable::IsEnvironment,
        TypeTag::Czo => CardTable::IsCzo,
        TypeTag::SpecialLantern => CardTable::IsSpecialLantern,
    }
}

/// Column holding the flag for a rarity tag.
pub fn rarity_column(tag: RarityTag) -> CardTable {
    match tag {
        RarityTag::Common => CardTable::IsCommon,
        RarityTag::Uncommon => CardTable::IsUncommon,
        RarityTag::Rare => CardTable::IsRare,
        RarityTag::Unique => CardTable::IsUnique,
    }
}

/// Exact, NULL-inclusive default range, or plain range.
fn stat_condition(
    column: CardTable,
    mode: StatMode,
    range: StatRange,
    default: StatRange,
) -> Condition {
    let col = card_col(column);
    match mode {
        StatMode::Exact => Cond::all().add(col.eq(range.min)),
        StatMode::Range if range.is_single_value() => Cond::all().add(col.eq(range.min)),
        StatMode::Range if range == default => Cond::any()
            .add(card_col(column).is_null())
            .add(col.between(range.min, range.max)),
        StatMode::Range => Cond::all().add(col.between(range.min, range.max)),
    }
}

fn card_select() -> SelectStatement {
    let mut query = Query::select();
    for column in CARD_COLUMNS {
        query.column((CardTable::Table, column));
    }
    query
        .expr_as(
            Expr::col((CabinTable::Table, CabinTable::Name)),
            Alias::new("cabin"),
        )
        .from(CardTable::Table);
    join_cabin(&mut query);
    query
}

fn join_cabin(query: &mut SelectStatement) {
    query.left_join(
        CabinTable::Table,
        Expr::col((CardTable::Table, CardTable::CabinId))
            .equals((CabinTable::Table, CabinTable::Id)),
    );
}

fn card_col(column: CardTable) -> Expr {
    Expr::col((CardTable::Table, column))
}

fn lower_name() -> SimpleExpr {
    Func::lower(card_col(CardTable::Name)).into()
}

/// The `{All Taxa}` tag as stored in `card.taxon`.
fn all_taxa_tag() -> String {
    format!("{{{ALL_TAXA}}}")
}

/// Case-insensitive substring match with LIKE wildcards in `value` escaped.
fn contains(column: Expr, value: &str) -> SimpleExpr {
    let pattern = format!("%{}%", escape_like_wildcards(&value.to_lowercase()));
    Expr::expr(Func::lower(column)).like(pattern)
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn finish(query: &SelectStatement) -> Result<BuiltQuery, QueryBuildError> {
    let (sql, values) = query.build(PostgresQueryBuilder);
    let params = values
        .0
        .into_iter()
        .map(to_param)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(BuiltQuery { sql, params })
}

fn to_param(value: Value) -> Result<SqlParam, QueryBuildError> {
    match value {
        Value::String(Some(s)) => Ok(SqlParam::Text(*s)),
        Value::Int(Some(v)) => Ok(SqlParam::Int(v)),
        Value::BigInt(Some(v)) => Ok(SqlParam::BigInt(v)),
        Value::BigUnsigned(Some(v)) => i64::try_from(v)
            .map(SqlParam::BigInt)
            .map_err(|_| QueryBuildError::UnsupportedValue(v.to_string())),
        Value::Bool(Some(v)) => Ok(SqlParam::Bool(v)),
        other => Err(QueryBuildError::UnsupportedValue(format!("{other:?}"))),
    }
}
