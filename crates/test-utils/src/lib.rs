#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Codex test utilities.
//!
//! Helpers for integration testing: card fixtures, a throwaway PostgreSQL
//! schema, an in-memory [`CardFetcher`] and JSON assertion helpers.

use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use codex_client::{CardFetcher, FetchError};
use codex_kernel::Card;
use codex_kernel::catalog::{FilterModel, RarityTag, SearchMode, TypeTag};
use codex_kernel::db::CATALOG_SCHEMA;

/// Create a test card with default values: common, costless, set `Core`.
pub fn test_card(id: &str, name: &str) -> TestCard {
    TestCard {
        card: Card {
            id: id.to_string(),
            name: name.to_string(),
            cost: None,
            attack: None,
            defense: None,
            taxon: None,
            text_box: None,
            sub_text: None,
            flavor_text: None,
            advantage: None,
            set_name: "Core".to_string(),
            set_number: "1/1".to_string(),
            illustrator: None,
            image_url: None,
            watermark_url: None,
            cabin: None,
            is_cryptid: false,
            is_lantern: false,
            is_trail: false,
            is_supply: false,
            is_memory: false,
            is_trap: false,
            is_environment: false,
            is_czo: false,
            is_special_lantern: false,
            is_common: true,
            is_uncommon: false,
            is_rare: false,
            is_unique: false,
            is_promo: false,
            can_be_serialized: false,
            serialized_out_of: None,
        },
    }
}

/// A card builder for creating test fixtures.
#[derive(Debug, Clone)]
pub struct TestCard {
    pub card: Card,
}

impl TestCard {
    pub fn with_cost(mut self, cost: i32) -> Self {
        self.card.cost = Some(cost);
        self
    }

    pub fn with_attack(mut self, attack: i32) -> Self {
        self.card.attack = Some(attack);
        self
    }

    pub fn with_defense(mut self, defense: i32) -> Self {
        self.card.defense = Some(defense);
        self
    }

    /// Space-separated taxon tokens.
    pub fn with_taxon(mut self, taxon: &str) -> Self {
        self.card.taxon = Some(taxon.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.card.text_box = Some(text.to_string());
        self
    }

    pub fn with_set(mut self, set_name: &str, set_number: &str) -> Self {
        self.card.set_name = set_name.to_string();
        self.card.set_number = set_number.to_string();
        self
    }

    pub fn with_illustrator(mut self, illustrator: &str) -> Self {
        self.card.illustrator = Some(illustrator.to_string());
        self
    }

    /// Cabin by name. [`TestDatabase::insert`] creates the cabin row.
    pub fn with_cabin(mut self, cabin: &str) -> Self {
        self.card.cabin = Some(cabin.to_string());
        self
    }

    /// Set a type flag. Flags accumulate.
    pub fn with_type(mut self, tag: TypeTag) -> Self {
        let c = &mut self.card;
        match tag {
            TypeTag::Cryptid => c.is_cryptid = true,
            TypeTag::Lantern => c.is_lantern = true,
            TypeTag::Trail => c.is_trail = true,
            TypeTag::Supply => c.is_supply = true,
            TypeTag::Memory => c.is_memory = true,
            TypeTag::Trap => c.is_trap = true,
            TypeTag::Environment => c.is_environment = true,
            TypeTag::Czo => c.is_czo = true,
            TypeTag::SpecialLantern => c.is_special_lantern = true,
        }
        self
    }

    /// Replace the rarity with a single flag.
    pub fn with_rarity(mut self, tag: RarityTag) -> Self {
        self.card.is_common = false;
        self.also_rarity(tag)
    }

    /// Add a rarity flag on top of the existing ones.
    pub fn also_rarity(mut self, tag: RarityTag) -> Self {
        let c = &mut self.card;
        match tag {
            RarityTag::Common => c.is_common = true,
            RarityTag::Uncommon => c.is_uncommon = true,
            RarityTag::Rare => c.is_rare = true,
            RarityTag::Unique => c.is_unique = true,
        }
        self
    }

    pub fn into_card(self) -> Card {
        self.card
    }
}

static SCHEMA_SEQ: AtomicU64 = AtomicU64::new(0);

/// A PostgreSQL schema private to one test.
///
/// Connections from [`pool`](Self::pool) resolve unqualified names in the
/// private schema, so the catalog tables are empty at the start of every
/// test.
pub struct TestDatabase {
    pub pool: PgPool,
    admin: PgPool,
    schema: String,
}

impl TestDatabase {
    /// Create a fresh schema, or `None` when `DATABASE_URL` is not set.
    pub async fn connect() -> Option<Self> {
        let url = std::env::var("DATABASE_URL").ok()?;

        let schema = format!(
            "codex_test_{}_{}",
            std::process::id(),
            SCHEMA_SEQ.fetch_add(1, Ordering::Relaxed)
        );

        let admin = PgPoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .expect("Failed to connect to DATABASE_URL");
        sqlx::raw_sql(&format!("CREATE SCHEMA {schema}"))
            .execute(&admin)
            .await
            .expect("Failed to create test schema");

        let options = PgConnectOptions::from_str(&url)
            .expect("DATABASE_URL is not a valid PostgreSQL URL")
            .options([("search_path", schema.as_str())]);
        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .expect("Failed to connect to test schema");

        sqlx::raw_sql(CATALOG_SCHEMA)
            .execute(&pool)
            .await
            .expect("Failed to create catalog tables");

        Some(Self {
            pool,
            admin,
            schema,
        })
    }

    /// Insert cards, creating any cabins they reference.
    pub async fn insert(&self, cards: &[TestCard]) {
        for TestCard { card } in cards {
            let cabin_id = match &card.cabin {
                Some(name) => Some(self.cabin_id(name).await),
                None => None,
            };

            sqlx::query(
                "INSERT INTO card (id, name, cost, attack, defense, taxon, text_box, sub_text, \
                 flavor_text, advantage, set_name, set_number, illustrator, image_url, \
                 watermark_url, cabin_id, is_cryptid, is_lantern, is_trail, is_supply, \
                 is_memory, is_trap, is_environment, is_czo, is_special_lantern, is_common, \
                 is_uncommon, is_rare, is_unique, is_promo, can_be_serialized, serialized_out_of) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, \
                 $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30, $31, $32)",
            )
            .bind(&card.id)
            .bind(&card.name)
            .bind(card.cost)
            .bind(card.attack)
            .bind(card.defense)
            .bind(&card.taxon)
            .bind(&card.text_box)
            .bind(&card.sub_text)
            .bind(&card.flavor_text)
            .bind(&card.advantage)
            .bind(&card.set_name)
            .bind(&card.set_number)
            .bind(&card.illustrator)
            .bind(&card.image_url)
            .bind(&card.watermark_url)
            .bind(cabin_id)
            .bind(card.is_cryptid)
            .bind(card.is_lantern)
            .bind(card.is_trail)
            .bind(card.is_supply)
            .bind(card.is_memory)
            .bind(card.is_trap)
            .bind(card.is_environment)
            .bind(card.is_czo)
            .bind(card.is_special_lantern)
            .bind(card.is_common)
            .bind(card.is_uncommon)
            .bind(card.is_rare)
            .bind(card.is_unique)
            .bind(card.is_promo)
            .bind(card.can_be_serialized)
            .bind(card.serialized_out_of)
            .execute(&self.pool)
            .await
            .expect("Failed to insert test card");
        }
    }

    async fn cabin_id(&self, name: &str) -> i32 {
        if let Some(id) = sqlx::query_scalar::<_, i32>("SELECT id FROM cabin WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .expect("Failed to look up cabin")
        {
            return id;
        }

        sqlx::query_scalar::<_, i32>(
            "INSERT INTO cabin (id, name) \
             SELECT COALESCE(MAX(id), 0) + 1, $1 FROM cabin RETURNING id",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .expect("Failed to insert cabin")
    }

    /// Drop the schema and everything in it.
    pub async fn cleanup(self) {
        self.pool.close().await;
        sqlx::raw_sql(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
            .execute(&self.admin)
            .await
            .ok();
    }
}

type DelayFn = Box<dyn Fn(&FilterModel) -> Duration + Send + Sync>;

/// [`CardFetcher`] over a fixed, already-ordered card list.
///
/// Honors the type facet and a name/effect search; other facets are
/// ignored. Every page request is recorded.
#[derive(Clone)]
pub struct InMemoryFetcher {
    inner: Arc<FetcherInner>,
}

struct FetcherInner {
    cards: Vec<Card>,
    requests: Mutex<Vec<FilterModel>>,
    failures: Mutex<u32>,
    delay: Option<DelayFn>,
}

impl InMemoryFetcher {
    pub fn new(cards: Vec<Card>) -> Self {
        Self::build(cards, None)
    }

    /// Sleep for `delay(filters)` before answering each page request.
    pub fn with_delay(
        cards: Vec<Card>,
        delay: impl Fn(&FilterModel) -> Duration + Send + Sync + 'static,
    ) -> Self {
        Self::build(cards, Some(Box::new(delay)))
    }

    fn build(cards: Vec<Card>, delay: Option<DelayFn>) -> Self {
        Self {
            inner: Arc::new(FetcherInner {
                cards,
                requests: Mutex::new(Vec::new()),
                failures: Mutex::new(0),
                delay,
            }),
        }
    }

    /// Fail the next `count` page requests with a transport error.
    pub fn fail_next(&self, count: u32) {
        *self.inner.failures.lock() = count;
    }

    /// Every page request received, oldest first.
    pub fn requests(&self) -> Vec<FilterModel> {
        self.inner.requests.lock().clone()
    }

    fn matching(&self, filters: &FilterModel) -> impl Iterator<Item = &Card> {
        let term = filters.search_term().map(str::to_lowercase);
        let mode = filters.search_mode;
        let types = filters.types.clone();
        self.inner.cards.iter().filter(move |card| {
            let type_ok = types.is_empty() || types.iter().any(|t| has_type(card, *t));
            let text_ok = match &term {
                None => true,
                Some(term) => {
                    let in_name = card.name.to_lowercase().contains(term);
                    let in_text = card
                        .text_box
                        .as_deref()
                        .is_some_and(|t| t.to_lowercase().contains(term));
                    match mode {
                        SearchMode::Name => in_name,
                        SearchMode::Effect => in_text,
                        SearchMode::Both => in_name || in_text,
                    }
                }
            };
            type_ok && text_ok
        })
    }
}

#[async_trait]
impl CardFetcher for InMemoryFetcher {
    async fn fetch_page(&self, filters: &FilterModel) -> Result<Vec<Card>, FetchError> {
        self.inner.requests.lock().push(filters.clone());

        if let Some(delay) = &self.inner.delay {
            tokio::time::sleep(delay(filters)).await;
        }

        {
            let mut failures = self.inner.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(FetchError::Transport("injected failure".to_string()));
            }
        }

        let offset = usize::try_from(filters.offset).unwrap_or(0);
        let limit = usize::try_from(filters.limit).unwrap_or(0);
        Ok(self
            .matching(filters)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_all_ids(&self, filters: &FilterModel) -> Result<Vec<String>, FetchError> {
        Ok(self.matching(filters).map(|c| c.id.clone()).collect())
    }
}

fn has_type(card: &Card, tag: TypeTag) -> bool {
    match tag {
        TypeTag::Cryptid => card.is_cryptid,
        TypeTag::Lantern => card.is_lantern,
        TypeTag::Trail => card.is_trail,
        TypeTag::Supply => card.is_supply,
        TypeTag::Memory => card.is_memory,
        TypeTag::Trap => card.is_trap,
        TypeTag::Environment => card.is_environment,
        TypeTag::Czo => card.is_czo,
        TypeTag::SpecialLantern => card.is_special_lantern,
    }
}

/// Assertion helpers for JSON responses.
pub mod assert {
    use serde_json::Value;

    /// Assert that a JSON value has a specific key.
    pub fn has_key(value: &Value, key: &str) {
        assert!(
            value.get(key).is_some(),
            "Expected JSON to have key '{key}', got: {value}"
        );
    }

    /// Ids of a JSON array of card objects, in order.
    pub fn card_ids(value: &Value) -> Vec<String> {
        value
            .as_array()
            .unwrap_or_else(|| panic!("Expected a JSON array, got: {value}"))
            .iter()
            .map(|card| {
                card["id"]
                    .as_str()
                    .unwrap_or_else(|| panic!("Card without string id: {card}"))
                    .to_string()
            })
            .collect()
    }

    /// Assert that a string contains a substring.
    pub fn contains(haystack: &str, needle: &str) {
        assert!(
            haystack.contains(needle),
            "Expected string to contain '{needle}'\nActual: {haystack}"
        );
    }
}
