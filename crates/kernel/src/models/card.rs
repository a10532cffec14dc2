//! Card model.
//!
//! A card row is read from the `card` relation left-joined to `cabin`, so
//! `cabin` is the resolved cabin name rather than its id.

use serde::{Deserialize, Serialize};

/// Card record as returned by the listing, pool and detail queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Card {
    pub id: String,
    pub name: String,
    pub cost: Option<i32>,
    pub attack: Option<i32>,
    pub defense: Option<i32>,
    pub taxon: Option<String>,
    pub text_box: Option<String>,
    pub sub_text: Option<String>,
    pub flavor_text: Option<String>,
    pub advantage: Option<String>,
    pub set_name: String,
    pub set_number: String,
    pub illustrator: Option<String>,
    pub image_url: Option<String>,
    pub watermark_url: Option<String>,
    pub cabin: Option<String>,

    pub is_cryptid: bool,
    pub is_lantern: bool,
    pub is_trail: bool,
    pub is_supply: bool,
    pub is_memory: bool,
    pub is_trap: bool,
    pub is_environment: bool,
    pub is_czo: bool,
    pub is_special_lantern: bool,

    pub is_common: bool,
    pub is_uncommon: bool,
    pub is_rare: bool,
    pub is_unique: bool,

    pub is_promo: bool,
    pub can_be_serialized: bool,
    pub serialized_out_of: Option<i32>,
}

impl Card {
    /// Display rarity, resolved by precedence when several flags are set.
    pub fn rarity_label(&self) -> &'static str {
        if self.is_unique {
            "Unique"
        } else if self.is_rare {
            "Rare"
        } else if self.is_uncommon {
            "Uncommon"
        } else if self.is_common {
            "Common"
        } else {
            "Unknown"
        }
    }

    /// Display type, resolved by precedence over the type flags.
    pub fn type_label(&self) -> &'static str {
        if self.is_cryptid {
            "Cryptid"
        } else if self.is_lantern {
            "Lantern"
        } else if self.is_trail {
            "Trail"
        } else if self.is_memory {
            "Memory Trap"
        } else if self.is_supply {
            "Supply"
        } else if self.is_trap {
            "Trap"
        } else {
            "Other"
        }
    }

    /// Number of rarity flags set on this row.
    pub fn rarity_flag_count(&self) -> usize {
        [self.is_common, self.is_uncommon, self.is_rare, self.is_unique]
            .into_iter()
            .filter(|set| *set)
            .count()
    }

    /// True when more than one rarity flag is set.
    ///
    /// The schema does not enforce exclusivity, so this is reported as a
    /// data-quality signal rather than rejected.
    pub fn has_rarity_conflict(&self) -> bool {
        self.rarity_flag_count() > 1
    }

    /// Maximum copies of this card allowed in a deck.
    pub fn deck_copy_limit(&self) -> u8 {
        if self.is_unique {
            1
        } else if self.is_rare {
            2
        } else if self.is_common {
            4
        } else {
            3
        }
    }

    /// Parse `set_number` as `(index, total)`.
    ///
    /// Returns `None` unless the text is exactly two unsigned integers
    /// separated by `/`.
    pub fn set_slot(&self) -> Option<(u32, u32)> {
        let (index, total) = self.set_number.split_once('/')?;
        if index.is_empty()
            || total.is_empty()
            || !index.bytes().all(|b| b.is_ascii_digit())
            || !total.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }
        Some((index.parse().ok()?, total.parse().ok()?))
    }
}

/// Card detail response: the card plus derived display fields.
#[derive(Debug, Clone, Serialize)]
pub struct CardDetail {
    #[serde(flatten)]
    pub card: Card,
    pub rarity_label: &'static str,
    pub type_label: &'static str,
    pub deck_copy_limit: u8,
    pub rarity_conflict: bool,
}

impl From<Card> for CardDetail {
    fn from(card: Card) -> Self {
        Self {
            rarity_label: card.rarity_label(),
            type_label: card.type_label(),
            deck_copy_limit: card.deck_copy_limit(),
            rarity_conflict: card.has_rarity_conflict(),
            card,
        }
    }
}
