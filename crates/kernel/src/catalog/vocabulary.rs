//! Fixed facet vocabularies.

/// UI sentinel meaning "every taxon". Never sent to the server as a literal;
/// the client expands it to [`TAXA`] first.
pub const ALL_TAXA: &str = "All Taxa";

/// Known taxon tokens.
pub const TAXA: &[&str] = &[
    "Alien",
    "Angel",
    "Avian",
    "Bovine",
    "Canine",
    "Caprid",
    "Celestial",
    "Cervine",
    "Demon",
    "Deity",
    "Draconid",
    "Dulcis",
    "Elemental",
    "Equine",
    "Fae",
    "Feline",
    "Golem",
    "Humanoid",
    "Impersator",
    "Insectoid",
    "Interloper",
    "Invader",
    "Lagomorph",
    "Magus",
    "Mecha",
    "Observer",
    "Phantom",
    "Prophet",
    "Revenant",
    "Rodent",
    "Sanguivore",
    "Saurian",
    "Serpent",
    "Spirit",
];

/// Known cabin names.
pub const CABINS: &[&str] = &[
    "Obsidian",
    "Quartz",
    "Fluorite",
    "Meteorite",
    "Malachite",
    "Fulgurite",
    "Lapis",
    "Corallium",
];

/// True when `value` is the "All Taxa" sentinel (case-insensitive).
pub fn is_all_taxa(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case(ALL_TAXA)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_detection() {
        assert!(is_all_taxa("All Taxa"));
        assert!(is_all_taxa(" all taxa "));
        assert!(!is_all_taxa("Alien"));
    }

    #[test]
    fn sentinel_is_not_a_taxon() {
        assert!(!TAXA.iter().any(|t| is_all_taxa(t)));
    }
}
