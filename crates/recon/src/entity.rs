//! Entity canonicalization and color lookup.
//!
//! Upstream sources spell the same party in different ways (`gruene`, `Grüne`,
//! `DIE LINKE`, ` spd `). Merging needs exact key equality, so every label goes
//! through [`EntityResolver::canonicalize`] before it is used as a key.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::color::Rgb;

/// A canonical party/category label. Ordering is ordinal (byte-wise).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Entity(String);

impl Entity {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Entity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ---------------------------------------------------------------------------
// Built-in tables
// ---------------------------------------------------------------------------

/// Folded alias -> display name.
const ALIASES: &[(&str, &str)] = &[
    ("cdu", "CDU"),
    ("csu", "CSU"),
    ("cdu/csu", "CDU/CSU"),
    ("spd", "SPD"),
    ("fdp", "FDP"),
    ("afd", "AfD"),
    ("bsw", "BSW"),
    ("gruene", "Grüne"),
    ("grüne", "Grüne"),
    ("grune", "Grüne"),
    ("die grünen", "Grüne"),
    ("die gruenen", "Grüne"),
    ("bündnis 90/die grünen", "Grüne"),
    ("linke", "Linke"),
    ("die linke", "Linke"),
    ("sonstige", "Sonstige"),
    ("andere", "Sonstige"),
    ("others", "Sonstige"),
];

/// Display name -> fixed color.
const COLORS: &[(&str, u32)] = &[
    ("CDU", 0x000000),
    ("CSU", 0x000000),
    ("CDU/CSU", 0x000000),
    ("SPD", 0xE3000F),
    ("FDP", 0xFFED00),
    ("AfD", 0x009EE0),
    ("BSW", 0x00B3A4),
    ("Grüne", 0x1AA037),
    ("Linke", 0xBE3075),
    ("Sonstige", 0x9CA3AF),
];

/// Substring stems, checked in order, for labels with no exact match.
const STEMS: &[(&str, &str)] = &[
    ("gruen", "Grüne"),
    ("grün", "Grüne"),
    ("linke", "Linke"),
    ("cdu", "CDU"),
    ("csu", "CSU"),
    ("spd", "SPD"),
    ("fdp", "FDP"),
    ("afd", "AfD"),
    ("bsw", "BSW"),
];

/// Color for labels that match nothing.
pub const OTHER_COLOR: Rgb = Rgb::from_hex(0x9CA3AF);

static BUILTIN: Lazy<EntityResolver> = Lazy::new(EntityResolver::from_tables);

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// Immutable alias and color table.
///
/// The built-in table is shared process-wide through [`EntityResolver::builtin`].
/// Palette overrides from config produce a separate owned resolver; neither is
/// mutated after construction.
#[derive(Debug, Clone)]
pub struct EntityResolver {
    aliases: BTreeMap<String, String>,
    colors: BTreeMap<String, Rgb>,
    stems: Vec<(String, Rgb)>,
    fallback: Rgb,
}

impl EntityResolver {
    pub fn builtin() -> &'static EntityResolver {
        &BUILTIN
    }

    fn from_tables() -> Self {
        let display_colors: BTreeMap<&str, Rgb> = COLORS
            .iter()
            .map(|(name, hex)| (*name, Rgb::from_hex(*hex)))
            .collect();

        let aliases: BTreeMap<String, String> = ALIASES
            .iter()
            .map(|(alias, display)| (alias.to_string(), display.to_string()))
            .collect();

        // Every alias and every folded display name carries the display color.
        let mut colors = BTreeMap::new();
        for (display, color) in &display_colors {
            colors.insert(fold(display), *color);
        }
        for (alias, display) in &aliases {
            if let Some(color) = display_colors.get(display.as_str()) {
                colors.insert(alias.clone(), *color);
            }
        }

        let stems = STEMS
            .iter()
            .filter_map(|(stem, display)| {
                display_colors.get(display).map(|c| (stem.to_string(), *c))
            })
            .collect();

        Self {
            aliases,
            colors,
            stems,
            fallback: OTHER_COLOR,
        }
    }

    /// Copy of this resolver with extra exact-match colors. An override for an
    /// alias also applies to the alias's canonical display name.
    pub fn with_palette(&self, overrides: &BTreeMap<String, Rgb>) -> Self {
        let mut out = self.clone();
        for (label, color) in overrides {
            let key = fold(label);
            if key.is_empty() {
                continue;
            }
            let canonical = fold(out.canonicalize(label).as_str());
            out.colors.insert(key, *color);
            out.colors.insert(canonical, *color);
        }
        out
    }

    /// Canonical form of a raw label. Never fails; an empty or blank label
    /// yields an empty entity, which callers treat as "no label".
    pub fn canonicalize(&self, raw: &str) -> Entity {
        let key = fold(raw);
        if let Some(display) = self.aliases.get(&key) {
            return Entity(display.clone());
        }
        // case mapping does not always round-trip (`ſ` upper-cases to `S`),
        // so the title-cased form gets its own alias lookup
        let titled = title_case(&key);
        match self.aliases.get(&fold(&titled)) {
            Some(display) => Entity(display.clone()),
            None => Entity(titled),
        }
    }

    /// Deterministic color for any label: exact alias, then stem, then the
    /// "other" color.
    pub fn color_of(&self, label: &str) -> Rgb {
        let key = fold(label);
        if let Some(color) = self.colors.get(&key) {
            return *color;
        }
        self.stems
            .iter()
            .find(|(stem, _)| key.contains(stem.as_str()))
            .map(|(_, color)| *color)
            .unwrap_or(self.fallback)
    }
}

/// Trim, collapse inner whitespace, lowercase.
fn fold(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Upper-case the first letter of every word. Letters whose upper case is more
/// than one char (e.g. `ß`) stay as they are so the result folds back cleanly.
fn title_case(folded: &str) -> String {
    let mut out = String::with_capacity(folded.len());
    for (i, word) in folded.split(' ').enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let mut chars = word.chars();
        if let Some(first) = chars.next() {
            let upper: String = first.to_uppercase().collect();
            if upper.chars().count() == 1 {
                out.push_str(&upper);
            } else {
                out.push(first);
            }
            out.extend(chars);
        }
    }
    out
}
