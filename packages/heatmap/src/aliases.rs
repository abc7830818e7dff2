//! Category aliases for heat-map filtering.
//!
//! The alias table is embedded from `aliases.toml` at compile time. A
//! filter that names any term of an alias group (the canonical name or one
//! of its phrasings) matches records whose category contains any term of
//! that group.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use serde::Deserialize;

use crate::HeatmapError;

const ALIASES_TOML: &str = include_str!("../aliases.toml");

static EMBEDDED: LazyLock<CategoryAliases> = LazyLock::new(|| {
    CategoryAliases::parse(ALIASES_TOML)
        .unwrap_or_else(|e| panic!("Failed to parse aliases.toml: {e}"))
});

#[derive(Debug, Deserialize)]
struct AliasFile {
    aliases: BTreeMap<String, Vec<String>>,
}

/// Alias groups keyed by lowercase canonical category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryAliases {
    groups: BTreeMap<String, Vec<String>>,
}

impl CategoryAliases {
    /// Parses an alias table from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`HeatmapError::InvalidAliases`] if the TOML is malformed or
    /// lacks an `[aliases]` table.
    pub fn parse(toml_str: &str) -> Result<Self, HeatmapError> {
        let file: AliasFile =
            toml::de::from_str(toml_str).map_err(|e| HeatmapError::InvalidAliases(e.to_string()))?;

        let groups = file
            .aliases
            .into_iter()
            .map(|(canonical, phrases)| {
                let mut terms = vec![canonical.trim().to_lowercase()];
                terms.extend(phrases.iter().map(|p| p.trim().to_lowercase()));
                terms.retain(|t| !t.is_empty());
                (canonical.trim().to_lowercase(), terms)
            })
            .collect();

        Ok(Self { groups })
    }

    /// The alias table compiled into the binary.
    ///
    /// # Panics
    ///
    /// Panics if the embedded `aliases.toml` is malformed (covered by
    /// tests).
    #[must_use]
    pub fn embedded() -> &'static Self {
        &EMBEDDED
    }

    /// Returns the canonical names of all alias groups.
    pub fn canonical_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Returns `true` if a record `category` satisfies the lowercase
    /// `filter` through an alias group.
    #[must_use]
    pub fn matches(&self, category: &str, filter: &str) -> bool {
        self.groups
            .values()
            .filter(|terms| terms.iter().any(|t| filter.contains(t.as_str())))
            .any(|terms| contains_any(category, terms))
    }
}

/// Returns `true` if `haystack` contains any of `needles`.
fn contains_any(haystack: &str, needles: &[String]) -> bool {
    needles.iter().any(|n| haystack.contains(n.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_parses() {
        let aliases = CategoryAliases::embedded();
        let names: Vec<&str> = aliases.canonical_names().collect();
        assert_eq!(
            names,
            ["assault", "burglary", "drugs", "robbery", "theft", "vandalism"]
        );
    }

    #[test]
    fn alias_matches_in_both_directions() {
        let aliases = CategoryAliases::embedded();
        assert!(aliases.matches("breaking and entering", "burglary"));
        assert!(aliases.matches("burglary", "breaking and entering"));
        assert!(aliases.matches("larceny - auto parts", "theft"));
        assert!(!aliases.matches("theft", "assault"));
    }

    #[test]
    fn malformed_table_is_rejected() {
        assert!(matches!(
            CategoryAliases::parse("aliases = 3"),
            Err(HeatmapError::InvalidAliases(_))
        ));
        assert!(matches!(
            CategoryAliases::parse("[other]\nx = 1"),
            Err(HeatmapError::InvalidAliases(_))
        ));
    }

    #[test]
    fn custom_table() {
        let aliases = CategoryAliases::parse("[aliases]\nArson = [\"Fire Setting\"]").unwrap();
        assert!(aliases.matches("fire setting", "arson"));
        assert!(!aliases.matches("theft", "arson"));
    }
}
