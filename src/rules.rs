//! Vacation rule tables.
//!
//! Leave entitlement differs per country: a base number of days per
//! year plus seniority rules that either replace the entitlement once a
//! threshold is reached or add a per-year increment up to a cap. The
//! [`RuleBook`] holds one [`VacationRuleSet`] per canonical country and
//! an alias table mapping localised country names to those keys. It is
//! plain data passed to the calculator, so callers (and tests) choose
//! which tables are in force.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

/// Key of the fallback rule set.
pub const CUSTOM_COUNTRY: &str = "Custom";

const BUNDLED_RULES: &str = include_str!("../config/vacation_rules.json");

/// A single seniority step. Which clauses apply is decided by
/// [`crate::vacation::VacationCalculator`]; see its docs for the exact
/// evaluation order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeniorityRule {
    /// Seniority threshold in whole years.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub years: Option<i32>,
    /// Absolute entitlement once the threshold is met.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<f64>,
    /// Days added per year at or beyond the threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment: Option<f64>,
    /// Cap for the incremented entitlement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_days: Option<f64>,
}

/// Entitlement rules for one country.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VacationRuleSet {
    /// Days granted before any seniority rule applies.
    #[serde(default)]
    pub base_days: f64,
    /// Evaluated in table order; the order is part of the rule set.
    #[serde(default)]
    pub seniority_rules: Vec<SeniorityRule>,
}

impl VacationRuleSet {
    pub fn new(base_days: f64, seniority_rules: Vec<SeniorityRule>) -> Self {
        Self {
            base_days,
            seniority_rules,
        }
    }
}

/// Country rule sets plus the alias table used to canonicalise names.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RuleBook {
    /// Rule sets keyed by canonical country name.
    #[serde(default)]
    pub countries: HashMap<String, VacationRuleSet>,
    /// Localised or alternate spellings mapped to canonical names.
    #[serde(default)]
    pub aliases: HashMap<String, String>,
}

impl RuleBook {
    /// The rule book compiled into the crate.
    pub fn bundled() -> Result<Self> {
        Ok(serde_json::from_str(BUNDLED_RULES)?)
    }

    /// Load a rule book from a JSON file with the same layout as the
    /// bundled one.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let book: RuleBook = serde_json::from_str(&data).map_err(|err| {
            EngineError::configuration(format!(
                "failed to parse vacation rules {}: {err}",
                path.display()
            ))
        })?;
        info!(
            path = %path.display(),
            countries = book.countries.len(),
            aliases = book.aliases.len(),
            "loaded vacation rules"
        );
        Ok(book)
    }

    /// Use the file at `path` when given, the bundled tables otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::bundled(),
        }
    }

    pub fn with_country(mut self, country: impl Into<String>, rules: VacationRuleSet) -> Self {
        self.countries.insert(country.into(), rules);
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>, country: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), country.into());
        self
    }

    /// Map a raw country name to its canonical key.
    ///
    /// Aliases win; an unknown non-empty name is returned unchanged and
    /// a missing or empty one becomes [`CUSTOM_COUNTRY`]. Never fails.
    pub fn normalize_country(&self, raw: Option<&str>) -> String {
        let normalized = match raw {
            Some(name) if !name.is_empty() => self
                .aliases
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string()),
            _ => CUSTOM_COUNTRY.to_string(),
        };
        debug!(raw = ?raw, %normalized, "normalized country");
        normalized
    }

    /// Rule set for a canonical country, falling back to `"Custom"`.
    pub fn rules_for(&self, country: &str) -> Option<&VacationRuleSet> {
        self.countries
            .get(country)
            .or_else(|| self.countries.get(CUSTOM_COUNTRY))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_book_parses() {
        let book = RuleBook::bundled().unwrap();
        assert!(book.countries.contains_key(CUSTOM_COUNTRY));
        assert_eq!(book.countries["Israel"].base_days, 12.0);
        assert_eq!(book.aliases["ארצות הברית"], "USA");
    }

    #[test]
    fn test_normalize_prefers_alias_then_raw_then_custom() {
        let book = RuleBook::bundled().unwrap();
        assert_eq!(book.normalize_country(Some("ישראל")), "Israel");
        assert_eq!(book.normalize_country(Some("France")), "France");
        assert_eq!(book.normalize_country(Some("")), CUSTOM_COUNTRY);
        assert_eq!(book.normalize_country(None), CUSTOM_COUNTRY);
    }

    #[test]
    fn test_unknown_country_falls_back_to_custom_rules() {
        let book = RuleBook::default()
            .with_country(CUSTOM_COUNTRY, VacationRuleSet::new(7.0, vec![]));
        assert_eq!(book.rules_for("France").map(|r| r.base_days), Some(7.0));
        assert!(RuleBook::default().rules_for("France").is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(
            &path,
            r#"{"countries": {"Spain": {"baseDays": 22, "seniorityRules": [{"years": 3, "increment": 1, "maxDays": 25}]}}}"#,
        )
        .unwrap();
        let book = RuleBook::load(Some(&path)).unwrap();
        let spain = &book.countries["Spain"];
        assert_eq!(spain.base_days, 22.0);
        assert_eq!(spain.seniority_rules[0].max_days, Some(25.0));
        assert!(book.aliases.is_empty());

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            RuleBook::from_file(&path),
            Err(EngineError::Configuration(_))
        ));
        assert!(matches!(
            RuleBook::from_file(&dir.path().join("missing.json")),
            Err(EngineError::Io(_))
        ));
    }
}
