use std::collections::BTreeMap;

use serde::Deserialize;

use crate::color::Rgb;
use crate::entity::EntityResolver;
use crate::error::ReconError;

/// Excel caps sheet names at 31 characters.
const MAX_SHEET_NAME_LEN: usize = 31;

/// Name of the fixed comparison sheet.
pub const COMPARISON_SHEET: &str = "Both";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub periods: PeriodsConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// Extra exact-match colors, label -> `#RRGGBB`.
    #[serde(default)]
    pub palette: BTreeMap<String, String>,
}

fn default_title() -> String {
    "Posts per Party - Datenexport".into()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            periods: PeriodsConfig::default(),
            output: OutputConfig::default(),
            duplicate_policy: DuplicatePolicy::default(),
            palette: BTreeMap::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Periods
// ---------------------------------------------------------------------------

/// Labels of the two periods. `first` is period A (older), `second` is
/// period B (newer). Current-schema payload keys are derived from them.
#[derive(Debug, Clone, Deserialize)]
pub struct PeriodsConfig {
    #[serde(default = "default_first")]
    pub first: String,
    #[serde(default = "default_second")]
    pub second: String,
}

fn default_first() -> String {
    "2021".into()
}

fn default_second() -> String {
    "2025".into()
}

impl Default for PeriodsConfig {
    fn default() -> Self {
        Self {
            first: default_first(),
            second: default_second(),
        }
    }
}

impl PeriodsConfig {
    /// Current-schema posts key, e.g. `electionPosts2021`.
    pub fn posts_key(label: &str) -> String {
        format!("electionPosts{label}")
    }

    /// Percentage payload key, e.g. `election2021`.
    pub fn election_key(label: &str) -> String {
        format!("election{label}")
    }
}

// ---------------------------------------------------------------------------
// Output + duplicates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_workbook")]
    pub workbook: String,
    #[serde(default = "default_document")]
    pub document: String,
}

fn default_workbook() -> String {
    "posts-per-party_all.xlsx".into()
}

fn default_document() -> String {
    "posts-per-party_all.pdf".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            workbook: default_workbook(),
            document: default_document(),
        }
    }
}

/// Which record wins when a sequence section names the same entity twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    FirstWins,
    LastWins,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReportConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReportConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        validate_period_label(&self.periods.first)?;
        validate_period_label(&self.periods.second)?;

        if self.periods.first.eq_ignore_ascii_case(&self.periods.second) {
            return Err(ReconError::ConfigValidation(format!(
                "period labels must differ, both are '{}'",
                self.periods.first
            )));
        }

        if self.output.workbook.trim().is_empty() || self.output.document.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "output file names must not be empty".into(),
            ));
        }
        if self.output.workbook == self.output.document {
            return Err(ReconError::ConfigValidation(format!(
                "workbook and document would both be written to '{}'",
                self.output.workbook
            )));
        }

        self.palette_colors()?;
        Ok(())
    }

    /// Parsed palette overrides.
    pub fn palette_colors(&self) -> Result<BTreeMap<String, Rgb>, ReconError> {
        self.palette
            .iter()
            .map(|(label, value)| {
                Rgb::parse(value)
                    .map(|c| (label.clone(), c))
                    .ok_or_else(|| ReconError::InvalidColor {
                        label: label.clone(),
                        value: value.clone(),
                    })
            })
            .collect()
    }

    /// Resolver for this config: the built-in table plus palette overrides.
    pub fn resolver(&self) -> Result<EntityResolver, ReconError> {
        let overrides = self.palette_colors()?;
        Ok(EntityResolver::builtin().with_palette(&overrides))
    }
}

/// Period labels become sheet names, so they follow Excel's sheet-name rules.
fn validate_period_label(label: &str) -> Result<(), ReconError> {
    let invalid = |reason| ReconError::InvalidPeriodLabel {
        label: label.to_string(),
        reason,
    };

    if label.trim().is_empty() {
        return Err(invalid("must not be empty"));
    }
    if label.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(invalid("longer than 31 characters"));
    }
    if label.chars().any(|c| matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\')) {
        return Err(invalid("contains one of []:*?/\\"));
    }
    if label.starts_with('\'') || label.ends_with('\'') {
        return Err(invalid("starts or ends with an apostrophe"));
    }
    if label.eq_ignore_ascii_case(COMPARISON_SHEET) {
        return Err(invalid("collides with the comparison sheet name"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r##"
title = "Posts je Partei"
duplicate_policy = "last_wins"

[periods]
first = "2017"
second = "2021"

[output]
workbook = "report.xlsx"
document = "report.pdf"

[palette]
Volt = "#502379"
"Freie Wähler" = "F29200"
"##;

    #[test]
    fn parse_full() {
        let config = ReportConfig::from_toml(FULL).unwrap();
        assert_eq!(config.title, "Posts je Partei");
        assert_eq!(config.periods.first, "2017");
        assert_eq!(config.periods.second, "2021");
        assert_eq!(config.output.workbook, "report.xlsx");
        assert_eq!(config.duplicate_policy, DuplicatePolicy::LastWins);

        let colors = config.palette_colors().unwrap();
        assert_eq!(colors["Volt"], Rgb::from_hex(0x502379));
        assert_eq!(colors["Freie Wähler"], Rgb::from_hex(0xF29200));
    }

    #[test]
    fn empty_input_uses_defaults() {
        let config = ReportConfig::from_toml("").unwrap();
        assert_eq!(config.periods.first, "2021");
        assert_eq!(config.periods.second, "2025");
        assert_eq!(config.output.workbook, "posts-per-party_all.xlsx");
        assert_eq!(config.output.document, "posts-per-party_all.pdf");
        assert_eq!(config.duplicate_policy, DuplicatePolicy::FirstWins);
        assert!(config.palette.is_empty());
    }

    #[test]
    fn payload_keys_follow_labels() {
        assert_eq!(PeriodsConfig::posts_key("2025"), "electionPosts2025");
        assert_eq!(PeriodsConfig::election_key("2021"), "election2021");
    }

    #[test]
    fn reject_bad_color() {
        let err = ReportConfig::from_toml("[palette]\nVolt = \"purple\"\n").unwrap_err();
        assert!(err.to_string().contains("Volt"));
        assert!(err.to_string().contains("purple"));
    }

    #[test]
    fn reject_equal_labels() {
        let input = "[periods]\nfirst = \"2025\"\nsecond = \"2025\"\n";
        let err = ReportConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn reject_sheet_unsafe_label() {
        let input = "[periods]\nfirst = \"2021/22\"\n";
        let err = ReportConfig::from_toml(input).unwrap_err();
        assert!(matches!(err, ReconError::InvalidPeriodLabel { .. }));

        let input = "[periods]\nsecond = \"both\"\n";
        let err = ReportConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("comparison sheet"));
    }

    #[test]
    fn reject_same_output_file() {
        let input = "[output]\nworkbook = \"x\"\ndocument = \"x\"\n";
        assert!(ReportConfig::from_toml(input).is_err());
    }

    #[test]
    fn reject_unknown_policy() {
        let input = "duplicate_policy = \"newest\"\n";
        assert!(matches!(
            ReportConfig::from_toml(input),
            Err(ReconError::ConfigParse(_))
        ));
    }
}
