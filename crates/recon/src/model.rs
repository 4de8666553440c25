use serde::Serialize;

use crate::entity::Entity;

// ---------------------------------------------------------------------------
// Rows
// ---------------------------------------------------------------------------

/// One entity's values for a single period. Absent values are 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRow {
    pub entity: Entity,
    pub posts: f64,
    pub election_pct: f64,
}

/// One entity across both periods. `diff_*` is always `b - a`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub entity: Entity,
    pub posts_a: f64,
    pub posts_b: f64,
    pub pct_a: f64,
    pub pct_b: f64,
    pub diff_posts: f64,
    pub diff_pct: f64,
}

impl ComparisonRow {
    pub fn new(entity: Entity, posts_a: f64, posts_b: f64, pct_a: f64, pct_b: f64) -> Self {
        Self {
            entity,
            posts_a,
            posts_b,
            pct_a,
            pct_b,
            diff_posts: posts_b - posts_a,
            diff_pct: pct_b - pct_a,
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Rows of one period, labelled for sheet names and headings.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodTable {
    pub label: String,
    pub rows: Vec<CanonicalRow>,
}

/// Which field-naming convention the posts payload used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaGeneration {
    /// `electionPosts<label>` keys.
    Current,
    /// `firstElection` / `secondElection` keys.
    Legacy,
    /// Neither key set present.
    Empty,
}

impl std::fmt::Display for SchemaGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Legacy => write!(f, "legacy"),
            Self::Empty => write!(f, "empty"),
        }
    }
}

/// Everything the renderers need, built fresh per request.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub title: String,
    pub generation: SchemaGeneration,
    pub period_a: PeriodTable,
    pub period_b: PeriodTable,
    pub comparison: Vec<ComparisonRow>,
    pub issues: Vec<Issue>,
}

impl Report {
    /// Periods in presentation order: most recent first.
    pub fn periods_latest_first(&self) -> [&PeriodTable; 2] {
        [&self.period_b, &self.period_a]
    }

    pub fn is_empty(&self) -> bool {
        self.period_a.rows.is_empty() && self.period_b.rows.is_empty() && self.comparison.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// A recovered input problem. None of these stop a report from being built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Issue {
    /// Section or record with the wrong shape; the entry was skipped.
    MalformedSection { section: String, detail: String },
    /// A value that is not a number; it was read as 0.
    UnparsableValue { section: String, entity: String, raw: String },
    /// A negative count or percentage; it was read as 0.
    NegativeValue { section: String, entity: String, value: f64 },
    /// A second record for an already-seen entity.
    DuplicateEntity { section: String, entity: String, kept: f64, dropped: f64 },
    /// A legacy `diffPost` entry that disagrees with the recomputed delta.
    DiffPostMismatch { entity: String, supplied: f64, computed: f64 },
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedSection { section, detail } => {
                write!(f, "section '{section}': skipped malformed entry ({detail})")
            }
            Self::UnparsableValue { section, entity, raw } => {
                write!(f, "section '{section}', entity '{entity}': cannot parse {raw} as a number, using 0")
            }
            Self::NegativeValue { section, entity, value } => {
                write!(f, "section '{section}', entity '{entity}': negative value {value}, using 0")
            }
            Self::DuplicateEntity { section, entity, kept, dropped } => {
                write!(f, "section '{section}': duplicate entity '{entity}' (kept {kept}, dropped {dropped})")
            }
            Self::DiffPostMismatch { entity, supplied, computed } => {
                write!(f, "diffPost '{entity}': supplied {supplied}, recomputed {computed}")
            }
        }
    }
}
