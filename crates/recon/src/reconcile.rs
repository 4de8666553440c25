use std::collections::BTreeMap;

use crate::entity::Entity;
use crate::model::{CanonicalRow, ComparisonRow, Issue};
use crate::normalize::{Normalized, Normalizer, RawSection, SectionKind};

/// Rows plus the issues met while normalizing their sections.
#[derive(Debug, Clone)]
pub struct Reconciled<T> {
    pub rows: Vec<T>,
    pub issues: Vec<Issue>,
}

/// Both period tables and the comparison, from one normalization of each
/// section.
#[derive(Debug, Clone)]
pub struct ReconciledPeriods {
    pub period_a: Vec<CanonicalRow>,
    pub period_b: Vec<CanonicalRow>,
    pub comparison: Vec<ComparisonRow>,
    pub issues: Vec<Issue>,
}

/// A named raw section, as handed to the reconciler.
#[derive(Debug, Clone, Copy)]
pub struct NamedSection<'a> {
    pub name: &'a str,
    pub section: RawSection<'a>,
}

impl<'a> NamedSection<'a> {
    pub fn new(name: &'a str, section: RawSection<'a>) -> Self {
        Self { name, section }
    }
}

/// Normalizes raw sections and merges them by entity.
#[derive(Debug, Clone, Copy)]
pub struct Reconciler<'r> {
    normalizer: Normalizer<'r>,
}

impl<'r> Reconciler<'r> {
    pub fn new(normalizer: Normalizer<'r>) -> Self {
        Self { normalizer }
    }

    /// Single period: posts and percentages for one period.
    pub fn merge(&self, posts: NamedSection<'_>, pct: NamedSection<'_>) -> Reconciled<CanonicalRow> {
        let posts = self.normalize(posts, SectionKind::Posts);
        let pct = self.normalize(pct, SectionKind::Percent);
        Reconciled {
            rows: merge_period(&posts, &pct),
            issues: collect_issues([posts, pct]),
        }
    }

    /// Both periods, with deltas `b - a`.
    pub fn reconcile(
        &self,
        posts_a: NamedSection<'_>,
        posts_b: NamedSection<'_>,
        pct_a: NamedSection<'_>,
        pct_b: NamedSection<'_>,
    ) -> Reconciled<ComparisonRow> {
        let all = self.reconcile_periods(posts_a, posts_b, pct_a, pct_b);
        Reconciled {
            rows: all.comparison,
            issues: all.issues,
        }
    }

    /// Period tables and comparison together. Each section is normalized
    /// exactly once, so the tables and the comparison always agree.
    pub fn reconcile_periods(
        &self,
        posts_a: NamedSection<'_>,
        posts_b: NamedSection<'_>,
        pct_a: NamedSection<'_>,
        pct_b: NamedSection<'_>,
    ) -> ReconciledPeriods {
        let posts_a = self.normalize(posts_a, SectionKind::Posts);
        let posts_b = self.normalize(posts_b, SectionKind::Posts);
        let pct_a = self.normalize(pct_a, SectionKind::Percent);
        let pct_b = self.normalize(pct_b, SectionKind::Percent);
        ReconciledPeriods {
            period_a: merge_period(&posts_a, &pct_a),
            period_b: merge_period(&posts_b, &pct_b),
            comparison: compare_periods(&posts_a, &posts_b, &pct_a, &pct_b),
            issues: collect_issues([posts_a, posts_b, pct_a, pct_b]),
        }
    }

    fn normalize(&self, named: NamedSection<'_>, kind: SectionKind) -> Normalized {
        self.normalizer.normalize(named.name, &named.section, kind)
    }
}

fn collect_issues<const N: usize>(sections: [Normalized; N]) -> Vec<Issue> {
    sections.into_iter().flat_map(|n| n.issues).collect()
}

/// Union of entities over `inputs`, each with its value per input (0 when
/// absent). BTreeMap iteration gives the ordinal name order.
fn union_table<const N: usize>(inputs: [&Normalized; N]) -> BTreeMap<Entity, [f64; N]> {
    let mut table: BTreeMap<Entity, [f64; N]> = BTreeMap::new();
    for (slot, input) in inputs.iter().enumerate() {
        for (entity, value) in &input.pairs {
            table.entry(entity.clone()).or_insert([0.0; N])[slot] = *value;
        }
    }
    table
}

/// Merge one period's normalized posts and percentages.
fn merge_period(posts: &Normalized, pct: &Normalized) -> Vec<CanonicalRow> {
    union_table([posts, pct])
        .into_iter()
        .map(|(entity, [posts, election_pct])| CanonicalRow {
            entity,
            posts,
            election_pct,
        })
        .collect()
}

/// Merge both periods into comparison rows.
fn compare_periods(
    posts_a: &Normalized,
    posts_b: &Normalized,
    pct_a: &Normalized,
    pct_b: &Normalized,
) -> Vec<ComparisonRow> {
    union_table([posts_a, posts_b, pct_a, pct_b])
        .into_iter()
        .map(|(entity, [posts_a, posts_b, pct_a, pct_b])| {
            ComparisonRow::new(entity, posts_a, posts_b, pct_a, pct_b)
        })
        .collect()
}
