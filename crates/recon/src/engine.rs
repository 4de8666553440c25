use serde_json::{Map, Value};

use crate::config::ReportConfig;
use crate::entity::EntityResolver;
use crate::input::{read_election, read_posts, LEGACY_DIFF_KEY};
use crate::model::{ComparisonRow, Issue, PeriodTable, Report};
use crate::normalize::{parse_number, Normalizer};
use crate::reconcile::{ReconciledPeriods, Reconciler};

/// Supplied and recomputed deltas closer than this are the same number.
const DIFF_TOLERANCE: f64 = 1e-9;

/// Build the report from the two parsed payloads.
///
/// Never fails: every input problem is recovered and recorded in
/// `Report::issues`. Each section is normalized exactly once, so the period
/// tables and the comparison always agree.
pub fn build_report(
    posts: &Value,
    election: &Value,
    config: &ReportConfig,
    resolver: &EntityResolver,
) -> Report {
    let mut issues = Vec::new();
    let posts_payload = read_posts(posts, &config.periods, &mut issues);
    let election_payload = read_election(election, &config.periods, &mut issues);
    log::debug!("posts payload schema: {}", posts_payload.generation);

    let reconciler = Reconciler::new(Normalizer::new(resolver, config.duplicate_policy));
    let ReconciledPeriods {
        period_a,
        period_b,
        comparison,
        issues: section_issues,
    } = reconciler.reconcile_periods(
        posts_payload.section_a(),
        posts_payload.section_b(),
        election_payload.section_a(),
        election_payload.section_b(),
    );
    issues.extend(section_issues);

    let period_a = PeriodTable {
        label: config.periods.first.clone(),
        rows: period_a,
    };
    let period_b = PeriodTable {
        label: config.periods.second.clone(),
        rows: period_b,
    };
    if let Some(diff_post) = posts_payload.diff_post {
        issues.extend(check_diff_post(diff_post, &comparison, resolver));
    }

    log::debug!(
        "report: {} rows in {}, {} rows in {}, {} comparison rows, {} issues",
        period_a.rows.len(),
        period_a.label,
        period_b.rows.len(),
        period_b.label,
        comparison.len(),
        issues.len()
    );

    Report {
        title: config.title.clone(),
        generation: posts_payload.generation,
        period_a,
        period_b,
        comparison,
        issues,
    }
}

/// Compare legacy precomputed deltas against the recomputed ones.
///
/// The supplied numbers are never used for output. An entity that only
/// appears in `diffPost` is compared against a delta of 0 and gets no row.
pub fn check_diff_post(
    diff_post: &Map<String, Value>,
    comparison: &[ComparisonRow],
    resolver: &EntityResolver,
) -> Vec<Issue> {
    let mut issues = Vec::new();
    for (label, raw) in diff_post {
        let entity = resolver.canonicalize(label);
        if entity.is_empty() {
            continue;
        }
        let supplied = match parse_number(raw) {
            Ok(v) => v,
            Err(shown) => {
                issues.push(Issue::UnparsableValue {
                    section: LEGACY_DIFF_KEY.into(),
                    entity: entity.to_string(),
                    raw: shown,
                });
                continue;
            }
        };
        let computed = comparison
            .iter()
            .find(|row| row.entity == entity)
            .map_or(0.0, |row| row.diff_posts);
        if (supplied - computed).abs() > DIFF_TOLERANCE {
            log::warn!("diffPost '{entity}': supplied {supplied}, recomputed {computed}; using recomputed");
            issues.push(Issue::DiffPostMismatch {
                entity: entity.to_string(),
                supplied,
                computed,
            });
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SchemaGeneration;
    use serde_json::json;

    fn build(posts: Value, election: Value) -> Report {
        build_report(&posts, &election, &ReportConfig::default(), EntityResolver::builtin())
    }

    #[test]
    fn full_report_from_current_schema() {
        let report = build(
            json!({
                "electionPosts2021": {"spd": 10, "cdu": 3},
                "electionPosts2025": [{"party": "SPD", "posts": 14}, {"party": "AfD", "posts": 9}],
            }),
            json!({
                "election2021": [{"SPD": 25.7, "CDU": 24.1}],
                "election2025": [{"SPD": 16.4, "AfD": 20.8}],
            }),
        );

        assert_eq!(report.generation, SchemaGeneration::Current);
        assert_eq!(report.period_a.label, "2021");
        assert_eq!(report.period_b.label, "2025");

        let a: Vec<_> = report.period_a.rows.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(a, vec!["CDU", "SPD"]);
        let b: Vec<_> = report.period_b.rows.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(b, vec!["AfD", "SPD"]);

        let all: Vec<_> = report.comparison.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(all, vec!["AfD", "CDU", "SPD"]);
        let cdu = &report.comparison[1];
        assert_eq!(cdu.posts_b, 0.0);
        assert_eq!(cdu.diff_posts, -3.0);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn legacy_schema_reads_the_same() {
        let legacy = build(
            json!({"firstElection": {"spd": 10}, "secondElection": {"spd": 14}}),
            json!({}),
        );
        let current = build(
            json!({"electionPosts2021": {"spd": 10}, "electionPosts2025": {"spd": 14}}),
            json!({}),
        );
        assert_eq!(legacy.generation, SchemaGeneration::Legacy);
        assert_eq!(legacy.comparison, current.comparison);
        assert_eq!(legacy.period_a.rows, current.period_a.rows);
    }

    #[test]
    fn diff_post_is_checked_not_used() {
        let report = build(
            json!({
                "firstElection": {"SPD": 10, "FDP": 2},
                "secondElection": {"SPD": 14, "FDP": 2},
                "diffPost": {"spd": 4, "FDP": 7, "Volt": 1},
            }),
            json!(null),
        );
        let spd = report.comparison.iter().find(|r| r.entity.as_str() == "SPD").unwrap();
        assert_eq!(spd.diff_posts, 4.0);

        let mismatched: Vec<_> = report
            .issues
            .iter()
            .filter_map(|i| match i {
                Issue::DiffPostMismatch { entity, .. } => Some(entity.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(mismatched, vec!["FDP", "Volt"]);
        // no phantom row for Volt
        assert_eq!(report.comparison.len(), 2);
    }

    #[test]
    fn empty_payloads_give_empty_report() {
        let report = build(json!({}), json!({}));
        assert_eq!(report.generation, SchemaGeneration::Empty);
        assert!(report.is_empty());
        assert!(report.issues.is_empty());
    }

    #[test]
    fn issues_from_every_stage_are_kept() {
        let report = build(
            json!({"electionPosts2021": [{"posts": 3}], "electionPosts2025": 5}),
            json!("nope"),
        );
        assert_eq!(report.issues.len(), 3);
        assert!(report.is_empty());
    }

    #[test]
    fn percentage_only_entity_is_reported() {
        let report = build(
            json!({"electionPosts2025": {"SPD": 2}}),
            json!({"election2025": {"SPD": 16.4, "BSW": 4.98}}),
        );
        let bsw = &report.period_b.rows[0];
        assert_eq!(bsw.entity.as_str(), "BSW");
        assert_eq!(bsw.posts, 0.0);
        assert_eq!(bsw.election_pct, 4.98);
        assert!(report.period_a.rows.is_empty());
    }
}
