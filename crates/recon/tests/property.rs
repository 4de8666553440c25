// Property-based tests for normalization and reconciliation.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::BTreeSet;

use proptest::prelude::*;
use serde_json::{json, Map, Value};

use postwatch_recon::normalize::{Normalized, Normalizer, RawSection, SectionKind};
use postwatch_recon::reconcile::{NamedSection, Reconciler};
use postwatch_recon::{DuplicatePolicy, EntityResolver};

// ---------------------------------------------------------------------------
// Config + generators
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

/// Labels whose canonical forms are pairwise distinct.
const KNOWN: &[&str] = &[
    "spd", "CDU", "gruene", "Die Linke", "afd", "BSW", "fdp", "Sonstige", "csu",
];

fn arb_labels() -> impl Strategy<Value = Vec<String>> {
    (
        proptest::sample::subsequence(KNOWN, 0..=KNOWN.len()),
        proptest::collection::hash_set("x[a-z]{2,7}( [a-z]{2,5})?", 0..6),
    )
        .prop_map(|(known, extra)| {
            known
                .into_iter()
                .map(str::to_string)
                .chain(extra)
                .collect()
        })
}

/// Distinct labels, each with a post count.
fn arb_section() -> impl Strategy<Value = Vec<(String, u32)>> {
    arb_labels().prop_flat_map(|labels| {
        let n = labels.len();
        (Just(labels), proptest::collection::vec(0u32..10_000, n))
            .prop_map(|(labels, values)| labels.into_iter().zip(values).collect())
    })
}

fn as_records(section: &[(String, u32)]) -> Value {
    Value::Array(
        section
            .iter()
            .map(|(label, n)| json!({"party": label, "posts": n}))
            .collect(),
    )
}

fn as_mapping(section: &[(String, u32)]) -> Value {
    let map: Map<String, Value> = section
        .iter()
        .map(|(label, n)| (label.clone(), json!(n)))
        .collect();
    Value::Object(map)
}

fn normalizer() -> Normalizer<'static> {
    Normalizer::new(EntityResolver::builtin(), DuplicatePolicy::FirstWins)
}

fn normalize(value: &Value, kind: SectionKind) -> Normalized {
    normalizer().normalize("s", &RawSection::from_value(Some(value)), kind)
}

fn named(value: &Value) -> NamedSection<'_> {
    NamedSection::new("s", RawSection::from_value(Some(value)))
}

fn sorted(mut n: Normalized) -> Vec<(String, f64)> {
    n.pairs.sort_by(|a, b| a.0.cmp(&b.0));
    n.pairs.into_iter().map(|(e, v)| (e.to_string(), v)).collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    // Records and mapping carrying the same content normalize to the same set.
    #[test]
    fn shape_equivalence(section in arb_section()) {
        let records = normalize(&as_records(&section), SectionKind::Posts);
        let mapping = normalize(&as_mapping(&section), SectionKind::Posts);
        prop_assert!(records.issues.is_empty());
        prop_assert_eq!(sorted(records), sorted(mapping));
    }

    // Every entity of every input shows up exactly once in the comparison.
    #[test]
    fn union_completeness(
        pa in arb_section(),
        pb in arb_section(),
        ea in arb_section(),
        eb in arb_section(),
    ) {
        let raw = [
            as_records(&pa),
            as_mapping(&pb),
            as_mapping(&ea),
            Value::Array(vec![as_mapping(&eb)]),
        ];
        let inputs = [
            normalize(&raw[0], SectionKind::Posts),
            normalize(&raw[1], SectionKind::Posts),
            normalize(&raw[2], SectionKind::Percent),
            normalize(&raw[3], SectionKind::Percent),
        ];
        let expected: BTreeSet<String> = inputs
            .iter()
            .flat_map(|n| n.pairs.iter().map(|(e, _)| e.to_string()))
            .collect();

        let rows = Reconciler::new(normalizer())
            .reconcile(named(&raw[0]), named(&raw[1]), named(&raw[2]), named(&raw[3]))
            .rows;
        let got: Vec<String> = rows.iter().map(|r| r.entity.to_string()).collect();
        prop_assert_eq!(got.len(), expected.len());
        prop_assert_eq!(got.into_iter().collect::<BTreeSet<_>>(), expected);

        for row in &rows {
            prop_assert_eq!(row.posts_a, inputs[0].get(&row.entity).unwrap_or(0.0));
            prop_assert_eq!(row.posts_b, inputs[1].get(&row.entity).unwrap_or(0.0));
            prop_assert_eq!(row.diff_posts, row.posts_b - row.posts_a);
            prop_assert_eq!(row.diff_pct, row.pct_b - row.pct_a);
        }
    }

    // Output order is ordinal by name and independent of input order.
    #[test]
    fn sort_stability(posts in arb_section(), pct in arb_section()) {
        let mut reversed = posts.clone();
        reversed.reverse();

        let reconciler = Reconciler::new(normalizer());
        let (pct, posts, reversed) = (as_mapping(&pct), as_records(&posts), as_records(&reversed));
        let forward = reconciler.merge(named(&posts), named(&pct)).rows;
        let backward = reconciler.merge(named(&reversed), named(&pct)).rows;

        prop_assert_eq!(&forward, &backward);
        for pair in forward.windows(2) {
            prop_assert!(pair[0].entity.as_str().as_bytes() < pair[1].entity.as_str().as_bytes());
        }
    }

    // Canonicalization is idempotent and never changes the color.
    #[test]
    fn color_determinism(raw in "[ ]{0,2}[A-Za-z]{1,10}( [A-Za-z]{1,6})?[ ]{0,2}") {
        let resolver = EntityResolver::builtin();
        let once = resolver.canonicalize(&raw);
        let twice = resolver.canonicalize(once.as_str());
        prop_assert_eq!(&once, &twice);
        prop_assert_eq!(resolver.color_of(&raw), resolver.color_of(&raw));
        prop_assert_eq!(resolver.color_of(&raw), resolver.color_of(once.as_str()));
        prop_assert_eq!(resolver.canonicalize(&raw.to_uppercase()), once);
    }
}
