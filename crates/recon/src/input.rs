//! Payload shapes.
//!
//! Posts payload, two generations:
//!   legacy:  `{"firstElection": S, "secondElection": S, "diffPost"?: {..}}`
//!   current: `{"electionPosts<first>": S, "electionPosts<second>": S}`
//! Percentage payload: `{"election<first>": P, "election<second>": P}`.
//!
//! Current keys win; legacy keys are only read when neither current key exists.

use serde_json::{Map, Value};

use crate::config::PeriodsConfig;
use crate::model::{Issue, SchemaGeneration};
use crate::normalize::RawSection;
use crate::reconcile::NamedSection;

pub const LEGACY_FIRST_KEY: &str = "firstElection";
pub const LEGACY_SECOND_KEY: &str = "secondElection";
pub const LEGACY_DIFF_KEY: &str = "diffPost";

/// Section names for a pair of periods, owned so issues can refer to them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionNames {
    pub a: String,
    pub b: String,
}

/// The posts payload with its generation detected.
#[derive(Debug, Clone)]
pub struct PostsPayload<'a> {
    pub generation: SchemaGeneration,
    pub names: SectionNames,
    pub period_a: RawSection<'a>,
    pub period_b: RawSection<'a>,
    /// Legacy precomputed deltas, only used for cross-checking.
    pub diff_post: Option<&'a Map<String, Value>>,
}

impl<'a> PostsPayload<'a> {
    pub fn section_a(&self) -> NamedSection<'_> {
        NamedSection::new(&self.names.a, self.period_a)
    }

    pub fn section_b(&self) -> NamedSection<'_> {
        NamedSection::new(&self.names.b, self.period_b)
    }
}

/// The percentage payload.
#[derive(Debug, Clone)]
pub struct ElectionPayload<'a> {
    pub names: SectionNames,
    pub period_a: RawSection<'a>,
    pub period_b: RawSection<'a>,
}

impl<'a> ElectionPayload<'a> {
    pub fn section_a(&self) -> NamedSection<'_> {
        NamedSection::new(&self.names.a, self.period_a)
    }

    pub fn section_b(&self) -> NamedSection<'_> {
        NamedSection::new(&self.names.b, self.period_b)
    }
}

/// Detect the posts schema and pull out both period sections.
pub fn read_posts<'a>(
    value: &'a Value,
    periods: &PeriodsConfig,
    issues: &mut Vec<Issue>,
) -> PostsPayload<'a> {
    let current = SectionNames {
        a: PeriodsConfig::posts_key(&periods.first),
        b: PeriodsConfig::posts_key(&periods.second),
    };

    let Some(obj) = top_level_object("posts", value, issues) else {
        return PostsPayload {
            generation: SchemaGeneration::Empty,
            names: current,
            period_a: RawSection::Absent,
            period_b: RawSection::Absent,
            diff_post: None,
        };
    };

    let diff_post = match obj.get(LEGACY_DIFF_KEY) {
        Some(Value::Object(map)) => Some(map),
        None | Some(Value::Null) => None,
        Some(_) => {
            issues.push(Issue::MalformedSection {
                section: LEGACY_DIFF_KEY.into(),
                detail: "expected an object, ignored".into(),
            });
            None
        }
    };

    if obj.contains_key(&current.a) || obj.contains_key(&current.b) {
        return PostsPayload {
            generation: SchemaGeneration::Current,
            period_a: RawSection::from_value(obj.get(&current.a)),
            period_b: RawSection::from_value(obj.get(&current.b)),
            names: current,
            diff_post,
        };
    }

    if obj.contains_key(LEGACY_FIRST_KEY) || obj.contains_key(LEGACY_SECOND_KEY) {
        return PostsPayload {
            generation: SchemaGeneration::Legacy,
            names: SectionNames {
                a: LEGACY_FIRST_KEY.into(),
                b: LEGACY_SECOND_KEY.into(),
            },
            period_a: RawSection::from_value(obj.get(LEGACY_FIRST_KEY)),
            period_b: RawSection::from_value(obj.get(LEGACY_SECOND_KEY)),
            diff_post,
        };
    }

    PostsPayload {
        generation: SchemaGeneration::Empty,
        names: current,
        period_a: RawSection::Absent,
        period_b: RawSection::Absent,
        diff_post,
    }
}

/// Pull both period sections out of the percentage payload.
pub fn read_election<'a>(
    value: &'a Value,
    periods: &PeriodsConfig,
    issues: &mut Vec<Issue>,
) -> ElectionPayload<'a> {
    let names = SectionNames {
        a: PeriodsConfig::election_key(&periods.first),
        b: PeriodsConfig::election_key(&periods.second),
    };
    match top_level_object("election", value, issues) {
        Some(obj) => ElectionPayload {
            period_a: RawSection::from_value(obj.get(&names.a)),
            period_b: RawSection::from_value(obj.get(&names.b)),
            names,
        },
        None => ElectionPayload {
            names,
            period_a: RawSection::Absent,
            period_b: RawSection::Absent,
        },
    }
}

/// `null` counts as an empty payload; other non-objects are reported.
fn top_level_object<'a>(
    what: &str,
    value: &'a Value,
    issues: &mut Vec<Issue>,
) -> Option<&'a Map<String, Value>> {
    match value {
        Value::Object(obj) => Some(obj),
        Value::Null => None,
        _ => {
            log::warn!("{what} payload is not a JSON object, treating it as empty");
            issues.push(Issue::MalformedSection {
                section: what.to_string(),
                detail: "payload is not a JSON object".into(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn periods() -> PeriodsConfig {
        PeriodsConfig::default()
    }

    #[test]
    fn current_schema_detected() {
        let v = json!({"electionPosts2021": {"SPD": 1}, "electionPosts2025": []});
        let mut issues = Vec::new();
        let p = read_posts(&v, &periods(), &mut issues);
        assert_eq!(p.generation, SchemaGeneration::Current);
        assert_eq!(p.names.a, "electionPosts2021");
        assert!(matches!(p.period_a, RawSection::Mapping(_)));
        assert!(matches!(p.period_b, RawSection::Records(_)));
        assert!(issues.is_empty());
    }

    #[test]
    fn legacy_schema_detected() {
        let v = json!({"firstElection": [], "secondElection": {"SPD": 2}, "diffPost": {"SPD": 2}});
        let mut issues = Vec::new();
        let p = read_posts(&v, &periods(), &mut issues);
        assert_eq!(p.generation, SchemaGeneration::Legacy);
        assert_eq!(p.names.b, "secondElection");
        assert!(p.diff_post.is_some());
    }

    #[test]
    fn current_wins_over_legacy() {
        let v = json!({"firstElection": {"CDU": 9}, "electionPosts2025": {"SPD": 2}});
        let mut issues = Vec::new();
        let p = read_posts(&v, &periods(), &mut issues);
        assert_eq!(p.generation, SchemaGeneration::Current);
        assert_eq!(p.period_a, RawSection::Absent);
    }

    #[test]
    fn keys_follow_configured_labels() {
        let v = json!({"electionPosts2017": {"SPD": 1}});
        let labels = PeriodsConfig {
            first: "2017".into(),
            second: "2021".into(),
        };
        let mut issues = Vec::new();
        let p = read_posts(&v, &labels, &mut issues);
        assert_eq!(p.generation, SchemaGeneration::Current);
        assert!(matches!(p.period_a, RawSection::Mapping(_)));
    }

    #[test]
    fn non_object_payload_is_empty_with_issue() {
        let v = json!([1, 2, 3]);
        let mut issues = Vec::new();
        let p = read_posts(&v, &periods(), &mut issues);
        assert_eq!(p.generation, SchemaGeneration::Empty);
        assert_eq!(issues.len(), 1);

        let e = read_election(&Value::Null, &periods(), &mut issues);
        assert_eq!(e.period_a, RawSection::Absent);
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn election_sections() {
        let v = json!({"election2021": [{"SPD": 25.7}], "election2025": {"SPD": 16.4}});
        let mut issues = Vec::new();
        let e = read_election(&v, &periods(), &mut issues);
        assert!(matches!(e.period_a, RawSection::Records(_)));
        assert!(matches!(e.period_b, RawSection::Mapping(_)));
        assert_eq!(e.section_b().name, "election2025");
    }
}
