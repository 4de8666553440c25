//! Section normalization.
//!
//! A section arrives either as a sequence of records (`[{"party": "SPD",
//! "posts": 14}]`) or as a mapping (`{"SPD": 14}`). The shape is resolved once
//! into [`RawSection`]; everything downstream only sees ordered
//! `(Entity, f64)` pairs.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::config::DuplicatePolicy;
use crate::entity::{Entity, EntityResolver};
use crate::model::Issue;

/// Keys that may carry the entity label in a record, in priority order.
const LABEL_KEYS: &[&str] = &["party", "entity", "name"];

/// What a section measures. Decides which record keys hold the value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Posts,
    Percent,
}

impl SectionKind {
    fn value_keys(self) -> &'static [&'static str] {
        match self {
            Self::Posts => &["posts", "value", "count"],
            Self::Percent => &["election", "percent", "pct", "value"],
        }
    }
}

/// A section with its shape resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawSection<'a> {
    Records(&'a [Value]),
    Mapping(&'a Map<String, Value>),
    /// Key missing or `null`.
    Absent,
    /// Neither sequence nor mapping; carries the JSON type found.
    Malformed(&'static str),
}

impl<'a> RawSection<'a> {
    pub fn from_value(value: Option<&'a Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Absent,
            Some(Value::Array(items)) => Self::Records(items.as_slice()),
            Some(Value::Object(map)) => Self::Mapping(map),
            Some(other) => Self::Malformed(json_type(other)),
        }
    }
}

/// Normalized pairs plus whatever had to be skipped or coerced on the way.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    pub pairs: Vec<(Entity, f64)>,
    pub issues: Vec<Issue>,
}

impl Normalized {
    pub fn get(&self, entity: &Entity) -> Option<f64> {
        self.pairs.iter().find(|(e, _)| e == entity).map(|(_, v)| *v)
    }
}

/// Turns raw sections into canonical pairs.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'r> {
    resolver: &'r EntityResolver,
    policy: DuplicatePolicy,
}

impl<'r> Normalizer<'r> {
    pub fn new(resolver: &'r EntityResolver, policy: DuplicatePolicy) -> Self {
        Self { resolver, policy }
    }

    /// Normalize one section. `name` is only used to label issues.
    pub fn normalize(&self, name: &str, section: &RawSection<'_>, kind: SectionKind) -> Normalized {
        let mut collector = Collector::new(name, self.policy);

        match section {
            RawSection::Absent => {}
            RawSection::Malformed(found) => collector.malformed(format!(
                "expected a list or an object, found {found}"
            )),
            RawSection::Mapping(map) => self.read_mapping(map, &mut collector),
            RawSection::Records(items) => {
                for (idx, item) in items.iter().enumerate() {
                    match item {
                        Value::Object(obj) if has_label_key(obj) => {
                            self.read_record(idx, obj, kind, &mut collector)
                        }
                        // `[{"SPD": 27.1}]`: percentage sections wrap a mapping in a list
                        Value::Object(obj) if kind == SectionKind::Percent => {
                            self.read_mapping(obj, &mut collector)
                        }
                        Value::Object(_) => {
                            collector.malformed(format!("record {idx} has no party label"))
                        }
                        other => collector.malformed(format!(
                            "record {idx} is {}, not an object",
                            json_type(other)
                        )),
                    }
                }
            }
        }

        let out = collector.finish();
        log::debug!("section '{name}': {} entities, {} issues", out.pairs.len(), out.issues.len());
        out
    }

    fn read_mapping(&self, map: &Map<String, Value>, collector: &mut Collector<'_>) {
        for (label, value) in map {
            let entity = self.resolver.canonicalize(label);
            if entity.is_empty() {
                collector.malformed("blank party label".into());
                continue;
            }
            let value = collector.coerce(&entity, value);
            collector.push(entity, value);
        }
    }

    fn read_record(
        &self,
        idx: usize,
        obj: &Map<String, Value>,
        kind: SectionKind,
        collector: &mut Collector<'_>,
    ) {
        let entity = match LABEL_KEYS.iter().find_map(|k| obj.get(*k)) {
            Some(Value::String(s)) => self.resolver.canonicalize(s),
            Some(other) => {
                collector.malformed(format!("record {idx} has {} as party label", json_type(other)));
                return;
            }
            None => {
                collector.malformed(format!("record {idx} has no party label"));
                return;
            }
        };
        if entity.is_empty() {
            collector.malformed(format!("record {idx} has a blank party label"));
            return;
        }

        let value = match kind.value_keys().iter().find_map(|k| obj.get(*k)) {
            Some(raw) => collector.coerce(&entity, raw),
            None => 0.0,
        };
        collector.push(entity, value);
    }
}

fn has_label_key(obj: &Map<String, Value>) -> bool {
    LABEL_KEYS.iter().any(|k| obj.contains_key(*k))
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Accumulates pairs in first-seen order and applies the duplicate policy.
struct Collector<'n> {
    section: &'n str,
    policy: DuplicatePolicy,
    pairs: Vec<(Entity, f64)>,
    index: HashMap<Entity, usize>,
    issues: Vec<Issue>,
}

impl<'n> Collector<'n> {
    fn new(section: &'n str, policy: DuplicatePolicy) -> Self {
        Self {
            section,
            policy,
            pairs: Vec::new(),
            index: HashMap::new(),
            issues: Vec::new(),
        }
    }

    fn push(&mut self, entity: Entity, value: f64) {
        match self.index.get(&entity) {
            Some(&pos) => {
                let existing = self.pairs[pos].1;
                let (kept, dropped) = match self.policy {
                    DuplicatePolicy::FirstWins => (existing, value),
                    DuplicatePolicy::LastWins => {
                        self.pairs[pos].1 = value;
                        (value, existing)
                    }
                };
                if kept != dropped {
                    log::warn!(
                        "section '{}': duplicate entity '{entity}', kept {kept}, dropped {dropped}",
                        self.section
                    );
                    self.issues.push(Issue::DuplicateEntity {
                        section: self.section.to_string(),
                        entity: entity.to_string(),
                        kept,
                        dropped,
                    });
                }
            }
            None => {
                self.index.insert(entity.clone(), self.pairs.len());
                self.pairs.push((entity, value));
            }
        }
    }

    /// Parse a section value. Unparsable and negative values become 0.
    fn coerce(&mut self, entity: &Entity, raw: &Value) -> f64 {
        match parse_number(raw) {
            Ok(v) if v < 0.0 => {
                log::warn!(
                    "section '{}', entity '{entity}': negative value {v}, using 0",
                    self.section
                );
                self.issues.push(Issue::NegativeValue {
                    section: self.section.to_string(),
                    entity: entity.to_string(),
                    value: v,
                });
                0.0
            }
            Ok(v) => v,
            Err(shown) => {
                log::warn!(
                    "section '{}', entity '{entity}': cannot parse {shown}, using 0",
                    self.section
                );
                self.issues.push(Issue::UnparsableValue {
                    section: self.section.to_string(),
                    entity: entity.to_string(),
                    raw: shown,
                });
                0.0
            }
        }
    }

    fn malformed(&mut self, detail: String) {
        log::warn!("section '{}': {detail}", self.section);
        self.issues.push(Issue::MalformedSection {
            section: self.section.to_string(),
            detail,
        });
    }

    fn finish(self) -> Normalized {
        Normalized {
            pairs: self.pairs,
            issues: self.issues,
        }
    }
}

// ---------------------------------------------------------------------------
// Number coercion
// ---------------------------------------------------------------------------

/// Permissive number parsing.
///
/// `null`, `""` and whitespace are 0. Strings may carry a trailing `%` and may
/// use a single decimal comma. Anything else that is not a finite number is an
/// error carrying the JSON text of the value.
pub fn parse_number(value: &Value) -> Result<f64, String> {
    let parsed = match value {
        Value::Null => Some(0.0),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_numeric_str(s),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(value.to_string()),
    }
}

fn parse_numeric_str(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    let trimmed = trimmed.strip_suffix('%').unwrap_or(trimmed).trim_end();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    if !trimmed.contains('.') && trimmed.matches(',').count() == 1 {
        return trimmed.replace(',', ".").parse().ok();
    }
    trimmed.parse().ok()
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
