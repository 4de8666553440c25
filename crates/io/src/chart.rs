//! Declarative chart descriptions.
//!
//! Specs are plain data built from the reconciled rows. Both renderers draw
//! from the same specs, so a category's label, value and color are decided
//! exactly once.

use std::collections::BTreeMap;

use serde::Serialize;

use postwatch_recon::model::{CanonicalRow, ComparisonRow, PeriodTable, Report};
use postwatch_recon::{Entity, EntityResolver, Rgb};

use crate::error::RenderError;
use crate::format;

/// Opacity of the primary series.
pub const OPACITY_PRIMARY: f64 = 1.0;
/// Opacity of the first secondary series.
pub const OPACITY_SECONDARY: f64 = 0.5;
/// Opacity of the second secondary series.
pub const OPACITY_TERTIARY: f64 = 0.375;
/// Opacity of the faintest series.
pub const OPACITY_FAINT: f64 = 0.25;

/// Scaled posts are expressed on this range so they sit next to percentages.
const SCALE_MAX: f64 = 100.0;

// ---------------------------------------------------------------------------
// Spec types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slice {
    pub label: String,
    pub value: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieChart {
    pub title: String,
    pub slices: Vec<Slice>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    pub label: String,
    pub color: Rgb,
}

/// One series of a grouped bar chart. Each bar is the category color tinted
/// with `opacity`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarSeries {
    pub name: String,
    pub values: Vec<f64>,
    /// Text drawn above each bar; empty means no labels.
    pub value_labels: Vec<String>,
    pub opacity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedBarChart {
    pub title: String,
    pub y_axis: String,
    pub categories: Vec<Category>,
    pub series: Vec<BarSeries>,
}

impl GroupedBarChart {
    /// Largest value over all series, at least 0.
    pub fn max_value(&self) -> f64 {
        self.series
            .iter()
            .flat_map(|s| s.values.iter().copied())
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub color: Rgb,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterChart {
    pub title: String,
    pub x_axis: String,
    pub y_axis: String,
    pub points: Vec<ScatterPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartSpec {
    Pie(PieChart),
    GroupedBar(GroupedBarChart),
    Scatter(ScatterChart),
}

impl ChartSpec {
    pub fn title(&self) -> &str {
        match self {
            ChartSpec::Pie(c) => &c.title,
            ChartSpec::GroupedBar(c) => &c.title,
            ChartSpec::Scatter(c) => &c.title,
        }
    }

    /// No categories to draw.
    pub fn is_empty(&self) -> bool {
        match self {
            ChartSpec::Pie(c) => c.slices.is_empty(),
            ChartSpec::GroupedBar(c) => c.categories.is_empty(),
            ChartSpec::Scatter(c) => c.points.is_empty(),
        }
    }

    /// Check the invariants the renderers rely on.
    pub fn validate(&self) -> Result<(), RenderError> {
        let invalid = |reason: String| RenderError::InvalidChart {
            chart: self.title().to_string(),
            reason,
        };

        match self {
            ChartSpec::Pie(c) => {
                if let Some(s) = c.slices.iter().find(|s| !s.value.is_finite() || s.value < 0.0) {
                    return Err(invalid(format!("slice '{}' has value {}", s.label, s.value)));
                }
            }
            ChartSpec::GroupedBar(c) => {
                if c.series.is_empty() {
                    return Err(invalid("no series".into()));
                }
                for s in &c.series {
                    if s.values.len() != c.categories.len() {
                        return Err(invalid(format!(
                            "series '{}' has {} values for {} categories",
                            s.name,
                            s.values.len(),
                            c.categories.len()
                        )));
                    }
                    if !s.value_labels.is_empty() && s.value_labels.len() != s.values.len() {
                        return Err(invalid(format!(
                            "series '{}' has {} labels for {} values",
                            s.name,
                            s.value_labels.len(),
                            s.values.len()
                        )));
                    }
                    if s.values.iter().any(|v| !v.is_finite()) {
                        return Err(invalid(format!("series '{}' has a non-finite value", s.name)));
                    }
                    if !(0.0..=1.0).contains(&s.opacity) {
                        return Err(invalid(format!("series '{}' has opacity {}", s.name, s.opacity)));
                    }
                }
            }
            ChartSpec::Scatter(c) => {
                if let Some(p) = c.points.iter().find(|p| !p.x.is_finite() || !p.y.is_finite()) {
                    return Err(invalid(format!("point '{}' is not finite", p.label)));
                }
            }
        }
        Ok(())
    }
}

/// Rescale to `0..=100` relative to `max`. A non-positive `max` maps
/// everything to 0.
pub fn scale_to_max(values: &[f64], max: f64) -> Vec<f64> {
    if max <= 0.0 || !max.is_finite() {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| v / max * SCALE_MAX).collect()
}

// ---------------------------------------------------------------------------
// Chart sets
// ---------------------------------------------------------------------------

/// The three charts of one period section.
#[derive(Debug, Clone, Serialize)]
pub struct PeriodCharts {
    pub label: String,
    pub posts_pie: ChartSpec,
    pub election_pie: ChartSpec,
    pub combined_bar: ChartSpec,
}

impl PeriodCharts {
    pub fn all(&self) -> [&ChartSpec; 3] {
        [&self.posts_pie, &self.election_pie, &self.combined_bar]
    }
}

/// The four charts of the comparison section.
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonCharts {
    pub posts_bar: ChartSpec,
    pub election_bar: ChartSpec,
    pub delta_scatter: ChartSpec,
    pub combined_bar: ChartSpec,
}

impl ComparisonCharts {
    pub fn all(&self) -> [&ChartSpec; 4] {
        [
            &self.posts_bar,
            &self.election_bar,
            &self.delta_scatter,
            &self.combined_bar,
        ]
    }
}

/// Entity colors resolved once for every entity in the report.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityColors(BTreeMap<Entity, Rgb>);

impl EntityColors {
    pub fn get(&self, entity: &Entity) -> Rgb {
        self.0.get(entity).copied().unwrap_or(Rgb::WHITE)
    }
}

/// Every chart of a report, latest period first.
#[derive(Debug, Clone, Serialize)]
pub struct ReportCharts {
    pub periods: [PeriodCharts; 2],
    pub comparison: ComparisonCharts,
    pub colors: EntityColors,
}

impl ReportCharts {
    pub fn build(report: &Report, resolver: &EntityResolver) -> Self {
        let builder = ChartBuilder::new(resolver);
        let [latest, earlier] = report.periods_latest_first();
        let charts = ReportCharts {
            periods: [builder.period(latest), builder.period(earlier)],
            comparison: builder.comparison(report),
            colors: builder.colors(report),
        };
        log::debug!("built {} charts", charts.iter().count());
        charts
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChartSpec> {
        self.periods
            .iter()
            .flat_map(|p| p.all())
            .chain(self.comparison.all())
    }

    pub fn validate(&self) -> Result<(), RenderError> {
        self.iter().try_for_each(ChartSpec::validate)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Turns reconciled rows into chart specs. Categories follow row order.
#[derive(Debug, Clone, Copy)]
pub struct ChartBuilder<'r> {
    resolver: &'r EntityResolver,
}

impl<'r> ChartBuilder<'r> {
    pub fn new(resolver: &'r EntityResolver) -> Self {
        Self { resolver }
    }

    fn color(&self, entity: &Entity) -> Rgb {
        self.resolver.color_of(entity.as_str())
    }

    fn category(&self, entity: &Entity) -> Category {
        Category {
            label: entity.to_string(),
            color: self.color(entity),
        }
    }

    fn colors(&self, report: &Report) -> EntityColors {
        let entities = report
            .period_a
            .rows
            .iter()
            .chain(&report.period_b.rows)
            .map(|r| &r.entity)
            .chain(report.comparison.iter().map(|r| &r.entity));
        EntityColors(entities.map(|e| (e.clone(), self.color(e))).collect())
    }

    pub fn period(&self, table: &PeriodTable) -> PeriodCharts {
        let label = &table.label;
        let pie = |title: String, value: fn(&CanonicalRow) -> f64| {
            ChartSpec::Pie(PieChart {
                title,
                slices: table
                    .rows
                    .iter()
                    .map(|r| Slice {
                        label: r.entity.to_string(),
                        value: value(r),
                        color: self.color(&r.entity),
                    })
                    .collect(),
            })
        };

        let posts: Vec<f64> = table.rows.iter().map(|r| r.posts).collect();
        let election: Vec<f64> = table.rows.iter().map(|r| r.election_pct).collect();
        let max_posts = posts.iter().copied().fold(0.0, f64::max);

        let combined_bar = ChartSpec::GroupedBar(GroupedBarChart {
            title: format!("Posts und Wahlergebnisse {label}"),
            y_axis: "Prozent (%)".into(),
            categories: table.rows.iter().map(|r| self.category(&r.entity)).collect(),
            series: vec![
                BarSeries {
                    name: "Posts (skaliert)".into(),
                    values: scale_to_max(&posts, max_posts),
                    value_labels: posts.iter().map(|v| format::count(*v)).collect(),
                    opacity: OPACITY_SECONDARY,
                },
                BarSeries {
                    name: "Wahlergebnisse (%)".into(),
                    value_labels: election.iter().map(|v| format::one_decimal(*v)).collect(),
                    values: election,
                    opacity: OPACITY_PRIMARY,
                },
            ],
        });

        PeriodCharts {
            label: label.clone(),
            posts_pie: pie(format!("Posts {label}"), |r| r.posts),
            election_pie: pie(format!("Wahlergebnisse {label}"), |r| r.election_pct),
            combined_bar,
        }
    }

    pub fn comparison(&self, report: &Report) -> ComparisonCharts {
        let a = &report.period_a.label;
        let b = &report.period_b.label;
        let rows = &report.comparison;
        let categories: Vec<Category> = rows.iter().map(|r| self.category(&r.entity)).collect();
        let column = |f: fn(&ComparisonRow) -> f64| -> Vec<f64> { rows.iter().map(f).collect() };

        let series = |name: String, values: Vec<f64>, opacity: f64| BarSeries {
            name,
            values,
            value_labels: Vec::new(),
            opacity,
        };

        let posts_bar = ChartSpec::GroupedBar(GroupedBarChart {
            title: format!("Posts {a} vs {b}"),
            y_axis: "Anzahl Posts".into(),
            categories: categories.clone(),
            series: vec![
                series(format!("Posts {b}"), column(|r| r.posts_b), OPACITY_PRIMARY),
                series(format!("Posts {a}"), column(|r| r.posts_a), OPACITY_SECONDARY),
            ],
        });

        let election_bar = ChartSpec::GroupedBar(GroupedBarChart {
            title: format!("Wahlergebnisse {a} vs {b}"),
            y_axis: "Prozent (%)".into(),
            categories: categories.clone(),
            series: vec![
                series(format!("Wahlergebnisse {b} (%)"), column(|r| r.pct_b), OPACITY_PRIMARY),
                series(format!("Wahlergebnisse {a} (%)"), column(|r| r.pct_a), OPACITY_SECONDARY),
            ],
        });

        let delta_scatter = ChartSpec::Scatter(ScatterChart {
            title: format!("Diff Posts ({b}-{a}) vs. Diff Election (pp)"),
            x_axis: format!("Diff Posts ({b}-{a})"),
            y_axis: "Diff Election (pp)".into(),
            points: rows
                .iter()
                .map(|r| ScatterPoint {
                    label: r.entity.to_string(),
                    x: r.diff_posts,
                    y: r.diff_pct,
                    color: self.color(&r.entity),
                })
                .collect(),
        });

        let posts_a = column(|r| r.posts_a);
        let posts_b = column(|r| r.posts_b);
        let max_posts = posts_a.iter().chain(&posts_b).copied().fold(0.0, f64::max);
        let combined_bar = ChartSpec::GroupedBar(GroupedBarChart {
            title: format!("Posts und Wahlergebnisse {a} und {b}"),
            y_axis: "Prozent (%)".into(),
            categories,
            series: vec![
                series(format!("Posts {b} (skaliert)"), scale_to_max(&posts_b, max_posts), OPACITY_SECONDARY),
                series(format!("Posts {a} (skaliert)"), scale_to_max(&posts_a, max_posts), OPACITY_TERTIARY),
                series(format!("Wahlergebnisse {b} (%)"), column(|r| r.pct_b), OPACITY_PRIMARY),
                series(format!("Wahlergebnisse {a} (%)"), column(|r| r.pct_a), OPACITY_FAINT),
            ],
        });

        ComparisonCharts {
            posts_bar,
            election_bar,
            delta_scatter,
            combined_bar,
        }
    }
}
