//! Observation rows to styled, legend-grouped line traces.
//!
//! One trace per entity id. Line style follows the maximum clinical phase the entity reached;
//! color follows its peak-to-current ratio unless a target highlight is active.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::colors::{attention_scale, SELECTED_GREY, UNSELECTED};
use crate::data::Observation;

pub const DEFAULT_WIDTH: f64 = 1.0;
pub const SELECTED_WIDTH: f64 = 2.5;
pub const UNSELECTED_WIDTH: f64 = 0.5;

/// Maximum clinical phase achieved, bucketed by fixed thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Discovery,
    Phase1,
    Phase2,
    Phase3,
    Phase4,
}

impl Phase {
    /// Legend groups in the order they are listed in the legend.
    pub const LEGEND_ORDER: [Phase; 5] = [
        Phase::Phase4,
        Phase::Phase3,
        Phase::Phase2,
        Phase::Phase1,
        Phase::Discovery,
    ];

    pub fn from_best_phase(best_phase: f64) -> Self {
        if best_phase >= 4.0 {
            Phase::Phase4
        } else if best_phase >= 3.0 {
            Phase::Phase3
        } else if best_phase >= 2.0 {
            Phase::Phase2
        } else if best_phase >= 1.0 {
            Phase::Phase1
        } else {
            Phase::Discovery
        }
    }

    pub fn legend_group(&self) -> &'static str {
        match self {
            Phase::Phase4 => "4",
            Phase::Phase3 => "3",
            Phase::Phase2 => "2",
            Phase::Phase1 => "1",
            Phase::Discovery => "0",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Phase4 => "Phase 4",
            Phase::Phase3 => "Phase 3",
            Phase::Phase2 => "Phase 2",
            Phase::Phase1 => "Phase 1",
            Phase::Discovery => "Discovery",
        }
    }

    /// `None` is a solid line.
    pub fn dash(&self) -> Option<DashPattern> {
        match self {
            Phase::Phase4 | Phase::Phase1 => None,
            Phase::Phase3 => Some(DashPattern::Dot),
            Phase::Phase2 => Some(DashPattern::DashDot),
            Phase::Discovery => Some(DashPattern::Dash),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashPattern {
    Dot,
    DashDot,
    Dash,
}

impl DashPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            DashPattern::Dot => "dot",
            DashPattern::DashDot => "dashdot",
            DashPattern::Dash => "dash",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverInfo {
    Text,
    None,
}

impl HoverInfo {
    pub fn as_str(&self) -> &'static str {
        match self {
            HoverInfo::Text => "text",
            HoverInfo::None => "none",
        }
    }
}

/// Set of target names to emphasize. Empty means no highlight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlight {
    targets: BTreeSet<String>,
}

impl Highlight {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn single(target: impl Into<String>) -> Self {
        Self { targets: BTreeSet::from([target.into()]) }
    }

    /// Dropdown selections may contain null placeholders; those are dropped.
    pub fn from_selection<I>(selection: I) -> Self
    where
        I: IntoIterator<Item = Option<String>>,
    {
        Self { targets: selection.into_iter().flatten().collect() }
    }

    pub fn is_active(&self) -> bool {
        !self.targets.is_empty()
    }

    pub fn contains(&self, target: &str) -> bool {
        self.targets.contains(target)
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub year: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraceStyle {
    pub color: String,
    pub stroke_width: f64,
    pub phase: Phase,
    pub hover: HoverInfo,
}

impl TraceStyle {
    pub fn legend_group(&self) -> &'static str {
        self.phase.legend_group()
    }

    pub fn display_name(&self) -> &'static str {
        self.phase.display_name()
    }

    pub fn dash(&self) -> Option<DashPattern> {
        self.phase.dash()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    pub target_name: String,
    pub entity_id: String,
    pub points: Vec<Point>,
    pub style: TraceStyle,
    pub show_legend: bool,
}

impl Trace {
    /// `target,entity_id,year,value`. Click handlers parse this back, so the layout is fixed.
    pub fn hover_text(&self, point: &Point) -> String {
        format!("{},{},{},{}", self.target_name, self.entity_id, point.year, point.value)
    }

    pub fn is_selected(&self) -> bool {
        self.style.stroke_width == SELECTED_WIDTH
    }
}

#[derive(Serialize)]
struct LineSpec<'a> {
    color: &'a str,
    width: f64,
    dash: Option<&'static str>,
    shape: &'static str,
}

impl Serialize for Trace {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let xs: Vec<i32> = self.points.iter().map(|p| p.year).collect();
        let ys: Vec<f64> = self.points.iter().map(|p| p.value).collect();
        let text: Vec<String> = self.points.iter().map(|p| self.hover_text(p)).collect();
        let customdata: Vec<[&str; 2]> = self
            .points
            .iter()
            .map(|_| [self.target_name.as_str(), self.entity_id.as_str()])
            .collect();

        let mut map = serializer.serialize_map(Some(10))?;
        map.serialize_entry("x", &xs)?;
        map.serialize_entry("y", &ys)?;
        map.serialize_entry("mode", "lines")?;
        map.serialize_entry(
            "line",
            &LineSpec {
                color: &self.style.color,
                width: self.style.stroke_width,
                dash: self.style.dash().map(|d| d.as_str()),
                shape: "spline",
            },
        )?;
        map.serialize_entry("text", &text)?;
        map.serialize_entry("customdata", &customdata)?;
        map.serialize_entry("legendgroup", self.style.legend_group())?;
        map.serialize_entry("name", self.style.display_name())?;
        map.serialize_entry("hoverinfo", self.style.hover.as_str())?;
        map.serialize_entry("showlegend", &self.show_legend)?;
        map.end()
    }
}

/// Group rows by entity id (ascending) and derive one styled trace per group.
///
/// Range filtering is the caller's job; every row passed in is plotted.
pub fn build_traces<'a, I>(rows: I, highlight: &Highlight) -> Vec<Trace>
where
    I: IntoIterator<Item = &'a Observation>,
{
    let mut groups: BTreeMap<&str, Vec<&Observation>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.entity_id.as_str()).or_default().push(row);
    }

    let scale = attention_scale();
    let mut seen_groups: BTreeSet<&'static str> = BTreeSet::new();
    let mut traces = Vec::with_capacity(groups.len());

    for (entity_id, mut group) in groups {
        let target_name = group[0].target_name.clone();
        let growth = group.iter().map(|r| r.best_phase).fold(f64::NEG_INFINITY, f64::max);
        let peak_ratio = group
            .iter()
            .map(|r| r.peak_to_current_ratio)
            .fold(f64::NEG_INFINITY, f64::max);
        let phase = Phase::from_best_phase(growth);

        let mut color = scale.color_for(peak_ratio).to_string();
        let (stroke_width, hover) = if !highlight.is_active() {
            (DEFAULT_WIDTH, HoverInfo::Text)
        } else if highlight.contains(&target_name) {
            if color == UNSELECTED {
                color = SELECTED_GREY.to_string();
            }
            (SELECTED_WIDTH, HoverInfo::Text)
        } else {
            color = UNSELECTED.to_string();
            (UNSELECTED_WIDTH, HoverInfo::None)
        };

        group.sort_by_key(|r| r.year);
        let points = group
            .iter()
            .map(|r| Point { year: r.year, value: r.relative_difference })
            .collect();

        traces.push(Trace {
            target_name,
            entity_id: entity_id.to_string(),
            points,
            style: TraceStyle { color, stroke_width, phase, hover },
            show_legend: seen_groups.insert(phase.legend_group()),
        });
    }

    traces
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(target: &str, entity: &str, year: i32, phase: f64, ratio: f64) -> Observation {
        Observation {
            target_name: target.to_string(),
            entity_id: entity.to_string(),
            year,
            cumulative_value: 10.0,
            best_phase: phase,
            peak_to_current_ratio: ratio,
            relative_difference: year as f64 / 1000.0,
        }
    }

    #[test]
    fn single_phase_four_row() {
        let rows = vec![Observation {
            target_name: "T1".into(),
            entity_id: "E1".into(),
            year: 2000,
            cumulative_value: 3.0,
            best_phase: 4.0,
            peak_to_current_ratio: 0.5,
            relative_difference: 1.0,
        }];
        let traces = build_traces(&rows, &Highlight::none());
        assert_eq!(traces.len(), 1);
        let t = &traces[0];
        assert_eq!(t.style.legend_group(), "4");
        assert_eq!(t.style.display_name(), "Phase 4");
        assert_eq!(t.style.dash(), None);
        assert_eq!(t.style.stroke_width, DEFAULT_WIDTH);
        assert_eq!(t.style.color, attention_scale().bin(249).unwrap());
        assert!(t.show_legend);
        assert_eq!(t.points, vec![Point { year: 2000, value: 1.0 }]);
    }

    #[test]
    fn phase_thresholds() {
        let cases = [
            (4.0, "4", None),
            (3.5, "3", Some(DashPattern::Dot)),
            (2.0, "2", Some(DashPattern::DashDot)),
            (1.0, "1", None),
            (0.9, "0", Some(DashPattern::Dash)),
            (0.0, "0", Some(DashPattern::Dash)),
        ];
        for (best, group, dash) in cases {
            let p = Phase::from_best_phase(best);
            assert_eq!(p.legend_group(), group, "best_phase {}", best);
            assert_eq!(p.dash(), dash, "best_phase {}", best);
        }
        assert_eq!(Phase::from_best_phase(0.0).display_name(), "Discovery");
    }

    #[test]
    fn one_trace_per_entity_with_max_phase() {
        let rows = vec![
            obs("Kinase A", "CHEMBL2", 2001, 1.0, 0.2),
            obs("Kinase B", "CHEMBL1", 2000, 0.0, 0.4),
            obs("Kinase A", "CHEMBL2", 2000, 3.0, 0.3),
            obs("Kinase B", "CHEMBL1", 2001, 2.0, 0.1),
        ];
        let traces = build_traces(&rows, &Highlight::none());
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].entity_id, "CHEMBL1");
        assert_eq!(traces[0].style.legend_group(), "2");
        assert_eq!(traces[1].entity_id, "CHEMBL2");
        assert_eq!(traces[1].style.legend_group(), "3");
        // color from the max ratio of the group
        assert_eq!(traces[1].style.color, attention_scale().color_for(0.3));
        // points sorted by year
        let years: Vec<i32> = traces[1].points.iter().map(|p| p.year).collect();
        assert_eq!(years, vec![2000, 2001]);
    }

    #[test]
    fn first_trace_per_group_shows_legend() {
        let rows = vec![
            obs("A", "E1", 2000, 4.0, 0.5),
            obs("B", "E2", 2000, 4.0, 0.5),
            obs("C", "E3", 2000, 0.0, 0.5),
            obs("D", "E4", 2000, 0.0, 0.5),
        ];
        let flags: Vec<bool> = build_traces(&rows, &Highlight::none())
            .iter()
            .map(|t| t.show_legend)
            .collect();
        assert_eq!(flags, vec![true, false, true, false]);
    }

    #[test]
    fn highlight_dims_excluded_targets() {
        let rows = vec![
            obs("EGFR", "E1", 2000, 4.0, 0.5),
            obs("ABL1", "E2", 2000, 4.0, 0.5),
        ];
        let traces = build_traces(&rows, &Highlight::single("EGFR"));
        let egfr = &traces[0];
        let abl = &traces[1];
        assert_eq!(egfr.style.stroke_width, SELECTED_WIDTH);
        assert_eq!(egfr.style.hover, HoverInfo::Text);
        assert_eq!(egfr.style.color, attention_scale().color_for(0.5));
        assert!(egfr.is_selected());
        assert!(abl.style.stroke_width < 1.0);
        assert_eq!(abl.style.hover, HoverInfo::None);
        assert_eq!(abl.style.color, UNSELECTED);
    }

    #[test]
    fn selection_drops_null_entries() {
        let h = Highlight::from_selection(vec![None, Some("EGFR".to_string()), None]);
        assert!(h.is_active());
        assert_eq!(h.target_count(), 1);
        assert!(!Highlight::from_selection(vec![None, None]).is_active());
    }

    #[test]
    fn serializes_as_plotly_scatter() {
        let rows = vec![obs("EGFR", "CHEMBL203", 1999, 2.0, 0.5)];
        let traces = build_traces(&rows, &Highlight::none());
        let v = serde_json::to_value(&traces[0]).unwrap();
        assert_eq!(v["x"], serde_json::json!([1999]));
        assert_eq!(v["mode"], "lines");
        assert_eq!(v["line"]["dash"], "dashdot");
        assert_eq!(v["line"]["shape"], "spline");
        assert_eq!(v["legendgroup"], "2");
        assert_eq!(v["name"], "Phase 2");
        assert_eq!(v["hoverinfo"], "text");
        assert_eq!(v["showlegend"], true);
        assert_eq!(v["text"][0], "EGFR,CHEMBL203,1999,1.999");
        assert_eq!(v["customdata"][0], serde_json::json!(["EGFR", "CHEMBL203"]));
    }
}
