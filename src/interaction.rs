//! Stateless handlers behind the dashboard controls.
//!
//! Every call rebuilds its output from the shared read-only [`Dataset`] and the request alone.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use url::Url;

use crate::data::{Dataset, Observation, RatioRange};
use crate::figure::{compose, Figure};
use crate::logging::{self, ProfileScope};
use crate::traces::{build_traces, Highlight};

pub const CONTEMPORARY_RANGE: RatioRange = RatioRange::new(0.8, 2.0);
pub const FORMER_RANGE: RatioRange = RatioRange::new(0.0, 0.3);

const REPORT_CARD_BASE: &str = "http://chembl-glados.herokuapp.com/target_report_card/";
const REPORT_CARD_TAIL: [&str; 3] = ["embed", "approved_drugs_clinical_candidates", ""];
/// Report card shown before the user clicks anything.
pub const DEFAULT_WIDGET_ENTITY: &str = "CHEMBL204";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Targets publishing at or near their peak rate.
    Contemporary,
    /// Targets well below their peak rate.
    Former,
    /// Everything, filterable.
    Overview,
}

impl View {
    pub const ALL: [View; 3] = [View::Contemporary, View::Former, View::Overview];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "contemporary" => Some(View::Contemporary),
            "former" => Some(View::Former),
            "overview" => Some(View::Overview),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            View::Contemporary => "contemporary",
            View::Former => "former",
            View::Overview => "overview",
        }
    }

    /// Fixed attention-score window of the static views.
    pub fn fixed_range(&self) -> Option<RatioRange> {
        match self {
            View::Contemporary => Some(CONTEMPORARY_RANGE),
            View::Former => Some(FORMER_RANGE),
            View::Overview => None,
        }
    }

    /// Whether clicking a point in this view retargets a report-card widget.
    pub fn has_widget(&self) -> bool {
        !matches!(self, View::Overview)
    }
}

/// Plotly click payload, reduced to the fields the dashboard reads.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClickEvent {
    #[serde(default)]
    pub points: Vec<ClickPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClickPoint {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub customdata: Option<Vec<String>>,
}

impl ClickEvent {
    /// Click on a point whose only payload is its hover text.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            points: vec![ClickPoint { text: Some(text.into()), customdata: None }],
        }
    }
}

/// The (target, entity) pair a clicked point belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointRef {
    pub target_name: String,
    pub entity_id: String,
}

impl PointRef {
    /// Resolve the first clicked point. Structured `customdata` wins over the hover text.
    pub fn from_click(click: &ClickEvent) -> Result<Self> {
        let point = click.points.first().context("click event has no points")?;
        if let Some([target, entity]) = point.customdata.as_deref() {
            if !target.is_empty() && !entity.is_empty() {
                return Ok(Self { target_name: target.clone(), entity_id: entity.clone() });
            }
        }
        let text = point.text.as_deref().context("clicked point has no hover text")?;
        Self::parse_hover_text(text)
    }

    /// Inverse of the trace hover text `target,entity_id,year,value`.
    ///
    /// Fields are taken from the right so target names containing commas survive.
    pub fn parse_hover_text(text: &str) -> Result<Self> {
        let mut fields = text.rsplitn(4, ',');
        let (value, year, entity, target) =
            match (fields.next(), fields.next(), fields.next(), fields.next()) {
                (Some(v), Some(y), Some(e), Some(t)) => (v, y, e, t),
                _ => bail!("malformed hover text {:?}: expected 4 fields", text),
            };
        if target.is_empty() || entity.is_empty() {
            bail!("malformed hover text {:?}: empty target or entity", text);
        }
        year.parse::<i32>()
            .with_context(|| format!("malformed hover text {:?}: bad year", text))?;
        value
            .parse::<f64>()
            .with_context(|| format!("malformed hover text {:?}: bad value", text))?;
        Ok(Self { target_name: target.to_string(), entity_id: entity.to_string() })
    }
}

/// Control state of the interactive overview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewRequest {
    #[serde(default = "default_range")]
    pub range: [f64; 2],
    #[serde(default)]
    pub categories: Vec<Option<String>>,
    #[serde(default)]
    pub click: Option<ClickEvent>,
}

fn default_range() -> [f64; 2] {
    let r = RatioRange::default();
    [r.min, r.max]
}

impl Default for OverviewRequest {
    fn default() -> Self {
        Self { range: default_range(), categories: Vec::new(), click: None }
    }
}

impl OverviewRequest {
    pub fn ratio_range(&self) -> RatioRange {
        RatioRange::new(self.range[0], self.range[1])
    }
}

/// Recompute the overview figure.
///
/// A click narrows the highlight to the clicked target and plots the whole dataset, ignoring the
/// slider. Otherwise the slider range filters rows and the dropdown selection drives the highlight.
pub fn overview_figure(dataset: &Dataset, request: &OverviewRequest) -> Result<Figure> {
    let _scope = ProfileScope::with_context(
        "overview_figure",
        &[("clicked", json!(request.click.is_some()))],
    );
    match &request.click {
        Some(click) => {
            let point = PointRef::from_click(click)?;
            logging::log_click(View::Overview.name(), &point.target_name, &point.entity_id);
            let highlight = Highlight::single(point.target_name);
            Ok(render(View::Overview, dataset.rows().iter().collect(), &highlight))
        }
        None => {
            let highlight = Highlight::from_selection(request.categories.iter().cloned());
            let rows = dataset.within_ratio(request.ratio_range());
            Ok(render(View::Overview, rows, &highlight))
        }
    }
}

/// Initial figure of a view: fixed range for the static views, everything for the overview.
pub fn view_figure(dataset: &Dataset, view: View) -> Figure {
    let rows = match view.fixed_range() {
        Some(range) => dataset.within_ratio(range),
        None => dataset.rows().iter().collect(),
    };
    render(view, rows, &Highlight::none())
}

/// Report-card URL for the entity behind a clicked point.
pub fn widget_src(view: View, click: &ClickEvent) -> Result<String> {
    let point = PointRef::from_click(click)?;
    logging::log_click(view.name(), &point.target_name, &point.entity_id);
    widget_url(&point.entity_id)
}

pub fn widget_url(entity_id: &str) -> Result<String> {
    let mut url = Url::parse(REPORT_CARD_BASE)?;
    url.path_segments_mut()
        .map_err(|_| anyhow!("{} cannot take path segments", REPORT_CARD_BASE))?
        .pop_if_empty()
        .push(entity_id)
        .extend(REPORT_CARD_TAIL);
    Ok(url.into())
}

fn render(view: View, rows: Vec<&Observation>, highlight: &Highlight) -> Figure {
    let row_count = rows.len();
    let figure = compose(build_traces(rows, highlight), highlight.is_active());
    logging::log_render(view.name(), row_count, figure.data.len(), highlight.target_count());
    figure
}
