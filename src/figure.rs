//! Figure composition: trace ordering plus the Plotly layout.

use serde::Serialize;

use crate::traces::{Phase, Trace};

pub const X_AXIS_TITLE: &str = "Year";
pub const Y_AXIS_TITLE: &str = "Relative number of compounds published per year";
pub const PHASE_ANNOTATION: &str = "<b>Max Phase Achieved</b>";

#[derive(Debug, Clone, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layout {
    pub xaxis: Axis,
    pub yaxis: Axis,
    pub showlegend: bool,
    pub hovermode: &'static str,
    pub legend: Legend,
    pub annotations: Vec<Annotation>,
    pub margin: Margin,
    pub font: Font,
}

/// Axis with every decoration hidden except the title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub showgrid: bool,
    pub showline: bool,
    pub zeroline: bool,
    pub showticklabels: bool,
    pub ticks: &'static str,
    pub title: Title,
}

impl Axis {
    fn bare(title: &'static str) -> Self {
        Self {
            showgrid: false,
            showline: false,
            zeroline: false,
            showticklabels: false,
            ticks: "",
            title: Title { text: title },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Legend {
    pub x: f64,
    pub y: f64,
    pub xanchor: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Annotation {
    pub x: f64,
    pub xref: &'static str,
    pub xanchor: &'static str,
    pub y: f64,
    pub yref: &'static str,
    pub yanchor: &'static str,
    pub text: &'static str,
    pub showarrow: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Margin {
    pub t: u32,
    pub b: u32,
    pub r: u32,
    pub l: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Font {
    pub size: u32,
}

impl Layout {
    pub fn new(annotations: Vec<Annotation>) -> Self {
        Self {
            xaxis: Axis::bare(X_AXIS_TITLE),
            yaxis: Axis::bare(Y_AXIS_TITLE),
            showlegend: true,
            hovermode: "closest",
            legend: Legend { x: 0.8, y: 0.95, xanchor: "left" },
            annotations,
            margin: Margin { t: 20, b: 20, r: 0, l: 20 },
            font: Font { size: 12 },
        }
    }
}

fn phase_annotation() -> Annotation {
    Annotation {
        x: 0.8,
        xref: "paper",
        xanchor: "left",
        y: 0.95,
        yref: "paper",
        yanchor: "bottom",
        text: PHASE_ANNOTATION,
        showarrow: false,
    }
}

/// Order traces for display and attach the layout.
///
/// Without a highlight the legend-bearing trace of each phase group is pulled to the front in
/// legend order ("4" first); groups absent from `traces` are skipped. With a highlight the
/// emphasized lines go last so they draw on top.
pub fn compose(mut traces: Vec<Trace>, highlight_active: bool) -> Figure {
    let annotations = if highlight_active {
        raise_selected(&mut traces);
        Vec::new()
    } else {
        order_legend(&mut traces);
        vec![phase_annotation()]
    };
    Figure { data: traces, layout: Layout::new(annotations) }
}

fn order_legend(traces: &mut Vec<Trace>) {
    for phase in Phase::LEGEND_ORDER.iter().rev() {
        let group = phase.legend_group();
        if let Some(idx) = traces
            .iter()
            .position(|t| t.show_legend && t.style.legend_group() == group)
        {
            let trace = traces.remove(idx);
            traces.insert(0, trace);
        }
    }
}

fn raise_selected(traces: &mut Vec<Trace>) {
    let (selected, rest): (Vec<Trace>, Vec<Trace>) =
        traces.drain(..).partition(|t| t.is_selected());
    traces.extend(rest);
    traces.extend(selected);
}
