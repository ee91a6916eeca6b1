//! End-to-end: CSV on disk through the three views, a click round trip and the widget URL.

use std::fs;
use std::path::Path;

use target_attention::colors::{attention_scale, SCALE_BINS};
use target_attention::data::{load_csv, Dataset, RatioRange, REQUIRED_COLUMNS};
use target_attention::interaction::{
    overview_figure, view_figure, widget_src, ClickEvent, OverviewRequest, PointRef, View,
};
use target_attention::traces::{build_traces, Highlight, HoverInfo, SELECTED_WIDTH};
use tempfile::TempDir;

const ROWS: &[&str] = &[
    "EGFR,CHEMBL203,1995,10,4,0.95,0.10",
    "EGFR,CHEMBL203,1996,25,4,0.95,0.20",
    "Tyrosine-protein kinase ABL,CHEMBL1862,1995,4,3,0.5,0.05",
    "Tyrosine-protein kinase ABL,CHEMBL1862,1996,9,3,0.5,0.07",
    "HERG,CHEMBL240,1995,30,0,0.2,0.30",
    "HERG,CHEMBL240,1996,31,0,0.2,0.01",
    "DRD2,CHEMBL217,1995,8,2,1.4,0.09",
    "KIT,CHEMBL1936,1995,2,1,0.1,0.02",
];

fn load_fixture(dir: &Path) -> Dataset {
    let path = dir.join("data_out.csv");
    let mut out = REQUIRED_COLUMNS.join(",");
    out.push('\n');
    for row in ROWS {
        out.push_str(row);
        out.push('\n');
    }
    fs::write(&path, out).unwrap();
    load_csv(&path).unwrap()
}

#[test]
fn static_views_partition_by_attention() {
    let dir = TempDir::new().unwrap();
    let ds = load_fixture(dir.path());

    let contemporary = view_figure(&ds, View::Contemporary);
    let mut ids: Vec<&str> = contemporary.data.iter().map(|t| t.entity_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["CHEMBL203", "CHEMBL217"]);

    let former = view_figure(&ds, View::Former);
    let mut ids: Vec<&str> = former.data.iter().map(|t| t.entity_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["CHEMBL1936", "CHEMBL240"]);

    // DRD2 at 1.4 clamps to the last bin instead of failing
    let drd2 = contemporary.data.iter().find(|t| t.entity_id == "CHEMBL217").unwrap();
    assert_eq!(Some(drd2.style.color.as_str()), attention_scale().bin(SCALE_BINS - 1));
}

#[test]
fn overview_legend_is_phase_ordered() {
    let dir = TempDir::new().unwrap();
    let ds = load_fixture(dir.path());
    let fig = view_figure(&ds, View::Overview);
    assert_eq!(fig.data.len(), 5);
    let groups: Vec<&str> = fig
        .data
        .iter()
        .filter(|t| t.show_legend)
        .map(|t| t.style.legend_group())
        .collect();
    assert_eq!(groups, vec!["4", "3", "2", "1", "0"]);
}

#[test]
fn hover_text_click_round_trip() {
    let dir = TempDir::new().unwrap();
    let ds = load_fixture(dir.path());
    let traces = build_traces(ds.rows(), &Highlight::none());
    let abl = traces.iter().find(|t| t.entity_id == "CHEMBL1862").unwrap();
    let text = abl.hover_text(&abl.points[1]);
    assert_eq!(text, "Tyrosine-protein kinase ABL,CHEMBL1862,1996,0.07");

    let point = PointRef::parse_hover_text(&text).unwrap();
    assert_eq!(point.target_name, abl.target_name);
    assert_eq!(point.entity_id, abl.entity_id);

    let request = OverviewRequest {
        range: [0.0, 0.3],
        categories: Vec::new(),
        click: Some(ClickEvent::from_text(text)),
    };
    let fig = overview_figure(&ds, &request).unwrap();
    assert_eq!(fig.data.len(), 5, "click bypasses the range filter");
    for trace in &fig.data {
        if trace.target_name == point.target_name {
            assert_eq!(trace.style.stroke_width, SELECTED_WIDTH);
            assert_eq!(trace.style.hover, HoverInfo::Text);
        } else {
            assert!(trace.style.stroke_width < 1.0);
            assert_eq!(trace.style.hover, HoverInfo::None);
        }
    }
    assert_eq!(fig.data.last().unwrap().entity_id, "CHEMBL1862");
}

#[test]
fn overview_serializes_for_plotly() {
    let dir = TempDir::new().unwrap();
    let ds = load_fixture(dir.path());
    let request = OverviewRequest {
        range: [0.15, 1.0],
        categories: vec![None, Some("HERG".to_string())],
        click: None,
    };
    let fig = overview_figure(&ds, &request).unwrap();
    let v = serde_json::to_value(&fig).unwrap();
    let data = v["data"].as_array().unwrap();
    assert_eq!(data.len(), 3);
    assert_eq!(data[2]["customdata"][0][0], "HERG");
    assert_eq!(data[2]["line"]["width"], 2.5);
    assert_eq!(data[0]["line"]["color"], "lightgrey");
    assert_eq!(v["layout"]["hovermode"], "closest");
    assert!(v["layout"]["annotations"].as_array().unwrap().is_empty());
}

#[test]
fn range_filter_excludes_low_ratio() {
    let dir = TempDir::new().unwrap();
    let ds = load_fixture(dir.path());
    let kept = ds.within_ratio(RatioRange::new(0.8, 2.0));
    assert!(kept.iter().all(|r| r.peak_to_current_ratio != 0.5));
    assert_eq!(kept.len(), 3);
}

#[test]
fn widget_follows_clicked_entity() {
    let dir = TempDir::new().unwrap();
    let ds = load_fixture(dir.path());
    let fig = view_figure(&ds, View::Former);
    let herg = fig.data.iter().find(|t| t.target_name == "HERG").unwrap();
    let click = ClickEvent::from_text(herg.hover_text(&herg.points[0]));
    let src = widget_src(View::Former, &click).unwrap();
    assert_eq!(
        src,
        "http://chembl-glados.herokuapp.com/target_report_card/CHEMBL240/embed/approved_drugs_clinical_candidates/"
    );
}
