// ciroh_sources - Dashboard data sources for drought and water prediction services
//
// Copyright 2024 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

//! Observed and forecast stage of a river gauge along with its flood stages.

use crate::nwps::api::{Flood, Metadata, NwpsClient, Series, SeriesPoint, SiteKind, StageFlow};
use crate::output::Figure;
use crate::source::{text_args, to_json, Context, DataSource, ParamError, Params, SourceInfo};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde_json::{json, Map, Value};

pub const INFO: SourceInfo = SourceInfo {
    name: "nwmp_api_gauges",
    group: "NWMP",
    label: "NWMP Gauges Time Series",
    visualization_type: "plotly",
    description: "Observed and forecast stage and flow of an NWPS river gauge with its flood categories.",
    tags: &["water", "gauge", "flood", "time series"],
    attribution: Some("NOAA"),
};

const TIME_INPUT: &str = "%Y-%m-%dT%H:%M:%SZ";
const TIME_OUTPUT: &str = "%a %B %d %Y %I:%M:%S %p";

pub fn args() -> Map<String, Value> {
    text_args(&["id"])
}

#[derive(Debug)]
pub struct GaugeGraph {
    client: NwpsClient,
    id: String,
}

impl GaugeGraph {
    pub fn from_params(ctx: &Context, params: &Params<'_>) -> Result<Self, ParamError> {
        Ok(GaugeGraph {
            client: ctx.nwps(),
            id: params.required("id")?.to_owned(),
        })
    }
}

#[async_trait]
impl DataSource for GaugeGraph {
    async fn read(&self) -> Value {
        let (stageflow, metadata) = tokio::join!(
            self.client.stageflow(&self.id),
            self.client.metadata(SiteKind::Gauges, &self.id)
        );

        let stageflow = stageflow.unwrap_or_else(|e| {
            tracing::error!(message = "unable to fetch gauge stage and flow", id = %self.id, error = %e);
            StageFlow::default()
        });

        let metadata = metadata.unwrap_or_else(|e| {
            tracing::error!(message = "unable to fetch gauge metadata", id = %self.id, error = %e);
            Metadata::default()
        });

        to_json(&figure(&self.id, &stageflow, &metadata))
    }
}

fn figure(id: &str, stageflow: &StageFlow, metadata: &Metadata) -> Figure {
    let (shapes, annotations) = metadata.flood.as_ref().map(flood_events).unwrap_or_default();
    let range = secondary_range(stageflow);

    Figure {
        data: traces(stageflow),
        layout: layout(id, metadata.name.as_deref().unwrap_or_default(), stageflow, shapes, annotations, range),
    }
}

fn datasets(stageflow: &StageFlow) -> impl Iterator<Item = (&'static str, &Series)> {
    [("Observed", &stageflow.observed), ("Forecast", &stageflow.forecast)]
        .into_iter()
        .filter_map(|(name, series)| series.as_ref().map(|s| (name, s)))
}

fn traces(stageflow: &StageFlow) -> Vec<Value> {
    let mut traces = Vec::new();

    for (name, series) in datasets(stageflow) {
        let times: Vec<&str> = series.data.iter().map(|p| p.valid_time.as_str()).collect();
        let primary: Vec<Option<f64>> = series.data.iter().map(|p| p.primary).collect();
        let text: Vec<String> = series.data.iter().map(|p| hover_text(series, p)).collect();

        traces.push(json!({
            "x": times,
            "y": primary,
            "mode": "lines",
            "name": name,
            "yaxis": "y1",
            "hoverinfo": "text",
            "text": text,
        }));

        // Hidden trace so the secondary axis is drawn
        if let Some(first) = times.first() {
            traces.push(json!({
                "x": [first],
                "y": [0],
                "yaxis": "y2",
                "visible": false,
            }));
        }
    }

    traces
}

fn hover_text(series: &Series, point: &SeriesPoint) -> String {
    let time = NaiveDateTime::parse_from_str(&point.valid_time, TIME_INPUT)
        .map(|t| t.format(TIME_OUTPUT).to_string())
        .unwrap_or_else(|_| point.valid_time.clone());

    let primary = point.primary.map(fmt_number).unwrap_or_else(|| "-".to_owned());
    let mut text = format!("Time: {}<br>{}: {}", time, series.primary_units, primary);
    if let Some(s) = point.secondary.filter(|s| *s >= 0.0) {
        text.push_str(&format!("<br>{}: {}", series.secondary_units, fmt_number(s)));
    }

    text
}

/// Dashed line and label for every flood category with a stage.
fn flood_events(flood: &Flood) -> (Vec<Value>, Vec<Value>) {
    let mut shapes = Vec::new();
    let mut annotations = Vec::new();

    for (category, details) in &flood.categories {
        let stage = match details.stage {
            Some(s) => s,
            None => continue,
        };

        shapes.push(json!({
            "type": "line",
            "x0": 0,
            "x1": 1,
            "xref": "paper",
            "y0": stage,
            "y1": stage,
            "yref": "y1",
            "line": {
                "color": category_color(category),
                "width": 2,
                "dash": "dash",
            },
        }));

        let label = format!("{} {} - {}", fmt_number(stage), flood.stage_units, category);
        annotations.push(json!({
            "x": 0,
            "y": stage,
            "xref": "paper",
            "yref": "y1",
            "text": label.trim(),
            "showarrow": false,
            "xanchor": "left",
            "yanchor": "bottom",
            "font": {"color": "black", "size": 12},
        }));
    }

    (shapes, annotations)
}

fn category_color(category: &str) -> &'static str {
    match category.to_ascii_lowercase().as_str() {
        "action" => "orange",
        "minor" => "yellow",
        "moderate" => "red",
        "major" => "purple",
        _ => "black",
    }
}

/// Range of the secondary axis, negative values are missing data and ignored.
fn secondary_range(stageflow: &StageFlow) -> (f64, f64) {
    let values = datasets(stageflow)
        .flat_map(|(_, s)| s.data.iter())
        .filter_map(|p| p.secondary)
        .filter(|s| *s >= 0.0);

    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }

    let padding = if max != min { (max - min) * 0.1 } else { 1.0 };
    (min - padding, max + padding)
}

fn layout(
    id: &str,
    name: &str,
    stageflow: &StageFlow,
    shapes: Vec<Value>,
    annotations: Vec<Value>,
    range: (f64, f64),
) -> Value {
    let (primary, secondary) = match datasets(stageflow).next() {
        Some((_, s)) => (
            axis_title(&s.primary_name, &s.primary_units),
            axis_title(&s.secondary_name, &s.secondary_units),
        ),
        None => ("Primary".to_owned(), "Secondary".to_owned()),
    };

    let name = if name.is_empty() { "Unknown" } else { name };

    json!({
        "title": format!("<b>Gauge</b>: {} <br><sub>ID:{}</sub>", name, id),
        "xaxis": {"tickformat": "%I %p<br>%b %d"},
        "yaxis": {"title": primary, "side": "left"},
        "yaxis2": {
            "title": secondary,
            "side": "right",
            "overlaying": "y",
            "showgrid": false,
            "range": [range.0, range.1],
        },
        "legend": {"orientation": "h", "x": 0, "y": -0.2},
        "margin": {"l": 50, "r": 50, "t": 50, "b": 50},
        "hovermode": "x unified",
        "shapes": shapes,
        "annotations": annotations,
    })
}

fn axis_title(name: &str, units: &str) -> String {
    format!("{} ({})", name, units).trim().to_owned()
}

// Whole numbers keep a decimal place, 12 is shown as 12.0
fn fmt_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{figure, flood_events, secondary_range, traces};
    use crate::nwps::api::{Metadata, StageFlow};
    use serde_json::json;

    fn stageflow() -> StageFlow {
        serde_json::from_value(json!({
            "observed": {
                "primaryName": "Stage",
                "primaryUnits": "ft",
                "secondaryName": "Flow",
                "secondaryUnits": "kcfs",
                "data": [
                    {"validTime": "2024-09-17T12:00:00Z", "primary": 4.5, "secondary": 1.2},
                    {"validTime": "2024-09-17T18:00:00Z", "primary": 5.0, "secondary": -999}
                ]
            },
            "forecast": {
                "primaryName": "Stage",
                "primaryUnits": "ft",
                "secondaryName": "Flow",
                "secondaryUnits": "kcfs",
                "data": [
                    {"validTime": "2024-09-18T00:00:00Z", "primary": 5.5, "secondary": 2.2}
                ]
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_traces() {
        let traces = traces(&stageflow());
        assert_eq!(4, traces.len());

        assert_eq!(
            json!({
                "x": ["2024-09-17T12:00:00Z", "2024-09-17T18:00:00Z"],
                "y": [4.5, 5.0],
                "mode": "lines",
                "name": "Observed",
                "yaxis": "y1",
                "hoverinfo": "text",
                "text": [
                    "Time: Tue September 17 2024 12:00:00 PM<br>ft: 4.5<br>kcfs: 1.2",
                    "Time: Tue September 17 2024 06:00:00 PM<br>ft: 5.0"
                ]
            }),
            traces[0]
        );
        assert_eq!(
            json!({"x": ["2024-09-17T12:00:00Z"], "y": [0], "yaxis": "y2", "visible": false}),
            traces[1]
        );
        assert_eq!(json!("Forecast"), traces[2]["name"]);
    }

    #[test]
    fn test_traces_empty_series() {
        let sf: StageFlow = serde_json::from_value(json!({"observed": {"data": []}})).unwrap();
        let traces = traces(&sf);
        assert_eq!(1, traces.len());
        assert_eq!(json!([]), traces[0]["x"]);
    }

    #[test]
    fn test_secondary_range() {
        let (lo, hi) = secondary_range(&stageflow());
        assert!((lo - 1.1).abs() < 1e-9);
        assert!((hi - 2.3).abs() < 1e-9);

        assert_eq!((0.0, 1.0), secondary_range(&StageFlow::default()));
    }

    #[test]
    fn test_secondary_range_single_value() {
        let sf: StageFlow = serde_json::from_value(json!({
            "observed": {"data": [{"validTime": "2024-09-17T12:00:00Z", "primary": 1.0, "secondary": 3.0}]}
        }))
        .unwrap();

        assert_eq!((2.0, 4.0), secondary_range(&sf));
    }

    #[test]
    fn test_flood_events() {
        let meta: Metadata = serde_json::from_value(json!({
            "name": "Test Gauge",
            "flood": {
                "stageUnits": "ft",
                "categories": {
                    "action": {"stage": 12.0},
                    "minor": {"stage": null},
                    "record": {"stage": 20.5}
                }
            }
        }))
        .unwrap();

        let (shapes, annotations) = flood_events(meta.flood.as_ref().unwrap());
        assert_eq!(2, shapes.len());
        assert_eq!(json!("orange"), shapes[0]["line"]["color"]);
        assert_eq!(json!("black"), shapes[1]["line"]["color"]);
        assert_eq!(json!("12.0 ft - action"), annotations[0]["text"]);
        assert_eq!(json!("20.5 ft - record"), annotations[1]["text"]);
    }

    #[test]
    fn test_figure_without_data() {
        let fig = figure("ABCD1", &StageFlow::default(), &Metadata::default());
        assert!(fig.data.is_empty());
        assert_eq!(json!("<b>Gauge</b>: Unknown <br><sub>ID:ABCD1</sub>"), fig.layout["title"]);
        assert_eq!(json!([0.0, 1.0]), fig.layout["yaxis2"]["range"]);
        assert_eq!(json!("Primary"), fig.layout["yaxis"]["title"]);
    }

    #[test]
    fn test_figure_layout() {
        let fig = figure("ABCD1", &stageflow(), &Metadata::default());
        assert_eq!(json!("Stage (ft)"), fig.layout["yaxis"]["title"]);
        assert_eq!(json!("Flow (kcfs)"), fig.layout["yaxis2"]["title"]);
        assert_eq!(json!("x unified"), fig.layout["hovermode"]);
    }
}
