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

use crate::drought::api::{DroughtMonitorClient, Row};
use crate::drought::map::CATEGORIES;
use crate::drought::options;
use crate::output::Figure;
use crate::source::{to_json, Context, DataSource, ParamError, Params, SourceInfo};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};

pub const INFO: SourceInfo = SourceInfo {
    name: "drought_api_pie_data",
    group: "Drought_Monitor",
    label: "U.S. Drought Monitor Pie Chart",
    visualization_type: "plotly",
    description: "Share of an area in each drought category for a single week.",
    tags: &["drought", "chart", "statistics"],
    attribution: Some("NDMC, USDA, NOAA"),
};

// Categorical percent area
const STATISTIC_TYPE: &str = "2";
const DATE_FIELDS: &[&str] = &["mapDate", "FileDate"];

pub async fn args(ctx: &Context, today: NaiveDate) -> Map<String, Value> {
    let drought = ctx.drought();
    let mut args = Map::new();
    args.insert("area_type".to_owned(), to_json(&options::area_types(&drought).await));
    args.insert(
        "date".to_owned(),
        to_json(&options::drought_dates(&drought, &ctx.cache, today).await),
    );
    args
}

/// Pie chart of drought categories for one area and week.
#[derive(Debug)]
pub struct DroughtPie {
    client: DroughtMonitorClient,
    area_type: String,
    area: String,
    date: Option<String>,
}

impl DroughtPie {
    pub fn from_params(ctx: &Context, params: &Params<'_>) -> Result<Self, ParamError> {
        let (area_type, area) = options::split_area(params.required("area_type")?)?;
        Ok(DroughtPie {
            client: ctx.drought(),
            area_type,
            area,
            date: params.optional("date").map(str::to_owned),
        })
    }
}

#[async_trait]
impl DataSource for DroughtPie {
    async fn read(&self) -> Value {
        let rows = self
            .client
            .graph(&self.area_type, &self.area, STATISTIC_TYPE)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(message = "unable to fetch drought statistics", area_type = %self.area_type, area = %self.area, error = %e);
                Vec::new()
            });

        let data = select_row(&rows, self.date.as_deref()).map(pie_trace).into_iter().collect();
        to_json(&Figure { data, layout: layout() })
    }
}

/// Row released on `date`, or the first (most recent) row.
fn select_row<'a>(rows: &'a [Row], date: Option<&str>) -> Option<&'a Row> {
    let wanted = date.map(digits).filter(|d| !d.is_empty());
    wanted
        .and_then(|d| {
            rows.iter().find(|r| {
                DATE_FIELDS
                    .iter()
                    .filter_map(|f| r.get(*f))
                    .any(|v| digits(&scalar(v)) == d)
            })
        })
        .or_else(|| rows.first())
}

fn pie_trace(row: &Row) -> Value {
    let labels: Vec<&str> = CATEGORIES.iter().map(|(code, _, _)| *code).collect();
    let colors: Vec<&str> = CATEGORIES.iter().map(|(_, _, color)| *color).collect();
    let values: Vec<f64> = CATEGORIES
        .iter()
        .map(|(code, _, _)| row.get(*code).map(number).unwrap_or(0.0))
        .collect();

    json!({
        "labels": labels,
        "values": values,
        "type": "pie",
        "hoverinfo": "label+percent",
        "marker": {"colors": colors},
        "automargin": true,
    })
}

fn layout() -> Value {
    json!({
        "height": 400,
        "width": 400,
        "margin": {"t": 0, "b": 0, "l": 0, "r": 0},
    })
}

fn scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        v => v.to_string(),
    }
}

fn digits(s: &str) -> String {
    s.chars().filter(char::is_ascii_digit).collect()
}

// Percentages are numbers or numeric strings depending on the area type
fn number(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::{layout, pie_trace, select_row};
    use crate::drought::api::Row;
    use serde_json::json;

    fn rows() -> Vec<Row> {
        vec![
            json!({"mapDate": "20240924", "None": 40.0, "D0": 30.0, "D1": 20.0, "D2": 10.0, "D3": 0.0, "D4": 0.0}),
            json!({"mapDate": "20240917", "None": 50.0, "D0": 25.0, "D1": "15.5", "D2": 9.5, "D3": 0.0, "D4": 0.0}),
        ]
        .into_iter()
        .map(|v| v.as_object().cloned().unwrap())
        .collect()
    }

    #[test]
    fn test_select_row_by_date() {
        let rows = rows();
        let row = select_row(&rows, Some("2024-09-17")).unwrap();
        assert_eq!(json!("20240917"), row["mapDate"]);
    }

    #[test]
    fn test_select_row_fallback_first() {
        let rows = rows();
        assert_eq!(json!("20240924"), select_row(&rows, Some("20200101")).unwrap()["mapDate"]);
        assert_eq!(json!("20240924"), select_row(&rows, None).unwrap()["mapDate"]);
        assert!(select_row(&[], None).is_none());
    }

    #[test]
    fn test_pie_trace() {
        let rows = rows();
        let trace = pie_trace(&rows[1]);
        assert_eq!(
            json!({
                "labels": ["D0", "D1", "D2", "D3", "D4"],
                "values": [25.0, 15.5, 9.5, 0.0, 0.0],
                "type": "pie",
                "hoverinfo": "label+percent",
                "marker": {"colors": ["#ffff00", "#fcd37f", "#ffaa00", "#e60000", "#730000"]},
                "automargin": true,
            }),
            trace
        );
    }

    #[test]
    fn test_layout() {
        assert_eq!(json!(400), layout()["height"]);
    }
}
