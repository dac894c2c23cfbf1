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

//! National Water Model streamflow forecasts for a single reach.

use crate::nwps::api::{NwpsClient, Product, Simulation, SiteKind};
use crate::output::Figure;
use crate::source::{text_args, to_json, Context, DataSource, ParamError, Params, SourceInfo};
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Map, Value};

pub const INFO: SourceInfo = SourceInfo {
    name: "nwmp_api_reaches",
    group: "NWMP",
    label: "NWMP Reaches Time Series",
    visualization_type: "plotly",
    description: "Streamflow of a National Water Model reach from every forecast product.",
    tags: &["water", "reach", "streamflow", "time series"],
    attribution: Some("NOAA"),
};

pub fn args() -> Map<String, Value> {
    text_args(&["id"])
}

/// Simulations of one forecast product, empty when the product couldn't be fetched.
type ProductData = (Product, Vec<(String, Simulation)>);

#[derive(Debug)]
pub struct ReachGraph {
    client: NwpsClient,
    id: String,
}

impl ReachGraph {
    pub fn from_params(ctx: &Context, params: &Params<'_>) -> Result<Self, ParamError> {
        Ok(ReachGraph {
            client: ctx.nwps(),
            id: params.required("id")?.to_owned(),
        })
    }

    async fn products(&self) -> Vec<ProductData> {
        let requests = Product::ALL.iter().map(|p| async move {
            match self.client.streamflow(&self.id, *p).await {
                Ok(sims) => (*p, sims),
                Err(e) => {
                    tracing::warn!(message = "unable to fetch reach streamflow", id = %self.id, product = p.as_str(), error = %e);
                    (*p, Vec::new())
                }
            }
        });

        join_all(requests).await
    }
}

#[async_trait]
impl DataSource for ReachGraph {
    async fn read(&self) -> Value {
        let (name, products) = match self.client.metadata(SiteKind::Reaches, &self.id).await {
            Ok(meta) => (meta.name.unwrap_or_else(|| self.id.clone()), self.products().await),
            Err(e) => {
                tracing::error!(message = "unable to fetch reach metadata", id = %self.id, error = %e);
                (String::new(), Vec::new())
            }
        };

        to_json(&Figure {
            data: traces(&products),
            layout: layout(&self.id, &name, &products),
        })
    }
}

fn traces(products: &[ProductData]) -> Vec<Value> {
    let mut traces = Vec::new();
    for (product, sims) in products {
        for (name, sim) in sims {
            let x: Vec<&str> = sim.data.iter().filter_map(|p| p.valid_time.as_deref()).collect();
            let y: Vec<f64> = sim.data.iter().filter_map(|p| p.flow).collect();
            if x.is_empty() || y.is_empty() {
                tracing::debug!(message = "skipping simulation without data", product = product.as_str(), simulation = %name);
                continue;
            }

            traces.push(json!({
                "x": x,
                "y": y,
                "type": "scatter",
                "mode": "lines",
                "name": format!("{} {}", product.as_str(), name),
                "line": {"width": 2},
            }));
        }
    }

    traces
}

fn layout(id: &str, name: &str, products: &[ProductData]) -> Value {
    let units = products
        .iter()
        .flat_map(|(_, sims)| sims.iter())
        .find_map(|(_, s)| s.units.as_deref().filter(|u| !u.is_empty()));

    let y_title = match units {
        Some(u) => format!("Flow ({})", u),
        None => "Flow".to_owned(),
    };

    let name = if name.is_empty() { "Unknown" } else { name };

    json!({
        "title": format!("<b>Reach</b>: {} <br><sub>ID:{} </sub>", name, id),
        "xaxis": {"type": "date", "tickformat": "%Y-%m-%d\n%H:%M"},
        "yaxis": {"title": {"text": y_title}, "rangemode": "tozero"},
        "legend": {"orientation": "h", "x": 0, "y": -0.2},
        "margin": {"l": 50, "r": 50, "t": 80, "b": 80},
        "hovermode": "x unified",
    })
}

#[cfg(test)]
mod tests {
    use super::{layout, traces, ProductData};
    use crate::nwps::api::{Product, Simulation};
    use serde_json::json;

    fn simulation(value: serde_json::Value) -> Simulation {
        serde_json::from_value(value).unwrap()
    }

    fn products() -> Vec<ProductData> {
        vec![
            (
                Product::AnalysisAssimilation,
                vec![(
                    "series".to_owned(),
                    simulation(json!({
                        "units": "ft³/s",
                        "data": [
                            {"validTime": "2024-09-17T12:00:00Z", "flow": 10.0},
                            {"validTime": "2024-09-17T13:00:00Z", "flow": 11.5}
                        ]
                    })),
                )],
            ),
            (Product::ShortRange, Vec::new()),
            (
                Product::MediumRange,
                vec![
                    ("mean".to_owned(), simulation(json!({"units": "ft³/s", "data": []}))),
                    (
                        "member1".to_owned(),
                        simulation(json!({"data": [{"validTime": "2024-09-18T00:00:00Z", "flow": 9.0}]})),
                    ),
                ],
            ),
        ]
    }

    #[test]
    fn test_traces_product_order() {
        let traces = traces(&products());
        assert_eq!(2, traces.len());
        assert_eq!(
            json!({
                "x": ["2024-09-17T12:00:00Z", "2024-09-17T13:00:00Z"],
                "y": [10.0, 11.5],
                "type": "scatter",
                "mode": "lines",
                "name": "analysis_assimilation series",
                "line": {"width": 2}
            }),
            traces[0]
        );
        assert_eq!(json!("medium_range member1"), traces[1]["name"]);
    }

    #[test]
    fn test_layout() {
        let layout = layout("23021904", "", &products());
        assert_eq!(json!("<b>Reach</b>: Unknown <br><sub>ID:23021904 </sub>"), layout["title"]);
        assert_eq!(json!("Flow (ft³/s)"), layout["yaxis"]["title"]["text"]);
        assert_eq!(json!("tozero"), layout["yaxis"]["rangemode"]);
    }

    #[test]
    fn test_layout_no_units() {
        let layout = layout("1", "Reach", &[]);
        assert_eq!(json!("Flow"), layout["yaxis"]["title"]["text"]);
        assert_eq!(json!("<b>Reach</b>: Reach <br><sub>ID:1 </sub>"), layout["title"]);
    }
}
