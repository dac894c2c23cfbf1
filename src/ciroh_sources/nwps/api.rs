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

use crate::client::{endpoint, ApiClient, ClientError, NO_QUERY};
use crate::metrics::Upstream;
use reqwest::Url;
use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Kind of site NWPS has metadata for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteKind {
    Gauges,
    Reaches,
}

impl SiteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gauges => "gauges",
            Self::Reaches => "reaches",
        }
    }
}

/// National Water Model forecast products available for a reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    AnalysisAssimilation,
    ShortRange,
    MediumRange,
    LongRange,
    MediumRangeBlend,
}

impl Product {
    pub const ALL: &'static [Product] = &[
        Self::AnalysisAssimilation,
        Self::ShortRange,
        Self::MediumRange,
        Self::LongRange,
        Self::MediumRangeBlend,
    ];

    /// Name used for the `series` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AnalysisAssimilation => "analysis_assimilation",
            Self::ShortRange => "short_range",
            Self::MediumRange => "medium_range",
            Self::LongRange => "long_range",
            Self::MediumRangeBlend => "medium_range_blend",
        }
    }

    /// Key of the product in a streamflow response.
    pub fn response_key(&self) -> &'static str {
        match self {
            Self::AnalysisAssimilation => "analysisAssimilation",
            Self::ShortRange => "shortRange",
            Self::MediumRange => "mediumRange",
            Self::LongRange => "longRange",
            Self::MediumRangeBlend => "mediumRangeBlend",
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    #[serde(default)]
    pub name: Option<String>,
    pub flood: Option<Flood>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Flood {
    #[serde(alias = "stageUnits", default, deserialize_with = "nullable")]
    pub stage_units: String,
    #[serde(default, deserialize_with = "ordered_categories")]
    pub categories: Vec<(String, FloodCategory)>,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct FloodCategory {
    pub stage: Option<f64>,
    pub flow: Option<f64>,
}

// Fields sent as null get their default value
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

// Categories are an object keyed by name, keep them in the order they're sent
fn ordered_categories<'de, D>(deserializer: D) -> Result<Vec<(String, FloodCategory)>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    raw.into_iter()
        .map(|(k, v)| {
            serde_json::from_value::<Option<FloodCategory>>(v)
                .map(|c| (k, c.unwrap_or_default()))
                .map_err(de::Error::custom)
        })
        .collect()
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct StageFlow {
    pub observed: Option<Series>,
    pub forecast: Option<Series>,
}

/// Observed or forecast stage and flow of a gauge.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Series {
    #[serde(alias = "primaryName", default, deserialize_with = "nullable")]
    pub primary_name: String,
    #[serde(alias = "primaryUnits", default, deserialize_with = "nullable")]
    pub primary_units: String,
    #[serde(alias = "secondaryName", default, deserialize_with = "nullable")]
    pub secondary_name: String,
    #[serde(alias = "secondaryUnits", default, deserialize_with = "nullable")]
    pub secondary_units: String,
    #[serde(default, deserialize_with = "nullable")]
    pub data: Vec<SeriesPoint>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    #[serde(alias = "validTime")]
    pub valid_time: String,
    pub primary: Option<f64>,
    pub secondary: Option<f64>,
}

/// One simulation of a forecast product, e.g. the `series` or `mean` of a product.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Simulation {
    pub units: Option<String>,
    #[serde(default)]
    pub data: Vec<FlowPoint>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct FlowPoint {
    #[serde(alias = "validTime")]
    pub valid_time: Option<String>,
    pub flow: Option<f64>,
}

/// Client for the National Water Prediction Service REST API.
#[derive(Debug, Clone)]
pub struct NwpsClient {
    client: ApiClient,
    base_url: Url,
}

impl NwpsClient {
    pub fn new(client: ApiClient, base_url: Url) -> Self {
        NwpsClient { client, base_url }
    }

    pub async fn metadata(&self, kind: SiteKind, id: &str) -> Result<Metadata, ClientError> {
        let url = endpoint(&self.base_url, &[kind.as_str(), id]);
        self.client.get_json(Upstream::NwpsApi, url, NO_QUERY).await
    }

    pub async fn stageflow(&self, id: &str) -> Result<StageFlow, ClientError> {
        let url = endpoint(&self.base_url, &["gauges", id, "stageflow"]);
        self.client.get_json(Upstream::NwpsApi, url, NO_QUERY).await
    }

    /// Simulations of a single forecast product for a reach, by simulation name.
    ///
    /// Members of the product that aren't simulations are skipped.
    pub async fn streamflow(&self, id: &str, product: Product) -> Result<Vec<(String, Simulation)>, ClientError> {
        let url = endpoint(&self.base_url, &["reaches", id, "streamflow"]);
        let body: Map<String, Value> = self
            .client
            .get_json(Upstream::NwpsApi, url, &[("series", product.as_str())])
            .await?;

        Ok(simulations(body, product))
    }
}

fn simulations(mut body: Map<String, Value>, product: Product) -> Vec<(String, Simulation)> {
    let members = match body.remove(product.response_key()) {
        Some(Value::Object(m)) => m,
        _ => return Vec::new(),
    };

    members
        .into_iter()
        .filter_map(|(name, v)| match v {
            Value::Object(_) => serde_json::from_value(v).ok().map(|s| (name, s)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{simulations, Metadata, Product, StageFlow};
    use serde_json::json;

    #[test]
    fn test_metadata_categories_in_order() {
        let meta: Metadata = serde_json::from_value(json!({
            "lid": "ANAW1",
            "name": "Skagit River near Concrete",
            "flood": {
                "stageUnits": "ft",
                "categories": {
                    "action": {"stage": 28.0, "flow": null},
                    "minor": {"stage": 30.0, "flow": 90000},
                    "moderate": {"stage": 32.5},
                    "major": null
                }
            }
        }))
        .unwrap();

        let flood = meta.flood.unwrap();
        let names: Vec<&str> = flood.categories.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(vec!["action", "minor", "moderate", "major"], names);
        assert_eq!(Some(32.5), flood.categories[2].1.stage);
        assert_eq!(None, flood.categories[3].1.stage);
        assert_eq!("ft", flood.stage_units);
        assert_eq!(Some("Skagit River near Concrete"), meta.name.as_deref());
    }

    #[test]
    fn test_metadata_null_fields() {
        let meta: Metadata = serde_json::from_value(json!({
            "name": null,
            "flood": {"stageUnits": null, "categories": null}
        }))
        .unwrap();

        assert_eq!(None, meta.name);
        let flood = meta.flood.unwrap();
        assert_eq!("", flood.stage_units);
        assert!(flood.categories.is_empty());
    }

    #[test]
    fn test_stageflow_partial() {
        let sf: StageFlow = serde_json::from_value(json!({
            "observed": {
                "primaryName": "Stage",
                "primaryUnits": "ft",
                "data": [{"validTime": "2024-09-17T12:00:00Z", "primary": 4.5, "secondary": -999}]
            }
        }))
        .unwrap();

        assert!(sf.forecast.is_none());
        let observed = sf.observed.unwrap();
        assert_eq!(Some(-999.0), observed.data[0].secondary);
        assert_eq!("", observed.secondary_units);
    }

    #[test]
    fn test_stageflow_null_fields() {
        let sf: StageFlow = serde_json::from_value(json!({
            "observed": {"primaryName": null, "primaryUnits": "ft", "secondaryName": null, "data": null}
        }))
        .unwrap();

        let observed = sf.observed.unwrap();
        assert_eq!("", observed.primary_name);
        assert_eq!("ft", observed.primary_units);
        assert!(observed.data.is_empty());
    }

    #[test]
    fn test_simulations() {
        let body = json!({
            "reach": {"id": "23021904"},
            "shortRange": {
                "series": {"units": "ft³/s", "data": [{"validTime": "2024-09-17T12:00:00Z", "flow": 10.5}]},
                "referenceTime": "2024-09-17T11:00:00Z"
            }
        });

        let sims = simulations(body.as_object().cloned().unwrap(), Product::ShortRange);
        assert_eq!(1, sims.len());
        assert_eq!("series", sims[0].0);
        assert_eq!(Some(10.5), sims[0].1.data[0].flow);

        let sims = simulations(body.as_object().cloned().unwrap(), Product::LongRange);
        assert!(sims.is_empty());
    }
}
