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

//! Client for the subset of the ArcGIS REST API used by map and statistics sources.

use crate::client::{endpoint, ApiClient, ClientError};
use crate::geometry::EsriGeometry;
use crate::metrics::Upstream;
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

const SERVICE_TYPES: &[&str] = &["mapserver", "featureserver", "imageserver", "wmsserver", "wms"];
const MAX_QUERY_PAGES: usize = 50;

/// Key identifying a map service within a catalog, derived from its URL.
///
/// This is the path segment naming the service, the one immediately before the
/// service type (`MapServer`, `wms`, etc.) or the second to last segment if the URL
/// doesn't include a known service type.
pub fn service_key(url: &str) -> Option<String> {
    let trimmed = url.trim_end_matches('/');
    let path = trimmed.split_once("://").map(|(_, rest)| rest).unwrap_or(trimmed);
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let segments: Vec<&str> = path.split('/').collect();

    let pos = segments
        .iter()
        .position(|s| SERVICE_TYPES.contains(&s.to_ascii_lowercase().as_str()));

    let key = match pos {
        Some(p) if p > 1 => segments[p - 1],
        Some(_) => return None,
        None if segments.len() > 2 => segments[segments.len() - 2],
        None => return None,
    };

    if key.is_empty() {
        None
    } else {
        Some(key.to_owned())
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ServiceLayer {
    pub id: i64,
    pub name: String,
}

#[derive(Deserialize, Debug)]
struct ServiceInfo {
    #[serde(default)]
    layers: Vec<ServiceLayer>,
}

#[derive(Deserialize, Debug)]
struct LayerInfo {
    #[serde(alias = "drawingInfo")]
    drawing_info: Option<DrawingInfo>,
}

#[derive(Deserialize, Debug)]
struct DrawingInfo {
    renderer: Option<Renderer>,
}

/// Renderer describing how feature values map to colors on an ArcGIS layer.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Renderer {
    #[serde(alias = "uniqueValueInfos", default)]
    pub unique_values: Vec<UniqueValueInfo>,
    #[serde(alias = "classBreakInfos", default)]
    pub class_breaks: Vec<ClassBreakInfo>,
    #[serde(alias = "minValue")]
    pub min_value: Option<f64>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct UniqueValueInfo {
    pub value: Value,
    #[serde(default)]
    pub label: String,
    pub symbol: Option<Symbol>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ClassBreakInfo {
    #[serde(alias = "classMaxValue")]
    pub class_max_value: f64,
    #[serde(alias = "classMinValue")]
    pub class_min_value: Option<f64>,
    #[serde(default)]
    pub label: String,
    pub symbol: Option<Symbol>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Symbol {
    pub color: Option<Vec<u8>>,
}

impl Symbol {
    /// Symbol color as `#rrggbb`, alpha is ignored.
    pub fn hex(&self) -> Option<String> {
        match self.color.as_deref() {
            Some([r, g, b, ..]) => Some(format!("#{:02x}{:02x}{:02x}", r, g, b)),
            _ => None,
        }
    }
}

#[derive(Deserialize, Debug)]
struct FeatureSet {
    #[serde(default)]
    features: Vec<Feature>,
    #[serde(alias = "exceededTransferLimit", default)]
    exceeded_transfer_limit: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Feature {
    #[serde(default)]
    pub attributes: Map<String, Value>,
    pub geometry: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ArcGisClient {
    client: ApiClient,
}

impl ArcGisClient {
    pub fn new(client: ApiClient) -> Self {
        ArcGisClient { client }
    }

    /// Layers published by the map service at `service_url`.
    pub async fn layers(&self, service_url: &Url) -> Result<Vec<ServiceLayer>, ClientError> {
        let info: ServiceInfo = self.get(service_url.clone(), &[("f", "json")]).await?;
        Ok(info.layers)
    }

    /// Renderer of a single layer, if the layer has one.
    pub async fn renderer(&self, service_url: &Url, layer: &str) -> Result<Option<Renderer>, ClientError> {
        let url = endpoint(service_url, &[layer]);
        let info: LayerInfo = self.get(url, &[("f", "json")]).await?;
        Ok(info.drawing_info.and_then(|d| d.renderer))
    }

    /// Values of `attr` for every feature of `layer` contained by `geometry`.
    pub async fn query_attribute(
        &self,
        service_url: &Url,
        layer: &str,
        geometry: &EsriGeometry,
        attr: &str,
    ) -> Result<Vec<Value>, ClientError> {
        let url = endpoint(service_url, &[layer, "query"]);
        let geometry_json = geometry.geometry.to_string();
        let mut values = Vec::new();

        for page in 0..MAX_QUERY_PAGES {
            let offset = values.len().to_string();
            let params = [
                ("where", "1=1"),
                ("geometry", geometry_json.as_str()),
                ("geometryType", geometry.geometry_type),
                ("inSR", "4326"),
                ("spatialRel", "esriSpatialRelContains"),
                ("outFields", attr),
                ("returnGeometry", "false"),
                ("resultOffset", offset.as_str()),
                ("f", "json"),
            ];

            let set: FeatureSet = self.post(url.clone(), &params).await?;
            let count = set.features.len();
            values.extend(
                set.features
                    .into_iter()
                    .map(|mut f| f.attributes.remove(attr).unwrap_or(Value::Null)),
            );

            if !set.exceeded_transfer_limit || count == 0 {
                return Ok(values);
            }

            tracing::debug!(message = "fetching next page of features", url = %url, page = page + 1, total = values.len());
        }

        Err(ClientError::Truncated(MAX_QUERY_PAGES, url))
    }

    /// Features of `layer` matching `where_clause` with geometries in ESRI JSON.
    pub async fn query_features(
        &self,
        service_url: &Url,
        layer: &str,
        where_clause: &str,
        out_fields: &str,
    ) -> Result<Vec<Feature>, ClientError> {
        let url = endpoint(service_url, &[layer, "query"]);
        let params = [
            ("where", where_clause),
            ("outFields", out_fields),
            ("returnGeometry", "true"),
            ("outSR", "4326"),
            ("f", "json"),
        ];

        let set: FeatureSet = self.post(url, &params).await?;
        Ok(set.features)
    }

    /// Features of `layer` matching `where_clause` as a GeoJSON feature collection.
    pub async fn query_geojson(
        &self,
        service_url: &Url,
        layer: &str,
        where_clause: &str,
        out_fields: &str,
    ) -> Result<Value, ClientError> {
        let url = endpoint(service_url, &[layer, "query"]);
        let params = [
            ("where", where_clause),
            ("outFields", out_fields),
            ("returnGeometry", "true"),
            ("outSR", "4326"),
            ("f", "geojson"),
        ];

        self.post(url, &params).await
    }

    async fn get<T: DeserializeOwned>(&self, url: Url, params: &[(&str, &str)]) -> Result<T, ClientError> {
        let body: Value = self.client.get_json(Upstream::ArcGis, url.clone(), params).await?;
        decode(url, body)
    }

    // Query geometries do not fit in a URL, they are sent as a form body
    async fn post<T: DeserializeOwned>(&self, url: Url, params: &[(&str, &str)]) -> Result<T, ClientError> {
        let body: Value = self.client.post_form_json(Upstream::ArcGis, url.clone(), params).await?;
        decode(url, body)
    }
}

// ArcGIS reports most errors as a 200 response with an "error" object in the body
fn decode<T: DeserializeOwned>(url: Url, body: Value) -> Result<T, ClientError> {
    if let Some(err) = body.get("error") {
        let code = err.get("code").and_then(Value::as_u64).unwrap_or(502);
        let status = u16::try_from(code)
            .ok()
            .and_then(|c| StatusCode::from_u16(c).ok())
            .unwrap_or(StatusCode::BAD_GATEWAY);

        tracing::warn!(message = "arcgis service returned an error", url = %url, error = %err);
        return Err(ClientError::Unexpected(status, url));
    }

    serde_json::from_value(body).map_err(|e| {
        tracing::warn!(message = "unexpected arcgis response", url = %url, error = %e);
        ClientError::Unexpected(StatusCode::BAD_GATEWAY, url)
    })
}
