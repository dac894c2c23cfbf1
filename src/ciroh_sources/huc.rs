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

//! Hydrologic unit boundaries from the USGS Watershed Boundary Dataset.

use crate::arcgis::ArcGisClient;
use crate::client::ClientError;
use crate::geometry::EsriGeometry;
use crate::output::{set_wgs84_crs, Layer, MapConfig, DEFAULT_BASE_MAP};
use crate::source::{text_args, to_json, Context, DataSource, ParamError, Params, SourceInfo};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::{json, Map, Value};
use std::fmt;

pub const INFO: SourceInfo = SourceInfo {
    name: "huc_boundary_map",
    group: "NWMP",
    label: "HUC Boundary Map",
    visualization_type: "map",
    description: "Boundary of a hydrologic unit from the USGS Watershed Boundary Dataset.",
    tags: &["map", "water", "huc", "watershed"],
    attribution: Some("USGS"),
};

pub fn args() -> Map<String, Value> {
    text_args(&["huc"])
}

/// Hydrologic unit code, 2 to 12 digits depending on the level of the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HucCode(String);

impl HucCode {
    pub fn parse(raw: &str) -> Result<Self, ParamError> {
        let code = raw.trim();
        if !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParamError::invalid("huc", raw, "expected only digits"));
        }

        if code.len() < 2 || code.len() > 12 || code.len() % 2 != 0 {
            return Err(ParamError::invalid("huc", raw, "expected 2, 4, 6, 8, 10, or 12 digits"));
        }

        Ok(HucCode(code.to_owned()))
    }

    /// Number of digits, HUC8 codes are level 8.
    pub fn level(&self) -> usize {
        self.0.len()
    }

    /// ID of the WBD map service layer with units of this level.
    pub fn layer_id(&self) -> String {
        (self.level() / 2).to_string()
    }

    fn where_clause(&self) -> String {
        format!("huc{}='{}'", self.level(), self.0)
    }

    fn out_fields(&self) -> String {
        format!("huc{},name", self.level())
    }
}

impl fmt::Display for HucCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Boundary of a unit as a GeoJSON feature collection.
pub async fn boundary_geojson(client: &ArcGisClient, wbd: &Url, code: &HucCode) -> Result<Value, ClientError> {
    client
        .query_geojson(wbd, &code.layer_id(), &code.where_clause(), &code.out_fields())
        .await
}

/// Boundary of a unit as an ESRI polygon, `None` if there's no such unit.
pub async fn boundary_esri(
    client: &ArcGisClient,
    wbd: &Url,
    code: &HucCode,
) -> Result<Option<EsriGeometry>, ClientError> {
    let features = client
        .query_features(wbd, &code.layer_id(), &code.where_clause(), &code.out_fields())
        .await?;

    Ok(features
        .into_iter()
        .find_map(|f| f.geometry)
        .map(EsriGeometry::polygon))
}

/// Map showing the outline of a single hydrologic unit.
#[derive(Debug)]
pub struct HucBoundaryMap {
    client: ArcGisClient,
    wbd: Url,
    code: HucCode,
}

impl HucBoundaryMap {
    pub fn from_params(ctx: &Context, params: &Params<'_>) -> Result<Self, ParamError> {
        Ok(HucBoundaryMap {
            client: ctx.arcgis(),
            wbd: ctx.endpoints.wbd.clone(),
            code: HucCode::parse(params.required("huc")?)?,
        })
    }
}

#[async_trait]
impl DataSource for HucBoundaryMap {
    async fn read(&self) -> Value {
        let layers = match boundary_geojson(&self.client, &self.wbd, &self.code).await {
            Ok(geojson) => vec![boundary_layer(&self.code, geojson)],
            Err(e) => {
                tracing::error!(message = "unable to fetch HUC boundary", huc = %self.code, error = %e);
                Vec::new()
            }
        };

        to_json(&MapConfig {
            base_map: DEFAULT_BASE_MAP.to_owned(),
            layers,
            layer_control: true,
            view_config: None,
        })
    }
}

fn boundary_layer(code: &HucCode, mut geojson: Value) -> Layer {
    set_wgs84_crs(&mut geojson);
    let style = json!({
        "stroke-color": "#1f78b4",
        "stroke-width": 2,
        "fill-color": "rgba(31, 120, 180, 0.1)",
    });

    Layer::geojson(format!("HUC {}", code), geojson, style, None)
}

#[cfg(test)]
mod tests {
    use super::{boundary_layer, HucCode};
    use serde_json::json;

    #[test]
    fn test_parse_levels() {
        let code = HucCode::parse("01").unwrap();
        assert_eq!(2, code.level());
        assert_eq!("1", code.layer_id());

        let code = HucCode::parse(" 180500020905 ").unwrap();
        assert_eq!(12, code.level());
        assert_eq!("6", code.layer_id());
        assert_eq!("huc12='180500020905'", code.where_clause());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(HucCode::parse("1").is_err());
        assert!(HucCode::parse("123").is_err());
        assert!(HucCode::parse("12345678901234").is_err());
        assert!(HucCode::parse("01a1").is_err());
        assert!(HucCode::parse("").is_err());
    }

    #[test]
    fn test_boundary_layer() {
        let code = HucCode::parse("1805").unwrap();
        let layer = boundary_layer(&code, json!({"type": "FeatureCollection", "features": []}));
        let value = serde_json::to_value(&layer).unwrap();

        assert_eq!(json!("HUC 1805"), value["configuration"]["props"]["name"]);
        assert_eq!(json!("VectorLayer"), value["configuration"]["type"]);
        assert_eq!(
            json!("EPSG:4326"),
            value["configuration"]["props"]["source"]["geojson"]["crs"]["properties"]["name"]
        );
    }
}
