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

use crate::arcgis::service_key;
use crate::drought::api::DroughtMonitorClient;
use crate::drought::catalog::{self, DroughtService, ServiceKind};
use crate::drought::options;
use crate::output::{set_wgs84_crs, Layer, Legend, LegendItem, MapConfig, DEFAULT_BASE_MAP};
use crate::source::{to_json, Context, DataSource, ParamError, Params, SourceInfo};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};

pub const INFO: SourceInfo = SourceInfo {
    name: "drought_map",
    group: "Drought_Monitor",
    label: "Drought Map",
    visualization_type: "map",
    description: "Provide various map services for the temperature, precipitation and drought.",
    tags: &["map", "drought", "temperature", "precipitation"],
    attribution: Some("NOAA, USGS, NDMC, USDA"),
};

pub const PRECONFIGURED_INFO: SourceInfo = SourceInfo {
    name: "drought_map_preconfigured",
    group: "Drought_Monitor",
    label: "Drought Map Preconfigured",
    visualization_type: "map",
    description: "U.S. Drought Monitor map for a single release date.",
    tags: &["map", "drought"],
    attribution: Some("NDMC, USDA, NOAA"),
};

const USDM_LAYER_NAME: &str = "USDM Archive";

/// Drought categories D0 to D4 with their legend labels and colors.
pub const CATEGORIES: &[(&str, &str, &str)] = &[
    ("D0", "Abnormally Dry", "#ffff00"),
    ("D1", "Moderate Drought", "#fcd37f"),
    ("D2", "Severe Drought", "#ffaa00"),
    ("D3", "Extreme Drought", "#e60000"),
    ("D4", "Exceptional Drought", "#730000"),
];

pub async fn args(ctx: &Context, today: NaiveDate, with_service: bool) -> Map<String, Value> {
    let dates = options::drought_dates(&ctx.drought(), &ctx.cache, today).await;
    let mut args = Map::new();
    args.insert("date".to_owned(), to_json(&dates));
    if with_service {
        args.insert("service".to_owned(), to_json(&catalog::services_dropdown()));
    }

    args
}

/// Map service shown on top of the drought monitor layer.
#[derive(Debug, Clone)]
struct Overlay {
    service: &'static DroughtService,
    url: String,
    layer: String,
}

impl Overlay {
    fn from_params(params: &Params<'_>) -> Result<Self, ParamError> {
        let raw = params.required("service")?;
        let url = raw.trim_end_matches('/').to_owned();
        let service = service_key(&url)
            .and_then(|k| catalog::lookup(&k))
            .ok_or_else(|| ParamError::invalid("service", raw, "unknown drought map service"))?;

        let layer = match params.optional("service.Layer") {
            Some(l) => l.to_owned(),
            None => service.layers.first().map(|l| l.id).unwrap_or("0").to_owned(),
        };

        Ok(Overlay { service, url, layer })
    }

    fn layer(&self) -> Layer {
        match self.service.kind {
            ServiceKind::Wms => Layer::image(self.service.name, ServiceKind::Wms.as_str(), &self.url, &self.layer),
            ServiceKind::EsriMapService => Layer::image(
                self.service.name,
                ServiceKind::EsriMapService.as_str(),
                &self.url,
                format!("show:{}", self.layer),
            ),
            ServiceKind::ImageTile => Layer::tile(self.service.name, &self.url),
        }
    }
}

/// U.S. Drought Monitor map for a release date, optionally with another map service
/// layered on top of it.
#[derive(Debug)]
pub struct DroughtMap {
    client: DroughtMonitorClient,
    date: String,
    overlay: Option<Overlay>,
}

impl DroughtMap {
    pub fn from_params(ctx: &Context, params: &Params<'_>) -> Result<Self, ParamError> {
        Ok(DroughtMap {
            client: ctx.drought(),
            date: release_date(params)?,
            overlay: Some(Overlay::from_params(params)?),
        })
    }

    pub fn preconfigured(ctx: &Context, params: &Params<'_>) -> Result<Self, ParamError> {
        Ok(DroughtMap {
            client: ctx.drought(),
            date: release_date(params)?,
            overlay: None,
        })
    }

    async fn usdm_layer(&self) -> Option<Layer> {
        match self.client.usdm_geojson(&self.date).await {
            Ok(geojson) => Some(usdm_layer(geojson)),
            Err(e) => {
                tracing::error!(message = "unable to fetch drought monitor layer", date = %self.date, error = %e);
                None
            }
        }
    }
}

#[async_trait]
impl DataSource for DroughtMap {
    async fn read(&self) -> Value {
        let mut layers = Vec::new();
        if let Some(layer) = self.usdm_layer().await {
            layers.push(layer);
        }

        if let Some(overlay) = &self.overlay {
            layers.push(overlay.layer());
        }

        to_json(&MapConfig {
            base_map: DEFAULT_BASE_MAP.to_owned(),
            layers,
            layer_control: true,
            view_config: None,
        })
    }
}

// Release dates are YYYYMMDD and become part of the GeoJSON file name
fn release_date(params: &Params<'_>) -> Result<String, ParamError> {
    let date = params.required("date")?;
    if date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit()) {
        Ok(date.to_owned())
    } else {
        Err(ParamError::invalid("date", date, "expected YYYYMMDD"))
    }
}

fn usdm_layer(mut geojson: Value) -> Layer {
    set_wgs84_crs(&mut geojson);
    Layer::geojson(USDM_LAYER_NAME, geojson, usdm_style(), Some(usdm_legend()))
}

/// Style rules coloring drought polygons by their `DM` category.
fn usdm_style() -> Value {
    let rules: Vec<Value> = CATEGORIES
        .iter()
        .enumerate()
        .map(|(i, (_, _, color))| {
            json!({
                "filter": ["==", ["get", "DM"], i],
                "style": {
                    "fill-color": color,
                    "stroke-color": color,
                    "stroke-width": 0.5,
                }
            })
        })
        .collect();

    Value::Array(rules)
}

fn usdm_legend() -> Legend {
    let mut items: Vec<LegendItem> = CATEGORIES
        .iter()
        .map(|(_, label, color)| LegendItem::square(*label, *color))
        .collect();

    items.push(LegendItem::square("No Data", "#808080"));
    items.push(LegendItem::square("None", "#ffffff"));

    Legend {
        title: USDM_LAYER_NAME.to_owned(),
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::{usdm_layer, usdm_legend, usdm_style, Overlay};
    use crate::source::Params;
    use serde_json::json;
    use std::collections::HashMap;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_usdm_layer_adds_crs() {
        let layer = usdm_layer(json!({"type": "FeatureCollection", "features": []}));
        let value = serde_json::to_value(&layer).unwrap();
        let geojson = &value["configuration"]["props"]["source"]["geojson"];

        assert_eq!(json!("EPSG:4326"), geojson["crs"]["properties"]["name"]);
        assert_eq!(json!("VectorLayer"), value["configuration"]["type"]);
        assert_eq!(json!("USDM Archive"), value["legend"]["title"]);
    }

    #[test]
    fn test_usdm_legend_order() {
        let legend = usdm_legend();
        let labels: Vec<&str> = legend.items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(
            vec![
                "Abnormally Dry",
                "Moderate Drought",
                "Severe Drought",
                "Extreme Drought",
                "Exceptional Drought",
                "No Data",
                "None"
            ],
            labels
        );
    }

    #[test]
    fn test_usdm_style_rule() {
        let style = usdm_style();
        assert_eq!(5, style.as_array().unwrap().len());
        assert_eq!(json!(["==", ["get", "DM"], 3]), style[3]["filter"]);
        assert_eq!(json!("#e60000"), style[3]["style"]["fill-color"]);
    }

    #[test]
    fn test_overlay_wms() {
        let values = params(&[
            ("service", "https://edcintl.cr.usgs.gov/geoserver/quickdri_drought/wms/"),
            ("service.Layer", "usdm_current"),
        ]);
        let overlay = Overlay::from_params(&Params::new(&values)).unwrap();
        let value = serde_json::to_value(overlay.layer()).unwrap();

        assert_eq!(json!("ImageLayer"), value["configuration"]["type"]);
        assert_eq!(json!("WMS"), value["configuration"]["props"]["source"]["type"]);
        assert_eq!(
            json!({"url": "https://edcintl.cr.usgs.gov/geoserver/quickdri_drought/wms", "params": {"LAYERS": "usdm_current"}}),
            value["configuration"]["props"]["source"]["props"]
        );
    }

    #[test]
    fn test_overlay_esri() {
        let values = params(&[
            (
                "service",
                "https://idpgis.ncep.noaa.gov/arcgis/rest/services/NWS_Climate_Outlooks/cpc_drought_outlk/MapServer",
            ),
            ("service.Layer", "1"),
        ]);
        let overlay = Overlay::from_params(&Params::new(&values)).unwrap();
        let value = serde_json::to_value(overlay.layer()).unwrap();

        assert_eq!(json!("CPC Drought Outlook"), value["configuration"]["props"]["name"]);
        assert_eq!(json!("show:1"), value["configuration"]["props"]["source"]["props"]["params"]["LAYERS"]);
    }

    #[test]
    fn test_overlay_tile_default_layer() {
        let values = params(&[(
            "service",
            "https://server.arcgisonline.com/arcgis/rest/services/Elevation/World_Hillshade/MapServer",
        )]);
        let overlay = Overlay::from_params(&Params::new(&values)).unwrap();
        let value = serde_json::to_value(overlay.layer()).unwrap();

        assert_eq!("0", overlay.layer);
        assert_eq!(json!("TileLayer"), value["configuration"]["type"]);
        assert_eq!(
            json!("https://server.arcgisonline.com/arcgis/rest/services/Elevation/World_Hillshade/MapServer/tile/{z}/{y}/{x}"),
            value["configuration"]["props"]["source"]["props"]["url"]
        );
    }

    #[test]
    fn test_overlay_unknown_service() {
        let values = params(&[("service", "https://example.com/services/unknown/MapServer")]);
        assert!(Overlay::from_params(&Params::new(&values)).is_err());
    }
}
