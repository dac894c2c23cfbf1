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
use crate::nwps::catalog::{self, NwpsService};
use crate::output::{Layer, MapConfig, ViewConfig, DEFAULT_BASE_MAP};
use crate::source::{to_json, Context, DataSource, ParamError, Params, SourceInfo};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub const INFO: SourceInfo = SourceInfo {
    name: "nwmp_map",
    group: "NWMP",
    label: "NWMP Map",
    visualization_type: "map",
    description: "Provide various map services for National Water Model (NWM) and National Water Prediction Service (NWPS).",
    tags: &["map", "water", "water prediction", "flooding forecast"],
    attribution: Some("NOAA"),
};

const ESRI_SOURCE: &str = "ESRI Image and Map Service";
// Continental US in web mercator
const CENTER: [f64; 2] = [-10686671.116154263, 4721671.572580108];
const ZOOM: f64 = 4.5;

pub fn args(ctx: &Context) -> Map<String, Value> {
    let mut args = Map::new();
    args.insert("service".to_owned(), to_json(&catalog::services_dropdown(&ctx.endpoints)));
    args.insert("basemap".to_owned(), to_json(&catalog::base_maps_dropdown()));
    args
}

/// A single NWM or NWPS map service layer over a base map.
#[derive(Debug)]
pub struct NwpsMap {
    service: &'static NwpsService,
    url: String,
    layer: String,
    base_map: String,
}

impl NwpsMap {
    pub fn from_params(params: &Params<'_>) -> Result<Self, ParamError> {
        let raw = params.required("service")?;
        let (url, url_layer) = split_layer(raw.trim_end_matches('/'));
        let service = service_key(url)
            .and_then(|k| catalog::lookup(&k))
            .ok_or_else(|| ParamError::invalid("service", raw, "unknown NWM or NWPS map service"))?;

        let layer = params
            .optional("service.Layer")
            .or(url_layer)
            .unwrap_or("0")
            .to_owned();

        Ok(NwpsMap {
            service,
            url: url.to_owned(),
            layer,
            base_map: params.optional("basemap").unwrap_or(DEFAULT_BASE_MAP).to_owned(),
        })
    }
}

#[async_trait]
impl DataSource for NwpsMap {
    async fn read(&self) -> Value {
        let layer = Layer::image(self.service.name, ESRI_SOURCE, &self.url, format!("show:{}", self.layer));
        to_json(&MapConfig {
            base_map: self.base_map.clone(),
            layers: vec![layer],
            layer_control: true,
            view_config: Some(ViewConfig {
                center: CENTER,
                zoom: ZOOM,
            }),
        })
    }
}

/// Split a trailing layer ID off of a `.../MapServer/<id>` URL.
fn split_layer(url: &str) -> (&str, Option<&str>) {
    match url.rsplit_once('/') {
        Some((service, id)) if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) => (service, Some(id)),
        _ => (url, None),
    }
}

#[cfg(test)]
mod tests {
    use super::split_layer;

    #[test]
    fn test_split_layer() {
        assert_eq!(
            ("https://example.com/water/riv_gauges/MapServer", Some("3")),
            split_layer("https://example.com/water/riv_gauges/MapServer/3")
        );
        assert_eq!(
            ("https://example.com/water/riv_gauges/MapServer", None),
            split_layer("https://example.com/water/riv_gauges/MapServer")
        );
    }
}
