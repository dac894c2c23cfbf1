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

//! Counts of NWM and NWPS map features within an area, by the category they're drawn as.

use crate::arcgis::{service_key, ArcGisClient, Renderer};
use crate::geometry::{EsriGeometry, GeoJsonGeometry};
use crate::huc::{self, HucCode};
use crate::nwps::catalog::{self, NwpsLayer, NwpsService, RendererKind};
use crate::output::DropdownGroup;
use crate::source::{to_json, Context, DataSource, ParamError, Params, SourceInfo};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::{json, Map, Value};

pub const INFO: SourceInfo = SourceInfo {
    name: "nwmp_data_service",
    group: "NWMP",
    label: "NWMP Data Service",
    visualization_type: "table",
    description: "Provides a summary of NWM and NWPS features inside an area and their current category",
    tags: &["national", "water", "model", "nwm", "gauge", "flood"],
    attribution: Some("NOAA, USGS"),
};

pub fn args(ctx: &Context) -> Map<String, Value> {
    let mut args = Map::new();
    args.insert("service".to_owned(), to_json(&catalog::services_dropdown(&ctx.endpoints)));
    args.insert(
        "layer_id".to_owned(),
        to_json(&vec![DropdownGroup::new("Layers", catalog::service_layers())]),
    );
    args.insert("geom".to_owned(), Value::String("text".to_owned()));
    args.insert("huc".to_owned(), Value::String("text".to_owned()));
    args
}

/// Area to count features in.
#[derive(Debug, Clone)]
enum Area {
    Geometry(EsriGeometry),
    Huc(HucCode),
}

#[derive(Debug)]
pub struct ServiceStats {
    client: ArcGisClient,
    wbd: Url,
    service_url: Url,
    layer: &'static NwpsLayer,
    area: Area,
}

impl ServiceStats {
    pub fn from_params(ctx: &Context, params: &Params<'_>) -> Result<Self, ParamError> {
        let service = lookup_service(params.required("service")?)?;

        let raw_layer = params.required("layer_id")?;
        let layer = raw_layer
            .parse::<u32>()
            .ok()
            .and_then(|id| service.layer(id))
            .ok_or_else(|| ParamError::invalid("layer_id", raw_layer, "no such layer for service"))?;

        let area = match (params.optional("geom"), params.optional("huc")) {
            (Some(raw), _) => {
                let geom = GeoJsonGeometry::parse(raw)
                    .and_then(|g| EsriGeometry::try_from(&g))
                    .map_err(|e| ParamError::invalid("geom", raw, e.to_string()))?;
                Area::Geometry(geom)
            }
            (None, Some(raw)) => Area::Huc(HucCode::parse(raw)?),
            (None, None) => return Err(ParamError::Missing("geom")),
        };

        Ok(ServiceStats {
            client: ctx.arcgis(),
            wbd: ctx.endpoints.wbd.clone(),
            service_url: service.url(&ctx.endpoints),
            layer,
            area,
        })
    }

    async fn geometry(&self) -> Option<EsriGeometry> {
        match &self.area {
            Area::Geometry(g) => Some(g.clone()),
            Area::Huc(code) => match huc::boundary_esri(&self.client, &self.wbd, code).await {
                Ok(Some(g)) => Some(g),
                Ok(None) => {
                    tracing::warn!(message = "no boundary for HUC", huc = %code);
                    None
                }
                Err(e) => {
                    tracing::error!(message = "unable to fetch HUC boundary", huc = %code, error = %e);
                    None
                }
            },
        }
    }

    async fn counts(&self) -> Map<String, Value> {
        let geometry = match self.geometry().await {
            Some(g) => g,
            None => return Map::new(),
        };

        let layer_id = self.layer.id.to_string();
        let values = match self
            .client
            .query_attribute(&self.service_url, &layer_id, &geometry, self.layer.filter_attr)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(message = "unable to query features", url = %self.service_url, layer = %layer_id, error = %e);
                return Map::new();
            }
        };

        let renderer = self
            .client
            .renderer(&self.service_url, &layer_id)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!(message = "unable to fetch layer renderer, using raw values", url = %self.service_url, layer = %layer_id, error = %e);
                None
            });

        count_values(&values, renderer.as_ref(), self.layer.renderer)
    }
}

#[async_trait]
impl DataSource for ServiceStats {
    async fn read(&self) -> Value {
        json!({ "data": self.counts().await })
    }
}

/// Service by catalog key or by URL.
fn lookup_service(raw: &str) -> Result<&'static NwpsService, ParamError> {
    catalog::lookup(raw)
        .or_else(|| service_key(raw).and_then(|k| catalog::lookup(&k)))
        .ok_or_else(|| ParamError::invalid("service", raw, "unknown NWM or NWPS map service"))
}

/// Values covered by a renderer category.
enum Category<'a> {
    Unique(&'a Value),
    Break { max: f64 },
}

/// Count values by the renderer category they fall in.
///
/// Every category of the renderer is included, in renderer order, even when nothing
/// falls in it. Values that don't belong to any category are counted under the value
/// itself. Without a renderer values are counted as-is, most common first.
fn count_values(values: &[Value], renderer: Option<&Renderer>, kind: RendererKind) -> Map<String, Value> {
    let categories: Vec<(String, Category<'_>)> = match (renderer, kind) {
        (Some(r), RendererKind::UniqueValue) => r
            .unique_values
            .iter()
            .map(|u| (label_or(&u.label, scalar(&u.value)), Category::Unique(&u.value)))
            .collect(),
        (Some(r), RendererKind::ClassBreaks) => r
            .class_breaks
            .iter()
            .map(|b| {
                (
                    label_or(&b.label, b.class_max_value.to_string()),
                    Category::Break { max: b.class_max_value },
                )
            })
            .collect(),
        (None, _) => Vec::new(),
    };

    if categories.is_empty() {
        return raw_counts(values);
    }

    let mut counts: Vec<(String, u64)> = Vec::new();
    for (name, _) in &categories {
        if !counts.iter().any(|(n, _)| n == name) {
            counts.push((name.clone(), 0));
        }
    }

    for v in values.iter().filter(|v| !v.is_null()) {
        let name = categories
            .iter()
            .find(|(_, c)| in_category(c, v))
            .map(|(n, _)| n.clone())
            .unwrap_or_else(|| scalar(v));

        increment(&mut counts, name);
    }

    counts.into_iter().map(|(k, c)| (k, Value::from(c))).collect()
}

fn raw_counts(values: &[Value]) -> Map<String, Value> {
    let mut counts: Vec<(String, u64)> = Vec::new();
    for v in values.iter().filter(|v| !v.is_null()) {
        increment(&mut counts, scalar(v));
    }

    // Stable, ties stay in the order they were first seen
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.into_iter().map(|(k, c)| (k, Value::from(c))).collect()
}

fn increment(counts: &mut Vec<(String, u64)>, name: String) {
    match counts.iter_mut().find(|(n, _)| *n == name) {
        Some((_, c)) => *c += 1,
        None => counts.push((name, 1)),
    }
}

fn in_category(category: &Category<'_>, v: &Value) -> bool {
    match category {
        Category::Unique(expected) => {
            scalar(expected) == scalar(v)
                || matches!((number(expected), number(v)), (Some(a), Some(b)) if a == b)
        }
        Category::Break { max } => number(v).map(|n| n <= *max).unwrap_or(false),
    }
}

fn label_or(label: &str, fallback: String) -> String {
    if label.is_empty() {
        fallback
    } else {
        label.to_owned()
    }
}

fn scalar(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        v => v.to_string(),
    }
}

fn number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{count_values, lookup_service};
    use crate::arcgis::Renderer;
    use crate::nwps::catalog::RendererKind;
    use serde_json::{json, Value};

    fn renderer(value: Value) -> Renderer {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_unique_values_include_empty_categories() {
        let r = renderer(json!({
            "uniqueValueInfos": [
                {"value": "action", "label": "Action"},
                {"value": "minor", "label": "Minor"},
                {"value": "major", "label": ""}
            ]
        }));
        let values = vec![json!("minor"), json!("action"), json!("minor"), json!("no_flooding"), Value::Null];

        let counts = count_values(&values, Some(&r), RendererKind::UniqueValue);
        assert_eq!(
            json!({"Action": 1, "Minor": 2, "major": 0, "no_flooding": 1}),
            Value::Object(counts)
        );
    }

    #[test]
    fn test_unique_values_numeric_match() {
        let r = renderer(json!({"uniqueValueInfos": [{"value": "2", "label": "50%"}]}));
        let counts = count_values(&[json!(2), json!(2.0)], Some(&r), RendererKind::UniqueValue);
        assert_eq!(json!({"50%": 2}), Value::Object(counts));
    }

    #[test]
    fn test_class_breaks() {
        let r = renderer(json!({
            "minValue": 0,
            "classBreakInfos": [
                {"classMaxValue": 25, "label": "0 - 25%"},
                {"classMaxValue": 50, "label": "25 - 50%"},
                {"classMaxValue": 100, "label": "50 - 100%"}
            ]
        }));
        let values = vec![json!(10), json!(25), json!(26.5), json!(150), json!("bad")];

        let counts = count_values(&values, Some(&r), RendererKind::ClassBreaks);
        assert_eq!(
            json!({"0 - 25%": 2, "25 - 50%": 1, "50 - 100%": 0, "150": 1, "bad": 1}),
            Value::Object(counts)
        );
    }

    #[test]
    fn test_no_renderer_sorted_by_count() {
        let values = vec![json!("a"), json!("b"), json!("b"), json!("c"), json!("b"), json!("c")];
        let counts = count_values(&values, None, RendererKind::UniqueValue);
        let keys: Vec<&String> = counts.keys().collect();

        assert_eq!(vec!["b", "c", "a"], keys);
        assert_eq!(json!(3), counts["b"]);
    }

    #[test]
    fn test_renderer_of_other_kind_uses_raw_counts() {
        let r = renderer(json!({"uniqueValueInfos": [{"value": 1, "label": "One"}]}));
        let counts = count_values(&[json!(1)], Some(&r), RendererKind::ClassBreaks);
        assert_eq!(json!({"1": 1}), Value::Object(counts));
    }

    #[test]
    fn test_lookup_service() {
        assert_eq!("riv_gauges", lookup_service("riv_gauges").unwrap().key);
        assert_eq!(
            "srf_12hr_max_high_water_probability",
            lookup_service("https://maps.water.noaa.gov/server/rest/services/nwm/srf_12hr_max_high_water_probability/MapServer/1")
                .unwrap()
                .key
        );
        assert!(lookup_service("nope").is_err());
    }
}
