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

//! Output shapes expected by the dashboard renderer.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Base map used by map sources unless one is picked.
pub const DEFAULT_BASE_MAP: &str =
    "https://server.arcgisonline.com/arcgis/rest/services/Canvas/World_Dark_Gray_Base/MapServer";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

impl DropdownOption {
    pub fn new<L: Into<String>, V: Into<String>>(label: L, value: V) -> Self {
        DropdownOption {
            label: label.into(),
            value: value.into(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DropdownGroup {
    pub label: String,
    pub options: Vec<DropdownOption>,
}

impl DropdownGroup {
    pub fn new<L: Into<String>>(label: L, options: Vec<DropdownOption>) -> Self {
        DropdownGroup {
            label: label.into(),
            options,
        }
    }
}

/// Variable input whose options are picked by the dashboard user.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct VariableInput {
    pub variable_name: String,
    pub initial_value: String,
    pub variable_options_source: Vec<DropdownOption>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct MapConfig {
    #[serde(rename = "baseMap")]
    pub base_map: String,
    pub layers: Vec<Layer>,
    #[serde(rename = "layerControl")]
    pub layer_control: bool,
    #[serde(rename = "viewConfig", skip_serializing_if = "Option::is_none")]
    pub view_config: Option<ViewConfig>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ViewConfig {
    pub center: [f64; 2],
    pub zoom: f64,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Layer {
    pub configuration: LayerConfiguration,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Legend>,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    VectorLayer,
    ImageLayer,
    TileLayer,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LayerConfiguration {
    #[serde(rename = "type")]
    pub kind: LayerKind,
    pub props: LayerProps,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<Value>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LayerProps {
    pub name: String,
    pub source: LayerSource,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LayerSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub props: SourceProps,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geojson: Option<Value>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq)]
pub struct SourceProps {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributions: Option<String>,
}

impl Layer {
    /// Vector layer rendering an inline GeoJSON document.
    pub fn geojson<N: Into<String>>(name: N, geojson: Value, style: Value, legend: Option<Legend>) -> Self {
        Layer {
            configuration: LayerConfiguration {
                kind: LayerKind::VectorLayer,
                props: LayerProps {
                    name: name.into(),
                    source: LayerSource {
                        kind: "GeoJSON".to_owned(),
                        props: SourceProps::default(),
                        geojson: Some(geojson),
                    },
                },
                style: Some(style),
            },
            legend,
        }
    }

    /// Image layer backed by a WMS or ArcGIS map service, showing a single layer.
    pub fn image<N, K, U, L>(name: N, source_kind: K, url: U, layers: L) -> Self
    where
        N: Into<String>,
        K: Into<String>,
        U: Into<String>,
        L: Into<String>,
    {
        let mut params = Map::new();
        params.insert("LAYERS".to_owned(), Value::String(layers.into()));

        Layer {
            configuration: LayerConfiguration {
                kind: LayerKind::ImageLayer,
                props: LayerProps {
                    name: name.into(),
                    source: LayerSource {
                        kind: source_kind.into(),
                        props: SourceProps {
                            url: Some(url.into()),
                            params: Some(params),
                            attributions: None,
                        },
                        geojson: None,
                    },
                },
                style: None,
            },
            legend: None,
        }
    }

    /// Tile layer for a cached ArcGIS tile service.
    pub fn tile<N: Into<String>>(name: N, service_url: &str) -> Self {
        Layer {
            configuration: LayerConfiguration {
                kind: LayerKind::TileLayer,
                props: LayerProps {
                    name: name.into(),
                    source: LayerSource {
                        kind: "Image Tile".to_owned(),
                        props: SourceProps {
                            url: Some(format!("{}/tile/{{z}}/{{y}}/{{x}}", service_url)),
                            params: None,
                            attributions: Some(format!("Tiles © <a href=\"{}\">ArcGIS</a>", service_url)),
                        },
                        geojson: None,
                    },
                },
                style: None,
            },
            legend: None,
        }
    }
}

/// Mark a GeoJSON document as using WGS 84 coordinates.
pub fn set_wgs84_crs(geojson: &mut Value) {
    if let Value::Object(m) = geojson {
        m.insert(
            "crs".to_owned(),
            json!({"type": "name", "properties": {"name": "EPSG:4326"}}),
        );
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Legend {
    pub title: String,
    pub items: Vec<LegendItem>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LegendItem {
    pub label: String,
    pub color: String,
    pub symbol: String,
}

impl LegendItem {
    pub fn square<L: Into<String>, C: Into<String>>(label: L, color: C) -> Self {
        LegendItem {
            label: label.into(),
            color: color.into(),
            symbol: "square".to_owned(),
        }
    }
}

/// Plotly figure, traces and layout are passed through to plotly.js as-is.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct Figure {
    pub data: Vec<Value>,
    pub layout: Value,
}

/// Remotely loaded front-end component and the props to render it with.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CustomComponent {
    pub url: String,
    pub scope: String,
    pub module: String,
    pub props: Value,
}
