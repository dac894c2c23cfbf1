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

use crate::arcgis::{service_key, ArcGisClient};
use crate::drought::catalog::{self, DroughtService, ServiceKind};
use crate::output::{DropdownOption, VariableInput};
use crate::source::{text_args, to_json, Context, DataSource, ParamError, Params, SourceInfo};
use async_trait::async_trait;
use reqwest::Url;
use serde_json::{Map, Value};

pub const INFO: SourceInfo = SourceInfo {
    name: "drought_map_layer_finder",
    group: "Drought_Monitor",
    label: "Drought Map Layer Finder",
    visualization_type: "variable_input",
    description: "Lists the layers of a drought map service so one can be picked.",
    tags: &["map", "drought", "layers"],
    attribution: None,
};

pub fn args() -> Map<String, Value> {
    text_args(&["service"])
}

/// Layer picker for a drought map service.
#[derive(Debug)]
pub struct LayerFinder {
    client: ArcGisClient,
    service: Option<&'static DroughtService>,
    url: String,
}

impl LayerFinder {
    pub fn from_params(ctx: &Context, params: &Params<'_>) -> Result<Self, ParamError> {
        let url = params.required("service")?.trim_end_matches('/').to_owned();
        let service = service_key(&url).and_then(|k| catalog::lookup(&k));

        Ok(LayerFinder {
            client: ctx.arcgis(),
            service,
            url,
        })
    }

    async fn options(&self) -> Vec<DropdownOption> {
        let service = match self.service {
            Some(s) => s,
            None => {
                tracing::warn!(message = "no drought map service for layer finder", url = %self.url);
                return Vec::new();
            }
        };

        if service.kind == ServiceKind::EsriMapService {
            if let Some(live) = self.live_layers().await {
                return live;
            }
        }

        catalog_layers(service)
    }

    async fn live_layers(&self) -> Option<Vec<DropdownOption>> {
        let url = match Url::parse(&self.url) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(message = "invalid map service URL", url = %self.url, error = %e);
                return None;
            }
        };

        match self.client.layers(&url).await {
            Ok(layers) => Some(
                layers
                    .into_iter()
                    .map(|l| DropdownOption::new(l.name, l.id.to_string()))
                    .collect(),
            ),
            Err(e) => {
                tracing::warn!(message = "unable to fetch map service layers, using catalog", url = %url, error = %e);
                None
            }
        }
    }
}

fn catalog_layers(service: &DroughtService) -> Vec<DropdownOption> {
    service
        .layers
        .iter()
        .map(|l| DropdownOption::new(l.name, l.id))
        .collect()
}

#[async_trait]
impl DataSource for LayerFinder {
    async fn read(&self) -> Value {
        to_json(&VariableInput {
            variable_name: "Layer Name".to_owned(),
            initial_value: "0".to_owned(),
            variable_options_source: self.options().await,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::catalog_layers;
    use crate::drought::catalog;
    use crate::output::DropdownOption;

    #[test]
    fn test_catalog_layers() {
        let service = catalog::lookup("quickdri_drought").unwrap();
        let options = catalog_layers(service);
        assert!(!options.is_empty());
        assert_eq!(DropdownOption::new(service.layers[0].name, service.layers[0].id), options[0]);
    }
}
