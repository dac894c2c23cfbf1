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
use crate::nwps::catalog;
use crate::output::{DropdownOption, VariableInput};
use crate::source::{text_args, to_json, DataSource, ParamError, Params, SourceInfo};
use async_trait::async_trait;
use serde_json::{Map, Value};

pub const INFO: SourceInfo = SourceInfo {
    name: "nwmp_map_layer_finder",
    group: "NWMP",
    label: "NWMP Map Layer Finder",
    visualization_type: "variable_input",
    description: "Provides all available layers for the selected NWMP Map service",
    tags: &["map layers", "water", "water prediction", "flooding forecast"],
    attribution: None,
};

pub fn args() -> Map<String, Value> {
    text_args(&["service"])
}

#[derive(Debug)]
pub struct LayerFinder {
    service: String,
}

impl LayerFinder {
    pub fn from_params(params: &Params<'_>) -> Result<Self, ParamError> {
        Ok(LayerFinder {
            service: params.required("service")?.to_owned(),
        })
    }

    fn options(&self) -> Vec<DropdownOption> {
        match service_key(&self.service).and_then(|k| catalog::lookup(&k)) {
            Some(service) => catalog::layer_options(service),
            None => {
                tracing::warn!(message = "no NWM or NWPS map service for layer finder", url = %self.service);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl DataSource for LayerFinder {
    async fn read(&self) -> Value {
        to_json(&VariableInput {
            variable_name: "Layer Name".to_owned(),
            initial_value: "0".to_owned(),
            variable_options_source: self.options(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::LayerFinder;
    use crate::output::DropdownOption;

    #[test]
    fn test_options_known_service() {
        let finder = LayerFinder {
            service: "https://maps.water.noaa.gov/server/rest/services/nwm/srf_12hr_max_high_water_probability/MapServer/".to_owned(),
        };

        assert_eq!(
            vec![
                DropdownOption::new("12 Hours - High Water Probability (0)", "0"),
                DropdownOption::new("12 Hours - Hotspots - Average High Water Probability (1)", "1"),
            ],
            finder.options()
        );
    }

    #[test]
    fn test_options_unknown_service() {
        let finder = LayerFinder {
            service: "https://example.com/services/other/MapServer".to_owned(),
        };
        assert!(finder.options().is_empty());
    }
}
