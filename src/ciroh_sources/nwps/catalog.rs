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

//! National Water Model and NWPS map services.

use crate::client::{endpoint, Endpoints};
use crate::output::{DropdownGroup, DropdownOption};
use reqwest::Url;

/// Which ArcGIS server hosts a service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    NwpsMaps,
    NwmMaps,
}

/// How a layer's renderer assigns colors to features.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RendererKind {
    /// `uniqueValueInfos`, matched on `value`
    UniqueValue,
    /// `classBreakInfos`, matched on `classMaxValue`
    ClassBreaks,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NwpsLayer {
    pub id: u32,
    pub name: &'static str,
    /// Feature attribute the layer is colored by.
    pub filter_attr: &'static str,
    pub renderer: RendererKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NwpsService {
    pub key: &'static str,
    pub name: &'static str,
    pub host: Host,
    pub layers: &'static [NwpsLayer],
}

impl NwpsService {
    pub fn url(&self, endpoints: &Endpoints) -> Url {
        let base = match self.host {
            Host::NwpsMaps => &endpoints.nwps_maps,
            Host::NwmMaps => &endpoints.nwm_maps,
        };

        endpoint(base, &[self.key, "MapServer"])
    }

    pub fn layer(&self, id: u32) -> Option<&'static NwpsLayer> {
        self.layers.iter().find(|l| l.id == id)
    }
}

const fn unique(id: u32, name: &'static str, filter_attr: &'static str) -> NwpsLayer {
    NwpsLayer {
        id,
        name,
        filter_attr,
        renderer: RendererKind::UniqueValue,
    }
}

const fn breaks(id: u32, name: &'static str, filter_attr: &'static str) -> NwpsLayer {
    NwpsLayer {
        id,
        name,
        filter_attr,
        renderer: RendererKind::ClassBreaks,
    }
}

pub const SERVICES: &[NwpsService] = &[
    NwpsService {
        key: "riv_gauges",
        name: "National Water Prediction Service (NWPS) River Gauge System",
        host: Host::NwpsMaps,
        layers: &[
            unique(0, "Observed River Stages (0)", "status"),
            unique(1, "River Stages 24 hour Forecast (1)", "status"),
            unique(2, "River Stages 48 hour Forecast (2)", "status"),
            unique(3, "River Stages 72 hour Forecast (3)", "status"),
            unique(4, "River Stages 96 hour Forecast (4)", "status"),
            unique(5, "River Stages 120 hour Forecast (5)", "status"),
            unique(6, "River Stages 144 hour Forecast (6)", "status"),
            unique(7, "River Stages 168 hour Forecast (7)", "status"),
            unique(9, "River Stages 216 hour Forecast (9)", "status"),
            unique(10, "River Stages 240 hour Forecast (10)", "status"),
            unique(11, "River Stages 264 hour Forecast (11)", "status"),
            unique(12, "River Stages 288 hour Forecast (12)", "status"),
            unique(13, "River Stages 312 hour Forecast (13)", "status"),
            unique(14, "River Stages 336 hour Forecast (14)", "status"),
            unique(15, "Full Forecast Period Stages (15)", "status"),
        ],
    },
    NwpsService {
        key: "ana_high_flow_magnitude",
        name: "National Water Model (NWM) High Flow Magnitude Analysis",
        host: Host::NwmMaps,
        layers: &[unique(0, "Est. Annual Exceedance Probability (0)", "recur_cat")],
    },
    NwpsService {
        key: "ana_past_14day_max_high_flow_magnitude",
        name: "National Water Model (NWM) Past 14-Day Max High Flow Magnitude Analysis",
        host: Host::NwmMaps,
        layers: &[
            unique(0, "Past 7 Days - Est. Annual Exceedance Probability (0)", "recur_cat_7day"),
            unique(1, "Past 14 Days - Est. Annual Exceedance Probability (1)", "recur_cat_14day"),
        ],
    },
    NwpsService {
        key: "srf_18hr_high_water_arrival_time",
        name: "National Water Model (NWM) 18 / 48-Hour High Water Arrival Time Forecast",
        host: Host::NwmMaps,
        layers: &[
            breaks(0, "18 Hours - High Water Arrival Time (0)", "high_water_arrival_hour"),
            unique(1, "18 Hours - High Water End Time (1)", "below_bank_return_hour"),
        ],
    },
    NwpsService {
        key: "srf_18hr_rapid_onset_flooding",
        name: "National Water Model (NWM) 18-Hour Rapid Onset Flooding Forecast",
        host: Host::NwmMaps,
        layers: &[
            unique(0, "18 Hours - Rapid Onset Flood Arrival Time (0)", "flood_start_hour"),
            unique(1, "18 Hours - Rapid Onset Flood Duration (1)", "flood_length"),
            breaks(
                2,
                "18 Hours - NWM Waterway Length Flooded (2)",
                "nwm_waterway_length_flooded_percent",
            ),
        ],
    },
    NwpsService {
        key: "srf_12hr_rapid_onset_flooding_probability",
        name: "National Water Model (NWM) 12-Hour Rapid Onset Flooding Probability Forecast",
        host: Host::NwmMaps,
        layers: &[
            breaks(0, "Hours 1-6 - Rapid Onset Flooding Probability (0)", "rapid_onset_prob_1_6"),
            breaks(1, "Hours 7-12 - Rapid Onset Flooding Probability (1)", "rapid_onset_prob_7_12"),
            breaks(2, "Hours 1-12 - Rapid Onset Flooding Probability (2)", "rapid_onset_prob_all"),
            breaks(
                3,
                "Hours 1-12 - Hotspots - Average Rapid Onset Flooding Probability (3)",
                "weighted_mean",
            ),
        ],
    },
    NwpsService {
        key: "srf_12hr_max_high_water_probability",
        name: "National Water Model (NWM) 12-Hour Max High Water Probability Forecast",
        host: Host::NwmMaps,
        layers: &[
            breaks(0, "12 Hours - High Water Probability (0)", "srf_prob"),
            breaks(1, "12 Hours - Hotspots - Average High Water Probability (1)", "avg_prob"),
        ],
    },
    NwpsService {
        key: "srf_18hr_max_high_flow_magnitude",
        name: "National Water Model (NWM) 18 / 48-Hour Max High Flow Magnitude Forecast",
        host: Host::NwmMaps,
        layers: &[unique(0, "18 Hours - Est. Annual Exceedance Probability (0)", "recur_cat")],
    },
    NwpsService {
        key: "mrf_gfs_10day_high_water_arrival_time",
        name: "National Water Model (NWM) GFS 10-Day High Water Arrival Time Forecast",
        host: Host::NwmMaps,
        layers: &[
            breaks(0, "3 Days - High Water Arrival Time (0)", "high_water_arrival_hour"),
            breaks(1, "10 Days - High Water Arrival Time (1)", "high_water_arrival_hour"),
            unique(2, "10 Days - High Water End Time (2)", "below_bank_return_hour"),
        ],
    },
    NwpsService {
        key: "mrf_gfs_5day_max_high_water_probability",
        name: "National Water Model (NWM) GFS 5-Day High Water Probability Forecast",
        host: Host::NwmMaps,
        layers: &[
            breaks(0, "Day 1 - High Water Probability (0)", "hours_3_to_24"),
            breaks(1, "Day 2 - High Water Probability (1)", "hours_27_to_48"),
            breaks(2, "Day 3 - High Water Probability (2)", "hours_51_to_72"),
            breaks(3, "Days 4-5 - High Water Probability (3)", "hours_75_to_120"),
            breaks(4, "Days 1-5 - High Water Probability (4)", "hours_3_to_120"),
            breaks(5, "Days 1-5 - Hotspots - Average High Water Probability (5)", "avg_prob"),
        ],
    },
    NwpsService {
        key: "mrf_gfs_10day_max_high_flow_magnitude",
        name: "National Water Model (NWM) GFS 10-Day Max High Flow Magnitude Forecast",
        host: Host::NwmMaps,
        layers: &[
            unique(0, "3 Days - Est. Annual Exceedance Probability (0)", "recur_cat_3day"),
            unique(1, "5 Days - Est. Annual Exceedance Probability (1)", "recur_cat_5day"),
            unique(2, "10 Days - Est. Annual Exceedance Probability (2)", "recur_cat_10day"),
        ],
    },
    NwpsService {
        key: "mrf_gfs_10day_rapid_onset_flooding",
        name: "National Water Model (NWM) GFS 10-Day Rapid Onset Flooding Forecast",
        host: Host::NwmMaps,
        layers: &[
            breaks(0, "10 Day - Rapid Onset Flood Arrival Time (0)", "flood_start_hour"),
            breaks(1, "10 Day - Rapid Onset Flood Duration (1)", "flood_length"),
        ],
    },
    NwpsService {
        key: "mrf_gfs_5day_rapid_onset_flooding_probability",
        name: "National Water Model (NWM) GFS 5-Day Rapid Onset Flooding Probability Forecast",
        host: Host::NwmMaps,
        layers: &[
            breaks(0, "Day 1 - Rapid Onset Flooding Probability (0)", "rapid_onset_prob_day1"),
            breaks(1, "Day 2 - Rapid Onset Flooding Probability (1)", "rapid_onset_prob_day2"),
            breaks(2, "Day 3 - Rapid Onset Flooding Probability (2)", "rapid_onset_prob_day3"),
            breaks(3, "Days 4-5 - Rapid Onset Flooding Probability (3)", "rapid_onset_prob_day4_5"),
            breaks(4, "Days 1-5 - Rapid Onset Flooding Probability (4)", "rapid_onset_prob_all"),
        ],
    },
];

const BASE_MAPS: &[(&str, &str)] = &[
    (
        "World Light Gray Base",
        "https://server.arcgisonline.com/arcgis/rest/services/Canvas/World_Light_Gray_Base/MapServer",
    ),
    (
        "World Dark Gray Base",
        "https://server.arcgisonline.com/arcgis/rest/services/Canvas/World_Dark_Gray_Base/MapServer",
    ),
    (
        "World Topo Map",
        "https://server.arcgisonline.com/arcgis/rest/services/World_Topo_Map/MapServer",
    ),
    (
        "World Imagery",
        "https://server.arcgisonline.com/arcgis/rest/services/World_Imagery/MapServer",
    ),
    (
        "World Terrain Base",
        "https://server.arcgisonline.com/arcgis/rest/services/World_Terrain_Base/MapServer",
    ),
    (
        "World Street Map",
        "https://server.arcgisonline.com/arcgis/rest/services/World_Street_Map/MapServer",
    ),
    (
        "World Physical Map",
        "https://server.arcgisonline.com/arcgis/rest/services/World_Physical_Map/MapServer",
    ),
    (
        "World Shaded Relief",
        "https://server.arcgisonline.com/arcgis/rest/services/World_Shaded_Relief/MapServer",
    ),
    (
        "World Terrain Reference",
        "https://server.arcgisonline.com/arcgis/rest/services/World_Terrain_Reference/MapServer",
    ),
    (
        "World Transportation",
        "https://server.arcgisonline.com/arcgis/rest/services/World_Transportation/MapServer",
    ),
    (
        "World Hillshade Dark",
        "https://server.arcgisonline.com/arcgis/rest/services/Elevation/World_Hillshade_Dark/MapServer",
    ),
    (
        "World Hillshade",
        "https://server.arcgisonline.com/arcgis/rest/services/Elevation/World_Hillshade/MapServer",
    ),
];

pub fn lookup(key: &str) -> Option<&'static NwpsService> {
    SERVICES.iter().find(|s| s.key == key)
}

/// One group per service, values are layer URLs (`<service URL>/<layer ID>`).
pub fn services_dropdown(endpoints: &Endpoints) -> Vec<DropdownGroup> {
    SERVICES
        .iter()
        .map(|s| {
            let url = s.url(endpoints);
            let options = s
                .layers
                .iter()
                .map(|l| DropdownOption::new(l.name, format!("{}/{}", url, l.id)))
                .collect();

            DropdownGroup::new(s.name, options)
        })
        .collect()
}

pub fn base_maps_dropdown() -> Vec<DropdownGroup> {
    let options = BASE_MAPS.iter().map(|(l, v)| DropdownOption::new(*l, *v)).collect();
    vec![DropdownGroup::new("ArcGIS Map Service Base Maps", options)]
}

/// Every layer of every service, values are layer IDs.
pub fn service_layers() -> Vec<DropdownOption> {
    SERVICES.iter().flat_map(layer_options).collect()
}

pub fn layer_options(service: &NwpsService) -> Vec<DropdownOption> {
    service
        .layers
        .iter()
        .map(|l| DropdownOption::new(l.name, l.id.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{base_maps_dropdown, lookup, service_layers, services_dropdown, RendererKind, SERVICES};
    use crate::arcgis::service_key;
    use crate::client::Endpoints;
    use crate::output::DropdownOption;

    #[test]
    fn test_catalog_size() {
        assert_eq!(13, SERVICES.len());
        assert_eq!(12, base_maps_dropdown()[0].options.len());
    }

    #[test]
    fn test_service_urls() {
        let endpoints = Endpoints::default();
        let gauges = lookup("riv_gauges").unwrap();
        assert_eq!(
            "https://mapservices.weather.noaa.gov/eventdriven/rest/services/water/riv_gauges/MapServer",
            gauges.url(&endpoints).as_str()
        );

        let flow = lookup("ana_high_flow_magnitude").unwrap();
        assert_eq!(
            "https://maps.water.noaa.gov/server/rest/services/nwm/ana_high_flow_magnitude/MapServer",
            flow.url(&endpoints).as_str()
        );
    }

    #[test]
    fn test_dropdown_values_resolve_to_layers() {
        let endpoints = Endpoints::default();
        let groups = services_dropdown(&endpoints);
        assert_eq!(SERVICES.len(), groups.len());
        assert_eq!("National Water Prediction Service (NWPS) River Gauge System", groups[0].label);
        assert_eq!(
            DropdownOption::new(
                "River Stages 24 hour Forecast (1)",
                "https://mapservices.weather.noaa.gov/eventdriven/rest/services/water/riv_gauges/MapServer/1"
            ),
            groups[0].options[1]
        );

        for option in groups.iter().flat_map(|g| g.options.iter()) {
            let key = service_key(&option.value).unwrap();
            let service = lookup(&key).unwrap_or_else(|| panic!("no service for {}", option.value));
            let (_, id) = option.value.rsplit_once('/').unwrap();
            assert!(service.layer(id.parse().unwrap()).is_some(), "no layer for {}", option.value);
        }
    }

    #[test]
    fn test_layer_lookup() {
        let service = lookup("srf_12hr_max_high_water_probability").unwrap();
        let layer = service.layer(1).unwrap();
        assert_eq!("avg_prob", layer.filter_attr);
        assert_eq!(RendererKind::ClassBreaks, layer.renderer);
        assert!(service.layer(7).is_none());
    }

    #[test]
    fn test_service_layers_flat() {
        let layers = service_layers();
        let total: usize = SERVICES.iter().map(|s| s.layers.len()).sum();
        assert_eq!(total, layers.len());
        assert_eq!(DropdownOption::new("Observed River Stages (0)", "0"), layers[0]);
    }
}
