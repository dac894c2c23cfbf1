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

//! Map services that can be shown alongside the U.S. Drought Monitor layer.

use crate::output::{DropdownGroup, DropdownOption};
use std::fmt;

/// Kind of map service, this determines the layer type used to render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Wms,
    EsriMapService,
    ImageTile,
}

impl ServiceKind {
    /// Source type name used by the map renderer.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Wms => "WMS",
            Self::EsriMapService => "ESRI Image and Map Service",
            Self::ImageTile => "Image Tile",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogLayer {
    pub id: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroughtService {
    pub key: &'static str,
    pub name: &'static str,
    pub kind: ServiceKind,
    pub url: &'static str,
    pub layers: &'static [CatalogLayer],
}

const fn layer(id: &'static str, name: &'static str) -> CatalogLayer {
    CatalogLayer { id, name }
}

pub const SERVICES: &[DroughtService] = &[
    DroughtService {
        key: "vegdri_conus_week_data",
        name: "Vegetation Drought Response Index (VegDRI)",
        kind: ServiceKind::Wms,
        url: "https://dmsdata.cr.usgs.gov/geoserver/quickdri_vegdri_conus_week_data/vegdri_conus_week_data/wms",
        layers: &[layer("vegdri_conus_week_data", "VegDRI")],
    },
    DroughtService {
        key: "quickdri_conus_week_data",
        name: "Quick Drought Response Index (QuickDRI)",
        kind: ServiceKind::Wms,
        url: "https://dmsdata.cr.usgs.gov/geoserver/quickdri_quickdri_conus_week_data/quickdri_conus_week_data/wms",
        layers: &[layer("quickdri_conus_week_data", "QuickDRI")],
    },
    DroughtService {
        key: "quickdri_water_watch_today",
        name: "USGS WaterWatch Streamflow Today",
        kind: ServiceKind::Wms,
        url: "https://edcintl.cr.usgs.gov/geoserver/quickdri_water_watch_today/wms",
        layers: &[layer("water_watch_today", "Streamflow Today")],
    },
    DroughtService {
        key: "quickdri_precipcdd7_conus_1_day_data",
        name: "Consecutive Dry Days (7 Day)",
        kind: ServiceKind::Wms,
        url: "https://edcintl.cr.usgs.gov/geoserver/quickdri_precipcdd7_conus_1_day_data/wms",
        layers: &[layer("precipcdd7_conus_1_day_data", "Consecutive Dry Days (7 Day)")],
    },
    DroughtService {
        key: "quickdri_precipcdd30_conus_1_day_data",
        name: "Consecutive Dry Days (30 Day)",
        kind: ServiceKind::Wms,
        url: "https://edcintl.cr.usgs.gov/geoserver/quickdri_precipcdd30_conus_1_day_data/wms",
        layers: &[layer("precipcdd30_conus_1_day_data", "Consecutive Dry Days (30 Day)")],
    },
    DroughtService {
        key: "quickdri_preciprd30_conus_1_day_data",
        name: "Precipitation Days (30 Day)",
        kind: ServiceKind::Wms,
        url: "https://edcintl.cr.usgs.gov/geoserver/quickdri_preciprd30_conus_1_day_data/wms",
        layers: &[layer("preciprd30_conus_1_day_data", "Precipitation Days (30 Day)")],
    },
    DroughtService {
        key: "quickdri_preciptp7_conus_1_day_data",
        name: "Total Precipitation (7 Day)",
        kind: ServiceKind::Wms,
        url: "https://edcintl.cr.usgs.gov/geoserver/quickdri_preciptp7_conus_1_day_data/wms",
        layers: &[layer("preciptp7_conus_1_day_data", "Total Precipitation (7 Day)")],
    },
    DroughtService {
        key: "quickdri_preciptp30_conus_1_day_data",
        name: "Total Precipitation (30 Day)",
        kind: ServiceKind::Wms,
        url: "https://edcintl.cr.usgs.gov/geoserver/quickdri_preciptp30_conus_1_day_data/wms",
        layers: &[layer("preciptp30_conus_1_day_data", "Total Precipitation (30 Day)")],
    },
    DroughtService {
        key: "quickdri_precipdsr_conus_1_day_data",
        name: "Days Since Last Precipitation",
        kind: ServiceKind::Wms,
        url: "https://edcintl.cr.usgs.gov/geoserver/quickdri_precipdsr_conus_1_day_data/wms",
        layers: &[layer("precipdsr_conus_1_day_data", "Days Since Last Precipitation")],
    },
    DroughtService {
        key: "quickdri_drought",
        name: "U.S. Drought Monitor (Current)",
        kind: ServiceKind::Wms,
        url: "https://edcintl.cr.usgs.gov/geoserver/quickdri_drought/wms",
        layers: &[layer("usdm_current", "USDM Current")],
    },
    DroughtService {
        key: "NLCD_2019_Land_Cover_L48",
        name: "National Land Cover Database (2019)",
        kind: ServiceKind::Wms,
        url: "https://www.mrlc.gov/geoserver/mrlc_display/NLCD_2019_Land_Cover_L48/wms",
        layers: &[layer("NLCD_2019_Land_Cover_L48", "NLCD 2019 Land Cover")],
    },
    DroughtService {
        key: "cpc_drought_outlk",
        name: "CPC Drought Outlook",
        kind: ServiceKind::EsriMapService,
        url: "https://idpgis.ncep.noaa.gov/arcgis/rest/services/NWS_Climate_Outlooks/cpc_drought_outlk/MapServer",
        layers: &[layer("0", "Seasonal Drought Outlook"), layer("1", "Monthly Drought Outlook")],
    },
    DroughtService {
        key: "cpc_6_10_day_outlk",
        name: "CPC 6-10 Day Outlook",
        kind: ServiceKind::EsriMapService,
        url: "https://idpgis.ncep.noaa.gov/arcgis/rest/services/NWS_Climate_Outlooks/cpc_6_10_day_outlk/MapServer",
        layers: &[layer("0", "6-10 Day Temperature Outlook"), layer("1", "6-10 Day Precipitation Outlook")],
    },
    DroughtService {
        key: "radar_coverage",
        name: "NEXRAD Radar Coverage",
        kind: ServiceKind::EsriMapService,
        url: "https://gis.ncdc.noaa.gov/arcgis/rest/services/geo/radar_coverage/MapServer",
        layers: &[layer("0", "Radar Coverage")],
    },
    DroughtService {
        key: "World_Hillshade",
        name: "World Hillshade",
        kind: ServiceKind::ImageTile,
        url: "https://server.arcgisonline.com/arcgis/rest/services/Elevation/World_Hillshade/MapServer",
        layers: &[layer("0", "Hillshade")],
    },
];

/// Find a service by the key derived from its URL.
pub fn lookup(key: &str) -> Option<&'static DroughtService> {
    SERVICES.iter().find(|s| s.key == key)
}

/// Services that can be picked for the drought map, grouped by service kind.
pub fn services_dropdown() -> Vec<DropdownGroup> {
    [ServiceKind::Wms, ServiceKind::EsriMapService, ServiceKind::ImageTile]
        .iter()
        .map(|kind| {
            let options = SERVICES
                .iter()
                .filter(|s| s.kind == *kind)
                .map(|s| DropdownOption::new(s.name, s.url))
                .collect();

            DropdownGroup::new(kind.as_str(), options)
        })
        .collect()
}
