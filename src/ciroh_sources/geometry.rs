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

//! Conversion of GeoJSON geometries to the ESRI JSON geometries accepted by
//! ArcGIS REST query endpoints.

use serde::Deserialize;
use serde_json::{json, Value};
use std::error;
use std::fmt;

const WGS84: u32 = 4326;

#[derive(Debug)]
pub enum GeometryError {
    Malformed(serde_json::Error),
    Unsupported(&'static str),
    Position(usize),
}

impl fmt::Display for GeometryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(e) => write!(f, "malformed geometry: {}", e),
            Self::Unsupported(t) => write!(f, "unsupported geometry type {}", t),
            Self::Position(n) => write!(f, "position with {} coordinates, need at least 2", n),
        }
    }
}

impl error::Error for GeometryError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Malformed(e) => Some(e),
            _ => None,
        }
    }
}

type Position = Vec<f64>;

/// GeoJSON geometry object.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum GeoJsonGeometry {
    Point { coordinates: Position },
    LineString { coordinates: Vec<Position> },
    Polygon { coordinates: Vec<Vec<Position>> },
    MultiPoint { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
    MultiPolygon { coordinates: Vec<Vec<Vec<Position>>> },
    GeometryCollection { geometries: Vec<Value> },
}

impl GeoJsonGeometry {
    pub fn parse(raw: &str) -> Result<Self, GeometryError> {
        serde_json::from_str(raw).map_err(GeometryError::Malformed)
    }
}

/// ESRI JSON geometry along with the geometry type name ArcGIS expects for it.
#[derive(Debug, Clone, PartialEq)]
pub struct EsriGeometry {
    pub geometry_type: &'static str,
    pub geometry: Value,
}

impl EsriGeometry {
    /// Polygon from ESRI rings, as returned by ArcGIS feature queries.
    pub fn polygon(geometry: Value) -> Self {
        EsriGeometry {
            geometry_type: "esriGeometryPolygon",
            geometry,
        }
    }
}

impl TryFrom<&GeoJsonGeometry> for EsriGeometry {
    type Error = GeometryError;

    fn try_from(geom: &GeoJsonGeometry) -> Result<Self, Self::Error> {
        let sr = json!({ "wkid": WGS84 });
        let (geometry_type, geometry) = match geom {
            GeoJsonGeometry::Point { coordinates } => {
                let (x, y) = xy(coordinates)?;
                ("esriGeometryPoint", json!({ "x": x, "y": y, "spatialReference": sr }))
            }
            GeoJsonGeometry::LineString { coordinates } => (
                "esriGeometryPolyline",
                json!({ "paths": [path(coordinates)?], "spatialReference": sr }),
            ),
            GeoJsonGeometry::Polygon { coordinates } => (
                "esriGeometryPolygon",
                json!({ "rings": paths(coordinates)?, "spatialReference": sr }),
            ),
            GeoJsonGeometry::MultiPoint { coordinates } => (
                "esriGeometryMultipoint",
                json!({ "points": path(coordinates)?, "spatialReference": sr }),
            ),
            GeoJsonGeometry::MultiLineString { coordinates } => (
                "esriGeometryPolyline",
                json!({ "paths": paths(coordinates)?, "spatialReference": sr }),
            ),
            GeoJsonGeometry::MultiPolygon { coordinates } => {
                let mut rings = Vec::new();
                for polygon in coordinates {
                    rings.extend(paths(polygon)?);
                }

                ("esriGeometryPolygon", json!({ "rings": rings, "spatialReference": sr }))
            }
            GeoJsonGeometry::GeometryCollection { .. } => {
                return Err(GeometryError::Unsupported("GeometryCollection"));
            }
        };

        Ok(EsriGeometry {
            geometry_type,
            geometry,
        })
    }
}

// Drop any Z or M values, ArcGIS queries are made in 2D
fn xy(pos: &[f64]) -> Result<(f64, f64), GeometryError> {
    match pos {
        [x, y, ..] => Ok((*x, *y)),
        _ => Err(GeometryError::Position(pos.len())),
    }
}

fn path(positions: &[Position]) -> Result<Vec<[f64; 2]>, GeometryError> {
    positions.iter().map(|p| xy(p).map(|(x, y)| [x, y])).collect()
}

fn paths(lines: &[Vec<Position>]) -> Result<Vec<Vec<[f64; 2]>>, GeometryError> {
    lines.iter().map(|l| path(l)).collect()
}

#[cfg(test)]
mod tests {
    use super::{EsriGeometry, GeoJsonGeometry, GeometryError};
    use serde_json::json;

    #[test]
    fn test_point_drops_z() {
        let geom = GeoJsonGeometry::parse(r#"{"type": "Point", "coordinates": [-97.5, 35.2, 310.0]}"#).unwrap();
        let esri = EsriGeometry::try_from(&geom).unwrap();

        assert_eq!("esriGeometryPoint", esri.geometry_type);
        assert_eq!(json!({"x": -97.5, "y": 35.2, "spatialReference": {"wkid": 4326}}), esri.geometry);
    }

    #[test]
    fn test_polygon_with_hole() {
        let geom = GeoJsonGeometry::parse(
            r#"{"type": "Polygon", "coordinates": [
                [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 0.0]],
                [[2.0, 2.0], [3.0, 2.0], [3.0, 3.0], [2.0, 2.0]]
            ]}"#,
        )
        .unwrap();
        let esri = EsriGeometry::try_from(&geom).unwrap();

        assert_eq!("esriGeometryPolygon", esri.geometry_type);
        assert_eq!(
            json!([
                [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 0.0]],
                [[2.0, 2.0], [3.0, 2.0], [3.0, 3.0], [2.0, 2.0]]
            ]),
            esri.geometry["rings"]
        );
    }

    #[test]
    fn test_multipolygon_rings_flattened() {
        let geom = GeoJsonGeometry::parse(
            r#"{"type": "MultiPolygon", "coordinates": [
                [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]],
                [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 5.0]]]
            ]}"#,
        )
        .unwrap();
        let esri = EsriGeometry::try_from(&geom).unwrap();

        assert_eq!(2, esri.geometry["rings"].as_array().unwrap().len());
    }

    #[test]
    fn test_line_string_paths() {
        let geom = GeoJsonGeometry::parse(r#"{"type": "LineString", "coordinates": [[1.0, 2.0], [3.0, 4.0]]}"#).unwrap();
        let esri = EsriGeometry::try_from(&geom).unwrap();

        assert_eq!("esriGeometryPolyline", esri.geometry_type);
        assert_eq!(json!([[[1.0, 2.0], [3.0, 4.0]]]), esri.geometry["paths"]);
    }

    #[test]
    fn test_multi_point_drops_z() {
        let geom = GeoJsonGeometry::parse(
            r#"{"type": "MultiPoint", "coordinates": [[-97.5, 35.2, 310.0], [-97.0, 35.0]]}"#,
        )
        .unwrap();
        let esri = EsriGeometry::try_from(&geom).unwrap();

        assert_eq!("esriGeometryMultipoint", esri.geometry_type);
        assert_eq!(
            json!({"points": [[-97.5, 35.2], [-97.0, 35.0]], "spatialReference": {"wkid": 4326}}),
            esri.geometry
        );
    }

    #[test]
    fn test_multi_line_string_paths() {
        let geom = GeoJsonGeometry::parse(
            r#"{"type": "MultiLineString", "coordinates": [
                [[1.0, 2.0, 5.0], [3.0, 4.0, 5.0]],
                [[10.0, 20.0], [30.0, 40.0], [50.0, 60.0]]
            ]}"#,
        )
        .unwrap();
        let esri = EsriGeometry::try_from(&geom).unwrap();

        assert_eq!("esriGeometryPolyline", esri.geometry_type);
        assert_eq!(
            json!([[[1.0, 2.0], [3.0, 4.0]], [[10.0, 20.0], [30.0, 40.0], [50.0, 60.0]]]),
            esri.geometry["paths"]
        );
    }

    #[test]
    fn test_multi_point_short_position() {
        let geom = GeoJsonGeometry::parse(r#"{"type": "MultiPoint", "coordinates": [[1.0, 2.0], [3.0]]}"#).unwrap();
        let res = EsriGeometry::try_from(&geom);
        assert!(matches!(res, Err(GeometryError::Position(1))));
    }

    #[test]
    fn test_geometry_collection_unsupported() {
        let geom = GeoJsonGeometry::parse(r#"{"type": "GeometryCollection", "geometries": []}"#).unwrap();
        let res = EsriGeometry::try_from(&geom);
        assert!(matches!(res, Err(GeometryError::Unsupported("GeometryCollection"))));
    }

    #[test]
    fn test_short_position() {
        let geom = GeoJsonGeometry::parse(r#"{"type": "Point", "coordinates": [1.0]}"#).unwrap();
        let res = EsriGeometry::try_from(&geom);
        assert!(matches!(res, Err(GeometryError::Position(1))));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(GeoJsonGeometry::parse("{\"type\": \"Circle\"}"), Err(GeometryError::Malformed(_))));
    }
}
