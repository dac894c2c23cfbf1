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

//! Data source registry and the types shared by every source.

use crate::arcgis::ArcGisClient;
use crate::cache::DateCache;
use crate::client::{ApiClient, Endpoints};
use crate::drought::api::DroughtMonitorClient;
use crate::drought::{layers as drought_layers, map as drought_map, pie, table};
use crate::huc;
use crate::nwps::api::NwpsClient;
use crate::nwps::{gauges, layers as nwps_layers, map as nwps_map, reaches, stats};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::error;
use std::fmt;

/// A dashboard data source, built from request parameters.
///
/// Reading a source never fails. Upstream errors are logged and the source returns
/// whatever output it can build without the missing data.
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn read(&self) -> Value;
}

#[derive(Debug, PartialEq, Eq)]
pub enum ParamError {
    Missing(&'static str),
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl ParamError {
    pub fn invalid<V: Into<String>, R: Into<String>>(name: &'static str, value: V, reason: R) -> Self {
        Self::Invalid {
            name,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing(name) => write!(f, "missing required argument '{}'", name),
            Self::Invalid { name, value, reason } => {
                write!(f, "invalid value '{}' for argument '{}': {}", value, name, reason)
            }
        }
    }
}

impl error::Error for ParamError {}

/// Arguments of a source as passed in the query string.
#[derive(Debug, Clone, Copy)]
pub struct Params<'a> {
    values: &'a HashMap<String, String>,
}

impl<'a> Params<'a> {
    pub fn new(values: &'a HashMap<String, String>) -> Self {
        Params { values }
    }

    /// Value of a required argument, empty values are treated as missing.
    pub fn required(&self, name: &'static str) -> Result<&'a str, ParamError> {
        self.optional(name).ok_or(ParamError::Missing(name))
    }

    pub fn optional(&self, name: &str) -> Option<&'a str> {
        self.values
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Clients and state shared by every source.
#[derive(Debug, Clone)]
pub struct Context {
    pub client: ApiClient,
    pub endpoints: Endpoints,
    pub cache: DateCache,
}

impl Context {
    pub fn new(client: ApiClient, endpoints: Endpoints, cache: DateCache) -> Self {
        Context {
            client,
            endpoints,
            cache,
        }
    }

    pub fn drought(&self) -> DroughtMonitorClient {
        DroughtMonitorClient::new(self.client.clone(), self.endpoints.drought_monitor.clone())
    }

    pub fn nwps(&self) -> NwpsClient {
        NwpsClient::new(self.client.clone(), self.endpoints.nwps_api.clone())
    }

    pub fn arcgis(&self) -> ArcGisClient {
        ArcGisClient::new(self.client.clone())
    }
}

/// Descriptor of a source as listed by the server.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceInfo {
    pub name: &'static str,
    pub group: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub visualization_type: &'static str,
    pub description: &'static str,
    pub tags: &'static [&'static str],
    pub attribution: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    DroughtMap,
    DroughtMapPreconfigured,
    DroughtMapLayerFinder,
    DroughtTable,
    DroughtPie,
    NwpsMap,
    NwpsMapLayerFinder,
    NwpsGauges,
    NwpsReaches,
    NwpsStats,
    HucBoundaryMap,
}

impl SourceKind {
    pub const ALL: &'static [SourceKind] = &[
        Self::DroughtMap,
        Self::DroughtMapPreconfigured,
        Self::DroughtMapLayerFinder,
        Self::DroughtTable,
        Self::DroughtPie,
        Self::NwpsMap,
        Self::NwpsMapLayerFinder,
        Self::NwpsGauges,
        Self::NwpsReaches,
        Self::NwpsStats,
        Self::HucBoundaryMap,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.info().name == name)
    }

    pub fn info(&self) -> SourceInfo {
        match self {
            Self::DroughtMap => drought_map::INFO,
            Self::DroughtMapPreconfigured => drought_map::PRECONFIGURED_INFO,
            Self::DroughtMapLayerFinder => drought_layers::INFO,
            Self::DroughtTable => table::INFO,
            Self::DroughtPie => pie::INFO,
            Self::NwpsMap => nwps_map::INFO,
            Self::NwpsMapLayerFinder => nwps_layers::INFO,
            Self::NwpsGauges => gauges::INFO,
            Self::NwpsReaches => reaches::INFO,
            Self::NwpsStats => stats::INFO,
            Self::HucBoundaryMap => huc::INFO,
        }
    }

    /// Arguments the dashboard asks for, dropdown options may be fetched from upstreams.
    pub async fn args(&self, ctx: &Context, today: NaiveDate) -> Map<String, Value> {
        match self {
            Self::DroughtMap => drought_map::args(ctx, today, true).await,
            Self::DroughtMapPreconfigured => drought_map::args(ctx, today, false).await,
            Self::DroughtMapLayerFinder => drought_layers::args(),
            Self::DroughtTable => table::args(ctx).await,
            Self::DroughtPie => pie::args(ctx, today).await,
            Self::NwpsMap => nwps_map::args(ctx),
            Self::NwpsMapLayerFinder => nwps_layers::args(),
            Self::NwpsGauges => gauges::args(),
            Self::NwpsReaches => reaches::args(),
            Self::NwpsStats => stats::args(ctx),
            Self::HucBoundaryMap => huc::args(),
        }
    }

    pub fn build(&self, ctx: &Context, params: &Params<'_>) -> Result<Box<dyn DataSource>, ParamError> {
        Ok(match self {
            Self::DroughtMap => Box::new(drought_map::DroughtMap::from_params(ctx, params)?),
            Self::DroughtMapPreconfigured => Box::new(drought_map::DroughtMap::preconfigured(ctx, params)?),
            Self::DroughtMapLayerFinder => Box::new(drought_layers::LayerFinder::from_params(ctx, params)?),
            Self::DroughtTable => Box::new(table::DroughtTable::from_params(ctx, params)?),
            Self::DroughtPie => Box::new(pie::DroughtPie::from_params(ctx, params)?),
            Self::NwpsMap => Box::new(nwps_map::NwpsMap::from_params(params)?),
            Self::NwpsMapLayerFinder => Box::new(nwps_layers::LayerFinder::from_params(params)?),
            Self::NwpsGauges => Box::new(gauges::GaugeGraph::from_params(ctx, params)?),
            Self::NwpsReaches => Box::new(reaches::ReachGraph::from_params(ctx, params)?),
            Self::NwpsStats => Box::new(stats::ServiceStats::from_params(ctx, params)?),
            Self::HucBoundaryMap => Box::new(huc::HucBoundaryMap::from_params(ctx, params)?),
        })
    }
}

/// Arguments that are entered as free text.
pub fn text_args(names: &[&str]) -> Map<String, Value> {
    names
        .iter()
        .map(|n| (n.to_string(), Value::String("text".to_owned())))
        .collect()
}

/// Serialize source output, logging and returning `null` if that isn't possible.
pub fn to_json<T: Serialize>(val: &T) -> Value {
    serde_json::to_value(val).unwrap_or_else(|e| {
        tracing::error!(message = "unable to serialize source output", error = %e);
        Value::Null
    })
}
