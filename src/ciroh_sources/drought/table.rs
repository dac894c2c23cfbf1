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

use crate::drought::api::{DroughtMonitorClient, Row};
use crate::drought::options;
use crate::output::CustomComponent;
use crate::source::{to_json, Context, DataSource, ParamError, Params, SourceInfo};
use async_trait::async_trait;
use serde_json::{json, Map, Value};

pub const INFO: SourceInfo = SourceInfo {
    name: "drought_api_table_data",
    group: "Drought_Monitor",
    label: "U.S. Drought Monitor Data Table",
    visualization_type: "custom",
    description: "Weekly drought statistics for an area as a table.",
    tags: &["drought", "table", "statistics"],
    attribution: Some("NDMC, USDA, NOAA"),
};

const COMPONENT_URL: &str = "https://unpkg.com/mfe-usdm@latest/dist/remoteEntry.js";
const COMPONENT_SCOPE: &str = "mfe_usdm";
const COMPONENT_MODULE: &str = "./Table";
const HIDDEN_COLUMNS: &[&str] = &["__type", "Label"];

pub async fn args(ctx: &Context) -> Map<String, Value> {
    let mut args = Map::new();
    args.insert("area_type".to_owned(), to_json(&options::area_types(&ctx.drought()).await));
    args.insert("statistic_type".to_owned(), to_json(&options::statistic_types()));
    args.insert("data_type".to_owned(), to_json(&options::data_types()));
    args
}

/// Weekly drought statistics of an area, rendered by the USDM table component.
#[derive(Debug)]
pub struct DroughtTable {
    client: DroughtMonitorClient,
    area_type: String,
    area: String,
    statistic_type: String,
    data_type: String,
}

impl DroughtTable {
    pub fn from_params(ctx: &Context, params: &Params<'_>) -> Result<Self, ParamError> {
        let (area_type, area) = options::split_area(params.required("area_type")?)?;
        Ok(DroughtTable {
            client: ctx.drought(),
            area_type,
            area,
            statistic_type: params.required("statistic_type")?.to_owned(),
            data_type: params.required("data_type")?.to_owned(),
        })
    }
}

#[async_trait]
impl DataSource for DroughtTable {
    async fn read(&self) -> Value {
        let rows = self
            .client
            .table(&self.area_type, &self.area, &self.statistic_type, &self.data_type)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(message = "unable to fetch drought table", area_type = %self.area_type, area = %self.area, error = %e);
                Vec::new()
            });

        to_json(&component(rows))
    }
}

fn component(rows: Vec<Row>) -> CustomComponent {
    let columns = columns(&rows);
    CustomComponent {
        url: COMPONENT_URL.to_owned(),
        scope: COMPONENT_SCOPE.to_owned(),
        module: COMPONENT_MODULE.to_owned(),
        props: json!({
            "data": rows,
            "columns": columns,
        }),
    }
}

/// Keys of the first row in order, minus internal ones.
fn columns(rows: &[Row]) -> Vec<String> {
    rows.first()
        .map(|r| {
            r.keys()
                .filter(|k| !HIDDEN_COLUMNS.contains(&k.as_str()))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}
