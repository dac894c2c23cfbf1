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

use crate::client::{endpoint, ApiClient, ClientError, NO_QUERY};
use crate::metrics::Upstream;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A row of a drought monitor data table, keys vary by statistic and area type.
pub type Row = Map<String, Value>;

#[derive(Deserialize, Debug)]
struct PageMethod<T> {
    #[serde(default = "Vec::new")]
    d: Vec<T>,
}

/// Text and value pair returned by drought monitor lookups.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TextValue {
    #[serde(alias = "Text", default)]
    pub text: String,
    #[serde(alias = "Value", default)]
    pub value: Value,
}

impl TextValue {
    /// Value as a string, numeric values are rendered without quotes.
    pub fn value_str(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            v => v.to_string(),
        }
    }
}

/// Client for the U.S. Drought Monitor website (droughtmonitor.unl.edu).
#[derive(Debug, Clone)]
pub struct DroughtMonitorClient {
    client: ApiClient,
    base_url: Url,
}

impl DroughtMonitorClient {
    pub fn new(client: ApiClient, base_url: Url) -> Self {
        DroughtMonitorClient { client, base_url }
    }

    /// Dates for which drought maps have been released.
    pub async fn dates(&self) -> Result<Vec<TextValue>, ClientError> {
        let url = endpoint(&self.base_url, &["Maps", "CompareTwoWeeks.aspx", "ReturnDates"]);
        self.page_method(url, NO_QUERY).await
    }

    /// Areas of interest for an area type such as "state" or "huc2".
    pub async fn areas(&self, area_type: &str) -> Result<Vec<TextValue>, ClientError> {
        let url = endpoint(&self.base_url, &["DmData", "DataTables.aspx", "ReturnAOI"]);
        let aoi = quoted(area_type, '"');
        self.page_method(url, &[("aoi", aoi.as_str())]).await
    }

    /// Weekly drought statistics for a single area.
    pub async fn table(
        &self,
        area_type: &str,
        area: &str,
        statistic_type: &str,
        data_type: &str,
    ) -> Result<Vec<Row>, ClientError> {
        let method = format!("ReturnTabularDMAreaPercent_{}", area_type);
        let url = endpoint(&self.base_url, &["DmData", "DataTables.aspx", &method]);
        let area = quoted(area, '\'');
        let statistic_type = quoted(statistic_type, '\'');
        let data_type = quoted(data_type, '\'');
        let params = [
            ("area", area.as_str()),
            ("statstype", statistic_type.as_str()),
            ("diff", data_type.as_str()),
        ];

        self.page_method(url, &params).await
    }

    /// Drought statistics for a single area as used by the drought monitor graphs.
    pub async fn graph(&self, area_type: &str, area: &str, statistic_type: &str) -> Result<Vec<Row>, ClientError> {
        let method = format!("ReturnTabularDMAreaPercent_{}", area_type);
        let url = endpoint(&self.base_url, &["DmData", "DataGraphs.aspx", &method]);
        let area = quoted(area, '"');
        let kind = quoted(area_type, '"');
        let params = [
            ("area", area.as_str()),
            ("type", kind.as_str()),
            ("statstype", statistic_type),
        ];

        self.page_method(url, &params).await
    }

    /// Drought monitor polygons released on `date` (YYYYMMDD) as GeoJSON.
    pub async fn usdm_geojson(&self, date: &str) -> Result<Value, ClientError> {
        let file = format!("usdm_{}.json", date);
        let url = endpoint(&self.base_url, &["data", "json", &file]);
        self.client.get_json(Upstream::DroughtMonitor, url, NO_QUERY).await
    }

    async fn page_method<T, Q>(&self, url: Url, query: &Q) -> Result<Vec<T>, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let res: PageMethod<T> = self.client.get_json(Upstream::DroughtMonitor, url, query).await?;
        Ok(res.d)
    }
}

// Page method arguments are JSON/SQL literals and must be sent quoted
fn quoted(value: &str, quote: char) -> String {
    format!("{}{}{}", quote, value, quote)
}

#[cfg(test)]
mod tests {
    use super::{quoted, TextValue};
    use serde_json::json;

    #[test]
    fn test_text_value_decode() {
        let tv: TextValue = serde_json::from_value(json!({"__type": "x", "Text": "Alabama", "Value": 1})).unwrap();
        assert_eq!("Alabama", tv.text);
        assert_eq!("1", tv.value_str());

        let tv: TextValue = serde_json::from_value(json!({"Text": "09/17/2024", "Value": "20240917"})).unwrap();
        assert_eq!("20240917", tv.value_str());
    }

    #[test]
    fn test_quoted() {
        assert_eq!("\"state\"", quoted("state", '"'));
        assert_eq!("'1'", quoted("1", '\''));
    }
}
