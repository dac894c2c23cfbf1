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

//! Dropdown options for drought monitor source arguments.

use crate::cache::DateCache;
use crate::drought::api::{DroughtMonitorClient, TextValue};
use crate::output::{DropdownGroup, DropdownOption};
use crate::source::ParamError;
use chrono::NaiveDate;
use futures::future::join_all;

/// Area types understood by the drought monitor data tables, with display names.
pub const AREA_TYPES: &[(&str, &str)] = &[
    ("national", "National"),
    ("state", "State"),
    ("climdiv", "Climate Division"),
    ("dregion", "Geographic Regions"),
    ("county", "County"),
    ("fema", "FEMA Region"),
    ("huc2", "HUC (2 digit)"),
    ("huc4", "HUC (4 digit)"),
    ("huc6", "HUC (6 digit)"),
    ("huc8", "HUC (8 digit)"),
    ("nws", "NWS Region"),
    ("wfo", "NWS Weather Forecast Offices"),
    ("rfc", "River Forecast Centers"),
    ("tribal", "Tribal Areas"),
    ("usaceds", "USACE District"),
    ("usacedv", "USACE Division"),
    ("chubs", "USDA Climate Hubs"),
    ("rdews", "Regional Drought Early Warning System"),
    ("rcc", "Regional Climate Centers"),
    ("oregion", "Other Regions"),
];

fn fixed(label: &str, options: &[(&str, &str)]) -> Vec<DropdownGroup> {
    let options = options.iter().map(|(l, v)| DropdownOption::new(*l, *v)).collect();
    vec![DropdownGroup::new(label, options)]
}

pub fn statistic_types() -> Vec<DropdownGroup> {
    fixed(
        "Drought Statistic Type",
        &[
            ("Cumulative Percent Area", "1"),
            ("Categorical Percent Area", "2"),
            ("Cumulative Area", "3"),
            ("Categorical Area", "4"),
        ],
    )
}

pub fn data_types() -> Vec<DropdownGroup> {
    fixed("Drought Data Types", &[("USDM", "0"), ("7-day Change", "1")])
}

/// Areas of every area type, one group per type.
///
/// Area types are fetched concurrently. A type that can't be fetched is logged and
/// left out rather than failing the whole dropdown.
pub async fn area_types(client: &DroughtMonitorClient) -> Vec<DropdownGroup> {
    let requests = AREA_TYPES.iter().map(|(key, _)| client.areas(key));
    let results = join_all(requests).await;

    AREA_TYPES
        .iter()
        .zip(results)
        .filter_map(|((key, label), res)| match res {
            Ok(areas) => Some(area_group(key, label, &areas)),
            Err(e) => {
                tracing::error!(message = "unable to fetch drought areas", area_type = key, error = %e);
                None
            }
        })
        .collect()
}

fn area_group(key: &str, label: &str, areas: &[TextValue]) -> DropdownGroup {
    let options = areas
        .iter()
        .map(|a| DropdownOption::new(a.text.clone(), format!("{}-{}", key, a.value_str())))
        .collect();

    DropdownGroup::new(label, options)
}

/// Release dates of drought maps, cached on disk for up to a week.
pub async fn drought_dates(client: &DroughtMonitorClient, cache: &DateCache, today: NaiveDate) -> Vec<DropdownGroup> {
    cache
        .load_or_refresh(today, move || async move {
            let options = match client.dates().await {
                Ok(dates) => dates
                    .iter()
                    .map(|d| DropdownOption::new(d.text.clone(), d.value_str()))
                    .collect(),
                Err(e) => {
                    tracing::error!(message = "unable to fetch drought dates", error = %e);
                    Vec::new()
                }
            };

            vec![DropdownGroup::new("Drought Dates", options)]
        })
        .await
}

/// Split an area argument of the form `<type>-<area>`, e.g. `state-AL` or `huc2-01`.
pub fn split_area(arg: &str) -> Result<(String, String), ParamError> {
    match arg.split_once('-') {
        Some((kind, area)) if !kind.is_empty() && !area.is_empty() => Ok((kind.to_owned(), area.to_owned())),
        _ => Err(ParamError::invalid("area_type", arg, "expected <type>-<area>")),
    }
}

#[cfg(test)]
mod tests {
    use super::{area_group, data_types, split_area, statistic_types, AREA_TYPES};
    use crate::drought::api::TextValue;
    use crate::output::DropdownOption;
    use serde_json::json;

    #[test]
    fn test_statistic_types() {
        let groups = statistic_types();
        assert_eq!(1, groups.len());
        assert_eq!("Drought Statistic Type", groups[0].label);
        assert_eq!(DropdownOption::new("Categorical Area", "4"), groups[0].options[3]);
    }

    #[test]
    fn test_data_types() {
        let groups = data_types();
        assert_eq!(DropdownOption::new("7-day Change", "1"), groups[0].options[1]);
    }

    #[test]
    fn test_area_types_count() {
        assert_eq!(20, AREA_TYPES.len());
    }

    #[test]
    fn test_area_group() {
        let areas = vec![
            TextValue {
                text: "Alabama".to_owned(),
                value: json!("AL"),
            },
            TextValue {
                text: "Region 1".to_owned(),
                value: json!(1),
            },
        ];

        let group = area_group("state", "State", &areas);
        assert_eq!("State", group.label);
        assert_eq!(DropdownOption::new("Alabama", "state-AL"), group.options[0]);
        assert_eq!(DropdownOption::new("Region 1", "state-1"), group.options[1]);
    }

    #[test]
    fn test_split_area() {
        assert_eq!(("state".to_owned(), "AL".to_owned()), split_area("state-AL").unwrap());
        assert_eq!(("county".to_owned(), "01-001".to_owned()), split_area("county-01-001").unwrap());
        assert!(split_area("national").is_err());
        assert!(split_area("-AL").is_err());
    }
}
