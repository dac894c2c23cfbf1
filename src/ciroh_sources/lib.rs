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

//! Dashboard data sources for drought and water prediction services
//!
//! ## Features
//!
//! `ciroh_sources` serves a collection of data sources for a dashboard renderer. Each source fetches
//! data from a third-party service and reshapes it into the JSON the renderer expects: map layer
//! configurations, Plotly figures, dropdown options, variable inputs, and custom components. The
//! following sources are available.
//!
//! * `drought_map` - [U.S. Drought Monitor] map for a release date, with an extra drought service overlay.
//! * `drought_map_preconfigured` - U.S. Drought Monitor map for a release date.
//! * `drought_map_layer_finder` - Layers of a drought map service, as a variable input.
//! * `drought_api_table_data` - Drought statistics for an area, as a table component.
//! * `drought_api_pie_data` - Drought category breakdown for an area, as a pie chart.
//! * `nwmp_map` - [National Water Model] or NWPS map service layer.
//! * `nwmp_map_layer_finder` - Layers of a National Water Model or NWPS map service.
//! * `nwmp_api_gauges` - Observed and forecast stage and flow for a gauge from the [NWPS API].
//! * `nwmp_api_reaches` - Streamflow of a National Water Model reach from every forecast product.
//! * `nwmp_data_service` - Counts of map features inside an area by category.
//! * `huc_boundary_map` - Boundary of a hydrologic unit from the USGS [Watershed Boundary Dataset].
//!
//! [U.S. Drought Monitor]: https://droughtmonitor.unl.edu/
//! [National Water Model]: https://water.noaa.gov/about/nwm
//! [NWPS API]: https://api.water.noaa.gov/nwps/v1/docs/
//! [Watershed Boundary Dataset]: https://www.usgs.gov/national-hydrography/watershed-boundary-dataset
//!
//! ## Build
//!
//! `ciroh_sources` is a Rust program and must be built from source using a [Rust toolchain](https://rustup.rs/).
//!
//! ```text
//! git clone git@github.com:56quarters/ciroh_sources.git && cd ciroh_sources
//! cargo build --release
//! ```
//!
//! ## Usage
//!
//! ### Run
//!
//! By default `ciroh_sources` listens on port `9783` and uses the public upstream services. Each
//! upstream can be pointed somewhere else with a flag, see `ciroh_sources --help`.
//!
//! ```text
//! ./ciroh_sources --bind 127.0.0.1:9783
//! ```
//!
//! Certificate verification for upstream requests is disabled unless `--verify-tls` is passed
//! since several of the services have broken certificate chains.
//!
//! ### Sources
//!
//! List the available sources, then the arguments of a source, then read it.
//!
//! ```text
//! curl -sS 'http://localhost:9783/sources' | jq
//! curl -sS 'http://localhost:9783/sources/nwmp_api_gauges/args' | jq
//! curl -sS 'http://localhost:9783/sources/nwmp_api_gauges?id=ANAW1' | jq
//! ```
//!
//! Upstream failures never fail a read. They are logged and the source returns whatever it can
//! build without the missing data. Missing or invalid arguments result in a `400` response.
//!
//! ### Prometheus
//!
//! Metrics about upstream requests and source reads are exposed at `/metrics`.
//!
//! * `ciroh_upstream_requests_total{upstream, outcome}` - Requests made to upstream services.
//! * `ciroh_upstream_request_duration_seconds{upstream}` - Time taken for upstream requests.
//! * `ciroh_source_reads_total{source}` - Reads of each data source.
//!

pub mod arcgis;
pub mod cache;
pub mod client;
pub mod drought;
pub mod geometry;
pub mod http;
pub mod huc;
pub mod metrics;
pub mod nwps;
pub mod output;
pub mod source;
