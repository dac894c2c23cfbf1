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

use crate::metrics::{Outcome, Upstream, UpstreamMetrics};
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub enum ClientError {
    Internal(reqwest::Error),
    NotFound(Url),
    Unexpected(StatusCode, Url),
    Truncated(usize, Url),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Internal(e) => write!(f, "{}", e),
            Self::NotFound(url) => write!(f, "not found {}", url),
            Self::Unexpected(status, url) => write!(f, "unexpected status {} for {}", status, url),
            Self::Truncated(pages, url) => write!(f, "results truncated after {} pages for {}", pages, url),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Internal(e) => Some(e),
            _ => None,
        }
    }
}

/// Build the `reqwest::Client` shared by every upstream client.
///
/// Several of the drought and NOAA services are served with certificate chains that
/// fail verification, so verification is only enabled when `verify_tls` is set.
pub fn build_http_client(timeout: Duration, verify_tls: bool) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(timeout)
        .danger_accept_invalid_certs(!verify_tls)
        .build()
}

/// Append path segments to `base`, dropping an empty trailing segment first.
pub fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut p) = url.path_segments_mut() {
        p.pop_if_empty().extend(segments);
    }

    url
}

/// Base URLs of every upstream service used by the data sources.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub drought_monitor: Url,
    pub nwps_api: Url,
    pub nwm_maps: Url,
    pub nwps_maps: Url,
    pub wbd: Url,
}

impl Endpoints {
    pub const DROUGHT_MONITOR: &'static str = "https://droughtmonitor.unl.edu/";
    pub const NWPS_API: &'static str = "https://api.water.noaa.gov/nwps/v1/";
    pub const NWM_MAPS: &'static str = "https://maps.water.noaa.gov/server/rest/services/nwm/";
    pub const NWPS_MAPS: &'static str = "https://mapservices.weather.noaa.gov/eventdriven/rest/services/water/";
    pub const WBD: &'static str = "https://hydro.nationalmap.gov/arcgis/rest/services/wbd/MapServer/";

    /// Point every upstream at the same base URL, used for testing against a mock server.
    pub fn all(base: &Url) -> Self {
        Endpoints {
            drought_monitor: base.clone(),
            nwps_api: endpoint(base, &["nwps", "v1", ""]),
            nwm_maps: endpoint(base, &["nwm", ""]),
            nwps_maps: endpoint(base, &["water", ""]),
            wbd: endpoint(base, &["wbd", "MapServer", ""]),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        // Constants above are known to be valid URLs
        Endpoints {
            drought_monitor: Url::parse(Self::DROUGHT_MONITOR).expect("invalid drought monitor URL"),
            nwps_api: Url::parse(Self::NWPS_API).expect("invalid NWPS API URL"),
            nwm_maps: Url::parse(Self::NWM_MAPS).expect("invalid NWM maps URL"),
            nwps_maps: Url::parse(Self::NWPS_MAPS).expect("invalid NWPS maps URL"),
            wbd: Url::parse(Self::WBD).expect("invalid WBD URL"),
        }
    }
}

/// Thin wrapper around `reqwest::Client` for making JSON requests to upstream
/// services and recording metrics about them.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    metrics: UpstreamMetrics,
}

impl ApiClient {
    const USER_AGENT: &'static str = "ciroh_sources (https://github.com/56quarters/ciroh_sources)";
    const JSON_RESPONSE: &'static str = "application/json";

    pub fn new(client: Client, metrics: UpstreamMetrics) -> Self {
        ApiClient { client, metrics }
    }

    pub fn metrics(&self) -> &UpstreamMetrics {
        &self.metrics
    }

    /// Make a GET request for `url` with the given query parameters and decode the
    /// response body as JSON.
    pub async fn get_json<T, Q>(&self, upstream: Upstream, url: Url, query: &Q) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let req = self
            .client
            .get(url.clone())
            .query(query)
            // Drought monitor page methods only respond with JSON when a JSON content type is sent
            .header(CONTENT_TYPE, Self::JSON_RESPONSE);

        self.send_json(upstream, url, req).await
    }

    /// Make a POST request for `url` with a form encoded body and decode the response
    /// body as JSON. Used for parameters too large for a query string, like geometries.
    pub async fn post_form_json<T, F>(&self, upstream: Upstream, url: Url, form: &F) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
        F: Serialize + ?Sized,
    {
        let req = self.client.post(url.clone()).form(form);
        self.send_json(upstream, url, req).await
    }

    async fn send_json<T>(&self, upstream: Upstream, url: Url, req: RequestBuilder) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        tracing::debug!(message = "making upstream request", upstream = upstream.as_str(), url = %url);

        let start = Instant::now();
        let res = self.make_request(url, req).await;
        let res = match res {
            Ok(r) => r.json::<T>().await.map_err(ClientError::Internal),
            Err(e) => Err(e),
        };

        let outcome = match &res {
            Ok(_) => Outcome::Success,
            Err(ClientError::NotFound(_)) => Outcome::NotFound,
            Err(ClientError::Unexpected(_, _)) => Outcome::UnexpectedStatus,
            Err(ClientError::Internal(_)) | Err(ClientError::Truncated(_, _)) => Outcome::Error,
        };

        self.metrics.request(upstream, outcome, start.elapsed());
        res
    }

    async fn make_request(&self, url: Url, req: RequestBuilder) -> Result<Response, ClientError> {
        let res = req
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, Self::JSON_RESPONSE)
            .send()
            .await
            .map_err(ClientError::Internal)?;

        let status = res.status();
        if status == StatusCode::OK {
            Ok(res)
        } else if status == StatusCode::NOT_FOUND {
            Err(ClientError::NotFound(url))
        } else {
            Err(ClientError::Unexpected(status, url))
        }
    }
}

/// Query parameters for requests that don't need any.
pub const NO_QUERY: &[(&str, &str)] = &[];

#[cfg(test)]
mod tests {
    use super::{endpoint, Endpoints};
    use reqwest::Url;

    #[test]
    fn test_endpoint_trailing_slash() {
        let base = Url::parse("https://api.water.noaa.gov/nwps/v1/").unwrap();
        let url = endpoint(&base, &["gauges", "ABCD1", "stageflow"]);
        assert_eq!("https://api.water.noaa.gov/nwps/v1/gauges/ABCD1/stageflow", url.as_str());
    }

    #[test]
    fn test_endpoint_no_trailing_slash() {
        let base = Url::parse("https://droughtmonitor.unl.edu").unwrap();
        let url = endpoint(&base, &["data", "json", "usdm_20240917.json"]);
        assert_eq!("https://droughtmonitor.unl.edu/data/json/usdm_20240917.json", url.as_str());
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let base = Url::parse("https://api.water.noaa.gov/nwps/v1/").unwrap();
        let url = endpoint(&base, &["reaches", "a b"]);
        assert_eq!("https://api.water.noaa.gov/nwps/v1/reaches/a%20b", url.as_str());
    }

    #[test]
    fn test_endpoints_all() {
        let base = Url::parse("http://127.0.0.1:8080/").unwrap();
        let endpoints = Endpoints::all(&base);
        assert_eq!("http://127.0.0.1:8080/", endpoints.drought_monitor.as_str());
        assert_eq!("http://127.0.0.1:8080/nwps/v1/", endpoints.nwps_api.as_str());
        assert_eq!("http://127.0.0.1:8080/nwm/", endpoints.nwm_maps.as_str());
        assert_eq!("http://127.0.0.1:8080/wbd/MapServer/", endpoints.wbd.as_str());
    }
}
