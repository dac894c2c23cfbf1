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

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;
use std::time::Duration;

/// Upstream service a request was made to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upstream {
    DroughtMonitor,
    NwpsApi,
    ArcGis,
}

impl Upstream {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DroughtMonitor => "drought_monitor",
            Self::NwpsApi => "nwps_api",
            Self::ArcGis => "arcgis",
        }
    }
}

/// Result of a single upstream request, as far as metrics are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    NotFound,
    UnexpectedStatus,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NotFound => "not_found",
            Self::UnexpectedStatus => "unexpected_status",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct RequestLabels {
    upstream: &'static str,
    outcome: &'static str,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct DurationLabels {
    upstream: &'static str,
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, EncodeLabelSet)]
struct SourceLabels {
    source: &'static str,
}

/// Holder for metrics about requests made to upstream services.
///
/// All metrics are created and registered upon call to `UpstreamMetrics::new()` and
/// share the prefix "ciroh_". Cloning is cheap and clones share the same underlying
/// counters.
#[derive(Debug, Clone)]
pub struct UpstreamMetrics {
    requests: Family<RequestLabels, Counter>,
    durations: Family<DurationLabels, Histogram, fn() -> Histogram>,
    reads: Family<SourceLabels, Counter>,
}

impl UpstreamMetrics {
    /// Create a new `UpstreamMetrics` and register each metric with the provided `Registry`.
    pub fn new(reg: &mut Registry) -> Self {
        let requests = Family::<RequestLabels, Counter>::default();
        let durations: Family<DurationLabels, Histogram, fn() -> Histogram> =
            Family::new_with_constructor(|| Histogram::new(exponential_buckets(0.05, 2.0, 10)));
        let reads = Family::<SourceLabels, Counter>::default();

        reg.register(
            "ciroh_upstream_requests",
            "Requests made to upstream services by outcome",
            requests.clone(),
        );
        reg.register(
            "ciroh_upstream_request_duration_seconds",
            "Time taken for requests to upstream services",
            durations.clone(),
        );
        reg.register("ciroh_source_reads", "Reads of each data source", reads.clone());

        Self {
            requests,
            durations,
            reads,
        }
    }

    /// Record the outcome and duration of a single upstream request.
    pub fn request(&self, upstream: Upstream, outcome: Outcome, elapsed: Duration) {
        self.requests
            .get_or_create(&RequestLabels {
                upstream: upstream.as_str(),
                outcome: outcome.as_str(),
            })
            .inc();
        self.durations
            .get_or_create(&DurationLabels {
                upstream: upstream.as_str(),
            })
            .observe(elapsed.as_secs_f64());
    }

    /// Count a `read()` of the named data source.
    pub fn read(&self, source: &'static str) {
        self.reads.get_or_create(&SourceLabels { source }).inc();
    }

    #[cfg(test)]
    fn request_count(&self, upstream: Upstream, outcome: Outcome) -> u64 {
        self.requests
            .get_or_create(&RequestLabels {
                upstream: upstream.as_str(),
                outcome: outcome.as_str(),
            })
            .get()
    }
}
