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

#![allow(dead_code)]

use ciroh_sources::cache::DateCache;
use ciroh_sources::client::{ApiClient, Endpoints};
use ciroh_sources::metrics::UpstreamMetrics;
use ciroh_sources::source::{Context, Params, SourceKind};
use httpmock::MockServer;
use prometheus_client::registry::Registry;
use reqwest::Url;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

/// Context with every upstream pointed at `server`.
pub fn context(server: &MockServer, cache_dir: &Path) -> Context {
    context_with_registry(server, cache_dir).0
}

/// Context with every upstream pointed at `server` and the registry its metrics belong to.
pub fn context_with_registry(server: &MockServer, cache_dir: &Path) -> (Context, Registry) {
    let mut registry = Registry::default();
    let metrics = UpstreamMetrics::new(&mut registry);
    let client = ApiClient::new(reqwest::Client::new(), metrics);
    let base = Url::parse(&server.base_url()).unwrap();

    (
        Context::new(client, Endpoints::all(&base), DateCache::new(cache_dir)),
        registry,
    )
}

/// Build the source with the given arguments and read it.
pub async fn read(ctx: &Context, name: &str, args: &[(&str, &str)]) -> Value {
    let values: HashMap<String, String> = args.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    let kind = SourceKind::from_name(name).unwrap();
    let source = kind.build(ctx, &Params::new(&values)).unwrap();
    source.read().await
}
