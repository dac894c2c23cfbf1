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

use ciroh_sources::cache::DateCache;
use ciroh_sources::client::{build_http_client, ApiClient, Endpoints};
use ciroh_sources::http::RequestContext;
use ciroh_sources::metrics::UpstreamMetrics;
use ciroh_sources::source::Context;
use clap::Parser;
use prometheus_client::registry::Registry;
use reqwest::Url;
use std::error::Error;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{self, SignalKind};
use tracing::Level;

const DEFAULT_LOG_LEVEL: Level = Level::INFO;
const DEFAULT_BIND_ADDR: ([u8; 4], u16) = ([0, 0, 0, 0], 9783);
const DEFAULT_TIMEOUT_MILLIS: u64 = 30000;
const CACHE_DIR_NAME: &str = "ciroh_sources";

#[derive(Debug, Parser)]
#[clap(name = "ciroh_sources", version = clap::crate_version!())]
struct CirohSourcesApplication {
    /// Logging verbosity. Allowed values are 'trace', 'debug', 'info', 'warn', and 'error'
    /// (case insensitive)
    #[clap(long, default_value_t = DEFAULT_LOG_LEVEL)]
    log_level: Level,

    /// Timeout for each request made to an upstream service, in milliseconds.
    #[clap(long, default_value_t = DEFAULT_TIMEOUT_MILLIS)]
    timeout_millis: u64,

    /// Verify TLS certificates of upstream services. Disabled by default since several
    /// of the drought and NOAA services have certificate chains that fail verification.
    #[clap(long)]
    verify_tls: bool,

    /// Directory to cache the list of drought map release dates in. Defaults to a
    /// directory under the platform cache directory.
    #[clap(long)]
    cache_dir: Option<PathBuf>,

    /// Base URL for the U.S. Drought Monitor website and APIs
    #[clap(long, default_value = Endpoints::DROUGHT_MONITOR)]
    drought_monitor_url: Url,

    /// Base URL for the National Water Prediction Service API
    #[clap(long, default_value = Endpoints::NWPS_API)]
    nwps_api_url: Url,

    /// Base URL for National Water Model ArcGIS map services
    #[clap(long, default_value = Endpoints::NWM_MAPS)]
    nwm_maps_url: Url,

    /// Base URL for National Water Prediction Service ArcGIS map services
    #[clap(long, default_value = Endpoints::NWPS_MAPS)]
    nwps_maps_url: Url,

    /// URL of the USGS Watershed Boundary Dataset map service
    #[clap(long, default_value = Endpoints::WBD)]
    wbd_url: Url,

    /// Address to bind to. By default, ciroh_sources will bind to public address since
    /// the purpose is to serve data to a dashboard running elsewhere.
    #[clap(long, default_value_t = DEFAULT_BIND_ADDR.into())]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let opts = CirohSourcesApplication::parse();
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(opts.log_level)
            .finish(),
    )
    .expect("failed to set tracing subscriber");

    let timeout = Duration::from_millis(opts.timeout_millis);
    let http_client = build_http_client(timeout, opts.verify_tls).unwrap_or_else(|e| {
        tracing::error!(message = "unable to initialize HTTP client", error = %e);
        process::exit(1)
    });

    if !opts.verify_tls {
        tracing::warn!("TLS certificate verification of upstream services is disabled");
    }

    let cache_dir = opts.cache_dir.clone().unwrap_or_else(|| {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join(CACHE_DIR_NAME)
    });

    let endpoints = Endpoints {
        drought_monitor: opts.drought_monitor_url,
        nwps_api: opts.nwps_api_url,
        nwm_maps: opts.nwm_maps_url,
        nwps_maps: opts.nwps_maps_url,
        wbd: opts.wbd_url,
    };

    let mut registry = Registry::default();
    let metrics = UpstreamMetrics::new(&mut registry);
    let client = ApiClient::new(http_client, metrics);

    tracing::info!(
        message = "serving data sources",
        drought_monitor = %endpoints.drought_monitor,
        nwps_api = %endpoints.nwps_api,
        cache_dir = %cache_dir.display(),
    );

    let sources = Context::new(client, endpoints, DateCache::new(cache_dir));
    let context = Arc::new(RequestContext::new(sources, registry));
    let app = ciroh_sources::http::router(context);

    let server = axum::Server::try_bind(&opts.bind).unwrap_or_else(|e| {
        tracing::error!(message = "error binding to address", address = %opts.bind, error = %e);
        process::exit(1)
    });

    tracing::info!(message = "server started", address = %opts.bind);
    server
        .serve(app.into_make_service())
        .with_graceful_shutdown(async {
            // Wait for either SIGTERM or SIGINT to shutdown
            tokio::select! {
                _ = sigterm() => {}
                _ = sigint() => {}
            }
        })
        .await?;

    tracing::info!("server shutdown");
    Ok(())
}

/// Return after the first SIGTERM signal received by this process
async fn sigterm() -> io::Result<()> {
    unix::signal(SignalKind::terminate())?.recv().await;
    Ok(())
}

/// Return after the first SIGINT signal received by this process
async fn sigint() -> io::Result<()> {
    unix::signal(SignalKind::interrupt())?.recv().await;
    Ok(())
}
