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

use crate::output::DropdownGroup;
use chrono::{Duration, NaiveDate};
use std::error;
use std::fmt;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

const PREFIX: &str = "drought_dates_";
const SUFFIX: &str = ".json";
const DATE_FORMAT: &str = "%Y-%m-%d";
const MAX_AGE_DAYS: i64 = 7;

#[derive(Debug)]
pub enum CacheError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "cache io error: {}", e),
            Self::Json(e) => write!(f, "cache decode error: {}", e),
        }
    }
}

impl error::Error for CacheError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
        }
    }
}

impl From<io::Error> for CacheError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// On-disk cache of the drought date dropdown.
///
/// New drought maps are released weekly so the list of available dates is written
/// to a file named after the day it was fetched, and reused until it is a week old.
#[derive(Debug, Clone)]
pub struct DateCache {
    dir: PathBuf,
}

impl DateCache {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        DateCache { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return cached dates if a fresh cache file exists, otherwise remove any stale
    /// cache files, call `fetch`, and persist the non-empty result under `today`.
    pub async fn load_or_refresh<F, Fut>(&self, today: NaiveDate, fetch: F) -> Vec<DropdownGroup>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<DropdownGroup>>,
    {
        match self.fresh_entry(today).await {
            Ok(Some(path)) => match read_entry(&path).await {
                Ok(groups) => {
                    tracing::debug!(message = "using cached drought dates", path = %path.display());
                    return groups;
                }
                Err(e) => {
                    tracing::warn!(message = "unable to read cached drought dates", path = %path.display(), error = %e);
                }
            },
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(message = "unable to scan drought date cache", dir = %self.dir.display(), error = %e);
            }
        }

        if let Err(e) = self.clear().await {
            tracing::warn!(message = "unable to clear stale drought dates", dir = %self.dir.display(), error = %e);
        }

        let groups = fetch().await;
        if groups.iter().all(|g| g.options.is_empty()) {
            return groups;
        }

        if let Err(e) = self.write_entry(today, &groups).await {
            tracing::warn!(message = "unable to write drought date cache", dir = %self.dir.display(), error = %e);
        }

        groups
    }

    /// Path of the newest cache file written within the last week, if any.
    async fn fresh_entry(&self, today: NaiveDate) -> Result<Option<PathBuf>, CacheError> {
        let mut best: Option<(NaiveDate, PathBuf)> = None;
        for (date, path) in self.entries().await? {
            let age = today.signed_duration_since(date);
            if age < Duration::zero() || age >= Duration::days(MAX_AGE_DAYS) {
                continue;
            }

            if best.as_ref().map(|(d, _)| date > *d).unwrap_or(true) {
                best = Some((date, path));
            }
        }

        Ok(best.map(|(_, p)| p))
    }

    async fn entries(&self) -> Result<Vec<(NaiveDate, PathBuf)>, CacheError> {
        let mut read = match fs::read_dir(&self.dir).await {
            Ok(r) => r,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        while let Some(entry) = read.next_entry().await? {
            let name = entry.file_name();
            if let Some(date) = name.to_str().and_then(parse_entry_name) {
                out.push((date, entry.path()));
            }
        }

        Ok(out)
    }

    /// Remove every cache file, a file that can't be removed doesn't stop the others.
    async fn clear(&self) -> Result<(), CacheError> {
        for (_, path) in self.entries().await? {
            match fs::remove_file(&path).await {
                Ok(_) => tracing::debug!(message = "removed stale drought dates", path = %path.display()),
                Err(e) => {
                    tracing::warn!(message = "unable to remove stale drought dates", path = %path.display(), error = %e)
                }
            }
        }

        Ok(())
    }

    async fn write_entry(&self, today: NaiveDate, groups: &[DropdownGroup]) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(entry_name(today));
        let bytes = serde_json::to_vec(groups)?;
        fs::write(&path, bytes).await?;
        tracing::info!(message = "cached drought dates", path = %path.display());
        Ok(())
    }
}

async fn read_entry(path: &Path) -> Result<Vec<DropdownGroup>, CacheError> {
    let bytes = fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

fn entry_name(date: NaiveDate) -> String {
    format!("{}{}{}", PREFIX, date.format(DATE_FORMAT), SUFFIX)
}

fn parse_entry_name(name: &str) -> Option<NaiveDate> {
    let date = name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}
