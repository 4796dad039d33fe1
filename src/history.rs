//! Bounded, newest-first forecast log persisted as a single JSON array.
//!
//! A write cycle is `load → append → truncate → save`. `save` stages the new content
//! in a temp file next to the target, syncs it, and renames it over the target, so
//! readers see either the previous complete file or the new one.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{info, warn};

use crate::config::HistoryCfg;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    /// `YYYY-MM-DD` in per-day mode, RFC 3339 timestamp otherwise.
    pub date: String,
    pub forecast: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headlines: Option<Vec<String>>,
}

impl ForecastEntry {
    pub fn new(date: impl Into<String>, forecast: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            forecast: forecast.into(),
            model: None,
            temperature: None,
            headlines: None,
        }
    }

    pub fn with_metadata(mut self, model: &str, temperature: f32, headlines: Vec<String>) -> Self {
        self.model = Some(model.to_string());
        self.temperature = Some(temperature);
        self.headlines = Some(headlines);
        self
    }
}

/// Newest entry at index 0.
pub type HistoryLog = Vec<ForecastEntry>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupeMode {
    /// Timestamp-keyed; every successful run appends.
    None,
    /// Date-keyed; at most one entry per calendar day (UTC).
    #[default]
    PerDay,
}

impl DedupeMode {
    pub fn default_cap(self) -> usize {
        match self {
            DedupeMode::None => 200,
            DedupeMode::PerDay => 7,
        }
    }

    pub fn key_for(self, now: DateTime<Utc>) -> String {
        match self {
            DedupeMode::None => now.to_rfc3339_opts(SecondsFormat::Secs, true),
            DedupeMode::PerDay => now.date_naive().to_string(),
        }
    }

    /// The key `append` should dedupe on, if any.
    pub fn dedupe_key(self, key: &str) -> Option<&str> {
        match self {
            DedupeMode::None => None,
            DedupeMode::PerDay => Some(key),
        }
    }
}

impl FromStr for DedupeMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "none" | "timestamp" => Ok(DedupeMode::None),
            "per_day" | "daily" => Ok(DedupeMode::PerDay),
            other => Err(anyhow!("unknown dedupe mode: {other}")),
        }
    }
}

/// Read the persisted log. Missing, unreadable or malformed files give an empty log.
pub fn load(path: &Path) -> HistoryLog {
    let data = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            info!(target: "history", path = %path.display(), "no history yet; starting empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(target: "history", path = %path.display(), error = %e, "history unreadable; starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str::<HistoryLog>(&data) {
        Ok(log) => log,
        Err(e) => {
            warn!(target: "history", path = %path.display(), error = %e, "history invalid; starting empty");
            Vec::new()
        }
    }
}

pub fn contains_key(log: &[ForecastEntry], key: &str) -> bool {
    log.iter().any(|e| e.date == key)
}

/// Prepend `entry` and keep at most `cap` entries (0 is treated as 1).
/// With a `dedupe_key` already present in the log, returns the log unchanged.
pub fn append(
    mut log: HistoryLog,
    entry: ForecastEntry,
    cap: usize,
    dedupe_key: Option<&str>,
) -> HistoryLog {
    if let Some(key) = dedupe_key {
        if contains_key(&log, key) {
            return log;
        }
    }
    log.insert(0, entry);
    log.truncate(cap.max(1));
    log
}

/// Content written and synced to a temp file beside `dest`, not yet visible there.
/// Dropping it without `commit` deletes the temp file and leaves `dest` untouched.
pub struct StagedWrite {
    tmp: NamedTempFile,
    dest: PathBuf,
}

impl StagedWrite {
    pub fn temp_path(&self) -> &Path {
        self.tmp.path()
    }

    /// Atomically rename the staged file over the destination.
    pub fn commit(self) -> Result<()> {
        let dest = self.dest;
        self.tmp
            .persist(&dest)
            .map_err(|e| e.error)
            .with_context(|| format!("renaming staged history over {}", dest.display()))?;
        sync_parent_dir(&dest);
        Ok(())
    }
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// Stage the full log next to `dest`: serialize, write, flush, fsync.
pub fn stage(dest: &Path, log: &[ForecastEntry]) -> Result<StagedWrite> {
    let dir = parent_dir(dest);
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut body = serde_json::to_vec_pretty(log).context("serializing history")?;
    body.push(b'\n');

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(&body).context("writing staged history")?;
    tmp.flush().context("flushing staged history")?;
    match fs::metadata(dest) {
        Ok(meta) => {
            if let Err(e) = tmp.as_file().set_permissions(meta.permissions()) {
                warn!(target: "history", path = %dest.display(), error = %e, "could not copy permissions to staged history");
            }
        }
        Err(_) => set_default_permissions(tmp.as_file()),
    }
    tmp.as_file().sync_all().context("syncing staged history")?;

    Ok(StagedWrite {
        tmp,
        dest: dest.to_path_buf(),
    })
}

/// Persist the whole log atomically.
pub fn save(path: &Path, log: &[ForecastEntry]) -> Result<()> {
    stage(path, log)?.commit()
}

#[cfg(unix)]
fn set_default_permissions(f: &fs::File) {
    use std::os::unix::fs::PermissionsExt;
    // temp files are created 0600; history is meant to be readable by a viewer process
    if let Err(e) = f.set_permissions(fs::Permissions::from_mode(0o644)) {
        warn!(target: "history", error = %e, "could not make staged history world-readable");
    }
}

#[cfg(not(unix))]
fn set_default_permissions(_f: &fs::File) {}

// Best-effort: make the rename itself durable.
#[cfg(unix)]
fn sync_parent_dir(path: &Path) {
    if let Ok(dir) = fs::File::open(parent_dir(path)) {
        let _ = dir.sync_all();
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Persisted { len: usize },
    /// Per-day mode and today's key is already in the log; nothing was written.
    AlreadyRecorded,
}

/// A history file with its retention policy.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    cap: usize,
    mode: DedupeMode,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, cap: usize, mode: DedupeMode) -> Self {
        Self {
            path: path.into(),
            cap: cap.max(1),
            mode,
        }
    }

    pub fn from_config(cfg: &HistoryCfg) -> Self {
        Self::new(cfg.path.clone(), cfg.effective_cap(), cfg.dedupe_mode)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn mode(&self) -> DedupeMode {
        self.mode
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn load(&self) -> HistoryLog {
        load(&self.path)
    }

    /// True when this mode dedupes and `key` is already stored.
    pub fn is_recorded(&self, key: &str) -> bool {
        match self.mode.dedupe_key(key) {
            Some(k) => contains_key(&self.load(), k),
            None => false,
        }
    }

    /// One full write cycle. The file is untouched unless the final rename happens.
    pub fn record(&self, entry: ForecastEntry) -> Result<RecordOutcome> {
        let log = self.load();
        let key = entry.date.clone();
        if let Some(k) = self.mode.dedupe_key(&key) {
            if contains_key(&log, k) {
                info!(target: "history", key = %k, "entry for key already present; skipping write");
                return Ok(RecordOutcome::AlreadyRecorded);
            }
        }

        let log = append(log, entry, self.cap, self.mode.dedupe_key(&key));
        save(&self.path, &log)?;
        info!(target: "history", key = %key, len = log.len(), path = %self.path.display(), "history saved");
        Ok(RecordOutcome::Persisted { len: log.len() })
    }
}
