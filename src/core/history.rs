//! Append-only record of install and uninstall events.

use crate::core::file_lock::FileLock;
use crate::core::paths::PrefixPaths;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub action: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub actor: String,
    pub result: HistoryResult,
}

impl HistoryEntry {
    pub fn new(action: &str, name: &str) -> Self {
        Self {
            timestamp: Utc::now(),
            action: action.to_string(),
            name: name.to_string(),
            version: None,
            source: None,
            actor: detect_actor(),
            result: HistoryResult {
                success: true,
                error_kind: None,
                error: None,
            },
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn source(mut self, source: String) -> Self {
        self.source = Some(source);
        self
    }

    pub fn failed(mut self, kind: &str, error: String) -> Self {
        self.result = HistoryResult {
            success: false,
            error_kind: Some(kind.to_string()),
            error: Some(error),
        };
        self
    }
}

fn detect_actor() -> String {
    if let Ok(user) = std::env::var("SUDO_USER") {
        if !user.is_empty() {
            return format!("{}(sudo)", user);
        }
    }
    std::env::var("USER").unwrap_or_else(|_| "unknown".to_string())
}

pub fn append(paths: &PrefixPaths, entry: &HistoryEntry) -> Result<()> {
    let _lock = FileLock::exclusive(&paths.history_lock)?;
    let line = serde_json::to_string(entry).context("serialize history entry")?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.history)
        .with_context(|| format!("open history {}", paths.history.display()))?;
    writeln!(file, "{}", line).context("write history entry")?;
    Ok(())
}

/// Read entries, keeping only the last `limit` when given.
pub fn read(paths: &PrefixPaths, limit: Option<usize>) -> Result<Vec<HistoryEntry>> {
    if !paths.history.exists() {
        return Ok(Vec::new());
    }
    let file = fs::File::open(&paths.history)
        .with_context(|| format!("open history {}", paths.history.display()))?;
    let mut entries = Vec::new();
    let mut malformed = 0usize;
    for line in BufReader::new(file).lines() {
        let line = line.context("read history line")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match serde_json::from_str::<HistoryEntry>(trimmed) {
            Ok(entry) => entries.push(entry),
            Err(_) => malformed += 1,
        }
    }
    if malformed > 0 {
        tracing::warn!("{} malformed history entries skipped", malformed);
    }
    if let Some(limit) = limit {
        if entries.len() > limit {
            entries = entries.split_off(entries.len() - limit);
        }
    }
    Ok(entries)
}
