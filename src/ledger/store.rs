use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;

/// Name of the hidden ledger file inside the served directory.
pub const LEDGER_FILE: &str = ".versions";

/// Version value that removes an entry instead of setting it (used on purge).
pub const VERSION_REMOVED: i64 = -1;

/// Hidden entries are never listed, served, or tracked.
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

/// A servable file name: non-empty, not hidden, and confined to the served
/// directory (no path separators).
pub fn is_valid_filename(name: &str) -> bool {
    !name.is_empty() && !is_hidden(name) && !name.contains(['/', '\\'])
}

/// Durable `filename -> version` mapping for one served directory.
pub struct VersionLedger {
    path: PathBuf,
    table: RwLock<HashMap<String, i64>>,
}

impl VersionLedger {
    /// Loads the ledger file from `dir`, then seeds every non-hidden regular file
    /// without an entry at version 1 and persists immediately.
    pub async fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(LEDGER_FILE);
        let mut table = HashMap::new();

        if fs::try_exists(&path).await.unwrap_or(false) {
            let raw = fs::read_to_string(&path)
                .await
                .with_context(|| format!("failed to read ledger file {}", path.display()))?;

            for line in raw.lines() {
                if line.is_empty() {
                    continue;
                }
                match parse_entry(line) {
                    Some((name, version)) => {
                        table.insert(name, version);
                    }
                    None => {
                        tracing::warn!("Skipping unparsable ledger line: {:?}", line);
                    }
                }
            }
        }

        let mut entries = fs::read_dir(dir)
            .await
            .with_context(|| format!("failed to scan served directory {}", dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_hidden(&name) || !entry.file_type().await?.is_file() {
                continue;
            }
            table.entry(name).or_insert(1);
        }

        let ledger = Self {
            path,
            table: RwLock::new(table),
        };
        {
            let table = ledger.table.read().await;
            ledger.persist(&table).await?;
        }

        tracing::info!(
            "Version ledger loaded: {} tracked file(s)",
            ledger.table.read().await.len()
        );

        Ok(ledger)
    }

    /// Current version of `name`, or `None` if the file is purged/untracked.
    pub async fn version(&self, name: &str) -> Option<i64> {
        self.table.read().await.get(name).copied()
    }

    /// True when the tracked version of `name` equals `version` exactly.
    pub async fn check_version(&self, name: &str, version: i64) -> bool {
        self.version(name).await == Some(version)
    }

    /// Inserts or overwrites the entry for `name`. A version of -1 removes the
    /// entry instead. Every call rewrites the ledger file.
    pub async fn set_version(&self, name: &str, version: i64) -> Result<()> {
        let mut table = self.table.write().await;
        if version == VERSION_REMOVED {
            table.remove(name);
        } else {
            table.insert(name.to_string(), version);
        }
        self.persist(&table).await
    }

    /// Returns the version of `name`, tracking it at version 1 first if the
    /// file exists on disk but has no entry (created after the startup scan).
    pub async fn ensure_tracked(&self, name: &str) -> Result<i64> {
        if let Some(version) = self.version(name).await {
            return Ok(version);
        }
        self.set_version(name, 1).await?;
        Ok(1)
    }

    /// Number of tracked files.
    pub async fn len(&self) -> usize {
        self.table.read().await.len()
    }

    async fn persist(&self, table: &HashMap<String, i64>) -> Result<()> {
        let mut output = String::new();
        for (name, version) in table.iter() {
            output.push_str(name);
            output.push('|');
            output.push_str(&version.to_string());
            output.push('\n');
        }
        fs::write(&self.path, output)
            .await
            .with_context(|| format!("failed to rewrite ledger file {}", self.path.display()))
    }
}

fn parse_entry(line: &str) -> Option<(String, i64)> {
    let (name, version) = line.rsplit_once('|')?;
    let version: i64 = version.parse().ok()?;
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), version))
}
