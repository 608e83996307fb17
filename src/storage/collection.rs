use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde_json::Value;

use crate::error::{Error, Result};

const URL_FIELD: &str = "github_url";

/// Append-only JSON array of classification records, keyed by `github_url`.
///
/// Every write holds an exclusive lock on a sibling `.lock` file and replaces
/// the array through a temporary file and rename, so readers never observe a
/// partial file.
#[derive(Debug, Clone)]
pub struct OutputCollection {
    path: PathBuf,
}

struct CollectionLock {
    file: File,
}

impl Drop for CollectionLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl OutputCollection {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replaces the collection with an empty array.
    pub fn reset(&self) -> Result<()> {
        let _lock = self.lock()?;
        self.write_all(&[])?;
        tracing::info!("Reset output collection: {}", self.path.display());
        Ok(())
    }

    /// Creates the file as an empty array if it does not exist yet.
    pub fn ensure_exists(&self) -> Result<()> {
        let _lock = self.lock()?;
        if !self.path.exists() {
            self.write_all(&[])?;
        }
        Ok(())
    }

    /// Runs a collection operation on the blocking pool, so waiting on the
    /// lock held by another process never stalls a runtime worker.
    pub async fn run_blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&OutputCollection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let collection = self.clone();
        tokio::task::spawn_blocking(move || op(&collection))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }

    /// Reads all records; a missing file is an empty collection.
    pub fn load(&self) -> Result<Vec<Value>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let bytes = std::fs::read(&self.path)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        match serde_json::from_slice::<Value>(&bytes)? {
            Value::Array(records) => Ok(records),
            other => Err(Error::ParseError(format!(
                "{} must contain a JSON array, found {}",
                self.path.display(),
                json_kind(&other)
            ))),
        }
    }

    pub fn contains(&self, github_url: &str) -> Result<bool> {
        Ok(self
            .load()?
            .iter()
            .any(|record| record_url(record) == Some(github_url)))
    }

    /// Appends `record`, returning `false` without writing when a record with
    /// the same `github_url` is already present.
    pub fn append(&self, record: Value) -> Result<bool> {
        let _lock = self.lock()?;
        let mut records = self.load()?;

        if let Some(url) = record_url(&record) {
            if records.iter().any(|r| record_url(r) == Some(url)) {
                tracing::warn!("{} is already in {}", url, self.path.display());
                return Ok(false);
            }
        }

        records.push(record);
        self.write_all(&records)?;
        tracing::debug!(
            "Output collection {} now holds {} records",
            self.path.display(),
            records.len()
        );
        Ok(true)
    }

    fn lock(&self) -> Result<CollectionLock> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let lock_path = sibling(&self.path, "lock");
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)?;
        file.lock_exclusive()?;
        Ok(CollectionLock { file })
    }

    fn write_all(&self, records: &[Value]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(records)?;
        let tmp = sibling(&self.path, "tmp");
        std::fs::write(&tmp, bytes)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

fn record_url(record: &Value) -> Option<&str> {
    record.get(URL_FIELD).and_then(Value::as_str)
}

// `classified_repos.json` -> `classified_repos.json.<ext>`
fn sibling(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(ext);
    path.with_file_name(name)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
