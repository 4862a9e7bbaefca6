//! JSON-lines file store
//!
//! One observation per line, appended and never rewritten. The cursor is the
//! byte offset of the next unread line.

use std::io::SeekFrom;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use super::{Cursor, ObservationStore, Page, StoreError, DEFAULT_PAGE_SIZE};
use crate::data::Observation;

pub struct FileStore {
    path: PathBuf,
    page_size: usize,
    /// Serializes appends so lines never interleave
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (creating if needed) the log at `path`
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        Ok(Self {
            path,
            page_size: DEFAULT_PAGE_SIZE,
            write_lock: Mutex::new(()),
        })
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ObservationStore for FileStore {
    async fn append(&self, record: &Observation) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .await?;

        // Terminate a torn line left by a crash so this record starts clean
        if file.metadata().await?.len() > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1)).await?;
            file.read_exact(&mut last).await?;
            if last[0] != b'\n' {
                tracing::warn!(path = %self.path.display(), "Terminating torn line in store file");
                line.insert(0, b'\n');
            }
        }

        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }

    async fn list_page(&self, cursor: Option<&Cursor>) -> Result<Page, StoreError> {
        let offset = match cursor {
            Some(c) => c
                .as_str()
                .parse::<u64>()
                .ok()
                .filter(|offset| i64::try_from(*offset).is_ok())
                .ok_or_else(|| StoreError::InvalidCursor(c.to_string()))?,
            None => 0,
        };

        let mut file = match File::open(&self.path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Page::default()),
            Err(e) => return Err(e.into()),
        };
        file.seek(SeekFrom::Start(offset)).await?;
        let mut reader = BufReader::new(file);

        let mut records = Vec::new();
        let mut position = offset;
        let mut line = String::new();

        while records.len() < self.page_size {
            line.clear();
            let read = reader.read_line(&mut line).await?;
            if read == 0 {
                break;
            }
            // A line without its newline is an append still in progress
            // (or torn by a crash); leave it for a later scan.
            if !line.ends_with('\n') {
                break;
            }
            position += read as u64;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    offset = position - read as u64,
                    error = %e,
                    "Skipping unreadable line in store file"
                ),
            }
        }

        let more = records.len() == self.page_size && !reader.fill_buf().await?.is_empty();
        let next_cursor = more.then(|| Cursor::new(position.to_string()));

        Ok(Page {
            records,
            next_cursor,
        })
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
