use chrono::Local;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::store::error::StoreError;

/// The three persisted record streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Users,
    Accounts,
    History,
}

impl Stream {
    pub fn file_name(&self) -> &'static str {
        match self {
            Stream::Users => "users.txt",
            Stream::Accounts => "accounts.txt",
            Stream::History => "history.txt",
        }
    }
}

/// Narrow seam between the ledger and the outside world: line-oriented
/// stream access plus a clock. The ledger is the only component that reads
/// or writes the streams.
pub trait Storage {
    /// Returns the stream's lines, skipping blank ones. An absent stream
    /// reads as empty so a first run starts from a clean store.
    fn read_lines(&self, stream: Stream) -> Result<Vec<String>, StoreError>;

    /// Replaces the stream's contents with `lines`.
    fn write_lines(&self, stream: Stream, lines: &[String]) -> Result<(), StoreError>;

    /// Human-readable timestamp recorded on transaction entries.
    fn timestamp(&self) -> String;
}

/// Stores each stream as a text file under one directory.
pub struct DirStorage {
    dir: PathBuf,
}

impl DirStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        DirStorage { dir: dir.into() }
    }

    fn path_for(&self, stream: Stream) -> PathBuf {
        self.dir.join(stream.file_name())
    }
}

impl Storage for DirStorage {
    fn read_lines(&self, stream: Stream) -> Result<Vec<String>, StoreError> {
        let path = self.path_for(stream);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("stream {} absent, reading as empty", stream.file_name());
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(StoreError::StreamUnavailable {
                    name: stream.file_name(),
                    source: e,
                });
            }
        };

        Ok(contents
            .lines()
            .filter(|line| !line.is_empty())
            .map(str::to_owned)
            .collect())
    }

    fn write_lines(&self, stream: Stream, lines: &[String]) -> Result<(), StoreError> {
        let mut contents = lines.join("\n");
        if !contents.is_empty() {
            contents.push('\n');
        }
        fs::write(self.path_for(stream), contents).map_err(|e| StoreError::StreamUnavailable {
            name: stream.file_name(),
            source: e,
        })
    }

    fn timestamp(&self) -> String {
        Local::now().format("%a %b %e %H:%M:%S %Y").to_string()
    }
}

/// Keeps the streams in memory. Useful for tests and throwaway sessions;
/// the clock is a deterministic tick counter.
#[derive(Default)]
pub struct MemoryStorage {
    streams: RefCell<HashMap<Stream, Vec<String>>>,
    ticks: Cell<u64>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        MemoryStorage::default()
    }

    /// Pre-seeds one stream, as if a previous session had written it.
    pub fn seed(&self, stream: Stream, lines: Vec<String>) {
        self.streams.borrow_mut().insert(stream, lines);
    }

    /// A copy of the stream's current contents.
    pub fn contents(&self, stream: Stream) -> Vec<String> {
        self.streams
            .borrow()
            .get(&stream)
            .cloned()
            .unwrap_or_default()
    }
}

impl Storage for MemoryStorage {
    fn read_lines(&self, stream: Stream) -> Result<Vec<String>, StoreError> {
        Ok(self
            .contents(stream)
            .into_iter()
            .filter(|line| !line.is_empty())
            .collect())
    }

    fn write_lines(&self, stream: Stream, lines: &[String]) -> Result<(), StoreError> {
        self.streams.borrow_mut().insert(stream, lines.to_vec());
        Ok(())
    }

    fn timestamp(&self) -> String {
        let tick = self.ticks.get();
        self.ticks.set(tick + 1);
        format!("tick-{:04}", tick)
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryStorage, Storage, Stream};

    #[test]
    fn test_that_absent_streams_read_as_empty() {
        let storage = MemoryStorage::new();
        assert!(storage.read_lines(Stream::Users).unwrap().is_empty());
    }

    #[test]
    fn test_that_write_replaces_the_whole_stream() {
        let storage = MemoryStorage::new();

        storage
            .write_lines(Stream::Accounts, &["1,100.00".to_string(), "2,50.00".to_string()])
            .unwrap();
        storage
            .write_lines(Stream::Accounts, &["1,150.00".to_string()])
            .unwrap();

        assert_eq!(
            storage.read_lines(Stream::Accounts).unwrap(),
            vec!["1,150.00".to_string()]
        );
    }

    #[test]
    fn test_that_blank_lines_are_skipped_on_read() {
        let storage = MemoryStorage::new();
        storage.seed(
            Stream::Users,
            vec!["a,b,c".to_string(), String::new(), "d,e,f".to_string()],
        );

        assert_eq!(
            storage.read_lines(Stream::Users).unwrap(),
            vec!["a,b,c".to_string(), "d,e,f".to_string()]
        );
    }

    #[test]
    fn test_that_the_memory_clock_ticks() {
        let storage = MemoryStorage::new();
        let first = storage.timestamp();
        let second = storage.timestamp();
        assert_ne!(first, second);
    }
}
