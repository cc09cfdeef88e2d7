//! Where finished games go.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::SinkError;
use crate::game::GameRecord;

/// Accepts finalized games for archival. Called from the single aggregating
/// consumer, never concurrently.
pub trait RecordSink: Send {
    fn write(&mut self, record: &GameRecord) -> Result<(), SinkError>;

    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Collects records in memory.
impl RecordSink for Vec<GameRecord> {
    fn write(&mut self, record: &GameRecord) -> Result<(), SinkError> {
        self.push(record.clone());
        Ok(())
    }
}

/// Discards records.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl RecordSink for NullSink {
    fn write(&mut self, _record: &GameRecord) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Appends one JSON object per game to a file. Each line is flushed as it
/// is written so an interrupted run keeps every finished game.
pub struct JsonlSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonlSink {
    pub fn create(path: &Path) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every record from a JSONL file
    pub fn read_all(path: &Path) -> Result<Vec<GameRecord>, SinkError> {
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }
}

impl RecordSink for JsonlSink {
    fn write(&mut self, record: &GameRecord) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}
