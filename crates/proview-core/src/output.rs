//! Streaming JSON and JSONL output for asset records.
//!
//! Directory ingestion emits records batch by batch, so the writer never
//! needs the full result set: JSON output is an array opened on the first
//! item and closed by [`RecordWriter::finish`], JSONL output is one object per
//! line.

use serde::Serialize;
use std::io::{self, Write};

use crate::pipeline::IngestBatch;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// A single JSON value, or an array when streaming
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// Serializes records as they arrive.
pub struct RecordWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
    array_open: bool,
}

impl<W: Write> RecordWriter<W> {
    /// `pretty` only affects [`OutputFormat::Json`].
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
            array_open: false,
        }
    }

    /// Write one standalone value, outside of any stream.
    pub fn write_one<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        self.serialize(item, self.format == OutputFormat::Json && self.pretty)?;
        writeln!(self.writer)?;
        self.items_written += 1;
        Ok(())
    }

    /// Append one item to the stream.
    pub fn write_item<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                let separator = if self.array_open { ",\n" } else { "[\n" };
                self.writer.write_all(separator.as_bytes())?;
                self.array_open = true;
                self.serialize(item, self.pretty)?;
            }
            OutputFormat::JsonLines => {
                self.serialize(item, false)?;
                writeln!(self.writer)?;
            }
        }
        self.items_written += 1;
        Ok(())
    }

    /// Append every record of a batch. Failures are not written.
    pub fn write_batch(&mut self, batch: &IngestBatch) -> io::Result<()> {
        for record in &batch.records {
            self.write_item(record)?;
        }
        self.writer.flush()
    }

    /// Number of items written so far.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Close the stream and return the underlying writer.
    ///
    /// A JSON stream with no items becomes `[]`.
    pub fn finish(mut self) -> io::Result<W> {
        if self.array_open {
            self.writer.write_all(b"\n]\n")?;
        } else if self.format == OutputFormat::Json && self.items_written == 0 {
            self.writer.write_all(b"[]\n")?;
        }
        self.writer.flush()?;
        Ok(self.writer)
    }

    fn serialize<T: Serialize>(&mut self, item: &T, pretty: bool) -> io::Result<()> {
        if pretty {
            serde_json::to_writer_pretty(&mut self.writer, item).map_err(io::Error::other)
        } else {
            serde_json::to_writer(&mut self.writer, item).map_err(io::Error::other)
        }
    }
}
