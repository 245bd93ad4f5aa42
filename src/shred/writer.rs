use crate::types::{Extraction, RecordError, ResultSet};
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes rows to JSON Lines files, one `<table>.jsonl` per table
pub struct TableWriter {
    output_dir: PathBuf,
    writers: HashMap<String, BufWriter<File>>,
}

impl TableWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Result<Self> {
        std::fs::create_dir_all(&output_dir).context("Failed to create output directory")?;

        Ok(TableWriter {
            output_dir: output_dir.as_ref().to_path_buf(),
            writers: HashMap::new(),
        })
    }

    /// Append every row to its table's file
    pub fn write_results(&mut self, results: &ResultSet) -> Result<()> {
        for (table, rows) in results.iter() {
            if rows.is_empty() {
                continue;
            }
            let writer = self.writer_for(table)?;
            for row in rows {
                serde_json::to_writer(&mut *writer, row).context("Failed to serialize row")?;
                writeln!(writer).context("Failed to write row")?;
            }
        }
        Ok(())
    }

    fn writer_for(&mut self, table: &str) -> Result<&mut BufWriter<File>> {
        if !self.writers.contains_key(table) {
            let filename = self.output_dir.join(format!("{table}.jsonl"));
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&filename)
                .with_context(|| format!("Failed to open file: {}", filename.display()))?;
            self.writers.insert(table.to_string(), BufWriter::new(file));
        }
        self.writers
            .get_mut(table)
            .context("writer vanished after insertion")
    }

    /// Flush all writers
    pub fn flush(&mut self) -> Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush().context("Failed to flush writer")?;
        }
        Ok(())
    }
}

/// Writes rows of every table to one stream, tagging each with `_table`
pub struct SingleWriter<W: Write> {
    writer: W,
}

impl<W: Write> SingleWriter<W> {
    pub fn new(writer: W) -> Self {
        SingleWriter { writer }
    }

    pub fn write_extraction(&mut self, extraction: &Extraction) -> Result<()> {
        self.write_results(&extraction.results)
    }

    pub fn write_results(&mut self, results: &ResultSet) -> Result<()> {
        for (table, rows) in results.iter() {
            for row in rows {
                let mut data = row.clone();
                data.insert("_table".to_string(), Value::String(table.to_string()));

                let json = serde_json::to_string(&data).context("Failed to serialize row")?;
                writeln!(self.writer, "{}", json).context("Failed to write row")?;
            }
        }
        Ok(())
    }

    /// One JSON line per record error
    pub fn write_errors(&mut self, errors: &[RecordError]) -> Result<()> {
        for error in errors {
            let json = serde_json::to_string(error).context("Failed to serialize error")?;
            writeln!(self.writer, "{}", json).context("Failed to write error")?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush writer")
    }
}
