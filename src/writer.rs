use anyhow::{anyhow, bail, Context, Result};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

use crate::catalog::Corpus;
use crate::models::{LogRecord, COLUMNS};

/// Serializes records as comma-separated lines in column order.
///
/// The writer owns its destination for its whole lifetime; dropping it
/// (on success or on an error path) closes the file.
pub struct CorpusWriter<W: Write> {
    inner: csv::Writer<W>,
    include_header: bool,
    header_written: bool,
}

impl CorpusWriter<BufWriter<File>> {
    /// Create (or truncate) the output file
    pub fn create(path: &Path, include_header: bool) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file: {:?}", path))?;
        Ok(Self::from_writer(BufWriter::new(file), include_header))
    }
}

impl<W: Write> CorpusWriter<W> {
    pub fn from_writer(writer: W, include_header: bool) -> Self {
        let inner = csv::WriterBuilder::new()
            .has_headers(false)
            .quote_style(csv::QuoteStyle::Necessary)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(writer);

        CorpusWriter {
            inner,
            include_header,
            header_written: false,
        }
    }

    /// Write the header row if one was requested and it is not out yet
    pub fn write_header(&mut self) -> Result<()> {
        if self.include_header && !self.header_written {
            self.inner
                .write_record(COLUMNS)
                .context("Failed to write header row")?;
            self.header_written = true;
        }
        Ok(())
    }

    pub fn write_record(&mut self, record: &LogRecord) -> Result<()> {
        self.write_header()?;
        self.inner
            .write_record(record.fields())
            .context("Failed to write record")?;
        Ok(())
    }

    /// Write every record of the corpus in block order and flush.
    /// Returns the number of records written, header excluded.
    pub fn write_corpus(&mut self, corpus: &Corpus) -> Result<usize> {
        self.write_header()?;

        let mut written = 0;
        for block in &corpus.blocks {
            for record in &block.records {
                self.write_record(record)?;
                written += 1;
            }
            debug!("Wrote {} records for {}", block.len(), block.scenario);
        }

        self.flush()?;
        Ok(written)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().context("Failed to flush corpus output")?;
        Ok(())
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(self) -> Result<W> {
        self.inner
            .into_inner()
            .map_err(|e| anyhow!("Failed to flush corpus output: {}", e.error()))
    }
}

/// Write a whole corpus to `path` in one go
pub fn write_corpus_to_path(path: &Path, corpus: &Corpus, include_header: bool) -> Result<usize> {
    let mut writer = CorpusWriter::create(path, include_header)?;
    let written = writer
        .write_corpus(corpus)
        .with_context(|| format!("Failed to write corpus to {:?}", path))?;

    info!("Wrote {} records to {:?}", written, path);
    Ok(written)
}

/// Read a corpus file back into records.
///
/// Whether the first line is a header must be stated by the caller; it is
/// never guessed from the content.
pub fn read_corpus(path: &Path, has_header: bool) -> Result<Vec<LogRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open corpus file: {:?}", path))?;

    read_records(file, has_header)
        .with_context(|| format!("Failed to read corpus file: {:?}", path))
}

pub fn read_records<R: Read>(reader: R, has_header: bool) -> Result<Vec<LogRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .from_reader(reader);

    if has_header {
        let headers = reader.headers().context("Failed to read header row")?;
        if !headers.iter().eq(COLUMNS.iter().copied()) {
            bail!(
                "Unexpected header row: {}",
                headers.iter().collect::<Vec<_>>().join(",")
            );
        }
    }

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.context("Malformed CSV row")?;
        let line = row.position().map_or(0, |p| p.line());
        let fields: Vec<String> = row.iter().map(str::to_string).collect();
        let record = LogRecord::try_from(fields)
            .with_context(|| format!("Invalid record on line {}", line))?;
        records.push(record);
    }

    Ok(records)
}
