//! Output side of the generator.
//!
//! A [`TradeSink`] receives records one at a time, in sequence order. The
//! production sink, [`CsvSink`], formats each row into a reusable batch
//! buffer and hands the buffer to the underlying writer only at row
//! boundaries. A writer can accept part of a batch and then fail (a file on a
//! full disk does this), so on a failed write the sink cuts the output back to
//! the end of the last fully written batch through [`TapeWrite::rollback`].

use std::{
    fs::{self, File},
    io::{self, Seek, SeekFrom, Write},
    path::Path,
};

use tracing::{debug, warn};

use crate::{
    config::Destination,
    errors::SinkError,
    trade::{HEADER, TradeRecord},
};

/// Consumer of the trade stream.
pub trait TradeSink {
    /// Called once before the first record.
    fn begin(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    fn emit(&mut self, record: &TradeRecord) -> Result<(), SinkError>;

    /// Called once after the last record; all buffered rows must be written out.
    fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps every record in memory. Handy for small runs and tests.
impl TradeSink for Vec<TradeRecord> {
    fn emit(&mut self, record: &TradeRecord) -> Result<(), SinkError> {
        self.push(*record);
        Ok(())
    }
}

/// Tape output that can drop a torn tail after a failed write.
pub trait TapeWrite: Write {
    /// Cuts the output back to the first `len` bytes written through it.
    ///
    /// Outputs that cannot take bytes back (a pipe, a terminal) keep the
    /// default, which reports [`io::ErrorKind::Unsupported`].
    fn rollback(&mut self, _len: u64) -> io::Result<()> {
        Err(io::ErrorKind::Unsupported.into())
    }
}

impl TapeWrite for File {
    fn rollback(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)?;
        self.seek(SeekFrom::Start(len))?;
        Ok(())
    }
}

impl TapeWrite for Vec<u8> {
    fn rollback(&mut self, len: u64) -> io::Result<()> {
        self.truncate(usize::try_from(len).unwrap_or(usize::MAX));
        Ok(())
    }
}

impl TapeWrite for io::Sink {
    fn rollback(&mut self, _len: u64) -> io::Result<()> {
        Ok(())
    }
}

impl TapeWrite for io::StdoutLock<'_> {}

impl<T: TapeWrite + ?Sized> TapeWrite for Box<T> {
    fn rollback(&mut self, len: u64) -> io::Result<()> {
        (**self).rollback(len)
    }
}

/// Writes the tape as `stocksymbol,time,quantity,price` rows.
///
/// Symbols are `SYM<rank>` and the other fields are integers, so no field can
/// hold a comma, quote or newline. Rows are formatted directly without
/// quoting; the `csv` crate is only used to read tapes back.
///
/// The writer is expected to start empty: rollback offsets count from the
/// first byte this sink writes.
pub struct CsvSink<W: TapeWrite> {
    inner: W,
    batch: Vec<u8>,
    batch_bytes: usize,
    last_sequence: u64,
    committed: u64,
}

impl<W: TapeWrite> CsvSink<W> {
    pub fn new(inner: W, batch_bytes: usize) -> Self {
        Self {
            inner,
            // one row is at most ~60 bytes; leave room so a push never reallocates
            batch: Vec::with_capacity(batch_bytes + 128),
            batch_bytes,
            last_sequence: 0,
            committed: 0,
        }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Bytes of whole batches the writer has accepted so far.
    pub fn committed(&self) -> u64 {
        self.committed
    }

    fn flush_batch(&mut self) -> Result<(), SinkError> {
        if self.batch.is_empty() {
            return Ok(());
        }
        if let Err(source) = self.inner.write_all(&self.batch) {
            if let Err(e) = self.inner.rollback(self.committed) {
                warn!(
                    committed = self.committed,
                    error = %e,
                    "could not drop partially written rows"
                );
            }
            return Err(SinkError::Write {
                sequence: self.last_sequence,
                source,
            });
        }
        self.committed += self.batch.len() as u64;
        self.batch.clear();
        Ok(())
    }
}

impl CsvSink<Box<dyn TapeWrite>> {
    /// Opens `dest`, creating parent directories for file outputs.
    pub fn open(dest: &Destination, batch_bytes: usize) -> Result<Self, SinkError> {
        let inner: Box<dyn TapeWrite> = match dest {
            Destination::Stdout => Box::new(io::stdout().lock()),
            Destination::File(path) => Box::new(create_file(path)?),
        };
        debug!(%dest, batch_bytes, "opened tape output");
        Ok(CsvSink::new(inner, batch_bytes))
    }
}

fn create_file(path: &Path) -> Result<File, SinkError> {
    let open_err = |source: io::Error| SinkError::Open {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(open_err)?;
    }
    File::create(path).map_err(open_err)
}

impl<W: TapeWrite> TradeSink for CsvSink<W> {
    fn begin(&mut self) -> Result<(), SinkError> {
        self.batch.extend_from_slice(HEADER.join(",").as_bytes());
        self.batch.push(b'\n');
        Ok(())
    }

    #[inline]
    fn emit(&mut self, record: &TradeRecord) -> Result<(), SinkError> {
        // writing into a Vec cannot fail
        let _ = writeln!(
            self.batch,
            "{},{},{},{}",
            record.symbol, record.sequence, record.quantity, record.price
        );
        self.last_sequence = record.sequence;
        if self.batch.len() >= self.batch_bytes {
            self.flush_batch()?;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.flush_batch()?;
        self.inner.flush().map_err(SinkError::Flush)
    }
}
