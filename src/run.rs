//! Sorted run files and binary record streams.

use std::fs;
use std::io::{self, prelude::*};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use log;
use tempfile::TempPath;

use crate::record::Record;

/// Binary record reader.
///
/// A reader in lenient mode treats a trailing partial record as the end of data (the input file case),
/// a strict reader reports it as an [`io::ErrorKind::InvalidData`] error (the run file case).
#[derive(Debug)]
pub struct RecordReader<R, Rd> {
    inner: Rd,
    strict: bool,
    consumed: u64,

    item_type: PhantomData<R>,
}

impl<R, Rd> RecordReader<R, Rd>
where
    R: Record,
    Rd: Read,
{
    /// Creates a reader that silently drops a trailing partial record.
    pub fn lenient(inner: Rd) -> Self {
        Self::new(inner, false)
    }

    /// Creates a reader that fails on a trailing partial record.
    pub fn strict(inner: Rd) -> Self {
        Self::new(inner, true)
    }

    fn new(inner: Rd, strict: bool) -> Self {
        RecordReader {
            inner,
            strict,
            consumed: 0,
            item_type: PhantomData,
        }
    }

    /// Reads the next record. Returns [`None`] when the data is exhausted.
    pub fn read_record(&mut self) -> io::Result<Option<R>> {
        let mut bytes = R::Bytes::default();
        let filled = read_full(&mut self.inner, bytes.as_mut())?;

        if filled == 0 {
            return Ok(None);
        }

        if filled < R::WIDTH {
            if self.strict {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "partial record of {} bytes after {} records (record width: {})",
                        filled,
                        self.consumed,
                        R::WIDTH
                    ),
                ));
            }
            log::warn!("dropping trailing {} bytes after {} records", filled, self.consumed);
            return Ok(None);
        }

        self.consumed += 1;
        return Ok(Some(R::from_bytes(bytes)));
    }

    /// Number of complete records read so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }
}

impl<R, Rd> Iterator for RecordReader<R, Rd>
where
    R: Record,
    Rd: Read,
{
    type Item = io::Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}

// Fills `buf` unless the reader hits the end of data, returns the number of bytes read.
pub(crate) fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }

    return Ok(filled);
}

/// Buffered binary record writer.
pub struct RecordWriter<R> {
    inner: io::BufWriter<fs::File>,
    written: u64,

    item_type: PhantomData<R>,
}

impl<R: Record> RecordWriter<R> {
    /// Creates (or truncates) a file at `path` and opens a writer for it.
    pub fn create(path: &Path, buf_size: Option<usize>) -> io::Result<Self> {
        let file = fs::File::create(path)?;
        let inner = match buf_size {
            Some(buf_size) => io::BufWriter::with_capacity(buf_size, file),
            None => io::BufWriter::new(file),
        };

        return Ok(RecordWriter {
            inner,
            written: 0,
            item_type: PhantomData,
        });
    }

    pub fn write_record(&mut self, record: R) -> io::Result<()> {
        self.inner.write_all(record.to_bytes().as_ref())?;
        self.written += 1;
        return Ok(());
    }

    pub fn write_all(&mut self, records: &[R]) -> io::Result<()> {
        for record in records {
            self.write_record(*record)?;
        }
        return Ok(());
    }

    /// Flushes buffered data to the file. Returns the number of records written.
    pub fn finish(mut self) -> io::Result<u64> {
        self.inner.flush()?;
        return Ok(self.written);
    }
}

/// Temporary run file.
///
/// The run exclusively owns its path: the file is removed when the run is dropped,
/// whether it was consumed by a merge or abandoned on an error path.
#[derive(Debug)]
pub struct Run {
    path: TempPath,
}

impl Run {
    /// Takes ownership of `path`. The file does not have to exist yet.
    pub fn new(path: PathBuf) -> io::Result<Self> {
        return Ok(Run {
            path: TempPath::try_from_path(path)?,
        });
    }

    /// Writes `records` to a new run file located at `path`.
    pub fn create<R: Record>(path: PathBuf, records: &[R], buf_size: Option<usize>) -> io::Result<Self> {
        let run = Run::new(path)?;

        let mut writer = RecordWriter::create(run.path(), buf_size)?;
        writer.write_all(records)?;
        writer.finish()?;

        return Ok(run);
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run file length in bytes.
    pub fn len_bytes(&self) -> io::Result<u64> {
        Ok(fs::metadata(self.path())?.len())
    }

    /// Opens a strict reader over the run records.
    pub fn open<R: Record>(&self, buf_size: Option<usize>) -> io::Result<RecordReader<R, io::BufReader<fs::File>>> {
        let file = fs::File::open(self.path())?;
        let file_len = file.metadata()?.len();
        if file_len % R::WIDTH as u64 != 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "run {} length {} is not a multiple of the record width {}",
                    self.path().display(),
                    file_len,
                    R::WIDTH
                ),
            ));
        }

        let reader = match buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        };

        return Ok(RecordReader::strict(reader));
    }
}
