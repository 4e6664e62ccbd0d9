//! Input splitting into sorted runs.

use std::cmp;
use std::ffi::OsString;
use std::fs;
use std::io::{self, prelude::*};
use std::path::{Path, PathBuf};

use log;
use rayon::prelude::*;

use crate::buffer::BlockBuffer;
use crate::config::SortConfig;
use crate::record::Record;
use crate::run::{read_full, RecordReader, Run};
use crate::sort::{ExternalSorter, SortError};

/// Suffix of temporary file names derived from a sorted file name.
pub(crate) const TMP_SUFFIX: &str = "_tmp";
/// Suffix marking the sorted counterpart of a raw chunk.
pub(crate) const SORTED_SUFFIX: &str = "_s";

/// Input splitting strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitPlan {
    /// Every block is sorted in memory and written as a run.
    SinglePass,
    /// The input is cut into raw chunks of `chunk_size` bytes, each of them is sorted externally.
    MultiPass { chunk_size: u64 },
}

impl SplitPlan {
    /// Chooses the strategy for a file of `file_size` bytes.
    ///
    /// The file is divided in `branching_degree` chunks of whole records. If such a chunk fits in a block,
    /// blocks can be sorted directly without exceeding the merge fan-in.
    pub fn for_file(file_size: u64, config: &SortConfig, record_width: usize) -> Self {
        let width = record_width as u64;
        let degree = config.branching_degree as u64;
        let records = file_size / width;
        let chunk_size = (records + degree - 1) / degree * width;

        if chunk_size <= config.block_size {
            SplitPlan::SinglePass
        } else {
            SplitPlan::MultiPass { chunk_size }
        }
    }
}

/// Numbered temporary file names sharing a prefix.
pub(crate) struct RunNames {
    prefix: OsString,
    next: usize,
}

impl RunNames {
    pub(crate) fn new(prefix: &Path) -> Self {
        RunNames {
            prefix: prefix.as_os_str().to_owned(),
            next: 0,
        }
    }

    pub(crate) fn next(&mut self) -> PathBuf {
        let mut name = self.prefix.clone();
        name.push(self.next.to_string());
        self.next += 1;

        return PathBuf::from(name);
    }
}

pub(crate) fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

impl<R: Record> ExternalSorter<R> {
    /// Splits `input` into sorted runs named after `prefix`.
    /// Returns the runs together with the number of leaf runs created on the way.
    pub(crate) fn split(&self, input: &Path, prefix: &Path) -> Result<(Vec<Run>, usize), SortError> {
        let file_size = fs::metadata(input).map_err(SortError::IO)?.len();
        let mut names = RunNames::new(prefix);

        match self.plan(file_size) {
            SplitPlan::SinglePass => {
                log::debug!("splitting {} ({} bytes) in a single pass", input.display(), file_size);
                let runs = self.split_single_pass(input, file_size, &mut names)?;
                let leaf_runs = runs.len();
                Ok((runs, leaf_runs))
            }
            SplitPlan::MultiPass { chunk_size } => {
                log::debug!(
                    "splitting {} ({} bytes) in chunks of {} bytes",
                    input.display(),
                    file_size,
                    chunk_size
                );
                self.split_multi_pass(input, chunk_size, &mut names)
            }
        }
    }

    fn split_single_pass(&self, input: &Path, file_size: u64, names: &mut RunNames) -> Result<Vec<Run>, SortError> {
        let file = fs::File::open(input).map_err(SortError::IO)?;
        let mut reader = RecordReader::<R, _>::lenient(self.buffered_reader(file));
        let mut buffer = BlockBuffer::new(self.config.block_size, file_size / R::WIDTH as u64);
        let mut runs = Vec::new();

        while buffer.fill(&mut reader).map_err(SortError::IO)? > 0 {
            log::debug!("sorting block data ({} records) ...", buffer.len());
            self.thread_pool.install(|| {
                buffer.par_sort_unstable();
            });

            let path = names.next();
            log::debug!("saving run {}", path.display());
            let run = Run::create(path, buffer.as_slice(), self.rw_buf_size).map_err(SortError::IO)?;
            runs.push(run);
        }

        return Ok(runs);
    }

    fn split_multi_pass(
        &self,
        input: &Path,
        chunk_size: u64,
        names: &mut RunNames,
    ) -> Result<(Vec<Run>, usize), SortError> {
        let chunks = self.partition(input, chunk_size, names)?;

        let sorted = if self.parallel_chunks {
            self.thread_pool.install(|| {
                chunks
                    .into_par_iter()
                    .map(|chunk| self.sort_chunk(chunk))
                    .collect::<Result<Vec<_>, _>>()
            })?
        } else {
            chunks
                .into_iter()
                .map(|chunk| self.sort_chunk(chunk))
                .collect::<Result<Vec<_>, _>>()?
        };

        let leaf_runs: usize = sorted.iter().map(|(_, leaf_runs)| leaf_runs).sum();
        let runs = Vec::from_iter(sorted.into_iter().map(|(run, _)| run));

        return Ok((runs, leaf_runs));
    }

    /// Copies `input` verbatim into raw chunks of `chunk_size` bytes.
    fn partition(&self, input: &Path, chunk_size: u64, names: &mut RunNames) -> Result<Vec<Run>, SortError> {
        let mut reader = fs::File::open(input).map_err(SortError::IO)?;
        let transfer_size = usize::try_from(cmp::min(self.config.block_size, chunk_size)).unwrap_or(usize::MAX);
        let mut transfer = vec![0u8; transfer_size];
        let mut chunks = Vec::new();

        loop {
            let chunk = Run::new(names.next()).map_err(SortError::IO)?;
            let mut writer = fs::File::create(chunk.path()).map_err(SortError::IO)?;
            let copied = copy_chunk(&mut reader, &mut writer, chunk_size, &mut transfer).map_err(SortError::IO)?;

            // a chunk without a single complete record is dropped (and removed) right away
            if copied < R::WIDTH as u64 {
                break;
            }
            log::debug!("saving raw chunk {} ({} bytes)", chunk.path().display(), copied);
            chunks.push(chunk);

            if copied < chunk_size {
                break;
            }
        }

        return Ok(chunks);
    }

    /// Sorts a raw chunk with a nested external sort. The raw chunk is removed once sorted.
    fn sort_chunk(&self, chunk: Run) -> Result<(Run, usize), SortError> {
        let sorted = Run::new(with_suffix(chunk.path(), SORTED_SUFFIX)).map_err(SortError::IO)?;
        let prefix = with_suffix(chunk.path(), TMP_SUFFIX);

        let summary = self.sort_into(chunk.path(), &prefix, sorted.path())?;
        drop(chunk);

        return Ok((sorted, summary.leaf_runs));
    }

    fn buffered_reader(&self, file: fs::File) -> io::BufReader<fs::File> {
        match self.rw_buf_size {
            Some(buf_size) => io::BufReader::with_capacity(buf_size, file),
            None => io::BufReader::new(file),
        }
    }
}

fn copy_chunk(reader: &mut impl Read, writer: &mut impl Write, chunk_size: u64, transfer: &mut [u8]) -> io::Result<u64> {
    let mut copied = 0;
    while copied < chunk_size {
        let wanted = cmp::min(transfer.len() as u64, chunk_size - copied) as usize;
        let read = read_full(reader, &mut transfer[..wanted])?;
        writer.write_all(&transfer[..read])?;
        copied += read as u64;

        if read < wanted {
            break;
        }
    }

    return Ok(copied);
}
