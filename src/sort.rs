//! External sorter.

use log;
use std::error::Error;
use std::ffi::OsStr;
use std::fmt;
use std::fmt::Display;
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::Path;

use crate::config::{ConfigError, SortConfig};
use crate::merger::RunMerger;
use crate::record::Record;
use crate::split::{with_suffix, SplitPlan, TMP_SUFFIX};

/// Sorting error.
#[derive(Debug)]
pub enum SortError {
    /// Invalid sorting configuration.
    Config(ConfigError),
    /// Temporary directory or file creation error.
    TempDir(io::Error),
    /// Workers thread pool initialization error.
    ThreadPoolBuildError(rayon::ThreadPoolBuildError),
    /// Input file access error.
    InputError(io::Error),
    /// Common I/O error.
    IO(io::Error),
}

impl Error for SortError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(match &self {
            SortError::Config(err) => err,
            SortError::TempDir(err) => err,
            SortError::ThreadPoolBuildError(err) => err,
            SortError::InputError(err) => err,
            SortError::IO(err) => err,
        })
    }
}

impl Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self {
            SortError::Config(err) => write!(f, "invalid configuration: {}", err),
            SortError::TempDir(err) => write!(f, "temporary directory or file not created: {}", err),
            SortError::ThreadPoolBuildError(err) => write!(f, "thread pool initialization failed: {}", err),
            SortError::InputError(err) => write!(f, "input file not accessible: {}", err),
            SortError::IO(err) => write!(f, "I/O operation failed: {}", err),
        }
    }
}

/// Sorting outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSummary {
    /// Number of records written to the output.
    pub records: u64,
    /// Number of runs sorted in memory, including the ones created by nested sorts.
    pub leaf_runs: usize,
}

/// External sorter builder. Provides methods for [`ExternalSorter`] initialization.
#[derive(Clone)]
pub struct ExternalSorterBuilder<R: Record> {
    /// Memory budget and branching degree.
    config: SortConfig,
    /// Number of threads to be used to sort data in parallel.
    threads_number: Option<usize>,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// Run file read/write buffer size.
    rw_buf_size: Option<usize>,
    /// Whether sibling chunks are sorted in parallel.
    parallel_chunks: bool,

    /// Record type.
    record_type: PhantomData<R>,
}

impl<R: Record> ExternalSorterBuilder<R> {
    /// Creates an instance of a builder with default parameters.
    pub fn new() -> Self {
        ExternalSorterBuilder::default()
    }

    /// Builds an [`ExternalSorter`] instance using provided configuration.
    pub fn build(self) -> Result<ExternalSorter<R>, SortError> {
        ExternalSorter::new(
            self.config,
            self.threads_number,
            self.tmp_dir.as_deref(),
            self.rw_buf_size,
            self.parallel_chunks,
        )
    }

    /// Sets memory budget and branching degree at once.
    pub fn with_config(mut self, config: SortConfig) -> ExternalSorterBuilder<R> {
        self.config = config;
        return self;
    }

    /// Sets maximum number of bytes of input data held in memory at once.
    pub fn with_block_size(mut self, block_size: u64) -> ExternalSorterBuilder<R> {
        self.config.block_size = block_size;
        return self;
    }

    /// Sets maximum number of runs merged at once.
    pub fn with_branching_degree(mut self, branching_degree: usize) -> ExternalSorterBuilder<R> {
        self.config.branching_degree = branching_degree;
        return self;
    }

    /// Sets number of threads to be used to sort data in parallel.
    pub fn with_threads_number(mut self, threads_number: usize) -> ExternalSorterBuilder<R> {
        self.threads_number = Some(threads_number);
        return self;
    }

    /// Sets directory to be used to store temporary data.
    pub fn with_tmp_dir(mut self, path: &Path) -> ExternalSorterBuilder<R> {
        self.tmp_dir = Some(path.into());
        return self;
    }

    /// Sets run file read/write buffer size.
    pub fn with_rw_buf_size(mut self, buf_size: usize) -> ExternalSorterBuilder<R> {
        self.rw_buf_size = Some(buf_size);
        return self;
    }

    /// Sorts sibling chunks of a multi-pass split in parallel.
    /// Each chunk sort holds its own block in memory, so the memory usage grows with the number of threads.
    pub fn with_parallel_chunks(mut self, parallel_chunks: bool) -> ExternalSorterBuilder<R> {
        self.parallel_chunks = parallel_chunks;
        return self;
    }
}

impl<R: Record> Default for ExternalSorterBuilder<R> {
    fn default() -> Self {
        ExternalSorterBuilder {
            config: SortConfig::default(),
            threads_number: None,
            tmp_dir: None,
            rw_buf_size: None,
            parallel_chunks: false,
            record_type: PhantomData,
        }
    }
}

/// External sorter.
pub struct ExternalSorter<R: Record> {
    /// Memory budget and branching degree.
    pub(crate) config: SortConfig,
    /// Sorting thread pool.
    pub(crate) thread_pool: rayon::ThreadPool,
    /// Directory to be used to store temporary data.
    tmp_dir: Option<Box<Path>>,
    /// Run file read/write buffer size.
    pub(crate) rw_buf_size: Option<usize>,
    /// Whether sibling chunks are sorted in parallel.
    pub(crate) parallel_chunks: bool,

    /// Record type.
    record_type: PhantomData<R>,
}

impl<R: Record> ExternalSorter<R> {
    /// Creates a new external sorter instance.
    ///
    /// # Arguments
    /// * `config` - Memory budget and branching degree. Validated before anything else is initialized.
    /// * `threads_number` - Number of threads to be used to sort data in parallel. If the parameter is [`None`]
    ///   threads number will be selected based on available CPU core number.
    /// * `tmp_path` - Directory to be used to store temporary data. If paramater is [`None`] default OS temporary
    ///   directory will be used.
    /// * `rw_buf_size` - Run files read/write buffer size.
    /// * `parallel_chunks` - Whether sibling chunks are sorted in parallel.
    pub fn new(
        config: SortConfig,
        threads_number: Option<usize>,
        tmp_path: Option<&Path>,
        rw_buf_size: Option<usize>,
        parallel_chunks: bool,
    ) -> Result<Self, SortError> {
        config.validate(R::WIDTH).map_err(SortError::Config)?;

        return Ok(ExternalSorter {
            config,
            rw_buf_size,
            parallel_chunks,
            thread_pool: Self::init_thread_pool(threads_number)?,
            tmp_dir: tmp_path.map(Into::into),
            record_type: PhantomData,
        });
    }

    fn init_thread_pool(threads_number: Option<usize>) -> Result<rayon::ThreadPool, SortError> {
        let mut thread_pool_builder = rayon::ThreadPoolBuilder::new();

        if let Some(threads_number) = threads_number {
            log::info!("initializing thread-pool (threads: {})", threads_number);
            thread_pool_builder = thread_pool_builder.num_threads(threads_number);
        } else {
            log::info!("initializing thread-pool (threads: default)");
        }
        let thread_pool = thread_pool_builder
            .build()
            .map_err(|err| SortError::ThreadPoolBuildError(err))?;

        return Ok(thread_pool);
    }

    fn init_workspace(&self) -> Result<tempfile::TempDir, SortError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("ext-merge-sort-");

        let workspace = if let Some(tmp_path) = &self.tmp_dir {
            builder.tempdir_in(tmp_path)
        } else {
            builder.tempdir()
        }
        .map_err(|err| SortError::TempDir(err))?;

        log::info!("using {} as a temporary directory", workspace.path().display());

        return Ok(workspace);
    }

    /// Sorting configuration.
    pub fn config(&self) -> &SortConfig {
        &self.config
    }

    /// Returns the splitting strategy applied to an input of `file_size` bytes.
    pub fn plan(&self, file_size: u64) -> SplitPlan {
        SplitPlan::for_file(file_size, &self.config, R::WIDTH)
    }

    /// Sorts records of the `input` file in ascending order and writes them to the `output` file.
    ///
    /// Temporary data is kept in a dedicated directory created for this call only, which is removed before the
    /// method returns, whatever the outcome is. A trailing partial record of the input is dropped.
    ///
    /// # Arguments
    /// * `input` - File to be sorted
    /// * `output` - File the sorted records are written to
    pub fn sort_file(&self, input: &Path, output: &Path) -> Result<SortSummary, SortError> {
        let file_size = fs::metadata(input).map_err(SortError::InputError)?.len();
        log::info!("sorting {} ({} bytes) into {}", input.display(), file_size, output.display());

        let workspace = self.init_workspace()?;
        let file_name = input.file_name().unwrap_or_else(|| OsStr::new("input"));
        let prefix = with_suffix(&workspace.path().join(file_name), TMP_SUFFIX);

        let summary = self.sort_into(input, &prefix, output)?;
        workspace.close().map_err(SortError::TempDir)?;

        log::info!(
            "sorting done ({} records, {} leaf runs)",
            summary.records,
            summary.leaf_runs
        );

        return Ok(summary);
    }

    /// Splits `input` into runs named after `prefix` and merges them into `output`.
    /// Runs are removed as soon as the merge is over.
    pub(crate) fn sort_into(&self, input: &Path, prefix: &Path, output: &Path) -> Result<SortSummary, SortError> {
        let (runs, leaf_runs) = self.split(input, prefix)?;
        debug_assert!(runs.len() <= self.config.branching_degree);

        log::debug!("merging {} runs into {}", runs.len(), output.display());
        let records = RunMerger::new(self.rw_buf_size)
            .merge::<R>(&runs, output)
            .map_err(SortError::IO)?;
        drop(runs);

        return Ok(SortSummary { records, leaf_runs });
    }
}
