//! `ext-merge-sort` is an external k-way merge sort for files of fixed-width binary integers.
//!
//! External sorting is required when the data being sorted do not fit into the main memory (RAM) of a computer
//! and instead must be resided in slower external memory, usually a hard disk drive. The input is first split
//! into sorted runs, each of them sorted in memory, then the runs are merged together with a binary heap holding
//! the current head of every run. For more information see [External Sorting](https://en.wikipedia.org/wiki/External_sorting).
//!
//! # Overview
//!
//! * **Bounded memory:**
//!   no more than `block_size` bytes of input are held in memory while splitting and no more than one record
//!   per run while merging.
//! * **Bounded fan-in:**
//!   at most `branching_degree` runs are merged at once. When an input is too large for that, it is cut into
//!   `branching_degree` raw chunks which are sorted recursively by a nested external sort.
//! * **No leftovers:**
//!   every temporary file is owned by a single value and removed when it is dropped, on success and on failure.
//! * **Record agnostic:**
//!   any fixed-width integer type can be sorted, records are stored as raw native-endian bytes.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use ext_merge_sort::{ExternalSorter, ExternalSorterBuilder};
//!
//! fn main() {
//!     let sorter: ExternalSorter<u64> = ExternalSorterBuilder::new()
//!         .with_block_size(64 * 1024 * 1024)
//!         .with_branching_degree(8)
//!         .with_tmp_dir(Path::new("./"))
//!         .build()
//!         .unwrap();
//!
//!     let summary = sorter.sort_file(Path::new("input.bin"), Path::new("output.bin")).unwrap();
//!     println!("{} records sorted", summary.records);
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod heap;
pub mod merger;
pub mod record;
pub mod run;
pub mod sort;
pub mod split;

pub use buffer::BlockBuffer;
pub use config::{ConfigError, SortConfig};
pub use heap::{BinaryHeap, HeapObserver, NoopObserver};
pub use merger::{BinaryHeapMerger, RunMerger};
pub use record::Record;
pub use run::{RecordReader, RecordWriter, Run};
pub use sort::{ExternalSorter, ExternalSorterBuilder, SortError, SortSummary};
pub use split::SplitPlan;
