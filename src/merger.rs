//! Binary heap merger.

use std::cmp::Ordering;
use std::io;
use std::marker::PhantomData;
use std::mem;
use std::path::Path;

use crate::heap::BinaryHeap;
use crate::record::Record;
use crate::run::{RecordWriter, Run};

/// Sorted source together with its next unread item.
struct MergeCursor<T, S> {
    head: T,
    source: S,
}

type CursorCompare<T, S> = fn(&MergeCursor<T, S>, &MergeCursor<T, S>) -> Ordering;

// the heap surfaces its greatest element, so the order is reversed to get the smallest head first
fn by_head_ascending<T: Ord, S>(a: &MergeCursor<T, S>, b: &MergeCursor<T, S>) -> Ordering {
    b.head.cmp(&a.head)
}

/// Binary heap merger implementation.
/// Merges multiple sorted inputs into a single sorted output.
/// Time complexity is *m* \* log(*n*) in worst case where *m* is the number of items,
/// *n* is the number of chunks (inputs). At most one item per input is held in memory.
pub struct BinaryHeapMerger<T, E, C>
where
    T: Ord,
    C: IntoIterator<Item = Result<T, E>>,
{
    cursors: BinaryHeap<MergeCursor<T, C::IntoIter>, CursorCompare<T, C::IntoIter>>,
    // inputs whose first item has not been read yet
    pending: Vec<C::IntoIter>,

    error_type: PhantomData<fn() -> E>,
}

impl<T, E, C> BinaryHeapMerger<T, E, C>
where
    T: Ord,
    C: IntoIterator<Item = Result<T, E>>,
{
    /// Creates an instance of a binary heap merger using chunks as inputs.
    /// Chunk items should be sorted in ascending order otherwise the result is undefined.
    ///
    /// # Arguments
    /// * `chunks` - Chunks to be merged in a single sorted one
    pub fn new<I>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
    {
        let mut pending = Vec::from_iter(chunks.into_iter().map(|c| c.into_iter()));
        // inputs are primed from the back of the list
        pending.reverse();
        let compare: CursorCompare<T, C::IntoIter> = by_head_ascending;

        return BinaryHeapMerger {
            cursors: BinaryHeap::with_capacity(pending.len(), compare),
            pending,
            error_type: PhantomData,
        };
    }
}

impl<T, E, C> Iterator for BinaryHeapMerger<T, E, C>
where
    T: Ord,
    C: IntoIterator<Item = Result<T, E>>,
{
    type Item = Result<T, E>;

    /// Returns the next item from the inputs in ascending order.
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(mut source) = self.pending.pop() {
            match source.next() {
                Some(Ok(head)) => self.cursors.push(MergeCursor { head, source }),
                Some(Err(err)) => return Some(Err(err)),
                None => {}
            }
        }

        let mut cursor = self.cursors.pop()?;
        match cursor.source.next() {
            Some(Ok(next)) => {
                let result = mem::replace(&mut cursor.head, next);
                self.cursors.push(cursor);
                Some(Ok(result))
            }
            Some(Err(err)) => Some(Err(err)),
            // the exhausted input is dropped here
            None => Some(Ok(cursor.head)),
        }
    }
}

/// Merges sorted run files into a single sorted file.
#[derive(Debug, Clone, Default)]
pub struct RunMerger {
    /// Run and output file read/write buffer size.
    rw_buf_size: Option<usize>,
}

impl RunMerger {
    pub fn new(rw_buf_size: Option<usize>) -> Self {
        RunMerger { rw_buf_size }
    }

    /// Merges `runs` into `output`. Returns the number of records written.
    pub fn merge<R: Record>(&self, runs: &[Run], output: &Path) -> io::Result<u64> {
        let readers = runs
            .iter()
            .map(|run| run.open::<R>(self.rw_buf_size))
            .collect::<io::Result<Vec<_>>>()?;

        let mut writer = RecordWriter::create(output, self.rw_buf_size)?;
        for record in BinaryHeapMerger::new(readers) {
            writer.write_record(record?)?;
        }

        return writer.finish();
    }
}

#[cfg(test)]
mod test {
    use rstest::*;
    use std::error::Error;
    use std::fs;
    use std::io::{self, ErrorKind};

    use super::{BinaryHeapMerger, RunMerger};
    use crate::run::Run;

    #[rstest]
    #[case(
        vec![],
        vec![],
    )]
    #[case(
        vec![
            vec![],
            vec![]
        ],
        vec![],
    )]
    #[case(
        vec![
            vec![Ok(4), Ok(5), Ok(7)],
            vec![Ok(1), Ok(6)],
            vec![Ok(3)],
            vec![],
        ],
        vec![Ok(1), Ok(3), Ok(4), Ok(5), Ok(6), Ok(7)],
    )]
    #[case(
        vec![
            vec![Ok(1), Ok(1), Ok(4)],
            vec![Ok(1), Ok(2), Ok(4)],
        ],
        vec![Ok(1), Ok(1), Ok(1), Ok(2), Ok(4), Ok(4)],
    )]
    #[case(
        vec![
            vec![Result::Err(io::Error::new(ErrorKind::Other, "test error"))]
        ],
        vec![
            Result::Err(io::Error::new(ErrorKind::Other, "test error"))
        ],
    )]
    #[case(
        vec![
            vec![Ok(3), Result::Err(io::Error::new(ErrorKind::Other, "test error"))],
            vec![Ok(1), Ok(2)],
        ],
        vec![
            Ok(1),
            Ok(2),
            Result::Err(io::Error::new(ErrorKind::Other, "test error")),
        ],
    )]
    // the second input fails while being primed, the inputs primed so far and the rest are still merged
    #[case(
        vec![
            vec![Ok(1), Ok(5)],
            vec![Result::Err(io::Error::new(ErrorKind::Other, "test error"))],
            vec![Ok(3)],
        ],
        vec![
            Result::Err(io::Error::new(ErrorKind::Other, "test error")),
            Ok(1),
            Ok(3),
            Ok(5),
        ],
    )]
    fn test_merger(
        #[case] chunks: Vec<Vec<Result<i32, io::Error>>>,
        #[case] expected_result: Vec<Result<i32, io::Error>>,
    ) {
        let merger = BinaryHeapMerger::new(chunks);
        let actual_result: Vec<Result<i32, io::Error>> = merger.collect();
        assert_eq!(actual_result.len(), expected_result.len());
        assert!(
            compare_vectors_of_result::<_, io::Error>(&actual_result, &expected_result),
            "actual={:?}, expected={:?}",
            actual_result,
            expected_result
        );
    }

    fn compare_vectors_of_result<T: PartialEq, E: Error + 'static>(
        actual: &Vec<Result<T, E>>,
        expected: &Vec<Result<T, E>>,
    ) -> bool {
        actual
            .into_iter()
            .zip(expected)
            .all(
                |(actual_result, expected_result)| match (actual_result, expected_result) {
                    (Ok(actual_result), Ok(expected_result)) if actual_result == expected_result => true,
                    (Err(actual_err), Err(expected_err)) => actual_err.to_string() == expected_err.to_string(),
                    _ => false,
                },
            )
    }

    #[fixture]
    fn tmp_dir() -> tempfile::TempDir {
        tempfile::tempdir().unwrap()
    }

    #[rstest]
    fn test_run_merger(tmp_dir: tempfile::TempDir) {
        let runs = vec![
            Run::create(tmp_dir.path().join("input_tmp0"), &[1u64, 3, 5], None).unwrap(),
            Run::create(tmp_dir.path().join("input_tmp1"), &[1u64, 4, 9], None).unwrap(),
            Run::create(tmp_dir.path().join("input_tmp2"), &[2u64, 6], None).unwrap(),
            Run::create(tmp_dir.path().join("input_tmp3"), &[] as &[u64], None).unwrap(),
        ];
        let output = tmp_dir.path().join("output");

        let written = RunMerger::new(Some(16)).merge::<u64>(&runs, &output).unwrap();

        assert_eq!(written, 8);
        let actual: Vec<u64> = fs::read(&output)
            .unwrap()
            .chunks_exact(8)
            .map(|bytes| u64::from_ne_bytes(bytes.try_into().unwrap()))
            .collect();
        assert_eq!(actual, vec![1, 1, 2, 3, 4, 5, 6, 9]);
    }

    #[rstest]
    fn test_run_merger_without_runs(tmp_dir: tempfile::TempDir) {
        let output = tmp_dir.path().join("output");

        let written = RunMerger::default().merge::<u64>(&[], &output).unwrap();

        assert_eq!(written, 0);
        assert_eq!(fs::metadata(&output).unwrap().len(), 0);
    }

    #[rstest]
    fn test_run_merger_rejects_corrupted_run(tmp_dir: tempfile::TempDir) {
        let path = tmp_dir.path().join("input_tmp0");
        fs::write(&path, [0u8; 12]).unwrap();
        let runs = vec![Run::new(path).unwrap()];
        let output = tmp_dir.path().join("output");

        let err = RunMerger::default().merge::<u64>(&runs, &output).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(!output.exists());
    }
}
