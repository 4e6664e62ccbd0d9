//! Block buffer limited by the memory budget.

use std::io::Read;

use rayon;

use crate::record::Record;
use crate::run::RecordReader;

/// Record buffer holding at most `block_size` bytes worth of records.
///
/// The buffer is reused between blocks: [`BlockBuffer::fill`] clears it before loading the next block.
pub struct BlockBuffer<R> {
    limit: usize,
    inner: Vec<R>,
}

impl<R: Record> BlockBuffer<R> {
    /// Creates a buffer for `block_size` bytes.
    /// `expected_records` bounds the preallocation for inputs smaller than a block.
    pub fn new(block_size: u64, expected_records: u64) -> Self {
        let limit = usize::try_from(block_size / R::WIDTH as u64).unwrap_or(usize::MAX);
        let capacity = usize::try_from(expected_records).unwrap_or(usize::MAX).min(limit);

        BlockBuffer {
            limit,
            inner: Vec::with_capacity(capacity),
        }
    }

    /// Replaces the buffer content with the next block read from `reader`.
    /// Returns the number of records loaded, zero means the input is exhausted.
    pub fn fill<Rd: Read>(&mut self, reader: &mut RecordReader<R, Rd>) -> std::io::Result<usize> {
        self.inner.clear();
        while !self.is_full() {
            match reader.read_record()? {
                Some(record) => self.inner.push(record),
                None => break,
            }
        }

        return Ok(self.inner.len());
    }

    /// Returns buffer length.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Checks if the buffer reached the limit.
    pub fn is_full(&self) -> bool {
        self.inner.len() >= self.limit
    }

    pub fn as_slice(&self) -> &[R] {
        self.inner.as_slice()
    }
}

impl<R: Record> rayon::slice::ParallelSliceMut<R> for BlockBuffer<R> {
    fn as_parallel_slice_mut(&mut self) -> &mut [R] {
        self.inner.as_mut_slice()
    }
}

#[cfg(test)]
mod test {
    use std::io;

    use rayon::slice::ParallelSliceMut;

    use super::BlockBuffer;
    use crate::run::RecordReader;

    #[test]
    fn test_block_buffer() {
        let data: Vec<u8> = [5u64, 3, 1, 4, 1, 9, 2, 6]
            .iter()
            .flat_map(|record| record.to_ne_bytes())
            .collect();
        let mut reader: RecordReader<u64, _> = RecordReader::lenient(io::Cursor::new(data));

        // 3 records fit in 24 bytes
        let mut buffer = BlockBuffer::new(24, 8);

        assert_eq!(buffer.fill(&mut reader).unwrap(), 3);
        assert_eq!(buffer.is_full(), true);
        buffer.par_sort_unstable();
        assert_eq!(buffer.as_slice(), &[1, 3, 5]);

        assert_eq!(buffer.fill(&mut reader).unwrap(), 3);
        assert_eq!(buffer.as_slice(), &[4, 1, 9]);

        assert_eq!(buffer.fill(&mut reader).unwrap(), 2);
        assert_eq!(buffer.is_full(), false);
        assert_eq!(buffer.as_slice(), &[2, 6]);

        assert_eq!(buffer.fill(&mut reader).unwrap(), 0);
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_block_buffer_rounds_down_to_whole_records() {
        let data = vec![0u8; 64];
        let mut reader: RecordReader<u32, _> = RecordReader::lenient(io::Cursor::new(data));

        let mut buffer = BlockBuffer::new(10, 100);

        assert_eq!(buffer.fill(&mut reader).unwrap(), 2);
        assert_eq!(buffer.is_full(), true);
    }
}
