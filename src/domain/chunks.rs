//! Fixed-size chunking of binary objects.
//!
//! The same layout arithmetic drives both directions: splitting a local
//! object for upload, and computing which byte range of a remote object a
//! chunk index covers when reading it back.

use bytes::Bytes;
use std::ops::Range;

/// Default chunk size: 1 MiB.
pub const DEFAULT_CHUNK_SIZE: u64 = 1024 * 1024;

/// One contiguous byte range of a larger object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// 0-based position in the object.
    pub index: u64,
    pub bytes: Bytes,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// How an object of `total_size` bytes divides into chunks of `chunk_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkLayout {
    pub total_size: u64,
    pub chunk_size: u64,
}

impl ChunkLayout {
    /// A zero chunk size is bumped to 1 so every layout is well formed.
    pub fn new(total_size: u64, chunk_size: u64) -> Self {
        Self {
            total_size,
            chunk_size: chunk_size.max(1),
        }
    }

    /// `ceil(total_size / chunk_size)`
    pub fn chunk_count(&self) -> u64 {
        self.total_size.div_ceil(self.chunk_size)
    }

    /// Byte range covered by `index`, or `None` past the last chunk.
    pub fn range(&self, index: u64) -> Option<Range<u64>> {
        if index >= self.chunk_count() {
            return None;
        }
        let start = index * self.chunk_size;
        let end = (start + self.chunk_size).min(self.total_size);
        Some(start..end)
    }

    /// Length in bytes of chunk `index` (0 when out of range).
    pub fn chunk_len(&self, index: u64) -> u64 {
        self.range(index).map(|r| r.end - r.start).unwrap_or(0)
    }
}

/// Splits an in-memory object into [`Chunk`]s.
///
/// Splitting is lazy and zero-copy: each chunk is a slice of the shared
/// buffer. Calling [`ChunkSplitter::chunks`] again restarts from index 0.
#[derive(Debug, Clone)]
pub struct ChunkSplitter {
    data: Bytes,
    layout: ChunkLayout,
}

impl ChunkSplitter {
    pub fn new(data: Bytes, chunk_size: u64) -> Self {
        let layout = ChunkLayout::new(data.len() as u64, chunk_size);
        Self { data, layout }
    }

    pub fn layout(&self) -> ChunkLayout {
        self.layout
    }

    pub fn chunk_count(&self) -> u64 {
        self.layout.chunk_count()
    }

    pub fn chunk(&self, index: u64) -> Option<Chunk> {
        let range = self.layout.range(index)?;
        Some(Chunk {
            index,
            bytes: self.data.slice(range.start as usize..range.end as usize),
        })
    }

    pub fn chunks(&self) -> Chunks {
        Chunks {
            splitter: self.clone(),
            next: 0,
        }
    }
}

impl IntoIterator for &ChunkSplitter {
    type Item = Chunk;
    type IntoIter = Chunks;

    fn into_iter(self) -> Chunks {
        self.chunks()
    }
}

/// Iterator over the chunks of a [`ChunkSplitter`].
#[derive(Debug, Clone)]
pub struct Chunks {
    splitter: ChunkSplitter,
    next: u64,
}

impl Iterator for Chunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let chunk = self.splitter.chunk(self.next)?;
        self.next += 1;
        Some(chunk)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.splitter.chunk_count().saturating_sub(self.next) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Chunks {}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(len: usize) -> Bytes {
        Bytes::from((0..len).map(|i| (i % 251) as u8).collect::<Vec<u8>>())
    }

    #[test]
    fn test_uneven_split() {
        let splitter = ChunkSplitter::new(object(2_500_000), 1_000_000);
        let sizes: Vec<usize> = splitter.chunks().map(|c| c.len()).collect();
        assert_eq!(sizes, vec![1_000_000, 1_000_000, 500_000]);
    }

    #[test]
    fn test_exact_multiple_has_full_last_chunk() {
        let splitter = ChunkSplitter::new(object(3_000), 1_000);
        assert_eq!(splitter.chunk_count(), 3);
        assert_eq!(splitter.chunk(2).unwrap().len(), 1_000);
        assert!(splitter.chunk(3).is_none());
    }

    #[test]
    fn test_empty_object_has_no_chunks() {
        let splitter = ChunkSplitter::new(Bytes::new(), DEFAULT_CHUNK_SIZE);
        assert_eq!(splitter.chunk_count(), 0);
        assert_eq!(splitter.chunks().count(), 0);
    }

    #[test]
    fn test_ranges_are_contiguous_and_cover_object() {
        for (size, chunk_size) in [(1u64, 1u64), (7, 3), (10, 10), (1023, 64), (4096, 4095)] {
            let layout = ChunkLayout::new(size, chunk_size);
            let mut expected_start = 0;
            for index in 0..layout.chunk_count() {
                let range = layout.range(index).unwrap();
                assert_eq!(range.start, expected_start);
                assert!(range.end > range.start);
                expected_start = range.end;
            }
            assert_eq!(expected_start, size);
            assert_eq!(layout.chunk_count(), size.div_ceil(chunk_size));
        }
    }

    #[test]
    fn test_chunks_reassemble_to_original() {
        let data = object(10_001);
        let splitter = ChunkSplitter::new(data.clone(), 4_096);
        let joined: Vec<u8> = splitter
            .chunks()
            .flat_map(|c| c.bytes.to_vec())
            .collect();
        assert_eq!(joined, data.to_vec());
    }

    #[test]
    fn test_iteration_restarts() {
        let splitter = ChunkSplitter::new(object(5), 2);
        let first: Vec<u64> = splitter.chunks().map(|c| c.index).collect();
        let second: Vec<u64> = (&splitter).into_iter().map(|c| c.index).collect();
        assert_eq!(first, vec![0, 1, 2]);
        assert_eq!(first, second);
        assert_eq!(splitter.chunks().len(), 3);
    }

    #[test]
    fn test_remote_layout_matches_splitter() {
        let layout = ChunkLayout::new(3_670_016, DEFAULT_CHUNK_SIZE);
        assert_eq!(layout.chunk_count(), 4);
        assert_eq!(layout.range(3), Some(3_145_728..3_670_016));
        assert_eq!(layout.chunk_len(3), 524_288);
        assert_eq!(layout.chunk_len(4), 0);
    }
}
