// crates/partner-sync-core/src/runtime/chunk.rs
// ============================================================================
// Module: Chunk Dispatcher
// Description: Contiguous fixed-size partitioning of record batches.
// Purpose: Bound downstream load by applying batches one chunk at a time.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`ChunkRanges`] yields `[start, end)` ranges that partition `[0, total)` in
//! ascending order. [`for_each_chunk`] drives a callback over those ranges and
//! stops at the first failure, reporting the range that failed.
//! Invariants:
//! - Ranges never overlap and leave no gaps.
//! - A zero total yields no ranges.
//! - Chunks already applied before a failure are not rolled back.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ops::Range;

use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Chunk dispatch errors.
#[derive(Debug, Error)]
pub enum ChunkError<E>
where
    E: std::error::Error + 'static,
{
    /// Chunk size must be positive.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// A chunk failed; later chunks were not attempted.
    #[error("chunk [{start}, {end}) failed: {source}", start = .range.start, end = .range.end)]
    Failed {
        /// Range of the failing chunk.
        range: Range<usize>,
        /// Underlying failure.
        #[source]
        source: E,
    },
}

// ============================================================================
// SECTION: Ranges
// ============================================================================

/// Iterator over contiguous chunk ranges.
#[derive(Debug, Clone)]
pub struct ChunkRanges {
    /// Total number of records.
    total: usize,
    /// Maximum records per chunk.
    chunk_size: usize,
    /// Start of the next chunk.
    next: usize,
}

impl ChunkRanges {
    /// Creates a chunk range iterator; `None` when `chunk_size` is zero.
    #[must_use]
    pub const fn new(total: usize, chunk_size: usize) -> Option<Self> {
        if chunk_size == 0 {
            return None;
        }
        Some(Self {
            total,
            chunk_size,
            next: 0,
        })
    }

    /// Returns the number of chunks the iterator yields in total.
    #[must_use]
    pub const fn chunk_count(&self) -> usize {
        self.total.div_ceil(self.chunk_size)
    }
}

impl Iterator for ChunkRanges {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }
        let start = self.next;
        let end = start.saturating_add(self.chunk_size).min(self.total);
        self.next = end;
        Some(start .. end)
    }
}

// ============================================================================
// SECTION: Dispatch
// ============================================================================

/// Invokes `apply` once per chunk of `[0, total)` in ascending order.
///
/// Returns the number of chunks applied.
///
/// # Errors
///
/// Returns [`ChunkError::InvalidChunkSize`] for a zero chunk size and
/// [`ChunkError::Failed`] with the failing range on the first callback error.
pub fn for_each_chunk<E, F>(
    total: usize,
    chunk_size: usize,
    mut apply: F,
) -> Result<usize, ChunkError<E>>
where
    E: std::error::Error + 'static,
    F: FnMut(Range<usize>) -> Result<(), E>,
{
    let mut applied = 0;
    let ranges = ChunkRanges::new(total, chunk_size).ok_or(ChunkError::InvalidChunkSize)?;
    for range in ranges {
        apply(range.clone()).map_err(|source| ChunkError::Failed {
            range,
            source,
        })?;
        applied += 1;
    }
    Ok(applied)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
