/*!

Row-block domain decomposition. Block `i` of `T` owns rows
`[i * ceil(N / T), min((i + 1) * ceil(N / T), N))`; when `T` does not divide `N` the trailing
blocks may own no rows at all. Each block also carries a halo of `radius` rows on either side,
clamped to the grid, which a worker reads but never writes.

*/

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub index: usize,
    /// First owned row.
    pub start: usize,
    /// One past the last owned row.
    pub end: usize,
    pub ghost_start: usize,
    pub ghost_end: usize,
}

impl Block {
    #[must_use]
    pub fn owned_rows(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Owned rows plus halo.
    #[must_use]
    pub fn halo_rows(&self) -> Range<usize> {
        self.ghost_start..self.ghost_end
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.end.saturating_sub(self.start)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partitioner {
    size: usize,
    workers: usize,
    radius: usize,
}

impl Partitioner {
    /// `workers` is clamped to at least one.
    #[must_use]
    pub fn new(size: usize, workers: usize, radius: usize) -> Self {
        Partitioner {
            size,
            workers: workers.max(1),
            radius,
        }
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// `ceil(N / T)`
    #[must_use]
    pub fn block_height(&self) -> usize {
        self.size.div_ceil(self.workers)
    }

    #[must_use]
    pub fn block(&self, index: usize) -> Block {
        let height = self.block_height();
        let start = (index * height).min(self.size);
        let end = ((index + 1) * height).min(self.size);
        let (ghost_start, ghost_end) = if start < end {
            (start.saturating_sub(self.radius), (end + self.radius).min(self.size))
        } else {
            (start, end)
        };
        Block {
            index,
            start,
            end,
            ghost_start,
            ghost_end,
        }
    }

    #[must_use]
    pub fn blocks(&self) -> Vec<Block> {
        (0..self.workers).map(|index| self.block(index)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_covers(size: usize, workers: usize) {
        let blocks = Partitioner::new(size, workers, 1).blocks();
        assert_eq!(blocks.len(), workers);
        let mut next = 0;
        for block in &blocks {
            assert!(block.start <= block.end);
            if !block.is_empty() {
                assert_eq!(block.start, next, "gap or overlap at block {}", block.index);
                next = block.end;
            }
        }
        assert_eq!(next, size);
        assert_eq!(blocks.iter().map(Block::row_count).sum::<usize>(), size);
    }

    #[test]
    fn owned_ranges_cover_grid_exactly() {
        for size in [1, 2, 7, 10, 64, 100] {
            for workers in [1, 2, 3, 4, 7, 8, 16] {
                assert_covers(size, workers);
            }
        }
    }

    #[test]
    fn uneven_split() {
        let blocks = Partitioner::new(10, 4, 1).blocks();
        let owned: Vec<_> = blocks.iter().map(Block::owned_rows).collect();
        assert_eq!(owned, vec![0..3, 3..6, 6..9, 9..10]);
    }

    #[test]
    fn more_workers_than_rows_yields_empty_blocks() {
        let blocks = Partitioner::new(3, 5, 1).blocks();
        assert_eq!(blocks[2].owned_rows(), 2..3);
        assert!(blocks[3].is_empty());
        assert!(blocks[4].is_empty());
        assert_eq!(blocks[4].halo_rows().len(), 0);
    }

    #[test]
    fn halo_is_clamped_to_grid() {
        let partitioner = Partitioner::new(10, 2, 2);
        assert_eq!(partitioner.block(0).halo_rows(), 0..7);
        assert_eq!(partitioner.block(1).halo_rows(), 3..10);

        let single = Partitioner::new(10, 1, 3).block(0);
        assert_eq!(single.owned_rows(), 0..10);
        assert_eq!(single.halo_rows(), 0..10);
    }

    #[test]
    fn zero_workers_means_one() {
        let partitioner = Partitioner::new(4, 0, 1);
        assert_eq!(partitioner.workers(), 1);
        assert_eq!(partitioner.block(0).owned_rows(), 0..4);
    }
}
