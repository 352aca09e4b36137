//! Table ID allocation.
//!
//! Table IDs are five-digit numbers players read out to each other, so
//! handing them out sequentially would leak how busy the server is. The
//! allocator shuffles the whole range once and walks it with a cursor.
//!
//! ## Reuse policy
//!
//! Released IDs go to the back of a FIFO queue. The queue is only drawn
//! from once the shuffled sequence is exhausted, which keeps a just-freed
//! ID from being handed to the next room while fresh IDs remain.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

use fdtable_protocol::TableId;
use rand::seq::SliceRandom;

use crate::MatchError;

/// Smallest table ID handed out in production.
pub const MIN_TABLE_ID: i32 = 10_000;
/// Largest table ID handed out in production.
pub const MAX_TABLE_ID: i32 = 99_999;

struct Pool {
    order: Vec<i32>,
    cursor: usize,
    issued: HashSet<i32>,
    recycled: VecDeque<i32>,
}

/// Collision-free table ID source for one match.
///
/// One mutex guards the cursor, the issued set and the recycle queue.
/// Every operation is O(1) and never awaits.
pub struct TableIdAllocator {
    pool: Mutex<Pool>,
}

impl TableIdAllocator {
    /// Allocator over the production range
    /// [`MIN_TABLE_ID`]..=[`MAX_TABLE_ID`].
    pub fn new() -> Self {
        Self::with_range(MIN_TABLE_ID, MAX_TABLE_ID)
    }

    /// Allocator over `min..=max`. An empty range yields an allocator
    /// whose every `take` fails.
    pub fn with_range(min: i32, max: i32) -> Self {
        let mut order: Vec<i32> = (min..=max).collect();
        order.shuffle(&mut rand::rng());
        Self {
            pool: Mutex::new(Pool {
                order,
                cursor: 0,
                issued: HashSet::new(),
                recycled: VecDeque::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Pool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Issues an ID no other live table holds.
    ///
    /// # Errors
    /// [`MatchError::IdPoolExhausted`] when every ID in the range is
    /// currently issued.
    pub fn take(&self) -> Result<TableId, MatchError> {
        let mut pool = self.lock();

        let id = if pool.cursor < pool.order.len() {
            let id = pool.order[pool.cursor];
            pool.cursor += 1;
            id
        } else {
            pool.recycled.pop_front().ok_or(MatchError::IdPoolExhausted)?
        };

        pool.issued.insert(id);
        Ok(TableId(id))
    }

    /// Releases `id` for reuse. Releasing an ID that is not issued is a
    /// no-op, so a stray double release cannot queue it twice.
    pub fn put_back(&self, id: TableId) {
        let mut pool = self.lock();
        if pool.issued.remove(&id.0) {
            pool.recycled.push_back(id.0);
        } else {
            tracing::warn!(table_id = %id, "release of unissued table id ignored");
        }
    }

    /// Returns `true` while `id` is held by a live table.
    pub fn is_issued(&self, id: TableId) -> bool {
        self.lock().issued.contains(&id.0)
    }

    /// Number of IDs currently issued.
    pub fn issued_count(&self) -> usize {
        self.lock().issued.len()
    }
}

impl Default for TableIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}
