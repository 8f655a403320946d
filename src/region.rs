use std::ptr::NonNull;

use crate::block::Block;
use crate::kernel;
use crate::traits::{Allocator, Deallocate, DeallocateAll, Expand, Owns, Reallocate};
use crate::utils::align_up;

/// A bump allocator over one contiguous buffer requested from the kernel.
///
/// Allocation just advances a cursor, so it is as cheap as it gets. The
/// price is that individual blocks can only be taken back when they are the
/// most recent allocation; anything else stays occupied until
/// [`deallocate_all`](DeallocateAll::deallocate_all) resets the whole
/// region.
///
/// ```text
/// +---------------------------------------------------+
/// |  Block  |  Block  |   Block   |                   |
/// +---------------------------------------------------+
/// ^                               ^                   ^
/// base                            cur                 cap
/// ```
///
/// This is the kind of child a composite allocator wants: a single cheap
/// buffer with a well defined owner, an exact `owns` answer and a trivial
/// wholesale reset.
pub struct Region {
    /// Start of the buffer.
    base: NonNull<u8>,
    /// Buffer length in bytes.
    cap: usize,
    /// Bump cursor, as an offset from `base`.
    cur: usize,
}

impl Region {
    /// Requests a buffer of at least `bytes` from the kernel and builds a
    /// region over it. The buffer size is rounded up to the page size.
    /// Returns `None` when the kernel refuses the memory.
    pub fn with_capacity(bytes: usize) -> Option<Region> {
        let cap = align_up(bytes.max(1), kernel::page_size());
        let base = unsafe { kernel::request_memory(cap)? };

        Some(Region { base, cap, cur: 0 })
    }

    /// Total buffer size in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Bytes not yet claimed by the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.cap - self.cur
    }

    /// Whether `b` is the most recent allocation, the only one the cursor
    /// can be rewound over.
    #[inline]
    fn is_last(&self, b: Block) -> bool {
        b.end() == self.base.as_ptr().wrapping_add(self.cur)
    }
}

impl Allocator for Region {
    const ALIGNMENT: usize = 16;

    fn allocate(&mut self, size: usize) -> Block {
        if size == 0 {
            return Block::NULL;
        }

        let start = align_up(self.cur, Self::ALIGNMENT);
        let Some(end) = start.checked_add(size) else {
            return Block::NULL;
        };
        if end > self.cap {
            return Block::NULL;
        }

        self.cur = end;
        Block::new(unsafe { self.base.as_ptr().add(start) }, size)
    }
}

impl Owns for Region {
    fn owns(&self, b: Block) -> bool {
        let addr = b.ptr() as usize;
        let base = self.base.as_ptr() as usize;

        !b.is_null() && addr >= base && addr < base + self.cap
    }
}

impl Expand for Region {
    unsafe fn expand(&mut self, b: &mut Block, delta: usize) -> bool {
        if delta == 0 {
            return true;
        }
        // Only the block right under the cursor can grow in place.
        if b.is_null() || !self.is_last(*b) {
            return false;
        }
        let Some(end) = self.cur.checked_add(delta) else {
            return false;
        };
        if end > self.cap {
            return false;
        }

        self.cur = end;
        *b = b.with_len(b.len() + delta);
        true
    }
}

impl Reallocate for Region {
    unsafe fn reallocate(&mut self, b: &mut Block, new_size: usize) -> bool {
        if new_size == b.len() {
            return true;
        }
        if b.is_null() {
            return false;
        }

        if new_size < b.len() {
            // Shrinking works anywhere; the cursor only moves when the block
            // sits right under it.
            if self.is_last(*b) {
                self.cur -= b.len() - new_size;
            }
            *b = b.with_len(new_size);
            return true;
        }

        unsafe { self.expand(b, new_size - b.len()) }
    }
}

impl Deallocate for Region {
    unsafe fn deallocate(&mut self, b: Block) {
        // Rewind over the most recent allocation. Interior blocks stay
        // occupied until deallocate_all.
        if self.is_last(b) {
            self.cur = b.ptr() as usize - self.base.as_ptr() as usize;
        }
    }
}

impl DeallocateAll for Region {
    fn deallocate_all(&mut self) {
        self.cur = 0;
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        unsafe { kernel::return_memory(self.base.as_ptr(), self.cap) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_is_page_rounded() {
        let region = Region::with_capacity(100).unwrap();
        assert!(region.capacity() >= 100);
        assert_eq!(region.capacity() % kernel::page_size(), 0);
    }

    #[test]
    fn blocks_are_exact_and_aligned() {
        let mut region = Region::with_capacity(4096).unwrap();

        let a = region.allocate(10);
        assert_eq!(a.len(), 10);
        assert_eq!(a.ptr() as usize % Region::ALIGNMENT, 0);

        let b = region.allocate(30);
        assert_eq!(b.ptr() as usize % Region::ALIGNMENT, 0);
        assert!(b.ptr() as usize >= a.end() as usize);
    }

    #[test]
    fn zero_sized_requests_fail() {
        let mut region = Region::with_capacity(4096).unwrap();
        assert!(region.allocate(0).is_null());
    }

    #[test]
    fn exhaustion_returns_null() {
        let mut region = Region::with_capacity(4096).unwrap();
        let cap = region.capacity();

        let all = region.allocate(cap);
        assert_eq!(all.len(), cap);
        assert!(region.allocate(1).is_null());

        unsafe { region.deallocate(all) };
        assert!(!region.allocate(1).is_null());
    }

    #[test]
    fn owns_is_an_address_range_test() {
        let mut region = Region::with_capacity(4096).unwrap();
        let other = Region::with_capacity(4096).unwrap();

        let b = region.allocate(100);
        assert!(region.owns(b));
        assert!(!other.owns(b));
        assert!(!region.owns(Block::NULL));
    }

    #[test]
    fn only_the_last_block_expands() {
        let mut region = Region::with_capacity(4096).unwrap();

        let mut first = region.allocate(100);
        assert!(unsafe { region.expand(&mut first, 28) });
        assert_eq!(first.len(), 128);

        let _second = region.allocate(100);
        assert!(!unsafe { region.expand(&mut first, 1) });
        assert_eq!(first.len(), 128);
    }

    #[test]
    fn deallocate_rewinds_only_the_last_block() {
        let mut region = Region::with_capacity(4096).unwrap();

        let first = region.allocate(100);
        let second = region.allocate(100);

        // Interior free: no rewind, the space comes back at reset.
        unsafe { region.deallocate(first) };
        let third = region.allocate(100);
        assert!(third.ptr() as usize > second.ptr() as usize);

        // Last free: the cursor rewinds and the address is reused.
        unsafe { region.deallocate(third) };
        let fourth = region.allocate(100);
        assert_eq!(fourth.ptr(), third.ptr());
    }

    #[test]
    fn reallocate_shrinks_anywhere_grows_only_at_the_end() {
        let mut region = Region::with_capacity(4096).unwrap();

        let mut first = region.allocate(200);
        let _second = region.allocate(16);

        assert!(unsafe { region.reallocate(&mut first, 100) });
        assert_eq!(first.len(), 100);

        assert!(!unsafe { region.reallocate(&mut first, 300) });
        assert_eq!(first.len(), 100);
    }

    #[test]
    fn deallocate_all_resets_the_cursor() {
        let mut region = Region::with_capacity(4096).unwrap();

        let first = region.allocate(1000);
        region.allocate(1000);
        region.deallocate_all();

        let again = region.allocate(1000);
        assert_eq!(again.ptr(), first.ptr());
    }
}
