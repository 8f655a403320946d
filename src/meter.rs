use crate::block::Block;
use crate::traits::{Allocator, Deallocate, DeallocateAll, Expand, Owns, Reallocate};

/// Wraps an allocator and keeps an accurate count of the bytes it currently
/// has outstanding.
///
/// The count is the emptiness oracle used by [`AllocList`](crate::AllocList):
/// a child with `bytes_used() == 0` holds no client allocation and may be
/// reclaimed. Every capability of the inner allocator is forwarded, with the
/// count adjusted on the way through.
///
/// The count tracks what callers were *handed*, not what the inner allocator
/// can reuse. A bump allocator that cannot recycle an interior block still
/// sees its count drop when that block is deallocated.
pub struct Metered<A> {
    inner: A,
    used: usize,
}

impl<A: Allocator> Metered<A> {
    pub fn new(inner: A) -> Metered<A> {
        Metered { inner, used: 0 }
    }

    /// Bytes currently outstanding.
    #[inline]
    pub fn bytes_used(&self) -> usize {
        self.used
    }

    /// Shared access to the wrapped allocator.
    #[inline]
    pub fn get_ref(&self) -> &A {
        &self.inner
    }
}

impl<A: Allocator> Allocator for Metered<A> {
    const ALIGNMENT: usize = A::ALIGNMENT;

    fn allocate(&mut self, size: usize) -> Block {
        let b = self.inner.allocate(size);
        // A failed allocation has length 0, so this is unconditional.
        self.used += b.len();
        b
    }
}

impl<A: Owns> Owns for Metered<A> {
    #[inline]
    fn owns(&self, b: Block) -> bool {
        self.inner.owns(b)
    }
}

impl<A: Expand> Expand for Metered<A> {
    unsafe fn expand(&mut self, b: &mut Block, delta: usize) -> bool {
        if unsafe { self.inner.expand(b, delta) } {
            self.used += delta;
            true
        } else {
            false
        }
    }
}

impl<A: Reallocate> Reallocate for Metered<A> {
    unsafe fn reallocate(&mut self, b: &mut Block, new_size: usize) -> bool {
        let old = b.len();
        if unsafe { self.inner.reallocate(b, new_size) } {
            self.used = self.used - old + b.len();
            true
        } else {
            false
        }
    }
}

impl<A: Deallocate> Deallocate for Metered<A> {
    unsafe fn deallocate(&mut self, b: Block) {
        debug_assert!(self.used >= b.len());
        self.used -= b.len();
        unsafe { self.inner.deallocate(b) }
    }
}

impl<A: DeallocateAll> DeallocateAll for Metered<A> {
    fn deallocate_all(&mut self) {
        self.inner.deallocate_all();
        self.used = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;

    #[test]
    fn counts_follow_the_block_lifecycle() {
        let region = Region::with_capacity(4096).unwrap();
        let mut metered = Metered::new(region);
        assert_eq!(metered.bytes_used(), 0);

        let a = metered.allocate(100);
        assert_eq!(a.len(), 100);
        assert_eq!(metered.bytes_used(), 100);

        let b = metered.allocate(50);
        assert_eq!(metered.bytes_used(), 150);

        unsafe { metered.deallocate(b) };
        assert_eq!(metered.bytes_used(), 100);

        unsafe { metered.deallocate(a) };
        assert_eq!(metered.bytes_used(), 0);
    }

    #[test]
    fn failed_allocation_counts_nothing() {
        let region = Region::with_capacity(4096).unwrap();
        let mut metered = Metered::new(region);

        let b = metered.allocate(1 << 20);
        assert!(b.is_null());
        assert_eq!(metered.bytes_used(), 0);
    }

    #[test]
    fn expand_and_reallocate_adjust_the_count() {
        let region = Region::with_capacity(4096).unwrap();
        let mut metered = Metered::new(region);

        let mut b = metered.allocate(64);
        assert!(unsafe { metered.expand(&mut b, 32) });
        assert_eq!(b.len(), 96);
        assert_eq!(metered.bytes_used(), 96);

        assert!(unsafe { metered.reallocate(&mut b, 40) });
        assert_eq!(b.len(), 40);
        assert_eq!(metered.bytes_used(), 40);
    }

    #[test]
    fn deallocate_all_zeroes_the_count() {
        let region = Region::with_capacity(4096).unwrap();
        let mut metered = Metered::new(region);

        metered.allocate(100);
        metered.allocate(200);
        metered.deallocate_all();
        assert_eq!(metered.bytes_used(), 0);
    }
}
