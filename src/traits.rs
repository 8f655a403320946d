use crate::block::Block;

/// The one capability every allocator has: handing out memory.
///
/// The remaining capabilities ([`Owns`], [`Expand`], [`Reallocate`],
/// [`Deallocate`], [`DeallocateAll`]) are separate traits so that wrappers
/// and composites can forward exactly what their inner allocator supports
/// and nothing more.
pub trait Allocator {
    /// Alignment of every block this allocator returns, in bytes.
    /// Must be a power of two.
    const ALIGNMENT: usize;

    /// Allocates exactly `size` bytes, or returns [`Block::NULL`].
    ///
    /// A request of 0 bytes returns [`Block::NULL`].
    fn allocate(&mut self, size: usize) -> Block;
}

/// Allocators that can answer whether a block came from them.
///
/// A positive answer is authoritative. Callers combining several allocators
/// rely on at most one of them claiming any given block.
pub trait Owns: Allocator {
    fn owns(&self, b: Block) -> bool;
}

/// Allocators that can grow a block in place.
pub trait Expand: Allocator {
    /// Tries to grow `b` by `delta` bytes without moving it. On success `b`
    /// is updated and `true` is returned; on failure `b` is untouched.
    ///
    /// **SAFETY**: `b` must be a block returned by this allocator that has
    /// not been deallocated.
    unsafe fn expand(&mut self, b: &mut Block, delta: usize) -> bool;
}

/// Allocators that can resize a block, possibly moving it.
pub trait Reallocate: Allocator {
    /// Tries to resize `b` to exactly `new_size` bytes. On success `b` is
    /// updated (its pointer may have changed) and `true` is returned; on
    /// failure `b` is untouched.
    ///
    /// **SAFETY**: `b` must be a block returned by this allocator that has
    /// not been deallocated.
    unsafe fn reallocate(&mut self, b: &mut Block, new_size: usize) -> bool;
}

/// Allocators that can take individual blocks back.
pub trait Deallocate: Allocator {
    /// Returns `b` to this allocator.
    ///
    /// **SAFETY**: `b` must be a block returned by this allocator that has
    /// not already been deallocated.
    unsafe fn deallocate(&mut self, b: Block);
}

/// Allocators that can drop everything they ever handed out in one call.
pub trait DeallocateAll: Allocator {
    /// Invalidates every outstanding block at once.
    fn deallocate_all(&mut self);
}
