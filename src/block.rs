use std::ptr;

/// A chunk of memory handed out by an allocator: a raw pointer plus the
/// number of bytes behind it.
///
/// `Block` is the currency every allocator in this crate trades in. It is
/// plain old data, freely copyable, and it carries no ownership by itself;
/// whoever received it from `allocate` is responsible for eventually handing
/// it back.
///
/// Failure is encoded in-band: an allocator that cannot satisfy a request
/// returns [`Block::NULL`] instead of an error type. This keeps the failure
/// shape identical across every layer of a composite. A child failing and
/// the composite failing look exactly the same to the caller.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Block {
    ptr: *mut u8,
    len: usize,
}

impl Block {
    /// The failure sentinel: null pointer, zero length.
    pub const NULL: Block = Block {
        ptr: ptr::null_mut(),
        len: 0,
    };

    /// Builds a block from raw parts. `ptr` may be null only when `len` is 0.
    #[inline]
    pub fn new(ptr: *mut u8, len: usize) -> Block {
        debug_assert!(!ptr.is_null() || len == 0);
        Block { ptr, len }
    }

    /// Start address of the block.
    #[inline]
    pub fn ptr(&self) -> *mut u8 {
        self.ptr
    }

    /// Length of the block in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether this is the failure sentinel.
    #[inline]
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Address one past the last byte of the block.
    #[inline]
    pub(crate) fn end(&self) -> *mut u8 {
        self.ptr.wrapping_add(self.len)
    }

    /// Same block with a different length. Used by in-place resizing.
    #[inline]
    pub(crate) fn with_len(&self, len: usize) -> Block {
        Block { ptr: self.ptr, len }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_block_is_null() {
        assert!(Block::NULL.is_null());
        assert_eq!(Block::NULL.len(), 0);
    }

    #[test]
    fn end_points_past_block() {
        let mut buf = [0u8; 16];
        let b = Block::new(buf.as_mut_ptr(), 16);
        assert!(!b.is_null());
        assert_eq!(b.end() as usize - b.ptr() as usize, 16);
    }
}
