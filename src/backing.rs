use std::mem;
use std::ptr;

use tracing::debug;

use crate::list::AllocList;
use crate::meter::Metered;
use crate::slot::{Slot, NONE};
use crate::traits::{Allocator, Deallocate, Expand, Owns};

/// Extra bytes folded into the factory request when a growth has to rehome
/// the slot array, so the new child has room left over for client blocks.
const HEADROOM: usize = 128;

/// Where an [`AllocList`]'s slot array lives and how it grows.
///
/// Two policies exist: [`SelfHosted`] keeps the array inside one of the
/// managed children, [`External`] keeps it in a separate bookkeeping
/// allocator. The policy also owns the end-of-life release of the array,
/// which is why teardown routes through it.
pub trait Bookkeeping<A: Allocator>: Sized {
    /// Appends one slot to the array and fills it with a factory child able
    /// to serve `at_least` bytes, linking it as the new chain root.
    fn add_allocator<F>(list: &mut AllocList<A, F, Self>, at_least: usize) -> bool
    where
        F: FnMut(usize) -> Option<A>;

    /// Releases the slot array storage. Every live child except the array
    /// host must already be gone; the composite is empty afterwards.
    fn release_slots<F>(list: &mut AllocList<A, F, Self>);
}

/// Bookkeeping policy that stores the slot array inside one of the managed
/// children. The composite then needs no memory source besides its factory.
///
/// The children must support `owns`, `expand` and `deallocate`: growing and
/// releasing the array goes through the composite's own chain, which has to
/// find the child hosting it.
pub struct SelfHosted;

/// Bookkeeping policy that stores the slot array in a separate allocator.
pub struct External<B>(pub(crate) B);

impl<A> Bookkeeping<A> for SelfHosted
where
    A: Allocator + Owns + Expand + Deallocate,
{
    fn add_allocator<F>(list: &mut AllocList<A, F, Self>, at_least: usize) -> bool
    where
        F: FnMut(usize) -> Option<A>,
    {
        let n = list.cap as usize;
        let slot_size = AllocList::<A, F, Self>::slot_size();

        // First choice: stretch the array where it is, through whichever
        // child hosts it.
        if n > 0 {
            let mut array = list.array_block();
            if unsafe { list.expand_in_chain(&mut array, slot_size) } {
                debug_assert_eq!(array.len(), (n + 1) * slot_size);
                list.cap += 1;
                unsafe { list.set_unused(n as u32) };
                debug!(slots = n + 1, "slot array expanded in place");
                return list.install_fresh(at_least);
            }
        }

        // No room where the array lives. Make one child big enough for the
        // relocated array plus the triggering request, move the slots into
        // it and let it double as the new sub-allocator.
        let need = (n + 1) * slot_size + at_least + HEADROOM;
        let Some(child) = (list.factory)(need) else {
            return false;
        };
        let mut host = Metered::new(child);
        let buf = host.allocate((n + 1) * slot_size);
        if buf.is_null() {
            return false;
        }
        debug_assert_eq!(
            buf.ptr() as usize % mem::align_of::<Slot<Metered<A>>>(),
            0,
            "child alignment too small for the slot array"
        );

        let new_slots = buf.ptr() as *mut Slot<Metered<A>>;
        let old = list.array_block();
        unsafe {
            // Slots relocate by plain copy: the chain is index-based, so
            // the links survive the move untouched.
            if n > 0 {
                ptr::copy_nonoverlapping(list.slots, new_slots, n);
            }
            list.slots = new_slots;
            list.cap = (n + 1) as u32;
            list.set_unused(n as u32);
            (*new_slots.add(n)).child.write(host);
            list.host = n as u32;

            // The previous host still claims the old array; hand it back
            // through the normal path before the new slot joins the chain,
            // so the new child cannot be mistaken for its owner.
            if n > 0 {
                list.deallocate(old);
            }
            list.link_as_root(n as u32);
        }
        debug!(
            slots = n + 1,
            bytes = need,
            "slot array relocated into a new sub-allocator"
        );
        true
    }

    fn release_slots<F>(list: &mut AllocList<A, F, Self>) {
        if list.cap == 0 {
            return;
        }
        debug_assert_ne!(list.host, NONE);
        unsafe {
            // Move the host out of the array it backs before dropping it:
            // its Drop takes the slots' storage with it.
            let host = ptr::read(list.child_ptr(list.host));
            list.slots = ptr::null_mut();
            list.cap = 0;
            list.root = NONE;
            list.host = NONE;
            drop(host);
        }
    }
}

impl<A, B> Bookkeeping<A> for External<B>
where
    A: Allocator,
    B: Allocator + Expand + Deallocate,
{
    fn add_allocator<F>(list: &mut AllocList<A, F, Self>, at_least: usize) -> bool
    where
        F: FnMut(usize) -> Option<A>,
    {
        let n = list.cap as usize;
        let slot_size = AllocList::<A, F, Self>::slot_size();

        if n > 0 {
            let mut array = list.array_block();
            if unsafe { list.bookkeeping.0.expand(&mut array, slot_size) } {
                list.cap += 1;
                unsafe { list.set_unused(n as u32) };
                return list.install_fresh(at_least);
            }
        }

        let buf = list.bookkeeping.0.allocate((n + 1) * slot_size);
        if buf.is_null() {
            return false;
        }
        debug_assert_eq!(
            buf.ptr() as usize % mem::align_of::<Slot<Metered<A>>>(),
            0,
            "bookkeeping alignment too small for the slot array"
        );

        let new_slots = buf.ptr() as *mut Slot<Metered<A>>;
        let old = list.array_block();
        unsafe {
            if n > 0 {
                ptr::copy_nonoverlapping(list.slots, new_slots, n);
            }
            list.slots = new_slots;
            list.cap = (n + 1) as u32;
            list.set_unused(n as u32);
            if n > 0 {
                list.bookkeeping.0.deallocate(old);
            }
        }
        debug!(slots = n + 1, "slot array moved within the bookkeeping allocator");
        list.install_fresh(at_least)
    }

    fn release_slots<F>(list: &mut AllocList<A, F, Self>) {
        if list.cap == 0 {
            return;
        }
        let array = list.array_block();
        list.slots = ptr::null_mut();
        list.cap = 0;
        list.root = NONE;
        unsafe { list.bookkeeping.0.deallocate(array) };
    }
}
