use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};

/// This trait abstracts the low level memory syscalls away from the rest of
/// the crate. The allocators above only care about getting and returning
/// whole buffers, not about the concrete API each kernel offers for it.
trait PlatformMemory {
    /// Request a memory region of size `len`. Returns a pointer to the new
    /// region or None if the underlying syscall fails.
    unsafe fn request_memory(len: usize) -> Option<NonNull<u8>>;

    /// Returns the memory of size `len` starting from `addr` back to the
    /// kernel.
    unsafe fn return_memory(addr: *mut u8, len: usize);

    /// Virtual memory page size of the computer in bytes.
    unsafe fn page_size() -> usize;
}

/// Entry point for the platform specific impls below.
struct Platform;

/// Cached page size, looked up once on first use. This is usually 4096 but
/// we can't know it at compile time.
static PAGE_SIZE: AtomicUsize = AtomicUsize::new(0);

/// The computer's page size. Buffer sizes handed to [`request_memory`] are
/// aligned to this.
#[inline]
pub(crate) fn page_size() -> usize {
    let cached = PAGE_SIZE.load(Relaxed);
    if cached != 0 {
        return cached;
    }
    let size = unsafe { Platform::page_size() };
    PAGE_SIZE.store(size, Relaxed);
    size
}

/// Wrapper to use [`PlatformMemory::request_memory`].
#[inline]
pub(crate) unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
    unsafe { Platform::request_memory(len) }
}

/// Wrapper to use [`PlatformMemory::return_memory`].
#[inline]
pub(crate) unsafe fn return_memory(addr: *mut u8, len: usize) {
    unsafe { Platform::return_memory(addr, len) }
}

#[cfg(unix)]
mod unix {
    use super::{Platform, PlatformMemory};

    use libc::{mmap, munmap, off_t, size_t};

    use std::os::raw::{c_int, c_void};
    use std::ptr::NonNull;

    impl PlatformMemory for Platform {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // mmap parameters.
            const ADDR: *mut c_void = std::ptr::null_mut::<c_void>();
            // Read-Write only memory.
            const PROT: c_int = libc::PROT_READ | libc::PROT_WRITE;
            const FLAGS: c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;
            const FD: c_int = -1;
            const OFFSET: off_t = 0;

            unsafe {
                let addr = mmap(ADDR, len as size_t, PROT, FLAGS, FD, OFFSET);

                match addr {
                    libc::MAP_FAILED => None,
                    addr => Some(NonNull::new_unchecked(addr).cast::<u8>()),
                }
            }
        }

        unsafe fn return_memory(addr: *mut u8, len: usize) {
            unsafe {
                munmap(addr as *mut c_void, len as size_t);
            }
        }

        unsafe fn page_size() -> usize {
            unsafe { libc::sysconf(libc::_SC_PAGE_SIZE) as usize }
        }
    }
}

#[cfg(windows)]
mod windows {
    use super::{Platform, PlatformMemory};

    use std::mem::MaybeUninit;
    use std::os::raw::c_void;
    use std::ptr::NonNull;

    use windows::Win32::System::{Memory, SystemInformation};

    impl PlatformMemory for Platform {
        unsafe fn request_memory(len: usize) -> Option<NonNull<u8>> {
            // Read-Write only.
            let protection = Memory::PAGE_READWRITE;

            let flags = Memory::MEM_RESERVE | Memory::MEM_COMMIT;

            unsafe {
                let addr = Memory::VirtualAlloc(None, len, flags, protection);

                NonNull::new(addr.cast())
            }
        }

        unsafe fn return_memory(addr: *mut u8, _len: usize) {
            unsafe {
                Memory::VirtualFree(addr as *mut c_void, 0, Memory::MEM_RELEASE);
            }
        }

        unsafe fn page_size() -> usize {
            unsafe {
                let mut system_info = MaybeUninit::uninit();
                SystemInformation::GetSystemInfo(system_info.as_mut_ptr());

                system_info.assume_init().dwPageSize as usize
            }
        }
    }
}
