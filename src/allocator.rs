//! The memory source a table draws its bucket array and entry arena from.

use core::alloc::Layout;
use core::ptr::NonNull;

use crate::error::Error;

/// An allocator could not satisfy a request.
///
/// Carries no details; the table attaches the requested layout when it turns
/// this into an [`Error`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, thiserror::Error)]
#[error("memory allocation failed")]
pub struct AllocError;

impl AllocError {
    /// Converts into the crate error for a request of `layout`.
    pub fn with_layout(self, layout: Layout) -> Error {
        Error::AllocationFailure { layout }
    }
}

/// A source of raw memory blocks.
///
/// Tables only ever request layouts with a non-zero size.
///
/// # Safety
///
/// A block returned by [`allocate`](Allocator::allocate) must be valid for
/// reads and writes of `layout.size()` bytes, aligned to `layout.align()`, and
/// stay valid until it is passed to [`deallocate`](Allocator::deallocate) on
/// this allocator or a clone of it. Moving the allocator must not invalidate
/// its blocks.
pub unsafe trait Allocator {
    /// Allocates a block fitting `layout`.
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError>;

    /// Releases a block.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this allocator with the
    /// same `layout`, and must not have been deallocated already.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        (**self).allocate(layout)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: Forwarded contract.
        unsafe { (**self).deallocate(ptr, layout) }
    }
}

/// The global heap, via [`alloc::alloc::alloc`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Global;

// SAFETY: Blocks come straight from the global allocator, which upholds the
// contract for any non-zero-sized layout.
unsafe impl Allocator for Global {
    #[inline]
    fn allocate(&self, layout: Layout) -> Result<NonNull<u8>, AllocError> {
        debug_assert!(layout.size() != 0);
        // SAFETY: Tables never request zero-sized blocks.
        let ptr = unsafe { alloc::alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(AllocError)
    }

    #[inline]
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: Caller guarantees `ptr` came from `allocate` with `layout`.
        unsafe { alloc::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}
