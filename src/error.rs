//! Error types for fallible table operations.

use core::alloc::Layout;

/// Errors reported by the fallible operations of
/// [`HashTable`](crate::HashTable), [`HashMap`](crate::HashMap) and
/// [`HashSet`](crate::HashSet).
///
/// A failed operation leaves the collection exactly as it was before the
/// call.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The allocator could not satisfy a request.
    #[error("allocation of {} bytes (align {}) failed", .layout.size(), .layout.align())]
    AllocationFailure {
        /// The layout that was requested.
        layout: Layout,
    },

    /// A size computation exceeded `isize::MAX` bytes.
    #[error("capacity overflow")]
    CapacityOverflow,
}

impl Error {
    /// The layout of the failed request, if this is an allocation failure.
    pub fn layout(&self) -> Option<Layout> {
        match self {
            Error::AllocationFailure { layout } => Some(*layout),
            Error::CapacityOverflow => None,
        }
    }
}

impl From<core::alloc::LayoutError> for Error {
    fn from(_: core::alloc::LayoutError) -> Self {
        Error::CapacityOverflow
    }
}
