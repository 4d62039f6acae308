use crate::IteratorId;

/// Errors returned by [`crate::TreeFlattener`], generic over the source's error type.
#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    /// A source request failed. The cache was restored to its state before the request.
    #[error("tree source request failed")]
    Source(#[source] E),
    /// The iterator was closed, or invalidated by a full reset.
    #[error("iterator {0:?} is not registered")]
    UnknownIterator(IteratorId),
}

impl<E> Error<E> {
    pub fn source_error(&self) -> Option<&E> {
        match self {
            Self::Source(e) => Some(e),
            Self::UnknownIterator(_) => None,
        }
    }
}

pub type Result<T, E> = core::result::Result<T, Error<E>>;
