use core::fmt;

/// An index at or past the end of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("index out of bounds: index={index}, len={len}")]
pub struct IndexOutOfBounds {
    pub index: usize,
    pub len: usize,
}

impl IndexOutOfBounds {
    pub(crate) fn check(index: usize, len: usize) -> Result<(), Self> {
        if index < len {
            Ok(())
        } else {
            Err(Self { index, len })
        }
    }
}

/// The allocator refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("allocation failed")]
pub struct AllocError;

/// The container holds no value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("no value present")]
pub struct EmptyError;

/// The container could not make room for an element.
///
/// A bounded container is full, or a growable one failed to allocate. The
/// rejected element is handed back.
#[derive(Clone, Copy, PartialEq, Eq, derive_more::Display)]
#[display("insufficient capacity")]
pub struct CapacityError<T = ()> {
    element: T,
}

impl<T> CapacityError<T> {
    #[must_use]
    pub const fn new(element: T) -> Self {
        Self { element }
    }

    /// Returns the rejected element.
    pub fn element(self) -> T {
        self.element
    }

    /// Drops the element, keeping only the error.
    #[must_use]
    pub fn simplify(self) -> CapacityError {
        CapacityError { element: () }
    }
}

impl<T> fmt::Debug for CapacityError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CapacityError: insufficient capacity")
    }
}

impl<T> core::error::Error for CapacityError<T> {}

/// Failure of an `insert` at an arbitrary position.
#[derive(Clone, PartialEq, Eq, derive_more::Display, derive_more::IsVariant)]
pub enum InsertError<T> {
    #[display("{source}")]
    OutOfBounds { element: T, source: IndexOutOfBounds },
    #[display("{_0}")]
    Capacity(CapacityError<T>),
}

impl<T> InsertError<T> {
    /// Returns the rejected element.
    pub fn element(self) -> T {
        match self {
            Self::OutOfBounds { element, .. } => element,
            Self::Capacity(err) => err.element(),
        }
    }
}

impl<T> fmt::Debug for InsertError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfBounds { source, .. } => {
                f.debug_struct("OutOfBounds").field("source", source).finish_non_exhaustive()
            }
            Self::Capacity(err) => f.debug_tuple("Capacity").field(err).finish(),
        }
    }
}

impl<T> core::error::Error for InsertError<T> {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::OutOfBounds { source, .. } => Some(source),
            Self::Capacity(_) => None,
        }
    }
}
