use crate::error::EmptyError;

/// A value that is either present or absent, changing state only through
/// explicit calls.
///
/// ```
/// use containers::Optional;
///
/// let mut pending = Optional::empty();
/// pending.set_value(42);
/// assert_eq!(pending.attempt_move_value(), Ok(42));
/// assert!(pending.attempt_move_value().is_err());
/// ```
#[derive(Debug, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Optional<T> {
    value: Option<T>,
}

impl<T> Optional<T> {
    #[must_use]
    pub const fn empty() -> Self {
        Self { value: None }
    }

    pub const fn with_value(value: T) -> Self {
        Self { value: Some(value) }
    }

    #[must_use]
    pub const fn has_value(&self) -> bool {
        self.value.is_some()
    }

    /// Stores `value`, dropping any previous one.
    pub fn set_value(&mut self, value: T) -> &mut T {
        self.value.insert(value)
    }

    /// Drops the value, if any.
    pub fn clear(&mut self) {
        self.value = None;
    }

    /// Borrows the value without moving it out.
    pub const fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut T> {
        self.value.as_mut()
    }

    /// Returns a clone of the value.
    pub fn attempt_copy_value(&self) -> Result<T, EmptyError>
    where
        T: Clone,
    {
        self.value.clone().ok_or(EmptyError)
    }

    /// Moves the value out, leaving the optional empty.
    pub fn attempt_move_value(&mut self) -> Result<T, EmptyError> {
        self.value.take().ok_or(EmptyError)
    }

    pub fn value_or(&self, fallback: T) -> T
    where
        T: Clone,
    {
        self.value.clone().unwrap_or(fallback)
    }

    /// Runs `present` with the value, or `absent` if there is none.
    pub fn if_present_else<R>(
        &self,
        present: impl FnOnce(&T) -> R,
        absent: impl FnOnce() -> R,
    ) -> R {
        match &self.value {
            Some(value) => present(value),
            None => absent(),
        }
    }

    pub fn map_or<U>(&self, default: U, f: impl FnOnce(&T) -> U) -> U {
        self.value.as_ref().map_or(default, f)
    }

    pub fn into_option(self) -> Option<T> {
        self.value
    }
}

/// `clone_from` reuses the target's value when both sides hold one.
impl<T: Clone> Clone for Optional<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        self.value.clone_from(&source.value);
    }
}

impl<T> Default for Optional<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Option<T>> for Optional<T> {
    fn from(value: Option<T>) -> Self {
        Self { value }
    }
}

impl<T> From<Optional<T>> for Option<T> {
    fn from(optional: Optional<T>) -> Self {
        optional.value
    }
}
