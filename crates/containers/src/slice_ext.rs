/// Linear search helpers shared by every container that dereferences to a
/// slice.
///
/// ```
/// use containers::{BoundedArray, SliceExt as _};
///
/// let roster = BoundedArray::<&str, 4>::from_slice(&["boom", "zap"]).unwrap();
/// assert_eq!(roster.find(&"zap"), Some(1));
/// assert_eq!(roster.find_if(|name| name.len() > 10), None);
/// ```
pub trait SliceExt<T> {
    /// Index of the first element equal to `value`.
    fn find(&self, value: &T) -> Option<usize>
    where
        T: PartialEq;

    /// Index of the first element matching `predicate`.
    fn find_if(&self, predicate: impl FnMut(&T) -> bool) -> Option<usize>;
}

impl<T> SliceExt<T> for [T] {
    fn find(&self, value: &T) -> Option<usize>
    where
        T: PartialEq,
    {
        self.iter().position(|item| item == value)
    }

    fn find_if(&self, mut predicate: impl FnMut(&T) -> bool) -> Option<usize> {
        self.iter().position(|item| predicate(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_returns_first_match() {
        let values = [3, 1, 4, 1, 5];
        assert_eq!(values.find(&1), Some(1));
        assert_eq!(values.find(&9), None);
        assert_eq!(values.find_if(|v| *v > 3), Some(2));
    }
}
