//!
//! # Shared-Pointer Type
//!

// Std-lib
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LockResult, RwLock, RwLockReadGuard, RwLockWriteGuard};

// Crates.io
use by_address::ByAddress;

///
/// # Ptr
///
/// Thread-safe, reference-counted shared pointer to component and library
/// data. A [Ptr] is how one component definition is shared, read-only,
/// among arbitrarily many placements: each placement clones the pointer,
/// never the pointee.
///
/// Comparison and hashing are *by address*, via the [ByAddress] wrapper,
/// so that two structurally identical components remain distinct keys,
/// and so placement-graph walks (e.g. cycle checks) can track identity
/// in a `HashSet<Ptr<_>>`.
///
/// Typical read access:
///
/// ```text
/// let guard = ptr.read()?;
/// guard.some_method();
/// ```
///
/// Write access exists solely for construction-time population; after a
/// component is published into a library or layout it is treated as
/// immutable.
///
#[derive(Debug, Default)]
pub struct Ptr<T: ?Sized>(ByAddress<Arc<RwLock<T>>>);

impl<T> Ptr<T> {
    /// Pointer constructor
    pub fn new(i: T) -> Self {
        Self(ByAddress(Arc::new(RwLock::new(i))))
    }
    /// Acquire read access to the underlying data
    pub fn read(&self) -> LockResult<RwLockReadGuard<'_, T>> {
        self.0.read()
    }
    /// Acquire write access to the underlying data
    pub fn write(&self) -> LockResult<RwLockWriteGuard<'_, T>> {
        self.0.write()
    }
}
impl<T> From<T> for Ptr<T> {
    fn from(t: T) -> Self {
        Self::new(t)
    }
}
// The manual impls below avoid a `T: Clone`/`T: Eq` bound that `derive`
// would demand; pointer clones and comparisons never touch the pointee.
impl<T> Clone for Ptr<T> {
    fn clone(&self) -> Self {
        Self(ByAddress::clone(&self.0))
    }
}
impl<T> PartialEq for Ptr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq(&other.0)
    }
}
impl<T> Eq for Ptr<T> {}
impl<T> Hash for Ptr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ptr_identity() {
        let p1 = Ptr::new(5);
        let p2 = Ptr::new(5);
        // Same value, different identity
        assert_ne!(p1, p2);

        let p3 = p1.clone();
        assert_eq!(p3, p1);
        assert_ne!(p3, p2);
    }
    #[test]
    fn ptr_read_write() {
        let p = Ptr::new(vec![1, 2]);
        p.write().unwrap().push(3);
        assert_eq!(*p.read().unwrap(), vec![1, 2, 3]);
    }
}
