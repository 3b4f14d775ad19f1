//! Terminal leaf values
//!
//! A [`Leaf`] is a shared handle to any terminal value held by a tree.
//! Cloning a handle aliases the underlying allocation, so two paths holding
//! clones of the same handle reference the same object (identity, not value).
//! [`Frozen`] wraps a leaf to hide it from the numeric flatten boundary.

use std::any::{Any, TypeId};
use std::collections::hash_map::DefaultHasher;
use std::fmt::{self, Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::registry::{self, LeafClass};

/// Trait for terminal tree values
///
/// Implement this for each value type a tree may carry as a leaf, then
/// register the type with [`registry::register_leaf_type`] so the classifier
/// and descriptors know about it.
///
/// Equality and hashing are independent capabilities: every leaf type must
/// answer structural equality, while `hash_leaf` may return `None` for types
/// without a structural hash (hashing a tree containing such a leaf fails
/// with [`TreeError::Unhashable`](crate::TreeError::Unhashable)).
pub trait LeafValue: Any + Debug + Send + Sync {
    /// Upcast used for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Structural equality against another leaf value
    ///
    /// Values of different concrete types are never equal.
    fn eq_leaf(&self, other: &dyn LeafValue) -> bool;

    /// Structural hash, if the type supports one
    fn hash_leaf(&self) -> Option<u64> {
        None
    }
}

macro_rules! impl_leaf_value_hashable {
    ($($ty:ty),* $(,)?) => {$(
        impl LeafValue for $ty {
            fn as_any(&self) -> &dyn Any {
                self
            }

            fn eq_leaf(&self, other: &dyn LeafValue) -> bool {
                other.as_any().downcast_ref::<$ty>().is_some_and(|v| v == self)
            }

            fn hash_leaf(&self) -> Option<u64> {
                let mut hasher = DefaultHasher::new();
                TypeId::of::<$ty>().hash(&mut hasher);
                Hash::hash(self, &mut hasher);
                Some(hasher.finish())
            }
        }
    )*};
}

impl_leaf_value_hashable!(i32, i64, u32, u64, usize, bool, String);

macro_rules! impl_leaf_value_float {
    ($($ty:ty),* $(,)?) => {$(
        impl LeafValue for $ty {
            fn as_any(&self) -> &dyn Any {
                self
            }

            // bitwise: NaN equals NaN, -0.0 differs from 0.0
            fn eq_leaf(&self, other: &dyn LeafValue) -> bool {
                other
                    .as_any()
                    .downcast_ref::<$ty>()
                    .is_some_and(|v| v.to_bits() == self.to_bits())
            }

            fn hash_leaf(&self) -> Option<u64> {
                let mut hasher = DefaultHasher::new();
                TypeId::of::<$ty>().hash(&mut hasher);
                self.to_bits().hash(&mut hasher);
                Some(hasher.finish())
            }
        }
    )*};
}

impl_leaf_value_float!(f32, f64);

/// Shape-carrying numeric data holder
///
/// Stands in for the external array type at the flatten boundary. Carries
/// data and shape only; vectorized transforms and gradients belong to the
/// external array engine. `Array` has no structural hash; freeze one (see
/// [`Leaf::freeze`]) to make an array-bearing tree hashable.
#[derive(Clone)]
pub struct Array {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Array {
    /// Create an array from a shape and its row-major data
    ///
    /// # Panics
    /// Panics if `data.len()` disagrees with the product of `shape`.
    #[must_use]
    pub fn new(shape: impl Into<Vec<usize>>, data: impl Into<Vec<f64>>) -> Self {
        let shape = shape.into();
        let data = data.into();
        assert_eq!(
            data.len(),
            shape.iter().product::<usize>(),
            "array data length disagrees with shape"
        );
        Self { shape, data }
    }

    /// Rank-0 array holding a single value
    #[inline]
    #[must_use]
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    /// Array of zeros with the given shape
    #[must_use]
    pub fn zeros(shape: impl Into<Vec<usize>>) -> Self {
        Self::filled(shape, 0.0)
    }

    /// Array filled with a constant
    #[must_use]
    pub fn filled(shape: impl Into<Vec<usize>>, value: f64) -> Self {
        let shape = shape.into();
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![value; len],
        }
    }

    /// Shape of the array
    #[inline]
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Row-major data
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Number of elements
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the array holds no elements
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl PartialEq for Array {
    // bitwise element comparison, matching the float leaf types
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
            && self.data.len() == other.data.len()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Debug for Array {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "array(")?;
        if self.shape.is_empty() {
            write!(f, "scalar")?;
        } else {
            for (i, dim) in self.shape.iter().enumerate() {
                if i > 0 {
                    write!(f, "x")?;
                }
                write!(f, "{dim}")?;
            }
        }
        write!(f, ")")
    }
}

impl LeafValue for Array {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_leaf(&self, other: &dyn LeafValue) -> bool {
        other.as_any().downcast_ref::<Array>().is_some_and(|v| v == self)
    }
}

/// Identity of a leaf allocation
///
/// Pointer identity: two handles compare equal here only if they alias the
/// same allocation. Stable for as long as any handle is alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafId(usize);

/// Shared handle to a terminal tree value
///
/// Clones alias the underlying value; replacing a leaf in a tree rebinds the
/// path to a new handle and never mutates the value in place.
#[derive(Clone)]
pub struct Leaf(Arc<dyn LeafValue>);

impl Leaf {
    /// Wrap a value in a new leaf handle
    #[must_use]
    pub fn new<T: LeafValue>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Downcast to a concrete leaf type
    #[inline]
    #[must_use]
    pub fn downcast_ref<T: LeafValue>(&self) -> Option<&T> {
        self.0.as_any().downcast_ref()
    }

    /// Check the concrete leaf type
    #[inline]
    #[must_use]
    pub fn is<T: LeafValue>(&self) -> bool {
        self.downcast_ref::<T>().is_some()
    }

    /// `TypeId` of the concrete value
    #[inline]
    #[must_use]
    pub fn value_type_id(&self) -> TypeId {
        self.0.as_any().type_id()
    }

    /// Allocation identity of this handle
    #[inline]
    #[must_use]
    pub fn id(&self) -> LeafId {
        LeafId(Arc::as_ptr(&self.0).cast::<()>() as usize)
    }

    /// Check whether two handles alias the same allocation
    #[inline]
    #[must_use]
    pub fn same(&self, other: &Leaf) -> bool {
        self.id() == other.id()
    }

    /// Registered type tag, or `"opaque"` for unregistered types
    #[must_use]
    pub fn tag(&self) -> &'static str {
        registry::tag_of(self.value_type_id()).unwrap_or("opaque")
    }

    /// Registered boundary class; unregistered types classify as static
    #[must_use]
    pub fn class(&self) -> LeafClass {
        registry::class_of(self.value_type_id())
    }

    /// Structural hash, if the concrete type supports one
    #[inline]
    #[must_use]
    pub fn try_hash(&self) -> Option<u64> {
        self.0.hash_leaf()
    }

    /// Check whether this leaf is a frozen wrapper
    #[inline]
    #[must_use]
    pub fn is_frozen(&self) -> bool {
        self.is::<Frozen>()
    }

    /// Wrap this leaf in a [`Frozen`] sentinel
    ///
    /// Freezing an already-frozen leaf returns the handle unchanged.
    #[must_use]
    pub fn freeze(&self) -> Leaf {
        if self.is_frozen() {
            return self.clone();
        }
        let descriptor = FrozenDescriptor {
            tag: self.tag(),
            summary: format!("{self:?}"),
        };
        Leaf::new(Frozen {
            inner: self.clone(),
            descriptor,
        })
    }

    /// Unwrap a [`Frozen`] sentinel back to the original leaf
    ///
    /// The returned handle aliases the originally wrapped allocation.
    /// Thawing an unfrozen leaf returns the handle unchanged.
    #[must_use]
    pub fn thaw(&self) -> Leaf {
        match self.downcast_ref::<Frozen>() {
            Some(frozen) => frozen.inner.clone(),
            None => self.clone(),
        }
    }
}

impl PartialEq for Leaf {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_leaf(other.0.as_ref())
    }
}

impl Debug for Leaf {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

/// Sentinel wrapping a leaf excluded from numeric traversal
///
/// Holds the original handle plus a reconstruction descriptor. The flatten
/// boundary embeds frozen leaves in the structure descriptor instead of the
/// flat leaf sequence, so the external numeric engine never sees them.
#[derive(Clone)]
pub struct Frozen {
    inner: Leaf,
    descriptor: FrozenDescriptor,
}

/// Reconstruction descriptor carried by a frozen leaf
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrozenDescriptor {
    /// Registered tag of the wrapped type
    pub tag: &'static str,
    /// Rendered shape/value summary of the wrapped value
    pub summary: String,
}

impl Frozen {
    /// The wrapped leaf
    #[inline]
    #[must_use]
    pub fn inner(&self) -> &Leaf {
        &self.inner
    }

    /// Reconstruction descriptor
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &FrozenDescriptor {
        &self.descriptor
    }
}

impl Debug for Frozen {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{:?}", self.inner)
    }
}

impl LeafValue for Frozen {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq_leaf(&self, other: &dyn LeafValue) -> bool {
        other
            .as_any()
            .downcast_ref::<Frozen>()
            .is_some_and(|v| v.inner == self.inner)
    }

    // the descriptor is a function of the wrapped value, so equal frozen
    // leaves hash equal even when the wrapped type itself cannot hash
    fn hash_leaf(&self) -> Option<u64> {
        let mut hasher = DefaultHasher::new();
        TypeId::of::<Frozen>().hash(&mut hasher);
        self.descriptor.hash(&mut hasher);
        Some(hasher.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leaf_equality_is_structural() {
        let a = Leaf::new(3.5_f64);
        let b = Leaf::new(3.5_f64);
        assert_eq!(a, b);
        assert!(!a.same(&b));
    }

    #[test]
    fn leaf_equality_distinguishes_types() {
        let a = Leaf::new(1_i64);
        let b = Leaf::new(1_i32);
        assert_ne!(a, b);
    }

    #[test]
    fn leaf_clone_aliases() {
        let a = Leaf::new(Array::zeros([2, 2]));
        let b = a.clone();
        assert!(a.same(&b));
        assert_eq!(a, b);
    }

    #[test]
    fn leaf_downcast() {
        let leaf = Leaf::new("hello".to_string());
        assert_eq!(leaf.downcast_ref::<String>().unwrap(), "hello");
        assert!(leaf.downcast_ref::<i64>().is_none());
    }

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(Leaf::new(f64::NAN), Leaf::new(f64::NAN));
        assert_ne!(Leaf::new(0.0_f64), Leaf::new(-0.0_f64));
    }

    #[test]
    fn scalar_leaves_hash() {
        assert!(Leaf::new(1_i64).try_hash().is_some());
        assert!(Leaf::new(2.5_f64).try_hash().is_some());
        assert!(Leaf::new(true).try_hash().is_some());
    }

    #[test]
    fn equal_leaves_hash_equal() {
        let a = Leaf::new("x".to_string());
        let b = Leaf::new("x".to_string());
        assert_eq!(a.try_hash(), b.try_hash());
    }

    #[test]
    fn array_has_no_structural_hash() {
        assert!(Leaf::new(Array::zeros([3])).try_hash().is_none());
    }

    #[test]
    fn array_shape_mismatch_panics() {
        let result = std::panic::catch_unwind(|| Array::new([2, 2], vec![1.0]));
        assert!(result.is_err());
    }

    #[test]
    fn freeze_wraps_and_thaw_restores_identity() {
        let original = Leaf::new(Array::filled([2], 1.0));
        let frozen = original.freeze();
        assert!(frozen.is_frozen());
        let thawed = frozen.thaw();
        assert!(thawed.same(&original));
    }

    #[test]
    fn freeze_is_idempotent() {
        let leaf = Leaf::new(1_i64);
        let once = leaf.freeze();
        let twice = once.freeze();
        assert!(once.same(&twice));
    }

    #[test]
    fn thaw_on_unfrozen_is_identity() {
        let leaf = Leaf::new(1_i64);
        assert!(leaf.thaw().same(&leaf));
    }

    #[test]
    fn frozen_restores_hashability() {
        let leaf = Leaf::new(Array::zeros([4]));
        assert!(leaf.try_hash().is_none());
        assert!(leaf.freeze().try_hash().is_some());
    }

    #[test]
    fn frozen_equality_follows_inner() {
        let a = Leaf::new(Array::filled([2], 2.0)).freeze();
        let b = Leaf::new(Array::filled([2], 2.0)).freeze();
        let c = Leaf::new(Array::filled([2], 3.0)).freeze();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn frozen_debug_uses_sigil() {
        let leaf = Leaf::new(7_i64).freeze();
        assert_eq!(format!("{leaf:?}"), "#7");
    }

    #[test]
    fn frozen_descriptor_carries_tag() {
        let leaf = Leaf::new(Array::zeros([2, 3])).freeze();
        let frozen = leaf.downcast_ref::<Frozen>().unwrap();
        assert_eq!(frozen.descriptor().tag, "array");
        assert_eq!(frozen.descriptor().summary, "array(2x3)");
    }
}
