//! Leaf-type classification registry
//!
//! Explicit table keyed by `TypeId` deciding how the numeric boundary treats
//! each leaf type: [`LeafClass::Numeric`] leaves are visible to the external
//! array/gradient traversal, [`LeafClass::Static`] leaves are auxiliary and
//! frozen by the default classifier predicate. The table is populated with
//! the built-in leaf types at first touch; custom leaf types register through
//! [`register_leaf_type`] at process start.

use std::any::TypeId;
use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::leaf::{Array, Frozen, LeafValue};

/// Boundary classification of a leaf type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafClass {
    /// Visible to the external numeric/gradient traversal
    Numeric,
    /// Auxiliary/static; hidden by the default classifier predicate
    Static,
}

/// Registered metadata for a leaf type
#[derive(Debug, Clone, Copy)]
pub struct LeafTypeInfo {
    /// Short tag used in descriptors and diagnostics
    pub tag: &'static str,
    /// Boundary classification
    pub class: LeafClass,
}

static REGISTRY: Lazy<RwLock<HashMap<TypeId, LeafTypeInfo>>> =
    Lazy::new(|| RwLock::new(builtins()));

fn builtins() -> HashMap<TypeId, LeafTypeInfo> {
    let mut table = HashMap::new();
    let mut put = |type_id, tag, class| {
        table.insert(type_id, LeafTypeInfo { tag, class });
    };

    put(TypeId::of::<f64>(), "f64", LeafClass::Numeric);
    put(TypeId::of::<f32>(), "f32", LeafClass::Numeric);
    put(TypeId::of::<Array>(), "array", LeafClass::Numeric);

    put(TypeId::of::<i32>(), "i32", LeafClass::Static);
    put(TypeId::of::<i64>(), "i64", LeafClass::Static);
    put(TypeId::of::<u32>(), "u32", LeafClass::Static);
    put(TypeId::of::<u64>(), "u64", LeafClass::Static);
    put(TypeId::of::<usize>(), "usize", LeafClass::Static);
    put(TypeId::of::<bool>(), "bool", LeafClass::Static);
    put(TypeId::of::<String>(), "str", LeafClass::Static);
    put(TypeId::of::<Frozen>(), "frozen", LeafClass::Static);

    table
}

/// Register a custom leaf type
///
/// Re-registering a type replaces its entry.
pub fn register_leaf_type<T: LeafValue>(tag: &'static str, class: LeafClass) {
    REGISTRY
        .write()
        .insert(TypeId::of::<T>(), LeafTypeInfo { tag, class });
    tracing::debug!("registered leaf type '{}' as {:?}", tag, class);
}

/// Look up registered info for a type id
#[must_use]
pub fn leaf_info(type_id: TypeId) -> Option<LeafTypeInfo> {
    REGISTRY.read().get(&type_id).copied()
}

/// Registered tag for a type id
#[must_use]
pub fn tag_of(type_id: TypeId) -> Option<&'static str> {
    leaf_info(type_id).map(|info| info.tag)
}

/// Registered class for a type id; unregistered types classify as static
#[must_use]
pub fn class_of(type_id: TypeId) -> LeafClass {
    leaf_info(type_id).map_or(LeafClass::Static, |info| info.class)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaf::Leaf;
    use std::any::Any;

    #[test]
    fn builtin_floats_are_numeric() {
        assert_eq!(class_of(TypeId::of::<f64>()), LeafClass::Numeric);
        assert_eq!(class_of(TypeId::of::<f32>()), LeafClass::Numeric);
        assert_eq!(class_of(TypeId::of::<Array>()), LeafClass::Numeric);
    }

    #[test]
    fn builtin_scalars_are_static() {
        assert_eq!(class_of(TypeId::of::<i64>()), LeafClass::Static);
        assert_eq!(class_of(TypeId::of::<bool>()), LeafClass::Static);
        assert_eq!(class_of(TypeId::of::<String>()), LeafClass::Static);
    }

    #[test]
    fn unregistered_types_classify_as_static() {
        struct Unregistered;
        assert_eq!(class_of(TypeId::of::<Unregistered>()), LeafClass::Static);
        assert!(tag_of(TypeId::of::<Unregistered>()).is_none());
    }

    #[derive(Debug, PartialEq)]
    struct HalfPrecision(u16);

    impl LeafValue for HalfPrecision {
        fn as_any(&self) -> &dyn Any {
            self
        }

        fn eq_leaf(&self, other: &dyn LeafValue) -> bool {
            other
                .as_any()
                .downcast_ref::<HalfPrecision>()
                .is_some_and(|v| v == self)
        }
    }

    #[test]
    fn custom_registration_is_visible() {
        register_leaf_type::<HalfPrecision>("f16", LeafClass::Numeric);
        let leaf = Leaf::new(HalfPrecision(0x3c00));
        assert_eq!(leaf.tag(), "f16");
        assert_eq!(leaf.class(), LeafClass::Numeric);
    }
}
