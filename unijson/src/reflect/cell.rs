//! Static storage for lazily built descriptors.
//!
//! [`TypeInfoCell`] backs non-generic types and is a thin [`OnceLock`].
//!
//! A `static CELL` inside a generic function is shared by every
//! instantiation, so [`GenericTypeInfoCell`] keys its entries by [`TypeId`]
//! behind a read-mostly [`RwLock`]. Entries are leaked and live for the rest
//! of the process.
use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use super::TypeInfo;

/// Descriptor storage for a non-generic type.
///
/// ```
/// use unijson::reflect::{Shape, TypeInfo, TypeInfoCell, Typed};
///
/// #[derive(Debug)]
/// struct Opaque;
///
/// impl Typed for Opaque {
///     fn type_info() -> &'static TypeInfo {
///         static CELL: TypeInfoCell = TypeInfoCell::new();
///         CELL.get_or_init(|| TypeInfo::new::<Self>(Shape::Char))
///     }
/// }
///
/// assert!(std::ptr::eq(Opaque::type_info(), Opaque::type_info()));
/// ```
pub struct TypeInfoCell(OnceLock<TypeInfo>);

impl TypeInfoCell {
    #[inline]
    pub const fn new() -> Self {
        Self(OnceLock::new())
    }

    /// Returns the stored descriptor, building it with `f` on first access.
    #[inline]
    pub fn get_or_init<F>(&self, f: F) -> &TypeInfo
        where F: FnOnce() -> TypeInfo
    {
        self.0.get_or_init(f)
    }
}

impl Default for TypeInfoCell {
    fn default() -> Self {
        Self::new()
    }
}

/// Descriptor storage for generic types.
///
/// ```
/// use unijson::reflect::{GenericTypeInfoCell, Shape, TypeInfo, Typed};
///
/// #[derive(Debug)]
/// struct Tagged<T>(T);
///
/// impl<T: Typed> Typed for Tagged<T> {
///     fn type_info() -> &'static TypeInfo {
///         static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
///         CELL.get_or_insert::<Self>(|| TypeInfo::new::<Self>(Shape::Char))
///     }
/// }
///
/// assert!(Tagged::<u8>::type_info().is::<Tagged<u8>>());
/// assert!(Tagged::<i64>::type_info().is::<Tagged<i64>>());
/// ```
pub struct GenericTypeInfoCell(RwLock<BTreeMap<TypeId, &'static TypeInfo>>);

impl GenericTypeInfoCell {
    #[inline]
    pub const fn new() -> Self {
        Self(RwLock::new(BTreeMap::new()))
    }

    /// Returns the descriptor stored for `G`, building it with `f` when
    /// there is none yet.
    ///
    /// `f` runs without holding the lock, so it may look up other
    /// descriptors stored in the same cell.
    #[inline(always)]
    pub fn get_or_insert<G: Any + ?Sized>(&self, f: impl FnOnce() -> TypeInfo) -> &'static TypeInfo {
        let type_id = TypeId::of::<G>();
        match self.get_by_type_id(type_id) {
            Some(info) => info,
            None => self.insert_by_type_id(type_id, f()),
        }
    }

    #[inline(never)]
    fn get_by_type_id(&self, type_id: TypeId) -> Option<&'static TypeInfo> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&type_id)
            .copied()
    }

    #[inline(never)]
    fn insert_by_type_id(&self, type_id: TypeId, value: TypeInfo) -> &'static TypeInfo {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(type_id)
            .or_insert_with(|| Box::leak(Box::new(value)))
    }
}

impl Default for GenericTypeInfoCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::Shape;

    #[test]
    fn test_generic_cell_keys_by_type() {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        let a = CELL.get_or_insert::<u8>(|| TypeInfo::new::<u8>(Shape::Char));
        let b = CELL.get_or_insert::<u16>(|| TypeInfo::new::<u16>(Shape::Char));
        assert!(a.is::<u8>());
        assert!(b.is::<u16>());
        let again = CELL.get_or_insert::<u8>(|| unreachable!());
        assert!(core::ptr::eq(a, again));
    }
}
