//! Type descriptors the engine walks instead of runtime reflection.
//!
//! Every type taking part in mapping implements [`Typed`] and returns a
//! process-cached [`TypeInfo`]. The descriptor classifies the type into
//! exactly one [`Shape`], and the serializer and deserializer branch on that
//! shape only.
//!
//! Values cross the engine as `&dyn Reflect` or `Box<dyn Reflect>`. A box
//! produced for a descriptor always holds exactly the type the descriptor
//! was built for.
use core::any::{Any, TypeId};
use core::fmt;

use crate::error::{Error, Result};

mod cell;
mod class;
mod enums;
mod impls;

pub use cell::{GenericTypeInfoCell, TypeInfoCell};
pub use class::*;
pub use enums::{EnumBuilder, EnumInfo, EnumMember};

/// Object-safe view of a [`Typed`] value.
///
/// Implemented for every [`Typed`] type, never by hand.
pub trait Reflect: Any + fmt::Debug {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn as_reflect(&self) -> &dyn Reflect;
    fn as_reflect_mut(&mut self) -> &mut dyn Reflect;
    /// Descriptor of the concrete type.
    fn reflect_type_info(&self) -> &'static TypeInfo;
    /// See [`Typed::is_null`].
    fn reflect_is_null(&self) -> bool;
    /// See [`Typed::delegate`].
    fn reflect_delegate(&self) -> Option<&dyn Reflect>;
    /// See [`Typed::delegate_mut`].
    fn reflect_delegate_mut(&mut self) -> Option<&mut dyn Reflect>;
}

/// Static access to a type's descriptor.
///
/// Only [`type_info`](Typed::type_info) is required. The remaining methods
/// give wrapper types (`Option<T>`, polymorphic enums over concrete classes)
/// a way to present a null state or their inner value.
pub trait Typed: Any + fmt::Debug + Sized {
    fn type_info() -> &'static TypeInfo;

    /// The value written into a member when the source holds null.
    ///
    /// `None` leaves the member untouched, and makes null a type mismatch
    /// wherever a value is required (list elements, constructor arguments).
    fn null_value() -> Option<Self> {
        None
    }

    /// Returns `true` when the value stands for JSON null.
    fn is_null(&self) -> bool {
        false
    }

    /// The value serialized and merged in place of `self`, if any.
    fn delegate(&self) -> Option<&dyn Reflect> {
        None
    }

    fn delegate_mut(&mut self) -> Option<&mut dyn Reflect> {
        None
    }
}

impl<T: Typed> Reflect for T {
    #[inline]
    fn as_any(&self) -> &dyn Any {
        self
    }

    #[inline]
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    #[inline]
    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    #[inline]
    fn as_reflect(&self) -> &dyn Reflect {
        self
    }

    #[inline]
    fn as_reflect_mut(&mut self) -> &mut dyn Reflect {
        self
    }

    #[inline]
    fn reflect_type_info(&self) -> &'static TypeInfo {
        T::type_info()
    }

    #[inline]
    fn reflect_is_null(&self) -> bool {
        self.is_null()
    }

    #[inline]
    fn reflect_delegate(&self) -> Option<&dyn Reflect> {
        self.delegate()
    }

    #[inline]
    fn reflect_delegate_mut(&mut self) -> Option<&mut dyn Reflect> {
        self.delegate_mut()
    }
}

impl dyn Reflect {
    #[inline]
    pub fn is<T: Reflect>(&self) -> bool {
        self.as_any().is::<T>()
    }

    #[inline]
    pub fn downcast_ref<T: Reflect>(&self) -> Option<&T> {
        self.as_any().downcast_ref()
    }

    #[inline]
    pub fn downcast_mut<T: Reflect>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut()
    }

    /// Unbox the concrete value, handing the box back on a type mismatch.
    pub fn downcast<T: Reflect>(self: Box<Self>) -> core::result::Result<Box<T>, Box<dyn Reflect>> {
        if self.is::<T>() {
            let raw = Box::into_raw(self) as *mut T;
            // SAFETY: the concrete type was checked above
            Ok(unsafe { Box::from_raw(raw) })
        }
        else {
            Err(self)
        }
    }

    /// Follow delegates down to the innermost value.
    pub fn innermost(&self) -> &dyn Reflect {
        let mut current = self;
        while let Some(inner) = current.reflect_delegate() {
            current = inner;
        }
        current
    }
}

/// Convert an erased, possibly null result into `T`.
///
/// Null becomes [`Typed::null_value`] or a type mismatch.
pub fn take_value<T: Typed>(value: Option<Box<dyn Reflect>>) -> Result<T> {
    match value {
        Some(value) => value.downcast::<T>()
            .map(|value| *value)
            .map_err(|value| Error::TypeMismatch(format!(
                "expected `{}`, found `{}`",
                core::any::type_name::<T>(),
                value.reflect_type_info().type_name()))),
        None => T::null_value().ok_or_else(|| Error::TypeMismatch(format!(
            "`{}` cannot hold null", core::any::type_name::<T>())))
    }
}

/// Like [`take_value`] but keeps null as `None`.
pub fn take_option<T: Typed>(value: Option<Box<dyn Reflect>>) -> Result<Option<T>> {
    value.map(|value| take_value(Some(value))).transpose()
}

/// Lazy reference to another type's descriptor.
///
/// Descriptors refer to each other through these, so recursive types do not
/// build their own descriptor while building it.
#[derive(Clone, Copy)]
pub struct TypeRef(fn() -> &'static TypeInfo);

impl TypeRef {
    #[inline]
    pub fn of<T: Typed>() -> Self {
        TypeRef(T::type_info)
    }

    #[inline]
    pub fn get(self) -> &'static TypeInfo {
        (self.0)()
    }
}

impl fmt::Debug for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeRef").field(&self.get().type_name()).finish()
    }
}

/// Primitive numeric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    I8, I16, I32, I64, Isize,
    U8, U16, U32, U64, Usize,
    F32, F64,
}

impl NumberKind {
    #[inline]
    pub fn is_float(self) -> bool {
        matches!(self, NumberKind::F32|NumberKind::F64)
    }
}

/// Structural classification of a type. Every type has exactly one.
pub enum Shape {
    Number(NumberKind),
    Bool,
    /// A primitive the engine writes as a one character string but cannot
    /// read back.
    Char,
    Enum(EnumInfo),
    String,
    Nullable(NullableInfo),
    List(ListInfo),
    Dictionary(DictionaryInfo),
    /// The dynamically typed [`Value`](crate::Value).
    Dynamic,
    /// A class or struct mapped member by member.
    Custom(ClassInfo),
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Number(..) => "number",
            Shape::Bool => "bool",
            Shape::Char => "char",
            Shape::Enum(..) => "enum",
            Shape::String => "string",
            Shape::Nullable(..) => "nullable",
            Shape::List(..) => "list",
            Shape::Dictionary(..) => "dictionary",
            Shape::Dynamic => "dynamic",
            Shape::Custom(..) => "custom",
        }
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Number(kind) => f.debug_tuple("Number").field(kind).finish(),
            Shape::Nullable(info) => f.debug_tuple("Nullable").field(&info.inner).finish(),
            Shape::List(info) => f.debug_tuple("List").field(&info.element).finish(),
            Shape::Dictionary(info) => f.debug_tuple("Dictionary")
                .field(&info.key)
                .field(&info.value)
                .finish(),
            shape => f.write_str(shape.name())
        }
    }
}

/// `Option`-like wrapper around another type.
pub struct NullableInfo {
    pub inner: TypeRef,
    /// Wraps a value of the inner type into the nullable type.
    pub wrap: fn(Box<dyn Reflect>) -> Result<Box<dyn Reflect>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    /// Growable list.
    List,
    /// Fixed-size array, built from a list.
    Array,
}

pub struct ListInfo {
    pub element: TypeRef,
    pub kind: ListKind,
    /// Borrow the elements of a list value.
    pub elements: fn(&dyn Reflect) -> Vec<&dyn Reflect>,
    /// Build a list value from deserialized elements.
    pub build: fn(Vec<Option<Box<dyn Reflect>>>) -> Result<Box<dyn Reflect>>,
}

pub struct DictionaryInfo {
    pub key: TypeRef,
    pub value: TypeRef,
    /// Borrow the entries of a dictionary value.
    pub entries: fn(&dyn Reflect) -> Vec<(&dyn Reflect, &dyn Reflect)>,
    /// Build a dictionary from deserialized entries. Fails with
    /// [`Error::DuplicateKey`] when two keys compare equal.
    pub build: fn(Vec<(Box<dyn Reflect>, Option<Box<dyn Reflect>>)>) -> Result<Box<dyn Reflect>>,
}

/// Descriptor of a single type.
pub struct TypeInfo {
    type_id: TypeId,
    type_name: &'static str,
    shape: Shape,
}

impl TypeInfo {
    pub fn new<T: Any>(shape: Shape) -> Self {
        TypeInfo {
            type_id: TypeId::of::<T>(),
            type_name: core::any::type_name::<T>(),
            shape
        }
    }

    /// Replace the diagnostic name, which defaults to the full type path.
    pub fn with_name(mut self, type_name: &'static str) -> Self {
        self.type_name = type_name;
        self
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn as_class(&self) -> Option<&ClassInfo> {
        match &self.shape {
            Shape::Custom(info) => Some(info),
            _ => None
        }
    }

    pub fn as_enum(&self) -> Option<&EnumInfo> {
        match &self.shape {
            Shape::Enum(info) => Some(info),
            _ => None
        }
    }

    pub fn as_nullable(&self) -> Option<&NullableInfo> {
        match &self.shape {
            Shape::Nullable(info) => Some(info),
            _ => None
        }
    }

    pub fn as_list(&self) -> Option<&ListInfo> {
        match &self.shape {
            Shape::List(info) => Some(info),
            _ => None
        }
    }

    pub fn as_dictionary(&self) -> Option<&DictionaryInfo> {
        match &self.shape {
            Shape::Dictionary(info) => Some(info),
            _ => None
        }
    }

    /// Returns `true` for types with copy-out semantics: primitives, enums,
    /// nullable wrappers and classes declared as value types.
    pub fn is_value_type(&self) -> bool {
        match &self.shape {
            Shape::Number(..)|Shape::Bool|Shape::Char|Shape::Enum(..)|Shape::Nullable(..) => true,
            Shape::Custom(info) => info.is_value_type(),
            _ => false
        }
    }

    /// Returns `true` for primitives and enums, the types that can never be
    /// deserialized in place.
    pub fn is_primitive_or_enum(&self) -> bool {
        matches!(self.shape, Shape::Number(..)|Shape::Bool|Shape::Char|Shape::Enum(..))
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeInfo")
            .field("type_name", &self.type_name)
            .field("shape", &self.shape)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downcast() {
        let boxed: Box<dyn Reflect> = Box::new(7i32);
        assert!(boxed.is::<i32>());
        assert_eq!(boxed.downcast_ref::<i32>(), Some(&7));
        let boxed = boxed.downcast::<u8>().unwrap_err();
        assert_eq!(*boxed.downcast::<i32>().unwrap(), 7);
    }

    #[test]
    fn test_take_value() {
        assert_eq!(take_value::<i32>(Some(Box::new(3i32))).unwrap(), 3);
        assert_eq!(take_value::<i32>(None).unwrap(), 0);
        assert!(take_value::<String>(None).unwrap_err().is_type_mismatch());
        assert!(take_value::<String>(Some(Box::new(1u8))).unwrap_err().is_type_mismatch());
        assert_eq!(take_option::<bool>(None).unwrap(), None);
        assert_eq!(take_option::<Option<bool>>(None).unwrap(), None);
    }

    #[test]
    fn test_delegate_chain() {
        let value: Option<Option<u8>> = Some(Some(5));
        let inner = value.as_reflect().innermost();
        assert_eq!(inner.downcast_ref::<u8>(), Some(&5));
        assert!(!value.reflect_is_null());
        let none: Option<u8> = None;
        assert!(none.reflect_is_null());
    }

    #[test]
    fn test_shape_classification() {
        assert!(matches!(i32::type_info().shape(), Shape::Number(NumberKind::I32)));
        assert!(i32::type_info().is_value_type());
        assert!(i32::type_info().is_primitive_or_enum());
        assert!(matches!(String::type_info().shape(), Shape::String));
        assert!(!String::type_info().is_value_type());
        let list = Vec::<u8>::type_info().as_list().unwrap();
        assert_eq!(list.kind, ListKind::List);
        assert!(list.element.get().is::<u8>());
        assert!(Option::<u8>::type_info().as_nullable().unwrap().inner.get().is::<u8>());
        assert_eq!(format!("{:?}", Vec::<u8>::type_info().shape()), "List(TypeRef(\"u8\"))");
    }
}
