//! Descriptors of standard library types.
use std::collections::{btree_map, hash_map, BTreeMap, HashMap};
use std::hash::Hash;

use super::{
    take_value, DictionaryInfo, GenericTypeInfoCell, ListInfo, ListKind, NullableInfo, NumberKind,
    Reflect, Shape, TypeInfo, TypeInfoCell, TypeRef, Typed
};
use crate::error::{Error, Result};

macro_rules! impl_typed_number {
    ($($ty:ty => $kind:ident),*) => {$(
        impl Typed for $ty {
            fn type_info() -> &'static TypeInfo {
                static CELL: TypeInfoCell = TypeInfoCell::new();
                CELL.get_or_init(|| TypeInfo::new::<$ty>(Shape::Number(NumberKind::$kind)))
            }

            fn null_value() -> Option<Self> {
                Some(0 as $ty)
            }
        }
    )*};
}

impl_typed_number!(
    i8 => I8, i16 => I16, i32 => I32, i64 => I64, isize => Isize,
    u8 => U8, u16 => U16, u32 => U32, u64 => U64, usize => Usize,
    f32 => F32, f64 => F64
);

impl Typed for bool {
    fn type_info() -> &'static TypeInfo {
        static CELL: TypeInfoCell = TypeInfoCell::new();
        CELL.get_or_init(|| TypeInfo::new::<bool>(Shape::Bool))
    }

    fn null_value() -> Option<Self> {
        Some(false)
    }
}

impl Typed for char {
    fn type_info() -> &'static TypeInfo {
        static CELL: TypeInfoCell = TypeInfoCell::new();
        CELL.get_or_init(|| TypeInfo::new::<char>(Shape::Char))
    }
}

impl Typed for String {
    fn type_info() -> &'static TypeInfo {
        static CELL: TypeInfoCell = TypeInfoCell::new();
        CELL.get_or_init(|| TypeInfo::new::<String>(Shape::String))
    }
}

fn wrap_option<T: Typed>(value: Box<dyn Reflect>) -> Result<Box<dyn Reflect>> {
    Ok(Box::new(Some(take_value::<T>(Some(value))?)))
}

impl<T: Typed> Typed for Option<T> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| TypeInfo::new::<Self>(Shape::Nullable(NullableInfo {
            inner: TypeRef::of::<T>(),
            wrap: wrap_option::<T>
        })))
    }

    fn null_value() -> Option<Self> {
        Some(None)
    }

    fn is_null(&self) -> bool {
        self.is_none()
    }

    fn delegate(&self) -> Option<&dyn Reflect> {
        self.as_ref().map(|value| value as &dyn Reflect)
    }

    fn delegate_mut(&mut self) -> Option<&mut dyn Reflect> {
        self.as_mut().map(|value| value as &mut dyn Reflect)
    }
}

fn collect_elements<T: Typed>(elements: Vec<Option<Box<dyn Reflect>>>) -> Result<Vec<T>> {
    elements.into_iter().map(take_value::<T>).collect()
}

fn vec_elements<T: Typed>(list: &dyn Reflect) -> Vec<&dyn Reflect> {
    match list.downcast_ref::<Vec<T>>() {
        Some(list) => list.iter().map(|element| element as &dyn Reflect).collect(),
        None => Vec::new()
    }
}

fn vec_build<T: Typed>(elements: Vec<Option<Box<dyn Reflect>>>) -> Result<Box<dyn Reflect>> {
    Ok(Box::new(collect_elements::<T>(elements)?))
}

impl<T: Typed> Typed for Vec<T> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| TypeInfo::new::<Self>(Shape::List(ListInfo {
            element: TypeRef::of::<T>(),
            kind: ListKind::List,
            elements: vec_elements::<T>,
            build: vec_build::<T>
        })))
    }
}

fn slice_elements<T: Typed>(list: &dyn Reflect) -> Vec<&dyn Reflect> {
    match list.downcast_ref::<Box<[T]>>() {
        Some(list) => list.iter().map(|element| element as &dyn Reflect).collect(),
        None => Vec::new()
    }
}

fn slice_build<T: Typed>(elements: Vec<Option<Box<dyn Reflect>>>) -> Result<Box<dyn Reflect>> {
    Ok(Box::new(collect_elements::<T>(elements)?.into_boxed_slice()))
}

impl<T: Typed> Typed for Box<[T]> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| TypeInfo::new::<Self>(Shape::List(ListInfo {
            element: TypeRef::of::<T>(),
            kind: ListKind::Array,
            elements: slice_elements::<T>,
            build: slice_build::<T>
        })))
    }
}

fn duplicate_key<K: core::fmt::Debug>(key: &K) -> Error {
    Error::DuplicateKey(format!("{:?}", key))
}

fn btree_entries<K: Typed + Ord, V: Typed>(map: &dyn Reflect) -> Vec<(&dyn Reflect, &dyn Reflect)> {
    match map.downcast_ref::<BTreeMap<K, V>>() {
        Some(map) => map.iter()
            .map(|(key, value)| (key as &dyn Reflect, value as &dyn Reflect))
            .collect(),
        None => Vec::new()
    }
}

fn btree_build<K: Typed + Ord, V: Typed>(
    entries: Vec<(Box<dyn Reflect>, Option<Box<dyn Reflect>>)>
) -> Result<Box<dyn Reflect>>
{
    let mut map = BTreeMap::new();
    for (key, value) in entries {
        let key = take_value::<K>(Some(key))?;
        let value = take_value::<V>(value)?;
        match map.entry(key) {
            btree_map::Entry::Occupied(entry) => return Err(duplicate_key(entry.key())),
            btree_map::Entry::Vacant(entry) => { entry.insert(value); }
        }
    }
    Ok(Box::new(map))
}

impl<K: Typed + Ord, V: Typed> Typed for BTreeMap<K, V> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| TypeInfo::new::<Self>(Shape::Dictionary(DictionaryInfo {
            key: TypeRef::of::<K>(),
            value: TypeRef::of::<V>(),
            entries: btree_entries::<K, V>,
            build: btree_build::<K, V>
        })))
    }
}

fn hash_entries<K: Typed + Eq + Hash, V: Typed>(map: &dyn Reflect) -> Vec<(&dyn Reflect, &dyn Reflect)> {
    match map.downcast_ref::<HashMap<K, V>>() {
        Some(map) => map.iter()
            .map(|(key, value)| (key as &dyn Reflect, value as &dyn Reflect))
            .collect(),
        None => Vec::new()
    }
}

fn hash_build<K: Typed + Eq + Hash, V: Typed>(
    entries: Vec<(Box<dyn Reflect>, Option<Box<dyn Reflect>>)>
) -> Result<Box<dyn Reflect>>
{
    let mut map = HashMap::with_capacity(entries.len());
    for (key, value) in entries {
        let key = take_value::<K>(Some(key))?;
        let value = take_value::<V>(value)?;
        match map.entry(key) {
            hash_map::Entry::Occupied(entry) => return Err(duplicate_key(entry.key())),
            hash_map::Entry::Vacant(entry) => { entry.insert(value); }
        }
    }
    Ok(Box::new(map))
}

impl<K: Typed + Eq + Hash, V: Typed> Typed for HashMap<K, V> {
    fn type_info() -> &'static TypeInfo {
        static CELL: GenericTypeInfoCell = GenericTypeInfoCell::new();
        CELL.get_or_insert::<Self>(|| TypeInfo::new::<Self>(Shape::Dictionary(DictionaryInfo {
            key: TypeRef::of::<K>(),
            value: TypeRef::of::<V>(),
            entries: hash_entries::<K, V>,
            build: hash_build::<K, V>
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed<T: Typed>(value: T) -> Option<Box<dyn Reflect>> {
        Some(Box::new(value))
    }

    #[test]
    fn test_null_values() {
        assert_eq!(i64::null_value(), Some(0));
        assert_eq!(f32::null_value(), Some(0.0));
        assert_eq!(bool::null_value(), Some(false));
        assert_eq!(String::null_value(), None);
        assert_eq!(char::null_value(), None);
        assert_eq!(Option::<String>::null_value(), Some(None));
        assert_eq!(Vec::<u8>::null_value(), None);
    }

    #[test]
    fn test_list_build() {
        let info = Vec::<u16>::type_info().as_list().unwrap();
        let list = (info.build)(vec![boxed(1u16), None, boxed(3u16)]).unwrap();
        assert_eq!(list.downcast_ref::<Vec<u16>>(), Some(&vec![1, 0, 3]));
        let elements = (info.elements)(list.as_ref());
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[2].downcast_ref::<u16>(), Some(&3));

        let info = Box::<[String]>::type_info().as_list().unwrap();
        assert_eq!(info.kind, ListKind::Array);
        assert!((info.build)(vec![boxed(String::from("a")), None]).unwrap_err().is_type_mismatch());
        let list = (info.build)(vec![boxed(String::from("a"))]).unwrap();
        assert_eq!(&**list.downcast_ref::<Box<[String]>>().unwrap(), &[String::from("a")]);
    }

    #[test]
    fn test_dictionary_build() {
        let info = BTreeMap::<i32, Option<bool>>::type_info().as_dictionary().unwrap();
        assert!(info.key.get().is::<i32>());
        let map = (info.build)(vec![
            (Box::new(2i32) as Box<dyn Reflect>, boxed(Some(true))),
            (Box::new(1i32) as Box<dyn Reflect>, None),
        ]).unwrap();
        let map = map.downcast_ref::<BTreeMap<i32, Option<bool>>>().unwrap();
        assert_eq!(map.get(&1), Some(&None));
        assert_eq!(map.get(&2), Some(&Some(true)));

        let info = HashMap::<String, u8>::type_info().as_dictionary().unwrap();
        let err = (info.build)(vec![
            (Box::new(String::from("k")) as Box<dyn Reflect>, boxed(1u8)),
            (Box::new(String::from("k")) as Box<dyn Reflect>, boxed(2u8)),
        ]).unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(key) if key == "\"k\""));
    }

    #[test]
    fn test_option_delegate() {
        let mut value = Some(5u8);
        *value.delegate_mut().unwrap().downcast_mut::<u8>().unwrap() = 6;
        assert_eq!(value, Some(6));
        let info = Option::<u8>::type_info().as_nullable().unwrap();
        let wrapped = (info.wrap)(Box::new(9u8)).unwrap();
        assert_eq!(wrapped.downcast_ref::<Option<u8>>(), Some(&Some(9)));
        assert!((info.wrap)(Box::new(9i8)).is_err());
    }
}
