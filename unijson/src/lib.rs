//! A descriptor driven JSON object mapper with polymorphic instantiation.
/*!

Types take part in mapping by implementing [`Typed`], which returns a cached
[`TypeInfo`] descriptor. Classes are described with
[`ClassBuilder`](reflect::ClassBuilder), enums with
[`EnumBuilder`](reflect::EnumBuilder). Standard library types are described
out of the box.

[`Serializer`] types:

| Rust type ->               | JSON type
|----------------------------|--------------------
| `i8`-`i64`, `u8`-`u64`     | `number`
| `f32`,`f64`                | `number` (`null` when not finite)
| `bool`                     | `boolean`
| `char`, `String`           | `string`
| enum                       | `string` or `number` (configurable)
| `None`                     | `null` (configurable)
| `Some(T)`                  | `T` -> `JSON`
| `Vec<T>`, `Box<[T]>`       | `array`
| `BTreeMap`, `HashMap`      | `object`
| [`Value`]                  | any
| class                      | `object`, or `array` in tuple format

* [`Serializer`] omits null members unless [`NodeOptions::SERIALIZE_NULL`]
is set, and can write `undefined` instead of `null`.
* Dictionary keys are written as strings, whatever their type.

[`Deserializer`] types:

| JSON type ->      | Rust type (depending on context)
|-------------------|----------------------------------------
| `null`            | `None`, the member's null value, or left untouched
| `boolean`         | `bool`, [`Value::Bool`]
| `number`          | integers (exact), floats, integer enums, [`Value::Number`]
| `string`          | `String`, enums, [`Value::String`]
| `array`           | `Vec<T>`, `Box<[T]>`, tuple formatted classes, [`Value::Array`]
| `object`          | classes, maps, [`Value::Dictionary`], [`Value::Custom`]

* Classes are instantiated by an [`Instantiater`], which honors polymorphic
substitution rules and designated constructors.
* Members holding a reference class instance are merged in place unless
[`NodeOptions::REPLACE_DESERIALIZED`] is set.
* Unknown keys fail, are skipped, or are collected into an extras [`Map`].

```
use unijson::reflect::{ClassBuilder, Member, TypeInfo, TypeInfoCell, Typed};

#[derive(Debug, Default, PartialEq)]
struct Point {
    x: i32,
    y: i32,
}

impl Typed for Point {
    fn type_info() -> &'static TypeInfo {
        static CELL: TypeInfoCell = TypeInfoCell::new();
        CELL.get_or_init(|| ClassBuilder::<Self>::new()
            .default_constructor()
            .member(Member::field("x", |p: &Self| &p.x, |p: &mut Self| &mut p.x))
            .member(Member::field("y", |p: &Self| &p.y, |p: &mut Self| &mut p.y))
            .build())
    }
}

let text = unijson::to_json_string(&Point { x: 1, y: -2 }).unwrap();
assert_eq!(text, r#"{"x":1,"y":-2}"#);
let point: Point = unijson::from_json_str(&text).unwrap().unwrap();
assert_eq!(point, Point { x: 1, y: -2 });
```
*/
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
mod options;
mod parse;
mod node;
pub mod reflect;
mod value;
pub mod introspect;
mod hooks;
mod instantiate;
pub mod de;
pub mod ser;

pub use unijson_write;
pub use unijson_write::{JsonWrite, SliceWriter, WriteError};

pub use error::{Error, Result};
pub use options::{EnumFormat, NodeOptions, ObjectOptions, ObjectTypes};
pub use parse::{parse, ParseError, Parser};
pub use node::{Node, NodeKind};
pub use value::{Map, Value};
pub use hooks::{
    DeserializationListener,
    DeserializeHook,
    JsonDeserialize,
    JsonSerialize,
    SerializationListener,
    SerializeHook
};
pub use instantiate::{Instantiater, InstantiationData, SimpleInstantiater};
pub use reflect::{Reflect, Restriction, TypeInfo, TypeRef, Typed};
pub use de::Deserializer;
pub use ser::Serializer;

/// Serialize `value` with the default serializer.
///
/// Null is written out at the top level, so the result is always a JSON
/// text.
pub fn to_json_string<T: Typed>(value: &T) -> Result<String> {
    to_json_string_with(value, NodeOptions::SERIALIZE_NULL)
        .map(Option::unwrap_or_default)
}

/// Serialize `value` with the default serializer and `options`.
///
/// Returns `None` when the value is null and `options` omit nulls.
pub fn to_json_string_with<T: Typed>(value: &T, options: NodeOptions) -> Result<Option<String>> {
    Serializer::default_instance().serialize(value, options)
}

/// Stream `value` into `writer` with the default serializer.
///
/// Returns `false` when nothing was written.
pub fn to_writer<W, T>(writer: &mut W, value: &T, options: NodeOptions) -> Result<bool>
    where W: JsonWrite + ?Sized,
          T: Typed
{
    Serializer::default_instance().serialize_to(writer, value, options)
}

/// Deserialize a `T` from JSON text with the default deserializer.
///
/// JSON `null` yields `None`.
pub fn from_json_str<T: Typed>(text: &str) -> Result<Option<T>> {
    from_json_str_with(text, NodeOptions::default())
}

/// Deserialize a `T` from JSON text with the default deserializer and
/// `options`.
pub fn from_json_str_with<T: Typed>(text: &str, options: NodeOptions) -> Result<Option<T>> {
    Deserializer::default_instance().deserialize_str(text, options)
}

/// Merge JSON text into an existing object with the default deserializer.
pub fn feed_json<T: Typed>(obj: &mut T, text: &str) -> Result<()> {
    Deserializer::default_instance().deserialize_on_str(obj, text, NodeOptions::default())
}
