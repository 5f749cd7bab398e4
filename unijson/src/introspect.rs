//! Descriptor queries shared by the serializer, deserializer and
//! instantiater.
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::options::ObjectOptions;
use crate::reflect::{
    ClassInfo, EnumInfo, ExtrasAttribute, Member, MemberValue, NodeAttribute, Reflect,
    Restriction, Shape, TypeInfo
};
use crate::value::Map;

#[inline]
pub fn node_attribute(member: &Member) -> Option<&NodeAttribute> {
    member.node_attribute()
}

#[inline]
pub fn restriction(member: &Member) -> Option<&Restriction> {
    member.restriction()
}

#[inline]
pub fn extras_attribute(member: &Member) -> Option<&ExtrasAttribute> {
    member.extras_attribute()
}

/// Class options, default for anything but classes.
pub fn object_options(info: &TypeInfo) -> ObjectOptions {
    info.as_class().map(ClassInfo::options).unwrap_or_default()
}

#[inline]
pub fn enum_info(info: &TypeInfo) -> Option<&EnumInfo> {
    info.as_enum()
}

#[inline]
pub fn member_type(member: &Member) -> &'static TypeInfo {
    member.member_type()
}

#[inline]
pub fn member_value<'a>(member: &Member, obj: &'a dyn Reflect) -> Result<MemberValue<'a>> {
    member.get(obj)
}

#[inline]
pub fn set_member_value(member: &Member, obj: &mut dyn Reflect, value: Option<Box<dyn Reflect>>) -> Result<()> {
    member.set(obj, value)
}

/// A member capturing unknown keys: marked as extras and declared exactly
/// as [`Map`].
pub fn is_extras_member(member: &Member) -> bool {
    member.extras_attribute().is_some() && member.member_type().is::<Map>()
}

/// Returns `true` for types mapped member by member.
///
/// Enums, primitives, strings, nullable wrappers, collections and the
/// dynamic [`Value`](crate::Value) are not custom types.
pub fn is_custom_type(info: &TypeInfo) -> bool {
    matches!(info.shape(), Shape::Custom(..))
}

pub fn is_dictionary(info: &TypeInfo) -> bool {
    matches!(info.shape(), Shape::Dictionary(..))
}

/// Members eligible for deserialization, grouped by JSON key.
#[derive(Debug, Default)]
pub struct MemberMap<'a> {
    keys: BTreeMap<&'a str, Vec<&'a Member>>,
    extras: Option<&'a Member>,
}

impl<'a> MemberMap<'a> {
    /// Candidates sharing `key`, in declaration order (fields first).
    pub fn get(&self, key: &str) -> Option<&[&'a Member]> {
        self.keys.get(key).map(Vec::as_slice)
    }

    pub fn extras(&self) -> Option<&'a Member> {
        self.extras
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn insert(&mut self, member: &'a Member) {
        self.keys.entry(member.key()).or_default().push(member);
    }
}

fn included(member: &Member, options: ObjectOptions) -> bool {
    !member.is_static() || options.should_include_static()
}

/// Fields first, then properties unless the class ignores them.
fn ordered_members(class: &ClassInfo) -> impl Iterator<Item = &Member> {
    let options = class.options();
    let fields = class.members().iter().filter(|member| member.is_field());
    let properties = class.members().iter()
        .filter(move |member| !member.is_field() && !options.should_ignore_properties());
    fields.chain(properties).filter(move |member| included(member, options))
}

/// Build the key map used by the field-by-field deserialization pass.
///
/// Fields take part when public or attributed, properties when writable and
/// public or attributed. Members whose options disable deserialization are
/// left out. The first extras member is returned separately.
///
/// Tuple formatted classes cannot be deserialized this way.
pub fn deserialized_members(class: &ClassInfo) -> Result<MemberMap<'_>> {
    if class.options().should_use_tuple_format() {
        return Err(Error::InvalidArgument("cannot deserialize on a tuple formatted object".into()));
    }
    let mut map = MemberMap::default();
    for member in ordered_members(class) {
        if map.extras.is_none() && is_extras_member(member) {
            map.extras = Some(member);
            continue;
        }
        let attribute = member.node_attribute();
        if attribute.is_some_and(|attribute| !attribute.options.is_deserialized()) {
            continue;
        }
        let visible = member.is_public() || attribute.is_some();
        if visible && (member.is_field() || member.can_write()) {
            map.insert(member);
        }
    }
    Ok(map)
}

/// Members written by the structural serialization pass, in output order,
/// and the first extras member.
///
/// Members whose options disable serialization are still listed; the
/// serializer skips them when formatting.
pub fn serialized_members(class: &ClassInfo) -> (Vec<&Member>, Option<&Member>) {
    let mut members = Vec::new();
    let mut extras = None;
    for member in ordered_members(class) {
        if extras.is_none() && is_extras_member(member) {
            extras = Some(member);
            continue;
        }
        let visible = member.is_public() || member.node_attribute().is_some();
        if visible && (member.is_field() || member.can_read()) {
            members.push(member);
        }
    }
    (members, extras)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::NodeOptions;
    use crate::reflect::{ClassBuilder, TypeInfoCell, Typed};
    use crate::Value;

    #[derive(Debug, Default)]
    struct Mixed {
        a: i32,
        b: String,
        hidden: bool,
        skipped: u8,
        rest: Map,
        other: Map,
    }

    impl Mixed {
        fn total(&self) -> i32 {
            self.a * 10
        }

        fn set_total(&mut self, total: i32) {
            self.a = total / 10;
        }
    }

    impl Typed for Mixed {
        fn type_info() -> &'static TypeInfo {
            static CELL: TypeInfoCell = TypeInfoCell::new();
            CELL.get_or_init(|| ClassBuilder::<Self>::new()
                .default_constructor()
                .member(Member::property("total", Mixed::total, Mixed::set_total))
                .member(Member::field("a", |m: &Self| &m.a, |m: &mut Self| &mut m.a))
                .member(Member::field("b", |m: &Self| &m.b, |m: &mut Self| &mut m.b).with_key("a"))
                .member(Member::field("hidden", |m: &Self| &m.hidden, |m: &mut Self| &mut m.hidden)
                    .private())
                .member(Member::field("skipped", |m: &Self| &m.skipped, |m: &mut Self| &mut m.skipped)
                    .with_options(NodeOptions::DONT_DESERIALIZE))
                .member(Member::field("rest", |m: &Self| &m.rest, |m: &mut Self| &mut m.rest)
                    .extras(NodeOptions::default()))
                .member(Member::field("other", |m: &Self| &m.other, |m: &mut Self| &mut m.other)
                    .extras(NodeOptions::default()))
                .member(Member::static_property("version", || 3u32, |_| {}))
                .build())
        }
    }

    #[test]
    fn test_classification() {
        assert!(is_custom_type(Mixed::type_info()));
        assert!(!is_custom_type(Value::type_info()));
        assert!(!is_custom_type(Option::<Mixed>::type_info()));
        assert!(!is_custom_type(Vec::<Mixed>::type_info()));
        assert!(is_dictionary(Map::type_info()));
        assert!(!is_dictionary(String::type_info()));
        let class = Mixed::type_info().as_class().unwrap();
        assert!(is_extras_member(class.member("rest").unwrap()));
        assert!(!is_extras_member(class.member("a").unwrap()));
        assert_eq!(object_options(i32::type_info()), ObjectOptions::default());
    }

    #[test]
    fn test_deserialized_members() {
        let class = Mixed::type_info().as_class().unwrap();
        let map = deserialized_members(class).unwrap();
        let candidates: Vec<&str> = map.get("a").unwrap().iter().map(|m| m.name()).collect();
        // fields before properties, then declaration order
        assert_eq!(candidates, ["a", "b"]);
        assert_eq!(map.get("total").unwrap().len(), 1);
        assert!(map.get("hidden").is_none());
        assert!(map.get("skipped").is_none());
        assert!(map.get("version").is_none());
        assert_eq!(map.extras().unwrap().name(), "rest");
        // the second extras member is an ordinary field
        assert!(map.get("other").is_some());
    }

    #[test]
    fn test_serialized_members() {
        let class = Mixed::type_info().as_class().unwrap();
        let (members, extras) = serialized_members(class);
        let names: Vec<&str> = members.iter().map(|m| m.name()).collect();
        assert_eq!(names, ["a", "b", "skipped", "other", "total"]);
        assert_eq!(extras.unwrap().name(), "rest");
    }
}
