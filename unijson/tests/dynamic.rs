// dynamic values, dictionary keys and the node tree
use std::collections::{BTreeMap, HashMap};

use unijson::reflect::{ClassBuilder, EnumBuilder, Member, TypeInfo, TypeInfoCell, TypeRef, Typed};
use unijson::{
    from_json_str, parse, to_json_string, to_writer, Deserializer, EnumFormat, Error, Map, Node,
    NodeOptions, ObjectTypes, Restriction, Serializer, SliceWriter, Value
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
enum Color {
    Red,
    Green,
}

impl Typed for Color {
    fn type_info() -> &'static TypeInfo {
        static CELL: TypeInfoCell = TypeInfoCell::new();
        CELL.get_or_init(|| EnumBuilder::new()
            .member("Red", Color::Red)
            .member("Green", Color::Green)
            .format(EnumFormat::Lowercased)
            .build())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Level {
    Low,
    High,
}

impl Typed for Level {
    fn type_info() -> &'static TypeInfo {
        static CELL: TypeInfoCell = TypeInfoCell::new();
        CELL.get_or_init(|| EnumBuilder::new()
            .member_value("Low", Level::Low, 10)
            .member_value("High", Level::High, 20)
            .use_integers()
            .build())
    }
}

#[test]
fn dictionary_keys() {
    let numbers: BTreeMap<u8, bool> = [(1, true), (2, false)].into();
    let text = to_json_string(&numbers).unwrap();
    assert_eq!(text, r#"{"1":true,"2":false}"#);
    assert_eq!(from_json_str::<BTreeMap<u8, bool>>(&text).unwrap(), Some(numbers));

    let colors: BTreeMap<Color, i64> = [(Color::Red, -1), (Color::Green, 1)].into();
    let text = to_json_string(&colors).unwrap();
    assert_eq!(text, r#"{"red":-1,"green":1}"#);
    assert_eq!(from_json_str::<BTreeMap<Color, i64>>(&text).unwrap(), Some(colors));

    let levels: BTreeMap<Level, String> = [(Level::High, "h".to_owned())].into();
    let text = to_json_string(&levels).unwrap();
    assert_eq!(text, r#"{"20":"h"}"#);
    assert_eq!(from_json_str::<BTreeMap<Level, String>>(&text).unwrap(), Some(levels));

    let flags: HashMap<bool, Option<u8>> = [(true, None)].into();
    let text = to_json_string(&flags).unwrap();
    assert_eq!(text, r#"{"true":null}"#);
    let text = Serializer::new().serialize(&flags, NodeOptions::default()).unwrap().unwrap();
    assert_eq!(text, "{}");
    let flags: HashMap<bool, Option<u8>> = from_json_str(r#"{"true":null,"false":3}"#).unwrap().unwrap();
    assert_eq!(flags[&true], None);
    assert_eq!(flags[&false], Some(3));

    assert!(from_json_str::<BTreeMap<Color, i64>>(r#"{"blue":1}"#).unwrap_err().is_type_mismatch());
    let err = from_json_str::<BTreeMap<u8, u8>>(r#"{"1":1,"01":2}"#).unwrap_err();
    assert!(matches!(err, Error::DuplicateKey(..)));
}

#[derive(Debug, Default, PartialEq)]
struct Pet {
    lives: u8,
}

impl Typed for Pet {
    fn type_info() -> &'static TypeInfo {
        static CELL: TypeInfoCell = TypeInfoCell::new();
        CELL.get_or_init(|| ClassBuilder::<Self>::new()
            .default_constructor()
            .member(Member::field("lives", |p: &Self| &p.lives, |p: &mut Self| &mut p.lives))
            .build())
    }
}

#[derive(Debug, Default)]
struct Settings {
    anything: Value,
    number: Value,
    pet: Value,
    rest: Map,
}

impl Typed for Settings {
    fn type_info() -> &'static TypeInfo {
        static CELL: TypeInfoCell = TypeInfoCell::new();
        CELL.get_or_init(|| ClassBuilder::<Self>::new()
            .default_constructor()
            .member(Member::field("anything", |s: &Self| &s.anything, |s: &mut Self| &mut s.anything))
            .member(Member::field("number", |s: &Self| &s.number, |s: &mut Self| &mut s.number)
                .restrict(Restriction::new(ObjectTypes::NUMBER))
                .with_options(NodeOptions::IGNORE_TYPE_MISMATCH | NodeOptions::DONT_ASSIGN_NULL))
            .member(Member::field("pet", |s: &Self| &s.pet, |s: &mut Self| &mut s.pet)
                .restrict(Restriction::with_custom(ObjectTypes::ALL, [TypeRef::of::<Pet>()])
                    .expect("custom types allowed")))
            .member(Member::field("rest", |s: &Self| &s.rest, |s: &mut Self| &mut s.rest)
                .extras(NodeOptions::default()))
            .build())
    }
}

#[test]
fn restricted_values() {
    let settings: Settings = from_json_str(concat!(
        r#"{"anything":{"a":[1,true,null]},"number":"nope","pet":{"lives":7},"#,
        r#""other":{"lives":1}}"#)).unwrap().unwrap();
    let a = settings.anything.get("a").and_then(Value::as_array).unwrap();
    assert_eq!(a, &[Value::Number(1.0), Value::Bool(true), Value::Null]);
    assert_eq!(settings.number, Value::Null);
    assert_eq!(settings.pet.as_custom::<Pet>(), Some(&Pet { lives: 7 }));
    // extras only accept plain JSON
    assert!(settings.rest["other"].as_dictionary().is_some());

    let settings: Settings = from_json_str(r#"{"number":2.5,"pet":{"name":"rex"}}"#).unwrap().unwrap();
    assert_eq!(settings.number, Value::Number(2.5));
    assert_eq!(settings.pet.get("name").and_then(Value::as_str), Some("rex"));

    let text = to_json_string(&settings).unwrap();
    assert_eq!(text, r#"{"number":2.5,"pet":{"name":"rex"}}"#);
}

#[test]
fn restriction_validation() {
    assert!(matches!(Restriction::with_custom(ObjectTypes::JSON, [TypeRef::of::<Pet>()]),
        Err(Error::InvalidArgument(..))));
    let de = Deserializer::new();
    let node = parse(r#"{"lives":3}"#).unwrap();
    let value = de.deserialize_to_object(&node, ObjectTypes::ALL, &[TypeRef::of::<Pet>()],
        NodeOptions::default()).unwrap().unwrap();
    assert_eq!(value.as_custom::<Pet>(), Some(&Pet { lives: 3 }));
    let value = de.deserialize_to_object(&node, ObjectTypes::JSON, &[], NodeOptions::default()).unwrap();
    assert_eq!(value.and_then(|v| v.get("lives").and_then(Value::as_f64)), Some(3.0));
    let err = de.deserialize_to_object(&node, ObjectTypes::ARRAY, &[], NodeOptions::default()).unwrap_err();
    assert!(err.is_type_mismatch());
}

#[test]
fn undefined_token() {
    let ser = Serializer::new().with_undefined_for_null(true);
    let values = vec![None, Some(1u8)];
    assert_eq!(ser.serialize(&values, NodeOptions::default()).unwrap().unwrap(), "[undefined,1]");
    assert_eq!(ser.serialize(&None::<u8>, NodeOptions::SERIALIZE_NULL).unwrap().unwrap(), "undefined");
    assert_eq!(ser.serialize(&None::<u8>, NodeOptions::default()).unwrap(), None);
    assert_eq!(to_json_string(&values).unwrap(), "[null,1]");
}

#[test]
fn writer_sinks() {
    let mut buf = [0u8; 16];
    let mut writer = SliceWriter::new(&mut buf);
    assert!(to_writer(&mut writer, &vec![1.5f32, 2.0], NodeOptions::default()).unwrap());
    assert_eq!(writer.as_str(), Some("[1.5,2]"));

    let mut tiny = [0u8; 4];
    let mut writer = SliceWriter::new(&mut tiny);
    let err = to_writer(&mut writer, &"too long".to_owned(), NodeOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Write(..)));

    let mut out = Vec::<u8>::new();
    assert!(!to_writer(&mut out, &None::<i32>, NodeOptions::default()).unwrap());
    assert!(out.is_empty());
}

const DOCUMENT: &str = r#"
{
    "name": "unijson \u00e9\ud83d\ude00 \"q\"",
    "numbers": [0, -1, 18446744073709551615, 2.5, -1e-7, 1E3],
    "nested": {"empty": {}, "list": [], "flag": false, "nothing": null},
    "escapes": "\b\f\n\r\t\/\\"
}
"#;

#[test]
fn parser_agrees_with_serde_json() {
    let node = parse(DOCUMENT).unwrap();
    let ours = serde_json::to_value(&node).unwrap();
    let theirs: serde_json::Value = serde_json::from_str(DOCUMENT).unwrap();
    assert_eq!(ours, theirs);

    // and the compact text reads back the same
    let compact = node.to_string();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&compact).unwrap(), theirs);
    assert_eq!(parse(&compact).unwrap(), node);

    for bad in ["", "[1,]", r#"{"a" 1}"#, "[1 2]", "01", "\"\\x\"", "nul", "{} {}"] {
        assert!(parse(bad).is_err(), "{bad:?} parsed");
        assert!(serde_json::from_str::<serde_json::Value>(bad).is_err());
    }
}

#[test]
fn node_and_value_interop() {
    let node = parse(r#"{"a":[1,"x"],"b":null}"#).unwrap();
    assert!(node["a"].is_array());
    assert!(node["b"].is_null());
    assert!(node["missing"].is_absent());
    assert!(node["a"][5].is_absent());
    assert_eq!(node["a"][1].as_str(), Some("x"));

    let value: Value = serde_json::from_str(r#"{"k":[1,2]}"#).unwrap();
    assert_eq!(value.get("k").and_then(Value::as_array).map(<[Value]>::len), Some(2));
    assert_eq!(to_json_string(&value).unwrap(), r#"{"k":[1,2]}"#);
    let node: Node = serde_json::from_str(r#"[true,{"z":1.5}]"#).unwrap();
    assert_eq!(node.to_string(), r#"[true,{"z":1.5}]"#);
}
