//! Descriptor driven JSON serializer.
use core::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use log::trace;
use unijson_write::{JsonWrite, WriteResult};

use crate::error::{Error, Result};
use crate::hooks::SerializeHook;
use crate::introspect;
use crate::options::NodeOptions;
use crate::reflect::{ClassInfo, NumberKind, Phase, Reflect, Shape};
use crate::value::{Map, Value};

const NULL: &str = "null";
const UNDEFINED: &str = "undefined";

/// Writes objects as compact JSON text.
///
/// The serializer carries no per call state and may be shared between
/// threads. A process-wide instance is available through
/// [`Serializer::default_instance`].
#[derive(Clone, Default)]
pub struct Serializer {
    use_undefined_for_null: bool,
    hook: Option<Arc<dyn SerializeHook>>,
}

/// A value after null handling, overrides and delegates have been resolved.
enum Prepared<'a> {
    /// Nothing to write unless null is requested.
    Absent,
    /// Text provided by a hook or an opt-out implementation.
    Text(String),
    Value(&'a dyn Reflect),
}

impl Prepared<'_> {
    fn is_absent(&self) -> bool {
        matches!(self, Prepared::Absent)
    }
}

static DEFAULT: OnceLock<RwLock<Arc<Serializer>>> = OnceLock::new();

fn default_cell() -> &'static RwLock<Arc<Serializer>> {
    DEFAULT.get_or_init(|| RwLock::new(Arc::new(Serializer::new())))
}

impl Serializer {
    pub fn new() -> Self {
        Serializer { use_undefined_for_null: false, hook: None }
    }

    /// Write `undefined` instead of `null` for null values.
    pub fn with_undefined_for_null(mut self, use_undefined_for_null: bool) -> Self {
        self.use_undefined_for_null = use_undefined_for_null;
        self
    }

    /// Consult `hook` before any other serialization logic.
    pub fn with_hook(mut self, hook: Arc<dyn SerializeHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    #[inline]
    pub fn use_undefined_for_null(&self) -> bool {
        self.use_undefined_for_null
    }

    /// The token written for null values.
    #[inline]
    pub fn null_token(&self) -> &'static str {
        if self.use_undefined_for_null { UNDEFINED } else { NULL }
    }

    /// The process-wide serializer.
    pub fn default_instance() -> Arc<Serializer> {
        default_cell().read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the process-wide serializer.
    pub fn set_default(serializer: Arc<Serializer>) {
        *default_cell().write().unwrap_or_else(PoisonError::into_inner) = serializer;
    }

    /// Serialize `value` to a string.
    ///
    /// Returns `None` when the value is null and `options` does not request
    /// null emission.
    pub fn serialize(&self, value: &dyn Reflect, options: NodeOptions) -> Result<Option<String>> {
        let mut out = String::new();
        Ok(self.serialize_to(&mut out, value, options)?.then_some(out))
    }

    /// Serialize `value` into `out`.
    ///
    /// Returns `false` when nothing was written.
    pub fn serialize_to<W>(&self, out: &mut W, value: &dyn Reflect, options: NodeOptions) -> Result<bool>
        where W: JsonWrite + ?Sized
    {
        let prepared = self.prepare(value, options)?;
        if prepared.is_absent() && !options.should_serialize_null() {
            return Ok(false);
        }
        self.write_prepared(out, prepared, options)?;
        Ok(true)
    }

    /// The null token when `options` requests null emission.
    pub fn serialize_null(&self, options: NodeOptions) -> Option<&'static str> {
        options.should_serialize_null().then(|| self.null_token())
    }

    pub fn serialize_string(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len() + 2);
        // writing to a string never fails
        let _ = format_escaped_str(&mut out, value);
        out
    }

    pub fn serialize_bool(&self, value: bool) -> &'static str {
        if value { "true" } else { "false" }
    }

    /// Serialize a declared enum member.
    pub fn serialize_enum(&self, value: &dyn Reflect) -> Result<String> {
        let info = value.reflect_type_info();
        let enum_info = info.as_enum().ok_or_else(|| Error::InvalidArgument(
            format!("`{}` is not an enum", info.type_name())))?;
        let member = enum_info.member_of(value).ok_or_else(|| Error::InvalidArgument(
            format!("{:?} is not a declared member of `{}`", value, info.type_name())))?;
        if enum_info.use_integers() {
            Ok(itoa::Buffer::new().format(member.value()).to_owned())
        }
        else {
            Ok(self.serialize_string(&enum_info.format_member(member)))
        }
    }

    /// Serialize an `Option`-like value.
    pub fn serialize_nullable(&self, value: &dyn Reflect, options: NodeOptions) -> Result<Option<String>> {
        let info = value.reflect_type_info();
        if info.as_nullable().is_none() {
            return Err(Error::InvalidArgument(format!("`{}` is not nullable", info.type_name())));
        }
        self.serialize(value, options)
    }

    /// Serialize a class member by member, bypassing hooks, opt-out
    /// implementations and delegates.
    pub fn serialize_by_parts(&self, value: &dyn Reflect, options: NodeOptions) -> Result<Option<String>> {
        let info = value.reflect_type_info();
        if info.is_primitive_or_enum() {
            return Err(Error::InvalidArgument(
                format!("cannot serialize `{}` by parts", info.type_name())));
        }
        if value.reflect_is_null() {
            return Ok(self.serialize_null(options).map(str::to_owned));
        }
        let class = info.as_class().ok_or_else(|| Error::InvalidArgument(
            format!("`{}` is not a class type", info.type_name())))?;
        let mut out = String::new();
        self.write_object(&mut out, class, value)?;
        Ok(Some(out))
    }

    fn prepare<'a>(&self, value: &'a dyn Reflect, options: NodeOptions) -> Result<Prepared<'a>> {
        if value.reflect_is_null() {
            return Ok(Prepared::Absent);
        }
        if let Some(hook) = &self.hook {
            if let Some(text) = hook.try_serialize(self, value, options)? {
                trace!("`{}` serialized by hook", value.reflect_type_info().type_name());
                return Ok(text.map_or(Prepared::Absent, Prepared::Text));
            }
        }
        if let Some(class) = value.reflect_type_info().as_class() {
            if let Some(text) = class.custom_serialize(value, self) {
                return Ok(text?.map_or(Prepared::Absent, Prepared::Text));
            }
        }
        match value.reflect_delegate() {
            Some(inner) => self.prepare(inner, options),
            None => Ok(Prepared::Value(value))
        }
    }

    fn write_prepared<W>(&self, out: &mut W, prepared: Prepared<'_>, options: NodeOptions) -> Result<()>
        where W: JsonWrite + ?Sized
    {
        match prepared {
            Prepared::Absent => Ok(out.write_str(self.null_token())?),
            Prepared::Text(text) => Ok(out.write_str(&text)?),
            Prepared::Value(value) => self.write_value(out, value, options)
        }
    }

    fn write_value<W>(&self, out: &mut W, value: &dyn Reflect, options: NodeOptions) -> Result<()>
        where W: JsonWrite + ?Sized
    {
        let info = value.reflect_type_info();
        match info.shape() {
            Shape::Number(kind) => self.write_number(out, value, *kind),
            Shape::Bool => Ok(out.write_str(self.serialize_bool(*expect::<bool>(value)?))?),
            Shape::Char => {
                let mut buf = [0u8; 4];
                Ok(format_escaped_str(out, expect::<char>(value)?.encode_utf8(&mut buf))?)
            }
            Shape::Enum(..) => Ok(out.write_str(&self.serialize_enum(value)?)?),
            Shape::String => Ok(format_escaped_str(out, expect::<String>(value)?)?),
            // a non-null nullable always has a delegate
            Shape::Nullable(..) => Ok(out.write_str(self.null_token())?),
            Shape::List(list) => self.write_elements(out, (list.elements)(value).into_iter(), options),
            Shape::Dictionary(dictionary) => {
                out.write_byte(b'{')?;
                let mut first = true;
                for (key, value) in (dictionary.entries)(value) {
                    self.write_entry(out, &mut first, key, value, options)?;
                }
                Ok(out.write_byte(b'}')?)
            }
            Shape::Dynamic => self.write_dynamic(out, expect::<Value>(value)?, options),
            Shape::Custom(class) => self.write_object(out, class, value)
        }
    }

    fn write_number<W>(&self, out: &mut W, value: &dyn Reflect, kind: NumberKind) -> Result<()>
        where W: JsonWrite + ?Sized
    {
        macro_rules! write_integer {
            ($ty:ty) => {
                out.write_str(itoa::Buffer::new().format(*expect::<$ty>(value)?))?
            };
        }
        match kind {
            NumberKind::I8 => write_integer!(i8),
            NumberKind::I16 => write_integer!(i16),
            NumberKind::I32 => write_integer!(i32),
            NumberKind::I64 => write_integer!(i64),
            NumberKind::Isize => write_integer!(isize),
            NumberKind::U8 => write_integer!(u8),
            NumberKind::U16 => write_integer!(u16),
            NumberKind::U32 => write_integer!(u32),
            NumberKind::U64 => write_integer!(u64),
            NumberKind::Usize => write_integer!(usize),
            NumberKind::F32 => {
                if !format_f32(out, *expect::<f32>(value)?)? {
                    out.write_str(NULL)?;
                }
            }
            NumberKind::F64 => {
                if !format_f64(out, *expect::<f64>(value)?)? {
                    out.write_str(NULL)?;
                }
            }
        }
        Ok(())
    }

    fn write_dynamic<W>(&self, out: &mut W, value: &Value, options: NodeOptions) -> Result<()>
        where W: JsonWrite + ?Sized
    {
        match value {
            Value::Null => out.write_str(self.null_token())?,
            Value::Bool(b) => out.write_str(self.serialize_bool(*b))?,
            Value::Number(n) => {
                if !format_f64(out, *n)? {
                    out.write_str(NULL)?;
                }
            }
            Value::String(s) => format_escaped_str(out, s)?,
            Value::Array(elements) => {
                return self.write_elements(out, elements.iter().map(|element| element as &dyn Reflect), options);
            }
            Value::Dictionary(map) => {
                out.write_byte(b'{')?;
                self.write_map_entries(out, &mut true, map, options)?;
                out.write_byte(b'}')?;
            }
            Value::Custom(obj) => {
                let prepared = self.prepare(&**obj, options)?;
                return self.write_prepared(out, prepared, options);
            }
        }
        Ok(())
    }

    /// Lists keep null placeholders.
    fn write_elements<'a, W, I>(&self, out: &mut W, elements: I, options: NodeOptions) -> Result<()>
        where W: JsonWrite + ?Sized,
              I: Iterator<Item = &'a dyn Reflect>
    {
        let options = options | NodeOptions::SERIALIZE_NULL;
        out.write_byte(b'[')?;
        let mut first = true;
        for element in elements {
            separator(out, &mut first)?;
            let prepared = self.prepare(element, options)?;
            self.write_prepared(out, prepared, options)?;
        }
        Ok(out.write_byte(b']')?)
    }

    fn write_map_entries<W>(&self, out: &mut W, first: &mut bool, map: &Map, options: NodeOptions) -> Result<()>
        where W: JsonWrite + ?Sized
    {
        for (key, value) in map {
            self.write_entry(out, first, key, value, options)?;
        }
        Ok(())
    }

    /// Write `"key":value`, skipping entries with a null key or an absent
    /// value. Keys that do not serialize to a JSON string are quoted.
    fn write_entry<W>(
        &self,
        out: &mut W,
        first: &mut bool,
        key: &dyn Reflect,
        value: &dyn Reflect,
        options: NodeOptions
    ) -> Result<()>
        where W: JsonWrite + ?Sized
    {
        let key_options = options & !NodeOptions::SERIALIZE_NULL;
        let Some(key_text) = self.serialize(key, key_options)? else {
            return Ok(());
        };
        let prepared = self.prepare(value, options)?;
        if prepared.is_absent() && !options.should_serialize_null() {
            return Ok(());
        }
        separator(out, first)?;
        if key_text.starts_with('"') {
            out.write_str(&key_text)?;
        }
        else {
            format_escaped_str(out, &key_text)?;
        }
        out.write_byte(b':')?;
        self.write_prepared(out, prepared, options)
    }

    fn write_object<W>(&self, out: &mut W, class: &ClassInfo, obj: &dyn Reflect) -> Result<()>
        where W: JsonWrite + ?Sized
    {
        trace!("serializing `{}` by parts", obj.reflect_type_info().type_name());
        class.notify_serialization(obj, self, Phase::WillBegin);
        match self.write_members(out, class, obj) {
            Ok(()) => {
                class.notify_serialization(obj, self, Phase::Succeeded);
                Ok(())
            }
            Err(err) => {
                class.notify_serialization(obj, self, Phase::Failed);
                Err(err)
            }
        }
    }

    fn write_members<W>(&self, out: &mut W, class: &ClassInfo, obj: &dyn Reflect) -> Result<()>
        where W: JsonWrite + ?Sized
    {
        let tuple = class.options().should_use_tuple_format();
        let (members, extras) = introspect::serialized_members(class);
        out.write_byte(if tuple { b'[' } else { b'{' })?;
        let mut first = true;
        for member in members {
            let options = member.options();
            if !options.is_serialized() {
                continue;
            }
            let value = member.get(obj)?;
            let prepared = self.prepare(&*value, options)?;
            if prepared.is_absent() && !options.should_serialize_null() {
                continue;
            }
            separator(out, &mut first)?;
            if !tuple {
                format_escaped_str(out, member.key())?;
                out.write_byte(b':')?;
            }
            self.write_prepared(out, prepared, options)?;
        }
        if let Some(member) = extras.filter(|_| !tuple) {
            let options = member.extras_attribute().map(|extras| extras.options).unwrap_or_default();
            let value = member.get(obj)?;
            if let Some(map) = value.downcast_ref::<Map>() {
                self.write_map_entries(out, &mut first, map, options)?;
            }
        }
        Ok(out.write_byte(if tuple { b']' } else { b'}' })?)
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Serializer")
            .field("use_undefined_for_null", &self.use_undefined_for_null)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

fn expect<T: Reflect>(value: &dyn Reflect) -> Result<&T> {
    value.downcast_ref::<T>().ok_or_else(|| Error::InvalidArgument(format!(
        "descriptor of `{}` does not match the value", value.reflect_type_info().type_name())))
}

#[inline]
fn separator<W: JsonWrite + ?Sized>(out: &mut W, first: &mut bool) -> WriteResult<()> {
    if *first {
        *first = false;
        Ok(())
    }
    else {
        out.write_byte(b',')
    }
}

/// Write a finite `f64` in the shortest round-trip form. Returns `false`
/// and writes nothing when the value is not finite.
pub(crate) fn format_f64<W: JsonWrite + ?Sized>(out: &mut W, v: f64) -> WriteResult<bool> {
    if !v.is_finite() {
        return Ok(false);
    }
    let mut buffer = ryu_js::Buffer::new();
    out.write_str(buffer.format_finite(v))?;
    Ok(true)
}

/// Like [`format_f64`] but in `f32` precision.
pub(crate) fn format_f32<W: JsonWrite + ?Sized>(out: &mut W, v: f32) -> WriteResult<bool> {
    if !v.is_finite() {
        return Ok(false);
    }
    let mut buffer = ryu_js::Buffer::new();
    out.write_str(buffer.format_finite(v))?;
    Ok(true)
}

/// Write `value` as a quoted JSON string.
pub(crate) fn format_escaped_str<W: JsonWrite + ?Sized>(out: &mut W, value: &str) -> WriteResult<()> {
    out.write_byte(b'"')?;
    format_escaped_str_contents(out, value)?;
    out.write_byte(b'"')
}

fn format_escaped_str_contents<W: JsonWrite + ?Sized>(writer: &mut W, value: &str) -> WriteResult<()> {
    let bytes = value.as_bytes();

    let mut start = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        let escape = match byte {
            0x00..=0x1F => ESCAPE[byte as usize],
            QU|BS => byte,
            _ => continue
        };

        if start < i {
            writer.write_str(&value[start..i])?;
        }

        if escape == UU {
            writer.write(b"\\u00")?;
            writer.write(&hex(byte))?;
        }
        else {
            writer.write(&[b'\\', escape])?;
        }

        start = i + 1;
    }

    if start == bytes.len() {
        return Ok(());
    }

    writer.write_str(&value[start..])
}

#[inline(always)]
fn hex(byte: u8) -> [u8; 2] {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    [DIGITS[(byte >> 4) as usize], DIGITS[(byte & 0xF) as usize]]
}

const BB: u8 = b'b'; // \x08
const TT: u8 = b't'; // \x09
const NN: u8 = b'n'; // \x0A
const FF: u8 = b'f'; // \x0C
const RR: u8 = b'r'; // \x0D
const QU: u8 = b'"'; // \x22
const BS: u8 = b'\\'; // \x5C
const UU: u8 = b'u'; // \x00...\x1F except the ones above

// Lookup table of escape sequences. A value of b'x' at index i means that byte
// i is escaped as "\x" in JSON.
static ESCAPE: [u8; 32] = [
    //   1   2   3   4   5   6   7   8   9   A   B   C   D   E   F
    UU, UU, UU, UU, UU, UU, UU, UU, BB, TT, NN, UU, FF, RR, UU, UU, // 0
    UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, UU, // 1
];
