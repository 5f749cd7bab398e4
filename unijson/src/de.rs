//! Descriptor driven deserializer over the JSON [`Node`] tree.
use core::fmt;
use core::str::FromStr;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::hooks::DeserializeHook;
use crate::instantiate::{Instantiater, SimpleInstantiater};
use crate::introspect;
use crate::node::Node;
use crate::options::{NodeOptions, ObjectTypes};
use crate::parse::parse;
use crate::reflect::{
    take_option, ClassInfo, DictionaryInfo, EnumInfo, ListInfo, Member, MemberValue, NumberKind,
    Phase, Reflect, Restriction, Shape, TypeInfo, TypeRef, Typed
};
use crate::value::{Map, Value};

/// Reads typed values from JSON nodes.
///
/// Class instances are created by the [`Instantiater`] and then filled
/// member by member. The deserializer itself carries no per call state and
/// may be shared between threads. A process-wide instance is available
/// through [`Deserializer::default_instance`].
#[derive(Clone)]
pub struct Deserializer {
    instantiater: Arc<dyn Instantiater>,
    hook: Option<Arc<dyn DeserializeHook>>,
}

static DEFAULT: OnceLock<RwLock<Arc<Deserializer>>> = OnceLock::new();

fn default_cell() -> &'static RwLock<Arc<Deserializer>> {
    DEFAULT.get_or_init(|| RwLock::new(Arc::new(Deserializer::new())))
}

impl Default for Deserializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deserializer {
    pub fn new() -> Self {
        Deserializer { instantiater: Arc::new(SimpleInstantiater), hook: None }
    }

    pub fn with_instantiater(mut self, instantiater: Arc<dyn Instantiater>) -> Self {
        self.instantiater = instantiater;
        self
    }

    /// Consult `hook` before deserializing onto any instance.
    pub fn with_hook(mut self, hook: Arc<dyn DeserializeHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn instantiater(&self) -> &dyn Instantiater {
        &*self.instantiater
    }

    /// The process-wide deserializer.
    pub fn default_instance() -> Arc<Deserializer> {
        default_cell().read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Replace the process-wide deserializer.
    pub fn set_default(deserializer: Arc<Deserializer>) {
        *default_cell().write().unwrap_or_else(PoisonError::into_inner) = deserializer;
    }

    /// Deserialize a `T` with default options. Null yields `None`.
    pub fn deserialize<T: Typed>(&self, node: &Node) -> Result<Option<T>> {
        self.deserialize_with(node, NodeOptions::default())
    }

    /// Deserialize a `T`. Null, and failures tolerated by `options`, yield
    /// `None`.
    pub fn deserialize_with<T: Typed>(&self, node: &Node, options: NodeOptions) -> Result<Option<T>> {
        take_option(self.deserialize_type(node, T::type_info(), options, None)?)
    }

    /// Parse `text` and deserialize a `T`.
    pub fn deserialize_str<T: Typed>(&self, text: &str, options: NodeOptions) -> Result<Option<T>> {
        self.deserialize_with(&parse(text)?, options)
    }

    /// Deserialize an instance of the type described by `info`.
    ///
    /// Dynamically typed values are restricted by `restriction`, or to the
    /// JSON types when `None`.
    pub fn deserialize_type(
        &self,
        node: &Node,
        info: &'static TypeInfo,
        options: NodeOptions,
        restriction: Option<&Restriction>
    ) -> Result<Option<Box<dyn Reflect>>>
    {
        match restriction {
            Some(restriction) => {
                let custom = restriction.custom_types();
                self.dispatch(node, info, options, restriction.types(), &custom)
            }
            None => self.dispatch(node, info, options, ObjectTypes::JSON, &[])
        }
    }

    /// Deserialize onto an existing instance.
    ///
    /// Application hooks and the object's own
    /// [`JsonDeserialize`](crate::JsonDeserialize) implementation take
    /// precedence over the member by member pass.
    pub fn deserialize_on(&self, obj: &mut dyn Reflect, node: &Node, options: NodeOptions) -> Result<()> {
        self.deserialize_on_with(obj, node, options, &HashSet::new())
    }

    /// Like [`deserialize_on`](Self::deserialize_on), skipping `ignored_keys`.
    pub fn deserialize_on_with(
        &self,
        obj: &mut dyn Reflect,
        node: &Node,
        options: NodeOptions,
        ignored_keys: &HashSet<String>
    ) -> Result<()>
    {
        check_target(obj)?;
        self.merge(obj, node, options, ignored_keys)
    }

    /// Parse `text` and deserialize onto `obj`.
    pub fn deserialize_on_str(&self, obj: &mut dyn Reflect, text: &str, options: NodeOptions) -> Result<()> {
        self.deserialize_on(obj, &parse(text)?, options)
    }

    /// Run the member by member pass on `obj` only.
    pub fn deserialize_by_parts(
        &self,
        obj: &mut dyn Reflect,
        node: &Node,
        options: NodeOptions,
        ignored_keys: &HashSet<String>
    ) -> Result<()>
    {
        check_target(obj)?;
        self.by_parts(innermost_mut(obj)?, node, options, ignored_keys)
    }

    /// Deserialize a dynamically typed value.
    ///
    /// Fails with [`Error::InvalidArgument`] when custom types are listed
    /// without [`ObjectTypes::CUSTOM`], or when one of them is not a class.
    pub fn deserialize_to_object(
        &self,
        node: &Node,
        types: ObjectTypes,
        custom: &[TypeRef],
        options: NodeOptions
    ) -> Result<Option<Value>>
    {
        let custom = custom_candidates(types, custom)?;
        self.dynamic(node, options, types, &custom)
    }

    pub fn deserialize_to_int(&self, node: &Node, options: NodeOptions) -> Result<Option<i32>> {
        self.deserialize_with(node, options)
    }

    pub fn deserialize_to_uint(&self, node: &Node, options: NodeOptions) -> Result<Option<u32>> {
        self.deserialize_with(node, options)
    }

    pub fn deserialize_to_long(&self, node: &Node, options: NodeOptions) -> Result<Option<i64>> {
        self.deserialize_with(node, options)
    }

    pub fn deserialize_to_byte(&self, node: &Node, options: NodeOptions) -> Result<Option<u8>> {
        self.deserialize_with(node, options)
    }

    pub fn deserialize_to_float(&self, node: &Node, options: NodeOptions) -> Result<Option<f32>> {
        self.deserialize_with(node, options)
    }

    pub fn deserialize_to_double(&self, node: &Node, options: NodeOptions) -> Result<Option<f64>> {
        self.deserialize_with(node, options)
    }

    pub fn deserialize_to_bool(&self, node: &Node, options: NodeOptions) -> Result<Option<bool>> {
        self.deserialize_with(node, options)
    }

    pub fn deserialize_to_string(&self, node: &Node, options: NodeOptions) -> Result<Option<String>> {
        self.deserialize_with(node, options)
    }

    /// Fails with [`Error::InvalidArgument`] when `T` is not an enum.
    pub fn deserialize_to_enum<T: Typed>(&self, node: &Node, options: NodeOptions) -> Result<Option<T>> {
        if T::type_info().as_enum().is_none() {
            return Err(Error::InvalidArgument(
                format!("`{}` is not an enum", T::type_info().type_name())));
        }
        self.deserialize_with(node, options)
    }

    pub fn deserialize_to_nullable<T: Typed>(&self, node: &Node, options: NodeOptions) -> Result<Option<T>> {
        self.deserialize_with(node, options)
    }

    pub fn deserialize_to_list<T: Typed>(&self, node: &Node, options: NodeOptions) -> Result<Option<Vec<T>>> {
        self.deserialize_with(node, options)
    }

    /// A list of dynamically typed values.
    pub fn deserialize_to_object_list(
        &self,
        node: &Node,
        types: ObjectTypes,
        custom: &[TypeRef],
        options: NodeOptions
    ) -> Result<Option<Vec<Value>>>
    {
        let custom = custom_candidates(types, custom)?;
        take_option(self.dispatch(node, Vec::<Value>::type_info(), options, types, &custom)?)
    }

    pub fn deserialize_to_dictionary<K, V>(&self, node: &Node, options: NodeOptions) -> Result<Option<HashMap<K, V>>>
        where K: Typed + Eq + Hash,
              V: Typed
    {
        self.deserialize_with(node, options)
    }

    /// A dictionary of dynamically typed values.
    pub fn deserialize_to_object_dictionary<K>(
        &self,
        node: &Node,
        types: ObjectTypes,
        custom: &[TypeRef],
        options: NodeOptions
    ) -> Result<Option<HashMap<K, Value>>>
        where K: Typed + Eq + Hash
    {
        let custom = custom_candidates(types, custom)?;
        take_option(self.dispatch(node, HashMap::<K, Value>::type_info(), options, types, &custom)?)
    }

    /// Fail with a type mismatch unless `options` tolerates it.
    pub(crate) fn handle_mismatch(&self, options: NodeOptions, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        if options.should_ignore_type_mismatch() {
            debug!("tolerated type mismatch: {}", message);
            Ok(())
        }
        else {
            Err(Error::TypeMismatch(message))
        }
    }

    /// Fail with an unknown type error unless `options` tolerates it.
    pub(crate) fn handle_unknown(&self, options: NodeOptions, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        if options.should_ignore_unknown_type() {
            debug!("tolerated unknown type: {}", message);
            Ok(())
        }
        else {
            Err(Error::UnknownType(message))
        }
    }

    fn dispatch(
        &self,
        node: &Node,
        info: &'static TypeInfo,
        options: NodeOptions,
        types: ObjectTypes,
        custom: &[&'static TypeInfo]
    ) -> Result<Option<Box<dyn Reflect>>>
    {
        if node.is_null() {
            return Ok(None);
        }
        match info.shape() {
            Shape::Number(kind) => self.number(node, *kind, options),
            Shape::Bool => match node {
                Node::Bool(b) => Ok(Some(Box::new(*b))),
                _ => self.mismatch(options, format_args!("expected a boolean, found {}", node))
            }
            Shape::Char => {
                self.handle_unknown(options, format!("unknown primitive type `{}`", info.type_name()))?;
                Ok(None)
            }
            Shape::Enum(enum_info) => self.enumeration(node, info, enum_info, options),
            Shape::String => match node {
                Node::String(s) => Ok(Some(Box::new(s.clone()))),
                _ => self.mismatch(options, format_args!("expected a string, found {}", node))
            }
            Shape::Nullable(nullable) => {
                let inner = self.dispatch(node, nullable.inner.get(), options, types, custom)?;
                inner.map(nullable.wrap).transpose()
            }
            Shape::List(list) => self.list(node, list, options, types, custom),
            Shape::Dictionary(dictionary) => self.dictionary(node, dictionary, options, types, custom),
            Shape::Dynamic => Ok(self.dynamic(node, options, types, custom)?
                .map(|value| Box::new(value) as Box<dyn Reflect>)),
            Shape::Custom(..) => self.custom(node, info, options)
        }
    }

    fn mismatch(&self, options: NodeOptions, message: fmt::Arguments<'_>) -> Result<Option<Box<dyn Reflect>>> {
        self.handle_mismatch(options, message.to_string())?;
        Ok(None)
    }

    /// Integers parse the exact number text, floats any number.
    fn number(&self, node: &Node, kind: NumberKind, options: NodeOptions) -> Result<Option<Box<dyn Reflect>>> {
        let parsed = match node {
            Node::Number(text) => match kind {
                NumberKind::I8 => parse_number::<i8>(text),
                NumberKind::I16 => parse_number::<i16>(text),
                NumberKind::I32 => parse_number::<i32>(text),
                NumberKind::I64 => parse_number::<i64>(text),
                NumberKind::Isize => parse_number::<isize>(text),
                NumberKind::U8 => parse_number::<u8>(text),
                NumberKind::U16 => parse_number::<u16>(text),
                NumberKind::U32 => parse_number::<u32>(text),
                NumberKind::U64 => parse_number::<u64>(text),
                NumberKind::Usize => parse_number::<usize>(text),
                NumberKind::F32 => parse_number::<f32>(text),
                NumberKind::F64 => parse_number::<f64>(text),
            }
            _ => None
        };
        match parsed {
            Some(value) => Ok(Some(value)),
            None => self.mismatch(options, format_args!("expected {:?}, found {}", kind, node))
        }
    }

    fn enumeration(
        &self,
        node: &Node,
        info: &'static TypeInfo,
        enum_info: &EnumInfo,
        options: NodeOptions
    ) -> Result<Option<Box<dyn Reflect>>>
    {
        let member = match node {
            Node::Number(text) if enum_info.use_integers() => {
                text.parse::<i64>().ok().and_then(|value| enum_info.by_value(value))
            }
            Node::String(text) => enum_info.strip_affixes(text)
                .and_then(|name| enum_info.by_name_ignore_case(name)),
            _ => None
        };
        match member {
            Some(member) => Ok(Some(member.make())),
            None => self.mismatch(options, format_args!(
                "expected enum of type `{}`, found {}", info.type_name(), node))
        }
    }

    fn list(
        &self,
        node: &Node,
        list: &ListInfo,
        options: NodeOptions,
        types: ObjectTypes,
        custom: &[&'static TypeInfo]
    ) -> Result<Option<Box<dyn Reflect>>>
    {
        let Node::Array(elements) = node else {
            return self.mismatch(options, format_args!("expected an array, found {}", node));
        };
        let element = list.element.get();
        let element_options = options & !NodeOptions::REPLACE_DESERIALIZED;
        let values = elements.iter()
            .map(|child| self.dispatch(child, element, element_options, types, custom))
            .collect::<Result<Vec<_>>>()?;
        self.built((list.build)(values), options)
    }

    /// Keys are always read with default options.
    fn dictionary(
        &self,
        node: &Node,
        dictionary: &DictionaryInfo,
        options: NodeOptions,
        types: ObjectTypes,
        custom: &[&'static TypeInfo]
    ) -> Result<Option<Box<dyn Reflect>>>
    {
        let Node::Object(members) = node else {
            return self.mismatch(options, format_args!("expected a dictionary, found {}", node));
        };
        let key_info = dictionary.key.get();
        let value_info = dictionary.value.get();
        let value_options = options & !NodeOptions::REPLACE_DESERIALIZED;
        let mut entries = Vec::with_capacity(members.len());
        for (key, child) in members {
            let key_value = self.dispatch(&key_node(key, key_info), key_info,
                    NodeOptions::default(), ObjectTypes::JSON, &[])?
                .ok_or_else(|| Error::TypeMismatch(format!("dictionary key `{}` is null", key)))?;
            let value = self.dispatch(child, value_info, value_options, types, custom)?;
            entries.push((key_value, value));
        }
        self.built((dictionary.build)(entries), options)
    }

    /// Collections reject nulls their element type cannot hold.
    fn built(&self, built: Result<Box<dyn Reflect>>, options: NodeOptions) -> Result<Option<Box<dyn Reflect>>> {
        match built {
            Ok(value) => Ok(Some(value)),
            Err(Error::TypeMismatch(message)) => {
                self.handle_mismatch(options, message)?;
                Ok(None)
            }
            Err(err) => Err(err)
        }
    }

    fn dynamic(
        &self,
        node: &Node,
        options: NodeOptions,
        types: ObjectTypes,
        custom: &[&'static TypeInfo]
    ) -> Result<Option<Value>>
    {
        let nested = options & !NodeOptions::REPLACE_DESERIALIZED;
        let value = match node {
            Node::Array(elements) => {
                if !types.supports_array() {
                    self.handle_mismatch(options, "arrays are not allowed here")?;
                    return Ok(None);
                }
                let mut values = Vec::with_capacity(elements.len());
                for child in elements {
                    values.push(self.dynamic(child, nested, types, custom)?.unwrap_or_default());
                }
                Value::Array(values)
            }
            Node::Bool(b) => {
                if !types.supports_bool() {
                    self.handle_mismatch(options, "booleans are not allowed here")?;
                    return Ok(None);
                }
                Value::Bool(*b)
            }
            Node::Number(..) => {
                if !types.supports_number() {
                    self.handle_mismatch(options, "numbers are not allowed here")?;
                    return Ok(None);
                }
                match node.as_f64() {
                    Some(n) => Value::Number(n),
                    None => {
                        self.handle_mismatch(options, format!("expected a number, found {}", node))?;
                        return Ok(None);
                    }
                }
            }
            Node::Object(members) => {
                if types.supports_custom() {
                    if let Some(obj) = self.first_candidate(node, custom) {
                        return Ok(Some(Value::Custom(obj)));
                    }
                }
                if !types.supports_dictionary() {
                    self.handle_mismatch(options, "dictionaries are not allowed here")?;
                    return Ok(None);
                }
                let mut map = Map::new();
                for (key, child) in members {
                    let value = self.dynamic(child, nested, types, custom)?.unwrap_or_default();
                    map.insert(key.clone(), value);
                }
                Value::Dictionary(map)
            }
            Node::String(s) => {
                if !types.supports_string() {
                    self.handle_mismatch(options, "strings are not allowed here")?;
                    return Ok(None);
                }
                Value::String(s.clone())
            }
            Node::Null|Node::Absent => return Ok(None)
        };
        Ok(Some(value))
    }

    /// The first custom type deserializing `node` to a non-null instance.
    fn first_candidate(&self, node: &Node, custom: &[&'static TypeInfo]) -> Option<Box<dyn Reflect>> {
        for info in custom {
            match self.dispatch(node, info, NodeOptions::default(), ObjectTypes::JSON, &[]) {
                Ok(Some(obj)) => return Some(obj),
                Ok(None) => {}
                Err(err) => debug!("`{}` rejected as a candidate: {}", info.type_name(), err)
            }
        }
        None
    }

    fn custom(&self, node: &Node, info: &'static TypeInfo, options: NodeOptions) -> Result<Option<Box<dyn Reflect>>> {
        let data = self.instantiater.instantiate(node, info, None, options, self)?;
        let (object, needs_deserialization, ignored_keys) = data.into_parts();
        let Some(mut object) = object else {
            return Ok(None);
        };
        if needs_deserialization {
            self.merge(&mut *object, node, options, &ignored_keys)?;
        }
        Ok(Some(object))
    }

    fn merge(
        &self,
        obj: &mut dyn Reflect,
        node: &Node,
        options: NodeOptions,
        ignored_keys: &HashSet<String>
    ) -> Result<()>
    {
        let obj = innermost_mut(obj)?;
        if let Some(hook) = &self.hook {
            if hook.try_deserialize_on(self, obj, node, options, ignored_keys)? {
                trace!("`{}` deserialized by hook", obj.reflect_type_info().type_name());
                return Ok(());
            }
        }
        if let Some(class) = obj.reflect_type_info().as_class() {
            if let Some(result) = class.custom_deserialize(obj, node, self) {
                return result;
            }
        }
        self.by_parts(obj, node, options, ignored_keys)
    }

    fn by_parts(
        &self,
        obj: &mut dyn Reflect,
        node: &Node,
        options: NodeOptions,
        ignored_keys: &HashSet<String>
    ) -> Result<()>
    {
        let info = obj.reflect_type_info();
        let class = info.as_class().ok_or_else(|| Error::InvalidArgument(
            format!("cannot deserialize on `{}`", info.type_name())))?;
        trace!("deserializing `{}` by parts", info.type_name());
        class.notify_deserialization(obj, self, Phase::WillBegin);
        let result = match node {
            Node::Object(members) => self.fill(obj, info, class, members, ignored_keys),
            Node::Null|Node::Absent => Ok(()),
            _ => {
                class.notify_deserialization(obj, self, Phase::Failed);
                return self.handle_mismatch(options, format!("expected a JSON object, found {}", node));
            }
        };
        let phase = if result.is_ok() { Phase::Succeeded } else { Phase::Failed };
        class.notify_deserialization(obj, self, phase);
        result
    }

    fn fill(
        &self,
        obj: &mut dyn Reflect,
        info: &'static TypeInfo,
        class: &'static ClassInfo,
        members: &[(String, Node)],
        ignored_keys: &HashSet<String>
    ) -> Result<()>
    {
        let map = introspect::deserialized_members(class)?;
        let extras_member = map.extras();
        let extras_options = extras_member
            .and_then(Member::extras_attribute)
            .map(|extras| extras.options)
            .unwrap_or_default();
        let extras_restriction = extras_member.and_then(Member::restriction);
        let extras_types = extras_restriction.map_or(ObjectTypes::JSON, Restriction::types);
        let extras_custom = extras_restriction.map(Restriction::custom_types).unwrap_or_default();
        let mut extras = Map::new();

        for (key, child) in members {
            if ignored_keys.contains(key) {
                continue;
            }
            if let Some(candidates) = map.get(key) {
                self.assign(obj, candidates, child)?;
            }
            else if extras_member.is_some() {
                let value = self.dynamic(child, extras_options, extras_types, &extras_custom)?;
                extras.insert(key.clone(), value.unwrap_or_default());
            }
            else if class.options().should_throw_at_unknown_key() {
                return Err(Error::UnknownKey { key: key.clone(), type_name: info.type_name() });
            }
            else {
                debug!("skipping unknown key `{}` of `{}`", key, info.type_name());
            }
        }

        if let Some(member) = extras_member {
            if !extras.is_empty() || extras_options.should_assign_null() {
                member.set(obj, Some(Box::new(extras)))?;
            }
        }
        Ok(())
    }

    /// Try the candidates sharing a key in order. Only the last candidate's
    /// failure is reported.
    fn assign(&self, obj: &mut dyn Reflect, candidates: &[&Member], node: &Node) -> Result<()> {
        for (index, member) in candidates.iter().enumerate() {
            match self.assign_member(obj, member, node) {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(err) if index + 1 == candidates.len() => return Err(err),
                Err(err) => debug!("candidate `{}` rejected: {}", member.name(), err)
            }
        }
        Ok(())
    }

    /// Returns `false` when the member was left for the next candidate.
    fn assign_member(&self, obj: &mut dyn Reflect, member: &Member, node: &Node) -> Result<bool> {
        let options = member.options();
        let declared = member.member_type();
        if node.is_object() && merges_in_place(declared) && !options.should_replace_with_deserialized()
            && self.merge_member(obj, member, node, options)?
        {
            return Ok(true);
        }
        let value = self.deserialize_type(node, declared, options, member.restriction())?;
        if value.is_some() || options.should_assign_null() {
            member.set(obj, value)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Merge `node` into the member's current object, if it holds one.
    fn merge_member(&self, obj: &mut dyn Reflect, member: &Member, node: &Node, options: NodeOptions) -> Result<bool> {
        if let Some(current) = member.get_mut(obj)? {
            if !is_mergeable(current) {
                return Ok(false);
            }
            self.merge(current, node, options, &HashSet::new())?;
            return Ok(true);
        }
        if !member.can_read() {
            return Ok(false);
        }
        let MemberValue::Owned(mut current) = member.get(obj)? else {
            return Ok(false);
        };
        if !is_mergeable(&*current) {
            return Ok(false);
        }
        self.merge(&mut *current, node, options, &HashSet::new())?;
        member.set(obj, Some(current))?;
        Ok(true)
    }
}

impl fmt::Debug for Deserializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deserializer")
            .field("hook", &self.hook.is_some())
            .finish_non_exhaustive()
    }
}

fn parse_number<T: Typed + FromStr>(text: &str) -> Option<Box<dyn Reflect>> {
    text.parse::<T>().ok().map(|value| Box::new(value) as Box<dyn Reflect>)
}

fn check_target(obj: &dyn Reflect) -> Result<()> {
    let info = obj.reflect_type_info();
    if info.is_primitive_or_enum() {
        return Err(Error::InvalidArgument(
            format!("cannot deserialize on `{}`", info.type_name())));
    }
    Ok(())
}

fn innermost_mut(obj: &mut dyn Reflect) -> Result<&mut dyn Reflect> {
    if obj.reflect_delegate().is_none() {
        return Ok(obj);
    }
    match obj.reflect_delegate_mut() {
        Some(inner) => innermost_mut(inner),
        None => Err(Error::InvalidArgument("inconsistent delegate".into()))
    }
}

/// Declared types whose current instances are filled in place: reference
/// classes and dynamic values, possibly behind `Option`.
fn merges_in_place(mut info: &'static TypeInfo) -> bool {
    while let Some(nullable) = info.as_nullable() {
        info = nullable.inner.get();
    }
    match info.shape() {
        Shape::Custom(class) => !class.is_value_type(),
        Shape::Dynamic => true,
        _ => false
    }
}

fn is_mergeable(current: &dyn Reflect) -> bool {
    !current.reflect_is_null() && match current.innermost().reflect_type_info().shape() {
        Shape::Custom(class) => !class.is_value_type(),
        _ => false
    }
}

/// The node a dictionary key is read from.
fn key_node(key: &str, info: &TypeInfo) -> Node {
    match info.shape() {
        Shape::Number(..) => Node::Number(key.to_owned()),
        Shape::Enum(enum_info) if enum_info.use_integers() && key.parse::<i64>().is_ok() => {
            Node::Number(key.to_owned())
        }
        Shape::Bool if key == "true" || key == "false" => Node::Bool(key == "true"),
        _ => Node::String(key.to_owned())
    }
}

fn custom_candidates(types: ObjectTypes, custom: &[TypeRef]) -> Result<Vec<&'static TypeInfo>> {
    if !custom.is_empty() && !types.supports_custom() {
        return Err(Error::InvalidArgument("restrictions do not allow custom types".into()));
    }
    let mut candidates: Vec<&'static TypeInfo> = Vec::with_capacity(custom.len());
    for info in custom.iter().map(|ty| ty.get()) {
        if !introspect::is_custom_type(info) {
            return Err(Error::InvalidArgument(format!("unsupported custom type `{}`", info.type_name())));
        }
        if !candidates.iter().any(|seen| seen.type_id() == info.type_id()) {
            candidates.push(info);
        }
    }
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::options::{EnumFormat, ObjectOptions};
    use crate::reflect::{ClassBuilder, EnumBuilder, TypeInfoCell};

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Level { Low, High }

    impl Typed for Level {
        fn type_info() -> &'static TypeInfo {
            static CELL: TypeInfoCell = TypeInfoCell::new();
            CELL.get_or_init(|| EnumBuilder::new()
                .member_value("Low", Level::Low, 1)
                .member_value("High", Level::High, 5)
                .use_integers()
                .format(EnumFormat::Uppercased)
                .build())
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Inner {
        x: i32,
        y: i32,
    }

    impl Typed for Inner {
        fn type_info() -> &'static TypeInfo {
            static CELL: TypeInfoCell = TypeInfoCell::new();
            CELL.get_or_init(|| ClassBuilder::<Self>::new()
                .default_constructor()
                .member(Member::field("x", |i: &Self| &i.x, |i: &mut Self| &mut i.x))
                .member(Member::field("y", |i: &Self| &i.y, |i: &mut Self| &mut i.y))
                .build())
        }
    }

    #[derive(Debug, Default)]
    struct Outer {
        inner: Option<Inner>,
        fresh: Option<Inner>,
        tags: Vec<String>,
        loose: Value,
    }

    impl Typed for Outer {
        fn type_info() -> &'static TypeInfo {
            static CELL: TypeInfoCell = TypeInfoCell::new();
            CELL.get_or_init(|| ClassBuilder::<Self>::new()
                .default_constructor()
                .member(Member::field("inner", |o: &Self| &o.inner, |o: &mut Self| &mut o.inner))
                .member(Member::field("fresh", |o: &Self| &o.fresh, |o: &mut Self| &mut o.fresh)
                    .with_options(NodeOptions::REPLACE_DESERIALIZED))
                .member(Member::field("tags", |o: &Self| &o.tags, |o: &mut Self| &mut o.tags)
                    .with_options(NodeOptions::IGNORE_TYPE_MISMATCH | NodeOptions::DONT_ASSIGN_NULL))
                .member(Member::field("loose", |o: &Self| &o.loose, |o: &mut Self| &mut o.loose)
                    .restrict(Restriction::new(ObjectTypes::STRING | ObjectTypes::NUMBER)))
                .build())
        }
    }

    fn node(text: &str) -> Node {
        parse(text).unwrap()
    }

    #[test]
    fn test_primitives() {
        let de = Deserializer::new();
        assert_eq!(de.deserialize_to_int(&node("-7"), NodeOptions::default()).unwrap(), Some(-7));
        assert!(de.deserialize_to_int(&node("1.5"), NodeOptions::default()).unwrap_err().is_type_mismatch());
        assert_eq!(de.deserialize_to_int(&node("1.5"), NodeOptions::IGNORE_TYPE_MISMATCH).unwrap(), None);
        assert!(de.deserialize_to_byte(&node("256"), NodeOptions::default()).is_err());
        assert_eq!(de.deserialize_to_uint(&node("4000000000"), NodeOptions::default()).unwrap(), Some(4000000000));
        assert_eq!(de.deserialize_to_long(&node("null"), NodeOptions::default()).unwrap(), None);
        assert_eq!(de.deserialize_to_double(&node("2"), NodeOptions::default()).unwrap(), Some(2.0));
        assert_eq!(de.deserialize_to_float(&node("-1.5e1"), NodeOptions::default()).unwrap(), Some(-15.0));
        assert!(de.deserialize_to_bool(&node("1"), NodeOptions::default()).is_err());
        assert_eq!(de.deserialize_to_string(&node("\"a\""), NodeOptions::default()).unwrap().unwrap(), "a");
        assert!(de.deserialize_to_string(&node("1"), NodeOptions::default()).is_err());
        let err = de.deserialize::<char>(&node("\"c\"")).unwrap_err();
        assert!(matches!(err, Error::UnknownType(..)));
        assert_eq!(de.deserialize_with::<char>(&node("\"c\""), NodeOptions::IGNORE_INSTANTIATION_ERROR).unwrap(), None);
    }

    #[test]
    fn test_enums() {
        let de = Deserializer::new();
        assert_eq!(de.deserialize_to_enum::<Level>(&node("5"), NodeOptions::default()).unwrap(), Some(Level::High));
        assert_eq!(de.deserialize_to_enum::<Level>(&node("\"low\""), NodeOptions::default()).unwrap(), Some(Level::Low));
        assert!(de.deserialize_to_enum::<Level>(&node("3"), NodeOptions::default()).unwrap_err().is_type_mismatch());
        assert!(matches!(de.deserialize_to_enum::<u8>(&node("3"), NodeOptions::default()),
            Err(Error::InvalidArgument(..))));
    }

    #[test]
    fn test_collections() {
        let de = Deserializer::new();
        let list = de.deserialize_to_list::<Option<u8>>(&node("[1,null,3]"), NodeOptions::default()).unwrap();
        assert_eq!(list, Some(vec![Some(1), None, Some(3)]));
        let err = de.deserialize_to_list::<String>(&node(r#"["a",null]"#), NodeOptions::default()).unwrap_err();
        assert!(err.is_type_mismatch());
        let boxed = de.deserialize::<Box<[u8]>>(&node("[1,2]")).unwrap().unwrap();
        assert_eq!(&*boxed, &[1, 2]);
        let map = de.deserialize_to_dictionary::<u8, bool>(&node(r#"{"1":true,"2":false}"#), NodeOptions::default())
            .unwrap().unwrap();
        assert_eq!(map.get(&2), Some(&false));
        // keys are strict whatever the value options say
        let err = de.deserialize_to_dictionary::<u8, bool>(&node(r#"{"x":true}"#), NodeOptions::IGNORE_TYPE_MISMATCH)
            .unwrap_err();
        assert!(err.is_type_mismatch());
        let err = de.deserialize_to_dictionary::<u8, bool>(&node(r#"{"1":true,"01":true}"#), NodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateKey(..)));
        let map = de.deserialize::<BTreeMap<bool, i64>>(&node(r#"{"true":1}"#)).unwrap().unwrap();
        assert_eq!(map.get(&true), Some(&1));
    }

    #[test]
    fn test_dynamic() {
        let de = Deserializer::new();
        let value = de.deserialize_to_object(&node(r#"{"a":[1,"x",null]}"#), ObjectTypes::JSON, &[],
            NodeOptions::default()).unwrap().unwrap();
        let a = value.get("a").and_then(Value::as_array).unwrap();
        assert_eq!(a, &[Value::Number(1.0), Value::from("x"), Value::Null]);
        let err = de.deserialize_to_object(&node("[1]"), ObjectTypes::NUMBER, &[], NodeOptions::default())
            .unwrap_err();
        assert!(err.is_type_mismatch());
        assert!(matches!(de.deserialize_to_object(&node("{}"), ObjectTypes::JSON, &[TypeRef::of::<Inner>()],
            NodeOptions::default()), Err(Error::InvalidArgument(..))));
        assert!(matches!(de.deserialize_to_object(&node("{}"), ObjectTypes::ALL, &[TypeRef::of::<u8>()],
            NodeOptions::default()), Err(Error::InvalidArgument(..))));
        let value = de.deserialize_to_object(&node(r#"{"x":3}"#), ObjectTypes::ALL, &[TypeRef::of::<Inner>()],
            NodeOptions::default()).unwrap().unwrap();
        assert_eq!(value.as_custom::<Inner>(), Some(&Inner { x: 3, y: 0 }));
        // a failing candidate falls back to a dictionary
        let value = de.deserialize_to_object(&node(r#"{"z":3}"#), ObjectTypes::ALL, &[TypeRef::of::<Inner>()],
            NodeOptions::default()).unwrap().unwrap();
        assert_eq!(value.get("z"), Some(&Value::Number(3.0)));
        let list = de.deserialize_to_object_list(&node(r#"[true,"s"]"#), ObjectTypes::JSON, &[],
            NodeOptions::default()).unwrap().unwrap();
        assert_eq!(list, vec![Value::Bool(true), Value::from("s")]);
        let map = de.deserialize_to_object_dictionary::<String>(&node(r#"{"k":{"x":1}}"#), ObjectTypes::ALL,
            &[TypeRef::of::<Inner>()], NodeOptions::default()).unwrap().unwrap();
        assert!(map["k"].as_custom::<Inner>().is_some());
    }

    #[test]
    fn test_merge_and_replace() {
        let de = Deserializer::new();
        let mut outer = Outer {
            inner: Some(Inner { x: 1, y: 7 }),
            fresh: Some(Inner { x: 1, y: 7 }),
            tags: vec!["keep".into()],
            loose: Value::Null,
        };
        de.deserialize_on(&mut outer, &node(r#"{"inner":{"x":5},"fresh":{"x":5},"tags":3,"loose":2}"#),
            NodeOptions::default()).unwrap();
        assert_eq!(outer.inner, Some(Inner { x: 5, y: 7 }));
        assert_eq!(outer.fresh, Some(Inner { x: 5, y: 0 }));
        assert_eq!(outer.tags, ["keep"]);
        assert_eq!(outer.loose, Value::Number(2.0));
        let err = de.deserialize_on(&mut outer, &node(r#"{"loose":true}"#), NodeOptions::default()).unwrap_err();
        assert!(err.is_type_mismatch());
        let err = de.deserialize_on(&mut outer, &node(r#"{"other":1}"#), NodeOptions::default()).unwrap_err();
        assert!(matches!(err, Error::UnknownKey { ref key, .. } if key == "other"));
        // ignored keys never reach the members
        let ignored: HashSet<String> = ["other".to_owned()].into();
        de.deserialize_on_with(&mut outer, &node(r#"{"other":1}"#), NodeOptions::default(), &ignored).unwrap();
        assert!(matches!(de.deserialize_on(&mut 1u8, &node("{}"), NodeOptions::default()),
            Err(Error::InvalidArgument(..))));
        assert!(matches!(de.deserialize_on(&mut Level::Low, &node("{}"), NodeOptions::default()),
            Err(Error::InvalidArgument(..))));
    }

    #[test]
    fn test_by_parts_shape() {
        let de = Deserializer::new();
        let mut inner = Inner::default();
        assert!(de.deserialize_by_parts(&mut inner, &node("[1]"), NodeOptions::default(), &HashSet::new())
            .unwrap_err().is_type_mismatch());
        de.deserialize_by_parts(&mut inner, &node("[1]"), NodeOptions::IGNORE_TYPE_MISMATCH, &HashSet::new())
            .unwrap();
        de.deserialize_by_parts(&mut inner, &node("null"), NodeOptions::default(), &HashSet::new()).unwrap();
        assert_eq!(inner, Inner::default());
        #[derive(Debug, Default)]
        struct Tuple(i32);
        impl Typed for Tuple {
            fn type_info() -> &'static TypeInfo {
                static CELL: TypeInfoCell = TypeInfoCell::new();
                CELL.get_or_init(|| ClassBuilder::<Self>::new()
                    .options(ObjectOptions::TUPLE_FORMAT)
                    .member(Member::field("0", |t: &Self| &t.0, |t: &mut Self| &mut t.0))
                    .build())
            }
        }
        assert!(matches!(de.deserialize_on(&mut Tuple(1), &node("{}"), NodeOptions::default()),
            Err(Error::InvalidArgument(..))));
    }

    #[test]
    fn test_default_instance() {
        let de = Deserializer::default_instance();
        assert_eq!(de.deserialize_str::<Vec<u8>>("[1]", NodeOptions::default()).unwrap(), Some(vec![1]));
        assert!(matches!(de.deserialize_str::<u8>("[", NodeOptions::default()), Err(Error::Parse(..))));
    }
}
