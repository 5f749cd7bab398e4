//! Choosing and constructing the concrete instance for a class node.
use std::collections::HashSet;

use log::{debug, trace};

use crate::de::Deserializer;
use crate::error::{Error, Result};
use crate::node::Node;
use crate::options::NodeOptions;
use crate::reflect::{ClassInfo, Constructor, Reflect, Substitute, TypeInfo};

/// The outcome of an instantiation.
#[derive(Debug, Default)]
pub struct InstantiationData {
    object: Option<Box<dyn Reflect>>,
    needs_deserialization: bool,
    ignored_keys: HashSet<String>,
}

impl InstantiationData {
    pub fn new(
        object: Option<Box<dyn Reflect>>,
        needs_deserialization: bool,
        ignored_keys: HashSet<String>
    ) -> Self
    {
        InstantiationData { object, needs_deserialization, ignored_keys }
    }

    /// No object and nothing left to do.
    pub fn null() -> Self {
        Self::default()
    }

    pub fn object(&self) -> Option<&dyn Reflect> {
        self.object.as_deref()
    }

    /// Whether the field-by-field pass must still run. Always `false`
    /// without an object.
    pub fn needs_deserialization(&self) -> bool {
        self.object.is_some() && self.needs_deserialization
    }

    /// Keys already consumed, skipped by the field-by-field pass.
    pub fn ignored_keys(&self) -> &HashSet<String> {
        &self.ignored_keys
    }

    pub fn into_parts(self) -> (Option<Box<dyn Reflect>>, bool, HashSet<String>) {
        let needs_deserialization = self.needs_deserialization();
        (self.object, needs_deserialization, self.ignored_keys)
    }
}

/// Creates instances of class types from nodes.
///
/// Override [`try_instantiate`](Instantiater::try_instantiate) to take over
/// the construction of selected types. [`instantiate`](Instantiater::instantiate)
/// implements the standard resolution:
///
/// 1. the override, when it returns data;
/// 2. null for null or absent nodes;
/// 3. polymorphic substitution, unless the target is being resolved as a
///    substitute of itself: the first conditional rule matching the node,
///    else the default rule;
/// 4. the designated constructor, else the default constructor.
pub trait Instantiater: Send + Sync {
    fn try_instantiate(
        &self,
        _node: &Node,
        _target: &'static TypeInfo,
        _referring: Option<&'static TypeInfo>,
        _options: NodeOptions,
        _de: &Deserializer
    ) -> Result<Option<InstantiationData>>
    {
        Ok(None)
    }

    /// Instantiate `target` for `node`.
    ///
    /// `referring` is the type `target` is being resolved for as a
    /// substitute, `None` at the outermost call.
    fn instantiate(
        &self,
        node: &Node,
        target: &'static TypeInfo,
        referring: Option<&'static TypeInfo>,
        options: NodeOptions,
        de: &Deserializer
    ) -> Result<InstantiationData>
    {
        if let Some(data) = self.try_instantiate(node, target, referring, options, de)? {
            return Ok(data);
        }
        if node.is_null() {
            return Ok(InstantiationData::null());
        }
        let Some(class) = target.as_class() else {
            return handle_error(options, target, "not a class type");
        };

        let is_own_substitute = referring.is_some_and(|referring| referring.type_id() == target.type_id());
        if !is_own_substitute {
            if node.is_object() {
                if let Some(substitute) = class.substitutes().iter().find(|rule| rule.matches(node)) {
                    trace!("substituting `{}` for `{}` by condition {:?}",
                        substitute.target().type_name(), target.type_name(), substitute.condition());
                    return self.instantiate_substitute(node, target, substitute, options, de);
                }
            }
            if let Some(substitute) = class.default_substitute() {
                trace!("substituting `{}` for `{}` by default",
                    substitute.target().type_name(), target.type_name());
                return self.instantiate_substitute(node, target, substitute, options, de);
            }
        }

        construct(node, target, class, options, de)
    }

    /// Instantiate the substitute and convert it into `target`.
    fn instantiate_substitute(
        &self,
        node: &Node,
        target: &'static TypeInfo,
        substitute: &Substitute,
        options: NodeOptions,
        de: &Deserializer
    ) -> Result<InstantiationData>
    {
        let data = self.instantiate(node, substitute.target(), Some(target), options, de)?;
        let (object, needs_deserialization, mut ignored_keys) = data.into_parts();
        if substitute.ignores_condition_key() {
            if let Some((key, _)) = substitute.condition() {
                ignored_keys.insert(key.to_owned());
            }
        }
        let object = object.map(|object| substitute.wrap(object)).transpose()?;
        Ok(InstantiationData::new(object, needs_deserialization, ignored_keys))
    }
}

/// The standard instantiater.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleInstantiater;

impl Instantiater for SimpleInstantiater {}

fn handle_error(options: NodeOptions, target: &TypeInfo, reason: impl Into<String>) -> Result<InstantiationData> {
    let err = Error::instantiation(target.type_name(), reason);
    if options.should_ignore_unknown_type() {
        debug!("tolerated: {}", err);
        Ok(InstantiationData::null())
    }
    else {
        Err(err)
    }
}

fn construct(
    node: &Node,
    target: &'static TypeInfo,
    class: &ClassInfo,
    options: NodeOptions,
    de: &Deserializer
) -> Result<InstantiationData>
{
    let tuple = class.options().should_use_tuple_format();
    if tuple && !node.is_array() {
        return de.handle_mismatch(options, format!(
            "expected an array for tuple formatted `{}`, found {:?}", target.type_name(), node.kind()))
            .map(|_| InstantiationData::null());
    }
    if !tuple && !node.is_object() {
        return de.handle_mismatch(options, format!(
            "expected an object for `{}`, found {:?}", target.type_name(), node.kind()))
            .map(|_| InstantiationData::null());
    }

    if let Some(constructor) = class.constructor() {
        return construct_with(node, target, constructor, tuple, options, de);
    }

    match class.construct_default() {
        Some(Ok(object)) => Ok(InstantiationData::new(Some(object), node.count() != 0, HashSet::new())),
        Some(Err(err)) => handle_error(options, target, err.to_string()),
        None => handle_error(options, target, "no suitable constructor")
    }
}

fn construct_with(
    node: &Node,
    target: &'static TypeInfo,
    constructor: &Constructor,
    tuple: bool,
    options: NodeOptions,
    de: &Deserializer
) -> Result<InstantiationData>
{
    let mut ignored_keys = HashSet::new();
    let mut args = Vec::with_capacity(constructor.params().len());
    for (index, param) in constructor.params().iter().enumerate() {
        let param_node = if tuple { &node[index] } else { &node[param.key()] };
        let value = de.deserialize_type(param_node, param.param_type(), param.options(), param.restriction())?;
        args.push(value);
        if !tuple {
            ignored_keys.insert(param.key().to_owned());
        }
    }
    match constructor.invoke(args) {
        Ok(object) => {
            let needs_deserialization = !tuple && ignored_keys.len() != node.count();
            Ok(InstantiationData::new(Some(object), needs_deserialization, ignored_keys))
        }
        Err(err) => handle_error(options, target, err.to_string())
    }
}
