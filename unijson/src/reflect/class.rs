use core::fmt;
use core::marker::PhantomData;
use core::ops::Deref;

use super::{take_value, Reflect, Shape, TypeInfo, TypeRef, Typed};
use crate::de::Deserializer;
use crate::error::{Error, Result};
use crate::hooks::{
    DeserializationListener, JsonDeserialize, JsonSerialize, SerializationListener
};
use crate::node::Node;
use crate::options::{NodeOptions, ObjectOptions, ObjectTypes};
use crate::ser::Serializer;

/// Per member options and key override.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeAttribute {
    pub options: NodeOptions,
    pub key: Option<String>,
}

/// Marks the member capturing unknown keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtrasAttribute {
    pub options: NodeOptions,
}

/// Value domains accepted by a dynamically typed member or parameter.
#[derive(Debug, Clone, Default)]
pub struct Restriction {
    types: ObjectTypes,
    custom: Vec<TypeRef>,
}

impl Restriction {
    pub fn new(types: ObjectTypes) -> Self {
        Restriction { types, custom: Vec::new() }
    }

    /// Allow the listed custom types, tried in order before falling back to
    /// a map.
    ///
    /// Fails when `types` does not include [`ObjectTypes::CUSTOM`].
    pub fn with_custom<I>(types: ObjectTypes, custom: I) -> Result<Self>
        where I: IntoIterator<Item = TypeRef>
    {
        let custom: Vec<TypeRef> = custom.into_iter().collect();
        if !custom.is_empty() && !types.supports_custom() {
            return Err(Error::InvalidArgument(
                "restrictions do not allow custom types".into()));
        }
        Ok(Restriction { types, custom })
    }

    #[inline]
    pub fn types(&self) -> ObjectTypes {
        self.types
    }

    /// The declared custom types as written.
    pub fn custom(&self) -> &[TypeRef] {
        &self.custom
    }

    /// The declared custom types, keeping only class types and dropping
    /// repeats.
    pub fn custom_types(&self) -> Vec<&'static TypeInfo> {
        let mut types: Vec<&'static TypeInfo> = Vec::with_capacity(self.custom.len());
        for info in self.custom.iter().map(|ty| ty.get()) {
            if info.as_class().is_some() && !types.iter().any(|seen| seen.type_id() == info.type_id()) {
                types.push(info);
            }
        }
        types
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Property,
}

/// A member value as returned by an accessor.
pub enum MemberValue<'a> {
    Ref(&'a dyn Reflect),
    Owned(Box<dyn Reflect>),
}

impl Deref for MemberValue<'_> {
    type Target = dyn Reflect;

    fn deref(&self) -> &dyn Reflect {
        match self {
            MemberValue::Ref(value) => *value,
            MemberValue::Owned(value) => value.as_ref(),
        }
    }
}

/// Uniform accessor over fields, properties and static properties.
pub trait Access: Send + Sync {
    fn get<'a>(&self, obj: &'a dyn Reflect) -> Result<MemberValue<'a>>;
    /// Direct mutable access; `None` for members without storage.
    fn get_mut<'a>(&self, obj: &'a mut dyn Reflect) -> Result<Option<&'a mut dyn Reflect>>;
    /// Write a value. Null writes [`Typed::null_value`] or nothing.
    fn set(&self, obj: &mut dyn Reflect, value: Option<Box<dyn Reflect>>) -> Result<()>;
    fn can_read(&self) -> bool;
    fn can_write(&self) -> bool;
}

fn object_ref<C: Typed>(obj: &dyn Reflect) -> Result<&C> {
    obj.downcast_ref::<C>().ok_or_else(|| wrong_object::<C>(obj))
}

fn object_mut<C: Typed>(obj: &mut dyn Reflect) -> Result<&mut C> {
    if !obj.is::<C>() {
        return Err(wrong_object::<C>(obj));
    }
    obj.downcast_mut::<C>().ok_or_else(|| Error::InvalidArgument(
        format!("expected an instance of `{}`", C::type_info().type_name())))
}

fn wrong_object<C: Typed>(obj: &dyn Reflect) -> Error {
    Error::InvalidArgument(format!(
        "expected an instance of `{}`, found `{}`",
        C::type_info().type_name(),
        obj.reflect_type_info().type_name()))
}

fn resolve_value<F: Typed>(value: Option<Box<dyn Reflect>>) -> Result<Option<F>> {
    match value {
        Some(value) => take_value(Some(value)).map(Some),
        None => Ok(F::null_value())
    }
}

struct FieldAccess<C, F> {
    get: fn(&C) -> &F,
    get_mut: fn(&mut C) -> &mut F,
}

impl<C: Typed, F: Typed> Access for FieldAccess<C, F> {
    fn get<'a>(&self, obj: &'a dyn Reflect) -> Result<MemberValue<'a>> {
        Ok(MemberValue::Ref((self.get)(object_ref::<C>(obj)?)))
    }

    fn get_mut<'a>(&self, obj: &'a mut dyn Reflect) -> Result<Option<&'a mut dyn Reflect>> {
        Ok(Some((self.get_mut)(object_mut::<C>(obj)?)))
    }

    fn set(&self, obj: &mut dyn Reflect, value: Option<Box<dyn Reflect>>) -> Result<()> {
        let obj = object_mut::<C>(obj)?;
        if let Some(value) = resolve_value::<F>(value)? {
            *(self.get_mut)(obj) = value;
        }
        Ok(())
    }

    fn can_read(&self) -> bool {
        true
    }

    fn can_write(&self) -> bool {
        true
    }
}

struct PropertyAccess<C, F> {
    get: Option<fn(&C) -> F>,
    set: Option<fn(&mut C, F)>,
}

impl<C: Typed, F: Typed> Access for PropertyAccess<C, F> {
    fn get<'a>(&self, obj: &'a dyn Reflect) -> Result<MemberValue<'a>> {
        let get = self.get.ok_or_else(|| Error::InvalidArgument("property is write-only".into()))?;
        Ok(MemberValue::Owned(Box::new(get(object_ref::<C>(obj)?))))
    }

    fn get_mut<'a>(&self, _obj: &'a mut dyn Reflect) -> Result<Option<&'a mut dyn Reflect>> {
        Ok(None)
    }

    fn set(&self, obj: &mut dyn Reflect, value: Option<Box<dyn Reflect>>) -> Result<()> {
        let set = self.set.ok_or_else(|| Error::InvalidArgument("property is read-only".into()))?;
        let obj = object_mut::<C>(obj)?;
        if let Some(value) = resolve_value::<F>(value)? {
            set(obj, value);
        }
        Ok(())
    }

    fn can_read(&self) -> bool {
        self.get.is_some()
    }

    fn can_write(&self) -> bool {
        self.set.is_some()
    }
}

struct StaticAccess<F> {
    get: Option<fn() -> F>,
    set: Option<fn(F)>,
}

impl<F: Typed> Access for StaticAccess<F> {
    fn get<'a>(&self, _obj: &'a dyn Reflect) -> Result<MemberValue<'a>> {
        let get = self.get.ok_or_else(|| Error::InvalidArgument("property is write-only".into()))?;
        Ok(MemberValue::Owned(Box::new(get())))
    }

    fn get_mut<'a>(&self, _obj: &'a mut dyn Reflect) -> Result<Option<&'a mut dyn Reflect>> {
        Ok(None)
    }

    fn set(&self, _obj: &mut dyn Reflect, value: Option<Box<dyn Reflect>>) -> Result<()> {
        let set = self.set.ok_or_else(|| Error::InvalidArgument("property is read-only".into()))?;
        if let Some(value) = resolve_value::<F>(value)? {
            set(value);
        }
        Ok(())
    }

    fn can_read(&self) -> bool {
        self.get.is_some()
    }

    fn can_write(&self) -> bool {
        self.set.is_some()
    }
}

/// A field or property of a class.
///
/// Public members take part in mapping by default. Private members only do
/// when they carry a node attribute ([`json_node`](Member::json_node),
/// [`with_key`](Member::with_key) or [`with_options`](Member::with_options)).
pub struct Member {
    name: &'static str,
    kind: MemberKind,
    is_static: bool,
    public: bool,
    node: Option<NodeAttribute>,
    restriction: Option<Restriction>,
    extras: Option<ExtrasAttribute>,
    ty: TypeRef,
    access: Box<dyn Access>,
}

impl Member {
    fn with_access<F: Typed>(
        name: &'static str,
        kind: MemberKind,
        is_static: bool,
        access: Box<dyn Access>
    ) -> Self
    {
        Member {
            name,
            kind,
            is_static,
            public: true,
            node: None,
            restriction: None,
            extras: None,
            ty: TypeRef::of::<F>(),
            access
        }
    }

    /// A stored field.
    pub fn field<C: Typed, F: Typed>(
        name: &'static str,
        get: fn(&C) -> &F,
        get_mut: fn(&mut C) -> &mut F
    ) -> Self
    {
        Self::with_access::<F>(name, MemberKind::Field, false,
            Box::new(FieldAccess { get, get_mut }))
    }

    /// A computed property with a getter and a setter.
    pub fn property<C: Typed, F: Typed>(
        name: &'static str,
        get: fn(&C) -> F,
        set: fn(&mut C, F)
    ) -> Self
    {
        Self::with_access::<F>(name, MemberKind::Property, false,
            Box::new(PropertyAccess { get: Some(get), set: Some(set) }))
    }

    /// A property that is only ever serialized.
    pub fn read_only<C: Typed, F: Typed>(name: &'static str, get: fn(&C) -> F) -> Self {
        Self::with_access::<F>(name, MemberKind::Property, false,
            Box::new(PropertyAccess::<C, F> { get: Some(get), set: None }))
    }

    /// A property that is only ever deserialized.
    pub fn write_only<C: Typed, F: Typed>(name: &'static str, set: fn(&mut C, F)) -> Self {
        Self::with_access::<F>(name, MemberKind::Property, false,
            Box::new(PropertyAccess::<C, F> { get: None, set: Some(set) }))
    }

    /// A type level property, mapped only by classes with
    /// [`ObjectOptions::INCLUDE_STATIC`].
    pub fn static_property<F: Typed>(name: &'static str, get: fn() -> F, set: fn(F)) -> Self {
        Self::with_access::<F>(name, MemberKind::Property, true,
            Box::new(StaticAccess { get: Some(get), set: Some(set) }))
    }

    /// Attach a node attribute with default options.
    pub fn json_node(mut self) -> Self {
        self.node.get_or_insert_with(NodeAttribute::default);
        self
    }

    /// Map the member under `key` instead of its name.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.node.get_or_insert_with(NodeAttribute::default).key = Some(key.into());
        self
    }

    pub fn with_options(mut self, options: NodeOptions) -> Self {
        self.node.get_or_insert_with(NodeAttribute::default).options = options;
        self
    }

    pub fn restrict(mut self, restriction: Restriction) -> Self {
        self.restriction = Some(restriction);
        self
    }

    /// Capture unknown keys into this member. Only honored on members of
    /// type [`Map`](crate::Map).
    pub fn extras(mut self, options: NodeOptions) -> Self {
        self.extras = Some(ExtrasAttribute { options });
        self
    }

    pub fn private(mut self) -> Self {
        self.public = false;
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn kind(&self) -> MemberKind {
        self.kind
    }

    #[inline]
    pub fn is_field(&self) -> bool {
        self.kind == MemberKind::Field
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    #[inline]
    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn node_attribute(&self) -> Option<&NodeAttribute> {
        self.node.as_ref()
    }

    pub fn restriction(&self) -> Option<&Restriction> {
        self.restriction.as_ref()
    }

    pub fn extras_attribute(&self) -> Option<&ExtrasAttribute> {
        self.extras.as_ref()
    }

    /// JSON key: the override if any, otherwise the member name.
    pub fn key(&self) -> &str {
        self.node.as_ref()
            .and_then(|node| node.key.as_deref())
            .unwrap_or(self.name)
    }

    /// Node options, default when unattributed.
    pub fn options(&self) -> NodeOptions {
        self.node.as_ref().map(|node| node.options).unwrap_or_default()
    }

    pub fn member_type(&self) -> &'static TypeInfo {
        self.ty.get()
    }

    pub fn can_read(&self) -> bool {
        self.access.can_read()
    }

    pub fn can_write(&self) -> bool {
        self.access.can_write()
    }

    pub fn get<'a>(&self, obj: &'a dyn Reflect) -> Result<MemberValue<'a>> {
        self.access.get(obj)
    }

    pub fn get_mut<'a>(&self, obj: &'a mut dyn Reflect) -> Result<Option<&'a mut dyn Reflect>> {
        self.access.get_mut(obj)
    }

    pub fn set(&self, obj: &mut dyn Reflect, value: Option<Box<dyn Reflect>>) -> Result<()> {
        self.access.set(obj, value)
    }
}

impl fmt::Debug for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Member")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("is_static", &self.is_static)
            .field("public", &self.public)
            .field("node", &self.node)
            .field("extras", &self.extras)
            .field("ty", &self.ty)
            .finish()
    }
}

/// A designated constructor parameter.
#[derive(Debug, Clone)]
pub struct Param {
    name: &'static str,
    key: Option<String>,
    options: NodeOptions,
    restriction: Option<Restriction>,
    ty: TypeRef,
}

impl Param {
    pub fn new<T: Typed>(name: &'static str) -> Self {
        Param {
            name,
            key: None,
            options: NodeOptions::default(),
            restriction: None,
            ty: TypeRef::of::<T>()
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_options(mut self, options: NodeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn restrict(mut self, restriction: Restriction) -> Self {
        self.restriction = Some(restriction);
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> &str {
        self.key.as_deref().unwrap_or(self.name)
    }

    #[inline]
    pub fn options(&self) -> NodeOptions {
        self.options
    }

    pub fn restriction(&self) -> Option<&Restriction> {
        self.restriction.as_ref()
    }

    pub fn param_type(&self) -> &'static TypeInfo {
        self.ty.get()
    }
}

/// Deserialized constructor arguments, in parameter order.
#[derive(Debug)]
pub struct Args {
    values: Vec<Option<Box<dyn Reflect>>>,
}

impl Args {
    pub fn new(values: Vec<Option<Box<dyn Reflect>>>) -> Self {
        Args { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Take argument `index`. Null becomes [`Typed::null_value`].
    pub fn take<T: Typed>(&mut self, index: usize) -> Result<T> {
        take_value(self.slot(index)?)
    }

    /// Take argument `index`, keeping null as `None`.
    pub fn take_opt<T: Typed>(&mut self, index: usize) -> Result<Option<T>> {
        super::take_option(self.slot(index)?)
    }

    fn slot(&mut self, index: usize) -> Result<Option<Box<dyn Reflect>>> {
        let count = self.values.len();
        self.values.get_mut(index)
            .map(Option::take)
            .ok_or_else(|| Error::InvalidArgument(
                format!("argument index {} out of range for {} parameters", index, count)))
    }
}

type BuildFn = dyn Fn(&mut Args) -> Result<Box<dyn Reflect>> + Send + Sync;

/// The designated deserialization constructor of a class.
pub struct Constructor {
    params: Vec<Param>,
    build: Box<BuildFn>,
}

impl Constructor {
    pub fn new<C, F>(params: Vec<Param>, build: F) -> Self
        where C: Typed,
              F: Fn(&mut Args) -> Result<C> + Send + Sync + 'static
    {
        let build = move |args: &mut Args| build(args).map(|obj| Box::new(obj) as Box<dyn Reflect>);
        Constructor { params, build: Box::new(build) }
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn invoke(&self, args: Vec<Option<Box<dyn Reflect>>>) -> Result<Box<dyn Reflect>> {
        (self.build)(&mut Args::new(args))
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constructor").field("params", &self.params).finish()
    }
}

type WrapFn = dyn Fn(Box<dyn Reflect>) -> Result<Box<dyn Reflect>> + Send + Sync;

/// A polymorphic substitution rule.
pub struct Substitute {
    condition: Option<(String, String)>,
    ignore_condition_key: bool,
    target: TypeRef,
    wrap: Box<WrapFn>,
}

impl Substitute {
    fn new<C: Typed, S: Typed>(
        condition: Option<(String, String)>,
        ignore_condition_key: bool,
        wrap: fn(S) -> C
    ) -> Self
    {
        let wrap = move |value: Box<dyn Reflect>| {
            let value = take_value::<S>(Some(value))?;
            Ok(Box::new(wrap(value)) as Box<dyn Reflect>)
        };
        Substitute {
            condition,
            ignore_condition_key,
            target: TypeRef::of::<S>(),
            wrap: Box::new(wrap)
        }
    }

    /// The `(key, value)` pair selecting this rule, `None` for the default.
    pub fn condition(&self) -> Option<(&str, &str)> {
        self.condition.as_ref().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    #[inline]
    pub fn ignores_condition_key(&self) -> bool {
        self.ignore_condition_key
    }

    pub fn target(&self) -> &'static TypeInfo {
        self.target.get()
    }

    /// Convert an instance of the substitute into the declaring type.
    pub fn wrap(&self, value: Box<dyn Reflect>) -> Result<Box<dyn Reflect>> {
        (self.wrap)(value)
    }

    /// Returns `true` when the node's value at the condition key matches.
    pub fn matches(&self, node: &Node) -> bool {
        match &self.condition {
            Some((key, value)) => node[key.as_str()].value() == value.as_str(),
            None => true
        }
    }
}

impl fmt::Debug for Substitute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Substitute")
            .field("condition", &self.condition)
            .field("ignore_condition_key", &self.ignore_condition_key)
            .field("target", &self.target)
            .finish()
    }
}

/// Progress of a structural pass, reported to lifecycle listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WillBegin,
    Succeeded,
    Failed,
}

type SerializeFn = fn(&dyn Reflect, &Serializer) -> Result<Option<String>>;
type DeserializeFn = fn(&mut dyn Reflect, &Node, &Deserializer) -> Result<()>;
type SerializationNotifyFn = fn(&dyn Reflect, &Serializer, Phase);
type DeserializationNotifyFn = fn(&mut dyn Reflect, &Deserializer, Phase);

#[derive(Default)]
struct ClassHooks {
    serialize: Option<SerializeFn>,
    deserialize: Option<DeserializeFn>,
    serialization: Option<SerializationNotifyFn>,
    deserialization: Option<DeserializationNotifyFn>,
}

fn serialize_via<C: Typed + JsonSerialize>(obj: &dyn Reflect, ser: &Serializer) -> Result<Option<String>> {
    object_ref::<C>(obj)?.serialize_json(ser)
}

fn deserialize_via<C: Typed + JsonDeserialize>(
    obj: &mut dyn Reflect,
    node: &Node,
    de: &Deserializer
) -> Result<()>
{
    object_mut::<C>(obj)?.deserialize_json(node, de)
}

fn notify_serialization<C: Typed + SerializationListener>(obj: &dyn Reflect, ser: &Serializer, phase: Phase) {
    if let Some(obj) = obj.downcast_ref::<C>() {
        match phase {
            Phase::WillBegin => obj.on_serialization_will_begin(ser),
            Phase::Succeeded => obj.on_serialization_succeeded(ser),
            Phase::Failed => obj.on_serialization_failed(ser),
        }
    }
}

fn notify_deserialization<C: Typed + DeserializationListener>(
    obj: &mut dyn Reflect,
    de: &Deserializer,
    phase: Phase
)
{
    if let Some(obj) = obj.downcast_mut::<C>() {
        match phase {
            Phase::WillBegin => obj.on_deserialization_will_begin(de),
            Phase::Succeeded => obj.on_deserialization_succeeded(de),
            Phase::Failed => obj.on_deserialization_failed(de),
        }
    }
}

type DefaultConstructorFn = dyn Fn() -> Result<Box<dyn Reflect>> + Send + Sync;

/// Descriptor of a class or struct mapped member by member.
pub struct ClassInfo {
    options: ObjectOptions,
    value_type: bool,
    members: Vec<Member>,
    constructor: Option<Constructor>,
    default_constructor: Option<Box<DefaultConstructorFn>>,
    substitutes: Vec<Substitute>,
    default_substitute: Option<Substitute>,
    hooks: ClassHooks,
}

impl ClassInfo {
    #[inline]
    pub fn options(&self) -> ObjectOptions {
        self.options
    }

    /// Returns `true` for classes declared with struct semantics, which are
    /// never merged in place.
    #[inline]
    pub fn is_value_type(&self) -> bool {
        self.value_type
    }

    /// Members in declaration order, fields and properties interleaved as
    /// declared.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.name == name)
    }

    pub fn constructor(&self) -> Option<&Constructor> {
        self.constructor.as_ref()
    }

    pub fn has_default_constructor(&self) -> bool {
        self.default_constructor.is_some()
    }

    /// Build an instance with the default constructor, if there is one.
    pub fn construct_default(&self) -> Option<Result<Box<dyn Reflect>>> {
        self.default_constructor.as_ref().map(|construct| construct())
    }

    /// Conditional substitution rules in declaration order.
    pub fn substitutes(&self) -> &[Substitute] {
        &self.substitutes
    }

    pub fn default_substitute(&self) -> Option<&Substitute> {
        self.default_substitute.as_ref()
    }

    pub fn has_custom_serialize(&self) -> bool {
        self.hooks.serialize.is_some()
    }

    pub fn has_custom_deserialize(&self) -> bool {
        self.hooks.deserialize.is_some()
    }

    /// Run the [`JsonSerialize`] opt-out, if the class declared one.
    pub fn custom_serialize(&self, obj: &dyn Reflect, ser: &Serializer) -> Option<Result<Option<String>>> {
        self.hooks.serialize.map(|serialize| serialize(obj, ser))
    }

    /// Run the [`JsonDeserialize`] opt-out, if the class declared one.
    pub fn custom_deserialize(
        &self,
        obj: &mut dyn Reflect,
        node: &Node,
        de: &Deserializer
    ) -> Option<Result<()>>
    {
        self.hooks.deserialize.map(|deserialize| deserialize(obj, node, de))
    }

    pub fn notify_serialization(&self, obj: &dyn Reflect, ser: &Serializer, phase: Phase) {
        if let Some(notify) = self.hooks.serialization {
            notify(obj, ser, phase);
        }
    }

    pub fn notify_deserialization(&self, obj: &mut dyn Reflect, de: &Deserializer, phase: Phase) {
        if let Some(notify) = self.hooks.deserialization {
            notify(obj, de, phase);
        }
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("options", &self.options)
            .field("value_type", &self.value_type)
            .field("members", &self.members)
            .field("constructor", &self.constructor)
            .field("substitutes", &self.substitutes)
            .field("default_substitute", &self.default_substitute)
            .finish_non_exhaustive()
    }
}

/// Builder of class descriptors.
///
/// ```
/// use unijson::reflect::{ClassBuilder, Member, TypeInfo, TypeInfoCell, Typed};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Point { x: i32, y: i32 }
///
/// impl Typed for Point {
///     fn type_info() -> &'static TypeInfo {
///         static CELL: TypeInfoCell = TypeInfoCell::new();
///         CELL.get_or_init(|| ClassBuilder::<Self>::new()
///             .default_constructor()
///             .member(Member::field("x", |p: &Self| &p.x, |p: &mut Self| &mut p.x))
///             .member(Member::field("y", |p: &Self| &p.y, |p: &mut Self| &mut p.y))
///             .build())
///     }
/// }
///
/// let point: Point = unijson::from_json_str(r#"{"x":1,"y":2}"#).unwrap().unwrap();
/// assert_eq!(point, Point { x: 1, y: 2 });
/// assert_eq!(unijson::to_json_string(&point).unwrap(), r#"{"x":1,"y":2}"#);
/// ```
pub struct ClassBuilder<C> {
    info: ClassInfo,
    _class: PhantomData<fn() -> C>,
}

impl<C: Typed> ClassBuilder<C> {
    pub fn new() -> Self {
        ClassBuilder {
            info: ClassInfo {
                options: ObjectOptions::default(),
                value_type: false,
                members: Vec::new(),
                constructor: None,
                default_constructor: None,
                substitutes: Vec::new(),
                default_substitute: None,
                hooks: ClassHooks::default(),
            },
            _class: PhantomData
        }
    }

    pub fn options(mut self, options: ObjectOptions) -> Self {
        self.info.options = options;
        self
    }

    /// Declare struct semantics: the class is never merged in place.
    pub fn value_type(mut self) -> Self {
        self.info.value_type = true;
        self
    }

    /// Use `construct` as the parameterless constructor.
    pub fn construct_with(self, construct: fn() -> C) -> Self {
        self.try_construct_with(move || Ok(construct()))
    }

    /// Use a fallible parameterless constructor.
    pub fn try_construct_with<F>(mut self, construct: F) -> Self
        where F: Fn() -> Result<C> + Send + Sync + 'static
    {
        let construct = move || construct().map(|obj| Box::new(obj) as Box<dyn Reflect>);
        self.info.default_constructor = Some(Box::new(construct));
        self
    }

    pub fn default_constructor(self) -> Self
        where C: Default
    {
        self.construct_with(C::default)
    }

    /// Designate the deserialization constructor.
    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.info.constructor = Some(constructor);
        self
    }

    pub fn member(mut self, member: Member) -> Self {
        self.info.members.push(member);
        self
    }

    /// Deserialize as `S` when the node's value at `key` stringifies to
    /// `value`.
    pub fn substitute_when<S: Typed>(mut self, key: &str, value: impl fmt::Display, wrap: fn(S) -> C) -> Self {
        let condition = Some((key.to_owned(), value.to_string()));
        self.info.substitutes.push(Substitute::new(condition, false, wrap));
        self
    }

    /// Like [`substitute_when`](Self::substitute_when) but the condition key
    /// is consumed and never reaches the substitute's members.
    pub fn substitute_when_ignoring_key<S: Typed>(
        mut self,
        key: &str,
        value: impl fmt::Display,
        wrap: fn(S) -> C
    ) -> Self
    {
        let condition = Some((key.to_owned(), value.to_string()));
        self.info.substitutes.push(Substitute::new(condition, true, wrap));
        self
    }

    /// Deserialize as `S` when no conditional rule matches.
    pub fn substitute_default<S: Typed>(mut self, wrap: fn(S) -> C) -> Self {
        self.info.default_substitute = Some(Substitute::new(None, false, wrap));
        self
    }

    /// Serialize with the class's [`JsonSerialize`] implementation.
    pub fn json_serialize(mut self) -> Self
        where C: JsonSerialize
    {
        self.info.hooks.serialize = Some(serialize_via::<C>);
        self
    }

    /// Deserialize with the class's [`JsonDeserialize`] implementation.
    pub fn json_deserialize(mut self) -> Self
        where C: JsonDeserialize
    {
        self.info.hooks.deserialize = Some(deserialize_via::<C>);
        self
    }

    pub fn serialization_listener(mut self) -> Self
        where C: SerializationListener
    {
        self.info.hooks.serialization = Some(notify_serialization::<C>);
        self
    }

    pub fn deserialization_listener(mut self) -> Self
        where C: DeserializationListener
    {
        self.info.hooks.deserialization = Some(notify_deserialization::<C>);
        self
    }

    pub fn build(self) -> TypeInfo {
        TypeInfo::new::<C>(Shape::Custom(self.info))
    }
}

impl<C: Typed> Default for ClassBuilder<C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::TypeInfoCell;

    #[derive(Debug, Default, Clone, PartialEq)]
    struct Sample {
        id: u32,
        label: String,
    }

    impl Sample {
        fn double(&self) -> u32 {
            self.id * 2
        }
    }

    impl Typed for Sample {
        fn type_info() -> &'static TypeInfo {
            static CELL: TypeInfoCell = TypeInfoCell::new();
            CELL.get_or_init(|| ClassBuilder::<Self>::new()
                .default_constructor()
                .member(Member::field("id", |s: &Self| &s.id, |s: &mut Self| &mut s.id)
                    .with_key("ID"))
                .member(Member::field("label", |s: &Self| &s.label, |s: &mut Self| &mut s.label)
                    .private())
                .member(Member::read_only("double", Sample::double))
                .constructor(Constructor::new(
                    vec![Param::new::<u32>("id"), Param::new::<String>("label").with_key("name")],
                    |args| Ok(Sample { id: args.take(0)?, label: args.take(1)? })))
                .build())
        }
    }

    #[test]
    fn test_member_access() {
        let info = Sample::type_info().as_class().unwrap();
        let mut sample = Sample { id: 4, label: "a".into() };
        let id = info.member("id").unwrap();
        assert_eq!(id.key(), "ID");
        assert!(id.node_attribute().is_some());
        assert_eq!(id.get(&sample).unwrap().downcast_ref::<u32>(), Some(&4));
        id.set(&mut sample, Some(Box::new(9u32))).unwrap();
        assert_eq!(sample.id, 9);
        // null writes the type's null value
        id.set(&mut sample, None).unwrap();
        assert_eq!(sample.id, 0);
        let label = info.member("label").unwrap();
        assert!(!label.is_public());
        assert_eq!(label.key(), "label");
        // strings have no null value, so null leaves them untouched
        label.set(&mut sample, None).unwrap();
        assert_eq!(sample.label, "a");
        assert!(label.set(&mut sample, Some(Box::new(1u8))).unwrap_err().is_type_mismatch());
        let double = info.member("double").unwrap();
        assert!(double.can_read() && !double.can_write());
        sample.id = 21;
        assert_eq!(double.get(&sample).unwrap().downcast_ref::<u32>(), Some(&42));
        assert!(double.set(&mut sample, None).is_err());
        assert!(double.get_mut(&mut sample).unwrap().is_none());
        assert!(id.get(&7u8).is_err());
    }

    #[test]
    fn test_constructor() {
        let info = Sample::type_info().as_class().unwrap();
        let constructor = info.constructor().unwrap();
        assert_eq!(constructor.params()[1].key(), "name");
        assert_eq!(constructor.params()[0].key(), "id");
        let built = constructor.invoke(vec![
            Some(Box::new(3u32) as Box<dyn Reflect>),
            Some(Box::new(String::from("x")) as Box<dyn Reflect>),
        ]).unwrap();
        assert_eq!(built.downcast_ref::<Sample>(), Some(&Sample { id: 3, label: "x".into() }));
        let err = constructor.invoke(vec![Some(Box::new(3u32) as Box<dyn Reflect>), None]).unwrap_err();
        assert!(err.is_type_mismatch());
        let built = info.construct_default().unwrap().unwrap();
        assert_eq!(built.downcast_ref::<Sample>(), Some(&Sample::default()));
    }

    #[test]
    fn test_restriction() {
        assert!(Restriction::with_custom(ObjectTypes::JSON, [TypeRef::of::<Sample>()]).is_err());
        let restriction = Restriction::with_custom(ObjectTypes::ALL, [
            TypeRef::of::<Sample>(),
            TypeRef::of::<u8>(),
            TypeRef::of::<Sample>(),
        ]).unwrap();
        assert_eq!(restriction.custom().len(), 3);
        let types = restriction.custom_types();
        assert_eq!(types.len(), 1);
        assert!(types[0].is::<Sample>());
        assert_eq!(Restriction::default().types(), ObjectTypes::JSON);
    }
}
