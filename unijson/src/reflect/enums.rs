use core::fmt;

use super::{Reflect, Shape, TypeInfo, Typed};
use crate::options::EnumFormat;

/// One declared enum member.
pub struct EnumMember {
    name: &'static str,
    value: i64,
    make: Box<dyn Fn() -> Box<dyn Reflect> + Send + Sync>,
    matches: Box<dyn Fn(&dyn Reflect) -> bool + Send + Sync>,
}

impl EnumMember {
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Integer value used by the integer encoding.
    #[inline]
    pub fn value(&self) -> i64 {
        self.value
    }

    /// Build a fresh instance of this member.
    pub fn make(&self) -> Box<dyn Reflect> {
        (self.make)()
    }

    pub fn matches(&self, value: &dyn Reflect) -> bool {
        (self.matches)(value)
    }
}

impl fmt::Debug for EnumMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnumMember")
            .field("name", &self.name)
            .field("value", &self.value)
            .finish()
    }
}

/// Encoding rules and members of a C-like enum.
///
/// Without integer encoding a member is written as
/// `prefix + format(name) + suffix`. Reading strips the affixes and matches
/// the rest against member names ignoring case.
#[derive(Debug, Default)]
pub struct EnumInfo {
    members: Vec<EnumMember>,
    use_integers: bool,
    format: EnumFormat,
    prefix: Option<String>,
    suffix: Option<String>,
}

impl EnumInfo {
    pub fn members(&self) -> &[EnumMember] {
        &self.members
    }

    #[inline]
    pub fn use_integers(&self) -> bool {
        self.use_integers
    }

    #[inline]
    pub fn format(&self) -> EnumFormat {
        self.format
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn suffix(&self) -> Option<&str> {
        self.suffix.as_deref()
    }

    /// Find the declared member equal to `value`.
    pub fn member_of(&self, value: &dyn Reflect) -> Option<&EnumMember> {
        self.members.iter().find(|member| member.matches(value))
    }

    pub fn by_value(&self, value: i64) -> Option<&EnumMember> {
        self.members.iter().find(|member| member.value == value)
    }

    pub fn by_name_ignore_case(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|member| member.name.eq_ignore_ascii_case(name))
            .or_else(|| {
                let name = name.to_lowercase();
                self.members.iter().find(|member| member.name.to_lowercase() == name)
            })
    }

    /// The string form of `member`: formatted name wrapped in the affixes.
    pub fn format_member(&self, member: &EnumMember) -> String {
        let mut formatted = String::new();
        if let Some(prefix) = &self.prefix {
            formatted.push_str(prefix);
        }
        formatted.push_str(&self.format.apply(member.name));
        if let Some(suffix) = &self.suffix {
            formatted.push_str(suffix);
        }
        formatted
    }

    /// Strip the declared affixes from `text`.
    ///
    /// Returns `None` when a declared prefix or suffix is missing.
    pub fn strip_affixes<'a>(&self, text: &'a str) -> Option<&'a str> {
        let mut text = text;
        if let Some(prefix) = &self.prefix {
            text = text.strip_prefix(prefix.as_str())?;
        }
        if let Some(suffix) = &self.suffix {
            text = text.strip_suffix(suffix.as_str())?;
        }
        Some(text)
    }
}

/// Builder of [`EnumInfo`] descriptors.
///
/// ```
/// use unijson::reflect::{EnumBuilder, TypeInfo, TypeInfoCell, Typed};
/// use unijson::EnumFormat;
///
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// enum Mode { Fast, Slow }
///
/// impl Typed for Mode {
///     fn type_info() -> &'static TypeInfo {
///         static CELL: TypeInfoCell = TypeInfoCell::new();
///         CELL.get_or_init(|| EnumBuilder::new()
///             .member("Fast", Mode::Fast)
///             .member("Slow", Mode::Slow)
///             .format(EnumFormat::Lowercased)
///             .build())
///     }
/// }
///
/// assert_eq!(unijson::to_json_string(&Mode::Slow).unwrap(), r#""slow""#);
/// ```
pub struct EnumBuilder<E> {
    info: EnumInfo,
    _enum: core::marker::PhantomData<fn() -> E>,
}

impl<E> EnumBuilder<E>
    where E: Typed + Clone + PartialEq + Send + Sync
{
    pub fn new() -> Self {
        EnumBuilder { info: EnumInfo::default(), _enum: core::marker::PhantomData }
    }

    /// Declare a member whose integer value is its declaration index.
    pub fn member(self, name: &'static str, value: E) -> Self {
        let index = self.info.members.len() as i64;
        self.member_value(name, value, index)
    }

    /// Declare a member with an explicit integer value.
    pub fn member_value(mut self, name: &'static str, value: E, int: i64) -> Self {
        let made = value.clone();
        let make = Box::new(move || Box::new(made.clone()) as Box<dyn Reflect>);
        let matches = Box::new(move |other: &dyn Reflect| other.downcast_ref::<E>() == Some(&value));
        self.info.members.push(EnumMember { name, value: int, make, matches });
        self
    }

    /// Encode members as their integer values.
    pub fn use_integers(mut self) -> Self {
        self.info.use_integers = true;
        self
    }

    pub fn format(mut self, format: EnumFormat) -> Self {
        self.info.format = format;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.info.prefix = Some(prefix.into());
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.info.suffix = Some(suffix.into());
        self
    }

    pub fn build(self) -> TypeInfo {
        TypeInfo::new::<E>(Shape::Enum(self.info))
    }
}

impl<E> Default for EnumBuilder<E>
    where E: Typed + Clone + PartialEq + Send + Sync
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reflect::TypeInfoCell;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Level { Low, High }

    impl Typed for Level {
        fn type_info() -> &'static TypeInfo {
            static CELL: TypeInfoCell = TypeInfoCell::new();
            CELL.get_or_init(|| EnumBuilder::new()
                .member("Low", Level::Low)
                .member_value("High", Level::High, 10)
                .prefix("Foo")
                .suffix("Bar")
                .format(EnumFormat::Uppercased)
                .build())
        }
    }

    #[test]
    fn test_enum_info() {
        let info = Level::type_info().as_enum().unwrap();
        assert_eq!(info.members().len(), 2);
        assert_eq!(info.by_value(10).unwrap().name(), "High");
        assert_eq!(info.by_value(0).unwrap().name(), "Low");
        assert!(info.by_value(1).is_none());
        let member = info.member_of(&Level::High).unwrap();
        assert_eq!(info.format_member(member), "FooHIGHBar");
        assert_eq!(info.by_name_ignore_case("hIgH").unwrap().value(), 10);
        assert_eq!(info.strip_affixes("FooLowBar"), Some("Low"));
        assert_eq!(info.strip_affixes("LowBar"), None);
        assert_eq!(info.strip_affixes("FooLow"), None);
        let made = info.by_name_ignore_case("low").unwrap().make();
        assert_eq!(made.downcast_ref::<Level>(), Some(&Level::Low));
    }
}
