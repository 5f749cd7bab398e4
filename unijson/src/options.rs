//! Option flags attached to members, classes and dynamically typed slots.
//!
//! All predicates test the defining bit, so independent flags can be
//! combined freely.
use bitflags::bitflags;

bitflags! {
    /// Per member, parameter or call options.
    ///
    /// The empty set is the default: serialize and deserialize the member,
    /// omit it when null, fail on type mismatches, merge into existing nested
    /// instances and assign explicit nulls.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeOptions: u8 {
        /// Never write the member.
        const DONT_SERIALIZE                     = 1 << 0;
        /// Never read the member.
        const DONT_DESERIALIZE                   = 1 << 1;
        /// Emit the null token instead of omitting a null member.
        const SERIALIZE_NULL                     = 1 << 2;
        /// Degrade shape mismatches to null.
        const IGNORE_TYPE_MISMATCH               = 1 << 3;
        /// Degrade unknown-type and instantiation failures to null.
        const IGNORE_INSTANTIATION_ERROR         = 1 << 4;
        const IGNORE_DESERIALIZATION_TYPE_ERRORS =
            Self::IGNORE_TYPE_MISMATCH.bits() | Self::IGNORE_INSTANTIATION_ERROR.bits();
        /// Keep the current value when the source holds null.
        const DONT_ASSIGN_NULL                   = 1 << 5;
        /// Always build a fresh nested instance instead of merging.
        const REPLACE_DESERIALIZED               = 1 << 6;
    }
}

impl NodeOptions {
    #[inline]
    pub fn is_serialized(self) -> bool {
        !self.contains(Self::DONT_SERIALIZE)
    }

    #[inline]
    pub fn is_deserialized(self) -> bool {
        !self.contains(Self::DONT_DESERIALIZE)
    }

    #[inline]
    pub fn should_serialize_null(self) -> bool {
        self.contains(Self::SERIALIZE_NULL)
    }

    #[inline]
    pub fn should_ignore_type_mismatch(self) -> bool {
        self.contains(Self::IGNORE_TYPE_MISMATCH)
    }

    /// Unknown types, unknown collection shapes and failed constructions
    /// share this single tolerance flag.
    #[inline]
    pub fn should_ignore_unknown_type(self) -> bool {
        self.contains(Self::IGNORE_INSTANTIATION_ERROR)
    }

    #[inline]
    pub fn should_assign_null(self) -> bool {
        !self.contains(Self::DONT_ASSIGN_NULL)
    }

    #[inline]
    pub fn should_replace_with_deserialized(self) -> bool {
        self.contains(Self::REPLACE_DESERIALIZED)
    }
}

bitflags! {
    /// Per class options.
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ObjectOptions: u8 {
        /// Only fields take part in (de)serialization.
        const IGNORE_PROPERTIES  = 1 << 0;
        /// Static properties take part in (de)serialization.
        const INCLUDE_STATIC     = 1 << 1;
        /// Unknown keys are skipped instead of failing.
        const IGNORE_UNKNOWN_KEY = 1 << 2;
        /// Encode as a positional array. Implies `IGNORE_PROPERTIES`.
        const TUPLE_FORMAT       = 1 << 3 | Self::IGNORE_PROPERTIES.bits();
    }
}

impl ObjectOptions {
    #[inline]
    pub fn should_ignore_properties(self) -> bool {
        self.contains(Self::IGNORE_PROPERTIES)
    }

    #[inline]
    pub fn should_include_static(self) -> bool {
        self.contains(Self::INCLUDE_STATIC)
    }

    #[inline]
    pub fn should_throw_at_unknown_key(self) -> bool {
        !self.contains(Self::IGNORE_UNKNOWN_KEY)
    }

    #[inline]
    pub fn should_use_tuple_format(self) -> bool {
        self.contains(Self::TUPLE_FORMAT)
    }
}

bitflags! {
    /// Value domains accepted by a dynamically typed slot.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ObjectTypes: u8 {
        const STRING     = 1 << 0;
        const BOOL       = 1 << 1;
        const NUMBER     = 1 << 2;
        const ARRAY      = 1 << 3;
        const DICTIONARY = 1 << 4;
        /// Registered custom types, tried before falling back to a map.
        const CUSTOM     = 1 << 5;
        const JSON = Self::STRING.bits()
            | Self::BOOL.bits()
            | Self::NUMBER.bits()
            | Self::ARRAY.bits()
            | Self::DICTIONARY.bits();
        const ALL = Self::JSON.bits() | Self::CUSTOM.bits();
    }
}

impl Default for ObjectTypes {
    fn default() -> Self {
        Self::JSON
    }
}

impl ObjectTypes {
    #[inline]
    pub fn supports_string(self) -> bool {
        self.contains(Self::STRING)
    }

    #[inline]
    pub fn supports_bool(self) -> bool {
        self.contains(Self::BOOL)
    }

    #[inline]
    pub fn supports_number(self) -> bool {
        self.contains(Self::NUMBER)
    }

    #[inline]
    pub fn supports_array(self) -> bool {
        self.contains(Self::ARRAY)
    }

    #[inline]
    pub fn supports_dictionary(self) -> bool {
        self.contains(Self::DICTIONARY)
    }

    #[inline]
    pub fn supports_custom(self) -> bool {
        self.contains(Self::CUSTOM)
    }
}

/// Case transformation applied to enum member names when written as strings.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumFormat {
    /// Keep the declared name.
    #[default]
    None,
    Lowercased,
    Uppercased,
    /// Upper-case the first character and lower-case the rest.
    Capitalized,
}

impl EnumFormat {
    pub fn apply(self, name: &str) -> String {
        match self {
            EnumFormat::None => name.to_owned(),
            EnumFormat::Lowercased => name.to_lowercase(),
            EnumFormat::Uppercased => name.to_uppercase(),
            EnumFormat::Capitalized => {
                let mut chars = name.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase()
                        .chain(chars.as_str().to_lowercase().chars())
                        .collect(),
                    None => String::new()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composite_constants() {
        assert_eq!(NodeOptions::IGNORE_DESERIALIZATION_TYPE_ERRORS.bits(), 8 | 16);
        assert_eq!(ObjectOptions::TUPLE_FORMAT.bits(), 8 | 1);
        assert_eq!(ObjectTypes::JSON.bits(), 31);
        assert_eq!(ObjectTypes::ALL.bits(), 63);
        assert_eq!(NodeOptions::default(), NodeOptions::empty());
        assert_eq!(ObjectOptions::default(), ObjectOptions::empty());
    }

    #[test]
    fn test_node_predicates() {
        let opts = NodeOptions::default();
        assert!(opts.is_serialized());
        assert!(opts.is_deserialized());
        assert!(!opts.should_serialize_null());
        assert!(!opts.should_ignore_type_mismatch());
        assert!(!opts.should_ignore_unknown_type());
        assert!(opts.should_assign_null());
        assert!(!opts.should_replace_with_deserialized());

        let opts = NodeOptions::IGNORE_DESERIALIZATION_TYPE_ERRORS | NodeOptions::DONT_SERIALIZE;
        assert!(!opts.is_serialized());
        assert!(opts.should_ignore_type_mismatch());
        assert!(opts.should_ignore_unknown_type());
        assert!((opts & !NodeOptions::IGNORE_TYPE_MISMATCH).should_ignore_unknown_type());
        assert!(!NodeOptions::DONT_ASSIGN_NULL.should_assign_null());
    }

    #[test]
    fn test_object_predicates() {
        let opts = ObjectOptions::TUPLE_FORMAT;
        assert!(opts.should_ignore_properties());
        assert!(opts.should_use_tuple_format());
        assert!(opts.should_throw_at_unknown_key());
        // ignoring properties alone does not switch the encoding
        assert!(!ObjectOptions::IGNORE_PROPERTIES.should_use_tuple_format());
        assert!(!(ObjectOptions::IGNORE_UNKNOWN_KEY | ObjectOptions::INCLUDE_STATIC)
            .should_throw_at_unknown_key());
    }

    #[test]
    fn test_object_types() {
        assert!(ObjectTypes::JSON.supports_dictionary());
        assert!(!ObjectTypes::JSON.supports_custom());
        assert!(ObjectTypes::ALL.supports_custom());
        let types = ObjectTypes::STRING | ObjectTypes::NUMBER;
        assert!(types.supports_string() && types.supports_number());
        assert!(!types.supports_bool() && !types.supports_array());
        assert_eq!(ObjectTypes::default(), ObjectTypes::JSON);
    }

    #[test]
    fn test_enum_format() {
        assert_eq!(EnumFormat::None.apply("FooBar"), "FooBar");
        assert_eq!(EnumFormat::Lowercased.apply("FooBar"), "foobar");
        assert_eq!(EnumFormat::Uppercased.apply("FooBar"), "FOOBAR");
        assert_eq!(EnumFormat::Capitalized.apply("fOOBAR"), "Foobar");
        assert_eq!(EnumFormat::Capitalized.apply(""), "");
    }
}
