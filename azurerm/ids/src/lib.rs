//! # Azure Resource IDs
//!
//! A typed codec for hierarchical Azure Resource Manager IDs such as
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.Relay/namespaces/{name}`.
//!
//! Every ID type is described by an ordered template of [`Segment`]s: static literals,
//! provider namespaces and value segments. The same template drives parsing, formatting
//! and the error messages, so a new ID type only needs to declare its segments.
//!
//! ```
//! use azurerm_ids::{resource_id, ResourceId, Segment};
//!
//! resource_id! {
//!     /// A Relay namespace
//!     pub struct NamespaceId("Namespace") {
//!         subscription_id => "subscriptionId", "Subscription",
//!         resource_group_name => "resourceGroupName", "Resource Group Name",
//!         namespace_name => "namespaceName", "Namespace Name",
//!     }
//!     segments = [
//!         Segment::static_segment("staticSubscriptions", "subscriptions"),
//!         Segment::subscription_id("subscriptionId"),
//!         Segment::static_segment("staticResourceGroups", "resourceGroups"),
//!         Segment::resource_group("resourceGroupName"),
//!         Segment::static_segment("staticProviders", "providers"),
//!         Segment::resource_provider("staticMicrosoftRelay", "Microsoft.Relay"),
//!         Segment::static_segment("staticNamespaces", "namespaces"),
//!         Segment::user_specified("namespaceName", "namespaceValue"),
//!     ];
//! }
//!
//! let id = NamespaceId::new("sub", "rg", "ns");
//! assert_eq!(NamespaceId::parse(&id.id()).unwrap(), id);
//! ```
//!
//! Two parse modes exist: [`ResourceId::parse`] is case-sensitive and meant for user
//! input, [`ResourceId::parse_insensitively`] ignores the casing of literal segments and
//! is meant only for IDs echoed back by the API.

pub mod common;
pub mod error;
pub mod parser;
pub mod segment;

pub use common::{ResourceGroupId, ScopeId, SubscriptionId};
pub use error::{ParseError, ValidationError};
pub use parser::{ParseResult, Parser};
pub use segment::{example_id, format_id, normalize_value, Segment, SegmentKind};

pub type Result<T> = core::result::Result<T, ParseError>;

#[doc(hidden)]
pub mod __private {
    pub use serde;
}

/// A typed resource ID backed by a segment template
pub trait ResourceId: Sized {
    /// Human readable name of the ID type used in errors, e.g. `Hybrid Connection`
    const ID_TYPE: &'static str;

    /// The ordered template describing this ID
    fn segments() -> Vec<Segment>;

    /// Build the typed ID from values extracted by a [`Parser`]
    fn from_parse_result(result: &ParseResult) -> Result<Self>;

    /// The value held for a value segment
    fn segment_value(&self, segment: &str) -> Option<&str>;

    /// Multi-line description of the ID components
    fn describe(&self) -> String;

    /// Canonical string form of this ID
    fn id(&self) -> String {
        format_id(&Self::segments(), |name| self.segment_value(name))
    }

    /// Parse user supplied input; literal segments must match exactly
    fn parse(input: &str) -> Result<Self> {
        let parser = Parser::new(Self::ID_TYPE, Self::segments());
        Self::from_parse_result(&parser.parse(input, false)?)
    }

    /// Parse an ID returned by the API; literal segments may use any casing
    fn parse_insensitively(input: &str) -> Result<Self> {
        let parser = Parser::new(Self::ID_TYPE, Self::segments());
        Self::from_parse_result(&parser.parse(input, true)?)
    }

    /// Schema validation adapter returning `(warnings, errors)`
    fn validate(
        value: &serde_json::Value,
        key: &str,
    ) -> (Vec<String>, Vec<ValidationError>) {
        let Some(input) = value.as_str() else {
            return (
                vec![],
                vec![ValidationError::NotAString {
                    key: key.to_string(),
                }],
            );
        };

        match Self::parse(input) {
            Ok(_) => (vec![], vec![]),
            Err(source) => (
                vec![],
                vec![ValidationError::Invalid {
                    key: key.to_string(),
                    source,
                }],
            ),
        }
    }
}

/// Declare a typed resource ID.
///
/// Every value field maps to the segment of the same name in the template. The macro
/// generates the struct, a `new` constructor normalizing scope values, the [`ResourceId`] implementation,
/// `Display` (canonical ID), `FromStr` (case-sensitive parse) and serde support
/// (as the ID string).
#[macro_export]
macro_rules! resource_id {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($id_type:literal) {
            $( $(#[$fmeta:meta])* $field:ident => $segment:literal, $label:literal ),+ $(,)?
        }
        segments = [ $( $seg:expr ),+ $(,)? ];
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis struct $name {
            $( $(#[$fmeta])* pub $field: String, )+
        }

        impl $name {
            #[allow(clippy::too_many_arguments)]
            pub fn new($( $field: impl Into<String> ),+) -> Self {
                let segments = <Self as $crate::ResourceId>::segments();
                Self {
                    $( $field: $crate::segment::normalize_value(&segments, $segment, $field.into()), )+
                }
            }
        }

        impl $crate::ResourceId for $name {
            const ID_TYPE: &'static str = $id_type;

            fn segments() -> Vec<$crate::Segment> {
                vec![ $( $seg ),+ ]
            }

            fn from_parse_result(result: &$crate::ParseResult) -> $crate::Result<Self> {
                Ok(Self {
                    $( $field: result.require(Self::ID_TYPE, $segment)?, )+
                })
            }

            fn segment_value(&self, segment: &str) -> Option<&str> {
                match segment {
                    $( $segment => Some(self.$field.as_str()), )+
                    _ => None,
                }
            }

            fn describe(&self) -> String {
                let components: Vec<String> = vec![
                    $( format!("{}: {:?}", $label, self.$field) ),+
                ];
                format!("{} ({})", Self::ID_TYPE, components.join("\n"))
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(&$crate::ResourceId::id(self))
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::ParseError;

            fn from_str(s: &str) -> $crate::Result<Self> {
                <Self as $crate::ResourceId>::parse(s)
            }
        }

        impl $crate::__private::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: $crate::__private::serde::Serializer,
            {
                serializer.serialize_str(&$crate::ResourceId::id(self))
            }
        }

        impl<'de> $crate::__private::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
            where
                D: $crate::__private::serde::Deserializer<'de>,
            {
                use $crate::__private::serde::de::Error as _;

                let raw = <String as $crate::__private::serde::Deserialize>::deserialize(deserializer)?;
                <Self as $crate::ResourceId>::parse_insensitively(&raw).map_err(D::Error::custom)
            }
        }
    };
}
