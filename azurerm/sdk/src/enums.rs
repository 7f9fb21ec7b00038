//! Extensible string enums.
//!
//! Resource Manager adds enum values over time, so every enum keeps an `Other`
//! variant and unknown values are preserved instead of failing deserialization.

/// Declare a string-backed enum with an `Other(String)` fallback.
///
/// Generates `as_str`, `possible_values`, a case-insensitive `parse_value`,
/// `Display`, `FromStr` and serde support as the canonical string.
#[macro_export]
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// A value not known to this client
            Other(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $( Self::$variant => $value, )+
                    Self::Other(value) => value.as_str(),
                }
            }

            pub fn possible_values() -> &'static [&'static str] {
                &[ $( $value ),+ ]
            }

            /// Case-insensitive lookup, unknown values end up in `Other`
            pub fn parse_value(input: &str) -> Self {
                $(
                    if input.eq_ignore_ascii_case($value) {
                        return Self::$variant;
                    }
                )+
                Self::Other(input.to_string())
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::std::convert::Infallible;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                Ok(Self::parse_value(s))
            }
        }

        impl $crate::__private::serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> ::std::result::Result<S::Ok, S::Error>
            where
                S: $crate::__private::serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> $crate::__private::serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> ::std::result::Result<Self, D::Error>
            where
                D: $crate::__private::serde::Deserializer<'de>,
            {
                let raw = <String as $crate::__private::serde::Deserialize>::deserialize(deserializer)?;
                Ok(Self::parse_value(&raw))
            }
        }
    };
}

string_enum! {
    /// `properties.provisioningState` of a resource
    pub enum ProvisioningState {
        Succeeded => "Succeeded",
        Failed => "Failed",
        Canceled => "Canceled",
        Creating => "Creating",
        Updating => "Updating",
        Deleting => "Deleting",
        Accepted => "Accepted",
    }
}

impl ProvisioningState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Canceled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Succeeded", ProvisioningState::Succeeded)]
    #[case("succeeded", ProvisioningState::Succeeded)]
    #[case("FAILED", ProvisioningState::Failed)]
    #[case("Migrating", ProvisioningState::Other("Migrating".to_string()))]
    fn parses_case_insensitively(#[case] input: &str, #[case] expected: ProvisioningState) {
        assert_eq!(ProvisioningState::parse_value(input), expected);
    }

    #[test]
    fn unknown_values_survive_serde() {
        let state: ProvisioningState = serde_json::from_str("\"Migrating\"").unwrap();
        assert_eq!(serde_json::to_string(&state).unwrap(), "\"Migrating\"");
        assert!(!state.is_terminal());
    }

    #[test]
    fn canonical_casing_on_output() {
        let state: ProvisioningState = serde_json::from_str("\"canceled\"").unwrap();
        assert_eq!(state.to_string(), "Canceled");
        assert!(state.is_terminal());
        assert!(state.is_failure());
    }

    #[test]
    fn possible_values_are_in_declaration_order() {
        assert_eq!(ProvisioningState::possible_values()[0], "Succeeded");
        assert_eq!(ProvisioningState::possible_values().len(), 7);
    }
}
