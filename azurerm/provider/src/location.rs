//! The `location` attribute shared by every regional resource.

use serde_json::Value;

use crate::schema::{Attribute, ValueType};
use crate::validation;

/// `West Europe`, `westeurope` and `WESTEUROPE` all name the same region
pub fn normalize(location: &str) -> String {
    location.replace(' ', "").to_ascii_lowercase()
}

/// Normalize an optional API value
pub fn normalize_nilable(location: Option<&str>) -> String {
    location.map(normalize).unwrap_or_default()
}

pub fn schema() -> Attribute {
    Attribute::new(ValueType::String)
        .required()
        .force_new()
        .validate(validation::string_is_not_empty())
        .state_func(|value| match value {
            Value::String(location) => Value::String(normalize(location)),
            other => other.clone(),
        })
        .description("The Azure Region where the resource should exist")
}

/// Location read from the API, always normalized for state
pub fn flatten(location: Option<&str>) -> Value {
    Value::String(normalize_nilable(location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use rstest::rstest;

    #[rstest]
    #[case("West Europe", "westeurope")]
    #[case("westeurope", "westeurope")]
    #[case("UK South", "uksouth")]
    fn normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize(input), expected);
    }

    #[test]
    fn configured_locations_are_normalized() {
        let schema = Schema::new().attribute("location", schema());
        let mut config = serde_json::json!({"location": "UK South"})
            .as_object()
            .cloned()
            .unwrap();

        schema.normalize(&mut config);

        assert_eq!(config["location"], "uksouth");
    }

    #[test]
    fn missing_location_is_empty() {
        assert_eq!(flatten(None), Value::String(String::new()));
    }
}
