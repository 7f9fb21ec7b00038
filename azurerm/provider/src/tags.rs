//! The `tags` attribute shared by taggable resources.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::data::ResourceData;
use crate::schema::{Attribute, Validator, ValueType};

/// Azure allows at most 50 tags with keys up to 512 and values up to 256 characters
fn validate_tags() -> Validator {
    Validator::new(|value, key| {
        let Some(tags) = value.as_object() else {
            return (vec![], vec![format!("expected {key:?} to be a map")]);
        };

        let mut errors = vec![];
        if tags.len() > 50 {
            errors.push(format!("a maximum of 50 tags can be applied to each resource, {key} has {}", tags.len()));
        }
        for (name, value) in tags {
            if name.len() > 512 {
                errors.push(format!("the maximum length for a tag key is 512 characters: {name:?} is {} characters", name.len()));
            }
            if value.as_str().is_some_and(|v| v.len() > 256) {
                errors.push(format!("the maximum length for a tag value is 256 characters: the value for {name:?} is too long"));
            }
        }
        (vec![], errors)
    })
}

pub fn schema() -> Attribute {
    Attribute::new(ValueType::map_of(ValueType::String))
        .optional()
        .validate(validate_tags())
        .description("A mapping of tags to assign to the resource")
}

/// Tags from configuration in the shape the API expects; `None` when unset
pub fn expand(data: &ResourceData) -> Option<BTreeMap<String, String>> {
    data.get("tags").map(|_| data.get_string_map("tags"))
}

/// Tags returned by the API, an absent map becomes an empty one
pub fn flatten(tags: Option<&BTreeMap<String, String>>) -> Value {
    let map: Map<String, Value> = tags
        .into_iter()
        .flatten()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    Value::Object(map)
}
