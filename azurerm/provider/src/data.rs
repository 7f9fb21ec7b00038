//! The data bag handed to resource handlers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A snapshot of a managed resource
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub id: String,
    pub attributes: Map<String, Value>,
}

/// Desired configuration and known state of a single resource.
///
/// Reads see values written with [`ResourceData::set`] first, then the configuration,
/// then the prior state. [`ResourceData::has_change`] compares against the prior state.
#[derive(Debug, Clone, Default)]
pub struct ResourceData {
    id: Option<String>,
    config: Map<String, Value>,
    prior: Map<String, Value>,
    values: Map<String, Value>,
    new_resource: bool,
}

impl ResourceData {
    /// A resource about to be created from `config`
    pub fn new(config: Map<String, Value>) -> Self {
        Self {
            config,
            new_resource: true,
            ..Self::default()
        }
    }

    /// A resource known by its ID and last recorded attributes
    pub fn from_state(state: ResourceState) -> Self {
        Self {
            id: Some(state.id),
            prior: state.attributes,
            ..Self::default()
        }
    }

    /// An existing resource with a new desired configuration
    pub fn planned(state: ResourceState, config: Map<String, Value>) -> Self {
        Self {
            config,
            ..Self::from_state(state)
        }
    }

    /// A resource to be adopted, known only by its ID
    pub fn import(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = Some(id.into());
    }

    /// Mark the resource as gone
    pub fn clear_id(&mut self) {
        self.id = None;
    }

    pub fn is_new_resource(&self) -> bool {
        self.new_resource
    }

    /// The current value of `key`, treating `null` as absent
    pub fn get(&self, key: &str) -> Option<&Value> {
        [&self.values, &self.config, &self.prior]
            .into_iter()
            .find_map(|layer| layer.get(key))
            .filter(|value| !value.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_string_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn get_string_map(&self, key: &str) -> BTreeMap<String, String> {
        self.get(key)
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Whether the desired value of `key` differs from the prior state
    pub fn has_change(&self, key: &str) -> bool {
        // attributes missing from the config keep their prior value
        let Some(desired) = self.values.get(key).or_else(|| self.config.get(key)) else {
            return false;
        };

        let prior = self.prior.get(key).filter(|v| !v.is_null());
        prior != Some(desired).filter(|v| !v.is_null())
    }

    /// The state to record, or `None` once the ID has been cleared
    pub fn state(&self) -> Option<ResourceState> {
        let id = self.id.clone()?;

        let mut attributes = self.prior.clone();
        attributes.extend(self.config.clone());
        attributes.extend(self.values.clone());
        attributes.insert("id".to_string(), Value::String(id.clone()));

        Some(ResourceState { id, attributes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn typed_getters() {
        let data = ResourceData::new(map(json!({
            "name": "vnet",
            "enabled": true,
            "count": 3,
            "address_space": ["10.0.0.0/16", 1],
            "tags": {"env": "dev"},
            "missing": null,
        })));

        assert!(data.is_new_resource());
        assert_eq!(data.get_str("name"), Some("vnet"));
        assert_eq!(data.get_bool("enabled"), Some(true));
        assert_eq!(data.get_i64("count"), Some(3));
        assert_eq!(data.get_string_list("address_space"), vec!["10.0.0.0/16"]);
        assert_eq!(data.get_string_map("tags")["env"], "dev");
        assert!(data.get("missing").is_none());
        assert!(data.get_string_list("nothing").is_empty());
    }

    #[test]
    fn set_values_win_over_config() {
        let mut data = ResourceData::new(map(json!({"location": "West Europe"})));
        data.set("location", "westeurope");
        assert_eq!(data.get_str("location"), Some("westeurope"));
    }

    #[test]
    fn changes_are_relative_to_prior_state() {
        let state = ResourceState {
            id: "/subscriptions/s/resourceGroups/rg".to_string(),
            attributes: map(json!({"location": "westeurope", "tags": {"a": "1"}, "guid": "g"})),
        };
        let data = ResourceData::planned(
            state,
            map(json!({"location": "westeurope", "tags": {"a": "2"}})),
        );

        assert!(!data.is_new_resource());
        assert!(!data.has_change("location"));
        assert!(data.has_change("tags"));
        assert!(!data.has_change("guid"));
        assert_eq!(data.get_str("guid"), Some("g"));
    }

    #[test]
    fn null_config_clears_prior_value() {
        let state = ResourceState {
            id: "/subscriptions/s/resourceGroups/rg".to_string(),
            attributes: map(json!({"managed_by": "owner", "tags": {"a": "1"}})),
        };
        let data = ResourceData::planned(state, map(json!({"managed_by": null, "tags": {}, "other": null})));

        assert!(data.has_change("managed_by"));
        assert!(data.get_str("managed_by").is_none());
        assert!(data.has_change("tags"));
        assert!(data.get_string_map("tags").is_empty());
        assert!(!data.has_change("other"));
    }

    #[test]
    fn cleared_id_removes_state() {
        let mut data = ResourceData::import("/subscriptions/s/resourceGroups/rg");
        assert!(data.state().is_some());

        data.clear_id();
        assert!(data.state().is_none());
    }

    #[test]
    fn state_merges_layers_and_records_id() {
        let mut data = ResourceData::new(map(json!({"name": "rg"})));
        data.set_id("/subscriptions/s/resourceGroups/rg");
        data.set("location", "westeurope");

        let state = data.state().unwrap();
        assert_eq!(state.attributes["name"], "rg");
        assert_eq!(state.attributes["location"], "westeurope");
        assert_eq!(state.attributes["id"], "/subscriptions/s/resourceGroups/rg");
    }
}
