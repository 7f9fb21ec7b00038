//! In-memory resource store keyed by lower-cased resource ID.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use serde_json::{json, Map, Value};

/// A request as seen by the fake control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OperationKind {
    AsyncOperation,
    Location,
}

#[derive(Debug, Clone)]
pub(crate) struct Operation {
    pub kind: OperationKind,
    pub remaining_polls: u32,
    pub failure: Option<(String, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PathKind {
    Resource,
    Collection,
}

pub(crate) fn key(path: &str) -> String {
    path.trim_end_matches('/').to_ascii_lowercase()
}

fn tokens(path: &str) -> Vec<&str> {
    path.trim_matches('/').split('/').filter(|t| !t.is_empty()).collect()
}

/// Resource IDs alternate type and name, so they always have an even number of segments
pub(crate) fn path_kind(path: &str) -> PathKind {
    if tokens(path).len() % 2 == 0 {
        PathKind::Resource
    } else {
        PathKind::Collection
    }
}

fn is_resource_group(tokens: &[&str]) -> bool {
    tokens.len() == 4
        && tokens[0].eq_ignore_ascii_case("subscriptions")
        && tokens[2].eq_ignore_ascii_case("resourceGroups")
}

/// `Microsoft.Relay/namespaces/hybridConnections` style type of a resource path
pub(crate) fn resource_type(path: &str) -> String {
    let tokens = tokens(path);
    if is_resource_group(&tokens) {
        return "Microsoft.Resources/resourceGroups".to_string();
    }

    match tokens
        .iter()
        .rposition(|t| t.eq_ignore_ascii_case("providers"))
    {
        Some(at) if at + 1 < tokens.len() => {
            let types: Vec<&str> = tokens[at + 2..].iter().step_by(2).copied().collect();
            format!("{}/{}", tokens[at + 1], types.join("/"))
        }
        _ => tokens
            .iter()
            .rev()
            .nth(1)
            .map(|t| t.to_string())
            .unwrap_or_default(),
    }
}

/// The resource that must exist before `path` can be created, if any
pub(crate) fn parent(path: &str) -> Option<String> {
    let tokens = tokens(path);
    if tokens.len() <= 2 {
        return None;
    }

    let mut parent = &tokens[..tokens.len() - 2];
    if parent.len() >= 2 && parent[parent.len() - 2].eq_ignore_ascii_case("providers") {
        parent = &parent[..parent.len() - 2];
    }

    // subscriptions are assumed to exist
    if parent.len() <= 2 {
        None
    } else {
        Some(format!("/{}", parent.join("/")))
    }
}

pub(crate) fn is_resource_group_path(path: &str) -> bool {
    is_resource_group(&tokens(path))
}

/// The namespace of `/subscriptions/{s}/providers/{namespace}`, optionally followed by an action
pub(crate) fn provider_namespace(path: &str) -> Option<(String, Option<String>)> {
    let tokens = tokens(path);
    let is_provider = tokens.len() >= 4
        && tokens[0].eq_ignore_ascii_case("subscriptions")
        && tokens[2].eq_ignore_ascii_case("providers");

    match tokens.len() {
        4 if is_provider => Some((tokens[3].to_string(), None)),
        5 if is_provider && tokens[4].eq_ignore_ascii_case("register") => {
            Some((tokens[3].to_string(), Some(tokens[4].to_ascii_lowercase())))
        }
        _ => None,
    }
}

fn name_of(path: &str) -> String {
    tokens(path).last().map(|t| t.to_string()).unwrap_or_default()
}

#[derive(Debug, Default)]
pub(crate) struct Store {
    resources: BTreeMap<String, Value>,
    pub operations: HashMap<String, Operation>,
    pub throttle_remaining: u32,
    pub next_failure: Option<(String, String)>,
    pub requests: Vec<RecordedRequest>,
    pub registered_providers: BTreeSet<String>,
}

impl Store {
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.resources.get(&key(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.resources.contains_key(&key(path))
    }

    /// Store a PUT body, returning the stored resource and whether it was created
    pub fn put(&mut self, path: &str, body: Value) -> (Value, bool) {
        let key = key(path);
        let previous = self.resources.get(&key).cloned();
        let created = previous.is_none();

        let mut resource = match body {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        let id = path.trim_end_matches('/').to_string();
        let kind = resource_type(path);
        let name = name_of(path);
        resource.insert("id".to_string(), json!(id));
        resource.insert("name".to_string(), json!(name));
        resource.insert("type".to_string(), json!(kind));

        let properties = resource
            .entry("properties")
            .or_insert_with(|| json!({}));
        if !properties.is_object() {
            *properties = json!({});
        }
        if let Some(properties) = properties.as_object_mut() {
            properties.insert("provisioningState".to_string(), json!("Succeeded"));
            enrich(&kind, &id, &name, properties, previous.as_ref());
        }

        let resource = Value::Object(resource);
        self.resources.insert(key, resource.clone());
        (resource, created)
    }

    /// Merge a PATCH body into an existing resource
    pub fn patch(&mut self, path: &str, patch: Value) -> Option<Value> {
        let resource = self.resources.get_mut(&key(path))?;

        if let (Some(target), Value::Object(patch)) = (resource.as_object_mut(), patch) {
            for (field, value) in patch {
                if field == "properties" {
                    if let (Some(Value::Object(existing)), Value::Object(update)) =
                        (target.get_mut("properties"), &value)
                    {
                        existing.extend(update.clone());
                        continue;
                    }
                }
                target.insert(field, value);
            }
        }

        Some(resource.clone())
    }

    /// Remove a resource and everything nested below it
    pub fn delete(&mut self, path: &str) -> bool {
        let key = key(path);
        let prefix = format!("{key}/");
        let existed = self.resources.remove(&key).is_some();
        self.resources.retain(|k, _| !k.starts_with(&prefix));
        existed
    }

    /// Direct children of a collection path, e.g. `.../namespaces`
    pub fn children(&self, collection: &str) -> Vec<Value> {
        let collection = key(collection);
        let collection_tokens = tokens(&collection);

        // `{resourceGroup}/resources` lists everything in the group
        if collection_tokens.len() == 5 && collection_tokens[4] == "resources" {
            let prefix = format!("/{}/providers/", collection_tokens[..4].join("/"));
            return self
                .resources
                .iter()
                .filter(|(k, _)| k.starts_with(&prefix))
                .map(|(_, v)| v.clone())
                .collect();
        }

        let prefix = format!("{collection}/");
        self.resources
            .iter()
            .filter(|(k, _)| {
                k.strip_prefix(&prefix)
                    .is_some_and(|rest| !rest.is_empty() && !rest.contains('/'))
            })
            .map(|(_, v)| v.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_registered(&self, namespace: &str) -> bool {
        self.registered_providers
            .contains(&namespace.to_ascii_lowercase())
    }

    pub fn register(&mut self, namespace: &str) {
        self.registered_providers
            .insert(namespace.to_ascii_lowercase());
    }
}

/// Read-only properties the real service computes
fn enrich(
    kind: &str,
    id: &str,
    name: &str,
    properties: &mut Map<String, Value>,
    previous: Option<&Value>,
) {
    let previous_property = |field: &str| {
        previous
            .and_then(|p| p.pointer(&format!("/properties/{field}")))
            .cloned()
    };

    match kind.to_ascii_lowercase().as_str() {
        "microsoft.network/virtualnetworks" => {
            let guid = previous_property("resourceGuid")
                .unwrap_or_else(|| json!(uuid::Uuid::new_v4().to_string()));
            properties.insert("resourceGuid".to_string(), guid);
        }
        "microsoft.relay/namespaces" => {
            let subscription = tokens(id).get(1).map(|s| s.to_string()).unwrap_or_default();
            properties.insert(
                "metricId".to_string(),
                json!(format!("{subscription}:{name}")),
            );
            properties.insert(
                "serviceBusEndpoint".to_string(),
                json!(format!("https://{name}.servicebus.windows.net:443/")),
            );
        }
        "microsoft.relay/namespaces/hybridconnections" => {
            properties
                .entry("listenerCount")
                .or_insert_with(|| json!(0));
            properties
                .entry("requiresClientAuthorization")
                .or_insert_with(|| json!(true));
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("/subscriptions/s/resourceGroups/rg", "Microsoft.Resources/resourceGroups")]
    #[case(
        "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Relay/namespaces/ns",
        "Microsoft.Relay/namespaces"
    )]
    #[case(
        "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Relay/namespaces/ns/hybridConnections/hc",
        "Microsoft.Relay/namespaces/hybridConnections"
    )]
    fn derives_resource_type(#[case] path: &str, #[case] expected: &str) {
        assert_eq!(resource_type(path), expected);
    }

    #[rstest]
    #[case("/subscriptions/s/resourceGroups/rg", None)]
    #[case(
        "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet",
        Some("/subscriptions/s/resourceGroups/rg")
    )]
    #[case(
        "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/a",
        Some("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet")
    )]
    fn finds_parent(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(parent(path).as_deref(), expected);
    }

    #[rstest]
    #[case("/subscriptions/s/providers/Microsoft.Relay", Some(("Microsoft.Relay", None)))]
    #[case(
        "/subscriptions/s/providers/Microsoft.Relay/register",
        Some(("Microsoft.Relay", Some("register")))
    )]
    #[case("/subscriptions/s/providers/Microsoft.Relay/namespaces", None)]
    #[case("/subscriptions/s/resourceGroups/rg", None)]
    #[case("/subscriptions/s/resourceGroups/rg/providers/Microsoft.Relay/namespaces/ns", None)]
    fn recognises_provider_paths(#[case] path: &str, #[case] expected: Option<(&str, Option<&str>)>) {
        let parsed = provider_namespace(path);
        assert_eq!(
            parsed
                .as_ref()
                .map(|(ns, action)| (ns.as_str(), action.as_deref())),
            expected
        );
    }

    #[test]
    fn put_is_case_insensitive_and_sets_metadata() {
        let mut store = Store::default();
        let (stored, created) = store.put(
            "/subscriptions/s/resourceGroups/RG",
            json!({"location": "westeurope"}),
        );

        assert!(created);
        assert_eq!(stored["name"], "RG");
        assert_eq!(stored["properties"]["provisioningState"], "Succeeded");
        assert!(store.contains("/subscriptions/s/resourcegroups/rg"));

        let (_, created) = store.put("/subscriptions/s/resourceGroups/rg", json!({"location": "westeurope"}));
        assert!(!created);
    }

    #[test]
    fn delete_removes_nested_resources() {
        let mut store = Store::default();
        store.put("/subscriptions/s/resourceGroups/rg", json!({}));
        store.put(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet",
            json!({}),
        );
        store.put(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet/subnets/a",
            json!({}),
        );

        assert_eq!(store.children("/subscriptions/s/resourceGroups/rg/resources").len(), 2);
        assert!(store.delete("/subscriptions/s/resourceGroups/rg"));
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn patch_merges_properties() {
        let mut store = Store::default();
        store.put(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Relay/namespaces/ns",
            json!({"location": "westeurope", "properties": {"a": 1}}),
        );
        let patched = store
            .patch(
                "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Relay/namespaces/ns",
                json!({"tags": {"env": "dev"}, "properties": {"b": 2}}),
            )
            .unwrap();

        assert_eq!(patched["tags"]["env"], "dev");
        assert_eq!(patched["properties"]["a"], 1);
        assert_eq!(patched["properties"]["b"], 2);
        assert_eq!(patched["properties"]["metricId"], "s:ns");
    }

    #[test]
    fn virtual_network_guid_is_stable_across_updates() {
        let mut store = Store::default();
        let path = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/virtualNetworks/vnet";
        let (first, _) = store.put(path, json!({}));
        let (second, _) = store.put(path, json!({"tags": {"a": "b"}}));

        assert_eq!(
            first["properties"]["resourceGuid"],
            second["properties"]["resourceGuid"]
        );
    }
}
