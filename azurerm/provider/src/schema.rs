//! Attribute schemas and plan-time validation of resource configuration.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// The shape of an attribute value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "type", content = "element")]
pub enum ValueType {
    String,
    Int,
    Float,
    Bool,
    List(Box<ValueType>),
    Set(Box<ValueType>),
    Map(Box<ValueType>),
}

impl ValueType {
    pub fn list_of(element: ValueType) -> Self {
        ValueType::List(Box::new(element))
    }

    pub fn set_of(element: ValueType) -> Self {
        ValueType::Set(Box::new(element))
    }

    pub fn map_of(element: ValueType) -> Self {
        ValueType::Map(Box::new(element))
    }

    /// Check `value` against this type, returning the first mismatch
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match (self, value) {
            (ValueType::String, Value::String(_)) => Ok(()),
            (ValueType::Bool, Value::Bool(_)) => Ok(()),
            (ValueType::Int, Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(()),
            (ValueType::Float, Value::Number(_)) => Ok(()),
            (ValueType::List(element), Value::Array(items)) => {
                items.iter().try_for_each(|item| element.check(item))
            }
            (ValueType::Set(element), Value::Array(items)) => {
                items.iter().try_for_each(|item| element.check(item))?;
                let mut seen = HashSet::new();
                match items.iter().map(Value::to_string).find(|item| !seen.insert(item.clone())) {
                    Some(duplicate) => Err(format!("duplicate set element {duplicate}")),
                    None => Ok(()),
                }
            }
            (ValueType::Map(element), Value::Object(entries)) => {
                entries.values().try_for_each(|entry| element.check(entry))
            }
            (expected, actual) => Err(format!("expected {expected}, got {}", kind_of(actual))),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => write!(f, "string"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::Bool => write!(f, "bool"),
            ValueType::List(element) => write!(f, "list of {element}"),
            ValueType::Set(element) => write!(f, "set of {element}"),
            ValueType::Map(element) => write!(f, "map of {element}"),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

/// Warnings and errors produced by a validator
pub type Validation = (Vec<String>, Vec<String>);

/// A validation function applied to a configured value and its attribute name
#[derive(Clone)]
pub struct Validator(Arc<dyn Fn(&Value, &str) -> Validation + Send + Sync>);

impl Validator {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &str) -> Validation + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, value: &Value, key: &str) -> Validation {
        (self.0)(value, key)
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Validator")
    }
}

/// One attribute of a resource schema.
///
/// ```
/// use azurerm_provider::schema::{Attribute, ValueType};
///
/// let name = Attribute::new(ValueType::String)
///     .required()
///     .force_new()
///     .description("The name of the Resource Group");
/// assert!(name.is_required());
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct Attribute {
    #[serde(rename = "type")]
    value_type: ValueType,
    required: bool,
    optional: bool,
    computed: bool,
    force_new: bool,
    sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(skip)]
    validators: Vec<Validator>,
    #[serde(skip)]
    state_func: Option<fn(&Value) -> Value>,
}

impl Attribute {
    pub fn new(value_type: ValueType) -> Self {
        Self {
            value_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            description: None,
            validators: vec![],
            state_func: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    /// Default used when the attribute is not configured; implies optional
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self.optional()
    }

    pub fn validate(mut self, validator: Validator) -> Self {
        self.validators.push(validator);
        self
    }

    /// Rewrites configured values into the form stored in state
    pub fn state_func(mut self, f: fn(&Value) -> Value) -> Self {
        self.state_func = Some(f);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn value_type(&self) -> &ValueType {
        &self.value_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn is_computed(&self) -> bool {
        self.computed
    }

    /// Computed and never set by configuration
    pub fn is_read_only(&self) -> bool {
        self.computed && !self.required && !self.optional
    }

    pub fn is_force_new(&self) -> bool {
        self.force_new
    }

    pub fn is_sensitive(&self) -> bool {
        self.sensitive
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
    pub summary: String,
}

/// The outcome of validating a configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    pub fn error(&mut self, attribute: Option<&str>, summary: impl Into<String>) {
        self.0.push(Diagnostic {
            severity: Severity::Error,
            attribute: attribute.map(str::to_string),
            summary: summary.into(),
        });
    }

    pub fn warning(&mut self, attribute: Option<&str>, summary: impl Into<String>) {
        self.0.push(Diagnostic {
            severity: Severity::Warning,
            attribute: attribute.map(str::to_string),
            summary: summary.into(),
        });
    }

    pub fn has_errors(&self) -> bool {
        self.0.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, diagnostic) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let severity = match diagnostic.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            match &diagnostic.attribute {
                Some(attribute) => write!(f, "{severity}: {attribute}: {}", diagnostic.summary)?,
                None => write!(f, "{severity}: {}", diagnostic.summary)?,
            }
        }
        Ok(())
    }
}

/// The attributes of a resource type keyed by name
#[derive(Debug, Clone, Default)]
pub struct Schema {
    attributes: BTreeMap<String, Attribute>,
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.attributes.serialize(serializer)
    }
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attribute(mut self, name: impl Into<String>, attribute: Attribute) -> Self {
        self.attributes.insert(name.into(), attribute);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(name, attribute)| (name.as_str(), attribute))
    }

    /// Validate user configuration before anything is sent to the API
    pub fn validate_config(&self, config: &Map<String, Value>) -> Diagnostics {
        let mut diagnostics = Diagnostics::default();

        for key in config.keys() {
            match self.attributes.get(key) {
                None => diagnostics.error(Some(key), "an argument with this name is not expected here"),
                Some(attribute) if attribute.is_read_only() && !config[key].is_null() => {
                    diagnostics.error(Some(key), "this attribute is computed and cannot be set")
                }
                Some(_) => {}
            }
        }

        for (name, attribute) in &self.attributes {
            let value = config.get(name).filter(|v| !v.is_null());
            let Some(value) = value else {
                if attribute.required {
                    diagnostics.error(Some(name), "the argument is required, but no definition was found");
                }
                continue;
            };

            if let Err(mismatch) = attribute.value_type.check(value) {
                diagnostics.error(Some(name), mismatch);
                continue;
            }

            for validator in &attribute.validators {
                let (warnings, errors) = validator.call(value, name);
                warnings
                    .into_iter()
                    .for_each(|w| diagnostics.warning(Some(name), w));
                errors
                    .into_iter()
                    .for_each(|e| diagnostics.error(Some(name), e));
            }
        }

        diagnostics
    }

    /// Fill in defaults for attributes missing from `config`
    pub fn apply_defaults(&self, config: &mut Map<String, Value>) {
        for (name, attribute) in &self.attributes {
            if let Some(default) = &attribute.default {
                if !matches!(config.get(name), Some(v) if !v.is_null()) {
                    config.insert(name.clone(), default.clone());
                }
            }
        }
    }

    /// Rewrite configured values with each attribute's state function
    pub fn normalize(&self, config: &mut Map<String, Value>) {
        for (name, attribute) in &self.attributes {
            let Some(f) = attribute.state_func else {
                continue;
            };
            if let Some(value) = config.get_mut(name).filter(|v| !v.is_null()) {
                *value = f(value);
            }
        }
    }

    /// Mark optional attributes dropped from `config` as cleared, so the plan removes
    /// what `prior` still records. Computed attributes keep whatever the API reports.
    pub fn clear_removed(&self, config: &mut Map<String, Value>, prior: &Map<String, Value>) {
        for (name, attribute) in &self.attributes {
            let removable = attribute.optional && !attribute.computed && attribute.default.is_none();
            let recorded = prior.get(name).is_some_and(|v| !v.is_null());
            if !removable || !recorded || config.contains_key(name) {
                continue;
            }

            let cleared = match attribute.value_type {
                ValueType::Map(_) => Value::Object(Map::new()),
                ValueType::List(_) | ValueType::Set(_) => Value::Array(Vec::new()),
                _ => Value::Null,
            };
            config.insert(name.clone(), cleared);
        }
    }

    /// Configurable attributes that cannot change in place
    pub fn force_new_attributes(&self) -> impl Iterator<Item = &str> {
        self.iter()
            .filter(|(_, attribute)| attribute.force_new && !attribute.is_read_only())
            .map(|(name, _)| name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::new()
            .attribute("name", Attribute::new(ValueType::String).required().force_new())
            .attribute(
                "address_space",
                Attribute::new(ValueType::list_of(ValueType::String)).required(),
            )
            .attribute("tags", Attribute::new(ValueType::map_of(ValueType::String)).optional())
            .attribute("enabled", Attribute::new(ValueType::Bool).default(true))
            .attribute("guid", Attribute::new(ValueType::String).computed())
    }

    fn config(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn valid_config_has_no_diagnostics() {
        let diagnostics = schema().validate_config(&config(json!({
            "name": "vnet",
            "address_space": ["10.0.0.0/16"],
            "tags": {"env": "dev"},
        })));
        assert!(diagnostics.is_empty(), "{diagnostics}");
    }

    #[rstest]
    #[case(json!({"address_space": []}), "name")]
    #[case(json!({"name": "a", "address_space": [], "location": "x"}), "location")]
    #[case(json!({"name": 1, "address_space": []}), "name")]
    #[case(json!({"name": "a", "address_space": [1]}), "address_space")]
    #[case(json!({"name": "a", "address_space": [], "tags": {"a": true}}), "tags")]
    #[case(json!({"name": "a", "address_space": [], "guid": "x"}), "guid")]
    fn invalid_config_names_the_attribute(#[case] value: Value, #[case] attribute: &str) {
        let diagnostics = schema().validate_config(&config(value));
        assert!(diagnostics.has_errors());
        assert_eq!(
            diagnostics.errors().next().and_then(|d| d.attribute.as_deref()),
            Some(attribute)
        );
    }

    #[test]
    fn null_counts_as_missing() {
        let diagnostics = schema().validate_config(&config(json!({
            "name": null,
            "address_space": [],
        })));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn sets_reject_duplicates() {
        let err = ValueType::set_of(ValueType::String)
            .check(&json!(["a", "a"]))
            .unwrap_err();
        assert!(err.contains("duplicate"));
    }

    #[test]
    fn validators_contribute_warnings_and_errors() {
        let schema = Schema::new().attribute(
            "name",
            Attribute::new(ValueType::String).required().validate(Validator::new(|_, key| {
                (vec![format!("{key} is deprecated")], vec![format!("{key} is wrong")])
            })),
        );

        let diagnostics = schema.validate_config(&config(json!({"name": "x"})));
        assert_eq!(diagnostics.warnings().count(), 1);
        assert_eq!(diagnostics.errors().count(), 1);
        assert_eq!(diagnostics.to_string(), "warning: name: name is deprecated\nerror: name: name is wrong");
    }

    #[test]
    fn defaults_fill_missing_values_only() {
        let mut missing = config(json!({}));
        schema().apply_defaults(&mut missing);
        assert_eq!(missing["enabled"], json!(true));

        let mut set = config(json!({"enabled": false}));
        schema().apply_defaults(&mut set);
        assert_eq!(set["enabled"], json!(false));
    }

    #[test]
    fn removed_optional_attributes_are_cleared() {
        let schema = schema()
            .attribute("managed_by", Attribute::new(ValueType::String).optional())
            .attribute("dns_servers", Attribute::new(ValueType::list_of(ValueType::String)).optional());
        let prior = config(json!({
            "name": "vnet",
            "tags": {"env": "dev"},
            "managed_by": "owner",
            "dns_servers": ["10.0.0.4"],
            "enabled": false,
            "guid": "g",
        }));

        let mut desired = config(json!({"name": "vnet"}));
        schema.clear_removed(&mut desired, &prior);

        assert_eq!(desired["tags"], json!({}));
        assert_eq!(desired["managed_by"], Value::Null);
        assert_eq!(desired["dns_servers"], json!([]));
        assert!(!desired.contains_key("enabled"));
        assert!(!desired.contains_key("guid"));
    }

    #[test]
    fn configured_and_unrecorded_attributes_are_left_alone() {
        let mut desired = config(json!({"name": "vnet", "tags": {"env": "prod"}}));
        schema().clear_removed(&mut desired, &config(json!({"tags": {"env": "dev"}})));
        assert_eq!(desired["tags"], json!({"env": "prod"}));

        let mut desired = config(json!({"name": "vnet"}));
        schema().clear_removed(&mut desired, &config(json!({"tags": null})));
        assert!(!desired.contains_key("tags"));
    }

    #[test]
    fn schema_serializes_without_validators() {
        let rendered = serde_json::to_value(schema()).unwrap();
        assert_eq!(rendered["name"]["type"], json!({"type": "string"}));
        assert_eq!(rendered["name"]["force_new"], json!(true));
        assert_eq!(
            rendered["address_space"]["type"],
            json!({"type": "list", "element": {"type": "string"}})
        );
    }
}
