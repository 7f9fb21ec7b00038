//! Manifests: the provider configuration plus the resources to manage, written in
//! YAML, JSON or TOML with `${param}` placeholders.
//!
//! ```yaml
//! provider:
//!   subscription_id: ${subscription}
//! resources:
//!   - type: azurerm_resource_group
//!     config:
//!       name: example
//!       location: West Europe
//!     timeouts:
//!       create: 10m
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use miette::{Diagnostic, NamedSource, SourceOffset, SourceSpan};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::timeouts::TimeoutOverrides;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum TemplateError {
    #[error("Manifest not found: '{file_path}'")]
    #[diagnostic(
        code(azurerm::manifest::file_not_found),
        help("Check that the file path is correct and the file exists")
    )]
    NotFound {
        #[source]
        source: std::io::Error,
        file_path: String,
    },

    #[error("Unsupported manifest format: '{0}'")]
    #[diagnostic(
        code(azurerm::manifest::unknown_format),
        help(
            "The manifest format '{0}' is not supported in this build.\n\
             \n\
             Available formats in this build:\n\
             {}\n\
             \n\
             To enable additional formats, rebuild with the appropriate feature flag:\n\
             • For JSON: --features json\n\
             • For YAML: --features yaml\n\
             • For TOML: --features toml",
            Self::available_formats()
        )
    )]
    UnknownFormat(TemplateFormat),

    #[error("Missing template parameters: {0:?}")]
    #[diagnostic(
        code(azurerm::manifest::missing_params),
        help(
            "Provide the missing parameters using the -p flag.\n\
              \n\
              Example:\n\
              azurerm apply -f manifest.yaml -p subscription=00000000-0000-0000-0000-000000000000"
        )
    )]
    MissingParams(HashSet<String>),

    #[error("The resource address '{0}' is declared more than once")]
    #[diagnostic(
        code(azurerm::manifest::duplicate_resource),
        help("Give one of the resources a distinct `key`")
    )]
    DuplicateResource(String),

    #[error("The resource at index {0} has no `key` and no `config.name` to address it by")]
    #[diagnostic(code(azurerm::manifest::unaddressable_resource))]
    Unaddressable(usize),

    #[cfg(feature = "json")]
    #[error("JSON parsing error")]
    #[diagnostic(code(azurerm::manifest::json_parse_error))]
    ParseJson {
        #[source_code]
        source_code: Arc<NamedSource<String>>,
        #[label("{}", error)]
        span: SourceSpan,
        #[source]
        error: serde_json::Error,
    },

    #[cfg(feature = "yaml")]
    #[error("YAML parsing error")]
    #[diagnostic(code(azurerm::manifest::yaml_parse_error))]
    ParseYaml {
        #[source_code]
        source_code: Arc<NamedSource<String>>,
        #[label("{}", error)]
        span: SourceSpan,
        #[source]
        error: serde_yml::Error,
    },

    #[cfg(feature = "toml")]
    #[error(transparent)]
    #[diagnostic(code(azurerm::manifest::toml_serialize_error))]
    ParseSerToml(#[from] toml::ser::Error),

    #[cfg(feature = "toml")]
    #[error("TOML parsing error")]
    #[diagnostic(code(azurerm::manifest::toml_parse_error))]
    ParseDeToml {
        #[source_code]
        source_code: Arc<NamedSource<String>>,
        #[label("{}", error)]
        span: SourceSpan,
        #[source]
        error: toml::de::Error,
    },
}

impl TemplateError {
    fn available_formats() -> String {
        let mut formats = vec![];

        #[cfg(feature = "json")]
        formats.push("• JSON (.json)");

        #[cfg(feature = "yaml")]
        formats.push("• YAML (.yaml, .yml)");

        #[cfg(feature = "toml")]
        formats.push("• TOML (.toml)");

        if formats.is_empty() {
            "No formats are currently enabled".to_string()
        } else {
            formats.join("\n")
        }
    }
}

/// Serialization format of a manifest, usually inferred from the file extension
#[derive(Debug, Clone)]
pub enum TemplateFormat {
    Json,
    Toml,
    Yaml,
    Unknown(String),
}

impl std::fmt::Display for TemplateFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateFormat::Json => write!(f, "json"),
            TemplateFormat::Toml => write!(f, "toml"),
            TemplateFormat::Yaml => write!(f, "yaml"),
            TemplateFormat::Unknown(format) => write!(f, "{format}"),
        }
    }
}

pub fn format_from_path<P: AsRef<Path>>(path: P) -> TemplateFormat {
    let path = path.as_ref();
    let ext = path.extension().and_then(|s| s.to_str());

    match ext {
        Some("toml") => TemplateFormat::Toml,
        Some("json") => TemplateFormat::Json,
        Some("yml") | Some("yaml") => TemplateFormat::Yaml,
        ext => TemplateFormat::Unknown(ext.unwrap_or("unknown_ext").to_string()),
    }
}

/// Replace every `${name}` with its value, failing on placeholders without one
pub fn substitute_params(raw: &str, params: &HashMap<String, String>) -> Result<String, TemplateError> {
    static PARAM_REGEX: OnceLock<Regex> = OnceLock::new();
    let mut definition = raw.to_string();

    for (name, value) in params {
        let template = format!("${{{name}}}");
        definition = definition.replace(template.as_str(), value.as_str());
    }

    let missing_params = PARAM_REGEX
        .get_or_init(|| Regex::new("\\$\\{([a-zA-Z0-9_]+)\\}").expect("invalid regex"))
        .captures_iter(definition.as_str())
        .filter_map(|capture| capture.get(1).map(|param| param.as_str().to_string()))
        .collect::<HashSet<String>>();

    if !missing_params.is_empty() {
        return Err(TemplateError::MissingParams(missing_params));
    }

    Ok(definition)
}

/// One resource instance declared in a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestResource {
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Distinguishes instances in the state file, defaults to `config.name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default)]
    pub timeouts: TimeoutOverrides,
}

impl ManifestResource {
    /// `{type}.{key}`, e.g. `azurerm_resource_group.example`
    pub fn address(&self) -> Option<String> {
        let key = self
            .key
            .as_deref()
            .or_else(|| self.config.get("name").and_then(Value::as_str))?;
        Some(format!("{}.{key}", self.resource_type))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub resources: Vec<ManifestResource>,
}

impl Manifest {
    /// Load a manifest, inferring the format from the file extension
    pub fn load<P: AsRef<Path>>(path: P, params: HashMap<String, String>) -> Result<Self, TemplateError> {
        let format = format_from_path(&path);
        Self::from_file(path, format, params)
    }

    pub fn from_file<P: AsRef<Path>>(
        path: P,
        format: TemplateFormat,
        params: HashMap<String, String>,
    ) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| TemplateError::NotFound {
            source: e,
            file_path: path.display().to_string(),
        })?;
        Self::from_str(contents, format, params)
    }

    /// Parse, substitute parameters, then decode into a manifest.
    ///
    /// Parameters are substituted into the re-serialized document, so placeholders in
    /// comments are ignored.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str<T: AsRef<str>>(
        value: T,
        format: TemplateFormat,
        params: HashMap<String, String>,
    ) -> Result<Self, TemplateError> {
        let contents = value.as_ref();
        debug!("Parsing manifest with format: {format:?}");

        let manifest = match format {
            TemplateFormat::Toml => {
                #[cfg(feature = "toml")]
                {
                    toml_manifest(contents, &params)?
                }
                #[cfg(not(feature = "toml"))]
                {
                    return Err(TemplateError::UnknownFormat(TemplateFormat::Toml));
                }
            }
            TemplateFormat::Json => {
                #[cfg(feature = "json")]
                {
                    json_manifest(contents, &params)?
                }
                #[cfg(not(feature = "json"))]
                {
                    return Err(TemplateError::UnknownFormat(TemplateFormat::Json));
                }
            }
            TemplateFormat::Yaml => {
                #[cfg(feature = "yaml")]
                {
                    yaml_manifest(contents, &params)?
                }
                #[cfg(not(feature = "yaml"))]
                {
                    return Err(TemplateError::UnknownFormat(TemplateFormat::Yaml));
                }
            }
            fmt @ TemplateFormat::Unknown(_) => return Err(TemplateError::UnknownFormat(fmt)),
        };

        manifest.check_addresses()?;
        Ok(manifest)
    }

    fn check_addresses(&self) -> Result<(), TemplateError> {
        let mut seen = HashSet::new();
        for (index, resource) in self.resources.iter().enumerate() {
            let address = resource.address().ok_or(TemplateError::Unaddressable(index))?;
            if !seen.insert(address.clone()) {
                return Err(TemplateError::DuplicateResource(address));
            }
        }
        Ok(())
    }
}

fn named_source(name: &str, contents: &str) -> Arc<NamedSource<String>> {
    Arc::new(NamedSource::new(name, contents.to_string()))
}

#[cfg(feature = "toml")]
fn toml_manifest(contents: &str, params: &HashMap<String, String>) -> Result<Manifest, TemplateError> {
    let parse_error = |source: &str, error: toml::de::Error| {
        let offset = SourceOffset::from(error.span().map(|span| span.start).unwrap_or(0));
        TemplateError::ParseDeToml {
            source_code: named_source("manifest.toml", source),
            span: SourceSpan::new(offset, 1),
            error,
        }
    };

    let parsed = toml::from_str::<toml::Value>(contents).map_err(|e| parse_error(contents, e))?;
    let parsed = toml::to_string(&parsed)?;
    let definition = substitute_params(&parsed, params)?;
    toml::from_str::<Manifest>(&definition).map_err(|e| parse_error(&definition, e))
}

#[cfg(feature = "json")]
fn json_manifest(contents: &str, params: &HashMap<String, String>) -> Result<Manifest, TemplateError> {
    let parse_error = |source: &str, error: serde_json::Error| TemplateError::ParseJson {
        source_code: named_source("manifest.json", source),
        span: SourceSpan::new(SourceOffset::from_location(source, error.line(), error.column()), 1),
        error,
    };

    let parsed = serde_json::from_str::<Value>(contents).map_err(|e| parse_error(contents, e))?;
    let parsed = serde_json::to_string(&parsed).map_err(|e| parse_error(contents, e))?;
    let definition = substitute_params(&parsed, params)?;
    serde_json::from_str::<Manifest>(&definition).map_err(|e| parse_error(&definition, e))
}

#[cfg(feature = "yaml")]
fn yaml_manifest(contents: &str, params: &HashMap<String, String>) -> Result<Manifest, TemplateError> {
    let parse_error = |source: &str, error: serde_yml::Error| {
        let offset = error
            .location()
            .map(|location| SourceOffset::from_location(source, location.line(), location.column()))
            .unwrap_or_else(|| SourceOffset::from(0));
        TemplateError::ParseYaml {
            source_code: named_source("manifest.yaml", source),
            span: SourceSpan::new(offset, 1),
            error,
        }
    };

    let parsed = serde_yml::from_str::<serde_yml::Value>(contents).map_err(|e| parse_error(contents, e))?;
    let parsed = serde_yml::to_string(&parsed).map_err(|e| parse_error(contents, e))?;
    let definition = substitute_params(&parsed, params)?;
    serde_yml::from_str::<Manifest>(&definition).map_err(|e| parse_error(&definition, e))
}
