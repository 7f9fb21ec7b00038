use std::time::Duration;

use miette::Diagnostic;

use crate::config::ConfigError;
use crate::manifest::TemplateError;
use crate::schema::Diagnostics;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error, Diagnostic)]
pub enum Error {
    #[error(
        "A resource with the ID {id:?} already exists - to be managed this resource needs to be \
         imported into the State. Please see the resource documentation for {resource_type:?} for more information."
    )]
    #[diagnostic(
        code(azurerm::import_as_exists),
        help("adopt it with `azurerm import --type {resource_type} --id {id}`")
    )]
    ImportAsExists { resource_type: String, id: String },

    #[error("{action} {id}: {source}")]
    Request {
        action: &'static str,
        id: String,
        #[source]
        source: azurerm_sdk::Error,
    },

    #[error(transparent)]
    Sdk(#[from] azurerm_sdk::Error),

    #[error(transparent)]
    Id(#[from] azurerm_ids::ParseError),

    #[error("invalid configuration for {resource_type}:\n{diagnostics}")]
    #[diagnostic(code(azurerm::invalid_config))]
    InvalidConfig {
        resource_type: String,
        diagnostics: Diagnostics,
    },

    #[error("the resource {id} has no value for {attribute:?}")]
    MissingAttribute { id: String, attribute: String },

    #[error("{operation} of {resource_type} {id} did not complete within {after:?}")]
    #[diagnostic(
        code(azurerm::timeout),
        help("raise the timeout with a `timeouts` block on the resource")
    )]
    Timeout {
        operation: &'static str,
        resource_type: String,
        id: String,
        after: Duration,
    },

    #[error("the resource type {0:?} is not supported")]
    #[diagnostic(code(azurerm::unknown_resource_type), help("list the supported types with `azurerm types`"))]
    UnknownResourceType(String),

    #[error("{resource_type} cannot be updated in place, changing {attributes:?} requires replacing it")]
    RequiresReplacement {
        resource_type: String,
        attributes: Vec<String>,
    },

    #[error("{id} does not exist, it may have been deleted outside of this tool")]
    Gone { id: String },

    #[error(
        "deleting {id}: the Resource Group still contains Resources.\n\n\
         The Resource Group is checked for nested Resources before it is deleted, to avoid \
         unintentionally deleting them. The following Resources still exist within the Resource Group:\n\n{}\n\n\
         Either remove these Resources first or disable this check with the \
         `resource_group.prevent_deletion_if_contains_resources` feature.",
        .resources.iter().map(|r| format!("* `{r}`")).collect::<Vec<_>>().join("\n")
    )]
    ResourceGroupNotEmpty { id: String, resources: Vec<String> },

    #[error("reading or writing the state file {path}: {source}")]
    StateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("the state file {path} is not valid: {source}")]
    #[diagnostic(code(azurerm::invalid_state), help("the state file is JSON written by `azurerm apply`"))]
    StateDecode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(Box<ConfigError>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Template(Box<TemplateError>),
}

impl Error {
    /// Wrap an API failure with the action and resource it was about
    pub fn request(action: &'static str, id: &impl ToString) -> impl FnOnce(azurerm_sdk::Error) -> Error {
        let id = id.to_string();
        move |source| Error::Request { action, id, source }
    }

    /// The underlying API error, if any
    pub fn sdk_error(&self) -> Option<&azurerm_sdk::Error> {
        match self {
            Error::Request { source, .. } => Some(source),
            Error::Sdk(source) => Some(source),
            _ => None,
        }
    }

    pub fn was_not_found(&self) -> bool {
        self.sdk_error().is_some_and(azurerm_sdk::Error::was_not_found)
    }
}

impl From<ConfigError> for Error {
    fn from(error: ConfigError) -> Self {
        Error::Config(Box::new(error))
    }
}

impl From<TemplateError> for Error {
    fn from(error: TemplateError) -> Self {
        Error::Template(Box::new(error))
    }
}
