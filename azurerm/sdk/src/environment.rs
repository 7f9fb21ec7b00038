//! Cloud environments and their endpoints.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

/// Endpoints of an Azure cloud
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,
    pub resource_manager: Url,
    pub login_endpoint: Url,
    pub token_audience: String,
}

impl Environment {
    fn from_static(name: &str, resource_manager: &str, login_endpoint: &str) -> Self {
        Self {
            name: name.to_string(),
            resource_manager: Url::parse(resource_manager).expect("static resource manager url"),
            login_endpoint: Url::parse(login_endpoint).expect("static login url"),
            token_audience: resource_manager.trim_end_matches('/').to_string(),
        }
    }

    pub fn public() -> Self {
        Self::from_static(
            "public",
            "https://management.azure.com/",
            "https://login.microsoftonline.com/",
        )
    }

    pub fn china() -> Self {
        Self::from_static(
            "china",
            "https://management.chinacloudapi.cn/",
            "https://login.chinacloudapi.cn/",
        )
    }

    pub fn usgovernment() -> Self {
        Self::from_static(
            "usgovernment",
            "https://management.usgovcloudapi.net/",
            "https://login.microsoftonline.us/",
        )
    }

    /// Look up an environment by name.
    ///
    /// Accepts the short names (`public`, `china`, `usgovernment`) in any casing as
    /// well as the long `Azure<Name>Cloud` form.
    pub fn from_name(name: &str) -> Result<Self> {
        let normalized = name.trim().to_ascii_lowercase();
        let short = normalized
            .strip_prefix("azure")
            .and_then(|n| n.strip_suffix("cloud"))
            .unwrap_or(normalized.as_str());

        match short {
            "public" | "" => Ok(Self::public()),
            "china" => Ok(Self::china()),
            "usgovernment" => Ok(Self::usgovernment()),
            _ => Err(Error::UnknownEnvironment(name.to_string())),
        }
    }

    /// A custom environment, e.g. a local Resource Manager emulator.
    pub fn custom(name: impl Into<String>, resource_manager: Url, login_endpoint: Url) -> Self {
        let token_audience = resource_manager.as_str().trim_end_matches('/').to_string();
        Self {
            name: name.into(),
            resource_manager,
            login_endpoint,
            token_audience,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::public()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("public", "https://management.azure.com/")]
    #[case("AzurePublicCloud", "https://management.azure.com/")]
    #[case("CHINA", "https://management.chinacloudapi.cn/")]
    #[case("AZURECHINACLOUD", "https://management.chinacloudapi.cn/")]
    #[case("usgovernment", "https://management.usgovcloudapi.net/")]
    #[case("AzureUSGovernmentCloud", "https://management.usgovcloudapi.net/")]
    fn resolves_known_names(#[case] name: &str, #[case] endpoint: &str) {
        let env = Environment::from_name(name).unwrap();
        assert_eq!(env.resource_manager.as_str(), endpoint);
    }

    #[test]
    fn rejects_unknown_names() {
        let err = Environment::from_name("german").unwrap_err();
        assert!(matches!(err, Error::UnknownEnvironment(ref n) if n == "german"));
    }

    #[test]
    fn audience_has_no_trailing_slash() {
        assert_eq!(Environment::public().token_audience, "https://management.azure.com");
    }
}
