use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const SET_COOKIE_HEADER: &str = "Set-Cookie";
pub const ALLOW_METHODS_HEADER: &str = "Access-Control-Allow-Methods";
pub const LOCATION_HEADER: &str = "Location";

pub const REDIRECT_URL_ENV_VAR: &str = "REDIRECT_URL";
pub const DEFAULT_REDIRECT_TARGET: &str = "/";

/// Header name to list of values. The cookie-clearing pair repeats one name,
/// so a single-valued map cannot represent this response.
pub type MultiValueHeaders = BTreeMap<String, Vec<String>>;

/// Response shape consumed by a load balancer Lambda target with multi-value
/// headers enabled on the target group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AlbResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(rename = "multiValueHeaders")]
    pub multi_value_headers: MultiValueHeaders,
}

/// Redirect destination, resolved once per invocation at the runtime
/// boundary and passed into the responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignoutConfig {
    pub redirect_target: String,
}

impl SignoutConfig {
    /// An absent value falls back to the root path. A present value is used
    /// verbatim, the empty string included.
    pub fn resolve(configured: Option<String>) -> Self {
        Self {
            redirect_target: configured.unwrap_or_else(|| DEFAULT_REDIRECT_TARGET.to_string()),
        }
    }
}

pub fn stable_contract_json(value: impl Serialize) -> String {
    serde_json::to_string(&value).expect("serialization of contract value should not fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_defaults_to_root_path_when_absent() {
        let config = SignoutConfig::resolve(None);
        assert_eq!(config.redirect_target, "/");
    }

    #[test]
    fn resolve_uses_configured_value_verbatim() {
        let config = SignoutConfig::resolve(Some("/login".to_string()));
        assert_eq!(config.redirect_target, "/login");
    }

    #[test]
    fn resolve_keeps_empty_value_instead_of_substituting_default() {
        let config = SignoutConfig::resolve(Some(String::new()));
        assert_eq!(config.redirect_target, "");
    }

    #[test]
    fn response_serializes_with_load_balancer_field_names() {
        let response = AlbResponse {
            status_code: 302,
            multi_value_headers: MultiValueHeaders::from([(
                "Location".to_string(),
                vec!["/".to_string()],
            )]),
        };

        assert_eq!(
            stable_contract_json(&response),
            r#"{"statusCode":302,"multiValueHeaders":{"Location":["/"]}}"#
        );
    }
}
