use std::collections::BTreeMap;
use std::net::{Ipv4Addr, Ipv6Addr};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::contract::stable_contract_json;

pub const DEPLOYMENT_SCHEMA_VERSION: &str = "v1";
pub const ACCOUNT_ENV_VAR: &str = "CDK_DEFAULT_ACCOUNT";
pub const REGION_ENV_VAR: &str = "CDK_DEFAULT_REGION";
pub const ACCOUNT_ID_DIGITS: usize = 12;
pub const CRON_FIELD_COUNT: usize = 5;

/// Target account and region, resolved from the process environment at the
/// synthesis boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetEnvironment {
    pub account: String,
    pub region: String,
}

/// Annotation telling the compliance linter to ignore one named rule for
/// this stack, with the justification on record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleSuppression {
    pub id: String,
    pub reason: String,
}

/// Parameter record for one deployment of the stack. Every field other than
/// the stack name is optional in the JSON form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub stack_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub self_sign_up_enabled: bool,
    #[serde(default)]
    pub saml_auth_enabled: bool,
    #[serde(default)]
    pub mfa_required: bool,
    #[serde(default)]
    pub allowed_ip_v4_address_ranges: Vec<String>,
    #[serde(default)]
    pub allowed_ip_v6_address_ranges: Vec<String>,
    #[serde(default = "default_auto_scale_down")]
    pub auto_scale_down: bool,
    #[serde(default)]
    pub schedule_auto_scaling: bool,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_schedule_scale_up")]
    pub schedule_scale_up: String,
    #[serde(default = "default_schedule_scale_down")]
    pub schedule_scale_down: String,
    #[serde(default)]
    pub allowed_sign_up_email_domains: Vec<String>,
    #[serde(default)]
    pub cheap_vpc: bool,
    #[serde(default)]
    pub use_spot: bool,
}

impl DeploymentRequest {
    pub fn new(stack_name: impl Into<String>) -> Self {
        Self {
            stack_name: stack_name.into(),
            description: None,
            tags: BTreeMap::new(),
            self_sign_up_enabled: false,
            saml_auth_enabled: false,
            mfa_required: false,
            allowed_ip_v4_address_ranges: Vec::new(),
            allowed_ip_v6_address_ranges: Vec::new(),
            auto_scale_down: default_auto_scale_down(),
            schedule_auto_scaling: false,
            timezone: default_timezone(),
            schedule_scale_up: default_schedule_scale_up(),
            schedule_scale_down: default_schedule_scale_down(),
            allowed_sign_up_email_domains: Vec::new(),
            cheap_vpc: false,
            use_spot: false,
        }
    }
}

/// Normalized output record handed to the provisioning toolchain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeploymentDescription {
    pub schema_version: String,
    pub stack_name: String,
    pub description: Option<String>,
    pub environment: TargetEnvironment,
    pub tags: BTreeMap<String, String>,
    pub self_sign_up_enabled: bool,
    pub saml_auth_enabled: bool,
    pub mfa_required: bool,
    pub allowed_ip_v4_address_ranges: Vec<String>,
    pub allowed_ip_v6_address_ranges: Vec<String>,
    pub auto_scale_down: bool,
    pub schedule_auto_scaling: bool,
    pub timezone: String,
    pub schedule_scale_up: String,
    pub schedule_scale_down: String,
    pub allowed_sign_up_email_domains: Vec<String>,
    pub cheap_vpc: bool,
    pub use_spot: bool,
    pub suppressions: Vec<RuleSuppression>,
}

/// Synthesis artifact: the normalized description plus provenance stamps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SynthesisRecord {
    pub schema_version: String,
    pub synthesized_at: String,
    pub parameter_fingerprint: String,
    pub description: DeploymentDescription,
}

impl SynthesisRecord {
    pub fn new(description: DeploymentDescription, synthesized_at: String) -> Self {
        let parameter_fingerprint = deployment_fingerprint(&description);
        Self {
            schema_version: DEPLOYMENT_SCHEMA_VERSION.to_string(),
            synthesized_at,
            parameter_fingerprint,
            description,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn default_auto_scale_down() -> bool {
    true
}

pub fn default_timezone() -> String {
    "UTC".to_string()
}

pub fn default_schedule_scale_up() -> String {
    "0 9 * * 1-5".to_string()
}

pub fn default_schedule_scale_down() -> String {
    "0 18 * * *".to_string()
}

/// Standing suppression set for this stack. Rule ids are the compliance
/// linter's own identifiers.
pub fn baseline_suppressions() -> Vec<RuleSuppression> {
    [
        (
            "AwsSolutions-L1",
            "Lambda runtimes for custom-resource providers and lifecycle hooks are pinned by their upstream constructs",
        ),
        (
            "AwsSolutions-IAM4",
            "Managed policies cover the service roles this stack provisions",
        ),
        (
            "AwsSolutions-IAM5",
            "Certificate and autoscaling operations require wildcard resource scopes",
        ),
        (
            "CdkNagValidationFailure",
            "Intrinsic references in generated templates cannot be statically validated",
        ),
    ]
    .into_iter()
    .map(|(id, reason)| RuleSuppression {
        id: id.to_string(),
        reason: reason.to_string(),
    })
    .collect()
}

pub fn normalize_deployment(
    request: DeploymentRequest,
    environment: TargetEnvironment,
    suppressions: Vec<RuleSuppression>,
) -> Result<DeploymentDescription, ValidationError> {
    let stack_name = request.stack_name.trim().to_string();
    if stack_name.is_empty() {
        return Err(ValidationError::new("stack_name cannot be empty"));
    }

    let environment = normalize_environment(environment)?;

    for range in &request.allowed_ip_v4_address_ranges {
        validate_ipv4_cidr(range)?;
    }
    for range in &request.allowed_ip_v6_address_ranges {
        validate_ipv6_cidr(range)?;
    }

    if request.schedule_auto_scaling {
        if request.timezone.trim().is_empty() {
            return Err(ValidationError::new(
                "timezone cannot be empty when scheduled autoscaling is enabled",
            ));
        }
        validate_cron_expression("schedule_scale_up", &request.schedule_scale_up)?;
        validate_cron_expression("schedule_scale_down", &request.schedule_scale_down)?;
    }

    for domain in &request.allowed_sign_up_email_domains {
        validate_email_domain(domain)?;
    }

    let mut suppressions = suppressions;
    for suppression in &suppressions {
        if suppression.id.trim().is_empty() {
            return Err(ValidationError::new("suppression id cannot be empty"));
        }
        if suppression.reason.trim().is_empty() {
            return Err(ValidationError::new(format!(
                "suppression '{}' must record a reason",
                suppression.id
            )));
        }
    }
    suppressions.sort_by(|a, b| a.id.cmp(&b.id));
    suppressions.dedup_by(|a, b| a.id == b.id);

    Ok(DeploymentDescription {
        schema_version: DEPLOYMENT_SCHEMA_VERSION.to_string(),
        stack_name,
        description: request.description,
        environment,
        tags: request.tags,
        self_sign_up_enabled: request.self_sign_up_enabled,
        saml_auth_enabled: request.saml_auth_enabled,
        mfa_required: request.mfa_required,
        allowed_ip_v4_address_ranges: request.allowed_ip_v4_address_ranges,
        allowed_ip_v6_address_ranges: request.allowed_ip_v6_address_ranges,
        auto_scale_down: request.auto_scale_down,
        schedule_auto_scaling: request.schedule_auto_scaling,
        timezone: request.timezone,
        schedule_scale_up: request.schedule_scale_up,
        schedule_scale_down: request.schedule_scale_down,
        allowed_sign_up_email_domains: request.allowed_sign_up_email_domains,
        cheap_vpc: request.cheap_vpc,
        use_spot: request.use_spot,
        suppressions,
    })
}

/// SHA-256 over the stable JSON rendering. Lets the toolchain detect
/// parameter drift between synthesized artifacts.
pub fn deployment_fingerprint(description: &DeploymentDescription) -> String {
    let mut hasher = Sha256::new();
    hasher.update(stable_contract_json(description));
    format!("{:x}", hasher.finalize())
}

fn normalize_environment(
    environment: TargetEnvironment,
) -> Result<TargetEnvironment, ValidationError> {
    let account = environment.account.trim().to_string();
    if account.len() != ACCOUNT_ID_DIGITS || !account.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::new(format!(
            "account '{account}' must be a {ACCOUNT_ID_DIGITS}-digit account id"
        )));
    }

    let region = environment.region.trim().to_string();
    if region.is_empty()
        || !region
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(ValidationError::new(format!(
            "region '{region}' is not a valid region name"
        )));
    }

    Ok(TargetEnvironment { account, region })
}

fn validate_ipv4_cidr(range: &str) -> Result<(), ValidationError> {
    let error = || ValidationError::new(format!("'{range}' is not a valid IPv4 CIDR range"));
    let (address, prefix) = range.split_once('/').ok_or_else(error)?;
    address.parse::<Ipv4Addr>().map_err(|_| error())?;
    let prefix: u8 = prefix.parse().map_err(|_| error())?;
    if prefix > 32 {
        return Err(error());
    }
    Ok(())
}

fn validate_ipv6_cidr(range: &str) -> Result<(), ValidationError> {
    let error = || ValidationError::new(format!("'{range}' is not a valid IPv6 CIDR range"));
    let (address, prefix) = range.split_once('/').ok_or_else(error)?;
    address.parse::<Ipv6Addr>().map_err(|_| error())?;
    let prefix: u8 = prefix.parse().map_err(|_| error())?;
    if prefix > 128 {
        return Err(error());
    }
    Ok(())
}

fn validate_cron_expression(field: &str, expression: &str) -> Result<(), ValidationError> {
    let field_count = expression.split_whitespace().count();
    if field_count != CRON_FIELD_COUNT {
        return Err(ValidationError::new(format!(
            "{field} '{expression}' must be a {CRON_FIELD_COUNT}-field cron expression"
        )));
    }
    Ok(())
}

fn validate_email_domain(domain: &str) -> Result<(), ValidationError> {
    if domain.is_empty()
        || domain.contains('@')
        || domain.chars().any(|character| character.is_whitespace())
    {
        return Err(ValidationError::new(format!(
            "'{domain}' is not a valid sign-up email domain"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn environment() -> TargetEnvironment {
        TargetEnvironment {
            account: "123456789012".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    #[test]
    fn normalize_rejects_empty_stack_name() {
        let request = DeploymentRequest::new(" ");
        let error = normalize_deployment(request, environment(), Vec::new())
            .expect_err("request should fail");
        assert_eq!(error.message(), "stack_name cannot be empty");
    }

    #[test]
    fn normalize_rejects_non_numeric_account() {
        let request = DeploymentRequest::new("edge");
        let bad_environment = TargetEnvironment {
            account: "12345678901x".to_string(),
            region: "us-east-1".to_string(),
        };
        let error = normalize_deployment(request, bad_environment, Vec::new())
            .expect_err("request should fail");
        assert_eq!(
            error.message(),
            "account '12345678901x' must be a 12-digit account id"
        );
    }

    #[test]
    fn normalize_rejects_malformed_region() {
        let request = DeploymentRequest::new("edge");
        let bad_environment = TargetEnvironment {
            account: "123456789012".to_string(),
            region: "US_EAST_1".to_string(),
        };
        let error = normalize_deployment(request, bad_environment, Vec::new())
            .expect_err("request should fail");
        assert_eq!(
            error.message(),
            "region 'US_EAST_1' is not a valid region name"
        );
    }

    #[test]
    fn normalize_rejects_malformed_ipv4_range() {
        let mut request = DeploymentRequest::new("edge");
        request.allowed_ip_v4_address_ranges = vec!["10.0.0.256/32".to_string()];
        let error = normalize_deployment(request, environment(), Vec::new())
            .expect_err("request should fail");
        assert_eq!(
            error.message(),
            "'10.0.0.256/32' is not a valid IPv4 CIDR range"
        );
    }

    #[test]
    fn normalize_rejects_ipv4_range_without_prefix() {
        let mut request = DeploymentRequest::new("edge");
        request.allowed_ip_v4_address_ranges = vec!["10.0.0.1".to_string()];
        let error = normalize_deployment(request, environment(), Vec::new())
            .expect_err("request should fail");
        assert_eq!(error.message(), "'10.0.0.1' is not a valid IPv4 CIDR range");
    }

    #[test]
    fn normalize_accepts_valid_allow_list_ranges() {
        let mut request = DeploymentRequest::new("edge");
        request.allowed_ip_v4_address_ranges =
            vec!["72.80.157.72/32".to_string(), "10.0.0.0/8".to_string()];
        request.allowed_ip_v6_address_ranges = vec!["2001:db8::/32".to_string()];

        let description = normalize_deployment(request, environment(), Vec::new())
            .expect("request should pass");
        assert_eq!(description.allowed_ip_v4_address_ranges.len(), 2);
        assert_eq!(description.allowed_ip_v6_address_ranges.len(), 1);
    }

    #[test]
    fn normalize_skips_schedule_checks_when_scheduling_disabled() {
        let mut request = DeploymentRequest::new("edge");
        request.schedule_scale_up = "not a cron".to_string();

        normalize_deployment(request, environment(), Vec::new()).expect("request should pass");
    }

    #[test]
    fn normalize_rejects_short_cron_when_scheduling_enabled() {
        let mut request = DeploymentRequest::new("edge");
        request.schedule_auto_scaling = true;
        request.schedule_scale_up = "0 9 * *".to_string();

        let error = normalize_deployment(request, environment(), Vec::new())
            .expect_err("request should fail");
        assert_eq!(
            error.message(),
            "schedule_scale_up '0 9 * *' must be a 5-field cron expression"
        );
    }

    #[test]
    fn normalize_rejects_email_domain_with_at_sign() {
        let mut request = DeploymentRequest::new("edge");
        request.allowed_sign_up_email_domains = vec!["user@example.com".to_string()];

        let error = normalize_deployment(request, environment(), Vec::new())
            .expect_err("request should fail");
        assert_eq!(
            error.message(),
            "'user@example.com' is not a valid sign-up email domain"
        );
    }

    #[test]
    fn normalize_sorts_and_deduplicates_suppressions() {
        let request = DeploymentRequest::new("edge");
        let suppressions = vec![
            RuleSuppression {
                id: "AwsSolutions-IAM5".to_string(),
                reason: "wildcard scopes".to_string(),
            },
            RuleSuppression {
                id: "AwsSolutions-IAM4".to_string(),
                reason: "managed policies".to_string(),
            },
            RuleSuppression {
                id: "AwsSolutions-IAM5".to_string(),
                reason: "duplicate entry".to_string(),
            },
        ];

        let description = normalize_deployment(request, environment(), suppressions)
            .expect("request should pass");
        let ids: Vec<&str> = description
            .suppressions
            .iter()
            .map(|suppression| suppression.id.as_str())
            .collect();
        assert_eq!(ids, vec!["AwsSolutions-IAM4", "AwsSolutions-IAM5"]);
    }

    #[test]
    fn normalize_rejects_suppression_without_reason() {
        let request = DeploymentRequest::new("edge");
        let suppressions = vec![RuleSuppression {
            id: "AwsSolutions-L1".to_string(),
            reason: "  ".to_string(),
        }];

        let error = normalize_deployment(request, environment(), suppressions)
            .expect_err("request should fail");
        assert_eq!(
            error.message(),
            "suppression 'AwsSolutions-L1' must record a reason"
        );
    }

    #[test]
    fn minimal_json_request_applies_defaults() {
        let request: DeploymentRequest =
            serde_json::from_str(r#"{"stack_name": "edge"}"#).expect("request should parse");

        assert!(request.auto_scale_down);
        assert!(!request.schedule_auto_scaling);
        assert_eq!(request.timezone, "UTC");
        assert_eq!(request.schedule_scale_up, "0 9 * * 1-5");
        assert_eq!(request.schedule_scale_down, "0 18 * * *");
        assert!(!request.cheap_vpc);
        assert!(!request.use_spot);
    }

    #[test]
    fn fingerprint_is_deterministic_and_parameter_sensitive() {
        let description = normalize_deployment(
            DeploymentRequest::new("edge"),
            environment(),
            baseline_suppressions(),
        )
        .expect("request should pass");

        let mut changed_request = DeploymentRequest::new("edge");
        changed_request.use_spot = true;
        let changed = normalize_deployment(changed_request, environment(), baseline_suppressions())
            .expect("request should pass");

        assert_eq!(
            deployment_fingerprint(&description),
            deployment_fingerprint(&description)
        );
        assert_ne!(
            deployment_fingerprint(&description),
            deployment_fingerprint(&changed)
        );
    }

    #[test]
    fn synthesis_record_carries_fingerprint_of_description() {
        let description = normalize_deployment(
            DeploymentRequest::new("edge"),
            environment(),
            baseline_suppressions(),
        )
        .expect("request should pass");
        let fingerprint = deployment_fingerprint(&description);

        let record = SynthesisRecord::new(description, "2026-08-06T00:00:00Z".to_string());
        assert_eq!(record.schema_version, DEPLOYMENT_SCHEMA_VERSION);
        assert_eq!(record.parameter_fingerprint, fingerprint);
        assert_eq!(record.synthesized_at, "2026-08-06T00:00:00Z");
    }

    #[test]
    fn baseline_suppressions_cover_the_standing_rule_set() {
        let ids: Vec<String> = baseline_suppressions()
            .into_iter()
            .map(|suppression| suppression.id)
            .collect();
        assert_eq!(
            ids,
            vec![
                "AwsSolutions-L1",
                "AwsSolutions-IAM4",
                "AwsSolutions-IAM5",
                "CdkNagValidationFailure",
            ]
        );
    }
}
