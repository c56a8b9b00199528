//! Core types for the Azure Resource Manager connector.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

// ─── Error types ─────────────────────────────────────────────────────

/// Fault kinds surfaced by every connector operation.
///
/// The HTTP boundary pattern-matches on the variant to pick a status, so each
/// variant corresponds to one row of the fault table.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ArmError {
    /// ARM answered with a non-success status; `body` is forwarded verbatim.
    #[error("upstream returned HTTP {status}: {body}")]
    Upstream { status: u16, body: String },
    /// The identity provider refused the token exchange.
    #[error("authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },
    /// Caller input (or an upstream payload it referenced) was malformed.
    #[error("{0}")]
    Validation(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("failed to decode upstream response: {0}")]
    Parse(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl ArmError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        Self::Upstream {
            status,
            body: body.to_string(),
        }
    }

    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

pub type ArmResult<T> = Result<T, ArmError>;

// ─── OAuth / Auth ────────────────────────────────────────────────────

/// Service-principal credentials. The secret never appears in `Debug` output.
pub struct ArmCredentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub subscription_id: String,
}

impl ArmCredentials {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        subscription_id: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: SecretString::new(client_secret.into()),
            subscription_id: subscription_id.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.tenant_id.is_empty()
            && !self.client_id.is_empty()
            && !self.client_secret.expose_secret().is_empty()
    }
}

impl fmt::Debug for ArmCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArmCredentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("subscription_id", &self.subscription_id)
            .finish()
    }
}

/// Bearer token for one upstream call.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ArmToken {
    pub access_token: String,
    pub token_type: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resource: Option<String>,
}

/// Raw token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub resource: Option<String>,
}

/// Error body returned by the identity provider.
#[derive(Debug, Deserialize)]
pub struct TokenErrorResponse {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

// ─── Azure Resource Manager common ──────────────────────────────────

/// Generic ARM list wrapper (`value` array with optional `nextLink`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ArmList<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    #[serde(default)]
    pub next_link: Option<String>,
}

/// Localized name pair used across Monitor payloads.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalizableString {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub localized_value: Option<String>,
}

/// Raw upstream reply that is passed back to the caller untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

// ─── Resource Groups ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub managed_by: Option<String>,
    #[serde(default)]
    pub properties: Option<ResourceGroupProperties>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default)]
    pub provisioning_state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateResourceGroupRequest {
    pub location: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

// ─── Deployments ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DeploymentMode {
    #[default]
    Incremental,
    Complete,
}

/// Template deployment as returned by ARM.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentExtended {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub deployment_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub properties: Option<DeploymentPropertiesExtended>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPropertiesExtended {
    #[serde(default)]
    pub provisioning_state: Option<String>,
    #[serde(default)]
    pub correlation_id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub mode: Option<DeploymentMode>,
    #[serde(default)]
    pub outputs: Option<Value>,
    /// Everything else ARM reports (providers, dependencies, template links).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body of a deployment PUT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub properties: DeploymentProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentProperties {
    pub mode: DeploymentMode,
    pub template: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

// ─── Generic resources ──────────────────────────────────────────────

/// Generic resource exactly as ARM puts it on the wire. `properties` may be an
/// object or, from older endpoints, a JSON-encoded string.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenericResource {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub resource_type: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub properties: Option<Value>,
}

/// Resource returned to callers, with `properties` decoded into structured JSON.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedResource {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub location: Option<String>,
    pub tags: HashMap<String, String>,
    pub properties: Option<Value>,
}

impl TryFrom<GenericResource> for ExtendedResource {
    type Error = ArmError;

    fn try_from(resource: GenericResource) -> ArmResult<Self> {
        Ok(Self {
            id: resource.id,
            name: resource.name,
            resource_type: resource.resource_type,
            location: resource.location,
            tags: resource.tags,
            properties: decode_property_bag(resource.properties)?,
        })
    }
}

/// Caller-supplied payload for a resource PUT.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ResourceBody {
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub properties: Option<Value>,
}

/// Wire form of a resource PUT.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenericResourceWrite {
    pub location: String,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub tags: HashMap<String, String>,
    pub properties: Value,
}

impl ResourceBody {
    /// Validate the payload and convert it to its wire form. Missing
    /// properties become `{}`.
    pub fn into_write(self) -> ArmResult<GenericResourceWrite> {
        let location = self
            .location
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| ArmError::validation("You need to provide a location for the resource"))?;
        let properties = decode_property_bag(self.properties)?
            .unwrap_or_else(|| Value::Object(Map::new()));
        Ok(GenericResourceWrite {
            location,
            tags: self.tags,
            properties,
        })
    }
}

/// Normalise a property bag: JSON-encoded strings are parsed, an empty string
/// or `null` means "no properties", anything else is kept as-is.
pub fn decode_property_bag(raw: Option<Value>) -> ArmResult<Option<Value>> {
    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) if text.is_empty() => Ok(None),
        Some(Value::String(text)) => serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| ArmError::validation(format!("The object is not valid JSON: {e}"))),
        Some(other) => Ok(Some(other)),
    }
}

// ─── Providers ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub registration_state: Option<String>,
    #[serde(default)]
    pub resource_types: Vec<ProviderResourceType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResourceType {
    #[serde(default)]
    pub resource_type: String,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub api_versions: Vec<String>,
}

// ─── Monitor / Activity log ─────────────────────────────────────────

/// One activity-log event. The fields the connector reasons about are typed;
/// everything else is carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    pub event_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_data_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<LocalizableString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<LocalizableString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ─── Monitor / Metrics ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<LocalizableString>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub primary_aggregation_type: Option<String>,
    #[serde(default)]
    pub metric_availabilities: Vec<MetricAvailability>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetricAvailability {
    #[serde(default)]
    pub time_grain: Option<String>,
    #[serde(default)]
    pub retention: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetricResponse {
    #[serde(default)]
    pub cost: Option<u32>,
    #[serde(default)]
    pub timespan: Option<String>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub value: Vec<Metric>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<LocalizableString>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub timeseries: Vec<TimeSeries>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TimeSeries {
    #[serde(default)]
    pub data: Vec<MetricValue>,
}

/// One metric sample, or the aggregate of several.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricValue {
    pub time_stamp: DateTime<Utc>,
    #[serde(default)]
    pub average: Option<f64>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub count: Option<f64>,
}

// ─── Configuration ──────────────────────────────────────────────────

/// Upstream endpoints, API versions and the per-call deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmConfig {
    pub arm_base: String,
    pub login_base: String,
    pub request_timeout_secs: u64,
    pub api_version_resources: String,
    pub api_version_events: String,
    pub api_version_metrics: String,
}

impl ArmConfig {
    pub fn new() -> Self {
        Self {
            arm_base: ARM_BASE.into(),
            login_base: LOGIN_BASE.into(),
            request_timeout_secs: 30,
            api_version_resources: api_versions::RESOURCES.into(),
            api_version_events: api_versions::EVENTS.into(),
            api_version_metrics: api_versions::METRICS.into(),
        }
    }
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self::new()
    }
}

pub mod api_versions {
    pub const RESOURCES: &str = "2021-04-01";
    pub const EVENTS: &str = "2015-04-01";
    pub const METRICS: &str = "2018-01-01";
}

/// Azure management base URL.
pub const ARM_BASE: &str = "https://management.azure.com";

/// Azure AD login base URL.
pub const LOGIN_BASE: &str = "https://login.microsoftonline.com";

// ─── Tests ──────────────────────────────────────────────────────────
