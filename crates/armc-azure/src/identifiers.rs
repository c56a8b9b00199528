//! Parsing of slash-delimited ARM resource identifiers.
//!
//! `/subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}`
//! splits on `/` into (0-based) segments:
//!
//! ```text
//! ["", "subscriptions", sub, "resourceGroups", rg, "providers", namespace, type, name]
//! ```
//!
//! Every extractor checks its own preconditions and rejects malformed input
//! with [`ArmError::Validation`]; nothing is silently truncated.

use serde::{Deserialize, Serialize};

use crate::types::{ArmError, ArmResult};

/// `{namespace, type, name}` of a top-level resource, plus the API version to
/// address it with, when known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceIdentity {
    pub namespace: String,
    pub resource_type: String,
    pub name: String,
    pub api_version: Option<String>,
}

impl ResourceIdentity {
    /// `providers/{namespace}/{type}/{name}` path suffix.
    pub fn provider_path(&self) -> String {
        format!(
            "/providers/{}/{}/{}",
            crate::client::encode_segment(&self.namespace),
            crate::client::encode_segment(&self.resource_type),
            crate::client::encode_segment(&self.name)
        )
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }
}

fn segments(id: &str) -> Vec<&str> {
    id.split('/').collect()
}

/// Resource-group name from a resource-group (or deeper) identifier.
pub fn resource_group_from_id(id: &str) -> ArmResult<String> {
    let segments = segments(id);
    match segments.as_slice() {
        [_, _, _, marker, rg, ..]
            if marker.eq_ignore_ascii_case("resourceGroups") && !rg.is_empty() =>
        {
            Ok((*rg).to_string())
        }
        _ => Err(ArmError::validation(
            "There is not a valid resource group present in this Id",
        )),
    }
}

/// Deployment name from a deployment identifier
/// (`/subscriptions/{sub}/resourceGroups/{rg}/deployments/{name}`).
pub fn deployment_from_id(id: &str) -> ArmResult<String> {
    let segments = segments(id);
    match segments.as_slice() {
        [_, _, _, _, _, marker, name, ..]
            if marker.eq_ignore_ascii_case("deployments") && !name.is_empty() =>
        {
            Ok((*name).to_string())
        }
        _ => Err(ArmError::validation(
            "There is not a valid deployment present in this Id",
        )),
    }
}

/// Resource identity from a full resource identifier.
pub fn identity_from_id(id: &str, api_version: Option<&str>) -> ArmResult<ResourceIdentity> {
    let segments = segments(id);
    if segments.len() < 9 {
        return Err(ArmError::validation(
            "This is not a valid resource Id, there are missing segments",
        ));
    }
    Ok(ResourceIdentity {
        namespace: segments[6].to_string(),
        resource_type: segments[7].to_string(),
        name: segments[8].to_string(),
        api_version: api_version.map(str::to_string),
    })
}
