//! Template deployments – list, get, create.

use log::debug;
use uuid::Uuid;

use crate::client::{encode_segment, ArmClient};
use crate::types::{
    ArmError, ArmResult, DeploymentExtended, DeploymentMode, DeploymentProperties,
    DeploymentRequest,
};

/// Prefix of generated deployment names.
pub const GENERATED_NAME_PREFIX: &str = "AzureResourceConnector-";

/// `AzureResourceConnector-<32 hex>`; unique in practice, not guaranteed.
pub fn generate_deployment_name() -> String {
    format!("{}{}", GENERATED_NAME_PREFIX, Uuid::new_v4().simple())
}

fn deployments_path(name: Option<&str>) -> String {
    match name {
        Some(n) => format!(
            "/providers/Microsoft.Resources/deployments/{}",
            encode_segment(n)
        ),
        None => "/providers/Microsoft.Resources/deployments".to_string(),
    }
}

fn api_query(client: &ArmClient) -> [(&'static str, String); 1] {
    [("api-version", client.config().api_version_resources.clone())]
}

/// Build the PUT body from caller-supplied JSON text.
pub fn build_request(template: Option<&str>, parameters: Option<&str>) -> ArmResult<DeploymentRequest> {
    let template = template
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ArmError::validation("A deployment template is required"))?;
    let template = serde_json::from_str(template)
        .map_err(|e| ArmError::validation(format!("The template is not valid JSON: {e}")))?;
    let parameters = parameters
        .filter(|p| !p.trim().is_empty())
        .map(|p| {
            serde_json::from_str(p).map_err(|e| {
                ArmError::validation(format!("The parameters are not valid JSON: {e}"))
            })
        })
        .transpose()?;
    Ok(DeploymentRequest {
        properties: DeploymentProperties {
            mode: DeploymentMode::Incremental,
            template,
            parameters,
        },
    })
}

/// List all deployments in a resource group.
pub async fn list_deployments(
    client: &ArmClient,
    resource_group: &str,
) -> ArmResult<Vec<DeploymentExtended>> {
    let url = client.resource_group_url(resource_group, &deployments_path(None))?;
    debug!("list_deployments({}) → {}", resource_group, url);
    client.get_all_pages(&url, &api_query(client)).await
}

pub async fn get_deployment(
    client: &ArmClient,
    resource_group: &str,
    name: &str,
) -> ArmResult<DeploymentExtended> {
    let url = client.resource_group_url(resource_group, &deployments_path(Some(name)))?;
    debug!("get_deployment({}/{}) → {}", resource_group, name, url);
    client.get_json_with_query(&url, &api_query(client)).await
}

pub async fn create_deployment(
    client: &ArmClient,
    resource_group: &str,
    name: &str,
    request: &DeploymentRequest,
) -> ArmResult<DeploymentExtended> {
    let url = client.resource_group_url(resource_group, &deployments_path(Some(name)))?;
    debug!("create_deployment({}/{}) → {}", resource_group, name, url);
    client.put_json(&url, &api_query(client), request).await
}
