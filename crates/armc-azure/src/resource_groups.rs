//! Resource groups – list, get, create or update, delete.

use log::debug;

use crate::client::{encode_segment, ArmClient};
use crate::types::{ArmResult, CreateResourceGroupRequest, ResourceGroup};

fn api_query(client: &ArmClient) -> [(&'static str, String); 1] {
    [("api-version", client.config().api_version_resources.clone())]
}

/// List all resource groups in the subscription.
pub async fn list_resource_groups(client: &ArmClient) -> ArmResult<Vec<ResourceGroup>> {
    let url = client.subscription_url("/resourcegroups")?;
    debug!("list_resource_groups → {}", url);
    client.get_all_pages(&url, &api_query(client)).await
}

/// Get a single resource group by name.
pub async fn get_resource_group(client: &ArmClient, name: &str) -> ArmResult<ResourceGroup> {
    let url = client.subscription_url(&format!("/resourcegroups/{}", encode_segment(name)))?;
    debug!("get_resource_group({}) → {}", name, url);
    client.get_json_with_query(&url, &api_query(client)).await
}

/// Create or update a resource group.
pub async fn create_resource_group(
    client: &ArmClient,
    name: &str,
    request: &CreateResourceGroupRequest,
) -> ArmResult<ResourceGroup> {
    let url = client.subscription_url(&format!("/resourcegroups/{}", encode_segment(name)))?;
    debug!("create_resource_group({}) → {}", name, url);
    client.put_json(&url, &api_query(client), request).await
}

/// Delete a resource group (and all its resources). Returns the upstream
/// status, usually 202 while ARM deletes asynchronously.
pub async fn delete_resource_group(client: &ArmClient, name: &str) -> ArmResult<u16> {
    let url = client.subscription_url(&format!("/resourcegroups/{}", encode_segment(name)))?;
    debug!("delete_resource_group({}) → {}", name, url);
    client.delete(&url, &api_query(client)).await
}

// ─── Tests ──────────────────────────────────────────────────────────
