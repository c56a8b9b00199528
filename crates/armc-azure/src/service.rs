//! Central service façade for Azure Resource Manager operations.
//!
//! Holds the shared HTTP client and the service-principal credentials. Every
//! operation obtains a fresh bearer token, so the service itself carries no
//! mutable state and can be shared behind an `Arc` without locking.

use serde_json::Value;

use crate::auth;
use crate::client::ArmClient;
use crate::deployments;
use crate::identifiers::{deployment_from_id, identity_from_id, resource_group_from_id, ResourceIdentity};
use crate::monitor::{self, EventQuery, TimeWindow};
use crate::providers;
use crate::resource_groups;
use crate::resources::{self, ResourceListFilter};
use crate::types::*;

/// The core ARM service combining client + credentials.
#[derive(Debug)]
pub struct ArmService {
    client: ArmClient,
    credentials: ArmCredentials,
}

impl ArmService {
    pub fn new(config: ArmConfig, credentials: ArmCredentials) -> ArmResult<Self> {
        let client = ArmClient::new(config, credentials.subscription_id.clone())?;
        Ok(Self {
            client,
            credentials,
        })
    }

    /// Authenticated client for one call. Tokens are never reused.
    pub async fn client(&self) -> ArmResult<ArmClient> {
        let token = auth::acquire_token(&self.client, &self.credentials).await?;
        Ok(self.client.with_token(token))
    }

    async fn with_api_version(
        &self,
        client: &ArmClient,
        identity: ResourceIdentity,
    ) -> ArmResult<ResourceIdentity> {
        providers::ensure_api_version(client, identity).await
    }

    // ── Resource Groups ──────────────────────────────────────────────

    pub async fn list_resource_groups(&self) -> ArmResult<Vec<ResourceGroup>> {
        resource_groups::list_resource_groups(&self.client().await?).await
    }

    pub async fn get_resource_group(&self, id: &str) -> ArmResult<ResourceGroup> {
        let name = resource_group_from_id(id)?;
        resource_groups::get_resource_group(&self.client().await?, &name).await
    }

    pub async fn create_resource_group(&self, name: &str, location: &str) -> ArmResult<ResourceGroup> {
        if name.trim().is_empty() || location.trim().is_empty() {
            return Err(ArmError::validation(
                "A resource group needs both a name and a location",
            ));
        }
        let request = CreateResourceGroupRequest {
            location: location.to_string(),
            tags: Default::default(),
        };
        resource_groups::create_resource_group(&self.client().await?, name, &request).await
    }

    pub async fn delete_resource_group(&self, id: &str) -> ArmResult<u16> {
        let name = resource_group_from_id(id)?;
        resource_groups::delete_resource_group(&self.client().await?, &name).await
    }

    // ── Deployments ──────────────────────────────────────────────────

    pub async fn list_deployments(&self, resource_group: &str) -> ArmResult<Vec<DeploymentExtended>> {
        if resource_group.trim().is_empty() {
            return Err(ArmError::validation("A resource group name is required"));
        }
        deployments::list_deployments(&self.client().await?, resource_group).await
    }

    pub async fn get_deployment(&self, id: &str) -> ArmResult<DeploymentExtended> {
        let rg = resource_group_from_id(id)?;
        let name = deployment_from_id(id)?;
        deployments::get_deployment(&self.client().await?, &rg, &name).await
    }

    /// Deploy `template` into the group named by `resource_group_id`. A name
    /// is generated when none is given.
    pub async fn create_deployment(
        &self,
        resource_group_id: &str,
        deployment_name: Option<&str>,
        template: Option<&str>,
        parameters: Option<&str>,
    ) -> ArmResult<DeploymentExtended> {
        let rg = resource_group_from_id(resource_group_id)?;
        let request = deployments::build_request(template, parameters)?;
        let name = deployment_name
            .filter(|n| !n.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(deployments::generate_deployment_name);
        deployments::create_deployment(&self.client().await?, &rg, &name, &request).await
    }

    // ── Resources ────────────────────────────────────────────────────

    pub async fn list_resources(&self, filter: &ResourceListFilter) -> ArmResult<Vec<ExtendedResource>> {
        filter.odata()?;
        resources::list_resources(&self.client().await?, filter).await
    }

    pub async fn get_resource(&self, id: &str, api_version: Option<&str>) -> ArmResult<ExtendedResource> {
        let rg = resource_group_from_id(id)?;
        let identity = identity_from_id(id, api_version)?;
        let client = self.client().await?;
        let identity = self.with_api_version(&client, identity).await?;
        resources::get_resource(&client, &rg, &identity).await
    }

    pub async fn create_or_update_resource(
        &self,
        id: &str,
        api_version: Option<&str>,
        body: Option<ResourceBody>,
    ) -> ArmResult<ExtendedResource> {
        let rg = resource_group_from_id(id)?;
        let identity = identity_from_id(id, api_version)?;
        let write = body
            .ok_or_else(|| ArmError::validation("A resource body is required"))?
            .into_write()?;
        let client = self.client().await?;
        let identity = self.with_api_version(&client, identity).await?;
        resources::create_or_update_resource(&client, &rg, &identity, &write).await
    }

    pub async fn delete_resource(&self, id: &str, api_version: Option<&str>) -> ArmResult<u16> {
        let rg = resource_group_from_id(id)?;
        let identity = identity_from_id(id, api_version)?;
        let client = self.client().await?;
        let identity = self.with_api_version(&client, identity).await?;
        resources::delete_resource(&client, &rg, &identity).await
    }

    pub async fn invoke_resource_action(
        &self,
        id: &str,
        action: &str,
        api_version: Option<&str>,
        body: Option<Value>,
    ) -> ArmResult<RawResponse> {
        let identity = identity_from_id(id, api_version)?;
        if action.trim().is_empty() {
            return Err(ArmError::validation("An action name is required"));
        }
        let client = self.client().await?;
        let identity = self.with_api_version(&client, identity).await?;
        let version = identity.api_version.unwrap_or_default();
        resources::invoke_action(&client, id, action, &version, body).await
    }

    // ── Providers ────────────────────────────────────────────────────

    pub async fn list_providers(&self) -> ArmResult<Vec<Provider>> {
        providers::list_providers(&self.client().await?).await
    }

    // ── Monitor ──────────────────────────────────────────────────────

    pub async fn list_events(&self, query: &EventQuery) -> ArmResult<Vec<EventData>> {
        query.odata()?;
        monitor::list_events(&self.client().await?, query).await
    }

    /// Samples of `metric_name` over `window`, at the metric's smallest time
    /// grain.
    pub async fn metric_values(
        &self,
        resource_id: &str,
        metric_name: &str,
        window: &TimeWindow,
    ) -> ArmResult<Vec<MetricValue>> {
        identity_from_id(resource_id, None)?;
        if metric_name.trim().is_empty() {
            return Err(ArmError::validation("A metric name is required"));
        }
        let client = self.client().await?;
        let definitions = monitor::list_metric_definitions(&client, resource_id).await?;
        let grain = monitor::select_time_grain(&definitions, metric_name, window)?;
        monitor::query_metrics(&client, resource_id, metric_name, window, &grain).await
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // Login base points at a closed port: any test that reaches the network
    // fails with a Network error instead of the validation error asserted.
    fn service() -> ArmService {
        let mut config = ArmConfig::new();
        config.login_base = "http://127.0.0.1:1".into();
        config.arm_base = "http://127.0.0.1:1".into();
        ArmService::new(config, ArmCredentials::new("t", "c", "s", "sub1")).unwrap()
    }

    #[test]
    fn debug_output_hides_secret() {
        let printed = format!("{:?}", service());
        assert!(printed.contains("[REDACTED]"));
        assert!(!printed.contains("\"s\""));
    }

    #[tokio::test]
    async fn malformed_ids_fail_before_any_call() {
        let svc = service();
        assert!(svc.get_resource_group("/subscriptions/s").await.unwrap_err().is_validation());
        assert!(svc.get_deployment("/subscriptions/s/resourceGroups/rg").await.unwrap_err().is_validation());
        assert!(svc.get_resource("/subscriptions/s/resourceGroups/rg", None).await.unwrap_err().is_validation());
        assert!(svc.delete_resource("/x", Some("2020-01-01")).await.unwrap_err().is_validation());
    }

    #[tokio::test]
    async fn resource_write_needs_body_with_location() {
        let svc = service();
        let id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Web/sites/app";
        assert!(svc.create_or_update_resource(id, None, None).await.unwrap_err().is_validation());
        let err = svc
            .create_or_update_resource(id, None, Some(ResourceBody::default()))
            .await
            .unwrap_err();
        assert_eq!(err, ArmError::validation("You need to provide a location for the resource"));
    }

    #[tokio::test]
    async fn resource_group_create_needs_name_and_location() {
        let svc = service();
        let expected = ArmError::validation("A resource group needs both a name and a location");
        assert_eq!(svc.create_resource_group("rg1", " ").await.unwrap_err(), expected);
        assert_eq!(svc.create_resource_group("", "westeurope").await.unwrap_err(), expected);
    }

    #[tokio::test]
    async fn resource_action_needs_a_name() {
        let id = "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Web/sites/app";
        let err = service()
            .invoke_resource_action(id, " ", Some("2022-03-01"), None)
            .await
            .unwrap_err();
        assert_eq!(err, ArmError::validation("An action name is required"));
    }

    #[tokio::test]
    async fn deployment_requires_template() {
        let svc = service();
        let err = svc
            .create_deployment("/subscriptions/s/resourceGroups/rg", None, None, None)
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn unreachable_identity_provider_is_network_fault() {
        let err = service().list_providers().await.unwrap_err();
        assert!(matches!(err, ArmError::Network(_)));
    }
}
