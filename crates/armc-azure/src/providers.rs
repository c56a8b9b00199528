//! Resource providers and API-version resolution.

use log::debug;

use crate::client::ArmClient;
use crate::identifiers::ResourceIdentity;
use crate::types::{ArmError, ArmResult, Provider};

/// List all resource providers visible to the subscription.
pub async fn list_providers(client: &ArmClient) -> ArmResult<Vec<Provider>> {
    let url = client.subscription_url("/providers")?;
    debug!("list_providers → {}", url);
    let query = [("api-version", client.config().api_version_resources.as_str())];
    client.get_all_pages(&url, &query).await
}

/// Newest API version that `providers` advertise for the identity's
/// namespace and type. Only namespace and type are consulted; any api version
/// already on the identity is ignored.
pub fn resolve_api_version(providers: &[Provider], identity: &ResourceIdentity) -> ArmResult<String> {
    let provider = providers
        .iter()
        .find(|p| p.namespace.eq_ignore_ascii_case(&identity.namespace))
        .ok_or_else(|| ArmError::validation("This is not a valid resource provider namespace"))?;

    let resource_type = provider
        .resource_types
        .iter()
        .find(|t| t.resource_type.eq_ignore_ascii_case(&identity.resource_type))
        .ok_or_else(|| ArmError::validation("This is not a valid resource type"))?;

    resource_type
        .api_versions
        .iter()
        .max()
        .cloned()
        .ok_or_else(|| ArmError::validation("The resource type does not list any API versions"))
}

/// Fill in the identity's api version from the provider list when the caller
/// did not give one.
pub async fn ensure_api_version(
    client: &ArmClient,
    identity: ResourceIdentity,
) -> ArmResult<ResourceIdentity> {
    if identity.api_version.as_deref().is_some_and(|v| !v.is_empty()) {
        return Ok(identity);
    }
    let providers = list_providers(client).await?;
    let version = resolve_api_version(&providers, &identity)?;
    debug!(
        "resolved api-version {} for {}/{}",
        version, identity.namespace, identity.resource_type
    );
    Ok(identity.with_api_version(version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderResourceType;

    fn providers() -> Vec<Provider> {
        vec![
            Provider {
                namespace: "Microsoft.Storage".into(),
                resource_types: vec![ProviderResourceType {
                    resource_type: "storageAccounts".into(),
                    locations: vec![],
                    api_versions: vec!["2019-06-01".into()],
                }],
                ..Default::default()
            },
            Provider {
                namespace: "Microsoft.Web".into(),
                resource_types: vec![
                    ProviderResourceType {
                        resource_type: "serverFarms".into(),
                        locations: vec![],
                        api_versions: vec!["2018-02-01".into()],
                    },
                    ProviderResourceType {
                        resource_type: "sites".into(),
                        locations: vec!["West Europe".into()],
                        api_versions: vec![
                            "2021-02-01".into(),
                            "2022-03-01".into(),
                            "2016-08-01".into(),
                        ],
                    },
                ],
                ..Default::default()
            },
        ]
    }

    fn identity(ns: &str, ty: &str) -> ResourceIdentity {
        ResourceIdentity {
            namespace: ns.into(),
            resource_type: ty.into(),
            name: "x".into(),
            api_version: None,
        }
    }

    #[test]
    fn picks_greatest_version() {
        let v = resolve_api_version(&providers(), &identity("Microsoft.Web", "sites")).unwrap();
        assert_eq!(v, "2022-03-01");
    }

    #[test]
    fn namespace_and_type_match_case_insensitively() {
        let v = resolve_api_version(&providers(), &identity("microsoft.web", "SITES")).unwrap();
        assert_eq!(v, "2022-03-01");
    }

    #[test]
    fn unknown_namespace_fails() {
        let err = resolve_api_version(&providers(), &identity("Microsoft.Nope", "sites")).unwrap_err();
        assert_eq!(err, ArmError::validation("This is not a valid resource provider namespace"));
    }

    #[test]
    fn unknown_type_fails() {
        let err = resolve_api_version(&providers(), &identity("Microsoft.Web", "nope")).unwrap_err();
        assert_eq!(err, ArmError::validation("This is not a valid resource type"));
    }

    #[test]
    fn existing_api_version_is_ignored_for_lookup() {
        let id = identity("Microsoft.Storage", "storageAccounts").with_api_version("1999-01-01");
        assert_eq!(resolve_api_version(&providers(), &id).unwrap(), "2019-06-01");
    }

    #[test]
    fn provider_deserialization() {
        let json = r#"{"id":"/subscriptions/s/providers/Microsoft.Web","namespace":"Microsoft.Web","registrationState":"Registered","resourceTypes":[{"resourceType":"sites","locations":["West Europe"],"apiVersions":["2022-03-01"]}]}"#;
        let p: Provider = serde_json::from_str(json).unwrap();
        assert_eq!(p.resource_types[0].api_versions, vec!["2022-03-01".to_string()]);
        assert_eq!(p.registration_state.as_deref(), Some("Registered"));
    }
}
