//! Generic resources – list, get, create or update, delete, invoke action.
//!
//! Resources are addressed as
//! `/subscriptions/{sub}/resourcegroups/{rg}/providers/{namespace}/{type}/{name}`
//! and always carry an explicit `api-version`; resolve it with
//! [`crate::providers::ensure_api_version`] first when the caller has none.

use log::debug;
use serde_json::{Map, Value};

use crate::client::{encode_path, encode_segment, ArmClient};
use crate::filter::ODataFilter;
use crate::identifiers::ResourceIdentity;
use crate::types::{
    ArmError, ArmResult, ExtendedResource, GenericResource, GenericResourceWrite, RawResponse,
};

/// Optional narrowing of a resource listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceListFilter {
    pub resource_group: Option<String>,
    pub resource_type: Option<String>,
    pub tag_name: Option<String>,
    pub tag_value: Option<String>,
}

impl ResourceListFilter {
    /// OData `$filter` for the type and tag constraints.
    pub fn odata(&self) -> ArmResult<ODataFilter> {
        if self.tag_value.is_some() && self.tag_name.is_none() {
            return Err(ArmError::validation(
                "A tag value can only be filtered together with a tag name",
            ));
        }
        let mut filter = ODataFilter::new();
        if let Some(t) = &self.resource_type {
            filter = filter.eq("resourceType", t.as_str());
        }
        if let Some(name) = &self.tag_name {
            filter = filter.eq("tagName", name.as_str());
        }
        if let Some(value) = &self.tag_value {
            filter = filter.eq("tagValue", value.as_str());
        }
        Ok(filter)
    }
}

fn api_version(identity: &ResourceIdentity) -> ArmResult<&str> {
    identity
        .api_version
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ArmError::validation("An api version is required for this resource"))
}

fn resource_url(client: &ArmClient, rg: &str, identity: &ResourceIdentity) -> ArmResult<String> {
    client.resource_group_url(rg, &identity.provider_path())
}

/// List resources in the subscription, or in one resource group.
pub async fn list_resources(
    client: &ArmClient,
    filter: &ResourceListFilter,
) -> ArmResult<Vec<ExtendedResource>> {
    let odata = filter.odata()?;
    let url = match &filter.resource_group {
        Some(rg) => client.resource_group_url(rg, "/resources")?,
        None => client.subscription_url("/resources")?,
    };
    let mut query = vec![("api-version", client.config().api_version_resources.clone())];
    if let Some(f) = odata.render() {
        query.push(("$filter", f));
    }
    debug!("list_resources({:?}) → {}", filter, url);
    let raw: Vec<GenericResource> = client.get_all_pages(&url, &query).await?;
    raw.into_iter().map(ExtendedResource::try_from).collect()
}

pub async fn get_resource(
    client: &ArmClient,
    rg: &str,
    identity: &ResourceIdentity,
) -> ArmResult<ExtendedResource> {
    let version = api_version(identity)?;
    let url = resource_url(client, rg, identity)?;
    debug!("get_resource({}) → {}", identity.name, url);
    let raw: GenericResource = client
        .get_json_with_query(&url, &[("api-version", version)])
        .await?;
    ExtendedResource::try_from(raw)
}

/// PUT a resource. Build `write` with [`crate::types::ResourceBody::into_write`].
pub async fn create_or_update_resource(
    client: &ArmClient,
    rg: &str,
    identity: &ResourceIdentity,
    write: &GenericResourceWrite,
) -> ArmResult<ExtendedResource> {
    let version = api_version(identity)?;
    let url = resource_url(client, rg, identity)?;
    debug!("create_or_update_resource({}) → {}", identity.name, url);
    let raw: GenericResource = client
        .put_json(&url, &[("api-version", version)], write)
        .await?;
    ExtendedResource::try_from(raw)
}

pub async fn delete_resource(
    client: &ArmClient,
    rg: &str,
    identity: &ResourceIdentity,
) -> ArmResult<u16> {
    let version = api_version(identity)?;
    let url = resource_url(client, rg, identity)?;
    debug!("delete_resource({}) → {}", identity.name, url);
    client.delete(&url, &[("api-version", version)]).await
}

/// POST `{arm_base}{resource_id}/{action}`. The upstream reply, success or
/// not, comes back untouched.
pub async fn invoke_action(
    client: &ArmClient,
    resource_id: &str,
    action: &str,
    api_version: &str,
    body: Option<Value>,
) -> ArmResult<RawResponse> {
    let url = client.arm_url(&format!(
        "{}/{}",
        encode_path(resource_id.trim_end_matches('/')),
        encode_segment(action)
    ));
    let body = body.unwrap_or_else(|| Value::Object(Map::new()));
    debug!("invoke_action({}) → {}", action, url);
    client
        .post_raw(&url, &[("api-version", api_version)], &body)
        .await
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArmConfig;

    fn client() -> ArmClient {
        ArmClient::new(ArmConfig::new(), "sub1").unwrap()
    }

    fn identity() -> ResourceIdentity {
        ResourceIdentity {
            namespace: "Microsoft.Web".into(),
            resource_type: "sites".into(),
            name: "app".into(),
            api_version: None,
        }
    }

    #[test]
    fn filter_combines_type_and_tags() {
        let f = ResourceListFilter {
            resource_type: Some("Microsoft.Web/sites".into()),
            tag_name: Some("env".into()),
            tag_value: Some("prod".into()),
            ..Default::default()
        };
        assert_eq!(
            f.odata().unwrap().render().unwrap(),
            "resourceType eq 'Microsoft.Web/sites' and tagName eq 'env' and tagValue eq 'prod'"
        );
    }

    #[test]
    fn empty_filter_renders_nothing() {
        assert!(ResourceListFilter::default().odata().unwrap().render().is_none());
    }

    #[test]
    fn tag_value_requires_tag_name() {
        let f = ResourceListFilter {
            tag_value: Some("prod".into()),
            ..Default::default()
        };
        assert!(f.odata().unwrap_err().is_validation());
    }

    #[test]
    fn resource_url_uses_configured_subscription() {
        let url = resource_url(&client(), "rg1", &identity()).unwrap();
        assert_eq!(
            url,
            "https://management.azure.com/subscriptions/sub1/resourcegroups/rg1/providers/Microsoft.Web/sites/app"
        );
    }

    #[test]
    fn missing_api_version_is_validation_error() {
        assert!(api_version(&identity()).unwrap_err().is_validation());
        assert!(api_version(&identity().with_api_version("")).is_err());
        let id = identity().with_api_version("2022-03-01");
        assert_eq!(api_version(&id).unwrap(), "2022-03-01");
    }
}
