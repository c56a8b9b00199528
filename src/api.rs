use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;

use armc_azure::monitor::{EventQuery, TimeWindow};
use armc_azure::resources::ResourceListFilter;
use armc_azure::types::{
    DeploymentExtended, EventData, ExtendedResource, MetricValue, Provider, ResourceBody,
    ResourceGroup,
};
use armc_azure::{ArmError, ArmResult, ArmService};
use armc_triggers::events::{poll_events, EventPoll};
use armc_triggers::metrics::{poll_metric_threshold, ThresholdPoll, DEFAULT_THRESHOLD_MINUTES};

use crate::envelope;
use crate::fault::Fault;

/// Look-back for the list endpoints when `minutes` is omitted.
pub const DEFAULT_LIST_MINUTES: f64 = 60.0;

type ApiResult<T> = Result<T, Fault>;

#[derive(Debug, Clone)]
pub struct ApiService {
    pub arm: Arc<ArmService>,
}

impl ApiService {
    pub fn new(arm: Arc<ArmService>) -> Self {
        Self { arm }
    }

    /// Serve until `shutdown` resolves.
    pub async fn start_server<F>(
        self: Arc<Self>,
        addr: SocketAddr,
        shutdown: F,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let app = self.create_router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "ARM connector listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;
        Ok(())
    }

    pub fn create_router(self: Arc<Self>) -> Router {
        Router::new()
            .route("/health", get(health_check))
            // Resource groups
            .route("/ResourceGroups", get(list_resource_groups))
            .route(
                "/ResourceGroupById",
                get(get_resource_group).delete(delete_resource_group),
            )
            .route("/ResourceGroupByName", put(create_resource_group))
            // Deployments
            .route("/Deployments", get(list_deployments))
            .route("/DeploymentById", get(get_deployment).put(create_deployment))
            // Resources
            .route("/Resources", get(list_resources))
            .route(
                "/ResourceById",
                get(get_resource)
                    .put(put_resource)
                    .post(invoke_resource_action)
                    .delete(delete_resource),
            )
            .route("/ResourceProviders", get(list_providers))
            // Monitor
            .route("/EventsById", get(list_events))
            .route("/EventOccurs", get(event_occurs))
            .route("/MetricById", get(list_metric_values))
            .route("/MetricThreshold", get(metric_threshold))
            .with_state(self)
    }
}

// ─── Query helpers ──────────────────────────────────────────────────

/// Empty query values count as absent.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn owned(value: &Option<String>) -> Option<String> {
    present(value).map(str::to_string)
}

fn required<'a>(value: &'a Option<String>, name: &str) -> ArmResult<&'a str> {
    present(value).ok_or_else(|| ArmError::validation(format!("The {name} parameter is required")))
}

fn number(value: &Option<String>, name: &str) -> ArmResult<Option<f64>> {
    present(value)
        .map(|raw| {
            raw.parse::<f64>()
                .map_err(|_| ArmError::validation(format!("The {name} parameter must be a number")))
        })
        .transpose()
}

/// `endTimestring` as an instant; missing or unparsable falls back to `now`.
fn end_time(value: &Option<String>, now: DateTime<Utc>) -> DateTime<Utc> {
    present(value)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or(now)
}

fn list_window(minutes: &Option<String>, end: &Option<String>) -> ArmResult<TimeWindow> {
    let minutes = number(minutes, "minutes")?.unwrap_or(DEFAULT_LIST_MINUTES);
    TimeWindow::trailing(end_time(end, Utc::now()), minutes)
}

fn json_body(body: &Bytes) -> ArmResult<Option<Value>> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(body)
        .map(Some)
        .map_err(|e| ArmError::validation(format!("The object is not valid JSON: {e}")))
}

fn status_only(status: u16) -> Response {
    StatusCode::from_u16(status)
        .unwrap_or(StatusCode::BAD_GATEWAY)
        .into_response()
}

// ─── Query parameter structs ────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct IdQuery {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateGroupQuery {
    name: Option<String>,
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentsQuery {
    resource_group_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateDeploymentQuery {
    resource_group_id: Option<String>,
    deployment_name: Option<String>,
    template: Option<String>,
    parameters: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourcesQuery {
    resource_group: Option<String>,
    resource_type: Option<String>,
    tag_name: Option<String>,
    tag_value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceQuery {
    id: Option<String>,
    api_version: Option<String>,
    action_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventsQuery {
    resource: Option<String>,
    status: Option<String>,
    minutes: Option<String>,
    end_timestring: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventOccursQuery {
    trigger_state: Option<String>,
    resource: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetricQuery {
    resource: Option<String>,
    metric_name: Option<String>,
    minutes: Option<String>,
    end_timestring: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThresholdQuery {
    trigger_state: Option<String>,
    resource: Option<String>,
    metric_name: Option<String>,
    threshold: Option<String>,
    minutes: Option<String>,
    time_aggregation: Option<String>,
    operation: Option<String>,
}

impl ThresholdQuery {
    fn into_poll(self) -> ArmResult<ThresholdPoll> {
        let threshold = number(&self.threshold, "threshold")?
            .ok_or_else(|| ArmError::validation("The threshold parameter is required"))?;
        let mut poll = ThresholdPoll::new(
            present(&self.resource).unwrap_or_default(),
            present(&self.metric_name).unwrap_or_default(),
            threshold,
        );
        poll.trigger_state = owned(&self.trigger_state);
        poll.minutes = number(&self.minutes, "minutes")?.unwrap_or(DEFAULT_THRESHOLD_MINUTES);
        if let Some(aggregation) = present(&self.time_aggregation) {
            poll.aggregation = aggregation.parse().map_err(ArmError::from)?;
        }
        if let Some(operation) = present(&self.operation) {
            poll.comparison = operation.parse().map_err(ArmError::from)?;
        }
        Ok(poll)
    }
}

// ─── Health ─────────────────────────────────────────────────────────

async fn health_check() -> Json<Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "arm-connector",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

// ─── Resource groups ────────────────────────────────────────────────

async fn list_resource_groups(
    State(services): State<Arc<ApiService>>,
) -> ApiResult<Json<Vec<ResourceGroup>>> {
    Ok(Json(services.arm.list_resource_groups().await?))
}

async fn get_resource_group(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<IdQuery>,
) -> ApiResult<Json<ResourceGroup>> {
    let id = required(&q.id, "id")?;
    Ok(Json(services.arm.get_resource_group(id).await?))
}

async fn create_resource_group(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<CreateGroupQuery>,
) -> ApiResult<Json<ResourceGroup>> {
    let name = present(&q.name).unwrap_or_default();
    let location = present(&q.location).unwrap_or_default();
    tracing::info!(route = "ResourceGroupByName", name, location, "creating resource group");
    Ok(Json(services.arm.create_resource_group(name, location).await?))
}

async fn delete_resource_group(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<IdQuery>,
) -> ApiResult<Response> {
    let id = required(&q.id, "id")?;
    tracing::info!(route = "ResourceGroupById", id, "deleting resource group");
    Ok(status_only(services.arm.delete_resource_group(id).await?))
}

// ─── Deployments ────────────────────────────────────────────────────

async fn list_deployments(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<DeploymentsQuery>,
) -> ApiResult<Json<Vec<DeploymentExtended>>> {
    let rg = required(&q.resource_group_name, "resourceGroupName")?;
    Ok(Json(services.arm.list_deployments(rg).await?))
}

async fn get_deployment(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<IdQuery>,
) -> ApiResult<Json<DeploymentExtended>> {
    let id = required(&q.id, "id")?;
    Ok(Json(services.arm.get_deployment(id).await?))
}

async fn create_deployment(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<CreateDeploymentQuery>,
) -> ApiResult<Json<DeploymentExtended>> {
    let rg_id = present(&q.resource_group_id).unwrap_or_default();
    tracing::info!(
        route = "DeploymentById",
        resource_group = rg_id,
        deployment = present(&q.deployment_name),
        "creating deployment"
    );
    let deployment = services
        .arm
        .create_deployment(
            rg_id,
            present(&q.deployment_name),
            present(&q.template),
            present(&q.parameters),
        )
        .await?;
    Ok(Json(deployment))
}

// ─── Resources ──────────────────────────────────────────────────────

async fn list_resources(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<ResourcesQuery>,
) -> ApiResult<Json<Vec<ExtendedResource>>> {
    let filter = ResourceListFilter {
        resource_group: owned(&q.resource_group),
        resource_type: owned(&q.resource_type),
        tag_name: owned(&q.tag_name),
        tag_value: owned(&q.tag_value),
    };
    Ok(Json(services.arm.list_resources(&filter).await?))
}

async fn get_resource(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<ResourceQuery>,
) -> ApiResult<Json<ExtendedResource>> {
    let id = required(&q.id, "id")?;
    Ok(Json(services.arm.get_resource(id, present(&q.api_version)).await?))
}

async fn put_resource(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<ResourceQuery>,
    body: Bytes,
) -> ApiResult<Json<ExtendedResource>> {
    let id = required(&q.id, "id")?;
    let body: Option<ResourceBody> = json_body(&body)?
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| ArmError::validation(format!("The object is not valid JSON: {e}")))?;
    tracing::info!(route = "ResourceById", id, "writing resource");
    let resource = services
        .arm
        .create_or_update_resource(id, present(&q.api_version), body)
        .await?;
    Ok(Json(resource))
}

async fn invoke_resource_action(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<ResourceQuery>,
    body: Bytes,
) -> ApiResult<Response> {
    let id = required(&q.id, "id")?;
    let action = present(&q.action_name).unwrap_or_default();
    let body = json_body(&body)?;
    tracing::info!(route = "ResourceById", id, action, "invoking resource action");
    let raw = services
        .arm
        .invoke_resource_action(id, action, present(&q.api_version), body)
        .await?;

    let mut response = (
        StatusCode::from_u16(raw.status).unwrap_or(StatusCode::BAD_GATEWAY),
        raw.body,
    )
        .into_response();
    if let Some(value) = raw
        .content_type
        .and_then(|ct| header::HeaderValue::from_str(&ct).ok())
    {
        response.headers_mut().insert(header::CONTENT_TYPE, value);
    }
    Ok(response)
}

async fn delete_resource(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<ResourceQuery>,
) -> ApiResult<Response> {
    let id = required(&q.id, "id")?;
    tracing::info!(route = "ResourceById", id, "deleting resource");
    let status = services
        .arm
        .delete_resource(id, present(&q.api_version))
        .await?;
    Ok(status_only(status))
}

async fn list_providers(State(services): State<Arc<ApiService>>) -> ApiResult<Json<Vec<Provider>>> {
    Ok(Json(services.arm.list_providers().await?))
}

// ─── Monitor ────────────────────────────────────────────────────────

async fn list_events(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<EventsQuery>,
) -> ApiResult<Json<Vec<EventData>>> {
    let mut query = EventQuery::new(list_window(&q.minutes, &q.end_timestring)?);
    query.resource = owned(&q.resource);
    query.status = owned(&q.status);
    Ok(Json(services.arm.list_events(&query).await?))
}

async fn event_occurs(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<EventOccursQuery>,
    uri: Uri,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let poll = EventPoll {
        trigger_state: owned(&q.trigger_state),
        resource: owned(&q.resource),
        status: owned(&q.status),
    };
    let outcome = poll_events(services.arm.as_ref(), &poll, Utc::now()).await?;
    if outcome.is_triggered() {
        tracing::info!(route = "EventOccurs", state = outcome.state(), "event trigger fired");
    }
    Ok(envelope::render(outcome, &uri, &headers))
}

async fn list_metric_values(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<MetricQuery>,
) -> ApiResult<Json<Vec<MetricValue>>> {
    let resource = present(&q.resource).unwrap_or_default();
    let metric = present(&q.metric_name).unwrap_or_default();
    let window = list_window(&q.minutes, &q.end_timestring)?;
    Ok(Json(services.arm.metric_values(resource, metric, &window).await?))
}

async fn metric_threshold(
    State(services): State<Arc<ApiService>>,
    Query(q): Query<ThresholdQuery>,
    uri: Uri,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let poll = q.into_poll()?;
    let outcome = poll_metric_threshold(services.arm.as_ref(), &poll, Utc::now()).await?;
    if outcome.is_triggered() {
        tracing::info!(
            route = "MetricThreshold",
            metric = %poll.metric_name,
            comparison = %poll.comparison,
            threshold = poll.threshold,
            "metric trigger fired"
        );
    }
    Ok(envelope::render(outcome, &uri, &headers))
}

// ─── Tests ──────────────────────────────────────────────────────────
