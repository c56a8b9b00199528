//! Azure Monitor – activity-log events, metric definitions, metric values.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use log::debug;

use crate::client::{encode_path, ArmClient};
use crate::filter::ODataFilter;
use crate::identifiers::{identity_from_id, resource_group_from_id};
use crate::types::{ArmError, ArmResult, EventData, MetricDefinition, MetricResponse, MetricValue};

/// Longest window any events or metrics query may span.
pub const MAX_WINDOW_DAYS: i64 = 31;

/// Aggregations requested on every metrics query.
pub const ALL_AGGREGATIONS: &str = "Average,Count,Maximum,Minimum,Total";

const WINDOW_ERROR: &str = "The number of minutes must be above 0 and less than one month.";

/// RFC 3339 rendering used on the wire and in trigger states.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

// ─── Time window ────────────────────────────────────────────────────

/// Closed interval `[start, end]`, longer than zero and at most 31 days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> ArmResult<Self> {
        let span = end - start;
        if span <= Duration::zero() || span > Duration::days(MAX_WINDOW_DAYS) {
            return Err(ArmError::validation(WINDOW_ERROR));
        }
        Ok(Self { start, end })
    }

    /// The `minutes` leading up to `end`.
    pub fn trailing(end: DateTime<Utc>, minutes: f64) -> ArmResult<Self> {
        let max_minutes = (MAX_WINDOW_DAYS * 24 * 60) as f64;
        if !minutes.is_finite() || minutes <= 0.0 || minutes > max_minutes {
            return Err(ArmError::validation(WINDOW_ERROR));
        }
        let span = Duration::milliseconds((minutes * 60_000.0).round() as i64);
        Self::new(end - span, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// `start/end`, the form the metrics API takes for `timespan`.
    pub fn timespan(&self) -> String {
        format!("{}/{}", format_timestamp(&self.start), format_timestamp(&self.end))
    }
}

// ─── Time grains ────────────────────────────────────────────────────

/// Parse an ISO-8601 duration of the form `P[nD][T[nH][nM][nS]]`, the shape
/// Azure Monitor uses for time grains (`PT1M`, `PT1H`, `P1D`).
pub fn parse_time_grain(grain: &str) -> ArmResult<Duration> {
    let invalid = || ArmError::validation(format!("'{grain}' is not a supported time grain"));

    let rest = grain.strip_prefix('P').ok_or_else(invalid)?;
    let (date, time) = match rest.split_once('T') {
        Some((_, "")) => return Err(invalid()),
        Some((d, t)) => (d, t),
        None => (rest, ""),
    };
    if date.is_empty() && time.is_empty() {
        return Err(invalid());
    }
    let secs = sum_units(date, &[('D', 86_400)])
        .zip(sum_units(time, &[('H', 3_600), ('M', 60), ('S', 1)]))
        .map(|(d, t)| d + t)
        .filter(|s| *s > 0)
        .ok_or_else(invalid)?;
    Ok(Duration::seconds(secs))
}

/// Sum `<digits><unit>` pairs; units must appear in the given order, at most
/// once each.
fn sum_units(part: &str, units: &[(char, i64)]) -> Option<i64> {
    let mut total = 0i64;
    let mut digits = String::new();
    let mut next = 0usize;
    for c in part.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        let pos = next + units[next..].iter().position(|(u, _)| *u == c)?;
        let n: i64 = digits.parse().ok()?;
        total = total.checked_add(n.checked_mul(units[pos].1)?)?;
        digits.clear();
        next = pos + 1;
    }
    digits.is_empty().then_some(total)
}

/// Smallest parseable time grain a metric definition advertises.
pub fn smallest_time_grain(definition: &MetricDefinition) -> ArmResult<(String, Duration)> {
    definition
        .metric_availabilities
        .iter()
        .filter_map(|a| a.time_grain.as_deref())
        .filter_map(|g| parse_time_grain(g).ok().map(|d| (g.to_string(), d)))
        .min_by_key(|(_, d)| *d)
        .ok_or_else(|| ArmError::validation("This metric does not report any time grain"))
}

/// Find `metric_name` among `definitions` (case-insensitive) and pick the
/// smallest grain that fits inside `window`.
pub fn select_time_grain(
    definitions: &[MetricDefinition],
    metric_name: &str,
    window: &TimeWindow,
) -> ArmResult<String> {
    let definition = definitions
        .iter()
        .find(|d| {
            d.name
                .as_ref()
                .and_then(|n| n.value.as_deref())
                .is_some_and(|v| v.eq_ignore_ascii_case(metric_name))
        })
        .ok_or_else(|| ArmError::validation("The metric you provided does not exist."))?;

    let (grain, span) = smallest_time_grain(definition)?;
    if span > window.duration() {
        return Err(ArmError::validation(format!(
            "The metric does not have a time grain small enough for the window you provided. \
             The smallest timegrain is: {} minutes",
            span.num_minutes()
        )));
    }
    Ok(grain)
}

// ─── Activity log ───────────────────────────────────────────────────

/// Parameters of an activity-log query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventQuery {
    pub window: TimeWindow,
    /// Resource id (filters on `resourceUri`) or resource-group id (filters
    /// on `resourceGroupName`).
    pub resource: Option<String>,
    pub status: Option<String>,
}

impl EventQuery {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            resource: None,
            status: None,
        }
    }

    pub fn odata(&self) -> ArmResult<ODataFilter> {
        let mut filter = ODataFilter::new()
            .ge("eventTimestamp", format_timestamp(&self.window.start))
            .le("eventTimestamp", format_timestamp(&self.window.end))
            .eq("eventChannels", "Admin, Operation");

        if let Some(resource) = &self.resource {
            let segments = resource.split('/').count();
            filter = if segments >= 9 {
                filter.eq("resourceUri", resource.as_str())
            } else if segments >= 5 {
                filter.eq("resourceGroupName", resource_group_from_id(resource)?)
            } else {
                return Err(ArmError::validation(
                    "The resource filter must be a resource or resource group Id",
                ));
            };
        }
        if let Some(status) = &self.status {
            filter = filter.eq("status", status.as_str());
        }
        Ok(filter)
    }
}

/// Activity-log events in the window, oldest first.
pub async fn list_events(client: &ArmClient, query: &EventQuery) -> ArmResult<Vec<EventData>> {
    let url = client.subscription_url("/providers/microsoft.insights/eventtypes/management/values")?;
    let mut params = vec![("api-version", client.config().api_version_events.clone())];
    if let Some(f) = query.odata()?.render() {
        params.push(("$filter", f));
    }
    debug!("list_events → {}", url);
    let mut events: Vec<EventData> = client.get_all_pages(&url, &params).await?;
    events.sort_by_key(|e| e.event_timestamp);
    Ok(events)
}

// ─── Metrics ────────────────────────────────────────────────────────

/// Metric definitions available for a full resource id.
pub async fn list_metric_definitions(
    client: &ArmClient,
    resource_id: &str,
) -> ArmResult<Vec<MetricDefinition>> {
    identity_from_id(resource_id, None)?;
    let url = client.arm_url(&format!(
        "{}/providers/microsoft.insights/metricDefinitions",
        encode_path(resource_id)
    ));
    debug!("list_metric_definitions({}) → {}", resource_id, url);
    let query = [("api-version", client.config().api_version_metrics.as_str())];
    client.get_all_pages(&url, &query).await
}

/// Samples of one metric over `window` at `grain`, every aggregation
/// requested. Fails when the query yields no series.
pub async fn query_metrics(
    client: &ArmClient,
    resource_id: &str,
    metric_name: &str,
    window: &TimeWindow,
    grain: &str,
) -> ArmResult<Vec<MetricValue>> {
    identity_from_id(resource_id, None)?;
    let url = client.arm_url(&format!(
        "{}/providers/microsoft.insights/metrics",
        encode_path(resource_id)
    ));
    let query = [
        ("api-version", client.config().api_version_metrics.clone()),
        ("metricnames", metric_name.to_string()),
        ("timespan", window.timespan()),
        ("interval", grain.to_string()),
        ("aggregation", ALL_AGGREGATIONS.to_string()),
    ];
    debug!("query_metrics({}, {}) → {}", resource_id, metric_name, url);
    let response: MetricResponse = client.get_json_with_query(&url, &query).await?;
    flatten_series(response)
}

fn flatten_series(response: MetricResponse) -> ArmResult<Vec<MetricValue>> {
    let metric = response.value.into_iter().next().ok_or_else(|| {
        ArmError::validation(
            "There are not any data points for this metric in the time window you provided.",
        )
    })?;
    Ok(metric
        .timeseries
        .into_iter()
        .flat_map(|ts| ts.data)
        .collect())
}

// ─── Tests ──────────────────────────────────────────────────────────
