//! "Metric crosses threshold" trigger.
//!
//! Each poll collapses the trailing window of metric samples into one
//! aggregate and compares the selected scalar against the threshold. The
//! trigger is edge-triggered: it fires only on the transition from not
//! passing (state `"0"` or empty) to passing, and then stays quiet
//! (state `"1"`) until the metric drops back.

use std::fmt;
use std::str::FromStr;

use armc_azure::monitor::TimeWindow;
use armc_azure::types::{ArmError, ArmResult, MetricValue};
use armc_azure::ArmService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;

use crate::envelope::TriggerResponse;
use crate::error::TriggerError;

/// Default trailing window of the threshold trigger, in minutes.
pub const DEFAULT_THRESHOLD_MINUTES: f64 = 15.0;

pub const STATE_INACTIVE: &str = "0";
pub const STATE_ACTIVE: &str = "1";

// ─── Aggregation ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeAggregation {
    #[default]
    Average,
    Count,
    Maximum,
    Minimum,
    Total,
}

impl FromStr for TimeAggregation {
    type Err = TriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "average" => Ok(Self::Average),
            "count" => Ok(Self::Count),
            "maximum" => Ok(Self::Maximum),
            "minimum" => Ok(Self::Minimum),
            "total" => Ok(Self::Total),
            _ => Err(TriggerError::UnknownAggregation(s.to_string())),
        }
    }
}

impl TimeAggregation {
    /// The aggregate's value for this kind; absent values count as `0.0`.
    pub fn select(self, value: &MetricValue) -> f64 {
        let picked = match self {
            Self::Average => value.average,
            Self::Count => value.count,
            Self::Maximum => value.maximum,
            Self::Minimum => value.minimum,
            Self::Total => value.total,
        };
        picked.unwrap_or(0.0)
    }
}

// ─── Comparison ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Comparison {
    Equals,
    GreaterThanOrEqual,
    #[default]
    GreaterThan,
    LessThanOrEqual,
    LessThan,
    NotEquals,
}

impl FromStr for Comparison {
    type Err = TriggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equals" | "=" | "==" => Ok(Self::Equals),
            "greaterthanorequal" | ">=" | "≥" => Ok(Self::GreaterThanOrEqual),
            "greaterthan" | ">" => Ok(Self::GreaterThan),
            "lessthanorequal" | "<=" | "≤" => Ok(Self::LessThanOrEqual),
            "lessthan" | "<" => Ok(Self::LessThan),
            "notequals" | "!=" | "<>" | "≠" => Ok(Self::NotEquals),
            _ => Err(TriggerError::UnknownComparison(s.to_string())),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Equals => "=",
            Self::GreaterThanOrEqual => ">=",
            Self::GreaterThan => ">",
            Self::LessThanOrEqual => "<=",
            Self::LessThan => "<",
            Self::NotEquals => "!=",
        };
        f.write_str(symbol)
    }
}

impl Comparison {
    pub fn passes(self, value: f64, threshold: f64) -> bool {
        match self {
            Self::Equals => value == threshold,
            Self::GreaterThanOrEqual => value >= threshold,
            Self::GreaterThan => value > threshold,
            Self::LessThanOrEqual => value <= threshold,
            Self::LessThan => value < threshold,
            Self::NotEquals => value != threshold,
        }
    }
}

/// Collapse samples into one record: mean of averages, max of maxima, min of
/// minima, sums of counts and totals, latest timestamp. `None` without
/// samples.
pub fn aggregate(values: &[MetricValue]) -> Option<MetricValue> {
    let time_stamp = values.iter().map(|v| v.time_stamp).max()?;

    let averages: Vec<f64> = values.iter().filter_map(|v| v.average).collect();
    let average = (!averages.is_empty()).then(|| averages.iter().sum::<f64>() / averages.len() as f64);
    let maximum = values.iter().filter_map(|v| v.maximum).reduce(f64::max);
    let minimum = values.iter().filter_map(|v| v.minimum).reduce(f64::min);
    let count = Some(values.iter().filter_map(|v| v.count).sum());
    let total = Some(values.iter().filter_map(|v| v.total).sum());

    Some(MetricValue {
        time_stamp,
        average,
        minimum,
        maximum,
        total,
        count,
    })
}

/// Edge-trigger decision: `(fire, new_state)`.
pub fn evaluate(passed: bool, state: &str) -> (bool, &'static str) {
    match (passed, state.trim()) {
        (true, "") | (true, STATE_INACTIVE) => (true, STATE_ACTIVE),
        (true, _) => (false, STATE_ACTIVE),
        (false, _) => (false, STATE_INACTIVE),
    }
}

// ─── Polling ────────────────────────────────────────────────────────

/// Anything that can produce metric samples for a resource.
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn metric_values(
        &self,
        resource_id: &str,
        metric_name: &str,
        window: &TimeWindow,
    ) -> ArmResult<Vec<MetricValue>>;
}

#[async_trait]
impl MetricSource for ArmService {
    async fn metric_values(
        &self,
        resource_id: &str,
        metric_name: &str,
        window: &TimeWindow,
    ) -> ArmResult<Vec<MetricValue>> {
        ArmService::metric_values(self, resource_id, metric_name, window).await
    }
}

/// Parameters of one "metric crosses threshold" poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdPoll {
    pub trigger_state: Option<String>,
    pub resource: String,
    pub metric_name: String,
    pub threshold: f64,
    pub minutes: f64,
    pub aggregation: TimeAggregation,
    pub comparison: Comparison,
}

impl ThresholdPoll {
    pub fn new(resource: impl Into<String>, metric_name: impl Into<String>, threshold: f64) -> Self {
        Self {
            trigger_state: None,
            resource: resource.into(),
            metric_name: metric_name.into(),
            threshold,
            minutes: DEFAULT_THRESHOLD_MINUTES,
            aggregation: TimeAggregation::default(),
            comparison: Comparison::default(),
        }
    }
}

pub async fn poll_metric_threshold<S>(
    source: &S,
    poll: &ThresholdPoll,
    now: DateTime<Utc>,
) -> ArmResult<TriggerResponse<MetricValue>>
where
    S: MetricSource + ?Sized,
{
    if poll.resource.trim().is_empty() || poll.metric_name.trim().is_empty() {
        return Err(TriggerError::MissingMetric.into());
    }
    let window = TimeWindow::trailing(now, poll.minutes)?;
    let samples = source
        .metric_values(&poll.resource, &poll.metric_name, &window)
        .await?;
    let aggregate = aggregate(&samples).ok_or_else(|| {
        ArmError::validation(
            "There are not any data points for this metric in the time window you provided.",
        )
    })?;

    let value = poll.aggregation.select(&aggregate);
    let passed = poll.comparison.passes(value, poll.threshold);
    let (fire, state) = evaluate(passed, poll.trigger_state.as_deref().unwrap_or(""));
    debug!(
        "metric trigger: {:?} {} = {} {} {} → passed={} fire={}",
        poll.aggregation, poll.metric_name, value, poll.comparison, poll.threshold, passed, fire
    );

    Ok(if fire {
        TriggerResponse::triggered(aggregate, state)
    } else {
        TriggerResponse::wait(state)
    })
}

// ─── Tests ──────────────────────────────────────────────────────────
