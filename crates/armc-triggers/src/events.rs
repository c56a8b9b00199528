//! "Event occurs" trigger.
//!
//! The trigger state is a timestamp watermark. Each poll looks at the
//! activity log between the watermark and now and fires for the oldest event
//! strictly newer than the watermark, which then becomes the new watermark.
//! Polling repeatedly therefore drains the log one event at a time, oldest
//! first, without repeats.

use armc_azure::monitor::{format_timestamp, EventQuery, TimeWindow};
use armc_azure::types::{ArmResult, EventData};
use armc_azure::ArmService;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;

use crate::envelope::{TriggerResponse, POLL_AGAIN_SECS};

/// Anything that can answer an activity-log query.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn events(&self, query: &EventQuery) -> ArmResult<Vec<EventData>>;
}

#[async_trait]
impl EventSource for ArmService {
    async fn events(&self, query: &EventQuery) -> ArmResult<Vec<EventData>> {
        self.list_events(query).await
    }
}

/// Parameters of one "event occurs" poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPoll {
    pub trigger_state: Option<String>,
    pub resource: Option<String>,
    pub status: Option<String>,
}

/// The watermark carried in `state`, if it is a valid RFC 3339 instant.
pub fn parse_watermark(state: Option<&str>) -> Option<DateTime<Utc>> {
    let state = state?.trim();
    DateTime::parse_from_rfc3339(state)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Oldest event strictly newer than `watermark`, and whether any event
/// follows it in the batch.
pub fn select_event(
    mut events: Vec<EventData>,
    watermark: DateTime<Utc>,
) -> Option<(EventData, bool)> {
    events.sort_by_key(|e| e.event_timestamp);
    let index = events.iter().position(|e| e.event_timestamp > watermark)?;
    let more = index + 1 < events.len();
    Some((events.swap_remove(index), more))
}

pub async fn poll_events<S>(
    source: &S,
    poll: &EventPoll,
    now: DateTime<Utc>,
) -> ArmResult<TriggerResponse<EventData>>
where
    S: EventSource + ?Sized,
{
    let Some(watermark) = parse_watermark(poll.trigger_state.as_deref()) else {
        debug!("event trigger: no watermark, starting from now");
        return Ok(TriggerResponse::wait(format_timestamp(&now)));
    };

    let query = EventQuery {
        window: TimeWindow::new(watermark, now)?,
        resource: poll.resource.clone(),
        status: poll.status.clone(),
    };
    let events = source.events(&query).await?;
    debug!("event trigger: {} event(s) since {}", events.len(), watermark);

    Ok(match select_event(events, watermark) {
        Some((event, more)) => {
            let state = format_timestamp(&event.event_timestamp);
            let response = TriggerResponse::triggered(event, state);
            if more {
                response.poll_again_in(POLL_AGAIN_SECS)
            } else {
                response
            }
        }
        None => TriggerResponse::wait(format_timestamp(&now)),
    })
}

// ─── Tests ──────────────────────────────────────────────────────────
