use chrono::{DateTime, FixedOffset, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::model::{api::ApiId, common::PollStatus, db::Poll};

/// A request to open a poll. Both fields are optional; empty strings count as absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreatePollRequest {
    /// `YYYY-MM-DD`. Defaults to the next Saturday.
    pub poll_date: Option<String>,
    /// RFC 3339. Defaults to 10:00 local time on the poll date.
    pub ends_at: Option<String>,
}

/// An API-friendly poll, with times shown in the reference zone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollDescription {
    pub id: ApiId,
    pub poll_date: NaiveDate,
    pub status: PollStatus,
    pub ends_at: DateTime<FixedOffset>,
    pub created_at: DateTime<FixedOffset>,
}

impl PollDescription {
    pub fn new(poll: Poll, zone: &Tz) -> Self {
        Self {
            id: poll.id.into(),
            poll_date: poll.poll.poll_date,
            status: poll.poll.status,
            ends_at: poll.poll.ends_at.with_timezone(zone).fixed_offset(),
            created_at: poll.poll.created_at.with_timezone(zone).fixed_offset(),
        }
    }
}
