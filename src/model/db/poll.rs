use std::ops::{Deref, DerefMut};

use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{common::PollStatus, mongodb::Id};

/// Core poll data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollCore {
    /// The day the match is played.
    pub poll_date: NaiveDate,
    pub status: PollStatus,
    /// Votes are accepted up to and including this instant.
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub ends_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl PollCore {
    /// Create a new open poll.
    pub fn new(poll_date: NaiveDate, ends_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self {
            poll_date,
            status: PollStatus::Open,
            ends_at,
            created_at: now,
        }
    }

    /// Whether votes are accepted at the given instant. The deadline wins over the status.
    pub fn accepts_votes_at(&self, now: DateTime<Utc>) -> bool {
        self.status == PollStatus::Open && now <= self.ends_at
    }
}

/// A poll without an ID.
pub type NewPoll = PollCore;

/// A poll from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poll {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub poll: PollCore,
}

impl Deref for Poll {
    type Target = PollCore;

    fn deref(&self) -> &Self::Target {
        &self.poll
    }
}

impl DerefMut for Poll {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.poll
    }
}
