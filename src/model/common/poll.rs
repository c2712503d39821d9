use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

/// States in the poll lifecycle. The status is advisory: a poll whose
/// deadline has passed is closed whatever this field says.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PollStatus {
    /// Accepting votes until the deadline.
    Open,
    /// No longer accepting votes.
    Closed,
}

impl From<PollStatus> for Bson {
    fn from(status: PollStatus) -> Self {
        to_bson(&status).expect("Serialisation is infallible")
    }
}
