use serde::{Deserialize, Serialize};

use super::user::Credentials;

/// An attendance vote. Re-submitting overwrites the voter's previous decision.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VoteRequest {
    pub poll_id: String,
    #[serde(flatten)]
    pub credentials: Credentials,
    pub rating: i32,
    pub attending: bool,
}
