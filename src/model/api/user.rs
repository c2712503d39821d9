use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    common::{RawSkill, Skill},
    db::User,
};

/// A registration (or profile update) as submitted by a client.
/// Missing fields deserialise as empty so they fail validation with a 400.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub skills: Vec<RawSkill>,
    pub secret: String,
}

/// A name pair plus secret, as sent to log in or to vote.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Credentials {
    pub first_name: String,
    pub last_name: String,
    pub secret: String,
}

impl Credentials {
    /// Reject credentials with any empty field.
    pub fn require_complete(&self) -> Result<()> {
        if self.first_name.is_empty() || self.last_name.is_empty() || self.secret.is_empty() {
            return Err(Error::bad_request(
                "firstName, lastName and secret are required",
            ));
        }
        Ok(())
    }
}

impl From<&RegisterRequest> for Credentials {
    fn from(request: &RegisterRequest) -> Self {
        Self {
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            secret: request.secret.clone(),
        }
    }
}

/// A user's public profile. Never carries the secret or its hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub skills: Vec<Skill>,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            first_name: user.user.first_name,
            last_name: user.user.last_name,
            position: user.user.position,
            skills: user.user.skills,
        }
    }
}

/// Acknowledgement body for writes with nothing else to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Success {
    pub success: bool,
}

impl Success {
    pub const fn new() -> Self {
        Self { success: true }
    }
}
