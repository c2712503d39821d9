use std::ops::{Deref, DerefMut};

use argon2::Config;
use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::{common::Skill, mongodb::Id};

use super::teams::TeamPlayer;

/// Core user data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserCore {
    pub first_name: String,
    pub last_name: String,
    pub position: String,
    pub skills: Vec<Skill>,
    pub secret_hash: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl UserCore {
    /// Create a new user with an already hashed secret. See [`hash_secret`].
    pub fn new(
        first_name: String,
        last_name: String,
        position: String,
        skills: Vec<Skill>,
        secret_hash: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            first_name,
            last_name,
            position,
            skills,
            secret_hash,
            created_at: now,
        }
    }

    /// Check whether the given secret is correct.
    pub fn verify_secret(&self, secret: &str) -> bool {
        verify_secret(&self.secret_hash, secret)
    }
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl User {
    /// Copy the parts of this user that belong on a team sheet.
    pub fn snapshot(&self) -> TeamPlayer {
        TeamPlayer {
            user_id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            position: self.position.clone(),
            skills: self.skills.clone(),
        }
    }
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// Hash a secret with a fresh random salt.
pub fn hash_secret(secret: &str) -> Result<String, argon2::Error> {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    argon2::hash_encoded(secret.as_bytes(), &salt, &Config::default())
}

/// Check a secret against a stored hash.
///
/// Hashes written by the previous version of the service are unsalted
/// hex-encoded SHA-256 digests; those still verify.
pub fn verify_secret(hash: &str, secret: &str) -> bool {
    if is_legacy_hash(hash) {
        HEXLOWER.encode(&Sha256::digest(secret.as_bytes())) == hash.to_lowercase()
    } else {
        argon2::verify_encoded(hash, secret.as_bytes()).unwrap_or(false)
    }
}

fn is_legacy_hash(hash: &str) -> bool {
    hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    use crate::model::common::SkillName;

    impl UserCore {
        pub fn example() -> Self {
            Self {
                first_name: "Diego".to_string(),
                last_name: "Forlan".to_string(),
                position: "striker".to_string(),
                skills: vec![Skill {
                    name: SkillName::Shooting,
                    value: 9,
                }],
                // sha256("hunter2")
                secret_hash: "f52fbd32b2b3b86ff88ef6c490628285f482af15ddcb29541f94bcf526a3f6c7"
                    .to_string(),
                created_at: Utc::now(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argon2_hashes_verify() {
        let hash = hash_secret("open sesame").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_secret(&hash, "open sesame"));
        assert!(!verify_secret(&hash, "open sesame!"));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash_secret("same").unwrap(), hash_secret("same").unwrap());
    }

    #[test]
    fn legacy_hashes_verify() {
        let user = UserCore::example();
        assert!(user.verify_secret("hunter2"));
        assert!(!user.verify_secret("hunter3"));
    }

    #[test]
    fn garbage_hashes_never_verify() {
        assert!(!verify_secret("not a hash", "anything"));
        assert!(!verify_secret("", ""));
    }
}
