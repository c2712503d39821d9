use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A catalog player. Reference data only; unrelated to registered users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerCore {
    pub name: String,
    pub position: String,
    pub avg_rating: f64,
}

/// A player without an ID.
pub type NewPlayer = PlayerCore;

/// A player from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub player: PlayerCore,
}

impl Deref for Player {
    type Target = PlayerCore;

    fn deref(&self) -> &Self::Target {
        &self.player
    }
}
