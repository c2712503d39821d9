use serde::{Deserialize, Serialize};

use crate::model::{api::ApiId, db::Player};

/// A new catalog player, as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerSpec {
    pub name: String,
    pub position: String,
    pub avg_rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDescription {
    pub id: ApiId,
    pub name: String,
    pub position: String,
    pub avg_rating: f64,
}

impl From<Player> for PlayerDescription {
    fn from(player: Player) -> Self {
        Self {
            id: player.id.into(),
            name: player.player.name,
            position: player.player.position,
            avg_rating: player.player.avg_rating,
        }
    }
}
