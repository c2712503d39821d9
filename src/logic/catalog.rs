//! The player catalog: plain reference data, unrelated to registered users.

use crate::error::{Error, Result};
use crate::model::{
    api::PlayerSpec,
    db::{NewPlayer, Player},
};
use crate::store::Store;

pub async fn create(store: &dyn Store, spec: PlayerSpec) -> Result<Player> {
    let name = spec.name.trim();
    if name.is_empty() {
        return Err(Error::bad_request("name is required"));
    }
    let player = NewPlayer {
        name: name.to_string(),
        position: spec.position,
        avg_rating: spec.avg_rating,
    };
    let player = store.insert_player(&player).await?;
    debug!("Added {} to the player catalog", player.name);
    Ok(player)
}

/// Every catalog player, oldest first.
pub async fn list(store: &dyn Store) -> Result<Vec<Player>> {
    store.players().await
}
