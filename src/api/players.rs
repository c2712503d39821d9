use rocket::{http::Status, serde::json::Json, Route};

use crate::{
    error::Result,
    logic::catalog,
    model::api::{PlayerDescription, PlayerSpec},
    rate_limit::Throttle,
    store::Db,
};

pub fn routes() -> Vec<Route> {
    routes![create_player, list_players]
}

#[post("/players", data = "<spec>")]
async fn create_player(
    _throttle: Throttle,
    spec: Json<PlayerSpec>,
    db: Db,
) -> Result<(Status, Json<PlayerDescription>)> {
    let player = catalog::create(&*db, spec.into_inner()).await?;
    Ok((Status::Created, Json(player.into())))
}

#[get("/players")]
async fn list_players(_throttle: Throttle, db: Db) -> Result<Json<Vec<PlayerDescription>>> {
    let players = catalog::list(&*db).await?;
    Ok(Json(players.into_iter().map(Into::into).collect()))
}
