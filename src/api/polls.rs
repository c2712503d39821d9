use chrono::Utc;
use rocket::{http::Status, serde::json::Json, Route, State};

use crate::{
    config::Config,
    error::Result,
    logic::polls,
    model::api::{CreatePollRequest, PollDescription},
    rate_limit::Throttle,
    store::Db,
};

pub fn routes() -> Vec<Route> {
    routes![create_poll, current_poll]
}

#[post("/polls", data = "<request>")]
async fn create_poll(
    _throttle: Throttle,
    request: Json<CreatePollRequest>,
    db: Db,
    config: &State<Config>,
) -> Result<(Status, Json<PollDescription>)> {
    let zone = config.reference_zone();
    let poll = polls::create(&*db, &request, zone, Utc::now()).await?;
    Ok((Status::Created, Json(PollDescription::new(poll, zone))))
}

#[get("/polls/current")]
async fn current_poll(
    _throttle: Throttle,
    db: Db,
    config: &State<Config>,
) -> Result<Json<PollDescription>> {
    let poll = polls::current(&*db, Utc::now()).await?;
    Ok(Json(PollDescription::new(poll, config.reference_zone())))
}
