use chrono::Utc;
use rocket::{http::Status, serde::json::Json, Route};

use crate::{
    error::Result,
    logic::identity,
    model::api::{Credentials, Profile, RegisterRequest, Success},
    rate_limit::Throttle,
    store::Db,
};

pub fn routes() -> Vec<Route> {
    routes![register, login]
}

#[post("/register", data = "<request>")]
pub async fn register(
    _throttle: Throttle,
    request: Json<RegisterRequest>,
    db: Db,
) -> Result<(Status, Json<Success>)> {
    identity::register(&*db, request.into_inner(), Utc::now()).await?;
    Ok((Status::Created, Json(Success::new())))
}

#[post("/login", data = "<credentials>")]
pub async fn login(
    _throttle: Throttle,
    credentials: Json<Credentials>,
    db: Db,
) -> Result<Json<Profile>> {
    let profile = identity::login(&*db, &credentials).await?;
    Ok(Json(profile))
}
