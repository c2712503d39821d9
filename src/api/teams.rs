use chrono::Utc;
use rocket::{serde::json::Json, Route, State};

use crate::{
    config::Config,
    error::Result,
    logic::teams::{self, PlayerMove, TeamSheet},
    model::{
        api::{MoveRequest, Success, TeamsDescription},
        mongodb::Id,
    },
    rate_limit::Throttle,
    store::Db,
};

pub fn routes() -> Vec<Route> {
    routes![generate_teams, get_teams, move_player]
}

fn describe(sheet: TeamSheet, config: &Config) -> Json<TeamsDescription> {
    Json(TeamsDescription::new(
        &sheet.poll,
        sheet.teams,
        config.reference_zone(),
    ))
}

#[post("/polls/<poll_id>/teams")]
async fn generate_teams(
    _throttle: Throttle,
    poll_id: &str,
    db: Db,
    config: &State<Config>,
) -> Result<Json<TeamsDescription>> {
    let poll_id = Id::parse_field(poll_id, "poll id")?;
    let sheet = teams::generate(&*db, poll_id, Utc::now()).await?;
    Ok(describe(sheet, config))
}

#[get("/polls/<poll_id>/teams")]
async fn get_teams(
    _throttle: Throttle,
    poll_id: &str,
    db: Db,
    config: &State<Config>,
) -> Result<Json<TeamsDescription>> {
    let poll_id = Id::parse_field(poll_id, "poll id")?;
    let sheet = teams::get(&*db, poll_id).await?;
    Ok(describe(sheet, config))
}

#[post("/polls/<poll_id>/teams/move", data = "<request>")]
async fn move_player(
    _throttle: Throttle,
    poll_id: &str,
    request: Json<MoveRequest>,
    db: Db,
) -> Result<Json<Success>> {
    let poll_id = Id::parse_field(poll_id, "poll id")?;
    let player_move = PlayerMove::parse(&request.user_id, &request.from_team, &request.to_team)?;
    teams::move_player(&*db, poll_id, player_move, Utc::now()).await?;
    Ok(Json(Success::new()))
}
