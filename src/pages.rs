//! The browser front end: the static directory and the HTML pages in it.

use rocket::{fs::FileServer, fs::NamedFile, Build, Rocket, Route, State};

use crate::{config::Config, rate_limit::Throttle};

/// Mount the static directory under `/static` and the pages at their short
/// paths. Nothing is mounted when no directory is configured or it is missing.
pub async fn mount(rocket: Rocket<Build>) -> Rocket<Build> {
    let Some(dir) = rocket
        .state::<Config>()
        .and_then(Config::static_dir)
        .map(ToOwned::to_owned)
    else {
        return rocket;
    };
    if !dir.is_dir() {
        warn!("Static directory {} does not exist, not serving it", dir.display());
        return rocket;
    }
    info!("Serving static pages from {}", dir.display());
    rocket
        .mount("/static", FileServer::from(dir))
        .mount("/", routes())
}

fn routes() -> Vec<Route> {
    routes![signin, teams, register, game, index]
}

async fn page(config: &Config, file: &str) -> Option<NamedFile> {
    NamedFile::open(config.static_dir()?.join(file)).await.ok()
}

#[get("/")]
async fn signin(_throttle: Throttle, config: &State<Config>) -> Option<NamedFile> {
    page(config, "signin.html").await
}

#[get("/teams")]
async fn teams(_throttle: Throttle, config: &State<Config>) -> Option<NamedFile> {
    page(config, "teams.html").await
}

#[get("/register")]
async fn register(_throttle: Throttle, config: &State<Config>) -> Option<NamedFile> {
    page(config, "register.html").await
}

#[get("/game")]
async fn game(_throttle: Throttle, config: &State<Config>) -> Option<NamedFile> {
    page(config, "game.html").await
}

#[get("/index")]
async fn index(_throttle: Throttle, config: &State<Config>) -> Option<NamedFile> {
    page(config, "index.html").await
}
