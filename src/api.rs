use rocket::Route;

pub mod players;
pub mod polls;
pub mod teams;
pub mod users;
pub mod votes;

/// Every API route, to be mounted under `/api/v1`.
pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(players::routes());
    routes.extend(polls::routes());
    routes.extend(teams::routes());
    routes.extend(users::routes());
    routes.extend(votes::routes());
    routes
}
