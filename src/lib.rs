#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use std::sync::Arc;

use rocket::{fairing::AdHoc, figment::Figment, Build, Rocket};

use crate::{
    audit::AuditFairing,
    config::{ConfigFairing, DatabaseFairing},
    cors::CorsFairing,
    logging::LoggerFairing,
    rate_limit::RateLimitFairing,
    store::{Db, Store},
};

pub mod api;
pub mod audit;
pub mod config;
pub mod cors;
pub mod error;
pub mod logging;
pub mod logic;
pub mod model;
pub mod pages;
pub mod rate_limit;
pub mod store;

/// Where the API routes are mounted.
pub const API_BASE: &str = "/api/v1";

/// Build the server from `Rocket.toml` and `ROCKET_*` environment variables.
pub fn build() -> Rocket<Build> {
    assemble(rocket::build())
}

/// Build the server over an existing store instead of connecting to one.
pub fn rocket_with_store(figment: Figment, store: Arc<dyn Store>) -> Rocket<Build> {
    assemble(rocket::custom(figment).manage(Db::new(store)))
}

fn assemble(rocket: Rocket<Build>) -> Rocket<Build> {
    // Ignite fairings run in attach order; later ones read the managed `Config`.
    rocket
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(RateLimitFairing)
        .attach(AuditFairing)
        .attach(CorsFairing)
        .attach(AdHoc::on_ignite("Static pages", pages::mount))
        .mount(API_BASE, api::routes())
        .mount("/", cors::routes())
        .register("/", error::catchers())
}

/// A server over `db` with default settings, for tests.
#[cfg(test)]
pub(crate) fn test_rocket(db: Db) -> Rocket<Build> {
    let figment = Figment::from(rocket::Config::debug_default())
        .merge(("log_level", rocket::config::LogLevel::Off));
    assemble(rocket::custom(figment).manage(db))
}
