use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use mongodb::{options::ClientOptions, Client as MongoClient};
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::{de, Deserialize, Deserializer};

use crate::model::mongodb::ensure_indexes_exist;
use crate::store::{Db, MemoryStore, MongoStore};

/// `db_uri` value that selects the in-process store.
pub const MEMORY_URI: &str = "memory:";

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(
        default = "default_poll_time_zone",
        deserialize_with = "deserialize_time_zone"
    )]
    poll_time_zone: Tz,
    #[serde(default = "default_rate_limit")]
    rate_limit: u32,
    #[serde(default = "default_rate_window")]
    rate_window: u64,
    // secrets
    #[serde(default)]
    ipinfo_token: Option<String>,
    #[serde(default)]
    static_dir: Option<PathBuf>,
}

impl Config {
    /// The zone poll dates and default deadlines are computed in.
    pub fn reference_zone(&self) -> &Tz {
        &self.poll_time_zone
    }

    /// Requests allowed per client per window.
    pub fn rate_limit(&self) -> u32 {
        self.rate_limit
    }

    /// Length of a rate limiting window.
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    /// Token for ipinfo.io lookups. Audit events are not geolocated without one.
    pub fn ipinfo_token(&self) -> Option<&str> {
        self.ipinfo_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Directory of static pages served under `/static`, if any.
    pub fn static_dir(&self) -> Option<&Path> {
        self.static_dir.as_deref()
    }

    fn validate(&self) -> Result<(), String> {
        if self.rate_limit == 0 {
            return Err("`rate_limit` must be at least 1".to_string());
        }
        if self.rate_window == 0 {
            return Err("`rate_window` must be at least 1 second".to_string());
        }
        Ok(())
    }
}

fn default_poll_time_zone() -> Tz {
    Tz::America__Chicago
}

const fn default_rate_limit() -> u32 {
    100
}

const fn default_rate_window() -> u64 {
    60
}

fn deserialize_time_zone<'de, D>(deserializer: D) -> Result<Tz, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    raw.trim().parse::<Tz>().map_err(|_| {
        de::Error::invalid_value(de::Unexpected::Str(&raw), &"an IANA zone like America/Chicago")
    })
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        if let Err(e) = config.validate() {
            error!("Invalid application config: {e}");
            return Err(rocket);
        }
        info!(
            "Polls use time zone {}, rate limit {} per {}s",
            config.poll_time_zone, config.rate_limit, config.rate_window
        );

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    db_uri: String,
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
    #[serde(default = "default_db_timeout")]
    db_timeout: u64,
}

fn default_db_name() -> String {
    "matchday".to_string()
}

const fn default_db_timeout() -> u64 {
    5
}

/// A fairing that loads the database config, connects to MongoDB, ensures
/// the unique indexes exist, and places the resulting [`Db`] into managed
/// state. With `db_uri = "memory:"` an empty in-process store is used instead.
pub struct DatabaseFairing;

#[rocket::async_trait]
impl Fairing for DatabaseFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // A store injected by the caller wins.
        if rocket.state::<Db>().is_some() {
            return Ok(rocket);
        }

        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        if config.db_uri == MEMORY_URI {
            warn!("Using the in-memory store, nothing will be persisted");
            rocket = rocket.manage(Db::new(Arc::new(MemoryStore::new())));
            return Ok(rocket);
        }

        info!("Loaded database config, connecting...");
        let timeout = Duration::from_secs(config.db_timeout);
        // Construct the connection.
        let mut options = match ClientOptions::parse(&config.db_uri).await {
            Ok(options) => options,
            Err(e) => {
                error!("Invalid `db_uri`: {e}");
                return Err(rocket);
            }
        };
        options.app_name = Some("matchday-backend".to_string());
        options.connect_timeout = Some(timeout);
        options.server_selection_timeout = Some(timeout);
        let client = match MongoClient::with_options(options) {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(&config.db_name);

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        rocket = rocket.manage(Db::new(Arc::new(MongoStore::new(db, timeout))));
        Ok(rocket)
    }
}

#[cfg(test)]
mod tests {
    use rocket::figment::{providers::Serialized, Figment};

    use super::*;

    #[test]
    fn defaults() {
        let config: Config = Figment::new().extract().unwrap();
        assert_eq!(config.reference_zone(), &Tz::America__Chicago);
        assert_eq!(config.rate_limit(), 100);
        assert_eq!(config.rate_window(), Duration::from_secs(60));
        assert_eq!(config.ipinfo_token(), None);
        assert_eq!(config.static_dir(), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn overrides() {
        let config: Config = Figment::new()
            .merge(Serialized::default("poll_time_zone", "Europe/Madrid"))
            .merge(Serialized::default("rate_limit", 3))
            .merge(Serialized::default("ipinfo_token", ""))
            .extract()
            .unwrap();
        assert_eq!(config.reference_zone(), &Tz::Europe__Madrid);
        assert_eq!(config.rate_limit(), 3);
        // An empty token counts as none.
        assert_eq!(config.ipinfo_token(), None);

        for bad in ["Central", "-06:00", "America/Springfield"] {
            let bad_zone = Figment::new().merge(Serialized::default("poll_time_zone", bad));
            assert!(bad_zone.extract::<Config>().is_err(), "{bad:?} should not parse");
        }

        let zero: Config = Figment::new()
            .merge(Serialized::default("rate_window", 0))
            .extract()
            .unwrap();
        assert!(zero.validate().is_err());
    }
}
