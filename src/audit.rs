//! Audit trail of who called the API from where.
//!
//! Every request except CORS preflights produces one [`AuditEvent`], logged
//! under the `audit` target. Requests from public addresses are geolocated
//! through ipinfo.io first, in a background task, so the lookup never delays
//! or fails the response.

use std::fmt::{self, Display, Formatter};
use std::net::IpAddr;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::Method,
    serde::json::serde_json,
    Build, Data, Request, Rocket,
};
use serde::{Deserialize, Serialize};

use crate::config::Config;

/// Log target for audit events.
pub const AUDIT_TARGET: &str = "audit";

/// Path of the registration endpoint, whose body names the caller.
const REGISTER_PATH: &str = "/api/v1/register";

/// How much of a registration body is inspected for the names.
const PEEK_LIMIT: usize = 4096;

const IPINFO_TIMEOUT: Duration = Duration::from_secs(3);

/// Where a public address is, according to ipinfo.io.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeoInfo {
    pub country: String,
    pub region: String,
    pub city: String,
    /// The network operator.
    #[serde(rename(deserialize = "org"))]
    pub isp: String,
    /// `"lat,lng"`.
    pub loc: String,
}

impl GeoInfo {
    /// Latitude and longitude, if ipinfo gave a location.
    pub fn lat_lng(&self) -> Option<(&str, &str)> {
        self.loc.split_once(',')
    }
}

/// One API call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub time: DateTime<Utc>,
    pub ip: Option<IpAddr>,
    pub method: String,
    pub path: String,
    pub user_agent: String,
    pub referer: Option<String>,
    /// Only set for registrations.
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub geo: Option<GeoInfo>,
}

impl Display for AuditEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let ip = self
            .ip
            .map_or_else(|| "-".to_string(), |ip| ip.to_string());
        write!(
            f,
            "{} {} {} from {ip} at {} ua={:?}",
            self.method,
            self.path,
            match (&self.first_name, &self.last_name) {
                (Some(first), Some(last)) => format!("by {first} {last}"),
                _ => "anonymous".to_string(),
            },
            self.time.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.user_agent,
        )?;
        if let Some(referer) = &self.referer {
            write!(f, " referer={referer}")?;
        }
        if let Some(geo) = &self.geo {
            write!(f, " country={} city={} isp={:?}", geo.country, geo.city, geo.isp)?;
            if let Some((lat, lng)) = geo.lat_lng() {
                write!(f, " lat={lat} lng={lng}")?;
            }
        }
        Ok(())
    }
}

/// The name pair sent to the registration endpoint.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterNames {
    first_name: String,
    last_name: String,
}

/// Whether geolocating `ip` could tell us anything.
pub fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => {
            !(ip.is_private()
                || ip.is_loopback()
                || ip.is_link_local()
                || ip.is_unspecified()
                || ip.is_broadcast())
        }
        IpAddr::V6(ip) => {
            let unique_local = (ip.segments()[0] & 0xfe00) == 0xfc00;
            let link_local = (ip.segments()[0] & 0xffc0) == 0xfe80;
            match ip.to_ipv4_mapped() {
                Some(v4) => is_public(IpAddr::V4(v4)),
                None => !(ip.is_loopback() || ip.is_unspecified() || unique_local || link_local),
            }
        }
    }
}

/// Looks up addresses with ipinfo.io.
#[derive(Clone)]
pub struct GeoLocator {
    client: reqwest::Client,
    token: String,
}

impl GeoLocator {
    pub fn new(token: &str) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(IPINFO_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            token: token.to_string(),
        })
    }

    pub async fn lookup(&self, ip: IpAddr) -> reqwest::Result<GeoInfo> {
        self.client
            .get(format!("https://ipinfo.io/{ip}"))
            .bearer_auth(&self.token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}

/// A rocket fairing that writes the audit trail.
/// Must be attached after [`crate::config::ConfigFairing`].
pub struct AuditFairing;

#[rocket::async_trait]
impl Fairing for AuditFairing {
    fn info(&self) -> Info {
        Info {
            name: "Audit",
            kind: Kind::Ignite | Kind::Request,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(token) = rocket.state::<Config>().and_then(Config::ipinfo_token) else {
            info!("No `ipinfo_token` configured, audit events will not be geolocated");
            return Ok(rocket);
        };
        match GeoLocator::new(token) {
            Ok(locator) => Ok(rocket.manage(locator)),
            Err(e) => {
                error!("Failed to build the ipinfo client: {e}");
                Err(rocket)
            }
        }
    }

    async fn on_request(&self, req: &mut Request<'_>, data: &mut Data<'_>) {
        if req.method() == Method::Options {
            return;
        }

        let path = req.uri().path().to_string();
        let names = if req.method() == Method::Post && path == REGISTER_PATH {
            serde_json::from_slice::<RegisterNames>(data.peek(PEEK_LIMIT).await).ok()
        } else {
            None
        };
        let headers = req.headers();
        let event = AuditEvent {
            time: Utc::now(),
            ip: req.client_ip(),
            method: req.method().as_str().to_string(),
            path,
            user_agent: headers.get_one("User-Agent").unwrap_or_default().to_string(),
            referer: headers.get_one("Referer").map(str::to_string),
            first_name: names.as_ref().map(|n| n.first_name.clone()),
            last_name: names.map(|n| n.last_name),
            geo: None,
        };

        let locator = req.rocket().state::<GeoLocator>().cloned();
        match (locator, event.ip.filter(|ip| is_public(*ip))) {
            (Some(locator), Some(ip)) => {
                rocket::tokio::spawn(async move {
                    let mut event = event;
                    match locator.lookup(ip).await {
                        Ok(geo) => event.geo = Some(geo),
                        Err(e) => {
                            log::debug!(target: AUDIT_TARGET, "Geo lookup for {ip} failed: {e}")
                        }
                    }
                    log::info!(target: AUDIT_TARGET, "{event}");
                });
            }
            _ => log::info!(target: AUDIT_TARGET, "{event}"),
        }
    }
}
