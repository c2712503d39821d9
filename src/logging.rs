use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use log::LevelFilter;
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Header, StatusClass},
    request::{FromRequest, Outcome},
    Data, Orbit, Request, Response, Rocket,
};

/// Response header carrying the request's ID, for matching client reports to log lines.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// A unique identifier for a particular request, and when it arrived.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RequestId {
    id: usize,
    received: Instant,
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl RequestId {
    /// Atomically get the next ID. This wraps around back to zero if you somehow exceed a usize.
    pub fn next() -> RequestId {
        static REQUEST_ID_COUNTER: AtomicUsize = AtomicUsize::new(0);
        RequestId {
            id: REQUEST_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            received: Instant::now(),
        }
    }

    /// Milliseconds since the request arrived.
    pub fn elapsed_ms(&self) -> u128 {
        self.received.elapsed().as_millis()
    }
}

/// Allow the ID to be accessed via request guard.
#[rocket::async_trait]
impl<'r> FromRequest<'r> for &'r RequestId {
    type Error = (); // No errors possible, use the `!` type once stabilised.

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        Outcome::Success(req.local_cache(RequestId::next))
    }
}

/// A rocket fairing that does global logging, e.g. logging every request and response.
#[derive(Debug, Copy, Clone)]
pub struct LoggerFairing;

#[rocket::async_trait]
impl Fairing for LoggerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Logger",
            kind: Kind::Liftoff | Kind::Request | Kind::Response | Kind::Shutdown,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let protocol = if rocket.config().tls_enabled() {
            "https"
        } else {
            "http"
        };
        let ip = &rocket.config().address;
        let port = &rocket.config().port;
        info!("Server launched on {protocol}://{ip}:{port}");
        // Our own request lines replace Rocket's from here on.
        log4rs_dynamic_filters::DynamicLevelFilter::set("rocket", LevelFilter::Off);
    }

    async fn on_request(&self, req: &mut Request<'_>, _data: &mut Data<'_>) {
        let id = req.local_cache(RequestId::next);
        let method = req.method();
        let uri = req.uri();
        info!("->req{id} {method} {uri}");
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        let id = req.local_cache(RequestId::next);
        let code = res.status();
        let route = match req.route() {
            Some(r) => match r.name {
                Some(ref name) => format!("{name} ({})", r.uri),
                None => r.uri.to_string(),
            },
            None => "UNKNOWN ROUTE".to_string(),
        };
        res.set_header(Header::new(REQUEST_ID_HEADER, id.to_string()));

        let log_msg = format!("<-rsp{id} {code} {route} in {}ms", id.elapsed_ms());
        match code.class() {
            StatusClass::ServerError => error!("{log_msg}"),
            StatusClass::ClientError => warn!("{log_msg}"),
            _ => info!("{log_msg}"),
        }
    }

    async fn on_shutdown(&self, _rocket: &Rocket<Orbit>) {
        warn!("Shutdown requested, stopping gracefully...");
    }
}

#[cfg(test)]
mod tests {
    use rocket::{http::Status, local::asynchronous::Client};

    use super::*;

    #[test]
    fn ids_increase() {
        let first = RequestId::next();
        let second = RequestId::next();
        assert!(second.id > first.id);
    }

    #[backend_test]
    async fn responses_carry_request_ids(client: Client) {
        let first = client.get("/api/v1/players").dispatch().await;
        let second = client.get("/api/v1/players").dispatch().await;
        assert_eq!(Status::Ok, first.status());

        let id = |header: Option<&str>| header.unwrap().parse::<usize>().unwrap();
        let first_id = id(first.headers().get_one(REQUEST_ID_HEADER));
        let second_id = id(second.headers().get_one(REQUEST_ID_HEADER));
        assert!(second_id > first_id);
    }
}
