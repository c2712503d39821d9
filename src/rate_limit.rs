//! Per-client request throttling.

use std::net::IpAddr;
use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rocket::{
    fairing::{Fairing, Info, Kind},
    http::Status,
    request::{FromRequest, Outcome, Request},
    Build, Rocket, State,
};

use crate::config::Config;

/// Number of tracked clients above which stale windows are swept out.
const SWEEP_THRESHOLD: usize = 10_000;

/// Decides whether a client may make another request.
pub trait RateLimiter: Send + Sync {
    /// Record a request from `client` and return whether it is allowed.
    fn hit(&self, client: IpAddr) -> bool;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

/// At most `limit` requests per client in each window of `window` length.
/// Windows start at a client's first request after the previous one expired.
#[derive(Debug)]
pub struct FixedWindow {
    limit: u32,
    window: Duration,
    clients: DashMap<IpAddr, Window>,
}

impl FixedWindow {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            clients: DashMap::new(),
        }
    }

    /// [`RateLimiter::hit`] with an explicit clock.
    pub fn hit_at(&self, client: IpAddr, now: Instant) -> bool {
        if self.clients.len() > SWEEP_THRESHOLD {
            self.sweep(now);
        }
        let mut entry = self.clients.entry(client).or_insert(Window {
            started: now,
            count: 0,
        });
        let window = entry.value_mut();
        if now.saturating_duration_since(window.started) >= self.window {
            *window = Window {
                started: now,
                count: 0,
            };
        }
        if window.count >= self.limit {
            return false;
        }
        window.count += 1;
        true
    }

    fn sweep(&self, now: Instant) {
        let window = self.window;
        self.clients
            .retain(|_, w| now.saturating_duration_since(w.started) < window);
    }
}

impl RateLimiter for FixedWindow {
    fn hit(&self, client: IpAddr) -> bool {
        self.hit_at(client, Instant::now())
    }
}

/// The rate limiter in managed state.
#[derive(Clone)]
pub struct Limiter(Arc<dyn RateLimiter>);

impl Limiter {
    pub fn new(limiter: Arc<dyn RateLimiter>) -> Self {
        Self(limiter)
    }
}

impl Deref for Limiter {
    type Target = dyn RateLimiter;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

/// A fairing that places a [`FixedWindow`] limiter built from the
/// application config into managed state, unless a limiter is already managed.
/// Must be attached after [`crate::config::ConfigFairing`].
pub struct RateLimitFairing;

#[rocket::async_trait]
impl Fairing for RateLimitFairing {
    fn info(&self) -> Info {
        Info {
            name: "Rate limit",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, rocket: Rocket<Build>) -> rocket::fairing::Result {
        if rocket.state::<Limiter>().is_some() {
            return Ok(rocket);
        }
        let limiter = match rocket.state::<Config>() {
            Some(config) => FixedWindow::new(config.rate_limit(), config.rate_window()),
            None => {
                error!("Rate limiter needs the application config");
                return Err(rocket);
            }
        };
        Ok(rocket.manage(Limiter::new(Arc::new(limiter))))
    }
}

/// Request guard that counts the request against the client's quota and
/// fails with 429 once it is used up.
#[derive(Debug, Clone, Copy)]
pub struct Throttle;

#[rocket::async_trait]
impl<'r> FromRequest<'r> for Throttle {
    type Error = ();

    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let Some(limiter) = req.guard::<&State<Limiter>>().await.succeeded() else {
            return Outcome::Success(Throttle);
        };
        // Requests without a known peer address (local clients) are not counted.
        let Some(client) = req.client_ip() else {
            return Outcome::Success(Throttle);
        };
        if limiter.hit(client) {
            Outcome::Success(Throttle)
        } else {
            warn!("Rate limit exceeded for {client}");
            Outcome::Failure((Status::TooManyRequests, ()))
        }
    }
}
