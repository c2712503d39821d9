use std::path::PathBuf;

use rocket::{
    fairing::{Fairing, Info, Kind},
    http::{Header, Status},
    Request, Response, Route,
};

pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
pub const ALLOWED_HEADERS: &str =
    "Origin, Content-Type, Accept, Authorization, X-Requested-With, ngrok-skip-browser-warning";
pub const EXPOSED_HEADERS: &str = "Content-Length, Content-Type";

pub fn routes() -> Vec<Route> {
    routes![preflight]
}

/// Answer every CORS preflight. The headers are added by [`CorsFairing`].
#[options("/<_path..>")]
fn preflight(_path: PathBuf) -> Status {
    Status::NoContent
}

/// A rocket fairing that lets browsers on any origin call the API.
#[derive(Debug, Copy, Clone)]
pub struct CorsFairing;

#[rocket::async_trait]
impl Fairing for CorsFairing {
    fn info(&self) -> Info {
        Info {
            name: "CORS",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, req: &'r Request<'_>, res: &mut Response<'r>) {
        // Credentials are allowed, so the origin is echoed rather than `*`.
        let origin = req.headers().get_one("Origin").unwrap_or("*").to_string();
        res.set_header(Header::new("Access-Control-Allow-Origin", origin));
        res.set_header(Header::new("Vary", "Origin"));
        res.set_header(Header::new("Access-Control-Allow-Methods", ALLOWED_METHODS));
        res.set_header(Header::new("Access-Control-Allow-Headers", ALLOWED_HEADERS));
        res.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
        res.set_header(Header::new("Access-Control-Expose-Headers", EXPOSED_HEADERS));
    }
}

#[cfg(test)]
mod tests {
    use rocket::{http::Header, local::asynchronous::Client};

    use super::*;

    #[backend_test]
    async fn preflight_is_answered(client: Client) {
        let response = client
            .options("/api/v1/votes")
            .header(Header::new("Origin", "https://example.org"))
            .header(Header::new("Access-Control-Request-Method", "POST"))
            .dispatch()
            .await;

        assert_eq!(Status::NoContent, response.status());
        let headers = response.headers();
        assert_eq!(
            Some("https://example.org"),
            headers.get_one("Access-Control-Allow-Origin")
        );
        assert_eq!(Some(ALLOWED_METHODS), headers.get_one("Access-Control-Allow-Methods"));
        assert_eq!(Some("true"), headers.get_one("Access-Control-Allow-Credentials"));
    }

    #[backend_test]
    async fn errors_carry_cors_headers(client: Client) {
        let response = client.get("/api/v1/nowhere").dispatch().await;
        assert_eq!(Status::NotFound, response.status());
        assert_eq!(Some("*"), response.headers().get_one("Access-Control-Allow-Origin"));
    }
}
