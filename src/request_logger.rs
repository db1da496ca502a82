use rocket::fairing::{Fairing, Info, Kind};
use rocket::{Data, Request, Response};
use std::time::Instant;

use crate::auth::guards::AuthenticatedAccount;

/// Fairing to log one line per HTTP request with timing and the caller's account
pub struct RequestLogger;

#[rocket::async_trait]
impl Fairing for RequestLogger {
    fn info(&self) -> Info {
        Info {
            name: "Request Logger",
            kind: Kind::Request | Kind::Response,
        }
    }

    async fn on_request(&self, request: &mut Request<'_>, _: &mut Data<'_>) {
        request.local_cache(Instant::now);
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let elapsed_ms = request.local_cache(Instant::now).elapsed().as_secs_f64() * 1000.0;
        // Set by the authentication guard; absent for anonymous requests.
        let account = request.local_cache(AuthenticatedAccount::default);

        match account.0 {
            Some(id) => log::info!(
                "{} {} -> {} ({:.2}ms) account={}",
                request.method(),
                request.uri(),
                response.status().code,
                elapsed_ms,
                id
            ),
            None => log::info!(
                "{} {} -> {} ({:.2}ms)",
                request.method(),
                request.uri(),
                response.status().code,
                elapsed_ms
            ),
        }
    }
}
