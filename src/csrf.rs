//! Double-submit CSRF tokens for the create form.
//!
//! `GET /add` hands out a random token both as a cookie and as a hidden form
//! field; `POST /add` is only accepted when the two match.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::HttpRequest;
use rand::RngCore;

pub const CSRF_COOKIE: &str = "csrf_token";
pub const CSRF_FIELD: &str = "csrf_token";

pub fn generate_token() -> String {
    let mut buf = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut buf);
    hex::encode(buf)
}

pub fn token_cookie(token: &str) -> Cookie<'static> {
    Cookie::build(CSRF_COOKIE, token.to_owned())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .finish()
}

/// Reuses the token already held by the browser so several open tabs keep working.
pub fn current_or_new(req: &HttpRequest) -> String {
    req.cookie(CSRF_COOKIE)
        .map(|c| c.value().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(generate_token)
}

pub fn verify(req: &HttpRequest, submitted: Option<&str>) -> bool {
    let Some(cookie) = req.cookie(CSRF_COOKIE) else { return false };
    match submitted {
        Some(s) if !s.is_empty() => constant_time_eq(cookie.value().as_bytes(), s.as_bytes()),
        _ => false,
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
