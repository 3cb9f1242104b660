use actix_web::http::header;
use actix_web::HttpRequest;

use crate::security::{fingerprint_request, ClientFingerprint};

/// Client IP as seen by actix: Forwarded/X-Forwarded-For when present,
/// otherwise the peer address. Deployments sit behind a proxy that
/// overwrites those headers; exposed directly, a client could spoof them
/// and mint itself fresh throttle keys.
pub fn client_ip(req: &HttpRequest) -> Option<String> {
    req.connection_info()
        .realip_remote_addr()
        .map(|addr| addr.to_string())
}

pub fn user_agent(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(|ua| ua.to_string())
}

/// Throttle identity for the calling client, derived from whatever origin
/// and agent signals the request carries.
pub fn fingerprint_from_request(req: &HttpRequest) -> ClientFingerprint {
    let ip = client_ip(req);
    let agent = user_agent(req);
    fingerprint_request(ip.as_deref(), agent.as_deref())
}
