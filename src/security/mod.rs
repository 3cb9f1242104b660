pub mod clock;
pub mod cors;
pub mod fingerprint;
pub mod headers;
pub mod throttle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use cors::cors_middleware;
pub use fingerprint::{fingerprint_request, ClientFingerprint};
pub use headers::security_headers;
pub use throttle::LoginThrottle;
