pub mod session;
pub mod user;

pub use session::{ClaimsSnapshot, DeviceBreakdown, DeviceClass, Session, SessionStats};
pub use user::{Role, VerifiedIdentity};
