pub mod common;
pub mod session_dto;

pub use common::*;
pub use session_dto::*;
