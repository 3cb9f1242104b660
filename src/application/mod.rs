mod session_service;

pub use session_service::{
    EstablishedSession, RefreshedSession, SessionOverview, SessionService, ValidatedSession,
};
