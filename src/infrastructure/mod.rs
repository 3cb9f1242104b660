pub mod credentials;
pub mod db;
pub mod store;
