pub mod auth;
pub mod locations;
pub mod map;
pub mod metrics;
pub mod profiles;
pub mod tracking;
