pub mod account;
pub mod auth;
pub mod child;
pub mod driver;
pub mod location;
pub mod tracking;
