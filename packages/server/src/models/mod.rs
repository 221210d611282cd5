pub mod auth;
pub mod pattern;
pub mod shared;
pub mod user;
