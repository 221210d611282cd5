pub mod auth;
pub mod files;
pub mod pattern;
pub mod user;
pub mod utils;
