pub mod pattern;
pub mod user;
