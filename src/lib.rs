pub mod config;
pub mod mission;
pub mod pack;
pub mod validate;
