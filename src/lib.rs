//! Recipe storage, offline sync and recipe generation backend.

pub mod config;
pub mod db;
pub mod models;
pub mod server;
