pub mod config;
pub mod db;
pub mod error;
pub mod fetch;
pub mod media;
pub mod model;
pub mod report;
pub mod server;
pub mod sync;
pub mod tags;
pub mod voting;
