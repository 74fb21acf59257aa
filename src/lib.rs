pub mod app;
pub mod common;
pub mod config;
pub mod docs;
pub mod error;
pub mod hls;
pub mod infrastructure;
pub mod modules;
pub mod notifications;
pub mod routes;
pub mod state;
pub mod workers;

#[cfg(test)]
pub mod testing;
