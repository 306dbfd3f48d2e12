pub mod api;
pub mod board;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod notice;
pub mod notifications;
pub mod permissions;
pub mod pipeline;
pub mod search;
pub mod settings;
pub mod state;
pub mod storage;
pub mod telemetry;
pub mod value_utils;

#[cfg(test)]
mod testing;
