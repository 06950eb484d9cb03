pub mod app;
pub mod auth;
pub mod bot;
pub mod config;
pub mod db;
pub mod error;
pub mod memory;
pub mod scheduling;
pub mod state;
