pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod models;
pub mod slip;
pub mod workers;
