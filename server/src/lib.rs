pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod db;
pub mod models;
pub mod ui;
