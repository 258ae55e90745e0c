pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod models;
pub mod site;
pub mod storage;
pub mod tracking;
