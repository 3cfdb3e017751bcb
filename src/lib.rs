pub mod activity;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod models;
pub mod notify;
pub mod routes;
pub mod schema;
pub mod state;
