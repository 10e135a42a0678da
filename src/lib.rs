pub mod config;
pub mod db;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod models;
pub mod repository;
pub mod routes;
pub mod services;
