pub mod config;
pub mod contracts;
pub mod db;
pub mod events;
pub mod health;
pub mod models;
pub mod reconciler;
pub mod repos;
pub mod routes;
pub mod services;
