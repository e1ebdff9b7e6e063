//! Artwork marketplace API: transactional artwork creation with concurrent
//! dependent writes and a bounded image upload pool.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
