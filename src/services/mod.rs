pub mod artwork_service;
pub mod blob_store;
pub mod error_sink;
pub mod normalizer;
pub mod rate_limiter;
pub mod repository;
pub mod upload_pool;
pub mod validator;
