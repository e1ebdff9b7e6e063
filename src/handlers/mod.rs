pub mod artwork_handlers;
pub mod caller;
pub mod health_handlers;
pub mod media_handlers;
