//! Common test utilities and fixtures.

pub mod fixtures;
pub mod server;
pub mod sinks;
pub mod stores;

#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use server::*;
#[allow(unused_imports)]
pub use sinks::*;
#[allow(unused_imports)]
pub use stores::*;
