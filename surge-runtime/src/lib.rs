pub mod message;
pub mod runtime;
pub mod server;

mod error;
mod issuer;

pub use crate::error::{RuntimeError, ServerError};
pub use crate::issuer::HttpIssuer;
pub use crate::runtime::{SurgeCli, SurgeOrchestrator, SurgeRuntime};
pub use crate::server::SurgeServer;
