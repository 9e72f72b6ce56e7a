// Blastwatch Infrastructure - HTTP Adapter
// Implements: BlastService over the compute proxy's REST endpoints

mod client;
mod error;
mod wire;

pub use client::{HttpBlastService, HttpBlastServiceBuilder};
pub use error::ClientError;
