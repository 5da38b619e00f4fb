//! Reel Uploadr Library
//!
//! Video upload service: stages an upload, probes its frame size, remuxes it
//! for fast-start playback and stores it under an orientation namespace.
//!
//! # Features
//!
//! - **Orientation Namespaces**: `landscape/`, `portrait/` or `other/` keys
//! - **Fast Start**: `moov` atom moved to the front with a stream copy
//! - **S3 Compatible**: Any S3 endpoint through `aws-sdk-s3`
//! - **Scoped Scratch Files**: Local files never outlive a request
//!
//! # Example
//!
//! ```no_run
//! use reel_uploadr::{config::Config, server::Server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     Server::new(config).run().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod logging;
pub mod media;
pub mod metrics;
pub mod repo;
pub mod router;
pub mod s3;
pub mod server;
pub mod upload;

// Re-export commonly used types
pub use config::Config;
pub use server::Server;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
