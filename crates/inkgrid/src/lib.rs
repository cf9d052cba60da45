//! High-level facade for the `inkgrid-*` workspace.
//!
//! This crate provides:
//! - re-exports of the stage crates (`core`, `grid`, `ink`, `matching`),
//! - the [`Engine`], which runs photo → grid → ink pattern → registry match
//!   and writes one audit record per verification,
//! - the JSON request/response shapes in [`api`],
//! - (feature `image`) decoding of PNG/JPEG bytes.
//!
//! ## Quickstart
//!
//! ```no_run
//! use inkgrid::matching::InMemoryRegistry;
//! use inkgrid::Engine;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = InMemoryRegistry::load_json("registry.json")?;
//! let bytes = std::fs::read("tag.jpg")?;
//! let engine = Engine::default();
//! let scan = engine.scan_and_verify(&registry, &bytes, "standard")?;
//! println!("{}", serde_json::to_string_pretty(&scan)?);
//! # Ok(())
//! # }
//! ```

pub mod api;
mod config;
mod error;
mod session;

pub use inkgrid_core as core;
pub use inkgrid_grid as grid;
pub use inkgrid_ink as ink;
pub use inkgrid_match as matching;

pub use api::{DetectPatternResponse, ScanResponse, VerifyRequest, VerifyResponse};
pub use config::EngineConfig;
pub use error::{ConfigError, ValidationError, VerifyError};
pub use session::{Analysis, Engine};

#[cfg(feature = "image")]
pub use session::decode_image;
