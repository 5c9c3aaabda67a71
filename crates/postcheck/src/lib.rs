//! # Postcheck
//!
//! Incremental, resumable verification of an internal postcode directory
//! against an external lookup service.
//!
//! ## Overview
//!
//! A postcode is confirmed once the external service returns it for any
//! address. Verifying every address of every postcode is far too slow, so
//! each session samples a bounded random batch of addresses per postcode,
//! stops at the first match, and records every attempt in a cache. The next
//! session only samples addresses the cache has not seen.
//!
//! - [`VerificationEngine`] - the per-postcode sampled lookup loop
//! - [`HopelessReconciler`] - postcode -> post office -> postcode round trip
//!   for postcodes the engine never confirmed
//! - [`report`] - the summary table and the reference list
//! - [`commands`] - the four command-line entry points
//!
//! ## Usage
//!
//! ```rust,no_run
//! use postcheck::{commands, shutdown, PostcheckConfig};
//!
//! async fn example() -> postcheck::Result<()> {
//!     let config = PostcheckConfig::load("postcheck.toml")?;
//!
//!     // Ctrl-C stops the session after the in-flight lookup; the cache is saved.
//!     let report = commands::verify(&config, shutdown::on_ctrl_c()).await?;
//!     println!("{} postcodes confirmed this session", report.matched);
//!
//!     commands::summary(&config).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Statuses
//!
//! | status        | meaning                                                  |
//! |---------------|----------------------------------------------------------|
//! | `confirmed`   | the service returned the postcode at least once          |
//! | `exhausted`   | every address attempted, never confirmed                 |
//! | `unconfirmed` | some addresses not yet attempted                         |

pub mod commands;
pub mod config;
pub mod engine;
pub mod error;
pub mod hopeless;
pub mod report;
pub mod shutdown;

pub use config::{PathsConfig, PostcheckConfig, SessionConfig};
pub use engine::{AttemptStream, PostcodeOutcome, SessionReport, VerificationEngine};
pub use error::{PostcheckError, Result};
pub use hopeless::{HopelessReconciler, HopelessReport};
pub use shutdown::{Shutdown, ShutdownTrigger};
