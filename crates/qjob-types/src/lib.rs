//! Core data types shared by the qjob crates.
//!
//! - [`Job`], [`JobId`], [`JobStatus`] and [`Backend`] describe a submitted
//!   computation and its lifecycle.
//! - [`Value`], [`Parameters`], [`ResultRecord`] and [`Counts`] carry the
//!   loosely-typed algorithm inputs and outputs.
//!
//! # Job state machine
//!
//! ```text
//!   submit ──→ Queued ──→ Running ──→ Completed
//!                │           │
//!                │           ├──→ Failed
//!                │           │
//!                └───────────┴──→ Cancelled
//! ```

pub mod error;
pub mod job;
pub mod value;

pub use error::{TypesError, TypesResult};
pub use job::{Backend, Job, JobId, JobStatus};
pub use value::{Counts, Parameters, ResultRecord, Value};
