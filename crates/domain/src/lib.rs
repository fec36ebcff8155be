//! # autotune-domain
//!
//! Pure domain model for the autotune hardware automation engine.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **feature states** (power mode, battery mode, fan speed, …)
//! - Define **events** (typed payloads emitted by listeners)
//! - Define **pipelines** (optional trigger → ordered steps)
//! - Define persisted **settings** and bus **notifications**
//! - Contain all invariant enforcement and event-matching logic
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod sun;
pub mod time;

pub mod event;
pub mod notification;
pub mod pipeline;
pub mod settings;
pub mod state;
