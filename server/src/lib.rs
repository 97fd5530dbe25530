//! Tiltball server library.
//!
//! This module exposes the authoritative game components for use in tests
//! and binaries.

pub mod config;
pub mod controller;
pub mod ratings;
pub mod room;
