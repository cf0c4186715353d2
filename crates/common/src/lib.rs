//! Shared types for Teleclinic call coordination components.

#![warn(clippy::pedantic)]

/// Module for shared identifier newtypes
pub mod types;
