//! Trolley Core - Shared cart types library.
//!
//! This crate provides the common types used across all Trolley components:
//! - `cart` - The cart state/synchronization engine
//! - storefront binaries that render cart state
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no HTTP clients, no storage.
//! This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, plus the canonical
//!   [`Cart`](types::Cart) and [`CartLine`](types::CartLine) shapes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
