//! Notes Backend Library
//!
//! REST service for users and their notes. This library exposes the modules
//! for testing; the binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod error;
pub mod services;
pub mod state;
pub mod store;
