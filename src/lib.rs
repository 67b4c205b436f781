//! Finds the best Chinese translation pack for every subscribed catalog item
//! and brings the live subscription set in line with those picks.

pub mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod parsers;
pub mod protocol;
pub mod services;

pub use error::{Error, Result};
