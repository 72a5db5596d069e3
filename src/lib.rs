//! # Retail API Library
//!
//! Core of the retail / rental management service: configuration, database
//! access, business workflows and the HTTP surface.

pub mod auth;
pub mod billing;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod pagination;
pub mod repositories;
pub mod seeds;
pub mod server;
pub mod telemetry;
pub mod validation;
pub use migration;
