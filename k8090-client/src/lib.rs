//! # k8090-client
//!
//! Host-side driver for the K8090 relay card.
//!
//! This crate provides:
//! - The transport capability surface, with serial and simulated implementations
//! - A connection that sends packets and drains responses after a settle delay
//! - The `K8090` device API with per-relay and per-button handles
//! - Configuration loading from YAML and environment variables

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod simulator;
pub mod transport;

pub use client::{ButtonHandle, RelayHandle, K8090};
pub use config::{ConfigError, ConnectionConfig};
pub use connection::Connection;
pub use error::ClientError;
pub use simulator::{BoardHandle, SimulatedBoard};
pub use transport::{SerialTransport, Transport};
