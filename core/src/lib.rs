//! Telecom Pulse: synthetic telecom-complaint generation, daily health
//! aggregation, SQLite loading, and read-only analytics.
//!
//! Data flows strictly one way:
//!   complaint_generator -> metrics_aggregator -> store -> analytics -> report

pub mod analytics;
pub mod complaint_generator;
pub mod complaint_text;
pub mod config;
pub mod csv_export;
pub mod error;
pub mod event;
pub mod metrics_aggregator;
pub mod pipeline;
pub mod report;
pub mod rng;
pub mod store;
pub mod types;
