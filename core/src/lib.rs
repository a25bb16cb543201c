//! Compensation rate resolution and aggregation engine.
//!
//! Leaves first:
//!   rate_table:      the layered override configuration
//!   resolver:        effective rate per employee
//!   aggregation:     level / band / company roll-ups and budget use
//!   competitiveness: AS-IS / TO-BE market ratios
//!   scenario:        named snapshots with a derived default
//!   session:         live editing, event bus, durable persistence

pub mod aggregation;
pub mod budget;
pub mod competitiveness;
pub mod config;
pub mod employee;
pub mod error;
pub mod event;
pub mod persistence;
pub mod providers;
pub mod rate_table;
pub mod resolver;
pub mod rng;
pub mod scenario;
pub mod session;
pub mod store;
pub mod types;
