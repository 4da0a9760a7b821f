//! `jiji` core -- validators, the replicated store's entity model, and the
//! endpoint-list codec.
//!
//! This crate provides the foundation layer shared by the reconciliation
//! daemon's components:
//!
//! - **Validators** ([`validators`]): pure pass/fail predicates over
//!   store-sourced strings, plus the SQL-quoting primitive.
//! - **Model** ([`model`]): typed views over the store's `servers` and
//!   `containers` rows, and the in-memory `PeerState` derived from the
//!   mesh each tick.
//! - **Endpoints** ([`endpoints`]): the JSON array codec used by the
//!   store's `endpoints` column.

pub mod endpoints;
pub mod model;
pub mod validators;

pub use endpoints::{encode_endpoints, parse_endpoints};
pub use model::{
    ContainerRecord, HealthStatus, HealthTransition, PeerState, ServerRecord,
};
pub use validators::{
    is_valid_cidr, is_valid_container_id, is_valid_endpoint, is_valid_ipv4, is_valid_ipv6,
    is_valid_public_key, is_valid_server_id, quote_sql_literal,
};
