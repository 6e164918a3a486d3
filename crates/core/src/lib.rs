//! Domain layer for the BridgIt liaison service.
//!
//! Holds the read-only configuration view (logical service name to GEF
//! service ID), the per-request job types, and the MIME sniffer used to tag
//! job outputs. Nothing in here performs I/O beyond loading the config file.

pub mod config;
pub mod error;
pub mod job;
pub mod sniff;
