//! Job dispatch engine.
//!
//! [`pipeline::JobPipeline`] drives one job through name resolution and the
//! three GEF stages (submit, locate output, fetch output).

pub mod pipeline;
