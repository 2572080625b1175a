#![doc = "artworks-report-core: pipeline library for artworks-report."]

//! This crate contains the data model, the external-service seams and the
//! report pipeline: config → query → shape → render → convert → notify.
//! The CLI crate only parses arguments, wires the production collaborators
//! together and maps failures to exit codes.
//!
//! # Usage
//! Build a [`pipeline::Pipeline`] from its collaborators and call
//! [`pipeline::Pipeline::run`] with a config path and a [`config::RunContext`].

pub mod config;
pub mod contract;
pub mod convert;
pub mod error;
pub mod load_config;
pub mod notify;
pub mod pipeline;
pub mod query;
pub mod render;
pub mod shape;

pub use config::{ReportDefinition, RunContext};
pub use error::{
    ConfigError, ConversionError, NotifyError, PipelineError, QueryError, RenderError, Stage,
};
