//! Job processing stages.
//!
//! - **fetch**: Download input resources with bounded parallelism
//! - **render**: Transform and upload each rendition concurrently
//! - **orchestrator**: Runs a job through every stage and decides the ack

pub mod fetch;
pub mod orchestrator;
pub mod render;

pub use fetch::ResourceFetcher;
pub use orchestrator::{JobOrchestrator, JobReport, JobStage};
pub use render::{rendition_key, RenditionFailure, RenditionOutput, RenditionPipeline};
