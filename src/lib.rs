pub mod artifact;
pub mod config;
pub mod dates;
pub mod db;
pub mod error;
pub mod executor;
pub mod gateway;
pub mod generator;
pub mod llm;
pub mod normalizer;
pub mod prompt;
pub mod schema_context;
pub mod telemetry;
pub mod templates;

pub use artifact::{
    GeneratedArtifact, GenerationRequest, GenerationResponse, SchemaHint, Target, TemplateArtifact,
};
pub use error::{PipelineError, Result};
pub use normalizer::{normalize, Normalizer, RepairStrategy};
