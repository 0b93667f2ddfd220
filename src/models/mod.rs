// Model provisioning and the shared inference handle
//
// Weights, tokenization and sampling belong to the generation server; this
// module only decides when a handle exists and who may use it.

pub mod handle;
pub mod http_backend;
pub mod loader;
pub mod provision;

pub use handle::{
    GenerationLease, InferenceHandle, InferenceModel, ModelFactory, PartialSender, Turn,
};
pub use http_backend::{HttpInferenceModel, HttpModelFactory, SamplingParams};
pub use loader::{is_provisioning_failure, AcquireOutcome, LeaseOutcome, ResourceLoader};
pub use provision::{ArtifactFetcher, GitArtifactFetcher};
