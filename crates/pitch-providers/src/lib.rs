//! Clients for the external collaborators of the processing pipeline.
//!
//! The orchestrator only sees the traits in [`traits`]. The HTTP adapters in
//! this crate translate each collaborator's wire protocol into a
//! [`DependencyStatus`](pitch_models::DependencyStatus) or a raw analysis
//! report, classifying readiness from structured status fields only.

pub mod analysis;
pub mod config;
pub mod error;
pub mod frames;
pub mod status;
pub mod traits;
pub mod transcription;

pub use analysis::AnthropicAnalysisProvider;
pub use config::ProviderConfig;
pub use error::{ProviderError, ProviderResult};
pub use frames::HttpFrameExtractor;
pub use status::{classify_response, PendingBody, PendingStatus};
pub use traits::{AnalysisProvider, FrameExtractor, Transcriber};
pub use transcription::HttpTranscriber;
