//! Metadata-key trust and decryption.
//!
//! [`keys::MetadataKeysPipeline`] rebuilds the local key table from the
//! backend, [`trust::TrustEngine`] decides whether the served key may be
//! trusted, and [`signing::TrustSigner`] records trust decisions and
//! pushes re-signed keys back.

pub mod keys;
pub mod models;
pub mod signing;
pub mod trust;

pub use keys::{MetadataKeysPipeline, PipelineOutput};
pub use signing::{SigningOutput, TrustSigner};
pub use trust::{SignatureProblem, TrustEngine, TrustOutput};
