//! # Gradecast Core
//!
//! Deterministic prediction pipeline for student grades.
//!
//! Raw student fields are folded onto a canonical vocabulary, the subject is
//! validated, a trained artifact is chosen (by curriculum stage or by which
//! assessments are missing), a feature vector is assembled in the exact order
//! that artifact expects, and the model's output is post-processed into a
//! rounded grade, a heuristic confidence and a band.
//!
//! The crate performs no I/O. Trained models and student records arrive
//! through the [`ModelProvider`] and [`StudentRecordSource`] traits.

pub mod confidence;
pub mod config;
pub mod error;
pub mod features;
pub mod normalize;
pub mod predictor;
pub mod record;
pub mod registry;
pub mod response;
pub mod schema;
pub mod selector;
pub mod stage;
pub mod variant;

pub use confidence::{Interpretation, confidence, round_to};
pub use config::{ConfidenceConfig, PipelineConfig, SelectionPolicy, SubjectConfig};
pub use error::{PredictError, PredictResult};
pub use features::{BuildContext, BuiltFeatures, FeatureVector, FeatureVectorBuilder, MISSING};
pub use normalize::FieldNormalizer;
pub use predictor::{PredictionResult, Predictor, PreparedRequest};
pub use record::{FieldValue, InMemoryRecordSource, StudentRecord, StudentRecordSource};
pub use registry::{
    Model, ModelMetadata, ModelProvider, ModelRegistry, RegistryStats, SharedModel,
    StaticModelProvider,
};
pub use response::{ErrorBody, PredictionResponse};
pub use selector::{
    ModelSelector, ModelVariant, ModelVariantKey, Selection, SelectionBasis, all_keys,
};
pub use stage::{Stage, StageClassifier, StageDecision, StageDefinitions, StageReason};
pub use variant::{MissingFieldSet, PrecedenceRule, Variant, VariantDecision};
