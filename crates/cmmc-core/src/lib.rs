//! CMMC compliance-tracking core.
//!
//! Weighted practice scoring against an immutable catalog, the assessment
//! status/certification state machine, and the five-step scoping wizard,
//! sharing one deterministic validation rule set.

#![deny(unsafe_code)]

pub mod catalog;
pub mod error;
pub mod lifecycle;
pub mod scoring;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;
pub mod wizard;

pub use catalog::{
    load_assessment_records, organization_ids, Catalog, CatalogSummary, SharedCatalog,
    CANONICAL_OBJECTIVE_COUNT, CANONICAL_PRACTICE_COUNT,
};
pub use error::{CmmcError, CmmcResult, StoreError};
pub use lifecycle::{
    AssessmentLifecycle, AssessmentState, AssessmentTransition, DecertifyTarget, TransitionInputs,
};
pub use scoring::{PracticeScore, ScoreEngine, ScoreReport};
pub use service::{ComplianceService, NewAssessment};
pub use store::{AssessmentStore, ComplianceStore, InMemoryStore, ScopeStore};
pub use types::{
    Asset, AssetCategory, Assessment, AssessmentRecord, AssessmentStatus, AssessmentType, Boundary,
    CertificationStatus, CloudProvider, CmmcLevel, CuiBasics, DiagramInputs, ExternalConnection,
    Finding, GeneratedOutputs, KeyContact, MarkStatus, NetworkSegment, Objective, ObjectiveMark,
    ObjectiveMarks, Practice, ScopeData, ScopeRecord, ScopeRecordWire, ScopeSection, ScopeSource,
    ScopeStatus, SectionUpdate, Severity, SspInputs, WizardStep,
};
pub use validation::{has_blocking, ValidationEngine, ValidationPolicy};
pub use wizard::{ScopeWizard, StepOutcome};
