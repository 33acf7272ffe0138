use crate::catalog::Catalog;
use crate::error::{CmmcError, CmmcResult};
use crate::types::{
    Assessment, AssessmentStatus, CertificationStatus, Finding, ObjectiveMarks,
};
use crate::validation::ValidationEngine;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

/// Legal `(status, certification_status)` pairs of an assessment.
///
/// Certification details live inside `Certified`, so `certified_at` and
/// `certified_by` exist exactly when the assessment is certified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentState {
    Draft,
    InProgress,
    InProgressPending,
    Complete,
    CompletePending,
    Certified {
        certified_at: DateTime<Utc>,
        certified_by: Uuid,
    },
}

impl AssessmentState {
    pub fn status(&self) -> AssessmentStatus {
        match self {
            Self::Draft => AssessmentStatus::Draft,
            Self::InProgress | Self::InProgressPending => AssessmentStatus::InProgress,
            Self::Complete | Self::CompletePending | Self::Certified { .. } => {
                AssessmentStatus::Complete
            }
        }
    }

    pub fn certification_status(&self) -> CertificationStatus {
        match self {
            Self::Draft | Self::InProgress | Self::Complete => CertificationStatus::None,
            Self::InProgressPending | Self::CompletePending => CertificationStatus::Pending,
            Self::Certified { .. } => CertificationStatus::Certified,
        }
    }

    pub fn certified_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Certified { certified_at, .. } => Some(*certified_at),
            _ => None,
        }
    }

    pub fn certified_by(&self) -> Option<Uuid> {
        match self {
            Self::Certified { certified_by, .. } => Some(*certified_by),
            _ => None,
        }
    }

    /// `status/certification_status`, e.g. `complete/pending`.
    pub fn name(&self) -> String {
        format!(
            "{}/{}",
            self.status().as_str(),
            self.certification_status().as_str()
        )
    }

    /// Rebuild the composite state from flat datastore columns.
    pub fn from_columns(
        status: AssessmentStatus,
        certification: CertificationStatus,
        certified_at: Option<DateTime<Utc>>,
        certified_by: Option<Uuid>,
    ) -> CmmcResult<Self> {
        use AssessmentStatus as S;
        use CertificationStatus as C;

        let state = match (status, certification, certified_at, certified_by) {
            (S::Draft, C::None, None, None) => Self::Draft,
            (S::InProgress, C::None, None, None) => Self::InProgress,
            (S::InProgress, C::Pending, None, None) => Self::InProgressPending,
            (S::Complete, C::None, None, None) => Self::Complete,
            (S::Complete, C::Pending, None, None) => Self::CompletePending,
            (S::Complete, C::Certified, Some(certified_at), Some(certified_by)) => {
                Self::Certified {
                    certified_at,
                    certified_by,
                }
            }
            (status, certification, at, by) => {
                return Err(CmmcError::InvalidRecord(format!(
                    "illegal assessment state {}/{} (certified_at set: {}, certified_by set: {})",
                    status.as_str(),
                    certification.as_str(),
                    at.is_some(),
                    by.is_some()
                )))
            }
        };
        Ok(state)
    }
}

/// Target certification status after a decertification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecertifyTarget {
    None,
    Pending,
}

/// Requested lifecycle move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssessmentTransition {
    /// draft -> in_progress
    Begin,
    /// in_progress -> complete
    Complete,
    /// none -> pending
    RequestCertification,
    /// pending -> certified
    Certify { certified_by: Uuid },
    /// certified -> none | pending, clearing certification details
    Decertify { target: DecertifyTarget },
    /// complete -> in_progress; the caller has already authorized the actor
    Reopen,
}

impl AssessmentTransition {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::Complete => "complete",
            Self::RequestCertification => "request_certification",
            Self::Certify { .. } => "certify",
            Self::Decertify { .. } => "decertify",
            Self::Reopen => "reopen",
        }
    }
}

/// Facts a transition may depend on, gathered by the caller.
#[derive(Debug, Clone, Copy)]
pub struct TransitionInputs<'a> {
    pub marks: &'a ObjectiveMarks,
    /// Validation findings for the assessment snapshot. Only set inside the
    /// crate, from a real validation pass; completion is refused without them.
    findings: Option<&'a [Finding]>,
    pub at: DateTime<Utc>,
}

impl<'a> TransitionInputs<'a> {
    pub fn new(marks: &'a ObjectiveMarks) -> Self {
        Self {
            marks,
            findings: None,
            at: Utc::now(),
        }
    }

    pub(crate) fn with_findings(mut self, findings: &'a [Finding]) -> Self {
        self.findings = Some(findings);
        self
    }

    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }
}

/// Assessment status / certification state machine.
///
/// Transitions are computed against a snapshot and only assigned on success,
/// so a rejected transition leaves the assessment untouched.
pub struct AssessmentLifecycle;

impl AssessmentLifecycle {
    /// Compute the state a transition would produce without mutating anything.
    pub fn next_state(
        assessment: &Assessment,
        transition: AssessmentTransition,
        inputs: &TransitionInputs<'_>,
    ) -> CmmcResult<AssessmentState> {
        use AssessmentState as St;

        let current = assessment.state;
        let reject = |reason: &str| {
            Err(CmmcError::invalid_transition(
                current.name(),
                transition.name(),
                reason,
            ))
        };

        match (transition, current) {
            (AssessmentTransition::Begin, St::Draft) => {
                if assessment.scope_id.is_none() && inputs.marks.is_empty() {
                    return reject("no scoping input: link a scope record or record objective marks");
                }
                Ok(St::InProgress)
            }
            (AssessmentTransition::Begin, _) => reject("assessment already started"),

            (AssessmentTransition::Complete, St::InProgress | St::InProgressPending) => {
                if assessment.computed_score.is_none() {
                    return Err(CmmcError::IncompleteAssessment(
                        "score has never been computed".to_string(),
                    ));
                }
                let Some(findings) = inputs.findings else {
                    return Err(CmmcError::IncompleteAssessment(
                        "completion requires a validation pass".to_string(),
                    ));
                };
                let gaps = findings.iter().filter(|f| f.is_blocking()).count();
                if gaps > 0 {
                    return Err(CmmcError::IncompleteAssessment(format!(
                        "{} unresolved required-field gap(s)",
                        gaps
                    )));
                }
                Ok(if current == St::InProgressPending {
                    St::CompletePending
                } else {
                    St::Complete
                })
            }
            (AssessmentTransition::Complete, _) => reject("only in-progress assessments complete"),

            (AssessmentTransition::RequestCertification, St::InProgress) => {
                Ok(St::InProgressPending)
            }
            (AssessmentTransition::RequestCertification, St::Complete) => Ok(St::CompletePending),
            (AssessmentTransition::RequestCertification, St::Draft) => {
                reject("draft assessments cannot request certification")
            }
            (AssessmentTransition::RequestCertification, _) => {
                reject("certification already requested or granted")
            }

            (AssessmentTransition::Certify { certified_by }, St::CompletePending) => {
                if certified_by.is_nil() {
                    return reject("certifying actor identity is required");
                }
                Ok(St::Certified {
                    certified_at: inputs.at,
                    certified_by,
                })
            }
            (AssessmentTransition::Certify { .. }, St::InProgressPending) => {
                Err(CmmcError::IncompleteAssessment(
                    "certification requires a complete assessment".to_string(),
                ))
            }
            (AssessmentTransition::Certify { .. }, _) => reject("certification is not pending"),

            (AssessmentTransition::Decertify { target }, St::Certified { .. }) => Ok(match target {
                DecertifyTarget::None => St::Complete,
                DecertifyTarget::Pending => St::CompletePending,
            }),
            (AssessmentTransition::Decertify { .. }, _) => reject("assessment is not certified"),

            (AssessmentTransition::Reopen, St::Complete) => Ok(St::InProgress),
            (AssessmentTransition::Reopen, St::CompletePending) => Ok(St::InProgressPending),
            (AssessmentTransition::Reopen, St::Certified { .. }) => {
                reject("decertify before reopening")
            }
            (AssessmentTransition::Reopen, _) => reject("only complete assessments reopen"),
        }
    }

    /// Apply a transition; on error the assessment is unchanged.
    pub fn apply(
        assessment: &mut Assessment,
        transition: AssessmentTransition,
        inputs: &TransitionInputs<'_>,
    ) -> CmmcResult<AssessmentState> {
        let next = Self::next_state(assessment, transition, inputs)?;
        info!(
            assessment_id = %assessment.id,
            transition = transition.name(),
            from = %assessment.state.name(),
            to = %next.name(),
            "assessment transition"
        );
        assessment.state = next;
        Ok(next)
    }

    pub fn begin(assessment: &mut Assessment, marks: &ObjectiveMarks) -> CmmcResult<AssessmentState> {
        Self::apply(
            assessment,
            AssessmentTransition::Begin,
            &TransitionInputs::new(marks),
        )
    }

    /// Complete the assessment after running `validator` over it.
    pub fn complete(
        assessment: &mut Assessment,
        marks: &ObjectiveMarks,
        catalog: &Catalog,
        validator: &ValidationEngine,
    ) -> CmmcResult<AssessmentState> {
        let findings = validator.validate_assessment(assessment, marks, catalog);
        Self::complete_validated(assessment, marks, &findings)
    }

    /// `findings` must come from the validator; the service adds scope-link
    /// findings on top of the assessment's own.
    pub(crate) fn complete_validated(
        assessment: &mut Assessment,
        marks: &ObjectiveMarks,
        findings: &[Finding],
    ) -> CmmcResult<AssessmentState> {
        Self::apply(
            assessment,
            AssessmentTransition::Complete,
            &TransitionInputs::new(marks).with_findings(findings),
        )
    }

    pub fn request_certification(assessment: &mut Assessment) -> CmmcResult<AssessmentState> {
        let marks = ObjectiveMarks::new();
        Self::apply(
            assessment,
            AssessmentTransition::RequestCertification,
            &TransitionInputs::new(&marks),
        )
    }

    pub fn certify(
        assessment: &mut Assessment,
        certified_by: Uuid,
        at: DateTime<Utc>,
    ) -> CmmcResult<AssessmentState> {
        let marks = ObjectiveMarks::new();
        Self::apply(
            assessment,
            AssessmentTransition::Certify { certified_by },
            &TransitionInputs::new(&marks).at(at),
        )
    }

    pub fn decertify(
        assessment: &mut Assessment,
        target: DecertifyTarget,
    ) -> CmmcResult<AssessmentState> {
        let marks = ObjectiveMarks::new();
        Self::apply(
            assessment,
            AssessmentTransition::Decertify { target },
            &TransitionInputs::new(&marks),
        )
    }

    pub fn reopen(assessment: &mut Assessment) -> CmmcResult<AssessmentState> {
        let marks = ObjectiveMarks::new();
        Self::apply(
            assessment,
            AssessmentTransition::Reopen,
            &TransitionInputs::new(&marks),
        )
    }
}
