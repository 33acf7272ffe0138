use crate::catalog::SharedCatalog;
use crate::error::{CmmcError, CmmcResult};
use crate::lifecycle::{AssessmentLifecycle, AssessmentTransition, TransitionInputs};
use crate::scoring::{ScoreEngine, ScoreReport};
use crate::store::ComplianceStore;
use crate::types::{
    Assessment, AssessmentStatus, AssessmentType, CertificationStatus, CmmcLevel, Finding,
    ObjectiveMarks, ScopeData, ScopeRecord, SectionUpdate,
};
use crate::validation::{has_blocking, ValidationEngine, ValidationPolicy};
use crate::wizard::{ScopeWizard, StepOutcome};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Inputs for opening a new assessment.
#[derive(Debug, Clone)]
pub struct NewAssessment {
    pub org_id: Uuid,
    pub level: CmmcLevel,
    pub assessment_type: AssessmentType,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
    pub scope_id: Option<Uuid>,
}

/// Read-modify-write orchestration over the store.
///
/// Each operation loads the current snapshot, runs the pure domain step on a
/// copy, and persists with the snapshot's `updated_at` as the concurrency
/// token. A concurrent writer surfaces as `StaleWrite`.
pub struct ComplianceService {
    store: Arc<dyn ComplianceStore>,
    scorer: ScoreEngine,
    wizard: ScopeWizard,
}

impl ComplianceService {
    pub fn new(catalog: SharedCatalog, store: Arc<dyn ComplianceStore>) -> Self {
        Self::with_policy(catalog, store, ValidationPolicy::default())
    }

    pub fn with_policy(
        catalog: SharedCatalog,
        store: Arc<dyn ComplianceStore>,
        policy: ValidationPolicy,
    ) -> Self {
        Self {
            store,
            scorer: ScoreEngine::new(catalog),
            wizard: ScopeWizard::new(ValidationEngine::new(policy)),
        }
    }

    pub fn catalog(&self) -> &SharedCatalog {
        self.scorer.catalog()
    }

    fn validator(&self) -> &ValidationEngine {
        self.wizard.validator()
    }

    // -----------------------------------------------------------------------
    // Assessments
    // -----------------------------------------------------------------------

    #[instrument(skip(self, request), fields(org_id = %request.org_id))]
    pub async fn create_assessment(&self, request: NewAssessment) -> CmmcResult<Assessment> {
        let mut assessment = Assessment::new(
            request.org_id,
            request.level,
            request.assessment_type,
            request.start_date,
            request.target_date,
        );
        if let Some(scope_id) = request.scope_id {
            let scope = self.linkable_scope(&assessment, scope_id).await?;
            assessment = assessment.with_scope(scope.id);
        }
        let stored = self.store.insert_assessment(assessment).await?;
        info!(assessment_id = %stored.id, level = %stored.level, "assessment created");
        Ok(stored)
    }

    pub async fn assessment(&self, id: Uuid) -> CmmcResult<Assessment> {
        self.store
            .get_assessment(&id)
            .await?
            .ok_or(CmmcError::NotFound {
                entity: "assessment",
                id,
            })
    }

    pub async fn marks(&self, assessment_id: Uuid) -> CmmcResult<ObjectiveMarks> {
        self.store.get_marks(&assessment_id).await
    }

    /// Link a scope record to an assessment. Each scope record backs at most
    /// one assessment.
    #[instrument(skip(self))]
    pub async fn link_scope(&self, assessment_id: Uuid, scope_id: Uuid) -> CmmcResult<Assessment> {
        let mut assessment = self.assessment(assessment_id).await?;
        let scope = self.linkable_scope(&assessment, scope_id).await?;
        assessment.scope_id = Some(scope.id);
        self.store.update_assessment(assessment, None).await
    }

    /// Merge marks into the assessment and recompute its score in one write.
    ///
    /// Unknown objectives reject the whole batch; nothing is persisted.
    #[instrument(skip(self, marks), fields(marks = marks.len()))]
    pub async fn record_marks(
        &self,
        assessment_id: Uuid,
        marks: ObjectiveMarks,
    ) -> CmmcResult<(Assessment, ScoreReport)> {
        let mut assessment = self.assessment(assessment_id).await?;
        if matches!(assessment.status(), AssessmentStatus::Complete) {
            return Err(CmmcError::invalid_transition(
                assessment.state().name(),
                "record_marks",
                "reopen the assessment before changing marks",
            ));
        }

        let mut merged = self.store.get_marks(&assessment_id).await?;
        merged.extend(marks);
        let report = self.scorer.recompute(&mut assessment, &merged)?;
        let stored = self
            .store
            .update_assessment(assessment, Some(merged))
            .await?;
        Ok((stored, report))
    }

    /// Recompute the score from the stored marks and persist it.
    #[instrument(skip(self))]
    pub async fn recompute_score(&self, assessment_id: Uuid) -> CmmcResult<(Assessment, ScoreReport)> {
        let mut assessment = self.assessment(assessment_id).await?;
        let marks = self.store.get_marks(&assessment_id).await?;
        let report = self.scorer.recompute(&mut assessment, &marks)?;
        let stored = self.store.update_assessment(assessment, None).await?;
        Ok((stored, report))
    }

    /// Blocking gaps and warnings for the stored assessment, including its
    /// scope link when one exists.
    #[instrument(skip(self))]
    pub async fn validate_assessment(&self, assessment_id: Uuid) -> CmmcResult<Vec<Finding>> {
        let assessment = self.assessment(assessment_id).await?;
        let marks = self.store.get_marks(&assessment_id).await?;
        self.findings_for(&assessment, &marks).await
    }

    /// Apply a lifecycle transition and persist the new state.
    #[instrument(skip(self, transition), fields(action = transition.name()))]
    pub async fn transition(
        &self,
        assessment_id: Uuid,
        transition: AssessmentTransition,
    ) -> CmmcResult<Assessment> {
        let mut assessment = self.assessment(assessment_id).await?;
        let marks = self.store.get_marks(&assessment_id).await?;
        let findings = match transition {
            AssessmentTransition::Complete => self.findings_for(&assessment, &marks).await?,
            _ => Vec::new(),
        };
        AssessmentLifecycle::apply(
            &mut assessment,
            transition,
            &TransitionInputs::new(&marks)
                .with_findings(&findings)
                .at(Utc::now()),
        )?;
        self.store.update_assessment(assessment, None).await
    }

    /// Recompute the score and complete the assessment in a single write.
    ///
    /// A rejected completion persists nothing, not even the new score.
    #[instrument(skip(self))]
    pub async fn score_and_complete(
        &self,
        assessment_id: Uuid,
    ) -> CmmcResult<(Assessment, ScoreReport)> {
        let mut assessment = self.assessment(assessment_id).await?;
        let marks = self.store.get_marks(&assessment_id).await?;
        let findings = self.findings_for(&assessment, &marks).await?;

        let report = self.scorer.recompute(&mut assessment, &marks)?;
        AssessmentLifecycle::complete_validated(&mut assessment, &marks, &findings)?;
        let stored = self.store.update_assessment(assessment, None).await?;
        if stored.certification_status() == CertificationStatus::Pending {
            info!(assessment_id = %stored.id, "completed assessment is awaiting certification");
        }
        Ok((stored, report))
    }

    async fn findings_for(
        &self,
        assessment: &Assessment,
        marks: &ObjectiveMarks,
    ) -> CmmcResult<Vec<Finding>> {
        let mut findings =
            self.validator()
                .validate_assessment(assessment, marks, self.scorer.catalog());
        if let Some(scope_id) = assessment.scope_id {
            match self.store.get_scope(&scope_id).await? {
                Some(scope) => findings.extend(self.validator().validate_scope_link(assessment, &scope)),
                None => {
                    return Err(CmmcError::ReferentialIntegrityViolation(format!(
                        "assessment {} references missing scope record {}",
                        assessment.id, scope_id
                    )))
                }
            }
        }
        Ok(findings)
    }

    async fn linkable_scope(&self, assessment: &Assessment, scope_id: Uuid) -> CmmcResult<ScopeRecord> {
        let scope = self.store.get_scope(&scope_id).await?.ok_or_else(|| {
            CmmcError::ReferentialIntegrityViolation(format!(
                "scope record {} does not exist",
                scope_id
            ))
        })?;
        let findings = self.validator().validate_scope_link(assessment, &scope);
        if has_blocking(&findings) {
            let reasons: Vec<&str> = findings
                .iter()
                .filter(|f| f.is_blocking())
                .map(|f| f.message.as_str())
                .collect();
            return Err(CmmcError::ReferentialIntegrityViolation(reasons.join("; ")));
        }
        for finding in findings {
            warn!(code = %finding.code, scope_id = %scope_id, "{}", finding.message);
        }
        Ok(scope)
    }

    // -----------------------------------------------------------------------
    // Scope records
    // -----------------------------------------------------------------------

    #[instrument(skip(self))]
    pub async fn start_scope(
        &self,
        org_id: Uuid,
        created_by: Uuid,
        cmmc_level: CmmcLevel,
        assessment_type: AssessmentType,
    ) -> CmmcResult<ScopeRecord> {
        let record = ScopeRecord::new(org_id, created_by, cmmc_level, assessment_type);
        let stored = self.store.insert_scope(record).await?;
        info!(scope_id = %stored.id, "scope wizard started");
        Ok(stored)
    }

    /// Store an imported record. It starts at step 1 and still walks the
    /// wizard's validation like any other record.
    #[instrument(skip(self, scope_data))]
    pub async fn import_scope(
        &self,
        org_id: Uuid,
        created_by: Uuid,
        cmmc_level: CmmcLevel,
        assessment_type: AssessmentType,
        scope_data: ScopeData,
    ) -> CmmcResult<ScopeRecord> {
        let record =
            ScopeRecord::import(org_id, created_by, cmmc_level, assessment_type, scope_data);
        let stored = self.store.insert_scope(record).await?;
        info!(scope_id = %stored.id, "scope record imported");
        Ok(stored)
    }

    pub async fn scope(&self, id: Uuid) -> CmmcResult<ScopeRecord> {
        self.store.get_scope(&id).await?.ok_or(CmmcError::NotFound {
            entity: "scope_record",
            id,
        })
    }

    #[instrument(skip(self, update), fields(section = update.section().name()))]
    pub async fn update_scope_section(
        &self,
        scope_id: Uuid,
        update: SectionUpdate,
    ) -> CmmcResult<ScopeRecord> {
        let (record, ()) = self
            .mutate_scope(scope_id, |wizard, record| wizard.update_section(record, update))
            .await?;
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn validate_scope_step(
        &self,
        scope_id: Uuid,
        step: u8,
    ) -> CmmcResult<(ScopeRecord, StepOutcome)> {
        self.mutate_scope(scope_id, |wizard, record| wizard.validate_step(record, step))
            .await
    }

    #[instrument(skip(self))]
    pub async fn advance_scope(&self, scope_id: Uuid) -> CmmcResult<(ScopeRecord, StepOutcome)> {
        self.mutate_scope(scope_id, |wizard, record| wizard.advance(record))
            .await
    }

    #[instrument(skip(self))]
    pub async fn go_to_scope_step(&self, scope_id: Uuid, step: u8) -> CmmcResult<ScopeRecord> {
        let (record, _) = self
            .mutate_scope(scope_id, |wizard, record| wizard.go_to_step(record, step))
            .await?;
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn complete_scope(&self, scope_id: Uuid) -> CmmcResult<ScopeRecord> {
        let (record, _) = self
            .mutate_scope(scope_id, |wizard, record| wizard.complete(record))
            .await?;
        Ok(record)
    }

    #[instrument(skip(self))]
    pub async fn reopen_scope(&self, scope_id: Uuid) -> CmmcResult<ScopeRecord> {
        let (record, ()) = self
            .mutate_scope(scope_id, |wizard, record| wizard.reopen(record))
            .await?;
        Ok(record)
    }

    async fn mutate_scope<T, F>(&self, scope_id: Uuid, step: F) -> CmmcResult<(ScopeRecord, T)>
    where
        F: FnOnce(&ScopeWizard, &mut ScopeRecord) -> CmmcResult<T> + Send,
        T: Send,
    {
        let mut record = self.scope(scope_id).await?;
        let output = step(&self.wizard, &mut record)?;
        let stored = self.store.update_scope(record).await?;
        Ok((stored, output))
    }
}
