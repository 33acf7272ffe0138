use crate::error::{CmmcError, CmmcResult};
use crate::types::{
    Finding, GeneratedOutputs, ScopeRecord, ScopeSection, ScopeStatus, SectionUpdate, WizardStep,
};
use crate::validation::{has_blocking, ValidationEngine};
use tracing::{debug, info};

/// Findings produced by validating one wizard step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub step: WizardStep,
    pub findings: Vec<Finding>,
}

impl StepOutcome {
    pub fn passed(&self) -> bool {
        !has_blocking(&self.findings)
    }

    pub fn blocking(&self) -> impl Iterator<Item = &Finding> + '_ {
        self.findings.iter().filter(|f| f.is_blocking())
    }
}

/// Five-step scoping wizard.
///
/// Every mutating operation works on a copy of the record and writes it back
/// only on success, so a rejected step leaves the record unchanged.
#[derive(Debug, Clone, Default)]
pub struct ScopeWizard {
    validator: ValidationEngine,
}

impl ScopeWizard {
    pub fn new(validator: ValidationEngine) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &ValidationEngine {
        &self.validator
    }

    /// Replace one `scope_data` section.
    ///
    /// The section's step and everything after it must validate again; if the
    /// wizard is past that step it is moved back to it. Warnings from those
    /// steps are cleared with it.
    pub fn update_section(&self, record: &mut ScopeRecord, update: SectionUpdate) -> CmmcResult<()> {
        ensure_editable(record, "update_section")?;
        let section = update.section();
        let step = section.step();

        update.apply(&mut record.scope_data);
        record.validated_through = record.validated_through.min(step.get() - 1);
        record.current_step = record.current_step.min(step);
        // Later steps may read this section (step 5 reads the boundary), so
        // their warnings are dropped until they validate again.
        record
            .warnings
            .retain(|w| w.section.map_or(true, |s| s.step() < step));

        debug!(
            scope_id = %record.id,
            section = section.name(),
            current_step = %record.current_step,
            "scope section updated"
        );
        Ok(())
    }

    /// Validate one step and refresh its warnings.
    ///
    /// Steps validate in order: step `n` needs steps `1..n` validated first.
    pub fn validate_step(&self, record: &mut ScopeRecord, step: u8) -> CmmcResult<StepOutcome> {
        let step = WizardStep::new(step)?;
        if step.get() > record.validated_through + 1 {
            return Err(CmmcError::OutOfOrderValidation {
                requested: step.get(),
                validated_through: record.validated_through,
            });
        }

        let findings = self.validator.validate_step(&record.scope_data, step);
        replace_step_warnings(record, step, &findings);
        let outcome = StepOutcome { step, findings };
        if outcome.passed() {
            record.validated_through = record.validated_through.max(step.get());
        }

        debug!(
            scope_id = %record.id,
            step = %step,
            passed = outcome.passed(),
            findings = outcome.findings.len(),
            "scope step validated"
        );
        Ok(outcome)
    }

    /// Validate the current step and move to the next one.
    pub fn advance(&self, record: &mut ScopeRecord) -> CmmcResult<StepOutcome> {
        ensure_editable(record, "advance")?;
        let current = record.current_step;
        let next = current.next().ok_or_else(|| {
            CmmcError::invalid_transition(
                step_name(current),
                "advance",
                "already at the final step; complete the record instead",
            )
        })?;

        let mut draft = record.clone();
        let outcome = self.validate_step(&mut draft, current.get())?;
        if !outcome.passed() {
            return Err(blocked(current, "advance", &outcome));
        }
        draft.current_step = next;
        *record = draft;

        debug!(scope_id = %record.id, from = %current, to = %next, "scope wizard advanced");
        Ok(outcome)
    }

    /// Jump to `target`. Backward moves always succeed and require the
    /// target step to validate again; forward moves validate every step in
    /// between and apply all-or-nothing.
    pub fn go_to_step(&self, record: &mut ScopeRecord, target: u8) -> CmmcResult<Vec<StepOutcome>> {
        let target = WizardStep::new(target)?;
        ensure_editable(record, "go_to_step")?;

        if target <= record.current_step {
            record.current_step = target;
            record.validated_through = record.validated_through.min(target.get() - 1);
            debug!(scope_id = %record.id, to = %target, "scope wizard moved back");
            return Ok(Vec::new());
        }

        let start = record.current_step;
        let mut draft = record.clone();
        let mut outcomes = Vec::new();
        for step in WizardStep::all().filter(|s| *s >= start && *s < target) {
            let outcome = self.validate_step(&mut draft, step.get())?;
            if !outcome.passed() {
                return Err(blocked(step, "go_to_step", &outcome));
            }
            outcomes.push(outcome);
        }
        draft.current_step = target;
        *record = draft;

        debug!(scope_id = %record.id, to = %target, "scope wizard moved forward");
        Ok(outcomes)
    }

    /// Finish the wizard from step 5. Every step is re-validated; on success
    /// the record becomes complete and `generated_outputs` is computed.
    pub fn complete(&self, record: &mut ScopeRecord) -> CmmcResult<GeneratedOutputs> {
        ensure_editable(record, "complete")?;
        if record.current_step != WizardStep::LAST {
            return Err(CmmcError::invalid_transition(
                step_name(record.current_step),
                "complete",
                "the wizard completes only from the final step",
            ));
        }

        let mut draft = record.clone();
        for step in WizardStep::all() {
            let outcome = self.validate_step(&mut draft, step.get())?;
            if !outcome.passed() {
                return Err(blocked(step, "complete", &outcome));
            }
        }
        draft.status = ScopeStatus::Complete;
        draft.generated_outputs = self.validator.document_readiness(&draft.scope_data);
        *record = draft;

        info!(
            scope_id = %record.id,
            org_id = %record.org_id,
            ssp_ready = record.generated_outputs.ssp,
            diagram_ready = record.generated_outputs.network_diagram,
            warnings = record.warnings.len(),
            "scope wizard completed"
        );
        Ok(record.generated_outputs)
    }

    /// Return a completed record to the final step for editing.
    pub fn reopen(&self, record: &mut ScopeRecord) -> CmmcResult<()> {
        if record.status != ScopeStatus::Complete {
            return Err(CmmcError::invalid_transition(
                step_name(record.current_step),
                "reopen",
                "only complete scope records reopen",
            ));
        }
        record.status = ScopeStatus::InProgress;
        record.current_step = WizardStep::LAST;
        record.validated_through = WizardStep::LAST.get() - 1;
        record.generated_outputs = GeneratedOutputs::default();
        info!(scope_id = %record.id, "scope record reopened");
        Ok(())
    }
}

fn ensure_editable(record: &ScopeRecord, action: &str) -> CmmcResult<()> {
    if record.status == ScopeStatus::Complete {
        return Err(CmmcError::invalid_transition(
            "complete",
            action,
            "reopen the scope record before editing",
        ));
    }
    Ok(())
}

// Warnings stay ordered by step, then by discovery order within a step.
fn replace_step_warnings(record: &mut ScopeRecord, step: WizardStep, findings: &[Finding]) {
    record
        .warnings
        .retain(|w| w.section.map(ScopeSection::step) != Some(step));
    record
        .warnings
        .extend(findings.iter().filter(|f| !f.is_blocking()).cloned());
    record
        .warnings
        .sort_by_key(|w| w.section.map(ScopeSection::step));
}

fn blocked(step: WizardStep, action: &str, outcome: &StepOutcome) -> CmmcError {
    let codes: Vec<&str> = outcome.blocking().map(|f| f.code.as_str()).collect();
    CmmcError::invalid_transition(
        step_name(step),
        action,
        format!("step {} has blocking findings: {}", step, codes.join(", ")),
    )
}

fn step_name(step: WizardStep) -> String {
    format!("step {}", step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Asset, AssetCategory, AssessmentType, CloudProvider, CmmcLevel, CuiBasics, DiagramInputs,
        KeyContact, NetworkSegment, ScopeData, SspInputs,
    };
    use uuid::Uuid;

    fn filled_scope_data() -> ScopeData {
        let mut data = ScopeData {
            cui_basics: CuiBasics {
                categories: vec!["CTI".to_string()],
                description: "engineering drawings".to_string(),
                locations: vec!["file server".to_string()],
            },
            ..ScopeData::default()
        };
        data.boundary.networks.push(NetworkSegment {
            name: "engineering".to_string(),
            cidr: Some("10.10.0.0/24".to_string()),
            description: String::new(),
        });
        data.key_contacts.push(KeyContact {
            name: "Jordan".to_string(),
            role: "system_owner".to_string(),
            email: Some("jordan@example.com".to_string()),
            phone: None,
        });
        data.ssp_inputs = Some(SspInputs {
            system_name: "Engineering enclave".to_string(),
            system_description: "CAD workstations and file server".to_string(),
            operating_environment: "on-premises".to_string(),
        });
        data.diagram_inputs = Some(DiagramInputs {
            zones: vec!["enclave".to_string()],
            ..DiagramInputs::default()
        });
        data
    }

    fn imported(data: ScopeData) -> ScopeRecord {
        ScopeRecord::import(
            Uuid::new_v4(),
            Uuid::new_v4(),
            CmmcLevel::Level2,
            AssessmentType::SelfAssessment,
            data,
        )
    }

    fn codes(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.code.as_str()).collect()
    }

    #[test]
    fn empty_assets_advance_with_a_warning() {
        let wizard = ScopeWizard::default();
        let mut record = imported(filled_scope_data());
        wizard.go_to_step(&mut record, 3).unwrap();

        let outcome = wizard.advance(&mut record).unwrap();
        assert!(outcome.passed());
        assert_eq!(record.current_step().get(), 4);
        assert_eq!(codes(record.warnings()), vec!["ASSETS_EMPTY"]);
        assert_eq!(record.warnings()[0].message, "no assets declared");
    }

    #[test]
    fn forcing_step_six_fails_and_changes_nothing() {
        let wizard = ScopeWizard::default();
        let mut record = imported(filled_scope_data());
        let before = record.clone();
        let err = wizard.go_to_step(&mut record, 6).unwrap_err();
        assert!(matches!(err, CmmcError::InvalidStep(6)));
        assert_eq!(record, before);
    }

    #[test]
    fn validation_must_follow_step_order() {
        let wizard = ScopeWizard::default();
        let mut record = imported(filled_scope_data());
        let err = wizard.validate_step(&mut record, 3).unwrap_err();
        assert!(matches!(
            err,
            CmmcError::OutOfOrderValidation {
                requested: 3,
                validated_through: 0
            }
        ));
        wizard.validate_step(&mut record, 1).unwrap();
        wizard.validate_step(&mut record, 2).unwrap();
        assert!(wizard.validate_step(&mut record, 3).unwrap().passed());
    }

    #[test]
    fn blocked_advance_leaves_record_unchanged() {
        let wizard = ScopeWizard::default();
        let mut record = imported(ScopeData::default());
        let before = record.clone();
        let err = wizard.advance(&mut record).unwrap_err();
        assert!(err.to_string().contains("CUI_CATEGORIES_MISSING"));
        assert_eq!(record, before);
    }

    #[test]
    fn failed_forward_jump_is_atomic() {
        let wizard = ScopeWizard::default();
        let mut data = filled_scope_data();
        data.key_contacts.clear();
        let mut record = imported(data);
        let before = record.clone();

        let err = wizard.go_to_step(&mut record, 5).unwrap_err();
        assert!(err.to_string().contains("KEY_CONTACT_ROLE_MISSING"));
        assert_eq!(record, before);

        wizard.go_to_step(&mut record, 4).unwrap();
        assert_eq!(record.current_step().get(), 4);
        assert_eq!(record.validated_through(), 3);
    }

    #[test]
    fn repeated_validation_does_not_duplicate_warnings() {
        let wizard = ScopeWizard::default();
        let mut record = imported(filled_scope_data());
        wizard.go_to_step(&mut record, 3).unwrap();
        wizard.validate_step(&mut record, 3).unwrap();
        wizard.validate_step(&mut record, 3).unwrap();
        wizard.validate_step(&mut record, 1).unwrap();
        assert_eq!(codes(record.warnings()), vec!["ASSETS_EMPTY"]);
    }

    #[test]
    fn moving_back_requires_revalidation_forward() {
        let wizard = ScopeWizard::default();
        let mut record = imported(filled_scope_data());
        wizard.go_to_step(&mut record, 5).unwrap();
        wizard.go_to_step(&mut record, 2).unwrap();
        assert_eq!(record.validated_through(), 1);
        assert!(matches!(
            wizard.validate_step(&mut record, 4),
            Err(CmmcError::OutOfOrderValidation { .. })
        ));
        let outcomes = wizard.go_to_step(&mut record, 5).unwrap();
        let steps: Vec<u8> = outcomes.iter().map(|o| o.step.get()).collect();
        assert_eq!(steps, vec![2, 3, 4]);
        assert_eq!(record.scope_data(), &filled_scope_data());
    }

    #[test]
    fn editing_an_earlier_section_rewinds_the_wizard() {
        let wizard = ScopeWizard::default();
        let mut record = imported(filled_scope_data());
        wizard.go_to_step(&mut record, 4).unwrap();

        wizard
            .update_section(
                &mut record,
                SectionUpdate::Assets(vec![Asset {
                    id: "srv-1".to_string(),
                    name: "File server".to_string(),
                    asset_type: "server".to_string(),
                    category: AssetCategory::Cui,
                    location: "HQ".to_string(),
                    owner: None,
                }]),
            )
            .unwrap();
        assert_eq!(record.current_step().get(), 3);
        assert_eq!(record.validated_through(), 2);
        assert!(record.warnings().is_empty());

        wizard.advance(&mut record).unwrap();
        assert_eq!(codes(record.warnings()), vec!["ASSET_OWNER_MISSING"]);
    }

    #[test]
    fn fixing_the_boundary_clears_stale_diagram_warnings() {
        let wizard = ScopeWizard::default();
        let mut data = filled_scope_data();
        data.diagram_inputs = Some(DiagramInputs {
            zones: vec!["enclave".to_string()],
            include_cloud: true,
            ..DiagramInputs::default()
        });
        let mut record = imported(data);
        wizard.go_to_step(&mut record, 5).unwrap();
        wizard.validate_step(&mut record, 5).unwrap();
        assert_eq!(
            codes(record.warnings()),
            vec!["ASSETS_EMPTY", "DIAGRAM_CLOUD_WITHOUT_PROVIDERS"]
        );

        let mut boundary = record.scope_data().boundary.clone();
        boundary.cloud_providers.push(CloudProvider {
            name: "GovCloud".to_string(),
            fedramp_level: Some("high".to_string()),
        });
        wizard
            .update_section(&mut record, SectionUpdate::Boundary(boundary))
            .unwrap();
        assert!(record.warnings().is_empty());

        wizard.go_to_step(&mut record, 5).unwrap();
        assert_eq!(codes(record.warnings()), vec!["ASSETS_EMPTY"]);
        let outcome = wizard.validate_step(&mut record, 5).unwrap();
        assert!(outcome.findings.is_empty());
        assert_eq!(codes(record.warnings()), vec!["ASSETS_EMPTY"]);
    }

    #[test]
    fn complete_sets_outputs_and_locks_record() {
        let wizard = ScopeWizard::default();
        let mut record = imported(filled_scope_data());
        let err = wizard.complete(&mut record).unwrap_err();
        assert!(matches!(err, CmmcError::InvalidTransition { .. }));

        wizard.go_to_step(&mut record, 5).unwrap();
        let outputs = wizard.complete(&mut record).unwrap();
        assert!(outputs.ssp);
        assert!(outputs.network_diagram);
        assert!(record.is_complete());
        assert_eq!(record.validated_through(), 5);

        let err = wizard
            .update_section(&mut record, SectionUpdate::DiagramInputs(None))
            .unwrap_err();
        assert!(err.to_string().contains("reopen"));

        wizard.reopen(&mut record).unwrap();
        assert!(!record.is_complete());
        assert_eq!(record.generated_outputs(), GeneratedOutputs::default());
        wizard
            .update_section(&mut record, SectionUpdate::DiagramInputs(None))
            .unwrap();
        let outputs = wizard.complete(&mut record).unwrap();
        assert!(outputs.ssp);
        assert!(!outputs.network_diagram);
    }

    #[test]
    fn final_step_without_any_inputs_blocks_completion() {
        let wizard = ScopeWizard::default();
        let mut data = filled_scope_data();
        data.ssp_inputs = None;
        data.diagram_inputs = None;
        let mut record = imported(data);
        wizard.go_to_step(&mut record, 5).unwrap();
        let before = record.clone();
        let err = wizard.complete(&mut record).unwrap_err();
        assert!(err.to_string().contains("OUTPUT_INPUTS_MISSING"));
        assert_eq!(record, before);
    }
}
