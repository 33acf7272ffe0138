use crate::catalog::Catalog;
use crate::error::{CmmcError, CmmcResult};
use crate::types::{
    Assessment, AssessmentType, CmmcLevel, Finding, GeneratedOutputs, MarkStatus,
    ObjectiveMark, ObjectiveMarks, ScopeData, ScopeRecord, ScopeSection, ScopeStatus,
    WizardStep,
};
use std::collections::{BTreeSet, HashSet};

/// Tunable inputs to the rule set.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    /// Contact roles that satisfy the key-contacts requirement (lowercase).
    pub recognized_contact_roles: BTreeSet<String>,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            recognized_contact_roles: [
                "system_owner",
                "isso",
                "security_officer",
                "executive_sponsor",
                "it_administrator",
                "compliance_lead",
            ]
            .into_iter()
            .map(str::to_string)
            .collect(),
        }
    }
}

impl ValidationPolicy {
    pub fn recognizes_role(&self, role: &str) -> bool {
        self.recognized_contact_roles
            .contains(&role.trim().to_ascii_lowercase())
    }
}

/// Sections each downstream document needs.
const SSP_SECTIONS: &[ScopeSection] = &[
    ScopeSection::CuiBasics,
    ScopeSection::Boundary,
    ScopeSection::Assets,
    ScopeSection::KeyContacts,
    ScopeSection::SspInputs,
];
const DIAGRAM_SECTIONS: &[ScopeSection] = &[
    ScopeSection::Boundary,
    ScopeSection::Assets,
    ScopeSection::DiagramInputs,
];

/// Deterministic rule set shared by the assessment lifecycle and the scope
/// wizard. Never mutates its input; findings come back in discovery order.
#[derive(Debug, Clone, Default)]
pub struct ValidationEngine {
    policy: ValidationPolicy,
}

impl ValidationEngine {
    pub fn new(policy: ValidationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn validate_section(&self, data: &ScopeData, section: ScopeSection) -> Vec<Finding> {
        let mut findings = Vec::new();
        match section {
            ScopeSection::CuiBasics => self.check_cui_basics(data, &mut findings),
            ScopeSection::Boundary => self.check_boundary(data, &mut findings),
            ScopeSection::Assets => self.check_assets(data, &mut findings),
            ScopeSection::KeyContacts => self.check_key_contacts(data, &mut findings),
            ScopeSection::SspInputs => self.check_ssp_inputs(data, &mut findings),
            ScopeSection::DiagramInputs => self.check_diagram_inputs(data, &mut findings),
        }
        findings
    }

    /// Findings for every section a wizard step owns.
    pub fn validate_step(&self, data: &ScopeData, step: WizardStep) -> Vec<Finding> {
        let mut findings: Vec<Finding> = step
            .sections()
            .iter()
            .flat_map(|section| self.validate_section(data, *section))
            .collect();
        if step == WizardStep::LAST && data.ssp_inputs.is_none() && data.diagram_inputs.is_none() {
            findings.push(Finding::blocking(
                "OUTPUT_INPUTS_MISSING",
                Some(ScopeSection::SspInputs),
                "provide SSP inputs, diagram inputs, or both",
            ));
        }
        findings
    }

    /// Findings for steps `1..=through`, in step order.
    pub fn validate_through(&self, data: &ScopeData, through: WizardStep) -> Vec<Finding> {
        WizardStep::all()
            .take_while(|step| *step <= through)
            .flat_map(|step| self.validate_step(data, step))
            .collect()
    }

    pub fn validate_scope(&self, record: &ScopeRecord) -> Vec<Finding> {
        self.validate_through(record.scope_data(), WizardStep::LAST)
    }

    /// Readiness flags: a document is ready only when its inputs exist and all
    /// of its sections are free of blocking findings.
    pub fn document_readiness(&self, data: &ScopeData) -> GeneratedOutputs {
        let clean = |sections: &[ScopeSection]| {
            sections
                .iter()
                .all(|s| !self.validate_section(data, *s).iter().any(Finding::is_blocking))
        };
        GeneratedOutputs {
            ssp: data.ssp_inputs.is_some() && clean(SSP_SECTIONS),
            network_diagram: data.diagram_inputs.is_some() && clean(DIAGRAM_SECTIONS),
        }
    }

    /// Required-field gaps of an assessment: dates, unmarked in-scope
    /// objectives, and unjustified not-applicable marks.
    pub fn validate_assessment(
        &self,
        assessment: &Assessment,
        marks: &ObjectiveMarks,
        catalog: &Catalog,
    ) -> Vec<Finding> {
        let mut findings = Vec::new();

        if assessment.target_date < assessment.start_date {
            findings.push(Finding::blocking(
                "ASSESSMENT_DATES_INVERTED",
                None,
                format!(
                    "target date {} precedes start date {}",
                    assessment.target_date, assessment.start_date
                ),
            ));
        }
        if assessment.level == CmmcLevel::Level1
            && assessment.assessment_type == AssessmentType::C3pao
        {
            findings.push(Finding::warning(
                "ASSESSMENT_TYPE_UNUSUAL",
                None,
                "Level 1 assessments are normally self-assessments",
            ));
        }

        for objective_id in marks.keys() {
            if catalog.objective(objective_id).is_none() {
                findings.push(Finding::blocking(
                    "OBJECTIVE_UNKNOWN",
                    None,
                    format!("mark references unknown objective {}", objective_id),
                ));
            }
        }

        for practice in catalog.practices_at_or_below(assessment.level) {
            for objective in catalog.objectives_for(&practice.id) {
                check_mark(
                    &practice.practice_id,
                    &objective.objective_code,
                    marks.get(&objective.id),
                    &mut findings,
                );
            }
        }

        findings
    }

    /// Check a mark set against one practice's objectives.
    pub fn validate_marks_against_practice(
        &self,
        catalog: &Catalog,
        practice_code: &str,
        marks: &ObjectiveMarks,
    ) -> CmmcResult<Vec<Finding>> {
        let practice = catalog.practice_by_code(practice_code).ok_or_else(|| {
            CmmcError::ReferentialIntegrityViolation(format!(
                "unknown practice {}",
                practice_code
            ))
        })?;

        let mut findings = Vec::new();
        for objective in catalog.objectives_for(&practice.id) {
            let mark = marks.get(&objective.id);
            check_mark(
                &practice.practice_id,
                &objective.objective_code,
                mark,
                &mut findings,
            );
            if matches!(mark.map(|m| m.status), Some(MarkStatus::NotMet)) {
                findings.push(Finding::warning(
                    "OBJECTIVE_NOT_MET",
                    None,
                    format!(
                        "{} {} is not met",
                        practice.practice_id, objective.objective_code
                    ),
                ));
            }
        }
        Ok(findings)
    }

    /// Consistency between an assessment and the scope record it links to.
    pub fn validate_scope_link(&self, assessment: &Assessment, scope: &ScopeRecord) -> Vec<Finding> {
        let mut findings = Vec::new();
        if scope.org_id != assessment.org_id {
            findings.push(Finding::blocking(
                "SCOPE_ORG_MISMATCH",
                None,
                format!(
                    "scope record {} belongs to organization {}, assessment to {}",
                    scope.id, scope.org_id, assessment.org_id
                ),
            ));
        }
        if scope.cmmc_level != assessment.level {
            findings.push(Finding::warning(
                "SCOPE_LEVEL_MISMATCH",
                None,
                format!(
                    "scope record targets {}, assessment targets {}",
                    scope.cmmc_level, assessment.level
                ),
            ));
        }
        if scope.status() != ScopeStatus::Complete {
            findings.push(Finding::warning(
                "SCOPE_INCOMPLETE",
                None,
                format!("scope record {} has not completed the wizard", scope.id),
            ));
        }
        findings
    }

    fn check_cui_basics(&self, data: &ScopeData, findings: &mut Vec<Finding>) {
        let section = Some(ScopeSection::CuiBasics);
        let cui = &data.cui_basics;
        if cui.categories.iter().all(|c| c.trim().is_empty()) {
            findings.push(Finding::blocking(
                "CUI_CATEGORIES_MISSING",
                section,
                "declare at least one CUI category",
            ));
        }
        if cui.description.trim().is_empty() {
            findings.push(Finding::blocking(
                "CUI_DESCRIPTION_MISSING",
                section,
                "describe the CUI handled",
            ));
        }
        if cui.locations.is_empty() {
            findings.push(Finding::warning(
                "CUI_LOCATIONS_EMPTY",
                section,
                "no CUI storage or processing locations declared",
            ));
        }
    }

    fn check_boundary(&self, data: &ScopeData, findings: &mut Vec<Finding>) {
        let section = Some(ScopeSection::Boundary);
        let boundary = &data.boundary;
        if boundary.networks.is_empty() {
            findings.push(Finding::blocking(
                "BOUNDARY_NETWORKS_MISSING",
                section,
                "declare at least one in-scope network",
            ));
        }
        for (idx, network) in boundary.networks.iter().enumerate() {
            if network.name.trim().is_empty() {
                findings.push(Finding::blocking(
                    "BOUNDARY_NETWORK_UNNAMED",
                    section,
                    format!("network #{} has no name", idx + 1),
                ));
            }
        }
        for provider in &boundary.cloud_providers {
            if provider.fedramp_level.is_none() {
                findings.push(Finding::warning(
                    "CLOUD_PROVIDER_NOT_FEDRAMP",
                    section,
                    format!("cloud provider '{}' has no FedRAMP authorization", provider.name),
                ));
            }
        }
        for connection in &boundary.external_connections {
            if connection.purpose.trim().is_empty() {
                findings.push(Finding::warning(
                    "EXTERNAL_CONNECTION_PURPOSE_MISSING",
                    section,
                    format!("external connection '{}' has no stated purpose", connection.name),
                ));
            }
        }
    }

    fn check_assets(&self, data: &ScopeData, findings: &mut Vec<Finding>) {
        let section = Some(ScopeSection::Assets);
        if data.assets.is_empty() {
            findings.push(Finding::warning(
                "ASSETS_EMPTY",
                section,
                "no assets declared",
            ));
            return;
        }
        let mut seen = HashSet::new();
        for asset in &data.assets {
            if asset.id.trim().is_empty() || asset.name.trim().is_empty() {
                findings.push(Finding::blocking(
                    "ASSET_INCOMPLETE",
                    section,
                    format!("asset '{}' needs both an id and a name", asset.name),
                ));
            } else if !seen.insert(asset.id.as_str()) {
                findings.push(Finding::blocking(
                    "ASSET_DUPLICATE_ID",
                    section,
                    format!("asset id '{}' is declared more than once", asset.id),
                ));
            }
            if asset.owner.as_deref().map_or(true, |o| o.trim().is_empty()) {
                findings.push(Finding::warning(
                    "ASSET_OWNER_MISSING",
                    section,
                    format!("asset '{}' has no declared owner", asset.name),
                ));
            }
        }
    }

    fn check_key_contacts(&self, data: &ScopeData, findings: &mut Vec<Finding>) {
        let section = Some(ScopeSection::KeyContacts);
        let contacts = &data.key_contacts;
        if !contacts
            .iter()
            .any(|c| self.policy.recognizes_role(&c.role) && !c.name.trim().is_empty())
        {
            findings.push(Finding::blocking(
                "KEY_CONTACT_ROLE_MISSING",
                section,
                "at least one named contact with a recognized role is required",
            ));
        }
        for contact in contacts {
            if contact.name.trim().is_empty() {
                findings.push(Finding::blocking(
                    "KEY_CONTACT_UNNAMED",
                    section,
                    format!("contact with role '{}' has no name", contact.role),
                ));
                continue;
            }
            if !self.policy.recognizes_role(&contact.role) {
                findings.push(Finding::warning(
                    "KEY_CONTACT_ROLE_UNRECOGNIZED",
                    section,
                    format!("contact '{}' has unrecognized role '{}'", contact.name, contact.role),
                ));
            }
            if contact.email.as_deref().map_or(true, |e| e.trim().is_empty()) {
                findings.push(Finding::warning(
                    "KEY_CONTACT_EMAIL_MISSING",
                    section,
                    format!("contact '{}' has no email", contact.name),
                ));
            }
        }
    }

    fn check_ssp_inputs(&self, data: &ScopeData, findings: &mut Vec<Finding>) {
        let section = Some(ScopeSection::SspInputs);
        let Some(ssp) = &data.ssp_inputs else {
            return;
        };
        if ssp.system_name.trim().is_empty() {
            findings.push(Finding::blocking(
                "SSP_SYSTEM_NAME_MISSING",
                section,
                "SSP inputs need a system name",
            ));
        }
        if ssp.system_description.trim().is_empty() {
            findings.push(Finding::blocking(
                "SSP_SYSTEM_DESCRIPTION_MISSING",
                section,
                "SSP inputs need a system description",
            ));
        }
        if ssp.operating_environment.trim().is_empty() {
            findings.push(Finding::warning(
                "SSP_ENVIRONMENT_MISSING",
                section,
                "operating environment is not described",
            ));
        }
    }

    fn check_diagram_inputs(&self, data: &ScopeData, findings: &mut Vec<Finding>) {
        let section = Some(ScopeSection::DiagramInputs);
        let Some(diagram) = &data.diagram_inputs else {
            return;
        };
        if diagram.zones.iter().all(|z| z.trim().is_empty()) {
            findings.push(Finding::blocking(
                "DIAGRAM_ZONES_MISSING",
                section,
                "diagram inputs need at least one zone",
            ));
        }
        if diagram.include_cloud && data.boundary.cloud_providers.is_empty() {
            findings.push(Finding::warning(
                "DIAGRAM_CLOUD_WITHOUT_PROVIDERS",
                section,
                "diagram includes cloud but no cloud providers are declared",
            ));
        }
        if diagram.include_external_connections && data.boundary.external_connections.is_empty() {
            findings.push(Finding::warning(
                "DIAGRAM_CONNECTIONS_WITHOUT_ENTRIES",
                section,
                "diagram includes external connections but none are declared",
            ));
        }
    }
}

pub fn has_blocking(findings: &[Finding]) -> bool {
    findings.iter().any(Finding::is_blocking)
}

fn check_mark(
    practice_code: &str,
    objective_code: &str,
    mark: Option<&ObjectiveMark>,
    findings: &mut Vec<Finding>,
) {
    match mark {
        None => findings.push(Finding::blocking(
            "OBJECTIVE_UNMARKED",
            None,
            format!("{} {} has no compliance mark", practice_code, objective_code),
        )),
        Some(mark)
            if mark.status == MarkStatus::NotApplicable
                && mark
                    .justification
                    .as_deref()
                    .map_or(true, |j| j.trim().is_empty()) =>
        {
            findings.push(Finding::blocking(
                "OBJECTIVE_NA_UNJUSTIFIED",
                None,
                format!(
                    "{} {} is not applicable without a justification",
                    practice_code, objective_code
                ),
            ))
        }
        Some(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{objective, practice};
    use crate::types::{
        Asset, AssetCategory, CloudProvider, CuiBasics, DiagramInputs, KeyContact,
        NetworkSegment, SspInputs,
    };
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn codes(findings: &[Finding]) -> Vec<&str> {
        findings.iter().map(|f| f.code.as_str()).collect()
    }

    fn asset(id: &str, owner: Option<&str>) -> Asset {
        Asset {
            id: id.to_string(),
            name: format!("asset {}", id),
            asset_type: "workstation".to_string(),
            category: AssetCategory::Cui,
            location: "HQ".to_string(),
            owner: owner.map(str::to_string),
        }
    }

    #[test]
    fn empty_assets_warn_but_never_block() {
        let engine = ValidationEngine::default();
        let findings = engine.validate_section(&ScopeData::default(), ScopeSection::Assets);
        assert_eq!(codes(&findings), vec!["ASSETS_EMPTY"]);
        assert!(!has_blocking(&findings));
        assert_eq!(findings[0].message, "no assets declared");
    }

    #[test]
    fn asset_rules_report_in_discovery_order() {
        let engine = ValidationEngine::default();
        let data = ScopeData {
            assets: vec![asset("a1", Some("ops")), asset("a2", None), asset("a1", Some("ops"))],
            ..ScopeData::default()
        };
        let findings = engine.validate_section(&data, ScopeSection::Assets);
        assert_eq!(codes(&findings), vec!["ASSET_OWNER_MISSING", "ASSET_DUPLICATE_ID"]);
    }

    #[test]
    fn cui_basics_require_categories_and_description() {
        let engine = ValidationEngine::default();
        let findings = engine.validate_step(&ScopeData::default(), WizardStep::FIRST);
        assert_eq!(
            codes(&findings),
            vec!["CUI_CATEGORIES_MISSING", "CUI_DESCRIPTION_MISSING", "CUI_LOCATIONS_EMPTY"]
        );

        let data = ScopeData {
            cui_basics: CuiBasics {
                categories: vec!["CTI".to_string()],
                description: "technical drawings".to_string(),
                locations: vec!["file server".to_string()],
            },
            ..ScopeData::default()
        };
        assert!(engine.validate_step(&data, WizardStep::FIRST).is_empty());
    }

    #[test]
    fn boundary_warns_on_unauthorized_cloud() {
        let engine = ValidationEngine::default();
        let mut data = ScopeData::default();
        data.boundary.networks.push(NetworkSegment {
            name: "corp".to_string(),
            ..NetworkSegment::default()
        });
        data.boundary.cloud_providers.push(CloudProvider {
            name: "storage-co".to_string(),
            fedramp_level: None,
        });
        let findings = engine.validate_section(&data, ScopeSection::Boundary);
        assert_eq!(codes(&findings), vec!["CLOUD_PROVIDER_NOT_FEDRAMP"]);
    }

    #[test]
    fn key_contacts_need_a_recognized_role() {
        let engine = ValidationEngine::default();
        let mut data = ScopeData::default();
        data.key_contacts.push(KeyContact {
            name: "Riley".to_string(),
            role: "intern".to_string(),
            email: Some("riley@example.com".to_string()),
            phone: None,
        });
        let findings = engine.validate_section(&data, ScopeSection::KeyContacts);
        assert_eq!(
            codes(&findings),
            vec!["KEY_CONTACT_ROLE_MISSING", "KEY_CONTACT_ROLE_UNRECOGNIZED"]
        );

        data.key_contacts[0].role = "System_Owner".to_string();
        assert!(engine
            .validate_section(&data, ScopeSection::KeyContacts)
            .is_empty());
    }

    #[test]
    fn final_step_needs_some_output_inputs() {
        let engine = ValidationEngine::default();
        let findings = engine.validate_step(&ScopeData::default(), WizardStep::LAST);
        assert_eq!(codes(&findings), vec!["OUTPUT_INPUTS_MISSING"]);
    }

    #[test]
    fn readiness_tracks_each_document() {
        let engine = ValidationEngine::default();
        let mut data = ScopeData::default();
        data.cui_basics = CuiBasics {
            categories: vec!["CTI".to_string()],
            description: "drawings".to_string(),
            locations: vec![],
        };
        data.boundary.networks.push(NetworkSegment {
            name: "corp".to_string(),
            ..NetworkSegment::default()
        });
        data.key_contacts.push(KeyContact {
            name: "Sam".to_string(),
            role: "isso".to_string(),
            email: None,
            phone: None,
        });
        data.ssp_inputs = Some(SspInputs {
            system_name: "Engineering enclave".to_string(),
            system_description: "CAD workstations".to_string(),
            operating_environment: String::new(),
        });
        assert_eq!(
            engine.document_readiness(&data),
            GeneratedOutputs {
                ssp: true,
                network_diagram: false
            }
        );

        data.diagram_inputs = Some(DiagramInputs::default());
        assert!(!engine.document_readiness(&data).network_diagram);
        data.diagram_inputs = Some(DiagramInputs {
            zones: vec!["enclave".to_string()],
            ..DiagramInputs::default()
        });
        assert!(engine.document_readiness(&data).network_diagram);
    }

    #[test]
    fn assessment_gaps_cover_unmarked_and_unjustified() {
        let p = practice("AC.L1-3.1.1", CmmcLevel::Level1, 5.0);
        let o1 = objective(&p, "[a]");
        let o2 = objective(&p, "[b]");
        let o3 = objective(&p, "[c]");
        let catalog = Catalog::from_records(vec![p], vec![o1.clone(), o2.clone(), o3]).unwrap();

        let assessment = Assessment::new(
            Uuid::new_v4(),
            CmmcLevel::Level1,
            AssessmentType::SelfAssessment,
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        );
        let mut marks = ObjectiveMarks::new();
        marks.insert(o1.id, ObjectiveMark::met());
        marks.insert(
            o2.id,
            ObjectiveMark {
                status: MarkStatus::NotApplicable,
                justification: Some("  ".to_string()),
            },
        );

        let findings = ValidationEngine::default().validate_assessment(&assessment, &marks, &catalog);
        assert_eq!(
            codes(&findings),
            vec![
                "ASSESSMENT_DATES_INVERTED",
                "OBJECTIVE_NA_UNJUSTIFIED",
                "OBJECTIVE_UNMARKED"
            ]
        );
        assert!(findings.iter().all(Finding::is_blocking));
    }

    #[test]
    fn practice_validation_reports_unknown_practice() {
        let catalog = Catalog::from_records(vec![], vec![]).unwrap();
        let err = ValidationEngine::default()
            .validate_marks_against_practice(&catalog, "AC.L2-3.1.1", &ObjectiveMarks::new())
            .unwrap_err();
        assert!(matches!(err, CmmcError::ReferentialIntegrityViolation(_)));
    }

    #[test]
    fn practice_validation_flags_not_met() {
        let p = practice("AC.L2-3.1.1", CmmcLevel::Level2, 5.0);
        let o1 = objective(&p, "[a]");
        let catalog = Catalog::from_records(vec![p], vec![o1.clone()]).unwrap();
        let mut marks = ObjectiveMarks::new();
        marks.insert(o1.id, ObjectiveMark::not_met());
        let findings = ValidationEngine::default()
            .validate_marks_against_practice(&catalog, "AC.L2-3.1.1", &marks)
            .unwrap();
        assert_eq!(codes(&findings), vec!["OBJECTIVE_NOT_MET"]);
    }
}
