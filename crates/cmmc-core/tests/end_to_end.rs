//! End-to-end flows through the public API: catalog files on disk, the
//! in-memory store, and the compliance service.

use chrono::NaiveDate;
use cmmc_core::{
    AssessmentStatus, AssessmentTransition, AssessmentType, Catalog, CmmcError, CmmcLevel,
    ComplianceService, CuiBasics, InMemoryStore, KeyContact, NetworkSegment, NewAssessment,
    ObjectiveMark, ObjectiveMarks, Practice, ScopeData, ScopeRecord, ScopeWizard, SectionUpdate,
    Severity,
};
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;
use uuid::Uuid;

fn write_json(value: serde_json::Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", value).unwrap();
    file
}

/// Nine Level 1 practices of weight 10, one objective each.
fn level1_catalog_files() -> (NamedTempFile, NamedTempFile, Vec<Uuid>) {
    let mut practices = Vec::new();
    let mut objectives = Vec::new();
    let mut objective_ids = Vec::new();
    for n in 1..=9 {
        let practice_id = Uuid::new_v4();
        let objective_id = Uuid::new_v4();
        practices.push(json!({
            "id": practice_id,
            "practice_id": format!("AC.L1-3.1.{}", n),
            "domain_code": "AC",
            "nist_171_id": format!("3.1.{}", n),
            "title": format!("Practice {}", n),
            "level": 1,
            "weight_points": 10.0
        }));
        objectives.push(json!({
            "id": objective_id,
            "practice_id": practice_id,
            "objective_code": "[a]",
            "objective_text": "determine if the practice is implemented"
        }));
        objective_ids.push(objective_id);
    }
    (
        write_json(json!(practices)),
        write_json(json!(objectives)),
        objective_ids,
    )
}

fn service_from_files() -> (ComplianceService, Vec<Uuid>) {
    let (practices, objectives, ids) = level1_catalog_files();
    let catalog = Catalog::from_json_files(practices.path(), objectives.path())
        .unwrap()
        .shared();
    (
        ComplianceService::new(catalog, Arc::new(InMemoryStore::new())),
        ids,
    )
}

fn new_assessment(org_id: Uuid) -> NewAssessment {
    NewAssessment {
        org_id,
        level: CmmcLevel::Level1,
        assessment_type: AssessmentType::SelfAssessment,
        start_date: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
        target_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
        scope_id: None,
    }
}

#[tokio::test]
async fn seven_of_nine_practices_score_78() {
    let (service, ids) = service_from_files();
    let assessment = service
        .create_assessment(new_assessment(Uuid::new_v4()))
        .await
        .unwrap();

    let marks: ObjectiveMarks = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let mark = if i < 7 {
                ObjectiveMark::met()
            } else {
                ObjectiveMark::not_met()
            };
            (*id, mark)
        })
        .collect();
    let (stored, report) = service.record_marks(assessment.id, marks).await.unwrap();

    assert_eq!(report.score, 78);
    assert_eq!(report.satisfied_practices(), 7);
    assert_eq!(stored.computed_score(), Some(78));

    // Idempotent: recomputing from the same marks yields the same score.
    let (again, report) = service.recompute_score(assessment.id).await.unwrap();
    assert_eq!(report.score, 78);
    assert_eq!(again.computed_score(), Some(78));
}

#[tokio::test]
async fn unknown_objective_leaves_score_unchanged() {
    let (service, ids) = service_from_files();
    let assessment = service
        .create_assessment(new_assessment(Uuid::new_v4()))
        .await
        .unwrap();
    let marks: ObjectiveMarks = ids.iter().map(|id| (*id, ObjectiveMark::met())).collect();
    service.record_marks(assessment.id, marks).await.unwrap();

    let ghost = Uuid::new_v4();
    let mut bad = ObjectiveMarks::new();
    bad.insert(ghost, ObjectiveMark::met());
    let err = service.record_marks(assessment.id, bad).await.unwrap_err();
    assert!(matches!(err, CmmcError::UnknownObjective(id) if id == ghost));

    let stored = service.assessment(assessment.id).await.unwrap();
    assert_eq!(stored.computed_score(), Some(100));
}

#[tokio::test]
async fn completion_requires_every_objective_marked() {
    let (service, ids) = service_from_files();
    let assessment = service
        .create_assessment(new_assessment(Uuid::new_v4()))
        .await
        .unwrap();
    let first: ObjectiveMarks = std::iter::once((ids[0], ObjectiveMark::met())).collect();
    service.record_marks(assessment.id, first).await.unwrap();
    service
        .transition(assessment.id, AssessmentTransition::Begin)
        .await
        .unwrap();

    let findings = service.validate_assessment(assessment.id).await.unwrap();
    assert_eq!(
        findings
            .iter()
            .filter(|f| f.severity == Severity::Blocking)
            .count(),
        8
    );
    let before = service.assessment(assessment.id).await.unwrap();
    let err = service
        .transition(assessment.id, AssessmentTransition::Complete)
        .await
        .unwrap_err();
    assert!(matches!(err, CmmcError::IncompleteAssessment(_)));
    assert_eq!(service.assessment(assessment.id).await.unwrap(), before);

    let rest: ObjectiveMarks = ids[1..]
        .iter()
        .map(|id| (*id, ObjectiveMark::not_applicable("enclave has no wireless")))
        .collect();
    service.record_marks(assessment.id, rest).await.unwrap();
    let done = service
        .transition(assessment.id, AssessmentTransition::Complete)
        .await
        .unwrap();
    assert_eq!(done.status(), AssessmentStatus::Complete);
    assert_eq!(done.computed_score(), Some(100));
}

#[test]
fn empty_assets_step_advances_with_warning_only() {
    let mut data = ScopeData {
        cui_basics: CuiBasics {
            categories: vec!["CTI".to_string()],
            description: "technical data packages".to_string(),
            locations: vec!["PLM system".to_string()],
        },
        ..ScopeData::default()
    };
    data.boundary.networks.push(NetworkSegment {
        name: "engineering".to_string(),
        ..NetworkSegment::default()
    });
    let mut record = ScopeRecord::import(
        Uuid::new_v4(),
        Uuid::new_v4(),
        CmmcLevel::Level2,
        AssessmentType::C3pao,
        data,
    );
    let wizard = ScopeWizard::default();
    wizard.go_to_step(&mut record, 3).unwrap();
    assert!(record.scope_data().assets.is_empty());

    let outcome = wizard.advance(&mut record).unwrap();
    assert_eq!(record.current_step().get(), 4);
    assert!(outcome
        .findings
        .iter()
        .all(|f| f.severity == Severity::Warning));
    assert!(record
        .warnings()
        .iter()
        .any(|w| w.message == "no assets declared"));

    // Step 4 needs a contact with a recognized role before moving on.
    assert!(wizard.advance(&mut record).is_err());
    wizard
        .update_section(
            &mut record,
            SectionUpdate::KeyContacts(vec![KeyContact {
                name: "Morgan".to_string(),
                role: "isso".to_string(),
                email: Some("morgan@example.com".to_string()),
                phone: None,
            }]),
        )
        .unwrap();
    wizard.advance(&mut record).unwrap();
    assert_eq!(record.current_step().get(), 5);
}

#[test]
fn catalog_files_reject_dangling_objectives() {
    let practice_id = Uuid::new_v4();
    let practices = write_json(json!([{
        "id": practice_id,
        "practice_id": "AC.L1-3.1.1",
        "domain_code": "AC",
        "nist_171_id": "3.1.1",
        "level": 1,
        "weight_points": 5
    }]));
    let objectives = write_json(json!([{
        "id": Uuid::new_v4(),
        "practice_id": Uuid::new_v4(),
        "objective_code": "[a]",
        "objective_text": "orphan"
    }]));
    let err = Catalog::from_json_files(practices.path(), objectives.path()).unwrap_err();
    assert!(matches!(err, CmmcError::ReferentialIntegrityViolation(_)));

    let parsed: Vec<Practice> =
        serde_json::from_str(&std::fs::read_to_string(practices.path()).unwrap()).unwrap();
    assert_eq!(parsed[0].label(), "AC.L1-3.1.1 - ");
}
