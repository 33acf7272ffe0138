//! Persistence boundary for assessments, objective marks, and scope records.
//!
//! Writes are optimistic: an update carries the `updated_at` it was read
//! with and is rejected with `StaleWrite` when the stored copy has moved on.

use crate::error::{CmmcError, CmmcResult, StoreError};
use crate::types::{Assessment, ObjectiveMarks, ScopeRecord};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Combined store used by the services.
pub trait ComplianceStore: AssessmentStore + ScopeStore + Send + Sync {}

impl<T> ComplianceStore for T where T: AssessmentStore + ScopeStore + Send + Sync {}

/// Storage for assessments and their objective marks.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    /// Get an assessment by ID
    async fn get_assessment(&self, id: &Uuid) -> CmmcResult<Option<Assessment>>;

    /// List assessments belonging to an organization
    async fn list_assessments_for_org(&self, org_id: &Uuid) -> CmmcResult<Vec<Assessment>>;

    /// Find the assessment linked to a scope record, if any
    async fn find_assessment_by_scope(&self, scope_id: &Uuid) -> CmmcResult<Option<Assessment>>;

    /// Insert a new assessment; returns the stored copy
    async fn insert_assessment(&self, assessment: Assessment) -> CmmcResult<Assessment>;

    /// Replace an assessment, optionally together with its marks, in one write.
    /// Returns the stored copy with an advanced `updated_at`.
    async fn update_assessment(
        &self,
        assessment: Assessment,
        marks: Option<ObjectiveMarks>,
    ) -> CmmcResult<Assessment>;

    /// Objective marks recorded for an assessment (empty when none)
    async fn get_marks(&self, assessment_id: &Uuid) -> CmmcResult<ObjectiveMarks>;
}

/// Storage for scope records.
#[async_trait]
pub trait ScopeStore: Send + Sync {
    /// Get a scope record by ID
    async fn get_scope(&self, id: &Uuid) -> CmmcResult<Option<ScopeRecord>>;

    /// List scope records belonging to an organization
    async fn list_scopes_for_org(&self, org_id: &Uuid) -> CmmcResult<Vec<ScopeRecord>>;

    /// Insert a new scope record; returns the stored copy
    async fn insert_scope(&self, record: ScopeRecord) -> CmmcResult<ScopeRecord>;

    /// Replace a scope record; returns the stored copy with an advanced `updated_at`
    async fn update_scope(&self, record: ScopeRecord) -> CmmcResult<ScopeRecord>;
}

#[derive(Debug, Default)]
struct Tables {
    assessments: HashMap<Uuid, Assessment>,
    marks: HashMap<Uuid, ObjectiveMarks>,
    scopes: HashMap<Uuid, ScopeRecord>,
}

impl Tables {
    /// A linked scope must exist and be unclaimed by any other assessment.
    fn check_scope_link(&self, assessment: &Assessment) -> CmmcResult<()> {
        let Some(scope_id) = assessment.scope_id else {
            return Ok(());
        };
        if !self.scopes.contains_key(&scope_id) {
            return Err(CmmcError::ReferentialIntegrityViolation(format!(
                "assessment {} references missing scope record {}",
                assessment.id, scope_id
            )));
        }
        if let Some(other) = self
            .assessments
            .values()
            .find(|a| a.scope_id == Some(scope_id) && a.id != assessment.id)
        {
            return Err(CmmcError::ReferentialIntegrityViolation(format!(
                "scope record {} is already linked to assessment {}",
                scope_id, other.id
            )));
        }
        Ok(())
    }
}

/// In-memory store for development and testing.
///
/// All tables sit behind one lock so cross-entity checks and combined
/// assessment + marks writes are atomic.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Next concurrency token: strictly after `previous` even if the clock stalls.
fn next_version(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

#[async_trait]
impl AssessmentStore for InMemoryStore {
    async fn get_assessment(&self, id: &Uuid) -> CmmcResult<Option<Assessment>> {
        let tables = self.tables.read().await;
        Ok(tables.assessments.get(id).cloned())
    }

    async fn list_assessments_for_org(&self, org_id: &Uuid) -> CmmcResult<Vec<Assessment>> {
        let tables = self.tables.read().await;
        let mut found: Vec<Assessment> = tables
            .assessments
            .values()
            .filter(|a| &a.org_id == org_id)
            .cloned()
            .collect();
        found.sort_by_key(|a| a.created_at);
        Ok(found)
    }

    async fn find_assessment_by_scope(&self, scope_id: &Uuid) -> CmmcResult<Option<Assessment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .assessments
            .values()
            .find(|a| a.scope_id.as_ref() == Some(scope_id))
            .cloned())
    }

    async fn insert_assessment(&self, assessment: Assessment) -> CmmcResult<Assessment> {
        let mut tables = self.tables.write().await;
        if tables.assessments.contains_key(&assessment.id) {
            return Err(StoreError::Duplicate {
                entity: "assessment",
                id: assessment.id,
            }
            .into());
        }
        tables.check_scope_link(&assessment)?;
        tables.assessments.insert(assessment.id, assessment.clone());
        debug!(assessment_id = %assessment.id, "assessment inserted");
        Ok(assessment)
    }

    async fn update_assessment(
        &self,
        mut assessment: Assessment,
        marks: Option<ObjectiveMarks>,
    ) -> CmmcResult<Assessment> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .assessments
            .get(&assessment.id)
            .ok_or(CmmcError::NotFound {
                entity: "assessment",
                id: assessment.id,
            })?;
        if stored.updated_at != assessment.updated_at {
            return Err(CmmcError::StaleWrite {
                entity: "assessment",
                id: assessment.id,
            });
        }
        tables.check_scope_link(&assessment)?;

        assessment.updated_at = next_version(assessment.updated_at);
        if let Some(marks) = marks {
            tables.marks.insert(assessment.id, marks);
        }
        tables.assessments.insert(assessment.id, assessment.clone());
        debug!(
            assessment_id = %assessment.id,
            updated_at = %assessment.updated_at,
            "assessment updated"
        );
        Ok(assessment)
    }

    async fn get_marks(&self, assessment_id: &Uuid) -> CmmcResult<ObjectiveMarks> {
        let tables = self.tables.read().await;
        if !tables.assessments.contains_key(assessment_id) {
            return Err(CmmcError::NotFound {
                entity: "assessment",
                id: *assessment_id,
            });
        }
        Ok(tables.marks.get(assessment_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ScopeStore for InMemoryStore {
    async fn get_scope(&self, id: &Uuid) -> CmmcResult<Option<ScopeRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.scopes.get(id).cloned())
    }

    async fn list_scopes_for_org(&self, org_id: &Uuid) -> CmmcResult<Vec<ScopeRecord>> {
        let tables = self.tables.read().await;
        let mut found: Vec<ScopeRecord> = tables
            .scopes
            .values()
            .filter(|s| &s.org_id == org_id)
            .cloned()
            .collect();
        found.sort_by_key(|s| s.created_at);
        Ok(found)
    }

    async fn insert_scope(&self, record: ScopeRecord) -> CmmcResult<ScopeRecord> {
        let mut tables = self.tables.write().await;
        if tables.scopes.contains_key(&record.id) {
            return Err(StoreError::Duplicate {
                entity: "scope_record",
                id: record.id,
            }
            .into());
        }
        tables.scopes.insert(record.id, record.clone());
        debug!(scope_id = %record.id, "scope record inserted");
        Ok(record)
    }

    async fn update_scope(&self, mut record: ScopeRecord) -> CmmcResult<ScopeRecord> {
        let mut tables = self.tables.write().await;
        let stored = tables.scopes.get(&record.id).ok_or(CmmcError::NotFound {
            entity: "scope_record",
            id: record.id,
        })?;
        if stored.updated_at != record.updated_at {
            return Err(CmmcError::StaleWrite {
                entity: "scope_record",
                id: record.id,
            });
        }
        record.updated_at = next_version(record.updated_at);
        tables.scopes.insert(record.id, record.clone());
        debug!(scope_id = %record.id, updated_at = %record.updated_at, "scope record updated");
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssessmentType, CmmcLevel, ObjectiveMark};
    use chrono::NaiveDate;

    fn assessment(org_id: Uuid) -> Assessment {
        Assessment::new(
            org_id,
            CmmcLevel::Level2,
            AssessmentType::SelfAssessment,
            NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
        )
    }

    fn scope(org_id: Uuid) -> ScopeRecord {
        ScopeRecord::new(
            org_id,
            Uuid::new_v4(),
            CmmcLevel::Level2,
            AssessmentType::SelfAssessment,
        )
    }

    #[tokio::test]
    async fn insert_and_get_assessment() {
        let store = InMemoryStore::new();
        let org = Uuid::new_v4();
        let stored = store.insert_assessment(assessment(org)).await.unwrap();

        let fetched = store.get_assessment(&stored.id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(store.list_assessments_for_org(&org).await.unwrap().len(), 1);
        assert!(store.get_marks(&stored.id).await.unwrap().is_empty());

        let err = store.insert_assessment(stored).await.unwrap_err();
        assert!(matches!(err, CmmcError::Store(StoreError::Duplicate { .. })));
    }

    #[tokio::test]
    async fn stale_update_is_rejected() {
        let store = InMemoryStore::new();
        let original = store
            .insert_assessment(assessment(Uuid::new_v4()))
            .await
            .unwrap();

        let first = store
            .update_assessment(original.clone(), None)
            .await
            .unwrap();
        assert!(first.updated_at > original.updated_at);

        let err = store.update_assessment(original, None).await.unwrap_err();
        assert!(matches!(err, CmmcError::StaleWrite { entity: "assessment", .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn marks_are_written_with_the_assessment() {
        let store = InMemoryStore::new();
        let stored = store
            .insert_assessment(assessment(Uuid::new_v4()))
            .await
            .unwrap();
        let mut marks = ObjectiveMarks::new();
        marks.insert(Uuid::new_v4(), ObjectiveMark::met());

        let stale = stored.clone();
        store
            .update_assessment(stored, Some(marks.clone()))
            .await
            .unwrap();
        assert_eq!(store.get_marks(&stale.id).await.unwrap(), marks);

        let err = store
            .update_assessment(stale.clone(), Some(ObjectiveMarks::new()))
            .await
            .unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.get_marks(&stale.id).await.unwrap(), marks);
    }

    #[tokio::test]
    async fn scope_links_are_unique_and_must_resolve() {
        let store = InMemoryStore::new();
        let org = Uuid::new_v4();

        let dangling = assessment(org).with_scope(Uuid::new_v4());
        let err = store.insert_assessment(dangling).await.unwrap_err();
        assert!(matches!(err, CmmcError::ReferentialIntegrityViolation(_)));

        let record = store.insert_scope(scope(org)).await.unwrap();
        let first = store
            .insert_assessment(assessment(org).with_scope(record.id))
            .await
            .unwrap();
        let err = store
            .insert_assessment(assessment(org).with_scope(record.id))
            .await
            .unwrap_err();
        assert!(matches!(err, CmmcError::ReferentialIntegrityViolation(_)));

        let linked = store
            .find_assessment_by_scope(&record.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(linked.id, first.id);
        // Re-saving the owner keeps its own link.
        store.update_assessment(first, None).await.unwrap();
    }

    #[tokio::test]
    async fn scope_updates_are_optimistic() {
        let store = InMemoryStore::new();
        let record = store.insert_scope(scope(Uuid::new_v4())).await.unwrap();
        let updated = store.update_scope(record.clone()).await.unwrap();
        assert!(updated.updated_at > record.updated_at);
        let err = store.update_scope(record).await.unwrap_err();
        assert!(matches!(err, CmmcError::StaleWrite { entity: "scope_record", .. }));

        let missing = scope(Uuid::new_v4());
        let err = store.update_scope(missing).await.unwrap_err();
        assert!(matches!(err, CmmcError::NotFound { .. }));
    }
}
