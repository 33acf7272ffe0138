//! Read-only CMMC practice/objective catalog.
//!
//! The catalog is loaded once per process, checked for referential integrity,
//! and shared behind an `Arc` by every scoring and validation call.

use crate::error::{CmmcError, CmmcResult};
use crate::types::{AssessmentRecord, CmmcLevel, Objective, Practice};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Practice count of the published CMMC Level 1 + Level 2 catalog.
pub const CANONICAL_PRACTICE_COUNT: usize = 110;
/// Objective count of the published CMMC Level 1 + Level 2 catalog.
pub const CANONICAL_OBJECTIVE_COUNT: usize = 378;

pub type SharedCatalog = Arc<Catalog>;

/// Immutable snapshot of practices and their objectives.
#[derive(Debug, Clone)]
pub struct Catalog {
    practices: Vec<Practice>,
    objectives: Vec<Objective>,
    practice_index: HashMap<Uuid, usize>,
    practice_code_index: HashMap<String, usize>,
    objective_index: HashMap<Uuid, usize>,
    objectives_by_practice: HashMap<Uuid, Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogSummary {
    pub practices: usize,
    pub objectives: usize,
    pub level1_practices: usize,
    pub level2_practices: usize,
    pub practices_without_objectives: usize,
    pub domains: Vec<String>,
}

impl CatalogSummary {
    pub fn is_canonical(&self) -> bool {
        self.practices == CANONICAL_PRACTICE_COUNT && self.objectives == CANONICAL_OBJECTIVE_COUNT
    }
}

impl Catalog {
    /// Build a catalog, rejecting dangling foreign keys and duplicate codes.
    pub fn from_records(practices: Vec<Practice>, objectives: Vec<Objective>) -> CmmcResult<Self> {
        let mut practice_index = HashMap::with_capacity(practices.len());
        let mut practice_code_index = HashMap::with_capacity(practices.len());

        for (idx, practice) in practices.iter().enumerate() {
            if !practice.weight_points.is_finite() || practice.weight_points < 0.0 {
                return Err(CmmcError::InvalidRecord(format!(
                    "practice {} has invalid weight_points {}",
                    practice.practice_id, practice.weight_points
                )));
            }
            if practice_index.insert(practice.id, idx).is_some() {
                return Err(CmmcError::InvalidRecord(format!(
                    "duplicate practice id {}",
                    practice.id
                )));
            }
            if practice_code_index
                .insert(practice.practice_id.clone(), idx)
                .is_some()
            {
                return Err(CmmcError::InvalidRecord(format!(
                    "duplicate practice code {}",
                    practice.practice_id
                )));
            }
        }

        let mut objective_index = HashMap::with_capacity(objectives.len());
        let mut objectives_by_practice: HashMap<Uuid, Vec<usize>> = HashMap::new();
        let mut codes_seen: HashSet<(Uuid, String)> = HashSet::with_capacity(objectives.len());

        for (idx, objective) in objectives.iter().enumerate() {
            if !practice_index.contains_key(&objective.practice_id) {
                return Err(CmmcError::ReferentialIntegrityViolation(format!(
                    "objective {} references missing practice {}",
                    objective.objective_code, objective.practice_id
                )));
            }
            if objective_index.insert(objective.id, idx).is_some() {
                return Err(CmmcError::InvalidRecord(format!(
                    "duplicate objective id {}",
                    objective.id
                )));
            }
            if !codes_seen.insert((objective.practice_id, objective.objective_code.clone())) {
                return Err(CmmcError::InvalidRecord(format!(
                    "duplicate objective code {} within practice {}",
                    objective.objective_code, objective.practice_id
                )));
            }
            objectives_by_practice
                .entry(objective.practice_id)
                .or_default()
                .push(idx);
        }

        let catalog = Self {
            practices,
            objectives,
            practice_index,
            practice_code_index,
            objective_index,
            objectives_by_practice,
        };

        let summary = catalog.summary();
        if summary.is_canonical() {
            debug!(
                practices = summary.practices,
                objectives = summary.objectives,
                "catalog loaded"
            );
        } else {
            warn!(
                practices = summary.practices,
                objectives = summary.objectives,
                expected_practices = CANONICAL_PRACTICE_COUNT,
                expected_objectives = CANONICAL_OBJECTIVE_COUNT,
                "catalog differs from the canonical CMMC practice set"
            );
        }

        Ok(catalog)
    }

    /// Load `cmmc-practices.json` / `cmmc-objectives.json` style data files.
    pub fn from_json_files(
        practices_path: impl AsRef<Path>,
        objectives_path: impl AsRef<Path>,
    ) -> CmmcResult<Self> {
        let practices: Vec<Practice> = read_json(practices_path.as_ref())?;
        let objectives: Vec<Objective> = read_json(objectives_path.as_ref())?;
        Self::from_records(practices, objectives)
    }

    pub fn shared(self) -> SharedCatalog {
        Arc::new(self)
    }

    pub fn practices(&self) -> &[Practice] {
        &self.practices
    }

    pub fn objectives(&self) -> &[Objective] {
        &self.objectives
    }

    pub fn practice(&self, id: &Uuid) -> Option<&Practice> {
        self.practice_index.get(id).map(|idx| &self.practices[*idx])
    }

    pub fn practice_by_code(&self, code: &str) -> Option<&Practice> {
        self.practice_code_index
            .get(code)
            .map(|idx| &self.practices[*idx])
    }

    pub fn objective(&self, id: &Uuid) -> Option<&Objective> {
        self.objective_index.get(id).map(|idx| &self.objectives[*idx])
    }

    /// Objectives owned by a practice, in catalog order.
    pub fn objectives_for(&self, practice_id: &Uuid) -> impl Iterator<Item = &Objective> + '_ {
        self.objectives_by_practice
            .get(practice_id)
            .into_iter()
            .flatten()
            .map(|idx| &self.objectives[*idx])
    }

    pub fn objective_count_for(&self, practice_id: &Uuid) -> usize {
        self.objectives_by_practice
            .get(practice_id)
            .map_or(0, Vec::len)
    }

    /// Practices in scope for an assessment at `level`.
    pub fn practices_at_or_below(&self, level: CmmcLevel) -> impl Iterator<Item = &Practice> + '_ {
        self.practices.iter().filter(move |p| p.level <= level)
    }

    pub fn domains(&self) -> Vec<String> {
        self.practices
            .iter()
            .map(|p| p.domain_code.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn summary(&self) -> CatalogSummary {
        let mut per_level: BTreeMap<CmmcLevel, usize> = BTreeMap::new();
        for practice in &self.practices {
            *per_level.entry(practice.level).or_default() += 1;
        }
        CatalogSummary {
            practices: self.practices.len(),
            objectives: self.objectives.len(),
            level1_practices: per_level.get(&CmmcLevel::Level1).copied().unwrap_or(0),
            level2_practices: per_level.get(&CmmcLevel::Level2).copied().unwrap_or(0),
            practices_without_objectives: self
                .practices
                .iter()
                .filter(|p| self.objective_count_for(&p.id) == 0)
                .count(),
            domains: self.domains(),
        }
    }
}

/// Load a `cmmc-assessments.json` style export.
pub fn load_assessment_records(path: impl AsRef<Path>) -> CmmcResult<Vec<AssessmentRecord>> {
    read_json(path.as_ref())
}

/// Distinct organization ids in first-seen order.
pub fn organization_ids(records: &[AssessmentRecord]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| seen.insert(record.org_id))
        .map(|record| record.org_id)
        .collect()
}

fn read_json<T: DeserializeOwned>(path: &Path) -> CmmcResult<T> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CmmcError::CatalogLoad(format!("{}: {}", path.display(), e)))?;
    serde_json::from_str(&raw)
        .map_err(|e| CmmcError::CatalogLoad(format!("{}: {}", path.display(), e)))
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use std::io::Write;

    #[test]
    fn indexes_practices_and_objectives() {
        let p1 = practice("AC.L1-3.1.1", CmmcLevel::Level1, 5.0);
        let p2 = practice("SC.L2-3.13.11", CmmcLevel::Level2, 3.0);
        let o1 = objective(&p1, "[a]");
        let o2 = objective(&p1, "[b]");
        let o3 = objective(&p2, "[a]");
        let catalog = Catalog::from_records(
            vec![p1.clone(), p2.clone()],
            vec![o1.clone(), o2.clone(), o3],
        )
        .unwrap();

        assert_eq!(catalog.practice_by_code("AC.L1-3.1.1"), Some(&p1));
        let owned: Vec<_> = catalog.objectives_for(&p1.id).collect();
        assert_eq!(owned, vec![&o1, &o2]);
        assert_eq!(catalog.practices_at_or_below(CmmcLevel::Level1).count(), 1);
        assert_eq!(catalog.domains(), vec!["AC".to_string(), "SC".to_string()]);

        let summary = catalog.summary();
        assert_eq!(summary.level2_practices, 1);
        assert!(!summary.is_canonical());
    }

    #[test]
    fn rejects_dangling_practice_reference() {
        let p1 = practice("AC.L1-3.1.1", CmmcLevel::Level1, 5.0);
        let orphan = objective(&practice("XX.L1-0", CmmcLevel::Level1, 1.0), "[a]");
        let err = Catalog::from_records(vec![p1], vec![orphan]).unwrap_err();
        assert!(matches!(err, CmmcError::ReferentialIntegrityViolation(_)));
    }

    #[test]
    fn rejects_duplicate_objective_codes_and_negative_weights() {
        let p1 = practice("AC.L1-3.1.1", CmmcLevel::Level1, 5.0);
        let dup = vec![objective(&p1, "[a]"), objective(&p1, "[a]")];
        assert!(Catalog::from_records(vec![p1], dup).is_err());

        let negative = practice("AC.L1-3.1.2", CmmcLevel::Level1, -1.0);
        assert!(Catalog::from_records(vec![negative], vec![]).is_err());
    }

    #[test]
    fn labels_match_operator_display() {
        let p1 = practice("AC.L2-3.1.1", CmmcLevel::Level2, 5.0);
        assert_eq!(p1.label(), "AC.L2-3.1.1 - AC.L2-3.1.1 title");
        assert_eq!(objective(&p1, "[a]").label(), "[a] - [a] text");
    }

    #[test]
    fn loads_catalog_from_json_files() {
        let p1 = practice("AC.L1-3.1.1", CmmcLevel::Level1, 5.0);
        let o1 = objective(&p1, "[a]");

        let mut practices = tempfile::NamedTempFile::new().unwrap();
        write!(practices, "{}", serde_json::to_string(&vec![&p1]).unwrap()).unwrap();
        let mut objectives = tempfile::NamedTempFile::new().unwrap();
        write!(objectives, "{}", serde_json::to_string(&vec![&o1]).unwrap()).unwrap();

        let catalog = Catalog::from_json_files(practices.path(), objectives.path()).unwrap();
        assert_eq!(catalog.objective(&o1.id), Some(&o1));
    }

    #[test]
    fn missing_file_is_a_load_error() {
        let err = Catalog::from_json_files("/nonexistent/p.json", "/nonexistent/o.json")
            .unwrap_err();
        assert!(matches!(err, CmmcError::CatalogLoad(_)));
    }
}
