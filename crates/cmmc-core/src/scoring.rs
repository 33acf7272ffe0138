use crate::catalog::SharedCatalog;
use crate::error::{CmmcError, CmmcResult};
use crate::types::{Assessment, CmmcLevel, Finding, MarkStatus, ObjectiveMarks};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-practice scoring breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeScore {
    pub practice_id: Uuid,
    pub practice_code: String,
    pub level: CmmcLevel,
    pub weight_points: f64,
    pub objectives_total: usize,
    pub objectives_met: usize,
    pub objectives_not_applicable: usize,
    pub objectives_not_met: usize,
    pub objectives_unmarked: usize,
    pub satisfied: bool,
}

/// Output of one scoring pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    pub level: CmmcLevel,
    /// Weighted percentage, 0..=100, rounded half-up.
    pub score: u8,
    pub satisfied_points: f64,
    pub total_points: f64,
    pub practices: Vec<PracticeScore>,
    /// Marks on objectives above the assessment level; skipped, not fatal.
    pub ignored_marks: Vec<Uuid>,
    pub warnings: Vec<Finding>,
}

impl ScoreReport {
    pub fn satisfied_practices(&self) -> usize {
        self.practices.iter().filter(|p| p.satisfied).count()
    }
}

/// Weighted practice scoring against the shared catalog.
///
/// A practice is satisfied only when every one of its objectives is marked met
/// or not-applicable; unmarked objectives count as not met. Practices without
/// objectives are left out of both sides of the ratio.
#[derive(Debug, Clone)]
pub struct ScoreEngine {
    catalog: SharedCatalog,
}

impl ScoreEngine {
    pub fn new(catalog: SharedCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &SharedCatalog {
        &self.catalog
    }

    /// Score a mark set for an assessment level. Pure: no state is touched.
    pub fn compute(&self, level: CmmcLevel, marks: &ObjectiveMarks) -> CmmcResult<ScoreReport> {
        let mut ignored_marks = Vec::new();
        for objective_id in marks.keys() {
            let objective = self
                .catalog
                .objective(objective_id)
                .ok_or(CmmcError::UnknownObjective(*objective_id))?;
            let practice = self.catalog.practice(&objective.practice_id).ok_or_else(|| {
                CmmcError::ReferentialIntegrityViolation(format!(
                    "objective {} references missing practice {}",
                    objective.id, objective.practice_id
                ))
            })?;
            if practice.level > level {
                warn!(
                    objective_id = %objective_id,
                    practice = %practice.practice_id,
                    practice_level = practice.level.as_u8(),
                    assessment_level = level.as_u8(),
                    "ignoring mark above assessment level"
                );
                ignored_marks.push(*objective_id);
            }
        }

        let mut practices = Vec::new();
        let mut satisfied_units = 0_u128;
        let mut total_units = 0_u128;

        for practice in self.catalog.practices_at_or_below(level) {
            let mut score = PracticeScore {
                practice_id: practice.id,
                practice_code: practice.practice_id.clone(),
                level: practice.level,
                weight_points: practice.weight_points,
                objectives_total: 0,
                objectives_met: 0,
                objectives_not_applicable: 0,
                objectives_not_met: 0,
                objectives_unmarked: 0,
                satisfied: false,
            };

            for objective in self.catalog.objectives_for(&practice.id) {
                score.objectives_total += 1;
                match marks.get(&objective.id).map(|mark| mark.status) {
                    Some(MarkStatus::Met) => score.objectives_met += 1,
                    Some(MarkStatus::NotApplicable) => score.objectives_not_applicable += 1,
                    Some(MarkStatus::NotMet) => score.objectives_not_met += 1,
                    None => score.objectives_unmarked += 1,
                }
            }

            if score.objectives_total == 0 {
                debug!(practice = %practice.practice_id, "practice has no objectives, excluded");
                continue;
            }

            score.satisfied = score.objectives_not_met == 0 && score.objectives_unmarked == 0;
            let units = weight_units(practice.weight_points);
            total_units += units;
            if score.satisfied {
                satisfied_units += units;
            }
            practices.push(score);
        }

        let satisfied_points = satisfied_units as f64 / WEIGHT_SCALE;
        let total_points = total_units as f64 / WEIGHT_SCALE;
        let mut warnings = Vec::new();
        let score = if practices.is_empty() || total_units == 0 {
            warn!(level = level.as_u8(), "no weighted practices in scope, score defined as 0");
            warnings.push(Finding::warning(
                "NO_PRACTICES_IN_SCOPE",
                None,
                format!("no weighted practices in scope at {}; score defined as 0", level),
            ));
            0
        } else {
            round_half_up_percent(satisfied_units, total_units)
        };

        debug!(
            level = level.as_u8(),
            score,
            satisfied_points,
            total_points,
            practices = practices.len(),
            "score computed"
        );

        Ok(ScoreReport {
            level,
            score,
            satisfied_points,
            total_points,
            practices,
            ignored_marks,
            warnings,
        })
    }

    /// Recompute and overwrite the assessment's score.
    ///
    /// On error the prior `computed_score` is left untouched.
    pub fn recompute(
        &self,
        assessment: &mut Assessment,
        marks: &ObjectiveMarks,
    ) -> CmmcResult<ScoreReport> {
        let report = self.compute(assessment.level, marks)?;
        assessment.computed_score = Some(report.score);
        Ok(report)
    }
}

// Weights are summed as fixed-point integers so an exact .5 ratio is not lost
// to float error before rounding.
const WEIGHT_SCALE: f64 = 1_000_000.0;

fn weight_units(weight: f64) -> u128 {
    // Catalog loading rejects negative and non-finite weights.
    (weight * WEIGHT_SCALE).round() as u128
}

fn round_half_up_percent(numerator: u128, denominator: u128) -> u8 {
    let percent = (numerator * 200 + denominator) / (denominator * 2);
    percent.min(100) as u8
}
