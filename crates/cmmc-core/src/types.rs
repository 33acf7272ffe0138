use crate::error::{CmmcError, CmmcResult};
use crate::lifecycle::AssessmentState;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// CMMC maturity level. Only levels 1 and 2 are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum CmmcLevel {
    Level1,
    Level2,
}

impl CmmcLevel {
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Level1 => 1,
            Self::Level2 => 2,
        }
    }
}

impl TryFrom<u8> for CmmcLevel {
    type Error = CmmcError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Level1),
            2 => Ok(Self::Level2),
            other => Err(CmmcError::InvalidRecord(format!(
                "level {} is not a CMMC level (expected 1 or 2)",
                other
            ))),
        }
    }
}

impl From<CmmcLevel> for u8 {
    fn from(level: CmmcLevel) -> Self {
        level.as_u8()
    }
}

impl fmt::Display for CmmcLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level {}", self.as_u8())
    }
}

/// Who performs the assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentType {
    #[serde(rename = "self")]
    SelfAssessment,
    C3pao,
}

impl AssessmentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SelfAssessment => "self",
            Self::C3pao => "c3pao",
        }
    }
}

/// Catalog practice (e.g. `AC.L2-3.1.1`). Never mutated after catalog load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Practice {
    pub id: Uuid,
    pub practice_id: String,
    pub domain_code: String,
    pub nist_171_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub plain_language: String,
    #[serde(default)]
    pub why_it_matters: String,
    pub level: CmmcLevel,
    pub weight_points: f64,
}

impl Practice {
    /// Operator-facing label: `AC.L2-3.1.1 - Limit system access`.
    pub fn label(&self) -> String {
        format!("{} - {}", self.practice_id, self.title)
    }
}

/// Assessment objective owned by exactly one practice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Objective {
    pub id: Uuid,
    /// Foreign key to `Practice::id`.
    pub practice_id: Uuid,
    pub objective_code: String,
    pub objective_text: String,
}

impl Objective {
    pub fn label(&self) -> String {
        format!("{} - {}", self.objective_code, self.objective_text)
    }
}

/// Compliance mark recorded against one objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkStatus {
    Met,
    NotMet,
    NotApplicable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectiveMark {
    pub status: MarkStatus,
    /// Required when `status` is `not_applicable`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<String>,
}

impl ObjectiveMark {
    pub fn met() -> Self {
        Self {
            status: MarkStatus::Met,
            justification: None,
        }
    }

    pub fn not_met() -> Self {
        Self {
            status: MarkStatus::NotMet,
            justification: None,
        }
    }

    pub fn not_applicable(justification: impl Into<String>) -> Self {
        Self {
            status: MarkStatus::NotApplicable,
            justification: Some(justification.into()),
        }
    }

    /// Met or not-applicable; justification is checked by validation, not here.
    pub fn satisfies(&self) -> bool {
        matches!(self.status, MarkStatus::Met | MarkStatus::NotApplicable)
    }
}

/// Objective id -> compliance mark for one assessment.
pub type ObjectiveMarks = BTreeMap<Uuid, ObjectiveMark>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentStatus {
    Draft,
    InProgress,
    Complete,
}

impl AssessmentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::InProgress => "in_progress",
            Self::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertificationStatus {
    None,
    Pending,
    Certified,
}

impl CertificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Certified => "certified",
        }
    }
}

/// An organization's CMMC assessment.
///
/// `state` and `computed_score` are private: the first only moves through
/// lifecycle transitions, the second only through `ScoreEngine::recompute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AssessmentRecord", into = "AssessmentRecord")]
pub struct Assessment {
    pub id: Uuid,
    pub org_id: Uuid,
    pub scope_id: Option<Uuid>,
    pub level: CmmcLevel,
    pub assessment_type: AssessmentType,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token; advanced by the store on every write.
    pub updated_at: DateTime<Utc>,
    pub(crate) state: AssessmentState,
    pub(crate) computed_score: Option<u8>,
}

impl Assessment {
    pub fn new(
        org_id: Uuid,
        level: CmmcLevel,
        assessment_type: AssessmentType,
        start_date: NaiveDate,
        target_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            org_id,
            scope_id: None,
            level,
            assessment_type,
            start_date,
            target_date,
            created_at: now,
            updated_at: now,
            state: AssessmentState::Draft,
            computed_score: None,
        }
    }

    pub fn with_scope(mut self, scope_id: Uuid) -> Self {
        self.scope_id = Some(scope_id);
        self
    }

    pub fn state(&self) -> &AssessmentState {
        &self.state
    }

    pub fn status(&self) -> AssessmentStatus {
        self.state.status()
    }

    pub fn certification_status(&self) -> CertificationStatus {
        self.state.certification_status()
    }

    pub fn certified_at(&self) -> Option<DateTime<Utc>> {
        self.state.certified_at()
    }

    pub fn certified_by(&self) -> Option<Uuid> {
        self.state.certified_by()
    }

    /// Last score produced by a recomputation, `None` until scored.
    pub fn computed_score(&self) -> Option<u8> {
        self.computed_score
    }
}

/// Datastore wire shape of an assessment: flat status columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessmentRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    #[serde(default)]
    pub scope_id: Option<Uuid>,
    pub level: CmmcLevel,
    pub assessment_type: AssessmentType,
    pub status: AssessmentStatus,
    pub certification_status: CertificationStatus,
    #[serde(default)]
    pub computed_score: Option<u8>,
    pub start_date: NaiveDate,
    pub target_date: NaiveDate,
    #[serde(default)]
    pub certified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub certified_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AssessmentRecord> for Assessment {
    type Error = CmmcError;

    fn try_from(record: AssessmentRecord) -> Result<Self, Self::Error> {
        let state = AssessmentState::from_columns(
            record.status,
            record.certification_status,
            record.certified_at,
            record.certified_by,
        )?;
        if let Some(score) = record.computed_score {
            if score > 100 {
                return Err(CmmcError::InvalidRecord(format!(
                    "assessment {} has computed_score {} outside 0..=100",
                    record.id, score
                )));
            }
        }
        Ok(Self {
            id: record.id,
            org_id: record.org_id,
            scope_id: record.scope_id,
            level: record.level,
            assessment_type: record.assessment_type,
            start_date: record.start_date,
            target_date: record.target_date,
            created_at: record.created_at,
            updated_at: record.updated_at,
            state,
            computed_score: record.computed_score,
        })
    }
}

impl From<Assessment> for AssessmentRecord {
    fn from(assessment: Assessment) -> Self {
        Self {
            id: assessment.id,
            org_id: assessment.org_id,
            scope_id: assessment.scope_id,
            level: assessment.level,
            assessment_type: assessment.assessment_type,
            status: assessment.status(),
            certification_status: assessment.certification_status(),
            computed_score: assessment.computed_score,
            start_date: assessment.start_date,
            target_date: assessment.target_date,
            certified_at: assessment.certified_at(),
            certified_by: assessment.certified_by(),
            created_at: assessment.created_at,
            updated_at: assessment.updated_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Scope records
// ---------------------------------------------------------------------------

/// Wizard step, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct WizardStep(u8);

impl WizardStep {
    pub const FIRST: WizardStep = WizardStep(1);
    pub const LAST: WizardStep = WizardStep(5);

    pub fn new(step: u8) -> CmmcResult<Self> {
        if (Self::FIRST.0..=Self::LAST.0).contains(&step) {
            Ok(Self(step))
        } else {
            Err(CmmcError::InvalidStep(step))
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn next(self) -> Option<Self> {
        Self::new(self.0 + 1).ok()
    }

    /// Sections that must validate before leaving this step.
    pub fn sections(self) -> &'static [ScopeSection] {
        match self.0 {
            1 => &[ScopeSection::CuiBasics],
            2 => &[ScopeSection::Boundary],
            3 => &[ScopeSection::Assets],
            4 => &[ScopeSection::KeyContacts],
            _ => &[ScopeSection::SspInputs, ScopeSection::DiagramInputs],
        }
    }

    pub fn all() -> impl Iterator<Item = WizardStep> {
        (Self::FIRST.0..=Self::LAST.0).map(WizardStep)
    }
}

impl TryFrom<u8> for WizardStep {
    type Error = CmmcError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WizardStep> for u8 {
    fn from(step: WizardStep) -> Self {
        step.0
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named sections of `scope_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScopeSection {
    CuiBasics,
    Boundary,
    Assets,
    KeyContacts,
    SspInputs,
    DiagramInputs,
}

impl ScopeSection {
    pub fn step(self) -> WizardStep {
        match self {
            Self::CuiBasics => WizardStep(1),
            Self::Boundary => WizardStep(2),
            Self::Assets => WizardStep(3),
            Self::KeyContacts => WizardStep(4),
            Self::SspInputs | Self::DiagramInputs => WizardStep(5),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::CuiBasics => "cuiBasics",
            Self::Boundary => "boundary",
            Self::Assets => "assets",
            Self::KeyContacts => "keyContacts",
            Self::SspInputs => "sspInputs",
            Self::DiagramInputs => "diagramInputs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeStatus {
    InProgress,
    Complete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeSource {
    Wizard,
    Import,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuiBasics {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub locations: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSegment {
    pub name: String,
    #[serde(default)]
    pub cidr: Option<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudProvider {
    pub name: String,
    /// FedRAMP authorization level, e.g. `moderate`; `None` when unauthorized.
    #[serde(default)]
    pub fedramp_level: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalConnection {
    pub name: String,
    #[serde(default)]
    pub purpose: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Boundary {
    #[serde(default)]
    pub networks: Vec<NetworkSegment>,
    #[serde(default)]
    pub exclusions: Vec<String>,
    #[serde(default)]
    pub cloud_providers: Vec<CloudProvider>,
    #[serde(default)]
    pub external_connections: Vec<ExternalConnection>,
}

/// CMMC asset categories used for scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetCategory {
    Cui,
    SecurityProtection,
    ContractorRiskManaged,
    Specialized,
    OutOfScope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub category: AssetCategory,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyContact {
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SspInputs {
    #[serde(default)]
    pub system_name: String,
    #[serde(default)]
    pub system_description: String,
    #[serde(default)]
    pub operating_environment: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramInputs {
    #[serde(default)]
    pub zones: Vec<String>,
    #[serde(default)]
    pub include_cloud: bool,
    #[serde(default)]
    pub include_external_connections: bool,
}

/// Structured scoping answers, one field per wizard section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeData {
    #[serde(default)]
    pub cui_basics: CuiBasics,
    #[serde(default)]
    pub boundary: Boundary,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub key_contacts: Vec<KeyContact>,
    #[serde(default)]
    pub ssp_inputs: Option<SspInputs>,
    #[serde(default)]
    pub diagram_inputs: Option<DiagramInputs>,
}

/// Replacement for a single `scope_data` section.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionUpdate {
    CuiBasics(CuiBasics),
    Boundary(Boundary),
    Assets(Vec<Asset>),
    KeyContacts(Vec<KeyContact>),
    SspInputs(Option<SspInputs>),
    DiagramInputs(Option<DiagramInputs>),
}

impl SectionUpdate {
    pub fn section(&self) -> ScopeSection {
        match self {
            Self::CuiBasics(_) => ScopeSection::CuiBasics,
            Self::Boundary(_) => ScopeSection::Boundary,
            Self::Assets(_) => ScopeSection::Assets,
            Self::KeyContacts(_) => ScopeSection::KeyContacts,
            Self::SspInputs(_) => ScopeSection::SspInputs,
            Self::DiagramInputs(_) => ScopeSection::DiagramInputs,
        }
    }

    pub(crate) fn apply(self, data: &mut ScopeData) {
        match self {
            Self::CuiBasics(section) => data.cui_basics = section,
            Self::Boundary(section) => data.boundary = section,
            Self::Assets(section) => data.assets = section,
            Self::KeyContacts(section) => data.key_contacts = section,
            Self::SspInputs(section) => data.ssp_inputs = section,
            Self::DiagramInputs(section) => data.diagram_inputs = section,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Blocking,
    Warning,
}

/// One validation finding. Warnings are data, never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<ScopeSection>,
    pub message: String,
}

impl Finding {
    pub fn blocking(
        code: impl Into<String>,
        section: Option<ScopeSection>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Blocking,
            code: code.into(),
            section,
            message: message.into(),
        }
    }

    pub fn warning(
        code: impl Into<String>,
        section: Option<ScopeSection>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.into(),
            section,
            message: message.into(),
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Blocking
    }
}

/// Readiness flags for downstream document generators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedOutputs {
    pub ssp: bool,
    pub network_diagram: bool,
}

/// An organization's scoping record, driven by the scope wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScopeRecordWire", into = "ScopeRecordWire")]
pub struct ScopeRecord {
    pub id: Uuid,
    pub org_id: Uuid,
    pub cmmc_level: CmmcLevel,
    pub assessment_type: AssessmentType,
    pub source: ScopeSource,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency token; advanced by the store on every write.
    pub updated_at: DateTime<Utc>,
    pub(crate) status: ScopeStatus,
    pub(crate) current_step: WizardStep,
    /// Highest step whose sections validated without blocking findings (0 = none).
    pub(crate) validated_through: u8,
    pub(crate) scope_data: ScopeData,
    pub(crate) warnings: Vec<Finding>,
    pub(crate) generated_outputs: GeneratedOutputs,
}

impl ScopeRecord {
    /// Start a record from the interactive wizard at step 1.
    pub fn new(
        org_id: Uuid,
        created_by: Uuid,
        cmmc_level: CmmcLevel,
        assessment_type: AssessmentType,
    ) -> Self {
        Self::build(
            org_id,
            created_by,
            cmmc_level,
            assessment_type,
            ScopeSource::Wizard,
            ScopeData::default(),
        )
    }

    /// Bulk import with pre-filled scope data. Every step still has to validate.
    pub fn import(
        org_id: Uuid,
        created_by: Uuid,
        cmmc_level: CmmcLevel,
        assessment_type: AssessmentType,
        scope_data: ScopeData,
    ) -> Self {
        Self::build(
            org_id,
            created_by,
            cmmc_level,
            assessment_type,
            ScopeSource::Import,
            scope_data,
        )
    }

    fn build(
        org_id: Uuid,
        created_by: Uuid,
        cmmc_level: CmmcLevel,
        assessment_type: AssessmentType,
        source: ScopeSource,
        scope_data: ScopeData,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            org_id,
            cmmc_level,
            assessment_type,
            source,
            created_by,
            created_at: now,
            updated_at: now,
            status: ScopeStatus::InProgress,
            current_step: WizardStep::FIRST,
            validated_through: 0,
            scope_data,
            warnings: Vec::new(),
            generated_outputs: GeneratedOutputs::default(),
        }
    }

    pub fn status(&self) -> ScopeStatus {
        self.status
    }

    pub fn current_step(&self) -> WizardStep {
        self.current_step
    }

    pub fn validated_through(&self) -> u8 {
        self.validated_through
    }

    pub fn scope_data(&self) -> &ScopeData {
        &self.scope_data
    }

    pub fn warnings(&self) -> &[Finding] {
        &self.warnings
    }

    pub fn generated_outputs(&self) -> GeneratedOutputs {
        self.generated_outputs
    }

    pub fn is_complete(&self) -> bool {
        self.status == ScopeStatus::Complete
    }
}

/// Datastore wire shape of a scope record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeRecordWire {
    pub id: Uuid,
    pub org_id: Uuid,
    pub cmmc_level: CmmcLevel,
    pub status: ScopeStatus,
    pub current_step: u8,
    #[serde(default)]
    pub validated_through: Option<u8>,
    pub assessment_type: AssessmentType,
    pub source: ScopeSource,
    #[serde(default)]
    pub scope_data: ScopeData,
    #[serde(default)]
    pub warnings: Vec<Finding>,
    #[serde(default)]
    pub generated_outputs: GeneratedOutputs,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ScopeRecordWire> for ScopeRecord {
    type Error = CmmcError;

    fn try_from(wire: ScopeRecordWire) -> Result<Self, Self::Error> {
        let current_step = WizardStep::new(wire.current_step)?;
        let floor = current_step.get() - 1;
        let validated_through = match (wire.status, wire.validated_through) {
            (ScopeStatus::Complete, _) => WizardStep::LAST.get(),
            (ScopeStatus::InProgress, Some(through)) => through,
            (ScopeStatus::InProgress, None) => floor,
        };
        if validated_through < floor || validated_through > WizardStep::LAST.get() {
            return Err(CmmcError::InvalidRecord(format!(
                "scope record {} at step {} cannot be validated through step {}",
                wire.id, current_step, validated_through
            )));
        }
        if wire.status == ScopeStatus::Complete && current_step != WizardStep::LAST {
            return Err(CmmcError::InvalidRecord(format!(
                "scope record {} is complete but sits at step {}",
                wire.id, current_step
            )));
        }
        Ok(Self {
            id: wire.id,
            org_id: wire.org_id,
            cmmc_level: wire.cmmc_level,
            assessment_type: wire.assessment_type,
            source: wire.source,
            created_by: wire.created_by,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            status: wire.status,
            current_step,
            validated_through,
            scope_data: wire.scope_data,
            warnings: wire.warnings,
            generated_outputs: wire.generated_outputs,
        })
    }
}

impl From<ScopeRecord> for ScopeRecordWire {
    fn from(record: ScopeRecord) -> Self {
        Self {
            id: record.id,
            org_id: record.org_id,
            cmmc_level: record.cmmc_level,
            status: record.status,
            current_step: record.current_step.get(),
            validated_through: Some(record.validated_through),
            assessment_type: record.assessment_type,
            source: record.source,
            scope_data: record.scope_data,
            warnings: record.warnings,
            generated_outputs: record.generated_outputs,
            created_by: record.created_by,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}
