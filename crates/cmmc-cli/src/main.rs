//! cmmc - operator CLI for the CMMC compliance core
//!
//! Reads the practice/objective catalog and assessment exports from JSON
//! files, scores mark sets, and validates scoping data offline.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use cmmc_core::{
    load_assessment_records, organization_ids, Catalog, CmmcLevel, Finding, ObjectiveMarks,
    ScopeData, ScoreEngine, Severity, ValidationEngine, WizardStep,
};
use serde::Serialize;
use std::path::Path;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "cmmc")]
#[command(about = "CMMC catalog, scoring, and scoping utilities", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CMMC_CONFIG")]
    config: Option<String>,

    /// Practices JSON file (overrides config)
    #[arg(long)]
    practices: Option<String>,

    /// Objectives JSON file (overrides config)
    #[arg(long)]
    objectives: Option<String>,

    /// Assessments JSON file (overrides config)
    #[arg(long)]
    assessments: Option<String>,

    /// Log level (overrides config)
    #[arg(long)]
    log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize the catalog and check it against the canonical counts
    Catalog,

    /// List practices
    Practices {
        /// Only practices at or below this level
        #[arg(long, value_parser = parse_level)]
        level: Option<CmmcLevel>,

        /// Only practices in this domain (e.g. AC)
        #[arg(long)]
        domain: Option<String>,
    },

    /// List the assessment objectives of one practice
    Objectives {
        /// Practice code, e.g. AC.L2-3.1.1
        practice: String,
    },

    /// List organizations found in the assessments file
    Orgs,

    /// Score a set of objective marks
    Score {
        /// JSON object mapping objective id to {"status", "justification"}
        #[arg(long)]
        marks: String,

        #[arg(long, value_parser = parse_level, default_value = "2")]
        level: CmmcLevel,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a set of marks against one practice's objectives
    ValidatePractice {
        practice: String,

        #[arg(long)]
        marks: String,
    },

    /// Validate scope_data JSON against every wizard step
    ValidateScope {
        file: String,

        /// Print findings as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_level(raw: &str) -> Result<CmmcLevel, String> {
    let value: u8 = raw
        .trim()
        .parse()
        .map_err(|_| format!("'{}' is not a level", raw))?;
    CmmcLevel::try_from(value).map_err(|e| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = CliConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(path) = cli.practices.clone() {
        config.catalog.practices_path = path;
    }
    if let Some(path) = cli.objectives.clone() {
        config.catalog.objectives_path = path;
    }
    if let Some(path) = cli.assessments.clone() {
        config.catalog.assessments_path = path;
    }
    if let Some(level) = cli.log_level.clone() {
        config.logging.level = level;
    }
    config.logging.json |= cli.log_json;

    init_tracing(&config);

    match cli.command {
        Commands::Catalog => show_catalog(&config),
        Commands::Practices { level, domain } => list_practices(&config, level, domain.as_deref()),
        Commands::Objectives { practice } => list_objectives(&config, &practice),
        Commands::Orgs => list_orgs(&config),
        Commands::Score { marks, level, json } => score(&config, &marks, level, json),
        Commands::ValidatePractice { practice, marks } => {
            validate_practice(&config, &practice, &marks)
        }
        Commands::ValidateScope { file, json } => validate_scope(&file, json),
    }
}

// Logs go to stderr so command output stays pipeable.
fn init_tracing(config: &CliConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_catalog(config: &CliConfig) -> Result<Catalog> {
    let catalog = Catalog::from_json_files(
        &config.catalog.practices_path,
        &config.catalog.objectives_path,
    )
    .with_context(|| {
        format!(
            "loading catalog from {} and {}",
            config.catalog.practices_path, config.catalog.objectives_path
        )
    })?;
    info!(
        practices = catalog.practices().len(),
        objectives = catalog.objectives().len(),
        "catalog loaded"
    );
    Ok(catalog)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
    let raw = std::fs::read_to_string(Path::new(path)).with_context(|| format!("reading {}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn show_catalog(config: &CliConfig) -> Result<()> {
    let summary = load_catalog(config)?.summary();
    println!("Practices:  {}", summary.practices);
    println!("  Level 1:  {}", summary.level1_practices);
    println!("  Level 2:  {}", summary.level2_practices);
    println!("Objectives: {}", summary.objectives);
    println!("Domains:    {}", summary.domains.join(", "));
    if summary.practices_without_objectives > 0 {
        println!(
            "Practices without objectives: {}",
            summary.practices_without_objectives
        );
    }
    println!(
        "Canonical:  {}",
        if summary.is_canonical() { "yes" } else { "no" }
    );
    Ok(())
}

fn list_practices(config: &CliConfig, level: Option<CmmcLevel>, domain: Option<&str>) -> Result<()> {
    let catalog = load_catalog(config)?;
    let practices = catalog
        .practices()
        .iter()
        .filter(|p| level.map_or(true, |l| p.level <= l))
        .filter(|p| domain.map_or(true, |d| p.domain_code.eq_ignore_ascii_case(d)));
    for practice in practices {
        println!(
            "{:<8} {:>5.1}  {}",
            practice.level.to_string(),
            practice.weight_points,
            practice.label()
        );
    }
    Ok(())
}

fn list_objectives(config: &CliConfig, code: &str) -> Result<()> {
    let catalog = load_catalog(config)?;
    let Some(practice) = catalog.practice_by_code(code) else {
        bail!("unknown practice {}", code);
    };
    println!("{}", practice.label());
    for objective in catalog.objectives_for(&practice.id) {
        println!("  {}", objective.label());
    }
    Ok(())
}

fn list_orgs(config: &CliConfig) -> Result<()> {
    let records = load_assessment_records(&config.catalog.assessments_path)
        .with_context(|| format!("loading {}", config.catalog.assessments_path))?;
    for org_id in organization_ids(&records) {
        let count = records.iter().filter(|r| r.org_id == org_id).count();
        println!("{}  ({} assessment(s))", org_id, count);
    }
    Ok(())
}

fn score(config: &CliConfig, marks_path: &str, level: CmmcLevel, json: bool) -> Result<()> {
    let catalog = load_catalog(config)?.shared();
    let marks: ObjectiveMarks = read_json(marks_path)?;
    let report = ScoreEngine::new(catalog).compute(level, &marks)?;

    if json {
        return print_json(&report);
    }
    println!("{} score: {}", report.level, report.score);
    println!(
        "Satisfied practices: {}/{} ({:.1} of {:.1} points)",
        report.satisfied_practices(),
        report.practices.len(),
        report.satisfied_points,
        report.total_points
    );
    if !report.ignored_marks.is_empty() {
        println!("Ignored marks above {}: {}", report.level, report.ignored_marks.len());
    }
    print_findings(&report.warnings);
    Ok(())
}

fn validate_practice(config: &CliConfig, code: &str, marks_path: &str) -> Result<()> {
    let catalog = load_catalog(config)?;
    let marks: ObjectiveMarks = read_json(marks_path)?;
    let findings =
        ValidationEngine::default().validate_marks_against_practice(&catalog, code, &marks)?;
    print_findings(&findings);
    exit_on_blocking(&findings)
}

fn validate_scope(path: &str, json: bool) -> Result<()> {
    let data: ScopeData = read_json(path)?;
    let engine = ValidationEngine::default();
    let findings = engine.validate_through(&data, WizardStep::LAST);
    let readiness = engine.document_readiness(&data);

    if json {
        print_json(&serde_json::json!({
            "findings": findings,
            "generatedOutputs": readiness,
        }))?;
    } else {
        print_findings(&findings);
        println!("SSP ready:     {}", readiness.ssp);
        println!("Diagram ready: {}", readiness.network_diagram);
    }
    exit_on_blocking(&findings)
}

fn print_findings(findings: &[Finding]) {
    if findings.is_empty() {
        println!("No findings.");
        return;
    }
    for finding in findings {
        let severity = match finding.severity {
            Severity::Blocking => "BLOCKING",
            Severity::Warning => "warning",
        };
        let section = finding.section.map(|s| s.name()).unwrap_or("-");
        println!("{:<8} {:<14} {:<36} {}", severity, section, finding.code, finding.message);
    }
}

fn exit_on_blocking(findings: &[Finding]) -> Result<()> {
    let blocking = findings.iter().filter(|f| f.is_blocking()).count();
    if blocking > 0 {
        bail!("{} blocking finding(s)", blocking);
    }
    Ok(())
}
