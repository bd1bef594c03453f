// CLI commands for inspecting and grading submissions
use anyhow::{bail, Context, Result};
use duel_common::config::Config;
use duel_common::types::{ProblemGradingContext, ResponseType, Submission};
use duel_engine::{ExecutionClient, GradingEngine, HarnessCompiler, LanguageConfigManager};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// A problem as stored on disk: its name plus the grading context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProblemFile {
    pub name: String,
    #[serde(flatten)]
    pub context: ProblemGradingContext,
}

impl ProblemFile {
    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse problem file")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&content)
    }
}

/// Explicit path first, then the configured path if it exists, then built-ins
pub fn load_languages(explicit: Option<&Path>, config: &Config) -> Result<LanguageConfigManager> {
    let manager = match explicit {
        Some(path) => LanguageConfigManager::load(path)?,
        None if config.languages_config.exists() => {
            LanguageConfigManager::load(&config.languages_config)?
        }
        None => LanguageConfigManager::builtin()?,
    };
    Ok(manager)
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn engine(languages: LanguageConfigManager, config: &Config) -> Result<GradingEngine<ExecutionClient>> {
    let client = ExecutionClient::new(
        &config.execution_api_url,
        Duration::from_secs(config.http_timeout_secs),
    )?;
    Ok(GradingEngine::new(languages, client))
}

pub async fn list_runtimes(languages: LanguageConfigManager, config: &Config) -> Result<()> {
    let response = engine(languages, config)?.list_runtimes().await;
    if response.response_type == ResponseType::Failure {
        bail!("Could not list runtimes from {}", config.execution_api_url);
    }

    for runtime in &response.body {
        println!("{:<12} {}", runtime.language, runtime.version);
    }
    Ok(())
}

pub fn print_harness(
    languages: LanguageConfigManager,
    problem_path: &Path,
    language: &str,
    source_path: &Path,
) -> Result<()> {
    let problem = ProblemFile::load(problem_path)?;
    let source = read_source(source_path)?;

    let harness = HarnessCompiler::new(languages).compile(
        language,
        &problem.name,
        &source,
        &problem.context.tests,
    )?;

    eprintln!("# {}", harness.file_name);
    println!("{}", harness.content);
    Ok(())
}

pub async fn grade(
    languages: LanguageConfigManager,
    config: &Config,
    problem_path: &Path,
    language: &str,
    version: &str,
    source_path: &Path,
) -> Result<()> {
    let problem = ProblemFile::load(problem_path)?;
    let submission = Submission {
        name: problem.name.clone(),
        language: language.to_string(),
        version: version.to_string(),
        code: read_source(source_path)?,
    };

    let outcome = engine(languages, config)?
        .run_and_grade(&submission, Some(&problem.context))
        .await;

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if outcome.response_type == ResponseType::Failure {
        bail!("Grading failed; rerun with RUST_LOG=debug for details");
    }
    Ok(())
}
