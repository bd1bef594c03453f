/// Grading Engine - Request Orchestration
///
/// **Responsibility:**
/// Run one submission end to end: build the harness, dispatch it, split the
/// output, and grade the results against the problem's stored context.
///
/// **Architecture:**
/// 1. HarnessCompiler builds the program text (harness.rs)
/// 2. A CodeRunner executes it remotely (executor.rs)
/// 3. The demultiplexer separates user output from results (demux.rs)
/// 4. The evaluator scores the results (evaluator.rs)
///
/// **Outcomes:**
/// - `success`: the program ran cleanly and was graded
/// - `bug`: the program (or its compile step) wrote to stderr, or the source
///   cannot be spliced; no score is reported
/// - `failure`: anything else. The cause is logged and the caller only sees
///   [`INTERNAL_ERROR_MESSAGE`]
use crate::config::LanguageConfigManager;
use crate::demux::demux;
use crate::error::EngineError;
use crate::evaluator;
use crate::executor::{CodeRunner, ExecuteRequest, StageOutput};
use crate::harness::HarnessCompiler;
use crate::Result;
use duel_common::types::{GradingOutcome, ProblemGradingContext, RuntimesResponse, Submission};
use tracing::{error, info, instrument, warn};

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error.";

/// Lines shown for a failed stage. Never empty.
fn bug_lines(stage: &StageOutput) -> Vec<String> {
    let lines = demux(&stage.output).output_lines;
    if !lines.is_empty() {
        return lines;
    }
    let lines = demux(&stage.stderr).output_lines;
    if !lines.is_empty() {
        return lines;
    }
    vec![match stage.code {
        Some(code) => format!("Process exited with code {}", code),
        None => "Process terminated without output".to_string(),
    }]
}

pub struct GradingEngine<R: CodeRunner> {
    compiler: HarnessCompiler,
    runner: R,
}

impl<R: CodeRunner> GradingEngine<R> {
    pub fn new(languages: LanguageConfigManager, runner: R) -> Self {
        Self {
            compiler: HarnessCompiler::new(languages),
            runner,
        }
    }

    pub fn compiler(&self) -> &HarnessCompiler {
        &self.compiler
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Runtimes offered by the execution service, limited to languages that
    /// have harness templates
    #[instrument(skip(self))]
    pub async fn list_runtimes(&self) -> RuntimesResponse {
        match self.runner.runtimes().await {
            Ok(runtimes) => {
                let languages = self.compiler.languages();
                let body: Vec<_> = runtimes
                    .into_iter()
                    .filter(|runtime| languages.is_enabled(&runtime.language))
                    .collect();
                info!(count = body.len(), "Listed runtimes");
                RuntimesResponse::success(body)
            }
            Err(e) => {
                error!(error = %e, "Failed to list runtimes");
                RuntimesResponse::failure(INTERNAL_ERROR_MESSAGE)
            }
        }
    }

    /// Run a submission and grade it. Never fails: internal errors become a
    /// `failure` outcome.
    #[instrument(
        skip(self, submission, context),
        fields(problem = %submission.name, language = %submission.language)
    )]
    pub async fn run_and_grade(
        &self,
        submission: &Submission,
        context: Option<&ProblemGradingContext>,
    ) -> GradingOutcome {
        match self.try_run_and_grade(submission, context).await {
            Ok(outcome) => {
                info!(
                    response_type = %outcome.response_type,
                    score = ?outcome.score,
                    "Submission graded"
                );
                outcome
            }
            Err(e) => {
                error!(error = %e, "Grading failed");
                GradingOutcome::failure(INTERNAL_ERROR_MESSAGE)
            }
        }
    }

    async fn try_run_and_grade(
        &self,
        submission: &Submission,
        context: Option<&ProblemGradingContext>,
    ) -> Result<GradingOutcome> {
        let context =
            context.ok_or_else(|| EngineError::ContextMissing(submission.name.clone()))?;

        let harness = match self.compiler.compile(
            &submission.language,
            &submission.name,
            &submission.code,
            &context.tests,
        ) {
            Ok(harness) => harness,
            Err(EngineError::MalformedSubmission(reason)) => {
                warn!(%reason, "Submission cannot be spliced");
                return Ok(GradingOutcome::bug(vec![reason]));
            }
            Err(e) => return Err(e),
        };

        let request = ExecuteRequest::new(
            &submission.language,
            &submission.version,
            harness.file_name,
            harness.content,
        );
        let result = self.runner.execute(&request).await?;

        // a message means the service never ran the program
        if let Some(message) = result.message.filter(|m| !m.is_empty()) {
            return Err(EngineError::Dispatch(message));
        }

        if let Some(compile) = result.compile.as_ref().filter(|stage| stage.failed()) {
            warn!(code = ?compile.code, "Compile stage failed");
            return Ok(GradingOutcome::bug(bug_lines(compile)));
        }

        let run = result
            .run
            .ok_or_else(|| EngineError::Dispatch("response has no run stage".to_string()))?;

        if run.wrote_stderr() {
            return Ok(GradingOutcome::bug(bug_lines(&run)));
        }

        let demuxed = demux(&run.output);
        let storage_line = demuxed.require_storage_line()?;
        let evaluation = evaluator::evaluate(
            storage_line,
            &context.tests,
            &context.return_type,
            context.expect_exact,
            &submission.language,
        )?;

        Ok(GradingOutcome::success(
            evaluation.score,
            evaluation.tests,
            demuxed.output_lines,
        ))
    }
}
