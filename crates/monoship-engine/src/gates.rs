//! Quality gates (tests, type-check, lint) run inside a built image.
//!
//! [`QualityGateRunner::run_gates`] stops at the first failing gate;
//! [`QualityGateRunner::verify`] always runs all three and records each
//! outcome as data, leaving pass/fail policy to the caller.

use std::fmt;

use monoship_core::GatesConfig;

use crate::client::{DockerClient, ImageId};
use crate::docker::DockerError;
use crate::executor::DockerExecutor;

/// Exit code `docker run` uses for its own failures (daemon, missing image),
/// as opposed to the gate command's exit status.
const DOCKER_RUN_ERROR: i32 = 125;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Test,
    Typecheck,
    Lint,
}

impl Gate {
    pub const ALL: [Gate; 3] = [Gate::Test, Gate::Typecheck, Gate::Lint];

    pub fn command<'c>(&self, config: &'c GatesConfig) -> &'c [String] {
        match self {
            Self::Test => &config.test,
            Self::Typecheck => &config.typecheck,
            Self::Lint => &config.lint,
        }
    }

    /// Label used in the verify report: the gate's program name.
    fn label(&self, config: &GatesConfig) -> String {
        self.command(config)
            .first()
            .map(|program| capitalize(program))
            .unwrap_or_else(|| self.to_string())
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Test => "test",
            Self::Typecheck => "typecheck",
            Self::Lint => "lint",
        })
    }
}

/// Captured result of one gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutcome {
    pub gate: Gate,
    pub label: String,
    /// `None` when the command could not report an exit code.
    pub exit_code: Option<i32>,
    pub output: String,
}

impl GateOutcome {
    pub fn passed(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Outputs of all three gates when every one passed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateOutputs {
    pub test: String,
    pub typecheck: String,
    pub lint: String,
}

/// All three outcomes, pass or fail.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub outcomes: Vec<GateOutcome>,
}

impl VerifyReport {
    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(GateOutcome::passed)
    }

    pub fn failed(&self) -> impl Iterator<Item = &GateOutcome> {
        self.outcomes.iter().filter(|o| !o.passed())
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for outcome in &self.outcomes {
            writeln!(f)?;
            writeln!(f, "{}:", outcome.label)?;
            writeln!(f, "{}", outcome.output)?;
        }
        Ok(())
    }
}

pub struct QualityGateRunner<'a, E: DockerExecutor> {
    client: &'a DockerClient<E>,
    config: &'a GatesConfig,
}

impl<'a, E: DockerExecutor> QualityGateRunner<'a, E> {
    pub fn new(client: &'a DockerClient<E>, config: &'a GatesConfig) -> Self {
        Self { client, config }
    }

    async fn outcome(&self, image: &ImageId, gate: Gate) -> Result<GateOutcome, GateError> {
        let label = gate.label(self.config);
        tracing::info!(gate = %gate, image = %image, "running quality gate");

        match self.client.stdout(image, gate.command(self.config)).await {
            Ok(output) => Ok(GateOutcome {
                gate,
                label,
                exit_code: Some(0),
                output,
            }),
            Err(e @ DockerError::CommandFailed {
                exit_code: Some(DOCKER_RUN_ERROR),
                ..
            }) => Err(GateError::Engine { gate, source: e }),
            Err(DockerError::CommandFailed {
                exit_code,
                stdout,
                stderr,
                ..
            }) => {
                tracing::warn!(gate = %gate, ?exit_code, "quality gate failed");
                Ok(GateOutcome {
                    gate,
                    label,
                    exit_code,
                    output: combine_output(stdout, &stderr),
                })
            }
            Err(e) => Err(GateError::Engine { gate, source: e }),
        }
    }

    /// Run one gate; a non-zero exit is [`GateError::GateFailed`].
    pub async fn run_gate(&self, image: &ImageId, gate: Gate) -> Result<String, GateError> {
        let outcome = self.outcome(image, gate).await?;
        if outcome.passed() {
            Ok(outcome.output)
        } else {
            Err(GateError::GateFailed {
                gate,
                exit_code: outcome.exit_code,
                output: outcome.output,
            })
        }
    }

    /// Run test, typecheck, and lint in order, stopping at the first failure.
    pub async fn run_gates(&self, image: &ImageId) -> Result<GateOutputs, GateError> {
        Ok(GateOutputs {
            test: self.run_gate(image, Gate::Test).await?,
            typecheck: self.run_gate(image, Gate::Typecheck).await?,
            lint: self.run_gate(image, Gate::Lint).await?,
        })
    }

    /// Run all gates unconditionally and collect every outcome.
    ///
    /// Only engine-level failures (docker missing, `docker run` itself
    /// exiting 125) are errors.
    pub async fn verify(&self, image: &ImageId) -> Result<VerifyReport, GateError> {
        let mut outcomes = Vec::with_capacity(Gate::ALL.len());
        for gate in Gate::ALL {
            outcomes.push(self.outcome(image, gate).await?);
        }
        Ok(VerifyReport { outcomes })
    }
}

/// Failed gate output: stdout, then stderr if the tool wrote any.
fn combine_output(stdout: String, stderr: &str) -> String {
    let stderr = stderr.trim_end();
    if stderr.is_empty() {
        stdout
    } else if stdout.is_empty() {
        stderr.to_owned()
    } else {
        format!("{}\n{stderr}", stdout.trim_end())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error("{gate} gate failed (exit code {}):\n{output}", exit_code.map_or_else(|| "none".to_owned(), |c| c.to_string()))]
    GateFailed {
        gate: Gate,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("could not run {gate} gate")]
    Engine { gate: Gate, source: DockerError },
}
