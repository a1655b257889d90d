use async_trait::async_trait;
use log::debug;
use tokio::process::Command;
use super::{ non_empty, ModelDirectory };
use crate::error::ChatError;
use crate::llm::ModelSource;

/// Runs `ollama list` and reads the first column of its table.
#[derive(Debug, Clone)]
pub struct CliModelDirectory {
    program: String,
}

impl CliModelDirectory {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into() }
    }
}

/// Parses the table printed by `ollama list`: a header row followed by one row per
/// model whose first whitespace-separated token is the model name.
pub fn parse_list_output(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl ModelDirectory for CliModelDirectory {
    async fn list_models(&self) -> Result<Vec<String>, ChatError> {
        let output = Command::new(&self.program)
            .arg("list")
            .kill_on_drop(true)
            .output().await
            .map_err(|e|
                ChatError::BackendUnavailable(format!("Failed to run `{} list`: {}", self.program, e))
            )?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(
                ChatError::BackendUnavailable(
                    format!("`{} list` exited with {}: {}", self.program, output.status, stderr.trim())
                )
            );
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let models = parse_list_output(&stdout);
        debug!("`{} list` reported {} model(s)", self.program, models.len());
        non_empty(models)
    }

    fn source(&self) -> ModelSource {
        ModelSource::Cli
    }
}
