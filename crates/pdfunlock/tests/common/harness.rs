//! Test harness for isolated batch runs.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tokio::sync::broadcast;

use pdfunlock::{BatchEvent, BatchProcessor, Config, PasswordPrompt};

use super::builders::ConfigBuilder;

/// Isolated environment with input, output and config directories.
pub struct TestHarness {
    temp_dir: TempDir,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub config_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let base = temp_dir.path();

        let input_dir = base.join("input");
        let output_dir = base.join("output");
        let config_dir = base.join("config");

        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");
        std::fs::create_dir_all(&output_dir).expect("Failed to create output dir");
        std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");

        Self {
            temp_dir,
            input_dir,
            output_dir,
            config_dir,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Error log location private to this harness.
    pub fn error_log_path(&self) -> PathBuf {
        self.config_dir.join("error_log.txt")
    }

    /// Write an input file to the input directory.
    pub fn write_input(&self, filename: &str, content: &[u8]) -> PathBuf {
        let path = self.input_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write input file");
        path
    }

    /// Write a file straight into the output directory.
    pub fn write_output(&self, filename: &str, content: &[u8]) -> PathBuf {
        let path = self.output_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write output file");
        path
    }

    pub fn output_path(&self, source_name: &str) -> PathBuf {
        self.output_dir.join(format!("unlocked_{}", source_name))
    }

    pub fn read_output(&self, source_name: &str) -> Vec<u8> {
        std::fs::read(self.output_path(source_name)).expect("Output file is missing")
    }

    /// Write a config file to the config directory.
    pub fn write_config(&self, filename: &str, content: &str) -> PathBuf {
        let path = self.config_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write config file");
        path
    }

    /// Base configuration pointing the error log into the harness.
    pub fn config(&self) -> ConfigBuilder {
        ConfigBuilder::new().error_log_path(self.error_log_path())
    }

    pub fn processor(&self) -> BatchProcessor {
        self.processor_with(self.config().build())
    }

    pub fn processor_with(&self, config: Config) -> BatchProcessor {
        BatchProcessor::new(&config).expect("Failed to create batch processor")
    }

    /// Files in the output directory, sorted by name.
    pub fn output_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.output_dir)
            .expect("Failed to list output dir")
            .map(|entry| {
                entry
                    .expect("Failed to read dir entry")
                    .file_name()
                    .to_string_lossy()
                    .to_string()
            })
            .collect();
        names.sort();
        names
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects every event currently buffered in `rx`.
pub fn drain_events(rx: &mut broadcast::Receiver<BatchEvent>) -> Vec<BatchEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Prompt that answers from a script keyed by file name.
#[derive(Default)]
pub struct ScriptedPrompt {
    answers: Vec<(String, Option<String>)>,
    pub asked: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, filename: &str, password: &str) -> Self {
        self.answers
            .push((filename.to_string(), Some(password.to_string())));
        self
    }

    pub fn cancel(mut self, filename: &str) -> Self {
        self.answers.push((filename.to_string(), None));
        self
    }
}

impl PasswordPrompt for ScriptedPrompt {
    fn prompt_password(&mut self, filename: &str) -> Option<String> {
        self.asked.push(filename.to_string());
        self.answers
            .iter()
            .find(|(name, _)| name == filename)
            .and_then(|(_, answer)| answer.clone())
    }
}
