//! CI Platform capability
//!
//! Inputs, outputs, cross-phase state and the failure signal, as provided
//! by the CI runner. `GithubActionsPlatform` speaks the GitHub Actions
//! runner protocol; `MemoryPlatform` is an in-memory stand-in for tests.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{LifecycleError, Result};

/// Capability contract between the lifecycle core and the CI runner.
pub trait CiPlatform: Send + Sync {
    /// Read an action input. Values are trimmed; a required input that is
    /// absent or empty is a `MissingInput` error.
    fn get_input(&self, name: &str, required: bool) -> Result<String>;

    /// Expose a value as a step output.
    fn set_output(&self, name: &str, value: &str) -> Result<()>;

    /// Read state saved by an earlier phase of the same step. Absent is empty.
    fn get_state(&self, name: &str) -> String;

    /// Persist state for a later phase of the same step.
    fn save_state(&self, name: &str, value: &str) -> Result<()>;

    /// Mark the run as failed with `message`.
    fn set_failed(&self, message: &str);

    /// Whether `set_failed` has been called.
    fn failed(&self) -> bool;
}

/// GitHub Actions runner protocol.
///
/// Works from a snapshot of environment variables taken at construction,
/// so nothing here reads or mutates the live process environment.
pub struct GithubActionsPlatform {
    env: HashMap<String, String>,
    failed: AtomicBool,
}

impl GithubActionsPlatform {
    /// Create from an explicit set of environment variables
    pub fn new<I, K, V>(env: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            env: env.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            failed: AtomicBool::new(false),
        }
    }

    /// Create from the current process environment
    pub fn from_process_env() -> Self {
        Self::new(std::env::vars())
    }

    fn var(&self, name: &str) -> Option<&str> {
        self.env.get(name).map(|s| s.as_str()).filter(|s| !s.is_empty())
    }

    fn file_command(&self, var: &str) -> Option<PathBuf> {
        self.var(var).map(PathBuf::from)
    }

    fn append_file_command(&self, path: &PathBuf, name: &str, value: &str) -> Result<()> {
        let message = key_value_message(name, value)?;
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(message.as_bytes())?;
        debug!(file = %path.display(), name, "appended file command");
        Ok(())
    }
}

impl CiPlatform for GithubActionsPlatform {
    fn get_input(&self, name: &str, required: bool) -> Result<String> {
        let key = format!("INPUT_{}", name.replace(' ', "_").to_uppercase());
        let value = self.env.get(&key).map(|v| v.trim().to_string()).unwrap_or_default();

        if required && value.is_empty() {
            return Err(LifecycleError::MissingInput(name.to_string()));
        }

        Ok(value)
    }

    fn set_output(&self, name: &str, value: &str) -> Result<()> {
        match self.file_command("GITHUB_OUTPUT") {
            Some(path) => self.append_file_command(&path, name, value),
            None => {
                println!("{}", workflow_command("set-output", &[("name", name)], value));
                Ok(())
            }
        }
    }

    fn get_state(&self, name: &str) -> String {
        self.var(&format!("STATE_{}", name)).unwrap_or_default().to_string()
    }

    fn save_state(&self, name: &str, value: &str) -> Result<()> {
        match self.file_command("GITHUB_STATE") {
            Some(path) => self.append_file_command(&path, name, value),
            None => {
                println!("{}", workflow_command("save-state", &[("name", name)], value));
                Ok(())
            }
        }
    }

    fn set_failed(&self, message: &str) {
        self.failed.store(true, Ordering::SeqCst);
        println!("{}", workflow_command("error", &[], message));
    }

    fn failed(&self) -> bool {
        self.failed.load(Ordering::SeqCst)
    }
}

/// Format a `name<<delimiter` block for the runner's file commands.
fn key_value_message(name: &str, value: &str) -> Result<String> {
    let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());

    if name.contains(&delimiter) {
        return Err(LifecycleError::InvalidArgument(format!(
            "Unexpected input: name should not contain the delimiter \"{}\"",
            delimiter
        )));
    }
    if value.contains(&delimiter) {
        return Err(LifecycleError::InvalidArgument(format!(
            "Unexpected input: value should not contain the delimiter \"{}\"",
            delimiter
        )));
    }

    Ok(format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))
}

/// Format a `::command key=value::message` workflow command.
pub fn workflow_command(command: &str, properties: &[(&str, &str)], message: &str) -> String {
    let mut line = format!("::{}", command);

    if !properties.is_empty() {
        let props: Vec<String> = properties
            .iter()
            .map(|(k, v)| format!("{}={}", k, escape_property(v)))
            .collect();
        line.push(' ');
        line.push_str(&props.join(","));
    }

    line.push_str("::");
    line.push_str(&escape_data(message));
    line
}

fn escape_data(s: &str) -> String {
    s.replace('%', "%25").replace('\r', "%0D").replace('\n', "%0A")
}

fn escape_property(s: &str) -> String {
    escape_data(s).replace(':', "%3A").replace(',', "%2C")
}

/// In-memory platform for tests and dry runs.
#[derive(Default)]
pub struct MemoryPlatform {
    inputs: HashMap<String, String>,
    state: Mutex<HashMap<String, String>>,
    outputs: Mutex<Vec<(String, String)>>,
    saved: Mutex<Vec<(String, String)>>,
    failures: Mutex<Vec<String>>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_input(mut self, name: &str, value: &str) -> Self {
        self.inputs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_state(self, name: &str, value: &str) -> Self {
        self.state.lock().insert(name.to_string(), value.to_string());
        self
    }

    /// Outputs in the order they were set
    pub fn outputs(&self) -> Vec<(String, String)> {
        self.outputs.lock().clone()
    }

    pub fn output(&self, name: &str) -> Option<String> {
        self.outputs
            .lock()
            .iter()
            .rev()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.clone())
    }

    /// `save_state` calls in the order they were made
    pub fn saved_state(&self) -> Vec<(String, String)> {
        self.saved.lock().clone()
    }

    pub fn failures(&self) -> Vec<String> {
        self.failures.lock().clone()
    }

    /// Carry saved state over into a fresh platform, the way the runner
    /// hands state from the main step to its post step.
    pub fn next_phase(&self) -> MemoryPlatform {
        let platform = MemoryPlatform {
            inputs: self.inputs.clone(),
            ..Default::default()
        };
        *platform.state.lock() = self.state.lock().clone();
        platform
    }
}

impl CiPlatform for MemoryPlatform {
    fn get_input(&self, name: &str, required: bool) -> Result<String> {
        let value = self.inputs.get(name).map(|v| v.trim().to_string()).unwrap_or_default();

        if required && value.is_empty() {
            return Err(LifecycleError::MissingInput(name.to_string()));
        }

        Ok(value)
    }

    fn set_output(&self, name: &str, value: &str) -> Result<()> {
        self.outputs.lock().push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn get_state(&self, name: &str) -> String {
        self.state.lock().get(name).cloned().unwrap_or_default()
    }

    fn save_state(&self, name: &str, value: &str) -> Result<()> {
        self.state.lock().insert(name.to_string(), value.to_string());
        self.saved.lock().push((name.to_string(), value.to_string()));
        Ok(())
    }

    fn set_failed(&self, message: &str) {
        self.failures.lock().push(message.to_string());
    }

    fn failed(&self) -> bool {
        !self.failures.lock().is_empty()
    }
}
