//! Job-set configuration loading.
//!
//! The expected YAML structure is:
//! ```yaml
//! resource_timeout_ms: 50   # bounded wait for the shared resource
//! quantum_ms: 1             # preemption quantum of the simulated CPU
//! edf_priority: 1           # CPU priority of EDF workers
//! edf:
//!   - { name: Task1, period_ms: 200, exec_ms: 40, offset_ms: 10 }
//!   - { name: Task2, period_ms: 500, exec_ms: 80, offset_ms: 20 }
//! rm:
//!   - { name: Task1, period_ms: 200, exec_ms: 40 }
//!   - { name: Task2, period_ms: 500, exec_ms: 80 }
//! ```
//!
//! Every key is optional; absent keys fall back to the three-job reference
//! configuration.  Validation of the job sets themselves (unique names,
//! non-zero periods) happens when an engine is built.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::engine::{EngineConfig, Policy, DEFAULT_EDF_PRIORITY};
use crate::job::{reference_edf_jobs, reference_rm_jobs, JobSpec};
use crate::processor::{Priority, DEFAULT_QUANTUM};
use crate::resource::DEFAULT_RESOURCE_TIMEOUT;

// ── Private YAML deserialization types ────────────────────────────────────────

/// Top-level wrapper that maps directly onto the YAML file layout.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct WorkloadFile {
    resource_timeout_ms: Option<u64>,
    quantum_ms: Option<u64>,
    edf_priority: Option<u32>,
    edf: Option<Vec<JobSpec>>,
    rm: Option<Vec<JobSpec>>,
}

// ── Public data structures ────────────────────────────────────────────────────

/// Job sets and timing parameters for both policies.
#[derive(Debug, Clone)]
pub struct WorkloadConfig {
    pub resource_timeout: Duration,
    pub quantum: Duration,
    pub edf_priority: Priority,
    pub edf_jobs: Vec<JobSpec>,
    pub rm_jobs: Vec<JobSpec>,
}

impl Default for WorkloadConfig {
    /// The three-job reference configuration.
    fn default() -> Self {
        Self {
            resource_timeout: DEFAULT_RESOURCE_TIMEOUT,
            quantum: DEFAULT_QUANTUM,
            edf_priority: DEFAULT_EDF_PRIORITY,
            edf_jobs: reference_edf_jobs(),
            rm_jobs: reference_rm_jobs(),
        }
    }
}

impl WorkloadConfig {
    /// Parse `path`.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is structurally
    /// invalid (including unknown keys).
    pub fn load_from_file(path: &Path) -> Result<Self> {
        info!("Loading workload configuration from: {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot open configuration file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse YAML file: {}", path.display()))
    }

    /// Parse a YAML document.  An empty document yields the reference
    /// configuration.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let file: WorkloadFile = if content.trim().is_empty() {
            WorkloadFile::default()
        } else {
            serde_yaml::from_str(content)?
        };

        let defaults = Self::default();
        let config = Self {
            resource_timeout: file
                .resource_timeout_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.resource_timeout),
            quantum: file
                .quantum_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.quantum),
            edf_priority: file.edf_priority.map(Priority).unwrap_or(defaults.edf_priority),
            edf_jobs: file.edf.unwrap_or(defaults.edf_jobs),
            rm_jobs: file.rm.unwrap_or(defaults.rm_jobs),
        };

        for (policy, jobs) in [(Policy::Edf, &config.edf_jobs), (Policy::Rm, &config.rm_jobs)] {
            for j in jobs {
                debug!(
                    "  {policy} job: {} | period: {}ms | exec: {}ms | offset: {}ms",
                    j.name, j.period_ms, j.exec_ms, j.offset_ms
                );
            }
        }

        Ok(config)
    }

    /// Engine configuration for the chosen policy.
    pub fn engine_config(&self, policy: Policy) -> EngineConfig {
        let jobs = match policy {
            Policy::Edf => self.edf_jobs.clone(),
            Policy::Rm => self.rm_jobs.clone(),
        };
        EngineConfig {
            jobs,
            resource_timeout: self.resource_timeout,
            quantum: self.quantum,
            edf_priority: self.edf_priority,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper: write a YAML string to a temp file and return it.
    fn yaml_tempfile(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn full_file_overrides_everything() {
        let yaml = r#"
resource_timeout_ms: 25
quantum_ms: 2
edf_priority: 4
edf:
  - { name: A, period_ms: 100, exec_ms: 10, offset_ms: 5 }
  - { name: B, period_ms: 300, exec_ms: 30 }
rm:
  - { name: C, period_ms: 50, exec_ms: 5 }
"#;
        let f = yaml_tempfile(yaml);
        let cfg = WorkloadConfig::load_from_file(f.path()).unwrap();

        assert_eq!(cfg.resource_timeout, Duration::from_millis(25));
        assert_eq!(cfg.quantum, Duration::from_millis(2));
        assert_eq!(cfg.edf_priority, Priority(4));
        assert_eq!(cfg.edf_jobs.len(), 2);
        assert_eq!(cfg.edf_jobs[0].offset_ms, 5);
        assert_eq!(cfg.edf_jobs[1].offset_ms, 0, "offset defaults to 0");
        assert_eq!(cfg.rm_jobs, vec![JobSpec::new("C", 50, 5)]);
    }

    #[test]
    fn missing_sections_fall_back_to_reference_sets() {
        let cfg = WorkloadConfig::from_yaml_str("rm:\n  - { name: X, period_ms: 10, exec_ms: 1 }\n")
            .unwrap();
        assert_eq!(cfg.edf_jobs, reference_edf_jobs());
        assert_eq!(cfg.rm_jobs.len(), 1);
        assert_eq!(cfg.resource_timeout, DEFAULT_RESOURCE_TIMEOUT);
    }

    #[test]
    fn empty_document_is_the_reference_configuration() {
        let cfg = WorkloadConfig::from_yaml_str("").unwrap();
        assert_eq!(cfg.edf_jobs, reference_edf_jobs());
        assert_eq!(cfg.rm_jobs, reference_rm_jobs());
    }

    #[test]
    fn engine_config_picks_the_policy_job_set() {
        let cfg = WorkloadConfig::default();
        let edf = cfg.engine_config(Policy::Edf);
        let rm = cfg.engine_config(Policy::Rm);
        assert_eq!(edf.jobs[0].offset_ms, 10);
        assert_eq!(rm.jobs[0].offset_ms, 0);
        assert_eq!(edf.resource_timeout, Duration::from_millis(50));
    }

    #[test]
    fn missing_file_returns_error() {
        let result = WorkloadConfig::load_from_file(Path::new("/nonexistent/path/jobs.yaml"));
        assert!(result.is_err());
    }

    #[test]
    fn malformed_yaml_returns_error() {
        let f = yaml_tempfile("this is: not: valid: yaml: content:::");
        assert!(WorkloadConfig::load_from_file(f.path()).is_err());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(WorkloadConfig::from_yaml_str("jobs: []\n").is_err());
    }

    #[test]
    fn job_without_exec_is_rejected() {
        assert!(WorkloadConfig::from_yaml_str("edf:\n  - { name: A, period_ms: 100 }\n").is_err());
    }
}
