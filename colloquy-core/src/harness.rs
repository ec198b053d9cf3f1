//! Harness collaborator contracts
//!
//! The orchestrator, the scenario domains, and the graders live outside this
//! crate. This module pins down the interfaces they meet: the per-task agent
//! contract the orchestrator drives, the run configuration and result shapes
//! the tool surface consumes, and the static domain catalog.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::message::{AssistantMessage, Message};

/// The contract the orchestrator calls, sequentially, for each task.
///
/// State is handed back and forth rather than held by the agent so two
/// concurrent tasks can never observe each other.
pub trait ConversationalAgent {
    type State;

    /// Build a fresh per-task state, optionally seeded with prior history.
    fn init_state(&self, prior_history: Option<Vec<Message>>) -> Self::State;

    /// Produce the next assistant turn for `input`, returning the updated
    /// state. Blocks until the turn is complete.
    fn generate_next_message(
        &self,
        input: Message,
        state: Self::State,
    ) -> Result<(AssistantMessage, Self::State)>;

    /// Release any per-task resources.
    fn stop(&self, _state: &Self::State) {}

    /// Whether `message` terminates the task. Termination policy belongs to
    /// the orchestrator; agents normally leave this alone.
    fn is_stop(&self, _message: &AssistantMessage) -> bool {
        false
    }
}

/// An evaluation domain known to the harness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DomainInfo {
    pub name: &'static str,
    pub description: &'static str,
    pub task_count: u32,
}

const DOMAINS: &[DomainInfo] = &[
    DomainInfo {
        name: "airline",
        description: "Airline customer service (flights, bookings, cancellations)",
        task_count: 45,
    },
    DomainInfo {
        name: "retail",
        description: "Retail e-commerce (orders, returns, exchanges)",
        task_count: 39,
    },
    DomainInfo {
        name: "telecom",
        description: "Telecommunications support (technical issues, billing)",
        task_count: 50,
    },
    DomainInfo {
        name: "mock",
        description: "Simple test domain for development",
        task_count: 5,
    },
];

/// The four domains evaluations can run against.
pub fn known_domains() -> &'static [DomainInfo] {
    DOMAINS
}

pub fn is_known_domain(name: &str) -> bool {
    DOMAINS.iter().any(|d| d.name == name)
}

fn default_user_llm() -> String {
    "gpt-4o".to_string()
}

fn default_num_trials() -> u32 {
    1
}

fn default_max_steps() -> u32 {
    50
}

fn default_max_errors() -> u32 {
    10
}

fn default_max_concurrency() -> u32 {
    3
}

/// Configuration for one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Domain to evaluate in; one of [`known_domains`].
    pub domain: String,

    /// Endpoint of the remote agent under test.
    pub agent_endpoint: String,

    /// Model identifier for the user simulator.
    #[serde(default = "default_user_llm")]
    pub user_llm: String,

    /// Trials per task.
    #[serde(default = "default_num_trials")]
    pub num_trials: u32,

    /// Cap on the number of tasks; all tasks in the domain when unset.
    #[serde(default)]
    pub num_tasks: Option<u32>,

    /// Explicit task selection; overrides `num_tasks`.
    #[serde(default)]
    pub task_ids: Option<Vec<String>>,

    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    #[serde(default = "default_max_errors")]
    pub max_errors: u32,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: u32,
}

impl RunConfig {
    pub fn new(domain: impl Into<String>, agent_endpoint: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            agent_endpoint: agent_endpoint.into(),
            user_llm: default_user_llm(),
            num_trials: default_num_trials(),
            num_tasks: None,
            task_ids: None,
            max_steps: default_max_steps(),
            max_errors: default_max_errors(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// A task that was part of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
}

/// One simulation of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationRecord {
    pub task_id: String,
    pub trial: u32,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What a finished run reports. Mostly opaque to this crate; the tool
/// surface only counts successes and summarises task identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResults {
    pub timestamp: String,
    #[serde(default)]
    pub info: Value,
    pub tasks: Vec<TaskRecord>,
    pub simulations: Vec<SimulationRecord>,
}

impl EvaluationResults {
    pub fn success_count(&self) -> usize {
        self.simulations.iter().filter(|s| s.success).count()
    }

    pub fn success_rate(&self) -> f64 {
        if self.simulations.is_empty() {
            0.0
        } else {
            self.success_count() as f64 / self.simulations.len() as f64
        }
    }
}

/// Seam to the orchestrator: run a configured evaluation to completion.
#[async_trait]
pub trait EvaluationBackend: Send + Sync {
    async fn run(&self, config: &RunConfig) -> Result<EvaluationResults>;
}

/// Canned backend for tests and local smoke runs when no orchestrator is
/// linked in. Mock-domain runs succeed with fixed results; anything else
/// fails the way an unwired deployment should.
#[derive(Debug, Default)]
pub struct StubBackend;

#[async_trait]
impl EvaluationBackend for StubBackend {
    async fn run(&self, config: &RunConfig) -> Result<EvaluationResults> {
        if config.domain != "mock" {
            return Err(crate::error::ColloquyError::Evaluation(format!(
                "no orchestrator is linked for domain '{}'; only mock runs are available",
                config.domain
            )));
        }

        let tasks: Vec<TaskRecord> = (1..=2)
            .map(|i| TaskRecord {
                id: format!("mock_task_{i}"),
                name: format!("Mock task {i}"),
            })
            .collect();

        let simulations = tasks
            .iter()
            .flat_map(|task| {
                (0..config.num_trials).map(|trial| SimulationRecord {
                    task_id: task.id.clone(),
                    trial,
                    success: true,
                    error: None,
                })
            })
            .collect();

        Ok(EvaluationResults {
            timestamp: chrono::Utc::now().to_rfc3339(),
            info: serde_json::json!({
                "domain": config.domain,
                "agent_endpoint": config.agent_endpoint,
            }),
            tasks,
            simulations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_catalog() {
        assert_eq!(known_domains().len(), 4);
        assert!(is_known_domain("airline"));
        assert!(is_known_domain("mock"));
        assert!(!is_known_domain("banking"));
    }

    #[test]
    fn test_run_config_defaults() {
        let config: RunConfig = serde_json::from_str(
            r#"{"domain": "retail", "agent_endpoint": "http://agent"}"#,
        )
        .unwrap();
        assert_eq!(config.user_llm, "gpt-4o");
        assert_eq!(config.num_trials, 1);
        assert_eq!(config.max_steps, 50);
        assert_eq!(config.max_errors, 10);
        assert_eq!(config.max_concurrency, 3);
    }

    #[test]
    fn test_success_rate() {
        let results = EvaluationResults {
            timestamp: "t".into(),
            info: Value::Null,
            tasks: vec![],
            simulations: vec![
                SimulationRecord {
                    task_id: "a".into(),
                    trial: 0,
                    success: true,
                    error: None,
                },
                SimulationRecord {
                    task_id: "b".into(),
                    trial: 0,
                    success: false,
                    error: Some("timeout".into()),
                },
            ],
        };
        assert_eq!(results.success_count(), 1);
        assert!((results.success_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_stub_backend_mock_domain() {
        let backend = StubBackend;
        let results = backend
            .run(&RunConfig::new("mock", "http://agent"))
            .await
            .unwrap();
        assert_eq!(results.tasks.len(), 2);
        assert_eq!(results.success_count(), results.simulations.len());

        let err = backend.run(&RunConfig::new("airline", "http://agent")).await;
        assert!(err.is_err());
    }
}
