//! Evaluation service configuration

use serde::{Deserialize, Serialize};

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_name() -> String {
    "colloquy-eval-service".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_session_backend() -> String {
    "memory".to_string()
}

/// Deployment settings for the evaluation service front-end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Address the HTTP server binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// URL callers reach the service at; advertised on the agent card.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Service name on the agent card.
    #[serde(default = "default_name")]
    pub name: String,

    /// Model identifier for the controller LLM.
    #[serde(default = "default_model")]
    pub model: String,

    /// Session-service connection string: `memory` for the in-process
    /// store, `file:<directory>` for the persistent JSON-file store.
    #[serde(default = "default_session_backend")]
    pub session_backend: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_url: default_public_url(),
            name: default_name(),
            model: default_model(),
            session_backend: default_session_backend(),
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = url.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_session_backend(mut self, connection: impl Into<String>) -> Self {
        self.session_backend = connection.into();
        self
    }
}
