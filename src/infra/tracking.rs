// ============================================================
// Layer 6 — Experiment Tracking
// ============================================================
// A run session on the tracking service:
//
//   start   POST /api/runs                 {project, name, config} → {id}
//   summary POST /api/runs/{id}/summary    {metrics}
//   finish  POST /api/runs/{id}/finish     {status}
//
// In Disabled mode (the --testing flag) nothing is sent and no
// transport is ever touched; every call is a no-op.
//
// The session must be finished explicitly on both the success
// and the failure path. Dropping an online session that was
// never finished only logs a warning.

use anyhow::{Context, Result};
use serde_json::{json, Value};

use crate::domain::{metrics::EvaluationResult, traits::TrackingTransport};

pub const PROJECT: &str = "your_proj_name";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    Disabled,
    Online,
}

impl TrackingMode {
    pub fn from_testing_flag(testing: bool) -> Self {
        if testing { TrackingMode::Disabled } else { TrackingMode::Online }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Finished,
    Failed,
}

impl RunStatus {
    fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Finished => "finished",
            RunStatus::Failed   => "failed",
        }
    }
}

struct OnlineRun {
    id:        String,
    transport: Box<dyn TrackingTransport>,
}

pub struct RunSession {
    online:   Option<OnlineRun>,
    finished: bool,
}

impl RunSession {
    /// Open a session. `transport` is only called in Online mode.
    pub fn start(
        mode:      TrackingMode,
        name:      &str,
        config:    &Value,
        transport: Box<dyn TrackingTransport>,
    ) -> Result<Self> {
        if mode == TrackingMode::Disabled {
            tracing::info!("Experiment tracking disabled");
            return Ok(Self { online: None, finished: false });
        }

        let reply = transport
            .post("/api/runs", &json!({ "project": PROJECT, "name": name, "config": config }))
            .context("Cannot start tracking run")?;
        let id = match &reply["id"] {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            other => anyhow::bail!("Tracking service returned no run id (got {other})"),
        };

        tracing::info!("Tracking run {} started in project '{}'", id, PROJECT);
        Ok(Self { online: Some(OnlineRun { id, transport }), finished: false })
    }

    /// Record the final metrics of the run.
    pub fn log_summary(&self, result: &EvaluationResult) -> Result<()> {
        let Some(run) = &self.online else { return Ok(()) };
        run.transport
            .post(&format!("/api/runs/{}/summary", run.id), &json!({ "metrics": result }))
            .context("Cannot send run summary")?;
        Ok(())
    }

    /// Close the session. Later calls are ignored.
    pub fn finish(&mut self, status: RunStatus) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let Some(run) = &self.online else { return Ok(()) };
        run.transport
            .post(&format!("/api/runs/{}/finish", run.id), &json!({ "status": status.as_str() }))
            .context("Cannot finish tracking run")?;
        tracing::info!("Tracking run {} marked {}", run.id, status.as_str());
        Ok(())
    }
}

impl Drop for RunSession {
    fn drop(&mut self) {
        if let (Some(run), false) = (&self.online, self.finished) {
            tracing::warn!("Tracking run {} was never finished", run.id);
        }
    }
}

// ─── HTTP transport ───────────────────────────────────────────────────────────

/// JSON over HTTP with an optional bearer token.
pub struct HttpTransport {
    base_url: String,
    api_key:  Option<String>,
    client:   reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Cannot build HTTP client")?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client,
        })
    }
}

impl TrackingTransport for HttpTransport {
    fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.post(&url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .with_context(|| format!("Tracking request to '{url}' failed"))?
            .error_for_status()
            .with_context(|| format!("Tracking service rejected '{url}'"))?;

        let text = response.text().context("Cannot read tracking reply")?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).with_context(|| format!("Malformed tracking reply from '{url}'"))
    }
}
