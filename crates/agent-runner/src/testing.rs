//! Test doubles shared by the crate's unit tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bp_core::brand::Brand;
use bp_core::plan::Plan;
use bp_core::store::{DocumentStore, FileDocumentStore};
use chrono::Utc;
use serde_json::Value;
use tempfile::TempDir;

use crate::error::{OrchestratorError, Result};
use crate::planner::{Planner, PlannerRun, RunStatus, ToolCall, ToolOutput};

pub(crate) const THREAD_ID: &str = "thread_test";
pub(crate) const RUN_ID: &str = "run_test";

/// File store seeded with `brand1` and its plan `plan1`
pub(crate) async fn seeded_store() -> (Arc<dyn DocumentStore>, TempDir) {
    let temp = TempDir::new().unwrap();
    let store = FileDocumentStore::new(temp.path()).await.unwrap();

    store
        .upsert_brand(
            Brand::new("Acme Coffee")
                .with_id("brand1")
                .with_voice("Warm and playful")
                .with_hashtags(vec!["#acme".to_string()]),
        )
        .await
        .unwrap();
    store
        .upsert_plan(
            Plan::new("brand1", "Autumn campaign")
                .with_id("plan1")
                .with_topics(vec![
                    "Autumn blend launch".to_string(),
                    "Barista tips".to_string(),
                ]),
        )
        .await
        .unwrap();

    (Arc::new(store), temp)
}

fn snapshot(status: RunStatus, tool_calls: Vec<ToolCall>) -> PlannerRun {
    PlannerRun {
        id: RUN_ID.to_string(),
        thread_id: THREAD_ID.to_string(),
        status,
        created_at: Utc::now(),
        tool_calls,
        last_error: None,
    }
}

/// In-process planner replaying a fixed script of run states.
///
/// `create_run` answers `queued`; each `get_run` pops the next scripted
/// state and keeps answering `in_progress` once the script is exhausted.
#[derive(Default)]
pub(crate) struct ScriptedPlanner {
    script: Mutex<VecDeque<PlannerRun>>,
    final_messages: Mutex<Vec<Value>>,
    sent: Mutex<Vec<String>>,
    submissions: Mutex<Vec<Vec<ToolOutput>>>,
    cancelled: Mutex<Vec<String>>,
    fail_create_run: bool,
    hang_on_cancel: bool,
}

impl ScriptedPlanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then(self, status: RunStatus) -> Self {
        self.push(snapshot(status, Vec::new()))
    }

    pub fn then_failed(self, reason: &str) -> Self {
        let mut run = snapshot(RunStatus::Failed, Vec::new());
        run.last_error = Some(reason.to_string());
        self.push(run)
    }

    pub fn then_tool_calls(self, tool_calls: Vec<ToolCall>) -> Self {
        self.push(snapshot(RunStatus::RequiresAction, tool_calls))
    }

    pub fn with_final_messages(self, messages: Vec<Value>) -> Self {
        *self.final_messages.lock().unwrap() = messages;
        self
    }

    pub fn failing_create_run(mut self) -> Self {
        self.fail_create_run = true;
        self
    }

    /// Never answer `cancel_run`
    pub fn hanging_cancel(mut self) -> Self {
        self.hang_on_cancel = true;
        self
    }

    fn push(self, run: PlannerRun) -> Self {
        self.script.lock().unwrap().push_back(run);
        self
    }

    pub fn submissions(&self) -> Vec<Vec<ToolOutput>> {
        self.submissions.lock().unwrap().clone()
    }

    pub fn sent_messages(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn cancelled_runs(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }
}

#[async_trait]
impl Planner for ScriptedPlanner {
    async fn create_thread(&self) -> Result<String> {
        Ok(THREAD_ID.to_string())
    }

    async fn add_message(&self, _thread_id: &str, content: &str) -> Result<()> {
        self.sent.lock().unwrap().push(content.to_string());
        Ok(())
    }

    async fn create_run(&self, _thread_id: &str) -> Result<PlannerRun> {
        if self.fail_create_run {
            return Err(OrchestratorError::PlannerHttp {
                status: 500,
                body: "upstream unavailable".to_string(),
            });
        }
        Ok(snapshot(RunStatus::Queued, Vec::new()))
    }

    async fn get_run(&self, _thread_id: &str, _run_id: &str) -> Result<PlannerRun> {
        let next = self.script.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| snapshot(RunStatus::InProgress, Vec::new())))
    }

    async fn submit_tool_outputs(
        &self,
        _thread_id: &str,
        _run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<PlannerRun> {
        self.submissions.lock().unwrap().push(outputs.to_vec());
        Ok(snapshot(RunStatus::Queued, Vec::new()))
    }

    async fn list_messages(&self, _thread_id: &str) -> Result<Vec<Value>> {
        Ok(self.final_messages.lock().unwrap().clone())
    }

    async fn cancel_run(&self, _thread_id: &str, run_id: &str) -> Result<()> {
        self.cancelled.lock().unwrap().push(run_id.to_string());
        if self.hang_on_cancel {
            return std::future::pending().await;
        }
        Ok(())
    }
}
