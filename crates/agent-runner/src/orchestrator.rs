//! Orchestration loop
//!
//! Opens a planner run for a brand/plan pair, answers every
//! `requires_action` round by dispatching the requested tools concurrently,
//! and extracts the structured result once the run completes. Every run,
//! successful or not, leaves a persisted trace behind.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bp_core::store::DocumentStore;
use bp_core::trace::{
    into_payload, EventDetails, TraceEnvelope, TraceEventKind, TraceManager, TraceRecord,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::context::{CarriedContext, RunState};
use crate::error::{OrchestratorError, Result};
use crate::extractor::{extract, DEFAULT_RESULT_FIELD};
use crate::guardrail::{ToolOutcome, DEFAULT_MAX_ATTEMPTS};
use crate::planner::{Planner, PlannerRun, RunStatus, ToolCall, ToolOutput};
use crate::tools::{ToolContext, ToolError, ToolName, ToolRef, ToolRegistry};

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Agent name recorded on traces
    pub agent_name: String,
    /// Delay between run status polls
    pub poll_interval: Duration,
    /// Wall-clock limit for a whole run, unbounded when `None`
    pub run_timeout: Option<Duration>,
    /// Maximum number of status polls, unbounded when `None`
    pub max_polls: Option<u32>,
    /// Retryable validation failures per call shape
    pub max_attempts: u32,
    /// Publish generated copy the planner forgot to publish
    pub auto_publish: bool,
    /// Fill the topic of generate/publish calls from the fetched plan
    pub auto_default_topic: bool,
    /// Field extracted from the final answer
    pub result_field: String,
    /// Upper bound on the best-effort cancel sent after a timeout or cancellation
    pub cancel_timeout: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_name: "content-planner".to_string(),
            poll_interval: Duration::from_millis(1000),
            run_timeout: None,
            max_polls: None,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            auto_publish: true,
            auto_default_topic: true,
            result_field: DEFAULT_RESULT_FIELD.to_string(),
            cancel_timeout: Duration::from_secs(5),
        }
    }
}

/// Request to run one orchestration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationRequest {
    #[serde(default)]
    pub brand_id: String,
    #[serde(default)]
    pub plan_id: String,
    /// Extra context forwarded to the planner verbatim
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl OrchestrationRequest {
    pub fn new(brand_id: impl Into<String>, plan_id: impl Into<String>) -> Self {
        Self {
            brand_id: brand_id.into(),
            plan_id: plan_id.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Check the brand and plan identifiers are present
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.brand_id.trim().is_empty() {
            missing.push("brandId");
        }
        if self.plan_id.trim().is_empty() {
            missing.push("planId");
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(OrchestratorError::InvalidInput(format!(
                "Missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }

    /// Opening user message handed to the planner
    fn opening_message(&self) -> String {
        let mut message = json!({
            "brandId": self.brand_id.trim(),
            "planId": self.plan_id.trim(),
        });
        if let Some(context) = &self.context {
            message["context"] = context.clone();
        }
        message.to_string()
    }
}

/// Successful orchestration
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub run_id: String,
    pub status: RunStatus,
    /// The extracted result object
    pub result: Value,
    pub trace: TraceRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_post_id: Option<String>,
}

/// Failed orchestration, with whatever trace was recorded
#[derive(Debug, Error)]
#[error("{error}")]
pub struct RunFailure {
    pub error: OrchestratorError,
    pub run_id: Option<String>,
    pub trace: Option<TraceRecord>,
}

/// Cancellation and deadline applied to every suspension point
struct Limits {
    cancel: CancellationToken,
    deadline: Option<Instant>,
    timeout: Option<Duration>,
}

impl Limits {
    fn new(cancel: CancellationToken, timeout: Option<Duration>) -> Self {
        Self {
            cancel,
            deadline: timeout.map(|t| Instant::now() + t),
            timeout,
        }
    }

    async fn guard<T>(&self, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(OrchestratorError::Cancelled),
            _ = deadline => Err(OrchestratorError::Timeout {
                seconds: self.timeout.map(|t| t.as_secs()).unwrap_or_default(),
            }),
            result = fut => result,
        }
    }

    async fn sleep(&self, duration: Duration) -> Result<()> {
        self.guard(async {
            tokio::time::sleep(duration).await;
            Ok(())
        })
        .await
    }
}

/// One tool call ready for dispatch
struct PreparedCall {
    call_id: String,
    tool: ToolRef,
    args: std::result::Result<Value, String>,
    /// Arguments exactly as the planner sent them
    raw: Value,
    synthetic: bool,
}

impl PreparedCall {
    /// Arguments as seen by the guardrail and the trace.
    ///
    /// Undecodable arguments are represented by their raw form so distinct
    /// malformed payloads keep distinct retry counters.
    fn args_value(&self) -> Value {
        match &self.args {
            Ok(args) => args.clone(),
            Err(_) => self.raw.clone(),
        }
    }
}

/// Drives planner runs for brand/plan pairs
pub struct Orchestrator {
    planner: Arc<dyn Planner>,
    store: Arc<dyn DocumentStore>,
    tools: ToolRegistry,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        planner: Arc<dyn Planner>,
        store: Arc<dyn DocumentStore>,
        tools: ToolRegistry,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            planner,
            store,
            tools,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run one orchestration to completion
    pub async fn run(
        &self,
        request: OrchestrationRequest,
    ) -> std::result::Result<RunReport, RunFailure> {
        self.run_with_cancel(request, CancellationToken::new()).await
    }

    /// Run one orchestration, stopping early when `cancel` fires
    pub async fn run_with_cancel(
        &self,
        request: OrchestrationRequest,
        cancel: CancellationToken,
    ) -> std::result::Result<RunReport, RunFailure> {
        if let Err(error) = request.validate() {
            warn!("Rejected orchestration request: {}", error);
            let store = self.store.as_ref();
            return Err(fail_local(store, &self.config.agent_name, error, &request).await);
        }

        let limits = Limits::new(cancel, self.config.run_timeout);

        let run = match self.open_run(&request, &limits).await {
            Ok(run) => run,
            Err(error) => {
                warn!("Failed to open planner run: {}", error);
                let store = self.store.as_ref();
                return Err(fail_local(store, &self.config.agent_name, error, &request).await);
            }
        };

        info!(
            run_id = %run.id,
            thread_id = %run.thread_id,
            brand_id = %request.brand_id,
            plan_id = %request.plan_id,
            "Planner run created"
        );

        let mut trace = TraceManager::new(run.id.clone(), self.config.agent_name.clone());
        trace.add_event(
            TraceEventKind::Custom,
            EventDetails::new().input(json!(request)).metadata(json!({
                "event": "run-created",
                "threadId": run.thread_id,
                "status": run.status.as_str(),
            })),
        );

        let mut state = RunState::new(
            self.config.max_attempts,
            CarriedContext::new(request.brand_id.trim(), request.plan_id.trim()),
        );

        let outcome = match self.drive(run.clone(), &mut trace, &mut state, &limits).await {
            Ok(completed) => self.finish(&completed, &mut trace, &state, &limits).await,
            Err(error) => Err(error),
        };

        match outcome {
            Ok(result) => {
                trace.succeed(Some(into_payload(json!({
                    "resultField": self.config.result_field,
                    "iterations": state.iterations,
                    "publishedPostId": state.context.published_post_id,
                }))));
                self.persist(&trace).await;
                info!(run_id = %run.id, "Orchestration succeeded");

                Ok(RunReport {
                    run_id: run.id,
                    status: RunStatus::Completed,
                    result,
                    trace: trace.build_record(),
                    published_post_id: state.context.published_post_id,
                })
            }
            Err(error) => {
                if matches!(
                    error,
                    OrchestratorError::Cancelled | OrchestratorError::Timeout { .. }
                ) {
                    self.cancel_planner_run(&run).await;
                }

                warn!(run_id = %run.id, "Orchestration failed: {}", error);
                trace.fail(
                    error.to_string(),
                    EventDetails::new().metadata(json!({
                        "iterations": state.iterations,
                    })),
                );
                self.persist(&trace).await;

                Err(RunFailure {
                    error,
                    run_id: Some(run.id),
                    trace: Some(trace.build_record()),
                })
            }
        }
    }

    /// Ask the planner to stop a run, giving up after `cancel_timeout`
    async fn cancel_planner_run(&self, run: &PlannerRun) {
        let cancel = self.planner.cancel_run(&run.thread_id, &run.id);
        match tokio::time::timeout(self.config.cancel_timeout, cancel).await {
            Ok(Ok(())) => debug!(run_id = %run.id, "Planner run cancelled"),
            Ok(Err(e)) => warn!(run_id = %run.id, "Failed to cancel planner run: {}", e),
            Err(_) => warn!(run_id = %run.id, "Planner did not acknowledge cancellation in time"),
        }
    }

    async fn open_run(&self, request: &OrchestrationRequest, limits: &Limits) -> Result<PlannerRun> {
        let thread_id = limits.guard(self.planner.create_thread()).await?;
        limits
            .guard(
                self.planner
                    .add_message(&thread_id, &request.opening_message()),
            )
            .await?;
        limits.guard(self.planner.create_run(&thread_id)).await
    }

    /// Poll the run until it completes, answering tool calls on the way
    async fn drive(
        &self,
        mut run: PlannerRun,
        trace: &mut TraceManager,
        state: &mut RunState,
        limits: &Limits,
    ) -> Result<PlannerRun> {
        let mut polls: u32 = 0;

        loop {
            match run.status {
                RunStatus::Completed => return Ok(run),
                RunStatus::RequiresAction => {
                    if run.tool_calls.is_empty() {
                        return Err(OrchestratorError::planner(
                            "Run requires action but carries no tool calls",
                        ));
                    }

                    let outputs = self.handle_tool_calls(&run, trace, state, limits).await?;
                    let previous = run.status;
                    run = limits
                        .guard(
                            self.planner
                                .submit_tool_outputs(&run.thread_id, &run.id, &outputs),
                        )
                        .await?;
                    debug!(run_id = %run.id, outputs = outputs.len(), "Submitted tool outputs");
                    record_transition(trace, previous, &run);
                    continue;
                }
                status if status.is_pending() => {}
                status => {
                    return Err(OrchestratorError::RunFailed {
                        run_id: run.id,
                        status,
                        reason: run.last_error,
                    });
                }
            }

            if let Some(max_polls) = self.config.max_polls {
                if polls >= max_polls {
                    return Err(OrchestratorError::PollLimit { polls: max_polls });
                }
            }

            limits.sleep(self.config.poll_interval).await?;
            let previous = run.status;
            run = limits
                .guard(self.planner.get_run(&run.thread_id, &run.id))
                .await?;
            polls += 1;
            record_transition(trace, previous, &run);
        }
    }

    /// Answer one `requires_action` round
    async fn handle_tool_calls(
        &self,
        run: &PlannerRun,
        trace: &mut TraceManager,
        state: &mut RunState,
        limits: &Limits,
    ) -> Result<Vec<ToolOutput>> {
        state.iterations += 1;
        let tool_ctx = ToolContext {
            run_id: run.id.clone(),
        };

        let calls: Vec<PreparedCall> = run
            .tool_calls
            .iter()
            .map(|call| self.prepare(call, trace, state))
            .collect();

        info!(
            run_id = %run.id,
            iteration = state.iterations,
            calls = calls.len(),
            "Dispatching tool calls"
        );

        let results = match limits
            .guard(async { Ok(join_all(calls.iter().map(|c| self.dispatch(c, &tool_ctx))).await) })
            .await
        {
            Ok(results) => results,
            Err(error) => {
                for call in &calls {
                    record_interrupted(trace, call, &error);
                }
                return Err(error);
            }
        };

        let mut outcomes: Vec<ToolOutcome> = Vec::with_capacity(calls.len());
        for (call, result) in calls.iter().zip(results) {
            outcomes.push(settle(call, result, trace, state));
        }

        if self.config.auto_publish {
            self.auto_publish(&calls, &mut outcomes, trace, state, &tool_ctx, limits)
                .await?;
        }

        Ok(calls
            .iter()
            .zip(&outcomes)
            .map(|(call, outcome)| ToolOutput {
                tool_call_id: call.call_id.clone(),
                output: outcome.to_output().to_string(),
            })
            .collect())
    }

    /// Resolve, decode and default one call, recording its invoke event
    fn prepare(&self, call: &ToolCall, trace: &mut TraceManager, state: &mut RunState) -> PreparedCall {
        let tool = ToolRef::resolve(&call.name);
        let mut args = decode_arguments(&call.arguments);
        let mut defaulted = Vec::new();

        if let Ok(args) = args.as_mut() {
            if self.config.auto_default_topic {
                defaulted = state.context.apply_defaults(&tool, args);
                if !defaulted.is_empty() {
                    debug!(tool = %tool.as_str(), fields = ?defaulted, "Filled default arguments");
                }
            }
            state.context.observe_args(args);
        }

        let prepared = PreparedCall {
            call_id: call.id.clone(),
            tool,
            args,
            raw: call.arguments.clone(),
            synthetic: false,
        };

        let mut metadata = json!({ "toolCallId": prepared.call_id });
        if !defaulted.is_empty() {
            metadata["defaulted"] = json!(defaulted);
        }
        if let Err(error) = &prepared.args {
            metadata["decodeError"] = Value::from(error.as_str());
        }
        trace.add_event(
            TraceEventKind::ToolInvoke,
            EventDetails::new()
                .tool(prepared.tool.as_str())
                .input(prepared.args_value())
                .metadata(metadata),
        );

        prepared
    }

    async fn dispatch(
        &self,
        call: &PreparedCall,
        ctx: &ToolContext,
    ) -> std::result::Result<Value, ToolError> {
        debug!(tool = %call.tool.as_str(), call_id = %call.call_id, "Dispatching tool");
        match &call.args {
            Ok(args) => self.tools.dispatch(&call.tool, ctx, args.clone()).await,
            Err(_) if call.tool.known().is_none() => {
                Err(ToolError::UnknownTool(call.tool.as_str().to_string()))
            }
            Err(error) => Err(ToolError::InvalidArguments(error.clone())),
        }
    }

    /// Publish generated copy when the planner did not publish in the same round
    async fn auto_publish(
        &self,
        calls: &[PreparedCall],
        outcomes: &mut [ToolOutcome],
        trace: &mut TraceManager,
        state: &mut RunState,
        ctx: &ToolContext,
        limits: &Limits,
    ) -> Result<()> {
        if calls.iter().any(|c| c.tool.is(ToolName::CreatePost)) {
            return Ok(());
        }

        let Some(index) = calls
            .iter()
            .zip(outcomes.iter())
            .rposition(|(c, o)| c.tool.is(ToolName::GeneratePostCopy) && o.is_success())
        else {
            return Ok(());
        };

        let Some(args) = outcomes[index]
            .value()
            .and_then(|generated| state.context.publish_args(generated))
        else {
            return Ok(());
        };

        let call = PreparedCall {
            call_id: format!("synthetic-{}", Uuid::new_v4()),
            tool: ToolRef::Known(ToolName::CreatePost),
            raw: args.clone(),
            args: Ok(args),
            synthetic: true,
        };
        info!(
            run_id = %ctx.run_id,
            call_id = %call.call_id,
            "Planner skipped publishing, adding create_post"
        );

        trace.add_event(
            TraceEventKind::ToolInvoke,
            EventDetails::new()
                .tool(call.tool.as_str())
                .input(call.args_value())
                .metadata(json!({
                    "toolCallId": call.call_id,
                    "synthetic": true,
                    "sourceToolCallId": calls[index].call_id,
                })),
        );

        let result = match limits.guard(async { Ok(self.dispatch(&call, ctx).await) }).await {
            Ok(result) => result,
            Err(error) => {
                record_interrupted(trace, &call, &error);
                return Err(error);
            }
        };
        let outcome = settle(&call, result, trace, state);

        match outcome.value().and_then(|post| post.get("id")).and_then(Value::as_str) {
            Some(post_id) => {
                if let ToolOutcome::Success(Value::Object(generated)) = &mut outcomes[index] {
                    generated.insert("publishedPostId".to_string(), Value::from(post_id));
                }
            }
            None => warn!(
                run_id = %ctx.run_id,
                error = outcome.error().unwrap_or_default(),
                "Automatic publish failed"
            ),
        }

        Ok(())
    }

    /// Extract the result from the final planner messages
    async fn finish(
        &self,
        run: &PlannerRun,
        trace: &mut TraceManager,
        state: &RunState,
        limits: &Limits,
    ) -> Result<Value> {
        let messages = limits
            .guard(self.planner.list_messages(&run.thread_id))
            .await?;
        let extraction = extract(Value::Array(messages), &self.config.result_field);

        trace.add_event(
            TraceEventKind::Custom,
            EventDetails::new().metadata(json!({
                "event": "extraction",
                "status": extraction.status,
                "iterations": state.iterations,
            })),
        );

        match extraction.payload {
            Some(payload) => Ok(payload),
            None => Err(OrchestratorError::Extraction(
                extraction
                    .error
                    .unwrap_or_else(|| "No structured result".to_string()),
            )),
        }
    }

    async fn persist(&self, trace: &TraceManager) {
        persist_trace(self.store.as_ref(), trace).await;
    }
}

/// Trace and persist a failure that happened before a planner run existed.
///
/// The trace is filed under a fresh `local-<uuid>` run id.
pub async fn fail_local(
    store: &dyn DocumentStore,
    agent_name: &str,
    error: OrchestratorError,
    request: &OrchestrationRequest,
) -> RunFailure {
    let run_id = format!("local-{}", Uuid::new_v4());
    let mut trace = TraceManager::new(run_id.clone(), agent_name);
    trace.fail(
        error.to_string(),
        EventDetails::new().input(json!(request)),
    );
    persist_trace(store, &trace).await;

    RunFailure {
        error,
        run_id: Some(run_id),
        trace: Some(trace.build_record()),
    }
}

async fn persist_trace(store: &dyn DocumentStore, trace: &TraceManager) {
    let envelope = TraceEnvelope::new(trace.build_record());
    if let Err(e) = store.append_trace(envelope).await {
        warn!(run_id = %trace.run_id(), "Failed to persist trace: {}", e);
    }
}

/// Run a dispatch result through the guardrail and record the outcome
fn settle(
    call: &PreparedCall,
    result: std::result::Result<Value, ToolError>,
    trace: &mut TraceManager,
    state: &mut RunState,
) -> ToolOutcome {
    let args = call.args_value();
    let outcome = state.guard.settle(&call.tool, &args, result);

    let mut metadata = json!({ "toolCallId": call.call_id });
    if call.synthetic {
        metadata["synthetic"] = Value::Bool(true);
    }

    match &outcome {
        ToolOutcome::Success(output) => {
            state.context.observe_result(&call.tool, output);
            if call.tool.is(ToolName::CreatePost) {
                if let Some(post_id) = output.get("id").and_then(Value::as_str) {
                    state.context.published_post_id = Some(post_id.to_string());
                }
            }
            debug!(tool = %call.tool.as_str(), call_id = %call.call_id, "Tool succeeded");
            trace.add_event(
                TraceEventKind::ToolResult,
                EventDetails::new()
                    .tool(call.tool.as_str())
                    .output(output.clone())
                    .metadata(metadata),
            );
        }
        failure => {
            warn!(
                tool = %call.tool.as_str(),
                call_id = %call.call_id,
                error = failure.error().unwrap_or_default(),
                "Tool call failed"
            );
            trace.add_event(
                TraceEventKind::Error,
                EventDetails::new()
                    .tool(call.tool.as_str())
                    .input(args)
                    .error(failure.to_output())
                    .metadata(metadata),
            );
        }
    }

    outcome
}

/// Close out a call whose dispatch was cut short by cancellation or the deadline
fn record_interrupted(trace: &mut TraceManager, call: &PreparedCall, error: &OrchestratorError) {
    let mut metadata = json!({ "toolCallId": call.call_id });
    if call.synthetic {
        metadata["synthetic"] = Value::Bool(true);
    }
    trace.add_event(
        TraceEventKind::Error,
        EventDetails::new()
            .tool(call.tool.as_str())
            .error(json!({
                "status": "interrupted",
                "error": error.to_string(),
            }))
            .metadata(metadata),
    );
}

fn record_transition(trace: &mut TraceManager, previous: RunStatus, run: &PlannerRun) {
    if previous == run.status {
        return;
    }
    info!(run_id = %run.id, from = %previous, to = %run.status, "Run status changed");
    trace.add_event(
        TraceEventKind::Custom,
        EventDetails::new().metadata(json!({
            "event": "status-change",
            "from": previous.as_str(),
            "to": run.status.as_str(),
        })),
    );
}

/// Decode call arguments given either as an object or a JSON string
fn decode_arguments(raw: &Value) -> std::result::Result<Value, String> {
    let decoded = match raw {
        Value::Null => return Ok(json!({})),
        Value::String(text) if text.trim().is_empty() => return Ok(json!({})),
        Value::String(text) => serde_json::from_str::<Value>(text)
            .map_err(|e| format!("Arguments are not valid JSON: {}", e))?,
        other => other.clone(),
    };

    if decoded.is_object() {
        Ok(decoded)
    } else {
        Err("Arguments must be a JSON object".to_string())
    }
}
