//! Test doubles shared by the annotation tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::schema::{Column, ResponseSchema, TabularSchema};
use super::task::{AnnotationTask, ExhaustionPolicy, PromptBuilder};
use crate::llm_client::{Backend, LlmError, ModelGateway};
use crate::models::Record;

type Script = dyn Fn(&str, u32) -> Result<String, LlmError> + Send + Sync;

/// Deterministic gateway: replies come from a script given the prompt and how
/// many times that exact prompt has been seen before.
pub struct ScriptedGateway {
    script: Box<Script>,
    delay: Duration,
    calls: Mutex<HashMap<String, u32>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    total: AtomicUsize,
}

impl ScriptedGateway {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&str, u32) -> Result<String, LlmError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            delay: Duration::ZERO,
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        }
    }

    /// Each call sleeps this long while counted as in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn distinct_prompts(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn complete(
        &self,
        prompt: &str,
        _model: &str,
        _backend: Backend,
    ) -> Result<String, LlmError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.total.fetch_add(1, Ordering::SeqCst);

        let call = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(prompt.to_string()).or_insert(0);
            let current = *n;
            *n += 1;
            current
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let reply = (self.script)(prompt, call);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

/// Prompt that lists the batch's names, one per line, after a fixed header.
pub struct NamesPrompt;

impl PromptBuilder for NamesPrompt {
    fn build(&self, batch: &[Arc<Record>]) -> String {
        let names: Vec<&str> = batch.iter().map(|r| r.name()).collect();
        format!("Candidates:\n{}", names.join("\n"))
    }
}

/// Candidate names from a `NamesPrompt`.
pub fn prompt_names(prompt: &str) -> Vec<String> {
    prompt.lines().skip(1).map(str::to_string).collect()
}

pub fn candidate(name: &str) -> Arc<Record> {
    Arc::new(
        Record::from_value(json!({
            "personal_info": {"name": name},
            "skills": ["Rust"],
        }))
        .unwrap(),
    )
}

pub fn candidates(names: &[&str]) -> Vec<Arc<Record>> {
    names.iter().map(|n| candidate(n)).collect()
}

pub fn single_score_task(max_retries: u32, on_exhausted: ExhaustionPolicy) -> AnnotationTask {
    AnnotationTask {
        name: "stub_score".to_string(),
        prompt: Arc::new(NamesPrompt),
        schema: ResponseSchema::SingleScore { field: "score" },
        batch_size: 1,
        max_concurrent: 5,
        max_retries,
        on_exhausted,
    }
}

pub const GENDERS: &[&str] = &["Male", "Female", "Unknown"];

pub fn gender_schema() -> TabularSchema {
    TabularSchema {
        delimiter: b',',
        has_header: false,
        columns: vec![Column::key("name"), Column::label("gender", GENDERS)],
    }
}

pub fn gender_task(batch_size: usize, max_retries: u32, on_exhausted: ExhaustionPolicy) -> AnnotationTask {
    AnnotationTask {
        name: "stub_gender".to_string(),
        prompt: Arc::new(NamesPrompt),
        schema: ResponseSchema::Tabular(gender_schema()),
        batch_size,
        max_concurrent: 5,
        max_retries,
        on_exhausted,
    }
}
