//! Built-in annotation tasks and their prompt builders.

use std::sync::Arc;

use clap::ValueEnum;
use serde_json::Value;

use super::prompts::{
    DEMOGRAPHICS_TEMPLATE, EXPERIENCE_SCORE_TEMPLATE, FIT_SCORE_TEMPLATE, PRESTIGE_TEMPLATE,
    SKILL_SCORE_TEMPLATE,
};
use super::schema::{Column, ResponseSchema, TabularSchema};
use super::task::{AnnotationTask, ExhaustionPolicy, PromptBuilder};
use crate::llm_client::prompts::{CSV_ONLY_INSTRUCTION, SCORE_ONLY_INSTRUCTION};
use crate::models::Record;

pub const PRESTIGE_LEVELS: &[&str] = &["High", "Medium", "Low", "Unknown"];
pub const GENDERS: &[&str] = &["Male", "Female", "Unknown"];
pub const ETHNICITIES: &[&str] = &[
    "Caucasian",
    "Hispanic",
    "African American",
    "Middle Eastern",
    "Asian",
    "South Asian",
];

const DEFAULT_CONCURRENCY: usize = 5;
const TABULAR_BATCH_SIZE: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum TaskKind {
    FitScore,
    SkillScore,
    ExperienceScore,
    Prestige,
    Demographics,
}

impl TaskKind {
    pub fn all() -> Vec<TaskKind> {
        vec![
            TaskKind::FitScore,
            TaskKind::SkillScore,
            TaskKind::ExperienceScore,
            TaskKind::Prestige,
            TaskKind::Demographics,
        ]
    }

    /// Descriptor for this kind. Skill and experience prompts embed `job_description`.
    pub fn build(self, job_description: &Arc<str>) -> AnnotationTask {
        match self {
            TaskKind::FitScore => fit_score(),
            TaskKind::SkillScore => skill_score(job_description.clone()),
            TaskKind::ExperienceScore => experience_score(job_description.clone()),
            TaskKind::Prestige => prestige(),
            TaskKind::Demographics => demographics(),
        }
    }
}

pub fn fit_score() -> AnnotationTask {
    AnnotationTask {
        name: "fit_score".to_string(),
        prompt: Arc::new(FitScorePrompt),
        schema: ResponseSchema::SingleScore { field: "score" },
        batch_size: 1,
        max_concurrent: DEFAULT_CONCURRENCY,
        max_retries: 2,
        on_exhausted: ExhaustionPolicy::Drop,
    }
}

pub fn skill_score(job_description: Arc<str>) -> AnnotationTask {
    AnnotationTask {
        name: "skill_score".to_string(),
        prompt: Arc::new(SkillScorePrompt { job_description }),
        schema: ResponseSchema::SingleScore {
            field: "skill_score",
        },
        batch_size: 1,
        max_concurrent: DEFAULT_CONCURRENCY,
        max_retries: 11,
        on_exhausted: ExhaustionPolicy::Abort,
    }
}

pub fn experience_score(job_description: Arc<str>) -> AnnotationTask {
    AnnotationTask {
        name: "experience_score".to_string(),
        prompt: Arc::new(ExperienceScorePrompt { job_description }),
        schema: ResponseSchema::SingleScore {
            field: "experience_score",
        },
        batch_size: 1,
        max_concurrent: DEFAULT_CONCURRENCY,
        max_retries: 5,
        on_exhausted: ExhaustionPolicy::Abort,
    }
}

pub fn prestige() -> AnnotationTask {
    AnnotationTask {
        name: "prestige".to_string(),
        prompt: Arc::new(PrestigePrompt),
        schema: ResponseSchema::Tabular(TabularSchema {
            delimiter: b';',
            has_header: false,
            columns: vec![
                Column::key("name"),
                Column::text("institution").echo(),
                Column::label("prestige", PRESTIGE_LEVELS),
            ],
        }),
        batch_size: TABULAR_BATCH_SIZE,
        max_concurrent: DEFAULT_CONCURRENCY,
        max_retries: 11,
        on_exhausted: ExhaustionPolicy::Abort,
    }
}

pub fn demographics() -> AnnotationTask {
    AnnotationTask {
        name: "demographics".to_string(),
        prompt: Arc::new(DemographicsPrompt),
        schema: ResponseSchema::Tabular(TabularSchema {
            delimiter: b',',
            has_header: false,
            columns: vec![
                Column::key("name"),
                Column::label("gender", GENDERS),
                Column::label("ethnicity", ETHNICITIES),
            ],
        }),
        batch_size: TABULAR_BATCH_SIZE,
        max_concurrent: DEFAULT_CONCURRENCY,
        max_retries: 3,
        on_exhausted: ExhaustionPolicy::Drop,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt builders
// ────────────────────────────────────────────────────────────────────────────

fn json_or_null(value: Option<&Value>) -> String {
    value.map(Value::to_string).unwrap_or_else(|| "null".to_string())
}

struct FitScorePrompt;

impl PromptBuilder for FitScorePrompt {
    fn build(&self, batch: &[Arc<Record>]) -> String {
        let resumes: Vec<String> = batch.iter().map(|r| r.document().to_string()).collect();
        FIT_SCORE_TEMPLATE
            .replace("{score_only}", SCORE_ONLY_INSTRUCTION)
            .replace("{resume}", &resumes.join("\n"))
    }
}

struct SkillScorePrompt {
    job_description: Arc<str>,
}

impl PromptBuilder for SkillScorePrompt {
    fn build(&self, batch: &[Arc<Record>]) -> String {
        let skills: Vec<String> = batch.iter().map(|r| json_or_null(r.skills())).collect();
        SKILL_SCORE_TEMPLATE
            .replace("{job_description}", &self.job_description)
            .replace("{score_only}", SCORE_ONLY_INSTRUCTION)
            .replace("{skills}", &skills.join("\n"))
    }
}

struct ExperienceScorePrompt {
    job_description: Arc<str>,
}

impl PromptBuilder for ExperienceScorePrompt {
    fn build(&self, batch: &[Arc<Record>]) -> String {
        let experience: Vec<String> = batch
            .iter()
            .map(|r| json_or_null(r.experience()))
            .collect();
        EXPERIENCE_SCORE_TEMPLATE
            .replace("{job_description}", &self.job_description)
            .replace("{score_only}", SCORE_ONLY_INSTRUCTION)
            .replace("{experience}", &experience.join("\n"))
    }
}

struct PrestigePrompt;

impl PromptBuilder for PrestigePrompt {
    fn build(&self, batch: &[Arc<Record>]) -> String {
        let rows: Vec<String> = batch
            .iter()
            .map(|r| {
                let institution = r.primary_institution();
                format!("{}|{}|{}", r.name(), institution.name, institution.location)
            })
            .collect();
        PRESTIGE_TEMPLATE
            .replace("{csv_only}", CSV_ONLY_INSTRUCTION)
            .replace("{rows}", &rows.join("\n"))
    }
}

struct DemographicsPrompt;

impl PromptBuilder for DemographicsPrompt {
    fn build(&self, batch: &[Arc<Record>]) -> String {
        let names: Vec<&str> = batch.iter().map(|r| r.name()).collect();
        DEMOGRAPHICS_TEMPLATE
            .replace("{csv_only}", CSV_ONLY_INSTRUCTION)
            .replace("{names}", &names.join("\n"))
    }
}
