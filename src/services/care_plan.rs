//! Prompt assembly and output validation for AI-generated care plans.

use std::collections::HashSet;
use std::fmt::Write as _;

use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;
use crate::models::care_plan::{CareTask, TaskCategory};
use crate::models::mood_entry::MoodEntry;
use crate::models::session_summary::SessionSummary;
use crate::services::ai_gateway::{ChatMessage, ToolSpec};

/// Mood entries pulled into the prompt.
pub const CONTEXT_MOOD_ENTRIES: i64 = 7;
/// Session summaries pulled into the prompt.
pub const CONTEXT_SESSIONS: i64 = 3;

pub const CARE_PLAN_SYSTEM_PROMPT: &str = "You are a compassionate mental health care assistant. You create personalized daily care plans based on therapy insights and mood patterns. Always respond with valid JSON only, no markdown.";

/// Everything the generator knows about the user.
#[derive(Debug, Default)]
pub struct CarePlanContext<'a> {
    pub moods: &'a [MoodEntry],
    pub sessions: &'a [SessionSummary],
    pub session_notes: Option<&'a str>,
}

impl CarePlanContext<'_> {
    pub fn prompt(&self) -> String {
        let mut context =
            String::from("Generate a personalized daily mental health care plan with 5-6 tasks.\n\n");

        if !self.moods.is_empty() {
            let sum: i64 = self.moods.iter().map(|e| e.mood_score as i64).sum();
            let avg = sum as f64 / self.moods.len() as f64;
            let notes: Vec<&str> = self.moods.iter().filter_map(|e| e.note.as_deref()).collect();
            let _ = writeln!(context, "Recent mood average: {:.1}/5", avg);
            let _ = writeln!(context, "Recent mood notes: {}\n", notes.join("; "));
        }

        if !self.sessions.is_empty() {
            context.push_str("Recent therapy sessions:\n");
            for session in self.sessions {
                let _ = writeln!(context, "- {}", session.summary);
                if let Some(takeaways) = session.key_takeaways.as_ref().filter(|t| !t.is_empty()) {
                    let _ = writeln!(context, "  Takeaways: {}", takeaways.join(", "));
                }
            }
            context.push('\n');
        }

        if let Some(notes) = self.session_notes.map(str::trim).filter(|n| !n.is_empty()) {
            let _ = writeln!(context, "Additional notes from user: {}\n", notes);
        }

        let categories: Vec<&str> = TaskCategory::ALL.iter().map(|c| c.as_str()).collect();
        let _ = write!(
            context,
            "Create a care plan with tasks in these categories: {}.\n\
             Each task should have: id (unique string), title, description, category, and optional time (like \"8:00 AM\").\n\
             Make tasks specific, actionable, and compassionate.",
            categories.join(", ")
        );

        context
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(CARE_PLAN_SYSTEM_PROMPT),
            ChatMessage::user(self.prompt()),
        ]
    }
}

pub fn care_plan_tool() -> ToolSpec {
    let categories: Vec<&str> = TaskCategory::ALL.iter().map(|c| c.as_str()).collect();
    ToolSpec {
        name: "create_care_plan",
        description: "Create a structured care plan with tasks",
        parameters: json!({
            "type": "object",
            "properties": {
                "title": { "type": "string", "description": "A warm, encouraging title for the care plan" },
                "description": { "type": "string", "description": "A brief supportive description" },
                "tasks": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "string" },
                            "title": { "type": "string" },
                            "description": { "type": "string" },
                            "category": { "type": "string", "enum": categories },
                            "time": { "type": "string" }
                        },
                        "required": ["id", "title", "description", "category"]
                    }
                }
            },
            "required": ["title", "description", "tasks"]
        }),
    }
}

/// Decoded `create_care_plan` arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct CarePlanDraft {
    pub title: String,
    pub description: String,
    pub tasks: Vec<CareTask>,
}

impl CarePlanDraft {
    /// Reject drafts the rest of the service cannot work with.
    pub fn validate(self) -> Result<Self, AppError> {
        if self.title.trim().is_empty() {
            return Err(AppError::MalformedUpstream("care plan has no title".into()));
        }
        if self.tasks.is_empty() {
            return Err(AppError::MalformedUpstream("care plan has no tasks".into()));
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if task.id.trim().is_empty() {
                return Err(AppError::MalformedUpstream("care task has an empty id".into()));
            }
            if !seen.insert(task.id.as_str()) {
                return Err(AppError::MalformedUpstream(format!(
                    "duplicate care task id '{}'",
                    task.id
                )));
            }
        }
        Ok(self)
    }
}
