pub mod ai_gateway;
pub mod breathing;
pub mod care_plan;
pub mod crisis;
pub mod mailer;
pub mod mood_analysis;
pub mod mood_trends;
pub mod progress_report;
pub mod reminder_email;
pub mod sse;
