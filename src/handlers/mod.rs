pub mod care_plans;
pub mod chat;
pub mod extract;
pub mod health;
pub mod insights;
pub mod mood_entries;
pub mod profile;
pub mod reminders;
pub mod reports;
pub mod resources;
pub mod sessions;
