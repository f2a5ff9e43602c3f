pub mod care_plan;
pub mod mood_entry;
pub mod mood_insight;
pub mod profile;
pub mod reminder;
pub mod session_summary;
