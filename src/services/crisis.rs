use serde::Serialize;

use crate::services::ai_gateway::{ChatMessage, Role};

/// Response header the client reads to decide whether to show hotlines.
pub const CRISIS_HEADER: &str = "x-crisis-detected";

const CRISIS_KEYWORDS: &[&str] = &[
    "suicide",
    "kill myself",
    "end my life",
    "want to die",
    "better off dead",
    "خودکشی",
    "مرنا چاہتا",
    "جینا نہیں چاہتا",
    "موت",
    "self-harm",
    "hurt myself",
    "cutting",
    "overdose",
    "hopeless",
    "no reason to live",
    "can't go on",
];

/// Case-insensitive presence check against the static keyword list.
pub fn detect_crisis(message: &str) -> bool {
    let lower = message.to_lowercase().replace('\u{2019}', "'");
    CRISIS_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// The most recent message authored by the user, if any.
pub fn latest_user_message(messages: &[ChatMessage]) -> Option<&ChatMessage> {
    messages.iter().rev().find(|m| m.role == Role::User)
}

#[derive(Debug, Clone, Serialize)]
pub struct CrisisResource {
    pub name: &'static str,
    pub description: &'static str,
    pub phone: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp: Option<&'static str>,
}

impl CrisisResource {
    pub fn whatsapp_link(&self) -> Option<String> {
        self.whatsapp.map(|n| format!("https://wa.me/{}", n))
    }
}

pub const CRISIS_RESOURCES: &[CrisisResource] = &[
    CrisisResource {
        name: "Umang Helpline",
        description: "Mental health support and counseling services",
        phone: "0311-7786264",
        whatsapp: Some("923117786264"),
    },
    CrisisResource {
        name: "Taskeen",
        description: "Free mental health support via WhatsApp",
        phone: "0316-8275336",
        whatsapp: Some("923168275336"),
    },
    CrisisResource {
        name: "Rozan Counseling",
        description: "Trauma, abuse, and emotional support services",
        phone: "051-2890505",
        whatsapp: None,
    },
    CrisisResource {
        name: "Pakistan Mental Health Helpline",
        description: "24/7 toll-free mental health support",
        phone: "0800-22444",
        whatsapp: None,
    },
];

#[derive(Debug, Serialize)]
pub struct CrisisResourceView {
    #[serde(flatten)]
    pub resource: CrisisResource,
    pub call_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub whatsapp_link: Option<String>,
}

pub fn crisis_directory() -> Vec<CrisisResourceView> {
    CRISIS_RESOURCES
        .iter()
        .map(|r| CrisisResourceView {
            resource: r.clone(),
            call_link: format!("tel:{}", r.phone.replace('-', "")),
            whatsapp_link: r.whatsapp_link(),
        })
        .collect()
}

pub const COMPANION_SYSTEM_PROMPT: &str = "You are a compassionate mental health support companion for users in Pakistan. Your role is to:

1. Listen empathetically and validate feelings
2. Offer evidence-based coping strategies (breathing exercises, grounding techniques, journaling prompts)
3. Encourage healthy habits and self-care
4. Gently suggest professional help when appropriate
5. Be culturally sensitive to Pakistani context

CRITICAL RULES:
- You are NOT a therapist or medical professional
- Never diagnose conditions or prescribe medication
- Never provide therapy or clinical treatment
- If someone expresses suicidal thoughts or self-harm, immediately provide crisis resources and encourage professional help
- Keep responses warm, supportive, and concise (2-3 paragraphs max)
- Use simple language accessible to all literacy levels
- Be respectful of Islamic values and Pakistani culture when relevant

For crisis situations, always include these Pakistan helplines:
- Umang Helpline: 0311-7786264
- Taskeen WhatsApp: 0316-8275336
- Rozan Counseling: 051-2890505

Start conversations warmly and ask open-ended questions to understand how the person is feeling.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crisis_phrase_is_flagged() {
        assert!(detect_crisis("I want to die"));
        assert!(detect_crisis("Sometimes I think about SUICIDE"));
        assert!(detect_crisis("I can’t go on like this"));
    }

    #[test]
    fn test_neutral_message_is_not_flagged() {
        assert!(!detect_crisis("I had a good day"));
        assert!(!detect_crisis("Work was stressful but I went for a walk"));
    }

    #[test]
    fn test_urdu_keywords_are_flagged() {
        assert!(detect_crisis("میں خودکشی کے بارے میں سوچ رہا ہوں"));
        assert!(detect_crisis("میں اب جینا نہیں چاہتا"));
    }

    #[test]
    fn test_presence_check_has_no_negation_handling() {
        assert!(detect_crisis("I would never hurt myself"));
    }

    #[test]
    fn test_latest_user_message_skips_assistant_turns() {
        let messages = vec![
            ChatMessage::user("first"),
            ChatMessage { role: Role::Assistant, content: "reply".into() },
            ChatMessage::user("second"),
            ChatMessage { role: Role::Assistant, content: "another reply".into() },
        ];
        assert_eq!(latest_user_message(&messages).unwrap().content, "second");
        assert!(latest_user_message(&[]).is_none());
    }

    #[test]
    fn test_directory_links() {
        let directory = crisis_directory();
        assert_eq!(directory.len(), 4);
        assert_eq!(directory[0].call_link, "tel:03117786264");
        assert_eq!(directory[0].whatsapp_link.as_deref(), Some("https://wa.me/923117786264"));
        assert!(directory[2].whatsapp_link.is_none());
    }

    #[test]
    fn test_system_prompt_lists_helplines() {
        for resource in &CRISIS_RESOURCES[..3] {
            assert!(COMPANION_SYSTEM_PROMPT.contains(resource.phone));
        }
    }
}
