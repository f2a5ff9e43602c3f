use crate::models::care_plan::CareTask;
use crate::models::reminder::ReminderKind;

const DEFAULT_CUSTOM_MESSAGE: &str = "Just a friendly reminder to take care of yourself today.";

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

/// Active plan details used by the care-tasks reminder.
#[derive(Debug, Clone, Copy)]
pub struct PlanDigest<'a> {
    pub title: &'a str,
    pub tasks: &'a [CareTask],
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render(
    kind: ReminderKind,
    user_name: &str,
    plan: Option<PlanDigest<'_>>,
    custom_message: Option<&str>,
) -> RenderedEmail {
    let name = escape_html(user_name);
    match kind {
        ReminderKind::MoodCheckin => RenderedEmail {
            subject: "Time for your daily mood check-in 🌸".into(),
            html: format!(
                r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #7c3aed;">Hi {name}! 👋</h1>
  <p>This is your gentle reminder to check in with yourself today.</p>
  <p>Taking a moment to reflect on how you're feeling can make a big difference in your wellness journey.</p>
  <div style="background: #f3f4f6; padding: 20px; border-radius: 12px; margin: 20px 0;">
    <p style="margin: 0; font-size: 18px;">How are you feeling right now?</p>
    <p style="margin: 10px 0 0 0; color: #6b7280;">😊 Great • 🙂 Good • 😐 Okay • 😔 Low • 😢 Struggling</p>
  </div>
  <p>Open MindfulCare to log your mood and see your progress.</p>
  <p style="color: #9ca3af; font-size: 14px; margin-top: 30px;">You're doing amazing. Keep taking care of yourself! 💜</p>
</div>"#
            ),
        },
        ReminderKind::CareTasks => {
            let title = plan
                .map(|p| escape_html(p.title))
                .unwrap_or_else(|| "Today's Care Tasks".into());
            let items: String = plan
                .map(|p| p.tasks)
                .unwrap_or_default()
                .iter()
                .map(|t| match t.time.as_deref() {
                    Some(time) => format!(
                        r#"<li style="margin: 8px 0;">{} - {}</li>"#,
                        escape_html(&t.title),
                        escape_html(time)
                    ),
                    None => format!(r#"<li style="margin: 8px 0;">{}</li>"#, escape_html(&t.title)),
                })
                .collect();
            let items = if items.is_empty() {
                "<li>Check your app for your personalized tasks</li>".to_string()
            } else {
                items
            };

            RenderedEmail {
                subject: "Your daily care plan is ready 📋".into(),
                html: format!(
                    r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #7c3aed;">Good morning, {name}! 🌅</h1>
  <p>Here's your personalized care plan for today:</p>
  <div style="background: #f3f4f6; padding: 20px; border-radius: 12px; margin: 20px 0;">
    <h2 style="margin-top: 0; color: #374151;">{title}</h2>
    <ul style="color: #374151;">{items}</ul>
  </div>
  <p>Remember, each small step counts. You've got this! 💪</p>
  <p style="color: #9ca3af; font-size: 14px; margin-top: 30px;">Open MindfulCare to check off tasks as you complete them.</p>
</div>"#
                ),
            }
        }
        ReminderKind::Custom => {
            let message = escape_html(
                custom_message
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_CUSTOM_MESSAGE),
            );
            RenderedEmail {
                subject: "A message from MindfulCare 💜".into(),
                html: format!(
                    r#"<div style="font-family: sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #7c3aed;">Hi {name}!</h1>
  <p>{message}</p>
  <p style="color: #9ca3af; font-size: 14px; margin-top: 30px;">With love, MindfulCare 💜</p>
</div>"#
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::care_plan::TaskCategory;

    fn task(title: &str, time: Option<&str>) -> CareTask {
        CareTask {
            id: title.to_lowercase(),
            title: title.into(),
            description: String::new(),
            category: TaskCategory::Mindfulness,
            time: time.map(String::from),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x")</script> & 'y'"#),
            "&lt;script&gt;alert(&quot;x&quot;)&lt;/script&gt; &amp; &#39;y&#39;"
        );
    }

    #[test]
    fn test_mood_checkin_greets_user() {
        let email = render(ReminderKind::MoodCheckin, "Ayesha", None, None);
        assert_eq!(email.subject, "Time for your daily mood check-in 🌸");
        assert!(email.html.contains("Hi Ayesha! 👋"));
    }

    #[test]
    fn test_care_tasks_lists_plan_with_times() {
        let tasks = vec![task("Meditate", Some("8:00 AM")), task("Call a friend", None)];
        let plan = PlanDigest { title: "Calm Tuesday", tasks: &tasks };
        let email = render(ReminderKind::CareTasks, "there", Some(plan), None);

        assert!(email.html.contains("<h2 style=\"margin-top: 0; color: #374151;\">Calm Tuesday</h2>"));
        assert!(email.html.contains(">Meditate - 8:00 AM</li>"));
        assert!(email.html.contains(">Call a friend</li>"));
    }

    #[test]
    fn test_care_tasks_without_plan_uses_placeholder() {
        let email = render(ReminderKind::CareTasks, "there", None, None);
        assert!(email.html.contains("Today's Care Tasks"));
        assert!(email.html.contains("Check your app for your personalized tasks"));
    }

    #[test]
    fn test_custom_message_is_escaped_and_defaulted() {
        let email = render(ReminderKind::Custom, "Sam", None, Some("<b>Drink water</b>"));
        assert!(email.html.contains("<p>&lt;b&gt;Drink water&lt;/b&gt;</p>"));

        let default = render(ReminderKind::Custom, "Sam", None, Some("  "));
        assert!(default.html.contains(DEFAULT_CUSTOM_MESSAGE));
    }
}
