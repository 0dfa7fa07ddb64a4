//! HTML bodies for task notifications.

use crate::task::Priority;

use super::OutgoingEmail;

/// Data for the "task assigned" email.
#[derive(Debug, Clone)]
pub struct NewTaskEmail<'a> {
    pub assignee_name: &'a str,
    pub description: &'a str,
    /// Already formatted deadline, e.g. `10/03/2024 18:00`.
    pub due: &'a str,
    pub priority: Priority,
    pub app_url: Option<&'a str>,
}

/// Data for the "task completed" email sent to admins.
#[derive(Debug, Clone)]
pub struct CompletedTaskEmail<'a> {
    pub assignee_name: &'a str,
    pub description: &'a str,
    pub completed_at: &'a str,
    pub on_time: bool,
    pub justification: Option<&'a str>,
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

fn priority_style(priority: Priority) -> (&'static str, &'static str) {
    match priority {
        Priority::High => ("#ef4444", "High"),
        Priority::Medium => ("#f59e0b", "Medium"),
        Priority::Low => ("#10b981", "Low"),
    }
}

fn layout(header_color: &str, title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><meta name="viewport" content="width=device-width, initial-scale=1.0"></head>
<body style="margin:0;padding:0;font-family:Arial,sans-serif;background-color:#f3f4f6;">
<table width="100%" cellpadding="0" cellspacing="0" style="background-color:#f3f4f6;padding:40px 0;">
<tr><td align="center">
<table width="600" cellpadding="0" cellspacing="0" style="background-color:#ffffff;border-radius:8px;">
<tr><td style="background-color:{header_color};padding:30px;border-radius:8px 8px 0 0;">
<h1 style="margin:0;color:#ffffff;font-size:24px;">{title}</h1>
</td></tr>
<tr><td style="padding:30px;">
{content}
</td></tr>
<tr><td style="background-color:#f9fafb;padding:20px;border-radius:0 0 8px 8px;text-align:center;">
<p style="margin:0;color:#9ca3af;font-size:12px;">This is an automated message from the task tracker.</p>
</td></tr>
</table>
</td></tr>
</table>
</body>
</html>"#
    )
}

/// Email telling an assignee about a new task.
pub fn new_task_email(to: &str, data: &NewTaskEmail<'_>) -> OutgoingEmail {
    let (color, priority) = priority_style(data.priority);
    let link = data
        .app_url
        .map(|url| {
            format!(
                r#"<p style="margin:20px 0 0 0;"><a href="{}">Open the task tracker</a></p>"#,
                escape(url)
            )
        })
        .unwrap_or_default();

    let content = format!(
        r#"<p style="margin:0 0 20px 0;color:#374151;font-size:16px;">Hello, <strong>{name}</strong>!</p>
<p style="margin:0 0 20px 0;color:#374151;font-size:16px;">A new task was assigned to you:</p>
<div style="background-color:#f9fafb;border-left:4px solid {color};padding:20px;margin:20px 0;border-radius:4px;">
<h2 style="margin:0 0 15px 0;color:#111827;font-size:18px;">{description}</h2>
<p style="margin:8px 0;color:#6b7280;font-size:14px;"><strong>Due:</strong> {due}</p>
<p style="margin:8px 0;color:#6b7280;font-size:14px;"><strong>Priority:</strong> {priority}</p>
</div>{link}"#,
        name = escape(data.assignee_name),
        description = escape(data.description),
        due = escape(data.due),
    );

    OutgoingEmail {
        to: to.to_string(),
        subject: format!("New task: {}", data.description),
        html: layout("#2563eb", "New task assigned", &content),
    }
}

/// Email telling an admin that a task was completed.
pub fn task_completed_email(to: &str, data: &CompletedTaskEmail<'_>) -> OutgoingEmail {
    let (color, title) = if data.on_time {
        ("#10b981", "Task completed on time")
    } else {
        ("#ef4444", "Task completed late")
    };
    let justification = data
        .justification
        .map(|text| {
            format!(
                r#"<div style="background-color:#fef3c7;padding:12px;border-radius:4px;margin-top:10px;"><strong style="color:#92400e;">Justification:</strong><p style="margin:8px 0 0 0;color:#78350f;font-size:14px;">{}</p></div>"#,
                escape(text)
            )
        })
        .unwrap_or_default();

    let content = format!(
        r#"<p style="margin:0 0 20px 0;color:#374151;font-size:16px;">Completed by <strong>{name}</strong>:</p>
<div style="background-color:#f9fafb;border-left:4px solid {color};padding:20px;margin:20px 0;border-radius:4px;">
<h2 style="margin:0 0 15px 0;color:#111827;font-size:18px;">{description}</h2>
<p style="margin:8px 0;color:#6b7280;font-size:14px;"><strong>Completed at:</strong> {completed_at}</p>
{justification}
</div>"#,
        name = escape(data.assignee_name),
        description = escape(data.description),
        completed_at = escape(data.completed_at),
    );

    OutgoingEmail {
        to: to.to_string(),
        subject: format!("{}: {}", title, data.description),
        html: layout(color, title, &content),
    }
}
