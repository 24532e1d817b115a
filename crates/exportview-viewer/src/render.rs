use std::fmt::Write;

use exportview_types::Message;

const UNKNOWN_DATE: &str = "Unknown date";
const UNKNOWN_USER: &str = "Unknown User";

/// Messages bucketed by calendar day (UTC), days in order of first
/// appearance, messages in their original order within a day.
pub fn group_by_day(messages: &[Message]) -> Vec<(String, Vec<&Message>)> {
    let mut groups: Vec<(String, Vec<&Message>)> = Vec::new();
    for message in messages {
        let day = message
            .timestamp()
            .map(|at| at.format("%A, %B %-d, %Y").to_string())
            .unwrap_or_else(|| UNKNOWN_DATE.to_owned());
        match groups.iter_mut().find(|(key, _)| *key == day) {
            Some((_, bucket)) => bucket.push(message),
            None => groups.push((day, vec![message])),
        }
    }
    groups
}

pub fn render_messages(messages: &[Message]) -> String {
    let mut out = String::new();
    for (day, messages) in group_by_day(messages) {
        let _ = writeln!(out, "--- {} ---", day);
        for message in messages {
            let time = message
                .timestamp()
                .map(|at| at.format("%-I:%M %p").to_string())
                .unwrap_or_default();
            let user = message.user.as_deref().unwrap_or(UNKNOWN_USER);
            let _ = writeln!(out, "{:>8}  {}: {}", time, user, message.text.as_deref().unwrap_or(""));
            for attachment in &message.attachments {
                match attachment.size {
                    Some(size) => {
                        let _ = writeln!(out, "          [attachment] {} ({} bytes)", attachment.display, size);
                    }
                    None => {
                        let _ = writeln!(out, "          [attachment] {}", attachment.display);
                    }
                }
            }
            for reaction in &message.reactions {
                let _ = writeln!(out, "          :{}: {}", reaction.value, reaction.count);
            }
        }
    }
    out
}
