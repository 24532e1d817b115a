use exportview_types::Message;

/// Whether `message` contains `needle`, which must already be lowercase.
///
/// Fields are checked cheapest-and-likeliest first: text, then user, then
/// attachment display names. Literal substring only; the query is never
/// compiled as a pattern.
pub fn matches(message: &Message, needle: &str) -> bool {
    if contains_folded(message.text.as_deref(), needle) {
        return true;
    }
    if contains_folded(message.user.as_deref(), needle) {
        return true;
    }
    message
        .attachments
        .iter()
        .any(|a| contains_folded(Some(&a.display), needle))
}

/// Messages matching `query`, case-insensitively, in their original order.
/// An empty query matches everything.
pub fn filter_messages(messages: &[Message], query: &str) -> Vec<Message> {
    if query.is_empty() {
        return messages.to_vec();
    }
    let needle = query.to_lowercase();
    messages
        .iter()
        .filter(|m| matches(m, &needle))
        .cloned()
        .collect()
}

fn contains_folded(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn case_insensitive_text_match() {
        let messages = vec![
            message(json!({"ts": "1", "text": "hello world"})),
            message(json!({"ts": "2", "text": "bye"})),
        ];
        let found = filter_messages(&messages, "WORLD");
        assert_eq!(found, vec![messages[0].clone()]);
    }

    #[test]
    fn matches_user_and_attachment_names() {
        let messages = vec![
            message(json!({"ts": "1", "text": "nothing here", "user": "Dana Scully"})),
            message(json!({"ts": "2", "text": "see file", "attachments": [
                {"id": "x/1", "display": "Budget-Q3.xlsx"}
            ]})),
            message(json!({"ts": "3", "text": "unrelated"})),
        ];
        assert_eq!(filter_messages(&messages, "scully").len(), 1);
        assert_eq!(filter_messages(&messages, "budget-q3").len(), 1);
        assert!(filter_messages(&messages, "zzz").is_empty());
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let messages = vec![
            message(json!({"ts": "2", "text": "b"})),
            message(json!({"ts": "1", "text": "a"})),
        ];
        assert_eq!(filter_messages(&messages, ""), messages);
    }

    #[test]
    fn pattern_characters_are_literal() {
        let messages = vec![
            message(json!({"ts": "1", "text": "price (USD) is $5.00"})),
            message(json!({"ts": "2", "text": "abc"})),
        ];
        assert_eq!(filter_messages(&messages, "(usd)").len(), 1);
        assert_eq!(filter_messages(&messages, "$5.").len(), 1);
        assert!(filter_messages(&messages, "a.c").is_empty());
        assert!(filter_messages(&messages, "[").is_empty());
    }

    #[test]
    fn messages_without_text_or_user_do_not_panic() {
        let messages = vec![message(json!({"ts": ""}))];
        assert!(filter_messages(&messages, "x").is_empty());
    }
}
