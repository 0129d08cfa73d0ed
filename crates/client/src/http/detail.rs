use serde_json::Value;

/// Normalize an error body from the assessment service into one message.
///
/// The service reports failures in several shapes: a JSON object whose
/// `detail` is a plain string, a validation list of `{msg, ...}` objects, or
/// a nested object carrying one of the usual message keys. The priority is
/// fixed: string, then list of messages, then object, then a generic
/// status-derived fallback.
pub(crate) fn normalize_error_body(body: &str, status: u16) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        let detail = value.get("detail").unwrap_or(&value);
        return message_from(detail)
            .unwrap_or_else(|| format!("service returned status {status}"));
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() <= 200 {
        return trimmed.to_string();
    }
    format!("service returned status {status}")
}

fn message_from(detail: &Value) -> Option<String> {
    match detail {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let messages: Vec<String> = items.iter().filter_map(item_message).collect();
            if messages.is_empty() {
                None
            } else {
                Some(messages.join("; "))
            }
        }
        Value::Object(map) => ["msg", "message", "detail", "error"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(message_from),
        _ => None,
    }
}

fn item_message(item: &Value) -> Option<String> {
    match item {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(_) => message_from(item),
        _ => None,
    }
}
