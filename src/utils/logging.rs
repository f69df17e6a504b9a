use serde::Serialize;

/// Logs `value` as pretty JSON, skipping serialization when DEBUG is disabled.
pub(crate) fn with_pretty_json_debug<T, F>(value: &T, log_action: F)
where
    T: Serialize,
    F: FnOnce(&str),
{
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }

    let pretty_json = serde_json::to_string_pretty(value)
        .unwrap_or_else(|error| format!("<pretty serialize failed: {error}>"));
    log_action(pretty_json.as_str());
}

/// Lossy UTF-8 view of an upstream body, cut to `max_chars` characters.
pub(crate) fn body_preview(body: &[u8], max_chars: usize) -> String {
    let raw_body = String::from_utf8_lossy(body);
    format!("{:.len$}", raw_body, len = max_chars)
}
