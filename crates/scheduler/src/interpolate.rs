//! Completion-message placeholder interpolation (§4.6): `{result}`,
//! `{result.field}`, `{result.nested.field}`, `{job_id}`, `{workflow_id}`.

use agentcore_identifiers::ScheduledJobId;
use uuid::Uuid;

/// Replaces every `{...}` placeholder found in `template`. Unresolvable
/// placeholders (unknown path, missing field) are left as literal text
/// rather than causing the message to fail outright.
#[must_use]
pub fn interpolate(
    template: &str,
    result: Option<&serde_json::Value>,
    job_id: ScheduledJobId,
    workflow_id: Option<Uuid>,
) -> String {
    let mut out = String::with_capacity(template.len());
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'{' {
            if let Some(end) = template[i..].find('}') {
                let placeholder = &template[i + 1..i + end];
                out.push_str(&resolve(placeholder, result, job_id, workflow_id));
                i += end + 1;
                continue;
            }
        }
        let ch = template[i..].chars().next().unwrap_or('\u{FFFD}');
        out.push(ch);
        i += ch.len_utf8();
    }
    out
}

fn resolve(
    placeholder: &str,
    result: Option<&serde_json::Value>,
    job_id: ScheduledJobId,
    workflow_id: Option<Uuid>,
) -> String {
    match placeholder {
        "job_id" => return job_id.to_string(),
        "workflow_id" => return workflow_id.map_or_else(String::new, |w| w.to_string()),
        "result" => return result.map_or_else(String::new, value_to_display),
        _ => {}
    }

    if let Some(path) = placeholder.strip_prefix("result.") {
        let Some(result) = result else {
            return format!("{{{placeholder}}}");
        };
        return match resolve_path(result, path) {
            Some(value) => value_to_display(value),
            None => format!("{{{placeholder}}}"),
        };
    }

    format!("{{{placeholder}}}")
}

/// Traverses a dotted field path (`"data.status"`) through nested JSON
/// objects, e.g. for `poll_url`'s `response_field` (§4.6).
#[must_use]
pub fn resolve_path<'a>(value: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.get(segment)?;
    }
    Some(current)
}

fn value_to_display(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_nested_result_field() {
        let result = serde_json::json!({"status": {"state": "completed"}});
        let out = interpolate("job is {result.status.state}", Some(&result), ScheduledJobId::generate(), None);
        assert_eq!(out, "job is completed");
    }

    #[test]
    fn interpolates_job_id_and_workflow_id() {
        let job_id = ScheduledJobId::generate();
        let workflow_id = Uuid::new_v4();
        let out = interpolate("{job_id}/{workflow_id}", None, job_id, Some(workflow_id));
        assert_eq!(out, format!("{job_id}/{workflow_id}"));
    }

    #[test]
    fn unresolvable_placeholder_left_literal() {
        let out = interpolate("{result.missing}", Some(&serde_json::json!({})), ScheduledJobId::generate(), None);
        assert_eq!(out, "{result.missing}");
    }

    #[test]
    fn bare_result_uses_whole_value() {
        let result = serde_json::json!("done");
        let out = interpolate("result was {result}", Some(&result), ScheduledJobId::generate(), None);
        assert_eq!(out, "result was done");
    }
}
