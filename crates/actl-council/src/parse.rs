//! Lenient extraction of a JSON object from a model's raw text response.
//!
//! Models routinely wrap their JSON in a fenced code block or prose; this
//! strips both before handing the remainder to `serde_json`.

/// Extracts the first balanced `{...}` span from `raw`, stripping a
/// surrounding Markdown code fence if present, and parses it as `T`.
pub fn parse_lenient_json<T: serde::de::DeserializeOwned>(raw: &str) -> Option<T> {
    let unfenced = strip_code_fence(raw);
    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&unfenced[start..=end]).ok()
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start_matches(['\r', '\n']);
    rest.rfind("```").map_or(rest, |end| &rest[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        value: u32,
    }

    #[test]
    fn parses_bare_json() {
        let parsed: Probe = parse_lenient_json(r#"{"value": 7}"#).unwrap();
        assert_eq!(parsed.value, 7);
    }

    #[test]
    fn strips_fenced_code_block() {
        let raw = "```json\n{\"value\": 9}\n```";
        let parsed: Probe = parse_lenient_json(raw).unwrap();
        assert_eq!(parsed.value, 9);
    }

    #[test]
    fn tolerates_surrounding_prose() {
        let raw = "Sure, here's my answer:\n{\"value\": 3}\nHope that helps.";
        let parsed: Probe = parse_lenient_json(raw).unwrap();
        assert_eq!(parsed.value, 3);
    }

    #[test]
    fn returns_none_for_garbage() {
        let parsed: Option<Probe> = parse_lenient_json("not json at all");
        assert!(parsed.is_none());
    }
}
