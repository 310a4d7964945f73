//! Partial-Output Extractor
//!
//! Finds complete array elements inside a JSON document that is still being
//! streamed. The buffer never has to be valid JSON as a whole: the scanner
//! tracks brace depth from the target array's opening bracket, treats string
//! contents as opaque, and parses each balanced `{...}` on its own. Objects
//! that do not parse yet are simply not returned; they will be seen again on
//! the next call with a longer buffer.

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Extracts completed elements of one array field from a growing buffer.
#[derive(Debug, Clone)]
pub struct PartialArrayExtractor {
    field: String,
    required: Vec<String>,
}

impl PartialArrayExtractor {
    /// Extractor for `field`, requiring `name` and `description`.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            required: vec!["name".to_string(), "description".to_string()],
        }
    }

    /// Replace the set of fields that must be present and non-null.
    pub fn require(mut self, fields: &[&str]) -> Self {
        self.required = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Return accepted elements with index `>= already_emitted`.
    pub fn extract(&self, buffer: &str, already_emitted: usize) -> Vec<Value> {
        let Some(open) = self.find_array_start(buffer) else {
            return Vec::new();
        };

        let bytes = buffer.as_bytes();
        let mut depth = 0usize;
        let mut in_string = false;
        let mut escaped = false;
        let mut object_start: Option<usize> = None;
        let mut accepted = 0usize;
        let mut out = Vec::new();

        for i in (open + 1)..bytes.len() {
            let b = bytes[i];
            if in_string {
                if escaped {
                    escaped = false;
                } else if b == b'\\' {
                    escaped = true;
                } else if b == b'"' {
                    in_string = false;
                }
                continue;
            }

            match b {
                b'"' => in_string = true,
                b'{' => {
                    if depth == 0 {
                        object_start = Some(i);
                    }
                    depth += 1;
                }
                b'}' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        let Some(start) = object_start.take() else {
                            continue;
                        };
                        match serde_json::from_str::<Value>(&buffer[start..=i]) {
                            Ok(value) if self.accepts(&value) => {
                                if accepted >= already_emitted {
                                    out.push(value);
                                }
                                accepted += 1;
                            }
                            Ok(_) => {
                                tracing::trace!(
                                    "[Extractor] Dropping '{}' element without required fields",
                                    self.field
                                );
                            }
                            Err(e) => {
                                tracing::trace!("[Extractor] Candidate not parseable yet: {}", e);
                            }
                        }
                    }
                }
                b']' if depth == 0 => break,
                _ => {}
            }
        }

        out
    }

    /// Typed variant of [`extract`](Self::extract). Elements that do not
    /// deserialize into `T` are dropped.
    pub fn extract_as<T: DeserializeOwned>(&self, buffer: &str, already_emitted: usize) -> Vec<T> {
        self.extract(buffer, already_emitted)
            .into_iter()
            .filter_map(|value| match serde_json::from_value(value) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::debug!("[Extractor] Element did not match target type: {}", e);
                    None
                }
            })
            .collect()
    }

    fn accepts(&self, value: &Value) -> bool {
        let Some(object) = value.as_object() else {
            return false;
        };
        self.required
            .iter()
            .all(|field| object.get(field).is_some_and(|v| !v.is_null()))
    }

    /// Byte offset of the `[` that opens the target array.
    fn find_array_start(&self, buffer: &str) -> Option<usize> {
        let key = format!("\"{}\"", self.field);
        let mut search_from = 0;
        while let Some(pos) = buffer[search_from..].find(&key) {
            let after_key = search_from + pos + key.len();
            let rest = &buffer[after_key..];
            let trimmed = rest.trim_start();
            if let Some(after_colon) = trimmed.strip_prefix(':') {
                let value = after_colon.trim_start();
                if value.starts_with('[') {
                    return Some(buffer.len() - value.len());
                }
            }
            search_from = after_key;
        }
        None
    }
}

/// Stateful wrapper that threads the emitted count between calls.
#[derive(Debug, Clone)]
pub struct IncrementalExtractor {
    extractor: PartialArrayExtractor,
    emitted: usize,
}

impl IncrementalExtractor {
    pub fn new(extractor: PartialArrayExtractor) -> Self {
        Self {
            extractor,
            emitted: 0,
        }
    }

    /// Elements completed since the previous call.
    pub fn poll(&mut self, buffer: &str) -> Vec<Value> {
        let fresh = self.extractor.extract(buffer, self.emitted);
        self.emitted += fresh.len();
        fresh
    }

    /// Typed variant of [`poll`](Self::poll).
    ///
    /// The count advances by accepted elements even when some fail to
    /// deserialize, so a bad element is never retried.
    pub fn poll_as<T: DeserializeOwned>(&mut self, buffer: &str) -> Vec<T> {
        self.poll(buffer)
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect()
    }

    /// How many elements have been handed out.
    pub fn emitted(&self) -> usize {
        self.emitted
    }
}

/// Slice out the outermost JSON object from model output that may be
/// wrapped in prose or code fences.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_second_object_then_completion() {
        let extractor = PartialArrayExtractor::new("items");
        let partial = r#"{"items":[{"name":"A","description":"d1"},{"name":"B","desc"#;
        let first = extractor.extract(partial, 0);
        assert_eq!(first.len(), 1);
        assert_eq!(first[0]["name"], "A");

        let full = r#"{"items":[{"name":"A","description":"d1"},{"name":"B","description":"d2"}]}"#;
        let second = extractor.extract(full, 1);
        assert_eq!(second.len(), 1);
        assert_eq!(second[0]["name"], "B");
    }

    #[test]
    fn test_braces_inside_strings_are_opaque() {
        let extractor = PartialArrayExtractor::new("items");
        let buffer = r#"{"items":[{"name":"curly } brace","description":"say \"{hi}\""},"#;
        let items = extractor.extract(buffer, 0);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "curly } brace");
        assert_eq!(items[0]["description"], "say \"{hi}\"");
    }

    #[test]
    fn test_nested_objects_count_once() {
        let extractor = PartialArrayExtractor::new("items");
        let buffer = r#"{"items":[{"name":"A","description":"d","meta":{"k":[1,2]}}]}"#;
        let items = extractor.extract(buffer, 0);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["meta"]["k"][1], 2);
    }

    #[test]
    fn test_missing_required_fields_rejected() {
        let extractor = PartialArrayExtractor::new("items");
        let buffer = r#"{"items":[{"name":"A"},{"name":"B","description":null},{"name":"C","description":"c"}]}"#;
        let items = extractor.extract(buffer, 0);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "C");
    }

    #[test]
    fn test_stops_at_array_end() {
        let extractor = PartialArrayExtractor::new("items");
        let buffer = r#"{"items":[{"name":"A","description":"a"}],"other":[{"name":"X","description":"x"}]}"#;
        let items = extractor.extract(buffer, 0);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_no_array_yet() {
        let extractor = PartialArrayExtractor::new("requirements");
        assert!(extractor.extract(r#"{"visaType":"Schengen","requ"#, 0).is_empty());
        assert!(extractor.extract("", 0).is_empty());
    }

    #[test]
    fn test_key_mentioned_in_prose_is_skipped() {
        let extractor = PartialArrayExtractor::new("items");
        let buffer = r#"{"note":"see \"items\" below","items" : [ {"name":"A","description":"a"} ]}"#;
        let items = extractor.extract(buffer, 0);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_custom_required_fields() {
        let extractor = PartialArrayExtractor::new("compliance").require(&["requirement", "status"]);
        let buffer = r#"{"compliance":[{"requirement":"Passport","status":"met"},{"requirement":"Visa photo"}"#;
        let items = extractor.extract(buffer, 0);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["status"], "met");
    }

    #[test]
    fn test_incremental_growth_never_duplicates() {
        let full = r#"{"items":[{"name":"A","description":"1"},{"name":"B","description":"2"},{"name":"C","description":"3"}]}"#;
        let mut extractor = IncrementalExtractor::new(PartialArrayExtractor::new("items"));
        let mut names = Vec::new();
        for end in 1..=full.len() {
            for item in extractor.poll(&full[..end]) {
                names.push(item["name"].as_str().unwrap().to_string());
            }
        }
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(extractor.emitted(), 3);
    }

    #[test]
    fn test_extract_json_object_strips_fences() {
        let text = "Here you go:\n```json\n{\"a\":{\"b\":1}}\n```\n";
        assert_eq!(extract_json_object(text), Some("{\"a\":{\"b\":1}}"));
        assert_eq!(extract_json_object("no json"), None);
    }
}
