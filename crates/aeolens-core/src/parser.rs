//! JSON-LD extraction and schema type discovery

use scraper::{Html, Selector};
use serde_json::{Map, Value as JsonValue};

use crate::error::ParseError;

const SCHEMA_ORG_PREFIXES: &[&str] = &["https://schema.org/", "http://schema.org/"];

/// Extract JSON-LD script blocks from HTML
pub fn extract_json_ld_blocks(html: &str) -> Result<Vec<String>, ParseError> {
    let document = Html::parse_document(html);
    extract_json_ld_from_document(&document)
}

/// Extract JSON-LD script blocks from an already parsed document
pub fn extract_json_ld_from_document(document: &Html) -> Result<Vec<String>, ParseError> {
    let script_selector = Selector::parse("script").map_err(|e| ParseError::Selector {
        selector: "script".to_string(),
        message: e.to_string(),
    })?;

    Ok(document
        .select(&script_selector)
        .filter_map(|element| {
            let script_type = element
                .value()
                .attr("type")
                .map(|t| t.trim().to_ascii_lowercase())
                .unwrap_or_default();

            // Use contains() to catch variations like "application/ld+json; charset=utf-8"
            if script_type.contains("ld+json") {
                let text = element.text().collect::<String>().trim().to_string();
                if text.is_empty() { None } else { Some(text) }
            } else {
                None
            }
        })
        .collect())
}

/// Parse one JSON-LD block.
pub fn parse_json_ld_block(block: &str) -> Result<JsonValue, ParseError> {
    Ok(serde_json::from_str(block)?)
}

/// The three shapes a JSON value can take during the type walk.
enum Node<'a> {
    Object(&'a Map<String, JsonValue>),
    Array(&'a [JsonValue]),
    Scalar,
}

impl<'a> From<&'a JsonValue> for Node<'a> {
    fn from(value: &'a JsonValue) -> Self {
        match value {
            JsonValue::Object(map) => Node::Object(map),
            JsonValue::Array(items) => Node::Array(items),
            _ => Node::Scalar,
        }
    }
}

/// Every `@type` occurrence in `value`, at any depth, in document order.
///
/// Walks iteratively with an explicit stack, so deeply nested input cannot
/// exhaust the call stack. Objects are descended into whether or not they
/// declare a type.
pub fn collect_schema_types(value: &JsonValue) -> Vec<String> {
    let mut found = Vec::new();
    let mut stack: Vec<&JsonValue> = vec![value];

    while let Some(current) = stack.pop() {
        match Node::from(current) {
            Node::Object(map) => {
                if let Some(declared) = map.get("@type") {
                    push_type_names(declared, &mut found);
                }
                stack.extend(map.values().rev());
            }
            Node::Array(items) => stack.extend(items.iter().rev()),
            Node::Scalar => {}
        }
    }

    found
}

fn push_type_names(declared: &JsonValue, found: &mut Vec<String>) {
    match declared {
        JsonValue::String(name) => {
            if let Some(name) = normalize_type_name(name) {
                found.push(name);
            }
        }
        JsonValue::Array(names) => {
            for name in names.iter().filter_map(JsonValue::as_str) {
                if let Some(name) = normalize_type_name(name) {
                    found.push(name);
                }
            }
        }
        _ => {}
    }
}

/// Strip a schema.org IRI down to its type name.
pub fn normalize_type_name(name: &str) -> Option<String> {
    let name = name.trim();
    let short = SCHEMA_ORG_PREFIXES
        .iter()
        .find_map(|prefix| name.strip_prefix(prefix))
        .unwrap_or(name)
        .trim_end_matches('/');

    if short.is_empty() {
        None
    } else {
        Some(short.to_string())
    }
}

/// Parse every block and collect their types, skipping malformed blocks.
pub fn schema_types_in_blocks(blocks: &[String]) -> Vec<String> {
    let mut types = Vec::new();
    for block in blocks {
        match parse_json_ld_block(block) {
            Ok(value) => types.extend(collect_schema_types(&value)),
            Err(err) => tracing::debug!(error = %err, "Skipping malformed JSON-LD block"),
        }
    }
    types
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_json_ld_empty_html() {
        let html = "<html><body>No JSON-LD here</body></html>";
        let blocks = extract_json_ld_blocks(html).unwrap();
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_extract_json_ld_with_charset() {
        let html = r#"
            <script type="application/ld+json; charset=utf-8">
            {"@type": "Product", "name": "Test"}
            </script>
        "#;

        let blocks = extract_json_ld_blocks(html).unwrap();
        assert_eq!(blocks.len(), 1);
        assert!(blocks[0].contains("Test"));
    }

    #[test]
    fn test_extract_json_ld_case_insensitive() {
        let html = r#"
            <script type="APPLICATION/LD+JSON">
            {"@type": "Product", "name": "Test"}
            </script>
            <script type="text/javascript">var x = {"@type": "Ignored"};</script>
        "#;

        let blocks = extract_json_ld_blocks(html).unwrap();
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_extract_json_ld_empty_script() {
        let html = r#"
            <script type="application/ld+json"></script>
            <script type="application/ld+json">   </script>
        "#;

        let blocks = extract_json_ld_blocks(html).unwrap();
        assert!(blocks.is_empty()); // Empty scripts should be filtered out
    }

    #[test]
    fn finds_types_at_arbitrary_depth() {
        let value = json!({
            "@context": "https://schema.org",
            "@graph": [
                {
                    "@type": "FAQPage",
                    "mainEntity": [
                        {
                            "@type": "Question",
                            "acceptedAnswer": {"@type": "Answer", "text": "Yes"}
                        }
                    ]
                },
                {
                    "name": "untyped wrapper",
                    "nested": {"deeper": [[{"@type": "HowToStep"}]]}
                }
            ]
        });

        let types = collect_schema_types(&value);
        assert_eq!(types, vec!["FAQPage", "Question", "Answer", "HowToStep"]);
    }

    #[test]
    fn registers_every_type_in_a_type_list() {
        let value = json!([
            {"@type": ["Organization", "LocalBusiness"]},
            {"@type": "https://schema.org/Recipe"},
            {"@type": 42},
            {"@type": ""}
        ]);

        let types = collect_schema_types(&value);
        assert_eq!(types, vec!["Organization", "LocalBusiness", "Recipe"]);
    }

    #[test]
    fn deep_nesting_does_not_overflow() {
        let mut value = json!({"@type": "Leaf"});
        for _ in 0..50_000 {
            value = JsonValue::Array(vec![value]);
        }

        assert_eq!(collect_schema_types(&value), vec!["Leaf"]);

        // Unwind without recursive drop.
        let mut stack = vec![value];
        while let Some(v) = stack.pop() {
            if let JsonValue::Array(items) = v {
                stack.extend(items);
            }
        }
    }

    #[test]
    fn malformed_blocks_are_skipped() {
        let blocks = vec![
            r#"{"@type": "Product""#.to_string(),
            r#"{"@type": "Organization", "name": "Valid"}"#.to_string(),
        ];

        assert_eq!(schema_types_in_blocks(&blocks), vec!["Organization"]);
        assert!(matches!(
            parse_json_ld_block(&blocks[0]),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn normalizes_schema_org_iris() {
        assert_eq!(
            normalize_type_name("http://schema.org/HowTo").as_deref(),
            Some("HowTo")
        );
        assert_eq!(normalize_type_name(" QAPage ").as_deref(), Some("QAPage"));
        assert_eq!(
            normalize_type_name("https://example.org/Custom").as_deref(),
            Some("https://example.org/Custom")
        );
        assert_eq!(normalize_type_name("https://schema.org/"), None);
    }
}
