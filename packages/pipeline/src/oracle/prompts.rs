//! Fixed instruction contract for project extraction.

use crate::types::{DocumentContent, RawDocument};

/// System instructions sent with every extraction request.
pub const EXTRACTION_INSTRUCTIONS: &str = "You are a data extraction specialist focused on identifying data center projects from government documents. Extract structured information about data centers mentioned in the provided document. Only extract information that is explicitly stated in the document. Never infer or guess values that are not written in the text.";

/// Per-document prompt.
pub const EXTRACT_PROMPT: &str = r#"Please analyze the following {category} document and extract information about any data center project mentioned.

Document URL: {url}
Document Type: {category}
{title_line}
Content:
{content}

Extract the following information if available:
- Project name
- Current status (planned/under_construction/operational)
- Developer/Owner company name
- Size in square feet
- Power capacity in MW
- Physical address
- Filing/Approval date (YYYY-MM-DD)
- Estimated completion date (YYYY-MM-DD)

If multiple data centers are mentioned, focus on the primary one discussed.
If no data center project is found, respond with null inside the JSON block.
Omit any field the document does not state.

Format your response as JSON wrapped in ```json ... ``` tags.

Example response:
```json
{
  "name": "Example Data Center",
  "status": "planned",
  "developer": "Tech Corp",
  "sizeSqft": 100000,
  "powerMw": 50,
  "address": "123 Tech Drive, City, State",
  "filingDate": "2024-01-15",
  "estimatedCompletionDate": "2025-06-01"
}
```"#;

/// Bounded excerpt of a document's body.
///
/// Page text is cut at `max_chars` characters; binary bodies become a
/// placeholder naming their type and size.
pub fn excerpt(doc: &RawDocument, max_chars: usize) -> String {
    match &doc.content {
        DocumentContent::Text(text) => match text.char_indices().nth(max_chars) {
            Some((cut, _)) => text[..cut].to_string(),
            None => text.clone(),
        },
        DocumentContent::Binary(bytes) => format!(
            "[Binary document ({}), {} bytes - content not decoded]",
            doc.content_type(),
            bytes.len()
        ),
    }
}

/// Format the extraction prompt for one document.
pub fn format_extract_prompt(doc: &RawDocument, excerpt: &str) -> String {
    let title_line = doc
        .title()
        .map(|t| format!("Title: {}\n", t))
        .unwrap_or_default();

    fill(
        EXTRACT_PROMPT,
        &[
            ("category", doc.category.as_str()),
            ("url", doc.url.as_str()),
            ("title_line", title_line.as_str()),
            ("content", excerpt),
        ],
    )
}

/// Substitute `{key}` placeholders in one pass. Inserted values are never
/// rescanned, and unknown braces are copied through.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 1..];
        let placeholder = values
            .iter()
            .find(|(key, _)| tail.starts_with(key) && tail[key.len()..].starts_with('}'));

        match placeholder {
            Some((key, value)) => {
                out.push_str(value);
                rest = &tail[key.len() + 1..];
            }
            None => {
                out.push('{');
                rest = tail;
            }
        }
    }

    out.push_str(rest);
    out
}
