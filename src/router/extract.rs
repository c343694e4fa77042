//! Strip prose and code fences around a JSON payload returned by a capability.

/// Locate the JSON object inside a free-text reply.
///
/// Tries a ```` ```json ```` fence, then any fence, then the first balanced `{...}` in the
/// text. Braces inside string literals are ignored when balancing.
pub fn extract_payload(reply: &str) -> Option<&str> {
    if let Some(start) = reply.find("```json") {
        let content_start = start + "```json".len();
        if let Some(end) = reply[content_start..].find("```") {
            let inner = reply[content_start..content_start + end].trim();
            if let Some(object) = balanced_object(inner) {
                return Some(object);
            }
        }
    }

    if let Some(start) = reply.find("```") {
        let after_fence = start + 3;
        // Skip a language tag on the fence line.
        let content_start = reply[after_fence..]
            .find('\n')
            .map(|n| after_fence + n + 1)
            .unwrap_or(after_fence);
        if let Some(end) = reply[content_start..].find("```") {
            let inner = reply[content_start..content_start + end].trim();
            if let Some(object) = balanced_object(inner) {
                return Some(object);
            }
        }
    }

    balanced_object(reply)
}

fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}
