//! Free-text labels of the form `#tag1 #tag2 title words`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLabel {
    pub title: String,
    pub tags: Vec<String>,
}

/// Splits a label into a title and its hash-prefixed tags.
///
/// A tag is any whitespace-delimited token starting with `#`. Tags keep their
/// first-seen order and duplicates are dropped. The remaining tokens, joined by
/// single spaces, form the title.
pub fn parse_label(input: &str) -> ParsedLabel {
    let mut tags: Vec<String> = Vec::new();
    let mut title_words = Vec::new();

    for token in input.split_whitespace() {
        if let Some(tag) = token.strip_prefix('#') {
            if !tag.is_empty() && !tags.iter().any(|existing| existing == tag) {
                tags.push(tag.to_string());
            }
        } else {
            title_words.push(token);
        }
    }

    ParsedLabel {
        title: title_words.join(" "),
        tags,
    }
}

/// Inverse of [`parse_label`], tags first.
pub fn format_label(title: &str, tags: &[String]) -> String {
    let prefix = tags
        .iter()
        .map(|tag| format!("#{tag}"))
        .collect::<Vec<_>>()
        .join(" ");
    if prefix.is_empty() {
        title.trim().to_string()
    } else {
        format!("{prefix} {}", title.trim()).trim().to_string()
    }
}

/// Comma separated tag input used by the record editor. Accepts the full-width comma too.
pub fn parse_tag_list(input: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in input.split([',', '，']).map(str::trim) {
        if !tag.is_empty() && !tags.iter().any(|existing| existing == tag) {
            tags.push(tag.to_string());
        }
    }
    tags
}
