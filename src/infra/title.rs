//! Token substitution for page titles.

use crate::application::error::CollaboratorError;
use crate::application::ports::TitleRenderer;
use crate::domain::page::TokenData;

use super::blocks::scalar;

/// Replaces `[type:field]` tokens with values from the token data.
///
/// Tokens whose type or field is unknown are left as written.
#[derive(Debug, Default)]
pub struct TokenTitleRenderer;

impl TitleRenderer for TokenTitleRenderer {
    fn render_title(&self, template: &str, data: &TokenData) -> Result<String, CollaboratorError> {
        let mut output = String::with_capacity(template.len());
        let mut rest = template;

        // A token closes at the first `]` and opens at the nearest `[` before it.
        while let Some(end) = rest.find(']') {
            let Some(start) = rest[..end].rfind('[') else {
                output.push_str(&rest[..=end]);
                rest = &rest[end + 1..];
                continue;
            };
            output.push_str(&rest[..start]);
            match lookup(&rest[start + 1..end], data) {
                Some(value) => output.push_str(&value),
                None => output.push_str(&rest[start..=end]),
            }
            rest = &rest[end + 1..];
        }

        output.push_str(rest);
        Ok(output)
    }
}

fn lookup(token: &str, data: &TokenData) -> Option<String> {
    let (token_type, field) = token.split_once(':')?;
    if token_type.is_empty() || token_type.contains(char::is_whitespace) {
        return None;
    }
    let value = data.get(token_type)?.get(field)?;
    Some(scalar(value))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn data() -> TokenData {
        TokenData::from([
            ("node".to_string(), json!({"title": "Composing pages", "nid": 42})),
            ("user".to_string(), json!({"name": "ada"})),
        ])
    }

    #[test]
    fn replaces_known_tokens() {
        let title = TokenTitleRenderer
            .render_title("[node:title] (#[node:nid]) by [user:name]", &data())
            .expect("title");
        assert_eq!(title, "Composing pages (#42) by ada");
    }

    #[test]
    fn leaves_unknown_tokens_and_stray_brackets() {
        let title = TokenTitleRenderer
            .render_title("[term:name] [notatoken] [node:title", &data())
            .expect("title");
        assert_eq!(title, "[term:name] [notatoken] [node:title");
    }

    #[test]
    fn stray_bracket_before_a_token_is_kept_literally() {
        let title = TokenTitleRenderer
            .render_title("[draft [node:title]", &data())
            .expect("title");
        assert_eq!(title, "[draft Composing pages");

        let title = TokenTitleRenderer
            .render_title("a] [node:title] ]b", &data())
            .expect("title");
        assert_eq!(title, "a] Composing pages ]b");
    }

    #[test]
    fn token_types_cannot_contain_whitespace() {
        let data = TokenData::from([("my node".to_string(), json!({"title": "x"}))]);
        let title = TokenTitleRenderer
            .render_title("[my node:title]", &data)
            .expect("title");
        assert_eq!(title, "[my node:title]");
    }

    #[test]
    fn empty_template_renders_empty_title() {
        assert_eq!(
            TokenTitleRenderer
                .render_title("", &TokenData::new())
                .expect("title"),
            ""
        );
    }
}
