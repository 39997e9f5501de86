//! Message templates with `%s` placeholders.
//!
//! Templates are operator-editable, so a template may carry fewer
//! placeholders than the event has parameters. Missing placeholders are
//! appended so every parameter still appears in the message.

/// Piece of a template between placeholders.
enum Token<'a> {
    Text(&'a str),
    Percent,
    Placeholder,
}

fn tokens(template: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' && i + 1 < bytes.len() && matches!(bytes[i + 1], b's' | b'%') {
            if start < i {
                out.push(Token::Text(&template[start..i]));
            }
            out.push(if bytes[i + 1] == b's' {
                Token::Placeholder
            } else {
                Token::Percent
            });
            i += 2;
            start = i;
        } else {
            i += 1;
        }
    }
    if start < template.len() {
        out.push(Token::Text(&template[start..]));
    }

    out
}

/// Number of `%s` placeholders, not counting `%%` escapes.
pub fn placeholder_count(template: &str) -> usize {
    tokens(template)
        .iter()
        .filter(|t| matches!(t, Token::Placeholder))
        .count()
}

/// Append one ` %s` per parameter that has no placeholder.
pub fn pad_placeholders(template: &str, params: usize) -> String {
    let missing = params.saturating_sub(placeholder_count(template));
    let mut padded = template.to_string();
    for _ in 0..missing {
        padded.push_str(" %s");
    }
    padded
}

/// Render a template with its parameters.
///
/// Placeholders are filled left to right and `%%` becomes `%`. Without
/// parameters the template is returned untouched.
pub fn render(template: &str, params: &[String]) -> String {
    if params.is_empty() {
        return template.to_string();
    }

    let padded = pad_placeholders(template, params.len());
    let mut values = params.iter();
    let mut message = String::with_capacity(padded.len());

    for token in tokens(&padded) {
        match token {
            Token::Text(text) => message.push_str(text),
            Token::Percent => message.push('%'),
            Token::Placeholder => match values.next() {
                Some(value) => message.push_str(value),
                None => message.push_str("%s"),
            },
        }
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_exact_placeholders() {
        assert_eq!(
            render("%s has leveled up to %s!", &params(&["Alice", "12"])),
            "Alice has leveled up to 12!"
        );
    }

    #[test]
    fn test_one_placeholder_two_params_appends_one() {
        let template = "Server up at %s";
        assert_eq!(pad_placeholders(template, 2), "Server up at %s %s");

        let message = render(template, &params(&["1.2.3.4:8211", "User password: x"]));
        assert_eq!(message, "Server up at 1.2.3.4:8211 User password: x");
    }

    #[test]
    fn test_no_placeholders() {
        assert_eq!(
            render(":green_square: Palworld has started", &params(&["1.2.3.4:8211"])),
            ":green_square: Palworld has started 1.2.3.4:8211"
        );
    }

    #[test]
    fn test_escaped_percent() {
        assert_eq!(placeholder_count("100%% of %s"), 1);
        assert_eq!(render("100%% of %s", &params(&["players"])), "100% of players");
        assert_eq!(placeholder_count("%%s"), 0);
    }

    #[test]
    fn test_without_params_is_verbatim() {
        assert_eq!(render("%s has joined!", &[]), "%s has joined!");
    }

    #[test]
    fn test_extra_placeholders_stay() {
        assert_eq!(render("%s and %s", &params(&["a"])), "a and %s");
    }

    #[test]
    fn test_multibyte_text() {
        assert_eq!(render("✅ %s ✅", &params(&["ok"])), "✅ ok ✅");
    }
}
