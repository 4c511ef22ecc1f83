//! Text cleanup before synthesis

use std::sync::LazyLock;

use regex::Regex;

/// Markdown emphasis and inline code; the inner text is kept
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\*\*(.+?)\*\*|__(.+?)__|~~(.+?)~~|\*(.+?)\*|\b_(.+?)_\b|`([^`]+)`")
        .expect("valid regex")
});

static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        "[",
        "\u{1F300}-\u{1F5FF}",
        "\u{1F600}-\u{1F64F}",
        "\u{1F680}-\u{1F6FF}",
        "\u{1F700}-\u{1F77F}",
        "\u{1F900}-\u{1F9FF}",
        "\u{1FA70}-\u{1FAFF}",
        "\u{2600}-\u{26FF}",
        "\u{2700}-\u{27BF}",
        "\u{1F1E6}-\u{1F1FF}",
        "\u{FE0F}\u{200D}",
        "]"
    ))
    .expect("valid regex")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Make model output fit for reading aloud
///
/// Strips markdown emphasis markers and emoji and collapses whitespace.
#[must_use]
pub fn clean_for_speech(text: &str) -> String {
    let text = EMPHASIS.replace_all(text, |caps: &regex::Captures<'_>| {
        caps.iter()
            .skip(1)
            .flatten()
            .next()
            .map_or_else(String::new, |m| m.as_str().to_string())
    });
    let text = EMOJI.replace_all(&text, "");
    let text = text.replace(['*', '`'], "");
    WHITESPACE.replace_all(&text, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markdown() {
        assert_eq!(clean_for_speech("**Hola** *mundo*"), "Hola mundo");
        assert_eq!(clean_for_speech("usa `cargo` y __ya__ ~~no~~"), "usa cargo y ya no");
    }

    #[test]
    fn test_keeps_identifiers() {
        assert_eq!(clean_for_speech("la variable mi_valor_total"), "la variable mi_valor_total");
    }

    #[test]
    fn test_strips_emoji_and_whitespace() {
        assert_eq!(clean_for_speech("¡Listo! 🎉🚀\n\n  Adiós 👋"), "¡Listo! Adiós");
    }

    #[test]
    fn test_empty_after_cleanup() {
        assert_eq!(clean_for_speech("  ** 😀 \n"), "");
    }
}
