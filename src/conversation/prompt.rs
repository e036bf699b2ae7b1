//! Prompt construction
//!
//! The completion endpoint takes a single flat string. Every prior message is
//! rendered as `<sender>: <text>`, one per line, followed by the new user
//! input as the final line.

use super::{Message, Role};

/// Build the prompt for `input` given the history that precedes it.
///
/// The separator before the final line is always emitted, so an empty
/// history yields `"\nuser: <input>"`.
pub fn build(history: &[Message], input: &str) -> String {
    let rendered = history
        .iter()
        .map(|m| format!("{}: {}", m.sender, m.text))
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}\n{}: {}", rendered, Role::User, input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_history() {
        let history = vec![
            Message::user("hola"),
            Message::ai("¡hola! ¿qué tal?"),
            Message::system("Error al procesar tu solicitud. Intenta de nuevo."),
        ];

        let prompt = build(&history, "bien");
        assert_eq!(
            prompt,
            "user: hola\nai: ¡hola! ¿qué tal?\nsystem: Error al procesar tu solicitud. Intenta de nuevo.\nuser: bien"
        );
    }

    #[test]
    fn test_empty_history_keeps_leading_separator() {
        assert_eq!(build(&[], "hola"), "\nuser: hola");
    }

    #[test]
    fn test_deterministic_and_last_line_is_input() {
        let history = vec![Message::user("a"), Message::ai("b")];

        let first = build(&history, "c");
        let second = build(&history, "c");
        assert_eq!(first, second);
        assert_eq!(first.lines().last(), Some("user: c"));
    }

    #[test]
    fn test_input_is_not_trimmed() {
        let prompt = build(&[], "  hola  ");
        assert!(prompt.ends_with("user:   hola  "));
    }
}
