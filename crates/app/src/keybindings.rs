/// Single-key shortcuts typed at the prompt, expanded before parsing.
pub fn keybindings() -> Vec<(&'static str, &'static str)> {
    vec![
        ("esc", "stop-all"),
        ("x", "stop-all"),
        ("q", "quit"),
        ("s", "save"),
        ("?", "help"),
        ("l", "ls"),
        ("n", "tab new"),
    ]
}

/// Replace a leading shortcut with the command it stands for.
pub fn expand(line: &str) -> String {
    let trimmed = line.trim();
    let (head, rest) = trimmed
        .split_once(char::is_whitespace)
        .unwrap_or((trimmed, ""));

    match keybindings().into_iter().find(|(key, _)| *key == head) {
        Some((_, command)) if rest.is_empty() => command.to_string(),
        Some((_, command)) => format!("{command} {rest}"),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_is_panic() {
        assert_eq!(expand("esc"), "stop-all");
        assert_eq!(expand("  x "), "stop-all");
    }

    #[test]
    fn test_shortcut_keeps_arguments() {
        assert_eq!(expand("n Crowd noises"), "tab new Crowd noises");
    }

    #[test]
    fn test_unknown_words_pass_through() {
        assert_eq!(expand("play 3"), "play 3");
        assert_eq!(expand("quit"), "quit");
    }
}
