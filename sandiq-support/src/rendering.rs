//! Text rendering utilities for human-friendly error messages.
//!
//! Keys in the container are either Rust type paths
//! (`my_app::db::Connection`) or free-form service names (`"db"`).
//! The helpers here keep diagnostics readable for both.

/// Renders a resolution chain as a readable string.
///
/// # Examples
/// ```
/// use sandiq_support::rendering::render_chain;
///
/// let chain = vec!["app::Mailer", "app::Transport", "app::Mailer"];
/// assert_eq!(render_chain(&chain), "Mailer → Transport → Mailer");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|key| shorten_type_name(key.as_ref()))
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Renders one parameter of a definition for diagnostics.
///
/// ```
/// use sandiq_support::rendering::render_parameter;
///
/// assert_eq!(
///     render_parameter(1, "logger", "app::log::Logger"),
///     "#1 $logger: Logger"
/// );
/// ```
pub fn render_parameter(position: usize, name: &str, type_name: &str) -> String {
    format!("#{position} ${name}: {}", shorten_type_name(type_name))
}

/// Shortens a fully qualified type name for display.
///
/// Service names without a path are returned unchanged.
///
/// ```
/// use sandiq_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("my_app::services::Mailer"), "Mailer");
/// assert_eq!(shorten_type_name("alloc::sync::Arc<dyn my_app::Logger>"), "Arc<dyn Logger>");
/// assert_eq!(shorten_type_name("db"), "db");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '&' | '[' | ']' | ';' => {
                result.push_str(&segment);
                result.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    result.push_str(&segment);
    result
}

/// Suggests registered keys that look like `requested`.
///
/// Scores substring matches on the full path first, then on the short
/// name, then on a shared prefix of at least three characters. At most
/// `max_suggestions` names are returned, best first.
pub fn suggest_similar(
    requested: &str,
    available: &[&str],
    max_suggestions: usize,
) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    let requested_short = shorten_type_name(requested).to_lowercase();

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter(|&&name| name != requested)
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            let name_short = shorten_type_name(name).to_lowercase();

            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name, 100));
            }

            if name_short.contains(&requested_short) || requested_short.contains(&name_short) {
                return Some((name, 80));
            }

            let common = name_short
                .chars()
                .zip(requested_short.chars())
                .take_while(|(a, b)| a == b)
                .count();

            (common >= 3).then_some((name, common * 10))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_cycle_chain() {
        let chain = vec!["a::A", "b::B", "a::A"];
        assert_eq!(render_chain(&chain), "A → B → A");
    }

    #[test]
    fn render_service_name_chain() {
        assert_eq!(render_chain(&["db", "session"]), "db → session");
    }

    #[test]
    fn render_empty_chain() {
        let chain: Vec<&str> = vec![];
        assert_eq!(render_chain(&chain), "");
    }

    #[test]
    fn shorten_nested_generics() {
        assert_eq!(
            shorten_type_name("core::option::Option<alloc::sync::Arc<app::Pdo>>"),
            "Option<Arc<Pdo>>"
        );
    }

    #[test]
    fn shorten_reference_and_slice() {
        assert_eq!(shorten_type_name("&[app::Row]"), "&[Row]");
    }

    #[test]
    fn parameter_rendering() {
        assert_eq!(render_parameter(0, "path", "alloc::string::String"), "#0 $path: String");
    }

    #[test]
    fn suggest_typo() {
        let available = vec![
            "app::UserService",
            "app::UserRepository",
            "app::Logger",
            "db",
        ];

        let suggestions = suggest_similar("app::UserServise", &available, 3);
        assert!(!suggestions.is_empty());
        assert_eq!(suggestions[0], "app::UserService");
    }

    #[test]
    fn suggest_skips_exact_key() {
        let suggestions = suggest_similar("db", &["db", "dbal"], 3);
        assert_eq!(suggestions, vec!["dbal".to_string()]);
    }

    #[test]
    fn suggest_no_match() {
        let suggestions = suggest_similar("XyzAbcDef", &["app::Database"], 3);
        assert!(suggestions.is_empty());
    }
}
