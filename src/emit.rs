//! Small helpers for building C++ source text.

use std::fmt::Display;

/// Indentation prefix for the given nesting level
pub fn indent(unit: &str, level: usize) -> String {
    unit.repeat(level)
}

/// `{a, b, c}` initializer list
pub fn brace_list<T: Display>(items: &[T]) -> String {
    let joined = items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("{{{}}}", joined)
}

/// `{"a", "b"}` initializer list of string literals
pub fn quoted_list<T: AsRef<str>>(items: &[T]) -> String {
    let quoted: Vec<String> = items
        .iter()
        .map(|item| format!("\"{}\"", item.as_ref()))
        .collect();
    brace_list(&quoted)
}

/// Single line comment at the given indentation
pub fn comment(prefix: &str, text: &str) -> String {
    format!("{}// {}\n", prefix, text)
}
