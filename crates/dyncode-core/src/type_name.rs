//! Canonical type-name normalization.
//!
//! Source code and host type descriptors spell the same primitive kinds
//! differently (`int` vs `Int32`). [`normalize`] maps a textual type name onto
//! one canonical spelling so the two can be compared as plain strings.
//!
//! Only leaf names go through the alias table. Nullable markers, array
//! suffixes and parameterized types are peeled off structurally first and the
//! pieces are normalized recursively:
//!
//! ```
//! use dyncode_core::type_name::normalize;
//!
//! assert_eq!(normalize("int"), "Int32");
//! assert_eq!(normalize("string?[]"), "String?[]");
//! assert_eq!(normalize("Dictionary<string,List<int>>"), "Dictionary<String, List<Int32>>");
//! assert_eq!(normalize("System.Guid"), "System.Guid");
//! ```

/// Keyword aliases and the canonical names they stand for.
pub const ALIASES: &[(&str, &str)] = &[
    ("bool", "Boolean"),
    ("byte", "Byte"),
    ("sbyte", "SByte"),
    ("char", "Char"),
    ("decimal", "Decimal"),
    ("double", "Double"),
    ("float", "Single"),
    ("int", "Int32"),
    ("uint", "UInt32"),
    ("long", "Int64"),
    ("ulong", "UInt64"),
    ("object", "Object"),
    ("short", "Int16"),
    ("ushort", "UInt16"),
    ("string", "String"),
];

/// Namespace that owns every canonical primitive name.
pub const PRIMITIVE_NAMESPACE: &str = "System";

/// Look up the canonical name for a keyword alias.
pub fn alias(name: &str) -> Option<&'static str> {
    ALIASES
        .iter()
        .find(|(keyword, _)| *keyword == name)
        .map(|(_, canonical)| *canonical)
}

/// Whether `name` is the canonical short name of a primitive kind.
pub fn is_primitive_name(name: &str) -> bool {
    name == "Void" || ALIASES.iter().any(|(_, canonical)| *canonical == name)
}

/// Normalize a textual type name into its canonical spelling.
///
/// Total: text no rule applies to is returned verbatim, so fully qualified and
/// user-defined names pass through untouched.
pub fn normalize(text: &str) -> String {
    if text.trim().is_empty() {
        return text.to_string();
    }

    if let Some(inner) = text.strip_suffix('?') {
        return format!("{}?", normalize(inner));
    }

    if let Some(inner) = text.strip_suffix("[]") {
        return format!("{}[]", normalize(inner));
    }

    if let Some((name, args)) = split_parameterized(text) {
        let args: Vec<String> = split_arguments(args)
            .into_iter()
            .map(|arg| normalize(arg.trim()))
            .collect();
        return format!("{}<{}>", normalize(name), args.join(", "));
    }

    match alias(text) {
        Some(canonical) => canonical.to_string(),
        None => text.to_string(),
    }
}

/// Split `Name<args>` into `("Name", "args")`.
///
/// The `<` must not be the first character and the text must end with `>`.
fn split_parameterized(text: &str) -> Option<(&str, &str)> {
    let open = text.find('<')?;
    if open == 0 || !text.ends_with('>') {
        return None;
    }
    Some((&text[..open], &text[open + 1..text.len() - 1]))
}

/// Split a type-argument list on commas that are not nested inside `<...>`.
fn split_arguments(args: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, ch) in args.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&args[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&args[start..]);
    parts
}
