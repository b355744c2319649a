//! Name handling for ids, attachment labels, temp files and tags.

use crate::{ReattachError, Result};

/// Characters that are never allowed in an attachment name.
const FORBIDDEN_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|', '\0'];

/// Windows reserved device names.
const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Maximum allowed length for attachment names, in characters.
const MAX_NAME_LENGTH: usize = 255;

/// Longest suffix still treated as an extension when truncating.
const MAX_EXTENSION_LENGTH: usize = 16;

/// Validates an item or vault id before it is passed to the CLI.
///
/// Ids are positional arguments, so anything that could be read as a flag
/// or that contains whitespace or control characters is rejected.
///
/// # Example
///
/// ```
/// use docreattach::validation::validate_item_id;
///
/// assert!(validate_item_id("j4hn2d3kq7v5nqbfnxb6x2cl4a").is_ok());
/// assert!(validate_item_id("").is_err());
/// assert!(validate_item_id("--archive").is_err());
/// ```
pub fn validate_item_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(ReattachError::InvalidName("id cannot be empty".to_string()));
    }

    if id.starts_with('-') {
        return Err(ReattachError::InvalidName(format!(
            "id looks like a flag: {}",
            id
        )));
    }

    if id.chars().any(|c| c.is_control() || c.is_whitespace()) {
        return Err(ReattachError::InvalidName(format!(
            "id contains whitespace or control characters: {:?}",
            id
        )));
    }

    Ok(())
}

/// Returns a filesystem-safe version of an attachment name.
///
/// Non-ASCII characters are kept. Characters Windows refuses in file names
/// and control characters are removed, trailing dots and spaces trimmed,
/// reserved device names prefixed with `__`, and names longer than 255
/// characters truncated while keeping their extension.
///
/// ```
/// use docreattach::validation::sanitize_attachment_name;
///
/// assert_eq!(sanitize_attachment_name("tax: 2019/2020.pdf"), "tax 20192020.pdf");
/// assert_eq!(sanitize_attachment_name("CON"), "__CON");
/// assert_eq!(sanitize_attachment_name("..."), "__");
/// ```
pub fn sanitize_attachment_name(name: &str) -> String {
    let filtered: String = name
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c) && (*c as u32) > 31)
        .collect();

    let mut out = trim_name(&filtered);

    if RESERVED_NAMES.contains(&out.as_str()) {
        out = format!("__{}", out);
    }

    if out.is_empty() {
        return "__".to_string();
    }

    if out.chars().count() > MAX_NAME_LENGTH {
        out = truncate_keeping_extension(&out);
    }

    if out.is_empty() {
        "__".to_string()
    } else {
        out
    }
}

fn trim_name(name: &str) -> String {
    name.trim_end_matches(['.', ' ']).trim().to_string()
}

fn truncate_keeping_extension(name: &str) -> String {
    let (stem, ext) = match name.rfind('.') {
        Some(i) if i > 0 && name[i..].chars().count() <= MAX_EXTENSION_LENGTH => {
            (&name[..i], &name[i..])
        }
        _ => (name, ""),
    };

    let keep = MAX_NAME_LENGTH - ext.chars().count();
    let truncated: String = stem.chars().take(keep).collect();
    let truncated = trim_name(&truncated);
    if truncated.is_empty() {
        format!("__{}", ext)
    } else {
        format!("{}{}", truncated, ext)
    }
}

/// Escapes a field label for the `op item edit` assignment syntax.
///
/// Quotes are dropped; `\`, `.` and `=` are backslash-escaped because the
/// CLI reads them as path and value separators.
///
/// ```
/// use docreattach::validation::escape_field_label;
///
/// assert_eq!(escape_field_label("report.final.pdf"), "report\\.final\\.pdf");
/// ```
pub fn escape_field_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    for c in label.chars() {
        match c {
            '"' | '\'' => {}
            '\\' | '.' | '=' => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Reverses [`escape_field_label`] (quotes stay dropped).
pub fn unescape_field_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut chars = label.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
                continue;
            }
        }
        out.push(c);
    }
    out
}

/// Produces a file name for the temporary copy of a document.
///
/// The name is transliterated to ASCII; anything other than alphanumerics,
/// `-`, `_` and `.` becomes `_`.
pub fn temp_file_name(name: &str) -> String {
    let transliterated = deunicode::deunicode(name);
    let mapped: String = transliterated
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = mapped.trim_matches('.');
    if trimmed.is_empty() {
        "attachment".to_string()
    } else {
        trimmed.chars().take(MAX_NAME_LENGTH).collect()
    }
}

/// Removes quotes and surrounding whitespace from a tag.
pub fn clean_tag(tag: &str) -> String {
    tag.replace(['"', '\''], "").trim().to_string()
}
