//! Shallow dependency extraction.
//!
//! This is a pattern match, not a manifest parser: it finds the first
//! bracketed list bound to a known key and takes every quoted string inside
//! it as one specifier. Computed lists, conditional expressions and list
//! entries containing `]` are not understood. Callers and tests depend on
//! exactly this behaviour, so changes bump [`EXTRACTOR_VERSION`].

use std::path::Path;

use regex::Regex;

use crate::core::descriptor::BuildDialect;
use crate::inspect::{LEGACY_SCRIPT, MODERN_MANIFEST};

/// Behaviour revision of the extractor.
pub const EXTRACTOR_VERSION: u32 = 1;

const MODERN_LIST_PATTERN: &str = r#"(?s)dependencies\s*=\s*\[(.*?)\]"#;
const LEGACY_LIST_PATTERN: &str = r#"(?s)install_requires\s*=\s*\[(.*?)\]"#;
const QUOTED_PATTERN: &str = r#"["']([^"']+)["']"#;

/// Best-effort dependency specifiers declared by the tree at `source_dir`.
///
/// Never fails: unreadable files and missing lists give an empty list.
pub fn extract_dependencies(source_dir: &Path, dialect: BuildDialect) -> Vec<String> {
    let (file, pattern) = match dialect {
        BuildDialect::ModernProject => (MODERN_MANIFEST, MODERN_LIST_PATTERN),
        BuildDialect::LegacySetupScript => (LEGACY_SCRIPT, LEGACY_LIST_PATTERN),
        BuildDialect::Unknown => return Vec::new(),
    };

    let path = source_dir.join(file);
    match std::fs::read_to_string(&path) {
        Ok(content) => {
            let deps = dependencies_in(&content, pattern);
            tracing::debug!(
                "Found {} dependencies in {} (extractor v{})",
                deps.len(),
                file,
                EXTRACTOR_VERSION
            );
            deps
        }
        Err(e) => {
            tracing::warn!("Error reading {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

fn dependencies_in(content: &str, list_pattern: &str) -> Vec<String> {
    let (Ok(list_re), Ok(quoted_re)) = (Regex::new(list_pattern), Regex::new(QUOTED_PATTERN)) else {
        return Vec::new();
    };

    let Some(list) = list_re.captures(content).and_then(|c| c.get(1)) else {
        return Vec::new();
    };

    quoted_re
        .captures_iter(list.as_str())
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|d| !d.is_empty())
        .collect()
}
