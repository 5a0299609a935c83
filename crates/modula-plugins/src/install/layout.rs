use crate::paths::{is_native_library, PACKAGE_ENTRY_FILE};
use crate::types::Layout;
use std::path::Path;

/// True if any character falls in the CJK Unified Ideographs block.
pub fn contains_cjk(name: &str) -> bool {
    name.chars().any(|c| ('\u{4e00}'..='\u{9fff}').contains(&c))
}

/// Pick the first matching layout, checking A, then B, then C.
pub fn detect_layout(names: &[String]) -> Option<Layout> {
    if names
        .iter()
        .any(|n| !n.ends_with('/') && is_native_library(Path::new(n)))
    {
        return Some(Layout::Flat);
    }
    if names.iter().any(|n| n == PACKAGE_ENTRY_FILE) {
        return Some(Layout::Package);
    }
    if names
        .first()
        .is_some_and(|n| n.contains('/') || n.contains('\\'))
    {
        return Some(Layout::Folder);
    }
    None
}
