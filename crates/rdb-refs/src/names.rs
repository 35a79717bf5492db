//! Branch name validation following git-style conventions.
//!
//! Branch names end up as paths under `refs/heads/` and `locks/`, so anything
//! that could escape those directories or collide with lock files is refused:
//! - empty names, whitespace and the characters `~ ^ : ? * [ \`
//! - `..` anywhere, and the reflog syntax `@{`
//! - a leading or trailing `.` or `/`, empty components, components starting with `.`
//! - a `.lock` suffix

use crate::error::{RefError, RefResult};

/// Characters that are forbidden anywhere in a branch name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

fn invalid(name: &str, reason: impl Into<String>) -> RefError {
    RefError::InvalidBranchName {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Validate a branch name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use rdb_refs::names::validate_branch_name;
///
/// assert!(validate_branch_name("main").is_ok());
/// assert!(validate_branch_name("release/1.2").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("bad..name").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> RefResult<()> {
    if name.is_empty() {
        return Err(invalid(name, "branch name must not be empty"));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c) || c.is_control()) {
        return Err(invalid(name, format!("contains forbidden character: {ch:?}")));
    }
    for (pattern, reason) in [("..", "must not contain '..'"), ("@{", "must not contain '@{'")] {
        if name.contains(pattern) {
            return Err(invalid(name, reason));
        }
    }
    if name.ends_with('.') || name.ends_with('/') || name.starts_with('/') {
        return Err(invalid(name, "must not start with '/' or end with '.' or '/'"));
    }
    if name.ends_with(".lock") {
        return Err(invalid(name, "must not end with '.lock'"));
    }
    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid(name, "path components must not be empty"));
        }
        if component.starts_with('.') {
            return Err(invalid(
                name,
                format!("component must not start with '.': {component:?}"),
            ));
        }
    }
    Ok(())
}

/// Canonical ref name for a branch.
pub fn branch_ref(branch: &str) -> String {
    format!("refs/heads/{branch}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_and_nested_names() {
        for ok in ["main", "develop", "my-branch", "v1.0", "feature/auth", "user/alice/fix-123"] {
            assert!(validate_branch_name(ok).is_ok(), "{ok} should be valid");
        }
    }

    #[test]
    fn rejects_bad_names() {
        for bad in [
            "",
            "bad..name",
            "has space",
            "has\ttab",
            "a~b",
            "a^b",
            "a:b",
            "a?b",
            "a*b",
            "a[b",
            "a\\b",
            ".hidden",
            "trailing.",
            "/leading",
            "trailing/",
            "a//b",
            "main.lock",
            "ref@{0}",
            "feature/.hidden",
        ] {
            assert!(validate_branch_name(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn canonical_branch_ref() {
        assert_eq!(branch_ref("main"), "refs/heads/main");
    }
}
