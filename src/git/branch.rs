//! Branch-name derivation for new workspaces

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::atomic::{AtomicI64, Ordering};

static INVALID_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9-]+").expect("valid regex"));
static DASH_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("valid regex"));

static LAST_SUFFIX: AtomicI64 = AtomicI64::new(0);

/// Turn free text into a branch-safe slug.
///
/// The result matches `^[a-z0-9-]*$` with no leading, trailing or repeated
/// hyphens, and `sanitize_branch_name(sanitize_branch_name(x)) == sanitize_branch_name(x)`.
pub fn sanitize_branch_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let replaced = INVALID_RUN.replace_all(&lower, "-");
    let collapsed = DASH_RUN.replace_all(&replaced, "-");
    collapsed.trim_matches('-').to_string()
}

/// Millisecond timestamp that is strictly greater than any previously returned
/// one in this process.
pub fn unique_suffix() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_SUFFIX.load(Ordering::SeqCst);
    loop {
        let next = now.max(last + 1);
        match LAST_SUFFIX.compare_exchange(last, next, Ordering::SeqCst, Ordering::SeqCst) {
            Ok(_) => return next,
            Err(actual) => last = actual,
        }
    }
}

/// `<prefix>/<slug>-<suffix>`, where an empty slug becomes `workspace`.
pub fn derive_branch_name(prefix: &str, name: &str, suffix: i64) -> String {
    let mut slug = sanitize_branch_name(name);
    if slug.is_empty() {
        slug = "workspace".to_string();
    }
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        format!("{}-{}", slug, suffix)
    } else {
        format!("{}/{}-{}", prefix, slug, suffix)
    }
}

/// Directory name used for a branch's worktree: the branch without its prefix.
pub fn worktree_dir_name(branch: &str) -> &str {
    branch.rsplit('/').next().unwrap_or(branch)
}
