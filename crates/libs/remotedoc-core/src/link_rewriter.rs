//! Rewrites relative Markdown links into `remotedoc://` URLs so a document
//! served out of its repository context still points at its companions.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::path::PathResolver;

/// `[text](dest "title")` — title is optional, dest may be empty. The title
/// delimiter may be `"` or `'` (§4.2); output always normalizes to `"`.
static INLINE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#"(?P<full>!?\[(?P<text>[^\]]*)\]\((?P<dest>[^\s)]*)(?:\s+["'](?P<title>[^"']*)["'])?\))"#).unwrap()
});

/// `[label]: dest "title"` reference-style link definitions. Same `"`/`'`
/// title-delimiter flexibility as `INLINE_LINK`.
static REFERENCE_LINK: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r#"(?m)^(?P<full>\[(?P<label>[^\]]+)\]:\s*(?P<dest>\S+)(?:\s+["'](?P<title>[^"']*)["'])?)\s*$"#).unwrap()
});

/// Rewrites the relative-link destinations of a Markdown document to
/// absolute `remotedoc://` URLs, leaving everything else untouched.
pub struct LinkRewriter;

impl LinkRewriter {
    /// `doc_path` is the repository-relative path of `content` itself, used
    /// to resolve relative destinations against its containing directory.
    pub fn rewrite(owner: &str, repo: &str, branch: &str, doc_path: &str, content: &str) -> String {
        let after_inline = INLINE_LINK.replace_all(content, |caps: &Captures| {
            rewrite_inline_match(owner, repo, branch, doc_path, caps)
        });
        REFERENCE_LINK
            .replace_all(&after_inline, |caps: &Captures| rewrite_reference_match(owner, repo, branch, doc_path, caps))
            .into_owned()
    }
}

fn rewrite_inline_match(owner: &str, repo: &str, branch: &str, doc_path: &str, caps: &Captures) -> String {
    let full = &caps["full"];
    let dest = &caps["dest"];
    let text = &caps["text"];
    let title = caps.name("title").map(|m| m.as_str());
    let is_image = full.starts_with('!');

    match rewrite_destination(owner, repo, branch, doc_path, dest) {
        Some(new_dest) => render_inline(is_image, text, &new_dest, title),
        None => full.to_string(),
    }
}

fn rewrite_reference_match(owner: &str, repo: &str, branch: &str, doc_path: &str, caps: &Captures) -> String {
    let full = &caps["full"];
    let dest = &caps["dest"];
    let label = &caps["label"];
    let title = caps.name("title").map(|m| m.as_str());

    match rewrite_destination(owner, repo, branch, doc_path, dest) {
        Some(new_dest) => render_reference(label, &new_dest, title),
        None => full.to_string(),
    }
}

fn render_inline(is_image: bool, text: &str, dest: &str, title: Option<&str>) -> String {
    let bang = if is_image { "!" } else { "" };
    match title {
        Some(t) => format!("{bang}[{text}]({dest} \"{t}\")"),
        None => format!("{bang}[{text}]({dest})"),
    }
}

fn render_reference(label: &str, dest: &str, title: Option<&str>) -> String {
    match title {
        Some(t) => format!("[{label}]: {dest} \"{t}\""),
        None => format!("[{label}]: {dest}"),
    }
}

/// Returns `Some(new_dest)` if `dest` was a relative, rewritable reference
/// to another file in the same repository; `None` if it should be left
/// alone (absolute URL, mailto, anchor-only, or already a `remotedoc://`
/// link).
fn rewrite_destination(owner: &str, repo: &str, branch: &str, doc_path: &str, dest: &str) -> Option<String> {
    if dest.is_empty() || should_leave_alone(dest) {
        return None;
    }
    PathResolver::resolve_relative(owner, repo, branch, doc_path, dest)
        .ok()
        .map(|url| url.to_url_string())
}

fn should_leave_alone(dest: &str) -> bool {
    if dest.starts_with('#') {
        return true;
    }
    if dest.starts_with("remotedoc://") {
        return true;
    }
    if dest.starts_with("mailto:") {
        return true;
    }
    // Per §4.2: only a literal `scheme://` prefix counts as absolute. A
    // bare `scheme:` with no following `//` (e.g. a relative path that
    // happens to contain a colon) is not one.
    if let Some(scheme_end) = dest.find("://") {
        let scheme = &dest[..scheme_end];
        if !scheme.is_empty() && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.') {
            return true;
        }
    }
    dest.starts_with("//")
}
