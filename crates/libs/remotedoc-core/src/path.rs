//! Parsing, normalization and validation of `remotedoc://` URLs.
//!
//! A `remotedoc://owner/repo/branch/path/to/doc.md` URL addresses a single
//! file inside a tracked repository's working tree. Everything after the
//! third path segment is the document path, percent-decoded and lexically
//! resolved the same way a filesystem path would be, then checked to make
//! sure it cannot climb above the repository root.

use crate::error::{Error, Result};

const SCHEME: &str = "remotedoc://";

/// A parsed and validated `remotedoc://` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteDocUrl {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub path: String,
}

impl RemoteDocUrl {
    /// Parse and validate a `remotedoc://owner/repo/branch/path` URL.
    ///
    /// Rejects anything missing the scheme, missing a required segment,
    /// containing control characters, or whose path lexically escapes the
    /// repository root via `..`.
    pub fn parse(raw: &str) -> Result<Self> {
        let rest = raw
            .strip_prefix(SCHEME)
            .ok_or_else(|| Error::InvalidUrl(format!("missing {SCHEME} scheme: {raw}")))?;

        if rest.chars().any(|c| c.is_control()) {
            return Err(Error::InvalidUrl(format!("control character in url: {raw}")));
        }

        let mut segments = rest.splitn(4, '/');
        let owner = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidUrl(format!("missing owner: {raw}")))?;
        let repo = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidUrl(format!("missing repo: {raw}")))?;
        let branch = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidUrl(format!("missing branch: {raw}")))?;
        let raw_path = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| Error::InvalidUrl(format!("missing document path: {raw}")))?;

        let decoded = percent_decode(raw_path)?;
        let normalized = normalize_path(&decoded)?;

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            branch: branch.to_string(),
            path: normalized,
        })
    }

    pub fn to_url_string(&self) -> String {
        format!("{SCHEME}{}/{}/{}/{}", self.owner, self.repo, self.branch, self.path)
    }
}

/// Minimal percent-decoder for the ASCII subset a document path can contain.
/// Rejects malformed escapes and embedded NUL bytes rather than silently
/// dropping them.
fn percent_decode(input: &str) -> Result<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .ok_or_else(|| Error::InvalidUrl(format!("truncated percent escape in {input}")))?;
            let hex_str = std::str::from_utf8(hex)
                .map_err(|_| Error::InvalidUrl(format!("invalid percent escape in {input}")))?;
            let byte = u8::from_str_radix(hex_str, 16)
                .map_err(|_| Error::InvalidUrl(format!("invalid percent escape in {input}")))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    let decoded = String::from_utf8(out).map_err(|_| Error::InvalidUrl(format!("non-utf8 path in {input}")))?;
    if decoded.contains('\0') {
        return Err(Error::InvalidUrl(format!("nul byte in path: {input}")));
    }
    Ok(decoded)
}

/// Lexically resolve `.` and `..` segments without touching the filesystem.
///
/// `..` pops one accumulated segment; a `..` with nothing left to pop is
/// discarded rather than rejected, so a path cannot be made to climb above
/// the repository root no matter how many leading `..` segments it carries.
fn normalize_path(path: &str) -> Result<String> {
    let mut stack: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                stack.pop();
            }
            other => stack.push(other),
        }
    }
    if stack.is_empty() {
        return Err(Error::InvalidUrl(format!("path resolves to empty: {path}")));
    }
    // Defensive: normalization above can never leave a literal ".." on the
    // stack, but a future change to this function could. Check anyway,
    // since this path is handed straight to the filesystem.
    if stack.iter().any(|s| *s == "..") {
        return Err(Error::InvalidUrl(format!("path escapes repository root: {path}")));
    }
    Ok(stack.join("/"))
}

/// Resolves relative Markdown link destinations against the directory of
/// the document that contains them, producing `remotedoc://` URLs scoped
/// to the same repository and branch as the containing document.
pub struct PathResolver;

impl PathResolver {
    /// `containing_doc_path` is the repository-relative path of the
    /// document the link was found in (e.g. `guides/setup.md`).
    /// `destination` is the raw link target as written in the Markdown.
    pub fn resolve_relative(identity_owner: &str, identity_repo: &str, identity_branch: &str, containing_doc_path: &str, destination: &str) -> Result<RemoteDocUrl> {
        let (dest_path, query, fragment) = split_query_and_fragment(destination);
        let decoded = percent_decode(dest_path)?;

        let base_dir = containing_doc_path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("");
        let joined = if decoded.starts_with('/') {
            decoded.trim_start_matches('/').to_string()
        } else if base_dir.is_empty() {
            decoded
        } else {
            format!("{base_dir}/{decoded}")
        };

        let normalized = normalize_path(&joined)?;
        let mut path = normalized;
        if let Some(q) = query {
            path.push('?');
            path.push_str(q);
        }
        if let Some(frag) = fragment {
            path.push('#');
            path.push_str(frag);
        }

        Ok(RemoteDocUrl {
            owner: identity_owner.to_string(),
            repo: identity_repo.to_string(),
            branch: identity_branch.to_string(),
            path,
        })
    }
}

/// Splits a link destination into its path component plus an optional
/// `?query` and/or `#fragment`, whichever of `?`/`#` appears first wins
/// (§4.2 step 1); both are carried through unchanged and reattached after
/// the path component is resolved and normalized.
fn split_query_and_fragment(destination: &str) -> (&str, Option<&str>, Option<&str>) {
    let cut = destination.find(['?', '#']);
    let Some(cut) = cut else {
        return (destination, None, None);
    };
    let (path, rest) = destination.split_at(cut);
    if rest.starts_with('?') {
        let rest = &rest[1..];
        match rest.find('#') {
            Some(frag_at) => (path, Some(&rest[..frag_at]), Some(&rest[frag_at + 1..])),
            None => (path, Some(rest), None),
        }
    } else {
        (path, None, Some(&rest[1..]))
    }
}
