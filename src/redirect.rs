//! Login redirect targets.
//!
//! Page loads without a session are sent to the login page with the originally
//! requested path in a `redirect` query parameter; after login the same path is
//! read back with `post_login_target`. Both directions refuse to point at the
//! login page itself or at another host.

pub const DEFAULT_LOGIN_PATH: &str = "/login";
pub const REDIRECT_PARAM: &str = "redirect";

/// Reduce a raw request URL to an origin-relative path (query kept).
/// Scheme and authority are dropped, so `//host/x` and `https://host/x` both become `/x`.
pub fn requested_path(raw: &str) -> String {
    let raw = raw.trim();
    let rest = match raw.find("://") {
        Some(i) if !raw[..i].contains('/') => &raw[i + 3..],
        _ => raw.strip_prefix("//").unwrap_or(raw),
    };
    let had_authority = rest.len() != raw.len();
    let path = if had_authority {
        match rest.find(|c: char| c == '/' || c == '?') {
            Some(i) => &rest[i..],
            None => "",
        }
    } else {
        rest
    };
    // Collapse leading slashes so the result is never protocol-relative
    let path = path.trim_start_matches('/');
    format!("/{}", path)
}

fn path_only(p: &str) -> &str {
    let end = p.find(|c: char| c == '?' || c == '#').unwrap_or(p.len());
    &p[..end]
}

fn is_root_equivalent(login_path: &str, path: &str) -> bool {
    let bare = path_only(path).trim_end_matches('/');
    bare.is_empty() || bare == login_path.trim_end_matches('/')
}

/// Login URL for a request that arrived without a session.
///
/// The root path (and the login page itself) yield the bare login path; any other
/// path is percent-encoded into the `redirect` parameter.
pub fn build_login_redirect(login_path: &str, original_path: &str) -> String {
    let original = requested_path(original_path);
    if is_root_equivalent(login_path, &original) {
        return login_path.to_string();
    }
    format!("{}?{}={}", login_path, REDIRECT_PARAM, urlencoding::encode(&original))
}

/// Where to send a user after a successful login, given the raw `redirect` value.
/// Anything undecodable, off-site or looping back to login falls back to `/`.
pub fn post_login_target(login_path: &str, redirect: Option<&str>) -> String {
    let Some(raw) = redirect.filter(|r| !r.is_empty()) else { return "/".to_string(); };
    let Ok(decoded) = urlencoding::decode(raw) else { return "/".to_string(); };
    if !decoded.starts_with('/') || decoded.starts_with("//") || decoded.contains('\\') {
        return "/".to_string();
    }
    if is_root_equivalent(login_path, &decoded) {
        return "/".to_string();
    }
    decoded.into_owned()
}
