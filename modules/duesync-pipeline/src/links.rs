// Candidate-link resolution for the crawler. Every frontier URL is
// absolute, http(s), fragment-free, and canonicalized (no trailing slash)
// so the visited set deduplicates reliably.

/// Resolve a raw href against the page it appeared on.
///
/// - absolute `http(s)://` links are kept as-is
/// - `//host/...` adopts the base URL's scheme
/// - anything else joins against the base URL
/// - fragments are stripped, non-http(s) schemes dropped
///
/// Returns `None` for empty links, unresolvable links, and non-web schemes.
pub fn resolve_link(base_url: &str, raw: &str) -> Option<String> {
    let raw = raw.trim();
    let raw = raw.split('#').next().unwrap_or("");
    if raw.is_empty() {
        return None;
    }

    let mut resolved = if raw.starts_with("http://") || raw.starts_with("https://") {
        url::Url::parse(raw).ok()?
    } else if raw.starts_with("//") {
        let base = url::Url::parse(base_url).ok()?;
        url::Url::parse(&format!("{}:{}", base.scheme(), raw)).ok()?
    } else {
        url::Url::parse(base_url).ok()?.join(raw).ok()?
    };

    if resolved.scheme() != "http" && resolved.scheme() != "https" {
        return None;
    }

    resolved.set_fragment(None);
    Some(canonical(resolved.as_str()))
}

/// Canonical string form used for visited-set equality: trailing slashes
/// stripped, query preserved.
pub fn canonical(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://school.edu/cs4113/home";

    #[test]
    fn absolute_links_pass_through() {
        assert_eq!(
            resolve_link(BASE, "https://school.edu/cs4113/hw1").as_deref(),
            Some("https://school.edu/cs4113/hw1")
        );
        assert_eq!(
            resolve_link(BASE, "http://other.edu/page/").as_deref(),
            Some("http://other.edu/page")
        );
    }

    #[test]
    fn relative_links_join_against_base() {
        assert_eq!(
            resolve_link(BASE, "hw1").as_deref(),
            Some("https://school.edu/cs4113/hw1")
        );
        assert_eq!(
            resolve_link(BASE, "/syllabus").as_deref(),
            Some("https://school.edu/syllabus")
        );
        assert_eq!(
            resolve_link("https://school.edu/cs4113/", "notes/week2").as_deref(),
            Some("https://school.edu/cs4113/notes/week2")
        );
    }

    #[test]
    fn scheme_relative_links_adopt_base_scheme() {
        assert_eq!(
            resolve_link(BASE, "//cdn.school.edu/files/hw1.html").as_deref(),
            Some("https://cdn.school.edu/files/hw1.html")
        );
        assert_eq!(
            resolve_link("http://school.edu/x", "//cdn.school.edu/a").as_deref(),
            Some("http://cdn.school.edu/a")
        );
    }

    #[test]
    fn fragments_are_stripped() {
        assert_eq!(
            resolve_link(BASE, "https://school.edu/hw#due-dates").as_deref(),
            Some("https://school.edu/hw")
        );
        assert_eq!(
            resolve_link(BASE, "/hw#section-2").as_deref(),
            Some("https://school.edu/hw")
        );
    }

    #[test]
    fn bare_fragment_and_empty_are_dropped() {
        assert!(resolve_link(BASE, "#top").is_none());
        assert!(resolve_link(BASE, "").is_none());
        assert!(resolve_link(BASE, "   ").is_none());
    }

    #[test]
    fn non_web_schemes_are_dropped() {
        assert!(resolve_link(BASE, "mailto:prof@school.edu").is_none());
        assert!(resolve_link(BASE, "javascript:void(0)").is_none());
        assert!(resolve_link(BASE, "ftp://archive.school.edu/hw").is_none());
    }

    #[test]
    fn query_strings_survive() {
        assert_eq!(
            resolve_link(BASE, "/hw?week=2&part=b").as_deref(),
            Some("https://school.edu/hw?week=2&part=b")
        );
    }

    #[test]
    fn trailing_slash_is_canonicalized() {
        assert_eq!(
            resolve_link(BASE, "https://school.edu/hw/").as_deref(),
            Some("https://school.edu/hw")
        );
        assert_eq!(canonical("https://school.edu/"), "https://school.edu");
    }

    #[test]
    fn malformed_base_does_not_crash() {
        assert!(resolve_link("not a url", "/relative").is_none());
        // Absolute raw links don't need the base at all.
        assert_eq!(
            resolve_link("not a url", "https://school.edu/hw").as_deref(),
            Some("https://school.edu/hw")
        );
    }
}
