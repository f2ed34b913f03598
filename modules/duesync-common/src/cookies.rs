use serde::{Deserialize, Serialize};

/// A cookie in the shape the browser fetcher accepts.
///
/// Browser extensions export a looser format with extra bookkeeping fields
/// (`hostOnly`, `storeId`, `session`) and free-form `sameSite` values;
/// [`normalize_cookies`] translates an exported set into this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieRecord {
    pub domain: String,
    pub path: String,
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_date: Option<f64>,
}

/// Translate browser-exported cookie records into the fetcher's shape.
///
/// - `sameSite` is case-folded to one of `None` / `Lax` / `Strict`;
///   unspecified or unrecognized values drop the field entirely.
/// - `hostOnly`, `storeId`, and `session` are not carried over.
/// - Entries without a name or value are skipped.
pub fn normalize_cookies(cookie_set: &serde_json::Value) -> Vec<CookieRecord> {
    let Some(entries) = cookie_set.as_array() else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?.to_string();
            let value = entry.get("value")?.as_str()?.to_string();
            if name.is_empty() {
                return None;
            }

            let same_site = entry
                .get("sameSite")
                .and_then(|v| v.as_str())
                .and_then(|raw| match raw.to_lowercase().as_str() {
                    "none" => Some("None".to_string()),
                    "lax" => Some("Lax".to_string()),
                    "strict" => Some("Strict".to_string()),
                    // "unspecified" / "no_restriction" / anything else: omit
                    _ => None,
                });

            Some(CookieRecord {
                domain: entry
                    .get("domain")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                path: entry
                    .get("path")
                    .and_then(|v| v.as_str())
                    .unwrap_or("/")
                    .to_string(),
                name,
                value,
                secure: entry.get("secure").and_then(|v| v.as_bool()).unwrap_or(false),
                http_only: entry
                    .get("httpOnly")
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false),
                same_site,
                expiration_date: entry.get("expirationDate").and_then(|v| v.as_f64()),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn same_site_values_are_case_folded() {
        let set = json!([
            {"domain": ".school.edu", "path": "/", "name": "a", "value": "1", "sameSite": "lax"},
            {"domain": ".school.edu", "path": "/", "name": "b", "value": "2", "sameSite": "NONE"},
            {"domain": ".school.edu", "path": "/", "name": "c", "value": "3", "sameSite": "Strict"},
        ]);
        let cookies = normalize_cookies(&set);
        assert_eq!(cookies[0].same_site.as_deref(), Some("Lax"));
        assert_eq!(cookies[1].same_site.as_deref(), Some("None"));
        assert_eq!(cookies[2].same_site.as_deref(), Some("Strict"));
    }

    #[test]
    fn unspecified_same_site_is_dropped() {
        let set = json!([
            {"name": "sid", "value": "x", "sameSite": "unspecified"},
            {"name": "tok", "value": "y", "sameSite": "no_restriction"},
            {"name": "alt", "value": "z"},
        ]);
        let cookies = normalize_cookies(&set);
        assert_eq!(cookies.len(), 3);
        assert!(cookies.iter().all(|c| c.same_site.is_none()));
    }

    #[test]
    fn browser_bookkeeping_fields_are_not_carried() {
        let set = json!([{
            "name": "sid", "value": "x", "domain": "lms.school.edu", "path": "/courses",
            "hostOnly": true, "storeId": "0", "session": false,
            "secure": true, "httpOnly": true, "expirationDate": 1760000000.5
        }]);
        let cookies = normalize_cookies(&set);
        let wire = serde_json::to_value(&cookies[0]).unwrap();
        assert!(wire.get("hostOnly").is_none());
        assert!(wire.get("storeId").is_none());
        assert!(wire.get("session").is_none());
        assert_eq!(wire["secure"], json!(true));
        assert_eq!(wire["httpOnly"], json!(true));
        assert_eq!(wire["expirationDate"], json!(1760000000.5));
    }

    #[test]
    fn nameless_entries_are_skipped() {
        let set = json!([
            {"value": "orphan"},
            {"name": "", "value": "empty"},
            {"name": "kept", "value": "v"},
        ]);
        let cookies = normalize_cookies(&set);
        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "kept");
    }

    #[test]
    fn non_array_cookie_set_yields_nothing() {
        assert!(normalize_cookies(&json!({"name": "not-a-list"})).is_empty());
        assert!(normalize_cookies(&json!(null)).is_empty());
    }
}
