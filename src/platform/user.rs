//! GraphQL user lookup.

use serde_json::{json, Value};
use url::Url;

use crate::error::{FetchError, FetchResult};

const USER_BY_SCREEN_NAME: &str = "/i/api/graphql/sLVLhk0bGj3MVFEKTdax1w/UserByScreenName";

/// Longest screen name the platform accepts.
pub const MAX_SCREEN_NAME_LEN: usize = 15;

/// Reject anything that is not 1-15 characters of `[A-Za-z0-9_]`.
pub fn validate_screen_name(screen_name: &str) -> FetchResult<()> {
    let valid = !screen_name.is_empty()
        && screen_name.len() <= MAX_SCREEN_NAME_LEN
        && screen_name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(FetchError::InvalidRequest(format!(
            "invalid screen name '{}'",
            screen_name
        )))
    }
}

/// `UserByScreenName` URL with the GraphQL variables and feature switches.
pub fn user_by_screen_name_url(web_root: &str, screen_name: &str) -> FetchResult<String> {
    let base = format!("{}{}", web_root.trim_end_matches('/'), USER_BY_SCREEN_NAME);
    let mut url = Url::parse(&base)
        .map_err(|e| FetchError::InvalidRequest(format!("web root '{}': {}", web_root, e)))?;

    let variables = json!({
        "screen_name": screen_name,
        "withSafetyModeUserFields": true,
    });
    let features = json!({
        "blue_business_profile_image_shape_enabled": true,
        "responsive_web_graphql_exclude_directive_enabled": true,
        "responsive_web_graphql_skip_user_profile_image_extensions_enabled": false,
        "responsive_web_graphql_timeline_navigation_enabled": false,
        "verified_phone_label_enabled": true,
    });
    url.query_pairs_mut()
        .append_pair("variables", &variables.to_string())
        .append_pair("features", &features.to_string());
    Ok(url.into())
}

/// Accept only a populated `data.user.result` of type `User` that carries a `legacy` field.
///
/// An empty `data` object means the user does not exist (or we were soft-denied).
pub fn is_user_response(body: &Value) -> bool {
    let data = match body.get("data").and_then(Value::as_object) {
        Some(data) if !data.is_empty() => data,
        _ => return false,
    };
    let result = match data.get("user").and_then(|u| u.get("result")) {
        Some(result) => result,
        None => return false,
    };
    result.get("__typename").and_then(Value::as_str) == Some("User")
        && result.get("legacy").is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_screen_name_rules() {
        assert!(validate_screen_name("jack").is_ok());
        assert!(validate_screen_name("a_b_C_123").is_ok());
        assert!(validate_screen_name("fifteen_chars_x").is_ok());

        assert!(validate_screen_name("").is_err());
        assert!(validate_screen_name("sixteen_chars_xx").is_err());
        assert!(validate_screen_name("no-dash").is_err());
        assert!(validate_screen_name("naïve").is_err());
        assert!(validate_screen_name("a/../b").is_err());
    }

    #[test]
    fn test_user_url_carries_variables_and_features() {
        let raw = user_by_screen_name_url("https://twitter.com/", "jack").unwrap();
        let url = Url::parse(&raw).unwrap();
        assert_eq!(url.path(), USER_BY_SCREEN_NAME);

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0].0, "variables");
        let variables: Value = serde_json::from_str(&pairs[0].1).unwrap();
        assert_eq!(variables["screen_name"], "jack");
        assert_eq!(variables["withSafetyModeUserFields"], true);

        assert_eq!(pairs[1].0, "features");
        let features: Value = serde_json::from_str(&pairs[1].1).unwrap();
        assert_eq!(features["verified_phone_label_enabled"], true);
        assert_eq!(features["responsive_web_graphql_timeline_navigation_enabled"], false);
    }

    #[test]
    fn test_user_validator() {
        let good = json!({"data": {"user": {"result": {"__typename": "User", "legacy": {"name": "jack"}}}}});
        assert!(is_user_response(&good));

        let empty = json!({"data": {}});
        assert!(!is_user_response(&empty));

        let unavailable = json!({"data": {"user": {"result": {"__typename": "UserUnavailable"}}}});
        assert!(!is_user_response(&unavailable));

        let no_legacy = json!({"data": {"user": {"result": {"__typename": "User"}}}});
        assert!(!is_user_response(&no_legacy));

        // Presence is what counts, not shape.
        let null_legacy = json!({"data": {"user": {"result": {"__typename": "User", "legacy": null}}}});
        assert!(is_user_response(&null_legacy));
        let string_legacy = json!({"data": {"user": {"result": {"__typename": "User", "legacy": "x"}}}});
        assert!(is_user_response(&string_legacy));

        assert!(!is_user_response(&json!({"errors": [{"code": 239}]})));
        assert!(!is_user_response(&json!([])));
    }
}
