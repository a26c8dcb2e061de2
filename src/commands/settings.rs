use std::collections::BTreeMap;

use crate::config::Settings;

/// Effective settings for display, with the API key masked.
pub fn get_settings(settings: &Settings) -> BTreeMap<&'static str, String> {
    let mut map = BTreeMap::new();
    map.insert(
        "api_key",
        settings
            .api_key
            .as_deref()
            .map(mask_secret)
            .unwrap_or_else(|| "(not set)".to_string()),
    );
    map.insert("base_url", settings.base_url.clone());
    map.insert("model", settings.model.clone());
    map.insert("log_level", settings.log_level.clone());
    map
}

/// Keep the first and last four characters of long secrets, hide short ones.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "*".repeat(chars.len())
    }
}
