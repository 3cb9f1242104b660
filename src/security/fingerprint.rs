use crate::domain::DeviceClass;

/// Stable per-client throttle identity derived from the request origin and
/// the device-agent string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientFingerprint {
    pub key: String,
    pub device: DeviceClass,
}

const MOBILE_MARKERS: [&str; 8] = [
    "iphone",
    "ipad",
    "ipod",
    "android",
    "mobile",
    "blackberry",
    "windows phone",
    "opera mini",
];

const AGENT_FRAGMENT_LEN: usize = 24;

/// Derives the throttle key and device class. Mobile keys collapse the agent
/// to a device family so app instances on similar devices behind one network
/// share a bucket; desktop keys keep an agent fragment for finer-grained
/// buckets. Never fails: missing inputs fall back to `unknown`.
pub fn fingerprint_request(ip: Option<&str>, user_agent: Option<&str>) -> ClientFingerprint {
    let origin = match ip.map(str::trim) {
        Some(ip) if !ip.is_empty() => ip,
        _ => "unknown",
    };
    let agent = user_agent.map(|ua| ua.to_lowercase()).unwrap_or_default();

    if is_mobile_agent(&agent) {
        let family = mobile_family(&agent);
        ClientFingerprint {
            key: format!("{origin}|mobile|{family}"),
            device: DeviceClass::Mobile,
        }
    } else {
        let fragment = agent_fragment(&agent);
        ClientFingerprint {
            key: format!("{origin}|desktop|{fragment}"),
            device: DeviceClass::Desktop,
        }
    }
}

fn is_mobile_agent(agent: &str) -> bool {
    MOBILE_MARKERS.iter().any(|marker| agent.contains(marker))
}

fn mobile_family(agent: &str) -> &'static str {
    if agent.contains("ipad") {
        "ipad"
    } else if agent.contains("iphone") || agent.contains("ipod") {
        "iphone"
    } else if agent.contains("android") {
        "android"
    } else {
        "generic-mobile"
    }
}

// Alphanumerics plus the separators common in agent product tokens; anything
// else (quotes, braces, control bytes) is dropped before truncation.
fn agent_fragment(agent: &str) -> String {
    let sanitized: String = agent
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '/' | ' ' | '-'))
        .take(AGENT_FRAGMENT_LEN)
        .collect();

    let trimmed = sanitized.trim();
    if trimmed.is_empty() {
        "unknown".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IPHONE_UA: &str =
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15";
    const CHROME_UA: &str =
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120.0";

    #[test]
    fn classifies_mobile_markers_case_insensitively() {
        for agent in [
            IPHONE_UA,
            "okhttp Android client",
            "BLACKBERRY 9000",
            "Opera Mini/7.1",
            "Windows Phone 10",
        ] {
            let fp = fingerprint_request(Some("10.0.0.1"), Some(agent));
            assert_eq!(fp.device, DeviceClass::Mobile, "agent: {agent}");
        }
    }

    #[test]
    fn classifies_desktop_when_no_marker_matches() {
        let fp = fingerprint_request(Some("10.0.0.1"), Some(CHROME_UA));
        assert_eq!(fp.device, DeviceClass::Desktop);
    }

    #[test]
    fn mobile_keys_collapse_to_device_family() {
        let first = fingerprint_request(
            Some("203.0.113.7"),
            Some("Mozilla/5.0 (iPhone; CPU iPhone OS 16_2) Version/16.2"),
        );
        let second = fingerprint_request(Some("203.0.113.7"), Some(IPHONE_UA));
        assert_eq!(first.key, second.key);
        assert_eq!(first.key, "203.0.113.7|mobile|iphone");
    }

    #[test]
    fn ipad_is_its_own_family() {
        let fp = fingerprint_request(Some("203.0.113.7"), Some("Mozilla/5.0 (iPad; CPU OS 16_2)"));
        assert_eq!(fp.key, "203.0.113.7|mobile|ipad");
    }

    #[test]
    fn unmatched_mobile_marker_falls_back_to_generic_family() {
        let fp = fingerprint_request(Some("203.0.113.7"), Some("SomeBrowser Mobile/1.0"));
        assert_eq!(fp.key, "203.0.113.7|mobile|generic-mobile");
    }

    #[test]
    fn desktop_keys_differ_per_agent() {
        let chrome = fingerprint_request(Some("203.0.113.7"), Some(CHROME_UA));
        let curl = fingerprint_request(Some("203.0.113.7"), Some("curl/8.4.0"));
        assert_ne!(chrome.key, curl.key);
    }

    #[test]
    fn desktop_fragment_is_sanitized_and_truncated() {
        let fp = fingerprint_request(Some("10.0.0.1"), Some("Evil\"Agent{};<script>1234567890abcdef"));
        let fragment = fp.key.rsplit('|').next().expect("key has a fragment");
        assert!(fragment.len() <= AGENT_FRAGMENT_LEN);
        assert!(!fragment.contains('"'));
        assert!(!fragment.contains('<'));
    }

    #[test]
    fn missing_inputs_fall_back_to_unknown() {
        let fp = fingerprint_request(None, None);
        assert_eq!(fp.key, "unknown|desktop|unknown");
        assert_eq!(fp.device, DeviceClass::Desktop);

        let fp = fingerprint_request(Some("   "), Some(""));
        assert_eq!(fp.key, "unknown|desktop|unknown");
    }
}
