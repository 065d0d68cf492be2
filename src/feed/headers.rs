use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, USER_AGENT,
};

/// Identifying headers sent with one request. Profiles rotate per attempt so a
/// retry does not present the exact fingerprint that was just rejected.
#[derive(Debug, Clone, Copy)]
pub struct HeaderProfile {
    pub user_agent: &'static str,
    pub accept_language: &'static str,
}

pub const PROFILES: &[HeaderProfile] = &[
    HeaderProfile {
        user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
        accept_language: "en-US,en;q=0.9",
    },
    HeaderProfile {
        user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_5) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.5 Safari/605.1.15",
        accept_language: "en-US,en;q=0.8,ko;q=0.6",
    },
    HeaderProfile {
        user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0",
        accept_language: "en-GB,en;q=0.7",
    },
];

const FEED_ACCEPT: &str =
    "application/rss+xml,application/atom+xml,application/xml;q=0.9,text/xml;q=0.8,*/*;q=0.5";

/// Header profile for a 1-based attempt number.
pub fn profile_for(attempt: u32) -> &'static HeaderProfile {
    let idx = (attempt.saturating_sub(1) as usize) % PROFILES.len();
    &PROFILES[idx]
}

/// Browser-like header set for a 1-based attempt number.
pub fn browser_headers(attempt: u32) -> HeaderMap {
    let profile = profile_for(attempt);
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(profile.user_agent));
    headers.insert(ACCEPT, HeaderValue::from_static(FEED_ACCEPT));
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static(profile.accept_language),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_rotate_and_wrap() {
        assert_eq!(profile_for(1).user_agent, PROFILES[0].user_agent);
        assert_eq!(profile_for(2).user_agent, PROFILES[1].user_agent);
        assert_eq!(
            profile_for(PROFILES.len() as u32 + 1).user_agent,
            PROFILES[0].user_agent
        );
    }

    #[test]
    fn test_headers_contain_user_agent() {
        let headers = browser_headers(2);
        assert_eq!(
            headers.get(USER_AGENT).and_then(|v| v.to_str().ok()),
            Some(PROFILES[1].user_agent)
        );
        assert!(headers.contains_key(ACCEPT));
    }
}
