//! Browser identity used to make upstream traffic look like a web session.

/// A User-Agent string and its matching `sec-ch-ua` client hint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserIdentity {
    pub user_agent: String,
    pub sec_ch_ua: String,
}

/// Supplies a browser identity for each fetch invocation.
pub trait UserAgentSource: Send + Sync {
    fn generate(&self) -> BrowserIdentity;
}

/// Rotates through recent desktop Chrome releases on Windows.
#[derive(Debug, Clone)]
pub struct ChromeUserAgents {
    versions: Vec<u32>,
}

impl ChromeUserAgents {
    pub fn new(versions: Vec<u32>) -> Self {
        Self { versions }
    }

    fn identity(version: u32) -> BrowserIdentity {
        BrowserIdentity {
            user_agent: format!(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/{}.0.0.0 Safari/537.36",
                version
            ),
            sec_ch_ua: format!(
                "\"Chromium\";v=\"{v}\", \"Google Chrome\";v=\"{v}\", \"Not;A=Brand\";v=\"99\"",
                v = version
            ),
        }
    }
}

impl Default for ChromeUserAgents {
    fn default() -> Self {
        Self::new((114..=120).collect())
    }
}

impl UserAgentSource for ChromeUserAgents {
    fn generate(&self) -> BrowserIdentity {
        let version = if self.versions.is_empty() {
            120
        } else {
            self.versions[fastrand::usize(..self.versions.len())]
        };
        Self::identity(version)
    }
}

/// Always returns the same identity.
#[derive(Debug, Clone)]
pub struct FixedUserAgent(pub BrowserIdentity);

impl UserAgentSource for FixedUserAgent {
    fn generate(&self) -> BrowserIdentity {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_identity_is_consistent() {
        let source = ChromeUserAgents::new(vec![117]);
        let identity = source.generate();
        assert!(identity.user_agent.contains("Chrome/117.0.0.0"));
        assert!(identity.sec_ch_ua.contains("v=\"117\""));
    }

    #[test]
    fn test_versions_are_drawn_from_pool() {
        let source = ChromeUserAgents::default();
        for _ in 0..20 {
            let identity = source.generate();
            assert!((114..=120).any(|v| identity.user_agent.contains(&format!("Chrome/{}.", v))));
        }
    }

    #[test]
    fn test_empty_pool_falls_back() {
        let identity = ChromeUserAgents::new(Vec::new()).generate();
        assert!(identity.user_agent.contains("Chrome/120"));
    }
}
