use regex_lite::Regex;
use tracing::warn;

use crate::http::AuthRequest;

/// Decides whether a request targets one of a set of URLs.
pub trait UrlChecker: Send + Sync {
    /// An empty `urls` list matches every request.
    fn check(&self, request: &AuthRequest, urls: &[String]) -> bool;

    /// The part of the request compared against the URLs.
    fn url_to_check(&self, request: &AuthRequest) -> String;
}

/// Compares the request path (or full URL) literally or by regex.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultUrlChecker {
    pub use_regex: bool,
    pub check_full_url: bool,
}

impl DefaultUrlChecker {
    pub fn new(use_regex: bool, check_full_url: bool) -> Self {
        Self {
            use_regex,
            check_full_url,
        }
    }
}

impl UrlChecker for DefaultUrlChecker {
    fn check(&self, request: &AuthRequest, urls: &[String]) -> bool {
        if urls.is_empty() {
            return true;
        }
        let target = self.url_to_check(request);
        urls.iter().any(|url| {
            if !self.use_regex {
                return *url == target;
            }
            match Regex::new(url) {
                Ok(pattern) => pattern.is_match(&target),
                Err(e) => {
                    warn!(pattern = %url, error = %e, "Ignoring invalid login URL pattern");
                    false
                }
            }
        })
    }

    fn url_to_check(&self, request: &AuthRequest) -> String {
        if self.check_full_url {
            request.full_url()
        } else {
            request.path.clone()
        }
    }
}

/// Failure message used when a login URL check fails.
pub(crate) fn login_url_mismatch(checked: &str, urls: &[String]) -> String {
    format!(
        "Login URL `{}` did not match `{}`.",
        checked,
        urls.join("` or `")
    )
}
