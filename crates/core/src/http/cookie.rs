use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `SameSite` attribute values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    fn as_str(self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

/// A `Set-Cookie` header value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
    pub name: String,
    pub value: String,
    pub path: String,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub max_age: Option<i64>,
    pub expires: Option<DateTime<Utc>>,
    pub same_site: Option<SameSite>,
}

impl SetCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            path: "/".to_string(),
            domain: None,
            secure: false,
            http_only: false,
            max_age: None,
            expires: None,
            same_site: None,
        }
    }

    /// Turn this cookie into one that instructs the client to drop it.
    pub fn expired(mut self) -> Self {
        self.value = String::new();
        self.max_age = Some(0);
        self.expires = DateTime::<Utc>::from_timestamp(1, 0);
        self
    }

    pub fn to_header_value(&self) -> String {
        let mut parts = vec![format!(
            "{}={}",
            self.name,
            urlencoding::encode(&self.value)
        )];
        if let Some(expires) = self.expires {
            parts.push(format!(
                "expires={}",
                expires.format("%a, %d-%b-%Y %H:%M:%S GMT")
            ));
        }
        if let Some(max_age) = self.max_age {
            parts.push(format!("max-age={}", max_age));
        }
        if !self.path.is_empty() {
            parts.push(format!("path={}", self.path));
        }
        if let Some(domain) = &self.domain {
            parts.push(format!("domain={}", domain));
        }
        if self.secure {
            parts.push("secure".to_string());
        }
        if self.http_only {
            parts.push("httponly".to_string());
        }
        if let Some(same_site) = self.same_site {
            parts.push(format!("samesite={}", same_site.as_str()));
        }
        parts.join("; ")
    }
}

/// Parse a `cookie` request header into decoded name/value pairs.
pub fn parse_cookie_header(header: &str) -> Vec<(String, String)> {
    header
        .split(';')
        .filter_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            let value = value.trim().trim_matches('"');
            let decoded = urlencoding::decode(value)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.to_string());
            Some((name.trim().to_string(), decoded))
        })
        .collect()
}

/// Extract the cookie pair (`name=value`, decoded) from a `Set-Cookie` value.
pub fn parse_set_cookie(header: &str) -> Option<(String, String)> {
    let pair = header.split(';').next()?;
    parse_cookie_header(pair).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_value_with_attributes() {
        let mut cookie = SetCookie::new("CookieAuth", "[\"a\",\"b\"]");
        cookie.http_only = true;
        cookie.secure = true;
        cookie.same_site = Some(SameSite::Lax);
        let value = cookie.to_header_value();
        assert!(value.starts_with("CookieAuth=%5B%22a%22%2C%22b%22%5D"));
        assert!(value.contains("path=/"));
        assert!(value.contains("secure"));
        assert!(value.contains("httponly"));
        assert!(value.contains("samesite=Lax"));
    }

    #[test]
    fn test_expired_cookie() {
        let value = SetCookie::new("CookieAuth", "x").expired().to_header_value();
        assert!(value.starts_with("CookieAuth=;"));
        assert!(value.contains("max-age=0"));
        assert!(value.contains("expires=Thu, 01-Jan-1970 00:00:01 GMT"));
    }

    #[test]
    fn test_parse_cookie_header() {
        let cookies = parse_cookie_header("a=1; b=hello%20world; broken; c=\"q\"");
        assert_eq!(
            cookies,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "hello world".to_string()),
                ("c".to_string(), "q".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_set_cookie() {
        let parsed = parse_set_cookie("sid=abc%3D; path=/; httponly").unwrap();
        assert_eq!(parsed, ("sid".to_string(), "abc=".to_string()));
    }
}
