/// Response under construction by authenticators and storages.
///
/// Headers keep insertion order and allow duplicates (`set-cookie`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Default for AuthResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthResponse {
    pub fn new() -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Replace every header with this name.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_lowercase();
        self.headers.retain(|(key, _)| key != &name);
        self.headers.push((name, value.into()));
        self
    }

    /// Append a header, keeping existing ones with the same name.
    pub fn with_added_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_lowercase(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| key == &name)
            .map(|(_, value)| value.as_str())
    }

    pub fn header_values(&self, name: &str) -> Vec<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .filter(|(key, _)| key == &name)
            .map(|(_, value)| value.as_str())
            .collect()
    }
}
