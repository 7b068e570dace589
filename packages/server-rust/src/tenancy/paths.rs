//! Public-path allowlist shared by the authentication and tenant
//! resolution layers.

/// Paths that bypass both authentication and tenant resolution.
///
/// Exact entries match the full request path; prefix entries match any
/// path that starts with them (documentation UIs, health probes, the
/// login/registration surface).
#[derive(Debug, Clone)]
pub struct PublicPaths {
    exact: Vec<String>,
    prefixes: Vec<String>,
}

impl Default for PublicPaths {
    fn default() -> Self {
        Self {
            exact: vec!["/api/tenants/register".to_string(), "/error".to_string()],
            prefixes: vec![
                "/api/auth/".to_string(),
                "/api/public/".to_string(),
                "/swagger-ui".to_string(),
                "/v3/api-docs".to_string(),
                "/actuator/health".to_string(),
            ],
        }
    }
}

impl PublicPaths {
    /// Builds an allowlist from explicit entries.
    #[must_use]
    pub fn new(exact: Vec<String>, prefixes: Vec<String>) -> Self {
        Self { exact, prefixes }
    }

    /// Whether `path` is exempt from authentication and tenant resolution.
    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        self.exact.iter().any(|p| p == path)
            || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_entries_match_whole_path_only() {
        let paths = PublicPaths::default();
        assert!(paths.is_public("/api/tenants/register"));
        assert!(paths.is_public("/error"));
        assert!(!paths.is_public("/api/tenants"));
        assert!(!paths.is_public("/api/tenants/register/extra"));
    }

    #[test]
    fn prefix_entries_match_subpaths() {
        let paths = PublicPaths::default();
        assert!(paths.is_public("/api/auth/login"));
        assert!(paths.is_public("/api/public/ping"));
        assert!(paths.is_public("/swagger-ui"));
        assert!(paths.is_public("/swagger-ui/index.html"));
        assert!(paths.is_public("/v3/api-docs/swagger-config"));
        assert!(paths.is_public("/actuator/health/ready"));
    }

    #[test]
    fn protected_paths_are_not_public() {
        let paths = PublicPaths::default();
        assert!(!paths.is_public("/api/me"));
        assert!(!paths.is_public("/api/students"));
        assert!(!paths.is_public("/"));
    }
}
