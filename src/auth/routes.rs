// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Endpoint access rules.
//!
//! One ordered table decides both whether a request may proceed anonymously
//! (the authentication gate) and which role it needs (authorization). First
//! matching rule wins; unmatched requests fall back to the table default.
//!
//! Patterns ending in `/**` match the prefix itself and every sub-path;
//! anything else matches the exact path.

use axum::http::Method;

use super::roles::Role;

/// Gate-level view of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Public,
    Protected,
}

/// Access level attached to a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Reachable without a principal
    Public,
    /// Any authenticated principal
    Authenticated,
    /// Authenticated principal holding the role
    Role(Role),
}

impl Access {
    pub fn classification(&self) -> Classification {
        match self {
            Access::Public => Classification::Public,
            Access::Authenticated | Access::Role(_) => Classification::Protected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathPattern {
    Exact(String),
    Subtree(String),
}

impl PathPattern {
    fn parse(pattern: &str) -> Self {
        match pattern.strip_suffix("/**") {
            Some(prefix) => PathPattern::Subtree(prefix.to_string()),
            None => PathPattern::Exact(pattern.to_string()),
        }
    }

    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Subtree(prefix) => path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/')),
        }
    }
}

#[derive(Debug, Clone)]
struct RouteRule {
    /// Empty means any method
    methods: Vec<Method>,
    patterns: Vec<PathPattern>,
    access: Access,
}

impl RouteRule {
    fn matches(&self, method: &Method, path: &str) -> bool {
        (self.methods.is_empty() || self.methods.contains(method))
            && self.patterns.iter().any(|p| p.matches(path))
    }
}

/// Ordered rule table.
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
    fallback: Access,
}

impl RouteTable {
    /// Empty table; every request gets `fallback`.
    pub fn new(fallback: Access) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    /// Append a rule. An empty `methods` slice matches any method.
    pub fn rule(mut self, methods: &[Method], patterns: &[&str], access: Access) -> Self {
        self.rules.push(RouteRule {
            methods: methods.to_vec(),
            patterns: patterns.iter().map(|p| PathPattern::parse(p)).collect(),
            access,
        });
        self
    }

    /// Access level of the first rule matching the request.
    pub fn access(&self, method: &Method, path: &str) -> Access {
        self.rules
            .iter()
            .find(|rule| rule.matches(method, path))
            .map(|rule| rule.access)
            .unwrap_or(self.fallback)
    }

    pub fn classify(&self, method: &Method, path: &str) -> Classification {
        self.access(method, path).classification()
    }

    /// Rules for the listing-site API.
    pub fn listing_site() -> Self {
        let admin = Access::Role(Role::Admin);

        Self::new(Access::Authenticated)
            .rule(&[], &["/api/v1/auth/**"], Access::Public)
            .rule(
                &[Method::GET],
                &[
                    "/api/v1/properties/**",
                    "/api/v1/amenities/**",
                    "/api/v1/locations/**",
                    "/api/v1/property-types/**",
                ],
                Access::Public,
            )
            .rule(&[Method::POST], &["/api/v1/requests"], Access::Public)
            .rule(
                &[],
                &["/v3/api-docs/**", "/swagger-ui/**", "/swagger-ui.html"],
                Access::Public,
            )
            .rule(&[], &["/ws/**"], Access::Public)
            .rule(&[], &["/health/**"], Access::Public)
            .rule(
                &[Method::POST, Method::PUT, Method::PATCH, Method::DELETE],
                &["/api/v1/properties/**"],
                admin,
            )
            .rule(
                &[Method::POST, Method::PUT, Method::DELETE],
                &["/api/v1/amenities/**"],
                admin,
            )
            .rule(&[Method::GET], &["/api/v1/requests"], admin)
            .rule(&[Method::PUT], &["/api/v1/requests/**"], admin)
            .rule(&[], &["/api/v1/admin/**"], admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::listing_site()
    }

    #[test]
    fn auth_endpoints_are_public_for_any_method() {
        let t = table();
        assert_eq!(t.classify(&Method::POST, "/api/v1/auth/login"), Classification::Public);
        assert_eq!(t.classify(&Method::GET, "/api/v1/auth/me"), Classification::Public);
    }

    #[test]
    fn catalog_reads_are_public() {
        let t = table();
        for path in [
            "/api/v1/properties",
            "/api/v1/properties/5",
            "/api/v1/amenities",
            "/api/v1/locations/3",
            "/api/v1/property-types",
        ] {
            assert_eq!(t.classify(&Method::GET, path), Classification::Public, "{path}");
        }
    }

    #[test]
    fn catalog_mutations_require_admin() {
        let t = table();
        assert_eq!(t.access(&Method::PUT, "/api/v1/properties/5"), Access::Role(Role::Admin));
        assert_eq!(t.access(&Method::POST, "/api/v1/properties"), Access::Role(Role::Admin));
        assert_eq!(t.access(&Method::DELETE, "/api/v1/amenities/2"), Access::Role(Role::Admin));
    }

    #[test]
    fn inquiry_submission_is_public_but_listing_is_admin() {
        let t = table();
        assert_eq!(t.access(&Method::POST, "/api/v1/requests"), Access::Public);
        assert_eq!(t.access(&Method::GET, "/api/v1/requests"), Access::Role(Role::Admin));
        assert_eq!(t.access(&Method::PUT, "/api/v1/requests/9"), Access::Role(Role::Admin));
        // Exact pattern does not cover sub-paths
        assert_eq!(t.access(&Method::POST, "/api/v1/requests/9"), Access::Authenticated);
    }

    #[test]
    fn docs_and_websocket_handshake_are_public() {
        let t = table();
        assert_eq!(t.classify(&Method::GET, "/v3/api-docs/openapi.json"), Classification::Public);
        assert_eq!(t.classify(&Method::GET, "/swagger-ui/index.html"), Classification::Public);
        assert_eq!(t.classify(&Method::GET, "/swagger-ui.html"), Classification::Public);
        assert_eq!(t.classify(&Method::GET, "/ws/info"), Classification::Public);
    }

    #[test]
    fn unmatched_paths_default_to_protected() {
        let t = table();
        assert_eq!(t.classify(&Method::GET, "/api/v1/labels"), Classification::Protected);
        assert_eq!(t.access(&Method::GET, "/api/v1/notifications"), Access::Authenticated);
    }

    #[test]
    fn subtree_does_not_match_sibling_prefix() {
        let t = table();
        // "/api/v1/properties-export" shares a prefix but is not under the subtree
        assert_eq!(
            t.classify(&Method::GET, "/api/v1/properties-export"),
            Classification::Protected
        );
    }

    #[test]
    fn first_matching_rule_wins() {
        let t = RouteTable::new(Access::Authenticated)
            .rule(&[], &["/catalog/**"], Access::Public)
            .rule(&[], &["/catalog/secret"], Access::Role(Role::Admin));

        assert_eq!(t.access(&Method::GET, "/catalog/secret"), Access::Public);
    }
}
