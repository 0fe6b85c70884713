//! Credential material and URL-keyed credential resolution.
//!
//! Stored credentials are keyed by URL-like strings in a platform store the
//! hosting shell provides. Resolution walks from the most specific key to
//! the least specific one and stops at the first hit.

use std::fmt;
use url::Url;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A username + secret pair.
///
/// The secret is never logged and is wiped from memory on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential {
    username: String,
    secret: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("secret", &"[redacted]")
            .finish()
    }
}

/// Platform credential store the hosting shell exposes, keyed by URL-like
/// strings.
pub trait CredentialStore: Send + Sync {
    fn lookup(&self, key: &str) -> Option<Credential>;
}

/// Resolves a stored credential for a target URL.
///
/// Lookup order, each step only attempted when the prior yielded nothing:
/// the exact URL, the scheme+host root with a progressively shortened path
/// (longest prefix first), the scheme+host root itself, the root with a
/// trailing slash, and finally the bare host.
pub struct CredentialResolver<'a> {
    store: &'a dyn CredentialStore,
}

impl<'a> CredentialResolver<'a> {
    pub fn new(store: &'a dyn CredentialStore) -> Self {
        Self { store }
    }

    pub fn resolve(&self, url: &str) -> Option<Credential> {
        if let Some(credential) = self.store.lookup(url) {
            return Some(credential);
        }

        let parsed = Url::parse(url).ok()?;
        let host = parsed.host_str()?.to_string();
        // Url::port() is None for a scheme's default port, matching the
        // "only include non-default ports" key convention.
        let root = match parsed.port() {
            Some(port) => format!("{}://{host}:{port}", parsed.scheme()),
            None => format!("{}://{host}", parsed.scheme()),
        };

        let mut path = parsed.path().to_string();
        while let Some(idx) = path.rfind('/') {
            path.truncate(idx);
            if !path.is_empty() {
                if let Some(credential) = self.store.lookup(&format!("{root}{path}")) {
                    return Some(credential);
                }
            }
        }

        self.store
            .lookup(&root)
            .or_else(|| self.store.lookup(&format!("{root}/")))
            .or_else(|| self.store.lookup(&host))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MapStore(Mutex<HashMap<String, Credential>>);

    impl MapStore {
        fn with(entries: &[(&str, &str)]) -> Self {
            let map = entries
                .iter()
                .map(|(k, u)| (k.to_string(), Credential::new(*u, "pw")))
                .collect();
            Self(Mutex::new(map))
        }
    }

    impl CredentialStore for MapStore {
        fn lookup(&self, key: &str) -> Option<Credential> {
            self.0.lock().unwrap().get(key).cloned()
        }
    }

    #[test]
    fn exact_url_wins() {
        let store = MapStore::with(&[
            ("https://a.com/site1/sub", "exact"),
            ("https://a.com/site1", "prefix"),
            ("https://a.com", "root"),
        ]);
        let found = CredentialResolver::new(&store)
            .resolve("https://a.com/site1/sub")
            .unwrap();
        assert_eq!(found.username(), "exact");
    }

    #[test]
    fn longest_path_prefix_beats_host_entry() {
        let store = MapStore::with(&[("https://a.com/site1", "site1"), ("https://a.com", "root")]);
        let found = CredentialResolver::new(&store)
            .resolve("https://a.com/site1/sub")
            .unwrap();
        assert_eq!(found.username(), "site1");
    }

    #[test]
    fn falls_through_to_host_only() {
        let store = MapStore::with(&[("a.com", "host")]);
        let found = CredentialResolver::new(&store)
            .resolve("https://a.com/site1/sub")
            .unwrap();
        assert_eq!(found.username(), "host");
    }

    #[test]
    fn trailing_slash_variant_is_consulted() {
        let store = MapStore::with(&[("https://a.com/", "slash")]);
        let found = CredentialResolver::new(&store)
            .resolve("https://a.com/site1")
            .unwrap();
        assert_eq!(found.username(), "slash");
    }

    #[test]
    fn non_default_port_is_part_of_the_key() {
        let store = MapStore::with(&[("https://a.com:8443/site1", "ported")]);
        let resolver = CredentialResolver::new(&store);
        let found = resolver.resolve("https://a.com:8443/site1/sub").unwrap();
        assert_eq!(found.username(), "ported");
        assert!(resolver.resolve("https://a.com/site1/sub").is_none());
    }

    #[test]
    fn nothing_stored_resolves_to_none() {
        let store = MapStore::with(&[]);
        assert!(
            CredentialResolver::new(&store)
                .resolve("https://a.com/site1")
                .is_none()
        );
    }

    #[test]
    fn debug_redacts_the_secret() {
        let shown = format!("{:?}", Credential::new("user", "hunter2"));
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("[redacted]"));
    }
}
