use claims::{assert_none, assert_some};
use proptest::prelude::*;
use spconnect::auth::{Credential, CredentialResolver};
use spconnect::connect::MemoryCredentialStore;

fn store_with(entries: &[(&str, &str)]) -> MemoryCredentialStore {
    let store = MemoryCredentialStore::new();
    for (key, username) in entries {
        store.insert(*key, Credential::new(*username, "pw"));
    }
    store
}

#[test]
fn exact_url_wins_over_every_fallback() {
    let store = store_with(&[
        ("https://a.sharepoint.com/sites/s", "exact"),
        ("https://a.sharepoint.com", "root"),
        ("a.sharepoint.com", "host"),
    ]);
    let resolver = CredentialResolver::new(&store);

    let credential = assert_some!(resolver.resolve("https://a.sharepoint.com/sites/s"));
    assert_eq!(credential.username(), "exact");
}

#[test]
fn deepest_path_prefix_wins() {
    let store = store_with(&[
        ("https://a.sharepoint.com/sites", "shallow"),
        ("https://a.sharepoint.com/sites/s", "deep"),
    ]);
    let resolver = CredentialResolver::new(&store);

    let credential = assert_some!(resolver.resolve("https://a.sharepoint.com/sites/s/lists/l"));
    assert_eq!(credential.username(), "deep");
}

#[test]
fn scheme_and_host_fallback_applies_after_prefixes() {
    let store = store_with(&[("https://a.sharepoint.com", "root")]);
    let resolver = CredentialResolver::new(&store);

    let credential = assert_some!(resolver.resolve("https://a.sharepoint.com/sites/s"));
    assert_eq!(credential.username(), "root");
}

#[test]
fn root_with_trailing_slash_is_consulted() {
    let store = store_with(&[("https://a.sharepoint.com/", "slashed")]);
    let resolver = CredentialResolver::new(&store);

    let credential = assert_some!(resolver.resolve("https://a.sharepoint.com/sites/s"));
    assert_eq!(credential.username(), "slashed");
}

#[test]
fn bare_host_is_the_last_resort() {
    let store = store_with(&[("a.sharepoint.com", "host-only")]);
    let resolver = CredentialResolver::new(&store);

    let credential = assert_some!(resolver.resolve("https://a.sharepoint.com/sites/s"));
    assert_eq!(credential.username(), "host-only");
}

#[test]
fn non_default_port_is_part_of_the_key() {
    let store = store_with(&[("https://a.sharepoint.com:8443", "ported")]);
    let resolver = CredentialResolver::new(&store);

    assert_some!(resolver.resolve("https://a.sharepoint.com:8443/sites/s"));
    assert_none!(resolver.resolve("https://a.sharepoint.com/sites/s"));
}

#[test]
fn other_hosts_never_leak() {
    let store = store_with(&[("https://b.sharepoint.com", "other")]);
    let resolver = CredentialResolver::new(&store);

    assert_none!(resolver.resolve("https://a.sharepoint.com/sites/s"));
}

proptest! {
    /// A credential stored under any ancestor of the requested path is
    /// always found.
    #[test]
    fn ancestor_entry_always_resolves(
        segments in prop::collection::vec("[a-z]{1,8}", 1..5),
        depth in 0usize..5,
    ) {
        let depth = depth.min(segments.len());
        let ancestor = format!(
            "https://a.sharepoint.com/{}",
            segments[..depth].join("/")
        );
        let full = format!("https://a.sharepoint.com/{}", segments.join("/"));

        let store = store_with(&[(ancestor.trim_end_matches('/'), "stored")]);
        let resolver = CredentialResolver::new(&store);

        let credential = resolver.resolve(&full);
        prop_assert!(credential.is_some());
        let credential = credential.unwrap();
        prop_assert_eq!(credential.username(), "stored");
    }

    /// Resolution never invents a credential from an empty store.
    #[test]
    fn empty_store_resolves_nothing(segments in prop::collection::vec("[a-z]{1,8}", 0..5)) {
        let store = MemoryCredentialStore::new();
        let resolver = CredentialResolver::new(&store);
        let url = format!("https://a.sharepoint.com/{}", segments.join("/"));
        prop_assert!(resolver.resolve(&url).is_none());
    }
}
