//! Shared fixtures for the integration suite.

use std::path::PathBuf;

use ldifdb::backend::{LdifBackend, LdifBackendConfig};
use ldifdb::{Backend, Dn, Entry, Filter, SearchScope};
use tempfile::TempDir;

pub fn dn(s: &str) -> Dn {
    Dn::parse(s).unwrap()
}

pub fn entry(dn_str: &str, attrs: &[(&str, &str)]) -> Entry {
    let mut e = Entry::new(dn(dn_str));
    for (name, value) in attrs {
        e.add_value(name, *value);
    }
    e
}

/// A fresh empty backend over a dump file inside a temp directory. The
/// directory guard must outlive the backend.
pub fn temp_backend(suffix: &str) -> (LdifBackend, PathBuf, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("tree.ldif");
    let config = LdifBackendConfig::new(&[dn(suffix)], &path).unwrap();
    (LdifBackend::new(config), path, dir)
}

/// A backend pre-populated with the given entries (parents first).
pub fn populated_backend(suffix: &str, dns: &[&str]) -> (LdifBackend, PathBuf, TempDir) {
    let (backend, path, dir) = temp_backend(suffix);
    for d in dns {
        backend
            .add_entry(entry(d, &[("objectClass", "top")]))
            .unwrap();
    }
    backend.verify_tree().unwrap();
    (backend, path, dir)
}

/// All DNs in the backend, sorted.
pub fn all_dns(backend: &LdifBackend) -> Vec<Dn> {
    let mut dns = Vec::new();
    backend
        .search(
            &backend.base_dn(),
            SearchScope::WholeSubtree,
            &Filter::present("objectClass"),
            &mut |e| dns.push(e.dn().clone()),
        )
        .unwrap();
    dns.sort();
    dns
}
