//! Backend facade behavior: the LDAP-shaped operations, their error
//! diagnostics, and the dump-file side effects of every mutation.

use ldifdb::backend::{HasSubordinates, LdifBackendConfig};
use ldifdb::{Backend, Filter, SearchScope};

use crate::helpers::{all_dns, dn, entry, populated_backend, temp_backend};

#[test]
fn empty_to_first_add() {
    let (backend, path, _dir) = temp_backend("dc=x");
    assert_eq!(backend.entry_count(), 0);
    assert!(!path.exists());

    backend.add_entry(entry("dc=x", &[("objectClass", "domain")])).unwrap();

    assert_eq!(backend.entry_count(), 1);
    assert!(backend.entry_exists(&dn("dc=x")).unwrap());
    let dump = std::fs::read_to_string(&path).unwrap();
    assert_eq!(dump, "dn: dc=x\nobjectClass: domain\n");
    backend.verify_tree().unwrap();
}

#[test]
fn add_with_missing_parent_reports_matched_dn() {
    let (backend, _path, _dir) = populated_backend("dc=x", &["dc=x"]);

    let err = backend
        .add_entry(entry("cn=a,ou=p,dc=x", &[("cn", "a")]))
        .unwrap_err();
    assert!(err.is_no_such_object());
    assert_eq!(err.matched_dn(), Some(&dn("dc=x")));

    // The failed add must not have touched the tree or the dump.
    assert_eq!(backend.entry_count(), 1);
    backend.verify_tree().unwrap();
}

#[test]
fn nonleaf_delete_requires_subtree_control() {
    let (backend, path, _dir) = populated_backend("dc=x", &["dc=x", "cn=a,dc=x"]);

    let err = backend.delete_entry(&dn("dc=x"), false).unwrap_err();
    let ldifdb::Error::Backend(backend_err) = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(backend_err.result_code(), 66);
    assert_eq!(backend.entry_count(), 2);

    backend.delete_entry(&dn("dc=x"), true).unwrap();
    assert_eq!(backend.entry_count(), 0);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    backend.verify_tree().unwrap();
}

#[test]
fn delete_missing_entry_reports_matched_dn() {
    let (backend, _path, _dir) = populated_backend("dc=x", &["dc=x", "ou=p,dc=x"]);
    let err = backend.delete_entry(&dn("cn=a,ou=p,dc=x"), false).unwrap_err();
    assert!(err.is_no_such_object());
    assert_eq!(err.matched_dn(), Some(&dn("ou=p,dc=x")));
}

#[test]
fn subtree_rename_rekeys_descendants() {
    let (backend, _path, _dir) =
        populated_backend("dc=x", &["dc=x", "ou=p,dc=x", "cn=a,ou=p,dc=x"]);

    backend
        .rename_entry(
            &dn("ou=p,dc=x"),
            entry("ou=q,dc=x", &[("objectClass", "top"), ("ou", "q")]),
            false,
        )
        .unwrap();

    assert_eq!(
        all_dns(&backend),
        vec![dn("cn=a,ou=q,dc=x"), dn("dc=x"), dn("ou=q,dc=x")]
    );
    assert_eq!(
        backend.has_subordinates(&dn("ou=q,dc=x")).unwrap(),
        HasSubordinates::Yes
    );
    assert_eq!(
        backend.has_subordinates(&dn("ou=p,dc=x")).unwrap(),
        HasSubordinates::NoSuchEntry
    );
    assert_eq!(backend.num_subordinates(&dn("dc=x"), false).unwrap(), 1);
    assert_eq!(backend.num_subordinates(&dn("dc=x"), true).unwrap(), 2);

    let moved = backend.get_entry(&dn("cn=a,ou=q,dc=x")).unwrap().unwrap();
    assert_eq!(moved.dn(), &dn("cn=a,ou=q,dc=x"));
    backend.verify_tree().unwrap();
}

#[test]
fn rename_outside_suffix_is_refused() {
    let (backend, _path, _dir) = populated_backend("dc=x", &["dc=x", "ou=p,dc=x"]);
    let err = backend
        .rename_entry(
            &dn("ou=p,dc=x"),
            entry("ou=p,dc=other", &[("ou", "p")]),
            true,
        )
        .unwrap_err();
    let ldifdb::Error::Backend(backend_err) = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(backend_err.is_unwilling());
}

#[test]
fn replace_swaps_entry_in_place() {
    let (backend, path, _dir) = populated_backend("dc=x", &["dc=x", "cn=a,dc=x"]);

    backend
        .replace_entry(entry(
            "cn=a,dc=x",
            &[("objectClass", "top"), ("description", "updated")],
        ))
        .unwrap();

    let got = backend.get_entry(&dn("cn=a,dc=x")).unwrap().unwrap();
    assert_eq!(got.first_value("description"), Some(b"updated".as_slice()));
    assert!(std::fs::read_to_string(&path).unwrap().contains("description: updated"));

    let err = backend
        .replace_entry(entry("cn=missing,dc=x", &[("cn", "missing")]))
        .unwrap_err();
    assert!(err.is_no_such_object());
}

#[test]
fn returned_entries_are_deep_copies() {
    let (backend, _path, _dir) = populated_backend("dc=x", &["dc=x"]);

    let mut copy = backend.get_entry(&dn("dc=x")).unwrap().unwrap();
    copy.add_value("description", "caller-side mutation");

    let fresh = backend.get_entry(&dn("dc=x")).unwrap().unwrap();
    assert!(!fresh.has_attribute("description"));
}

#[test]
fn search_missing_base_reports_matched_dn() {
    let (backend, _path, _dir) = populated_backend("dc=x", &["dc=x", "ou=p,dc=x"]);
    let err = backend
        .search(
            &dn("cn=z,ou=p,dc=x"),
            SearchScope::WholeSubtree,
            &Filter::present("objectClass"),
            &mut |_| panic!("nothing should match"),
        )
        .unwrap_err();
    assert_eq!(err.matched_dn(), Some(&dn("ou=p,dc=x")));
}

#[test]
fn search_scopes_through_facade() {
    let (backend, _path, _dir) = populated_backend(
        "dc=x",
        &["dc=x", "ou=p,dc=x", "cn=a,ou=p,dc=x", "cn=b,ou=p,dc=x"],
    );

    let mut count = 0;
    backend
        .search(
            &dn("ou=p,dc=x"),
            SearchScope::Subordinates,
            &Filter::present("objectClass"),
            &mut |_| count += 1,
        )
        .unwrap();
    assert_eq!(count, 2);

    let mut base_hits = Vec::new();
    backend
        .search(
            &dn("dc=x"),
            SearchScope::BaseObject,
            &Filter::present("objectClass"),
            &mut |e| base_hits.push(e.dn().clone()),
        )
        .unwrap();
    assert_eq!(base_hits, vec![dn("dc=x")]);
}

#[test]
fn import_with_duplicate_dn() {
    let (backend, path, _dir) = temp_backend("dc=x");
    let ldif = "dn: dc=x\nobjectClass: domain\ndc: x\n\n\
                dn: cn=a,dc=x\nobjectClass: person\ncn: a\n\n\
                dn: cn=a,dc=x\nobjectClass: person\ncn: duplicate\n";

    let result = backend.import_ldif(&mut ldif.as_bytes()).unwrap();
    assert_eq!(result.entries_read, 3);
    assert_eq!(result.entries_rejected, 1);
    assert_eq!(result.entries_ignored, 0);

    // The first record with the DN wins.
    let kept = backend.get_entry(&dn("cn=a,dc=x")).unwrap().unwrap();
    assert_eq!(kept.first_value("cn"), Some(b"a".as_slice()));

    // Import invoked as an operation rewrites the dump.
    let dump = std::fs::read_to_string(&path).unwrap();
    assert_eq!(dump.matches("dn: ").count(), 2);
    backend.verify_tree().unwrap();
}

#[test]
fn import_replaces_previous_contents() {
    let (backend, _path, _dir) = populated_backend("dc=x", &["dc=x", "ou=old,dc=x"]);

    let ldif = "dn: dc=x\nobjectClass: domain\n\ndn: ou=new,dc=x\nobjectClass: organizationalUnit\n";
    backend.import_ldif(&mut ldif.as_bytes()).unwrap();

    assert!(!backend.entry_exists(&dn("ou=old,dc=x")).unwrap());
    assert!(backend.entry_exists(&dn("ou=new,dc=x")).unwrap());
    backend.verify_tree().unwrap();
}

#[test]
fn dump_file_tracks_memory_across_mutations() {
    let (backend, path, _dir) = temp_backend("dc=x");
    backend.add_entry(entry("dc=x", &[("objectClass", "domain")])).unwrap();
    backend
        .add_entry(entry("ou=p,dc=x", &[("objectClass", "organizationalUnit")]))
        .unwrap();
    backend
        .add_entry(entry("cn=a,ou=p,dc=x", &[("objectClass", "person")]))
        .unwrap();
    backend
        .rename_entry(
            &dn("ou=p,dc=x"),
            entry("ou=q,dc=x", &[("objectClass", "organizationalUnit")]),
            false,
        )
        .unwrap();
    backend.delete_entry(&dn("cn=a,ou=q,dc=x"), false).unwrap();

    // At quiescence the dump equals a fresh emission of the tree.
    let mut exported = Vec::new();
    backend.export_ldif(&mut exported).unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        String::from_utf8(exported).unwrap()
    );
}

#[test]
fn open_loads_previous_dump() {
    let (first, path, dir) = populated_backend("dc=x", &["dc=x", "ou=p,dc=x", "cn=a,ou=p,dc=x"]);
    let expected = all_dns(&first);
    drop(first);

    let config = LdifBackendConfig::new(&[dn("dc=x")], &path).unwrap();
    let reopened = ldifdb::backend::LdifBackend::open(config).unwrap();
    assert_eq!(all_dns(&reopened), expected);
    reopened.verify_tree().unwrap();
    drop(dir);
}

#[test]
fn open_with_missing_file_is_empty() {
    let dir = tempfile::TempDir::new().unwrap();
    let config =
        LdifBackendConfig::new(&[dn("dc=x")], dir.path().join("absent.ldif")).unwrap();
    let backend = ldifdb::backend::LdifBackend::open(config).unwrap();
    assert_eq!(backend.entry_count(), 0);
}

#[test]
fn finalize_refuses_further_operations() {
    let (backend, _path, _dir) = populated_backend("dc=x", &["dc=x"]);
    backend.finalize();

    let err = backend.get_entry(&dn("dc=x")).unwrap_err();
    let ldifdb::Error::Backend(backend_err) = &err else {
        panic!("unexpected error: {err}");
    };
    assert!(backend_err.is_unwilling());
    assert!(backend.add_entry(entry("ou=p,dc=x", &[])).is_err());
}

#[test]
fn live_reconfiguration_rules() {
    let (backend, path, dir) = populated_backend("dc=x", &["dc=x"]);

    // Same file, toggled private flag: accepted and visible atomically.
    let updated = LdifBackendConfig::new(&[dn("dc=x")], &path)
        .unwrap()
        .with_private_backend(true);
    backend.apply_config(updated).unwrap();
    assert!(backend.config().is_private_backend());

    // A different dump path requires a restart.
    let moved = LdifBackendConfig::new(&[dn("dc=x")], dir.path().join("other.ldif")).unwrap();
    assert!(backend.apply_config(moved).is_err());

    // So does a different base DN.
    let rebased = LdifBackendConfig::new(&[dn("dc=y")], &path).unwrap();
    assert!(backend.apply_config(rebased).is_err());
}

#[test]
fn backup_and_restore_are_refused() {
    let (backend, _path, dir) = populated_backend("dc=x", &["dc=x"]);
    assert!(backend.create_backup(dir.path()).is_err());
    assert!(backend.restore_backup(dir.path()).is_err());
}

#[test]
fn supported_controls_advertise_subtree_delete() {
    let (backend, _path, _dir) = temp_backend("dc=x");
    assert!(
        backend
            .supported_controls()
            .contains(&ldifdb::backend::SUBTREE_DELETE_CONTROL_OID)
    );
    assert!(!backend.supported_features().is_empty());
}
