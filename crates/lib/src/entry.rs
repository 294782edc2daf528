//! Directory entry value type.
//!
//! An `Entry` pairs a DN with an attribute multimap: attribute description
//! to an ordered multiset of binary values. Entries are plain values: the
//! store never shares storage with a caller, it hands out clones, so a
//! returned entry cannot be used to mutate the store and a stored entry
//! cannot observe later mutation by the caller.

use indexmap::IndexMap;

use crate::{dn::Dn, filter::Filter};

/// A single attribute: its description plus the values held under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Attribute description with the spelling first seen, preserved for
    /// emission.
    pub name: String,
    /// Values in insertion order. Duplicates are allowed.
    pub values: Vec<Vec<u8>>,
}

/// A directory entry: a DN plus its attributes.
///
/// Attribute lookup is case-insensitive on the description; attribute and
/// value order are preserved so LDIF emission is stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    dn: Dn,
    /// Keyed by the lowercased attribute description.
    attributes: IndexMap<String, Attribute>,
}

impl Entry {
    /// Creates an entry with the given DN and no attributes.
    pub fn new(dn: Dn) -> Self {
        Entry {
            dn,
            attributes: IndexMap::new(),
        }
    }

    /// The entry's DN.
    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    /// Replaces the entry's DN. Used when a rename re-keys a subtree.
    pub fn set_dn(&mut self, dn: Dn) {
        self.dn = dn;
    }

    /// Appends one value to the named attribute, creating it if absent.
    pub fn add_value(&mut self, name: &str, value: impl Into<Vec<u8>>) {
        let key = name.to_ascii_lowercase();
        self.attributes
            .entry(key)
            .or_insert_with(|| Attribute {
                name: name.to_string(),
                values: Vec::new(),
            })
            .values
            .push(value.into());
    }

    /// Replaces all values of the named attribute. An empty value list
    /// removes the attribute.
    pub fn put_values(&mut self, name: &str, values: Vec<Vec<u8>>) {
        let key = name.to_ascii_lowercase();
        if values.is_empty() {
            self.attributes.shift_remove(&key);
            return;
        }
        match self.attributes.get_mut(&key) {
            Some(attr) => attr.values = values,
            None => {
                self.attributes.insert(
                    key,
                    Attribute {
                        name: name.to_string(),
                        values,
                    },
                );
            }
        }
    }

    /// Looks up an attribute by description, case-insensitively.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(&name.to_ascii_lowercase())
    }

    /// Returns true if the named attribute is present.
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(&name.to_ascii_lowercase())
    }

    /// The first value of the named attribute, if any.
    pub fn first_value(&self, name: &str) -> Option<&[u8]> {
        self.attribute(name)
            .and_then(|attr| attr.values.first())
            .map(Vec::as_slice)
    }

    /// Iterates attributes in insertion order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    /// Number of attributes on the entry.
    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// Evaluates a search filter against this entry.
    pub fn matches(&self, filter: &Filter) -> bool {
        filter.matches(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dn(s: &str) -> Dn {
        Dn::parse(s).unwrap()
    }

    #[test]
    fn test_case_insensitive_attribute_access() {
        let mut e = Entry::new(dn("cn=a,dc=x"));
        e.add_value("objectClass", "person");
        e.add_value("OBJECTCLASS", "top");

        let attr = e.attribute("objectclass").unwrap();
        assert_eq!(attr.name, "objectClass");
        assert_eq!(attr.values.len(), 2);
        assert!(e.has_attribute("ObjectClass"));
    }

    #[test]
    fn test_put_values_replaces() {
        let mut e = Entry::new(dn("cn=a,dc=x"));
        e.add_value("mail", "a@x");
        e.put_values("mail", vec![b"b@x".to_vec()]);
        assert_eq!(e.first_value("mail"), Some(b"b@x".as_slice()));

        e.put_values("mail", Vec::new());
        assert!(!e.has_attribute("mail"));
    }

    #[test]
    fn test_clone_is_deep() {
        let mut original = Entry::new(dn("cn=a,dc=x"));
        original.add_value("cn", "a");

        let mut copy = original.clone();
        copy.add_value("cn", "b");
        copy.add_value("sn", "c");

        assert_eq!(original.attribute("cn").unwrap().values.len(), 1);
        assert!(!original.has_attribute("sn"));
    }
}
