//! Distinguished name value type used throughout ldifdb.
//!
//! A `Dn` is an ordered sequence of RDN components, leaf-first: the DN
//! `cn=a,ou=p,dc=x` has components `["cn=a", "ou=p", "dc=x"]`. The empty
//! sequence is the root DN. Equality, ordering, and hashing operate on a
//! normalized form (lowercased, whitespace trimmed around `=` and between
//! components) so that comparison is case-insensitive per LDAP rules, while
//! the original spelling is preserved for display and emission.

use std::fmt;
use std::hash::{Hash, Hasher};

use thiserror::Error;

/// Errors that can occur while parsing or manipulating DNs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DnError {
    /// A DN contained an empty RDN component (e.g. `cn=a,,dc=x`).
    #[error("empty RDN component in DN: {dn}")]
    EmptyComponent {
        /// The offending DN string as supplied
        dn: String,
    },

    /// An RDN component was not of the form `attribute=value`.
    #[error("RDN component is not of the form attribute=value: {component}")]
    MalformedComponent {
        /// The offending component
        component: String,
    },
}

impl From<DnError> for crate::Error {
    fn from(err: DnError) -> Self {
        crate::Error::Dn(err)
    }
}

/// A distinguished name: a hierarchical identifier for a directory entry.
///
/// `Dn` is a value type. Cloning is cheap enough to treat DNs as keys in the
/// store's indexes, and all comparison traits use the normalized form so two
/// spellings of the same name collide as LDAP requires:
///
/// ```
/// # use ldifdb::Dn;
/// let a = Dn::parse("CN=Directory Manager, dc=Example, dc=Com").unwrap();
/// let b = Dn::parse("cn=directory manager,dc=example,dc=com").unwrap();
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone)]
pub struct Dn {
    /// RDN components as supplied (trimmed), leaf-first.
    components: Vec<String>,
    /// Normalized components, leaf-first. All comparisons use these.
    norm: Vec<String>,
}

impl Dn {
    /// The root DN: the empty sequence of components.
    pub fn root() -> Self {
        Dn {
            components: Vec::new(),
            norm: Vec::new(),
        }
    }

    /// Parses a DN from its string representation.
    ///
    /// Components are separated by unescaped commas; `\,` within a value is
    /// kept as part of the component. The empty string parses to the root DN.
    pub fn parse(s: &str) -> Result<Self, DnError> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Dn::root());
        }

        let mut components = Vec::new();
        let mut norm = Vec::new();
        for raw in split_unescaped_commas(s) {
            let raw = raw.trim();
            if raw.is_empty() {
                return Err(DnError::EmptyComponent { dn: s.to_string() });
            }
            let Some((attr, value)) = raw.split_once('=') else {
                return Err(DnError::MalformedComponent {
                    component: raw.to_string(),
                });
            };
            let attr = attr.trim();
            let value = value.trim();
            if attr.is_empty() {
                return Err(DnError::MalformedComponent {
                    component: raw.to_string(),
                });
            }
            components.push(format!("{attr}={value}"));
            norm.push(format!(
                "{}={}",
                attr.to_ascii_lowercase(),
                value.to_ascii_lowercase()
            ));
        }

        Ok(Dn { components, norm })
    }

    /// Returns true if this is the root DN.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Number of RDN components.
    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    /// The leaf RDN component, or `None` for the root DN.
    pub fn rdn(&self) -> Option<&str> {
        self.components.first().map(String::as_str)
    }

    /// The DN one component shorter, or `None` for the root DN.
    ///
    /// The parent of a single-component DN is the root DN.
    pub fn parent(&self) -> Option<Dn> {
        if self.is_root() {
            return None;
        }
        Some(Dn {
            components: self.components[1..].to_vec(),
            norm: self.norm[1..].to_vec(),
        })
    }

    /// Returns true if `self` is a strict ancestor (prefix) of `other`.
    ///
    /// A DN is not its own ancestor; use [`Dn::is_ancestor_or_equal`] for
    /// the inclusive check.
    pub fn is_ancestor_of(&self, other: &Dn) -> bool {
        let n = self.norm.len();
        let m = other.norm.len();
        m > n && other.norm[m - n..] == self.norm[..]
    }

    /// Returns true if `self` equals `other` or is a strict ancestor of it.
    pub fn is_ancestor_or_equal(&self, other: &Dn) -> bool {
        self == other || self.is_ancestor_of(other)
    }

    /// Returns true if `self` is a strict descendant of `other`.
    pub fn is_descendant_of(&self, other: &Dn) -> bool {
        other.is_ancestor_of(self)
    }

    /// Builds a child DN by prepending one RDN component to `self`.
    pub fn child(&self, rdn: &str) -> Result<Dn, DnError> {
        let child = if self.is_root() {
            Dn::parse(rdn)?
        } else {
            Dn::parse(&format!("{rdn},{self}"))?
        };
        Ok(child)
    }

    /// Re-keys `self` from one base to another, preserving the components
    /// relative to the old base. Used when a subtree is renamed: every
    /// descendant's DN has its `old_base` suffix replaced by `new_base`.
    ///
    /// Returns `None` when `self` is not equal to or subordinate to
    /// `old_base`.
    pub fn rebase(&self, old_base: &Dn, new_base: &Dn) -> Option<Dn> {
        if !old_base.is_ancestor_or_equal(self) {
            return None;
        }
        let keep = self.norm.len() - old_base.norm.len();
        let mut components = self.components[..keep].to_vec();
        let mut norm = self.norm[..keep].to_vec();
        components.extend_from_slice(&new_base.components);
        norm.extend_from_slice(&new_base.norm);
        Some(Dn { components, norm })
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Dn) -> bool {
        self.norm == other.norm
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.norm.hash(state);
    }
}

impl PartialOrd for Dn {
    fn partial_cmp(&self, other: &Dn) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Dn {
    fn cmp(&self, other: &Dn) -> std::cmp::Ordering {
        self.norm.cmp(&other.norm)
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join(","))
    }
}

/// Splits a DN string on commas, honoring `\,` escapes.
fn split_unescaped_commas(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;
    for (i, ch) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            ',' => {
                parts.push(&s[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&s[start..]);
    parts
}
