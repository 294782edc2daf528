//! Template-driven sample data generator (MakeLDIF).
//!
//! A template file describes a hierarchy of branches and the entry
//! templates that populate them; the generator turns it into a lazy,
//! finite stream of entries. Generation is deterministic for a given
//! random seed. Non-fatal template problems are collected as warnings
//! during construction; unrecoverable ones fail construction.
//!
//! ## Template grammar
//!
//! Blocks are separated by blank lines; `#` starts a comment line.
//!
//! ```text
//! define suffix=dc=example,dc=com
//!
//! branch: [suffix]
//! objectClass: domain
//!
//! branch: ou=People,[suffix]
//! subordinateTemplate: person:100
//!
//! template: person
//! rdnAttr: uid
//! objectClass: inetOrgPerson
//! givenName: <first>
//! sn: <last>
//! cn: {givenName} {sn}
//! uid: user.<sequence>
//! mail: {uid}@[suffix]
//! telephoneNumber: <random:numeric:10>
//! ```
//!
//! Value substitutions: `[name]` expands a constant (CLI-supplied
//! constants override `define` lines), `{attr}` re-uses an attribute
//! generated earlier in the same entry, `<first>`/`<last>` draw from the
//! name resource files (`first.names` / `last.names` under the resource
//! path, with built-in fallbacks), `<sequence>` is a per-template counter
//! and `<random:alpha:N>` / `<random:numeric:N>` produce random strings.
//! Unknown tokens are kept literally and reported as warnings.

mod errors;
mod generator;
mod template;

pub use errors::TemplateError;
pub use generator::{EntryGenerator, GeneratorOptions};
