//! Lazy entry stream over a parsed template.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use rand::{Rng, SeedableRng, rngs::StdRng};

use super::{
    errors::TemplateError,
    template::{Branch, EntryTemplate, TemplateFile, Token, ValueTemplate},
};
use crate::{dn::Dn, entry::Entry};

/// Fallbacks used when the name resource files are not available.
const BUILTIN_FIRST_NAMES: &[&str] = &[
    "Aaren", "Bela", "Chin", "Darcee", "Eladia", "Farrah", "Gerda", "Hana", "Ileana", "Jacki",
    "Kai", "Lanae", "Mady", "Noe", "Oralee", "Page",
];
const BUILTIN_LAST_NAMES: &[&str] = &[
    "Aalders", "Babineau", "Cadieux", "Daigle", "Eagleson", "Fagan", "Gagnon", "Haas", "Iannuzzi",
    "Jablonski", "Kaak", "Labonte", "Maas", "Nadeau", "Oberg", "Paas",
];

/// Construction-time toggles for the generator.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Directory holding the name resource files; built-in name lists are
    /// used when unset or when a file is missing.
    pub resource_path: Option<PathBuf>,
    /// Seed for the deterministic random value stream.
    pub random_seed: u64,
    /// Constant overrides, applied over the template's `define` lines.
    pub constants: Vec<(String, String)>,
    /// Whether branch entries themselves are emitted, in addition to the
    /// template-generated entries beneath them.
    pub generate_branch_entries: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            resource_path: None,
            random_seed: 0,
            constants: Vec::new(),
            generate_branch_entries: true,
        }
    }
}

enum WorkItem {
    Branch(Branch),
    Run {
        template: String,
        parent: Dn,
        remaining: u64,
    },
}

/// A lazy, finite, non-restartable stream of generated entries.
///
/// Constructing the generator parses the template, resolves resources and
/// accumulates warnings; iteration itself cannot fail. Entries come out
/// parent-before-child: each branch precedes the entries generated under
/// it, so the stream can be fed straight into a bulk load.
pub struct EntryGenerator {
    rng: StdRng,
    templates: IndexMap<String, EntryTemplate>,
    first_names: Vec<String>,
    last_names: Vec<String>,
    warnings: Vec<String>,
    queue: VecDeque<WorkItem>,
    sequences: HashMap<String, u64>,
}

impl EntryGenerator {
    /// Builds a generator from a template file.
    pub fn new(template_path: &Path, options: GeneratorOptions) -> Result<Self, TemplateError> {
        let source = std::fs::read_to_string(template_path).map_err(|e| TemplateError::Io {
            path: template_path.to_path_buf(),
            source: e,
        })?;
        Self::from_template_str(&source, options)
    }

    /// Builds a generator from template source text.
    pub fn from_template_str(
        source: &str,
        options: GeneratorOptions,
    ) -> Result<Self, TemplateError> {
        let mut warnings = Vec::new();
        let parsed = TemplateFile::parse(source, &options.constants, &mut warnings)?;

        let first_names = load_names(
            options.resource_path.as_deref(),
            "first.names",
            BUILTIN_FIRST_NAMES,
            &mut warnings,
        );
        let last_names = load_names(
            options.resource_path.as_deref(),
            "last.names",
            BUILTIN_LAST_NAMES,
            &mut warnings,
        );

        let mut queue = VecDeque::new();
        for branch in parsed.branches {
            let subordinates = branch.subordinates.clone();
            let parent = branch.dn.clone();
            if options.generate_branch_entries {
                queue.push_back(WorkItem::Branch(branch));
            }
            for (template, count) in subordinates {
                queue.push_back(WorkItem::Run {
                    template,
                    parent: parent.clone(),
                    remaining: count,
                });
            }
        }

        Ok(EntryGenerator {
            rng: StdRng::seed_from_u64(options.random_seed),
            templates: parsed.templates,
            first_names,
            last_names,
            warnings,
            queue,
            sequences: HashMap::new(),
        })
    }

    /// Non-fatal template issues found during construction.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    fn branch_entry(&mut self, branch: Branch) -> Entry {
        let mut entry = Entry::new(branch.dn.clone());

        let has_object_class = branch
            .attrs
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("objectClass"));
        let rdn = branch.dn.rdn().unwrap_or_default();
        let (rdn_attr, rdn_value) = rdn.split_once('=').unwrap_or((rdn, ""));
        if !has_object_class {
            entry.add_value("objectClass", object_class_for(rdn_attr));
        }
        entry.add_value(rdn_attr, rdn_value);
        for (name, value) in &branch.attrs {
            let rendered = render(
                value,
                &entry,
                0,
                &mut self.rng,
                &self.first_names,
                &self.last_names,
            );
            entry.add_value(name, rendered);
        }
        entry
    }

    fn template_entry(&mut self, name: &str, parent: &Dn) -> Option<Entry> {
        let template = self.templates.get(name)?.clone();
        let seq_no = {
            let counter = self.sequences.entry(name.to_string()).or_insert(0);
            let current = *counter;
            *counter += 1;
            current
        };

        // Attributes render in declaration order against the entry built
        // so far, which is what makes {attr} back-references work.
        let mut entry = Entry::new(parent.clone());
        for (attr, value) in &template.attrs {
            let rendered = render(
                value,
                &entry,
                seq_no,
                &mut self.rng,
                &self.first_names,
                &self.last_names,
            );
            entry.add_value(attr, rendered);
        }

        let rdn_value = entry
            .first_value(&template.rdn_attr)
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .unwrap_or_default();
        let rdn = format!("{}={}", template.rdn_attr, escape_rdn_value(&rdn_value));
        let dn = parent.child(&rdn).ok()?;
        entry.set_dn(dn);
        Some(entry)
    }
}

impl Iterator for EntryGenerator {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        loop {
            match self.queue.front_mut() {
                None => return None,
                Some(WorkItem::Branch(_)) => {
                    let Some(WorkItem::Branch(branch)) = self.queue.pop_front() else {
                        unreachable!()
                    };
                    return Some(self.branch_entry(branch));
                }
                Some(WorkItem::Run { remaining: 0, .. }) => {
                    self.queue.pop_front();
                }
                Some(WorkItem::Run {
                    template,
                    parent,
                    remaining,
                }) => {
                    *remaining -= 1;
                    let (template, parent) = (template.clone(), parent.clone());
                    if let Some(entry) = self.template_entry(&template, &parent) {
                        return Some(entry);
                    }
                }
            }
        }
    }
}

fn load_names(
    resource_path: Option<&Path>,
    file_name: &str,
    builtin: &[&str],
    warnings: &mut Vec<String>,
) -> Vec<String> {
    if let Some(dir) = resource_path {
        let path = dir.join(file_name);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let names: Vec<String> = content
                    .lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect();
                if !names.is_empty() {
                    return names;
                }
                warnings.push(format!("{} is empty; using built-in names", path.display()));
            }
            Err(e) => {
                warnings.push(format!(
                    "cannot read {}: {e}; using built-in names",
                    path.display()
                ));
            }
        }
    }
    builtin.iter().map(|s| s.to_string()).collect()
}

fn render(
    value: &ValueTemplate,
    entry: &Entry,
    seq_no: u64,
    rng: &mut StdRng,
    first_names: &[String],
    last_names: &[String],
) -> String {
    let mut out = String::new();
    for token in &value.tokens {
        match token {
            Token::Literal(text) => out.push_str(text),
            Token::First => out.push_str(pick(rng, first_names)),
            Token::Last => out.push_str(pick(rng, last_names)),
            Token::Sequence => out.push_str(&seq_no.to_string()),
            Token::RandomAlpha(len) => {
                for _ in 0..*len {
                    out.push((b'a' + rng.gen_range(0..26)) as char);
                }
            }
            Token::RandomNumeric(len) => {
                for _ in 0..*len {
                    out.push((b'0' + rng.gen_range(0..10)) as char);
                }
            }
            Token::AttrRef(attr) => {
                if let Some(v) = entry.first_value(attr) {
                    out.push_str(&String::from_utf8_lossy(v));
                }
            }
        }
    }
    out
}

fn pick<'a>(rng: &mut StdRng, names: &'a [String]) -> &'a str {
    &names[rng.gen_range(0..names.len())]
}

/// Escapes characters that would split or malform an RDN.
fn escape_rdn_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, ',' | '\\' | '+') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Default object class for a branch, inferred from its RDN attribute.
fn object_class_for(rdn_attr: &str) -> &'static str {
    match rdn_attr.to_ascii_lowercase().as_str() {
        "dc" => "domain",
        "ou" => "organizationalUnit",
        "o" => "organization",
        "c" => "country",
        _ => "top",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "\
define suffix=dc=example,dc=com

branch: [suffix]

branch: ou=People,[suffix]
subordinateTemplate: person:3

template: person
rdnAttr: uid
objectClass: inetOrgPerson
givenName: <first>
sn: <last>
cn: {givenName} {sn}
uid: user.<sequence>
mail: {uid}@example.com
telephoneNumber: <random:numeric:10>
";

    fn generate(options: GeneratorOptions) -> (Vec<Entry>, Vec<String>) {
        let generator = EntryGenerator::from_template_str(TEMPLATE, options).unwrap();
        let warnings = generator.warnings().to_vec();
        (generator.collect(), warnings)
    }

    #[test]
    fn test_branches_precede_template_entries() {
        let (entries, warnings) = generate(GeneratorOptions::default());
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].dn(), &Dn::parse("dc=example,dc=com").unwrap());
        assert_eq!(
            entries[1].dn(),
            &Dn::parse("ou=People,dc=example,dc=com").unwrap()
        );
        assert_eq!(
            entries[2].dn(),
            &Dn::parse("uid=user.0,ou=People,dc=example,dc=com").unwrap()
        );
        assert_eq!(
            entries[4].dn(),
            &Dn::parse("uid=user.2,ou=People,dc=example,dc=com").unwrap()
        );
    }

    #[test]
    fn test_branch_entry_shape() {
        let (entries, _) = generate(GeneratorOptions::default());
        let root = &entries[0];
        assert_eq!(root.first_value("objectClass"), Some(b"domain".as_slice()));
        assert_eq!(root.first_value("dc"), Some(b"example".as_slice()));
        let people = &entries[1];
        assert_eq!(
            people.first_value("objectClass"),
            Some(b"organizationalUnit".as_slice())
        );
    }

    #[test]
    fn test_attr_back_references() {
        let (entries, _) = generate(GeneratorOptions::default());
        let person = &entries[2];
        let given = String::from_utf8(person.first_value("givenName").unwrap().to_vec()).unwrap();
        let sn = String::from_utf8(person.first_value("sn").unwrap().to_vec()).unwrap();
        let cn = String::from_utf8(person.first_value("cn").unwrap().to_vec()).unwrap();
        assert_eq!(cn, format!("{given} {sn}"));
        assert_eq!(
            person.first_value("mail"),
            Some(b"user.0@example.com".as_slice())
        );
        let phone = person.first_value("telephoneNumber").unwrap();
        assert_eq!(phone.len(), 10);
        assert!(phone.iter().all(u8::is_ascii_digit));
    }

    #[test]
    fn test_same_seed_same_stream() {
        let (a, _) = generate(GeneratorOptions {
            random_seed: 7,
            ..GeneratorOptions::default()
        });
        let (b, _) = generate(GeneratorOptions {
            random_seed: 7,
            ..GeneratorOptions::default()
        });
        assert_eq!(a, b);

        let (c, _) = generate(GeneratorOptions {
            random_seed: 8,
            ..GeneratorOptions::default()
        });
        assert_ne!(a, c);
    }

    #[test]
    fn test_branch_entries_can_be_suppressed() {
        let (entries, _) = generate(GeneratorOptions {
            generate_branch_entries: false,
            ..GeneratorOptions::default()
        });
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.has_attribute("uid")));
    }

    #[test]
    fn test_constant_override() {
        let generator = EntryGenerator::from_template_str(
            TEMPLATE,
            GeneratorOptions {
                constants: vec![("suffix".to_string(), "o=corp".to_string())],
                ..GeneratorOptions::default()
            },
        )
        .unwrap();
        let entries: Vec<Entry> = generator.collect();
        assert_eq!(entries[0].dn(), &Dn::parse("o=corp").unwrap());
    }

    #[test]
    fn test_resource_files_override_builtins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("first.names"), "Only\n").unwrap();
        std::fs::write(dir.path().join("last.names"), "Name\n").unwrap();
        let (entries, warnings) = generate(GeneratorOptions {
            resource_path: Some(dir.path().to_path_buf()),
            ..GeneratorOptions::default()
        });
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(entries[2].first_value("cn"), Some(b"Only Name".as_slice()));
    }

    #[test]
    fn test_missing_resource_file_warns_and_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let (entries, warnings) = generate(GeneratorOptions {
            resource_path: Some(dir.path().to_path_buf()),
            ..GeneratorOptions::default()
        });
        assert_eq!(warnings.len(), 2);
        assert_eq!(entries.len(), 5);
    }

    #[test]
    fn test_rdn_value_escaping() {
        let source = "\
branch: dc=x

branch: ou=p,dc=x
subordinateTemplate: odd:1

template: odd
rdnAttr: cn
cn: Doe, John
";
        let generator =
            EntryGenerator::from_template_str(source, GeneratorOptions::default()).unwrap();
        let entries: Vec<Entry> = generator.collect();
        let odd = entries.last().unwrap();
        assert_eq!(odd.dn().rdn(), Some("cn=Doe\\, John"));
        assert_eq!(odd.dn().parent().unwrap(), Dn::parse("ou=p,dc=x").unwrap());
    }
}
