//! Template file parser.
//!
//! The parser runs once during generator construction. It resolves
//! constants textually, splits the file into blank-line-separated blocks,
//! and compiles attribute values into token sequences so generation is a
//! straight interpretation pass with no further string scanning.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;

use super::errors::TemplateError;
use crate::dn::Dn;

/// One compiled substitution token of an attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    /// Verbatim text.
    Literal(String),
    /// `<first>`: a random first name.
    First,
    /// `<last>`: a random last name.
    Last,
    /// `<sequence>`: the per-template entry counter.
    Sequence,
    /// `<random:alpha:N>`: N random lowercase letters.
    RandomAlpha(usize),
    /// `<random:numeric:N>`: N random digits.
    RandomNumeric(usize),
    /// `{attr}`: the first value generated for `attr` in this entry.
    AttrRef(String),
}

/// A compiled attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ValueTemplate {
    pub(crate) tokens: Vec<Token>,
}

/// A `branch:` block.
#[derive(Debug, Clone)]
pub(crate) struct Branch {
    pub(crate) dn: Dn,
    pub(crate) attrs: Vec<(String, ValueTemplate)>,
    /// Template name (lowercased) and entry count, in declaration order.
    pub(crate) subordinates: Vec<(String, u64)>,
}

/// A `template:` block.
#[derive(Debug, Clone)]
pub(crate) struct EntryTemplate {
    pub(crate) name: String,
    pub(crate) rdn_attr: String,
    pub(crate) attrs: Vec<(String, ValueTemplate)>,
}

/// The parsed template file.
#[derive(Debug, Clone)]
pub(crate) struct TemplateFile {
    pub(crate) branches: Vec<Branch>,
    /// Keyed by lowercased template name.
    pub(crate) templates: IndexMap<String, EntryTemplate>,
}

impl TemplateFile {
    /// Parses a template source. `constants` are the caller-supplied
    /// overrides; they win over `define` lines of the same name.
    /// Non-fatal issues are appended to `warnings`.
    pub(crate) fn parse(
        source: &str,
        constants: &[(String, String)],
        warnings: &mut Vec<String>,
    ) -> Result<TemplateFile, TemplateError> {
        let mut consts: HashMap<String, String> = HashMap::new();
        let mut overridden: HashSet<String> = HashSet::new();
        for (name, value) in constants {
            let key = name.to_ascii_lowercase();
            consts.insert(key.clone(), value.clone());
            overridden.insert(key);
        }

        let mut branches = Vec::new();
        let mut templates: IndexMap<String, EntryTemplate> = IndexMap::new();

        // Current block accumulator: (start line, lines).
        let mut block: Vec<(u64, String)> = Vec::new();
        let mut line_no = 0u64;
        for raw in source.lines().chain(std::iter::once("")) {
            line_no += 1;
            let line = raw.trim_end();
            if line.trim_start().starts_with('#') {
                continue;
            }
            if line.trim().is_empty() {
                if !block.is_empty() {
                    parse_block(&block, &mut branches, &mut templates, warnings)?;
                    block.clear();
                }
                continue;
            }

            if let Some(rest) = line.strip_prefix("define ") {
                let Some((name, value)) = rest.split_once('=') else {
                    return Err(TemplateError::Syntax {
                        line: line_no,
                        reason: format!("define line is not NAME=VALUE: {line}"),
                    });
                };
                let key = name.trim().to_ascii_lowercase();
                if !overridden.contains(&key) {
                    consts.insert(key, value.trim().to_string());
                }
                continue;
            }

            block.push((line_no, substitute_constants(line, &consts, warnings)));
        }

        if branches.is_empty() {
            return Err(TemplateError::NoBranches);
        }

        // Subordinate references can point at templates declared later, so
        // validate after the whole file is read.
        for branch in &mut branches {
            branch.subordinates.retain(|(name, _)| {
                let known = templates.contains_key(name);
                if !known {
                    warnings.push(format!(
                        "branch {} references undefined template {name}; skipped",
                        branch.dn
                    ));
                }
                known
            });
        }
        Ok(TemplateFile {
            branches,
            templates,
        })
    }
}

/// Expands `[name]` constant references in one line. Unknown constants
/// are kept literally with a warning.
fn substitute_constants(
    line: &str,
    consts: &HashMap<String, String>,
    warnings: &mut Vec<String>,
) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(open) = rest.find('[') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find(']') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        match consts.get(&name.to_ascii_lowercase()) {
            Some(value) => out.push_str(value),
            None => {
                warnings.push(format!("undefined constant [{name}]"));
                out.push_str(&rest[open..open + close + 2]);
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn parse_block(
    block: &[(u64, String)],
    branches: &mut Vec<Branch>,
    templates: &mut IndexMap<String, EntryTemplate>,
    warnings: &mut Vec<String>,
) -> Result<(), TemplateError> {
    let (first_line_no, first) = &block[0];
    if let Some(dn_str) = first.strip_prefix("branch:") {
        let dn = Dn::parse(dn_str.trim()).map_err(|e| TemplateError::Syntax {
            line: *first_line_no,
            reason: format!("invalid branch DN: {e}"),
        })?;
        branches.push(parse_branch(dn, &block[1..], warnings)?);
        return Ok(());
    }
    if let Some(name) = first.strip_prefix("template:") {
        let template = parse_template(name.trim(), &block[1..], warnings)?;
        templates.insert(template.name.to_ascii_lowercase(), template);
        return Ok(());
    }
    Err(TemplateError::Syntax {
        line: *first_line_no,
        reason: format!("block must start with branch: or template:, got: {first}"),
    })
}

fn parse_branch(
    dn: Dn,
    lines: &[(u64, String)],
    warnings: &mut Vec<String>,
) -> Result<Branch, TemplateError> {
    let mut attrs = Vec::new();
    let mut subordinates = Vec::new();
    for (line_no, line) in lines {
        let (name, value) = split_attr_line(line, *line_no)?;
        if name.eq_ignore_ascii_case("subordinateTemplate") {
            let Some((template, count)) = value.rsplit_once(':') else {
                return Err(TemplateError::Syntax {
                    line: *line_no,
                    reason: format!("subordinateTemplate is not name:count: {value}"),
                });
            };
            let count: u64 = count.trim().parse().map_err(|_| TemplateError::Syntax {
                line: *line_no,
                reason: format!("invalid subordinate entry count: {count}"),
            })?;
            subordinates.push((template.trim().to_ascii_lowercase(), count));
        } else {
            attrs.push((name, compile_value(value, warnings)));
        }
    }
    Ok(Branch {
        dn,
        attrs,
        subordinates,
    })
}

fn parse_template(
    name: &str,
    lines: &[(u64, String)],
    warnings: &mut Vec<String>,
) -> Result<EntryTemplate, TemplateError> {
    if name.is_empty() {
        return Err(TemplateError::Syntax {
            line: lines.first().map_or(0, |(n, _)| n.saturating_sub(1)),
            reason: "template block has no name".to_string(),
        });
    }
    let mut rdn_attr: Option<String> = None;
    let mut attrs: Vec<(String, ValueTemplate)> = Vec::new();
    for (line_no, line) in lines {
        let (attr, value) = split_attr_line(line, *line_no)?;
        if attr.eq_ignore_ascii_case("rdnAttr") {
            rdn_attr = Some(value.trim().to_string());
            continue;
        }
        let compiled = compile_value(value, warnings);
        // Back-references must point at attributes generated earlier.
        for token in &compiled.tokens {
            if let Token::AttrRef(referenced) = token
                && !attrs
                    .iter()
                    .any(|(a, _)| a.eq_ignore_ascii_case(referenced))
            {
                warnings.push(format!(
                    "template {name}: {{{referenced}}} is not generated before {attr}"
                ));
            }
        }
        attrs.push((attr, compiled));
    }

    let rdn_attr = rdn_attr.ok_or_else(|| TemplateError::MissingRdnAttr {
        name: name.to_string(),
    })?;
    if !attrs.iter().any(|(a, _)| a.eq_ignore_ascii_case(&rdn_attr)) {
        return Err(TemplateError::RdnAttrNotGenerated {
            name: name.to_string(),
            attr: rdn_attr,
        });
    }
    Ok(EntryTemplate {
        name: name.to_string(),
        rdn_attr,
        attrs,
    })
}

fn split_attr_line(line: &str, line_no: u64) -> Result<(String, &str), TemplateError> {
    let Some((name, value)) = line.split_once(':') else {
        return Err(TemplateError::Syntax {
            line: line_no,
            reason: format!("attribute line has no ':' separator: {line}"),
        });
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(TemplateError::Syntax {
            line: line_no,
            reason: "attribute line has an empty name".to_string(),
        });
    }
    Ok((name.to_string(), value.trim()))
}

/// Compiles one attribute value into tokens. Unknown `<...>` tokens stay
/// literal with a warning.
fn compile_value(value: &str, warnings: &mut Vec<String>) -> ValueTemplate {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut rest = value;

    while let Some(open) = rest.find(['<', '{']) {
        literal.push_str(&rest[..open]);
        let delim = rest.as_bytes()[open];
        let closer = if delim == b'<' { '>' } else { '}' };
        let after = &rest[open + 1..];
        let Some(close) = after.find(closer) else {
            literal.push_str(&rest[open..]);
            rest = "";
            break;
        };
        let inner = &after[..close];
        let token = if delim == b'{' {
            Some(Token::AttrRef(inner.trim().to_ascii_lowercase()))
        } else {
            parse_angle_token(inner)
        };
        match token {
            Some(token) => {
                if !literal.is_empty() {
                    tokens.push(Token::Literal(std::mem::take(&mut literal)));
                }
                tokens.push(token);
            }
            None => {
                warnings.push(format!("unknown substitution token <{inner}>"));
                literal.push_str(&rest[open..open + close + 2]);
            }
        }
        rest = &after[close + 1..];
    }
    literal.push_str(rest);
    if !literal.is_empty() {
        tokens.push(Token::Literal(literal));
    }
    ValueTemplate { tokens }
}

fn parse_angle_token(inner: &str) -> Option<Token> {
    match inner.to_ascii_lowercase().as_str() {
        "first" => Some(Token::First),
        "last" => Some(Token::Last),
        "sequence" => Some(Token::Sequence),
        other => {
            let mut parts = other.split(':');
            if parts.next() != Some("random") {
                return None;
            }
            let kind = parts.next()?;
            let len: usize = parts.next()?.trim().parse().ok()?;
            if parts.next().is_some() {
                return None;
            }
            match kind {
                "alpha" => Some(Token::RandomAlpha(len)),
                "numeric" => Some(Token::RandomNumeric(len)),
                _ => None,
            }
        }
    }
}
