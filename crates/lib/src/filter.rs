//! Search filter representation and evaluation.
//!
//! The engine evaluates filters during search with a linear scan; there are
//! no indexes. The subset implemented here covers presence, equality,
//! substring, and the boolean combinators. Matching is case-insensitive on
//! both attribute descriptions and values (caseIgnoreMatch semantics).

use thiserror::Error;

use crate::entry::Entry;

/// Errors from parsing the parenthesized filter syntax.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The filter string could not be parsed.
    #[error("invalid search filter at offset {offset}: {reason}")]
    Invalid {
        /// Byte offset of the problem
        offset: usize,
        /// What went wrong
        reason: String,
    },
}

impl From<FilterError> for crate::Error {
    fn from(err: FilterError) -> Self {
        crate::Error::Filter(err)
    }
}

/// A search filter predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `(attr=*)`: the attribute is present.
    Present(String),
    /// `(attr=value)`: some value of the attribute equals `value`.
    Equality(String, Vec<u8>),
    /// `(attr=initial*any*final)`: substring match.
    Substring {
        attr: String,
        initial: Option<Vec<u8>>,
        any: Vec<Vec<u8>>,
        fin: Option<Vec<u8>>,
    },
    /// `(&(f1)(f2)...)`: all subordinate filters match.
    And(Vec<Filter>),
    /// `(|(f1)(f2)...)`: at least one subordinate filter matches.
    Or(Vec<Filter>),
    /// `(!(f))`: the subordinate filter does not match.
    Not(Box<Filter>),
}

impl Filter {
    /// A presence filter; `Filter::present("objectClass")` is the
    /// conventional match-everything filter.
    pub fn present(attr: impl Into<String>) -> Filter {
        Filter::Present(attr.into())
    }

    /// An equality filter.
    pub fn equality(attr: impl Into<String>, value: impl Into<Vec<u8>>) -> Filter {
        Filter::Equality(attr.into(), value.into())
    }

    /// Parses the standard parenthesized string form, e.g.
    /// `(&(objectClass=person)(cn=ab*))`.
    pub fn parse(s: &str) -> Result<Filter, FilterError> {
        let bytes = s.as_bytes();
        let (filter, consumed) = parse_filter(bytes, 0)?;
        if consumed != bytes.len() {
            return Err(FilterError::Invalid {
                offset: consumed,
                reason: "trailing characters after filter".to_string(),
            });
        }
        Ok(filter)
    }

    /// Evaluates this filter against an entry.
    pub fn matches(&self, entry: &Entry) -> bool {
        match self {
            Filter::Present(attr) => entry.has_attribute(attr),
            Filter::Equality(attr, value) => entry
                .attribute(attr)
                .is_some_and(|a| a.values.iter().any(|v| eq_fold(v, value))),
            Filter::Substring {
                attr,
                initial,
                any,
                fin,
            } => entry
                .attribute(attr)
                .is_some_and(|a| a.values.iter().any(|v| substring_match(v, initial, any, fin))),
            Filter::And(parts) => parts.iter().all(|f| f.matches(entry)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(entry)),
            Filter::Not(inner) => !inner.matches(entry),
        }
    }
}

fn fold(b: u8) -> u8 {
    b.to_ascii_lowercase()
}

fn eq_fold(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| fold(*x) == fold(*y))
}

fn find_fold(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return Some(from);
    }
    if haystack.len() < needle.len() {
        return None;
    }
    (from..=haystack.len() - needle.len()).find(|&i| eq_fold(&haystack[i..i + needle.len()], needle))
}

fn substring_match(
    value: &[u8],
    initial: &Option<Vec<u8>>,
    any: &[Vec<u8>],
    fin: &Option<Vec<u8>>,
) -> bool {
    let mut pos = 0;
    if let Some(prefix) = initial {
        if value.len() < prefix.len() || !eq_fold(&value[..prefix.len()], prefix) {
            return false;
        }
        pos = prefix.len();
    }
    for mid in any {
        match find_fold(value, mid, pos) {
            Some(at) => pos = at + mid.len(),
            None => return false,
        }
    }
    if let Some(suffix) = fin {
        if value.len() < pos + suffix.len() {
            return false;
        }
        return eq_fold(&value[value.len() - suffix.len()..], suffix);
    }
    true
}

fn err(offset: usize, reason: &str) -> FilterError {
    FilterError::Invalid {
        offset,
        reason: reason.to_string(),
    }
}

/// Recursive-descent parser over the byte form. Returns the parsed filter
/// and the offset one past its closing parenthesis.
fn parse_filter(s: &[u8], at: usize) -> Result<(Filter, usize), FilterError> {
    if s.get(at) != Some(&b'(') {
        return Err(err(at, "expected '('"));
    }
    let mut pos = at + 1;
    match s.get(pos) {
        Some(b'&') | Some(b'|') => {
            let is_and = s[pos] == b'&';
            pos += 1;
            let mut parts = Vec::new();
            while s.get(pos) == Some(&b'(') {
                let (part, next) = parse_filter(s, pos)?;
                parts.push(part);
                pos = next;
            }
            if s.get(pos) != Some(&b')') {
                return Err(err(pos, "expected ')'"));
            }
            if parts.is_empty() {
                return Err(err(pos, "empty boolean filter"));
            }
            let filter = if is_and {
                Filter::And(parts)
            } else {
                Filter::Or(parts)
            };
            Ok((filter, pos + 1))
        }
        Some(b'!') => {
            let (inner, next) = parse_filter(s, pos + 1)?;
            if s.get(next) != Some(&b')') {
                return Err(err(next, "expected ')'"));
            }
            Ok((Filter::Not(Box::new(inner)), next + 1))
        }
        Some(_) => parse_simple(s, pos),
        None => Err(err(pos, "unterminated filter")),
    }
}

fn parse_simple(s: &[u8], at: usize) -> Result<(Filter, usize), FilterError> {
    let eq = (at..s.len())
        .find(|&i| s[i] == b'=')
        .ok_or_else(|| err(at, "expected '='"))?;
    let close = (eq..s.len())
        .find(|&i| s[i] == b')')
        .ok_or_else(|| err(eq, "expected ')'"))?;
    let attr = std::str::from_utf8(&s[at..eq])
        .map_err(|_| err(at, "attribute description is not UTF-8"))?
        .trim()
        .to_string();
    if attr.is_empty() {
        return Err(err(at, "empty attribute description"));
    }
    let value = &s[eq + 1..close];

    if value == b"*" {
        return Ok((Filter::Present(attr), close + 1));
    }
    if !value.contains(&b'*') {
        return Ok((Filter::Equality(attr, value.to_vec()), close + 1));
    }

    // Substring: split on '*'; outermost pieces are initial/final.
    let pieces: Vec<&[u8]> = value.split(|&b| b == b'*').collect();
    let initial = (!pieces[0].is_empty()).then(|| pieces[0].to_vec());
    let fin_piece = pieces[pieces.len() - 1];
    let fin = (!fin_piece.is_empty()).then(|| fin_piece.to_vec());
    let any = pieces[1..pieces.len() - 1]
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| p.to_vec())
        .collect();
    Ok((
        Filter::Substring {
            attr,
            initial,
            any,
            fin,
        },
        close + 1,
    ))
}
