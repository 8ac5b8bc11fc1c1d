//! RDF term and statement model.
//!
//! A `Statement` serializes to a single self-terminated N-Triples line;
//! that line form is what the artifact files and the batch loader work
//! with, so `Display` here is load-bearing, not debug output.

use std::fmt;

use crate::vocab;

/// A single RDF term. Equality is structural over all fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Named {
        iri: String,
    },
    Blank {
        label: String,
    },
    Literal {
        value: String,
        datatype: Option<String>,
        language: Option<String>,
    },
}

impl Term {
    pub fn named(iri: impl Into<String>) -> Self {
        Term::Named { iri: iri.into() }
    }

    pub fn blank(label: impl Into<String>) -> Self {
        Term::Blank {
            label: label.into(),
        }
    }

    /// A plain literal with no datatype or language tag.
    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            datatype: None,
            language: None,
        }
    }

    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            datatype: Some(datatype.into()),
            language: None,
        }
    }

    pub fn lang_literal(value: impl Into<String>, language: impl Into<String>) -> Self {
        Term::Literal {
            value: value.into(),
            datatype: Some(vocab::RDF_LANG_STRING.to_string()),
            language: Some(language.into()),
        }
    }

    /// The lexical value, regardless of term kind.
    pub fn lexical_value(&self) -> &str {
        match self {
            Term::Named { iri } => iri,
            Term::Blank { label } => label,
            Term::Literal { value, .. } => value,
        }
    }

    pub fn datatype(&self) -> Option<&str> {
        match self {
            Term::Literal { datatype, .. } => datatype.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Named { iri } => write!(f, "<{iri}>"),
            Term::Blank { label } => write!(f, "_:{label}"),
            Term::Literal {
                value,
                datatype,
                language,
            } => {
                write!(f, "\"{}\"", escape_literal(value))?;
                if let Some(lang) = language {
                    write!(f, "@{lang}")
                } else if let Some(dt) = datatype {
                    // Plain xsd:string stays bare, matching serializer output.
                    if dt != vocab::XSD_STRING {
                        write!(f, "^^<{dt}>")?;
                    }
                    Ok(())
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// One (subject, predicate, object) fact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl Statement {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

/// N-Triples string escaping: backslash, quote, and control characters.
fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}
