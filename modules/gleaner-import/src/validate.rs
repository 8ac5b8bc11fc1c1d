//! Literal validation and repair.
//!
//! Extracted RDFa carries whatever the publishing site put in its markup;
//! typed literals are frequently malformed in ways the triplestore will
//! refuse. Validation decides which statements can go in as-is, repair
//! coerces the common near-misses, and anything else is handed to the
//! unparsed-predicate registry so no data is dropped.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

use gleaner_common::term::{Statement, Term};
use gleaner_common::vocab::{
    RDFS_LITERAL, RDF_LANG_STRING, XSD_BOOLEAN, XSD_DATE, XSD_DATE_TIME, XSD_INTEGER, XSD_STRING,
};

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?(-?\d{4}-\d{2}-\d{2})(Z|[+-]\d{2}:\d{2})?$").unwrap()
});
static DATE_TIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+?(-?\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2})(\.\d+)?(Z|[+-]\d{2}:\d{2})?$")
        .unwrap()
});
static INTEGER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?\d+$").unwrap());

/// Datatypes that are valid whatever their lexical value.
fn is_free_datatype(datatype: &str) -> bool {
    datatype == XSD_STRING || datatype == RDF_LANG_STRING || datatype == RDFS_LITERAL
}

pub fn validate_term(term: &Term) -> bool {
    let Term::Literal {
        value,
        datatype: Some(datatype),
        ..
    } = term
    else {
        // References, blank nodes, and untyped literals are always fine.
        return true;
    };
    if is_free_datatype(datatype) {
        return true;
    }
    match datatype.as_str() {
        XSD_BOOLEAN => value == "true" || value == "false",
        // The lexical pattern alone would accept month 13 or day 40; the
        // chrono parse behind it enforces the calendar.
        XSD_DATE => DATE_RE
            .captures(value)
            .is_some_and(|c| NaiveDate::parse_from_str(&c[1], "%Y-%m-%d").is_ok()),
        XSD_DATE_TIME => DATE_TIME_RE
            .captures(value)
            .is_some_and(|c| NaiveDateTime::parse_from_str(&c[1], "%Y-%m-%dT%H:%M:%S").is_ok()),
        XSD_INTEGER => INTEGER_RE.is_match(value),
        // Unknown datatypes are never trusted.
        _ => false,
    }
}

pub fn validate_statement(statement: &Statement) -> bool {
    validate_term(&statement.subject)
        && validate_term(&statement.predicate)
        && validate_term(&statement.object)
}

/// Attempt to repair an invalid term. `None` means irreparable.
///
/// Only typed literals are candidates; date and dateTime repairs re-emit
/// the zero-padded canonical ISO 8601 form (so `"2020/1/5"` becomes
/// `"2020-01-05"`, not `"2020-1-5"`), because downstream consumers compare
/// these literals lexically.
pub fn fix_term(term: &Term) -> Option<Term> {
    let Term::Literal {
        value,
        datatype: Some(datatype),
        language,
    } = term
    else {
        return None;
    };
    match datatype.as_str() {
        XSD_BOOLEAN => {
            let lowered = value.to_lowercase();
            (lowered == "true" || lowered == "false").then(|| Term::Literal {
                value: lowered,
                datatype: Some(datatype.clone()),
                language: language.clone(),
            })
        }
        XSD_DATE => parse_calendar(value).map(|dt| Term::Literal {
            value: dt.date().format("%Y-%m-%d").to_string(),
            datatype: Some(datatype.clone()),
            language: language.clone(),
        }),
        XSD_DATE_TIME => parse_calendar(value).map(|dt| Term::Literal {
            value: dt.format("%Y-%m-%dT%H:%M:%S").to_string(),
            datatype: Some(datatype.clone()),
            language: language.clone(),
        }),
        _ => None,
    }
}

/// Repair a statement by repairing its invalid terms. If any invalid term
/// cannot be fixed the whole statement is irreparable.
pub fn fix_statement(statement: &Statement) -> Option<Statement> {
    let repair = |term: &Term| -> Option<Term> {
        if validate_term(term) {
            Some(term.clone())
        } else {
            fix_term(term)
        }
    };
    Some(Statement {
        subject: repair(&statement.subject)?,
        predicate: repair(&statement.predicate)?,
        object: repair(&statement.object)?,
    })
}

/// Best-effort calendar parse of a raw string, analogous to a permissive
/// `Date` constructor: a list of common lexical shapes, datetime shapes
/// first, date-only shapes falling back to midnight.
fn parse_calendar(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }
    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }
    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%d-%m-%Y",
        "%d/%m/%Y",
        "%d %B %Y",
        "%B %d, %Y",
    ];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}
