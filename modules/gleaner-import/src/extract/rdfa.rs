//! RDFa extraction from an HTML document.
//!
//! A recursive walk over the parsed DOM implementing the RDFa Core
//! attributes the harvested publications actually use: `vocab`, `prefix`,
//! `about`, `resource`, `href`, `src`, `property`, `rel`, `typeof`,
//! `content`, `datatype` and `lang`/`xml:lang`. Relative references are
//! resolved against the file's canonical source URL (or a `<base href>`
//! if the document carries one). Statements are pushed into a sink as
//! they are produced so the caller can stream them onward.

use std::collections::HashMap;

use anyhow::{Context as _, Result};
use scraper::{ElementRef, Html};
use url::Url;

use gleaner_common::term::{Statement, Term};
use gleaner_common::vocab::RDF_TYPE;

/// Prefixes assumed without a `prefix` attribute, mirroring the RDFa
/// initial context entries seen in harvested markup.
const INITIAL_PREFIXES: &[(&str, &str)] = &[
    ("dc", "http://purl.org/dc/elements/1.1/"),
    ("dct", "http://purl.org/dc/terms/"),
    ("dcterms", "http://purl.org/dc/terms/"),
    ("foaf", "http://xmlns.com/foaf/0.1/"),
    ("schema", "http://schema.org/"),
    ("prov", "http://www.w3.org/ns/prov#"),
    ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ("rdfs", "http://www.w3.org/2000/01/rdf-schema#"),
    ("xsd", "http://www.w3.org/2001/XMLSchema#"),
    ("skos", "http://www.w3.org/2004/02/skos/core#"),
    ("og", "http://ogp.me/ns#"),
    ("eli", "http://data.europa.eu/eli/ontology#"),
    ("besluit", "http://data.vlaanderen.be/ns/besluit#"),
    ("mandaat", "http://data.vlaanderen.be/ns/mandaat#"),
    ("persoon", "http://data.vlaanderen.be/ns/persoon#"),
];

/// Evaluation context inherited down the element tree.
#[derive(Clone)]
struct EvalContext {
    subject: Term,
    vocab: Option<String>,
    prefixes: HashMap<String, String>,
    language: Option<String>,
}

struct Walker<'a> {
    base: Url,
    bnode_counter: usize,
    sink: &'a mut dyn FnMut(Statement),
}

/// Parse `html` and push every extracted statement into `sink`.
pub fn extract_into(html: &str, base_url: &str, sink: &mut dyn FnMut(Statement)) -> Result<()> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let mut base = Url::parse(base_url)
        .with_context(|| format!("Source url is not a valid base: {base_url}"))?;
    if let Some(href) = find_base_href(root) {
        if let Ok(resolved) = base.join(&href) {
            base = resolved;
        }
    }

    let ctx = EvalContext {
        subject: Term::named(base.as_str().trim_end_matches('/')),
        vocab: None,
        prefixes: INITIAL_PREFIXES
            .iter()
            .map(|(p, iri)| (p.to_string(), iri.to_string()))
            .collect(),
        language: None,
    };

    let mut walker = Walker {
        base,
        bnode_counter: 0,
        sink,
    };
    walker.walk(root, &ctx);
    Ok(())
}

/// Convenience collector used by tests and small callers.
pub fn extract_statements(html: &str, base_url: &str) -> Result<Vec<Statement>> {
    let mut statements = Vec::new();
    extract_into(html, base_url, &mut |s| statements.push(s))?;
    Ok(statements)
}

fn find_base_href(root: ElementRef<'_>) -> Option<String> {
    let selector = scraper::Selector::parse("base[href]").ok()?;
    root.select(&selector)
        .next()
        .and_then(|e| e.value().attr("href"))
        .map(str::to_string)
}

impl Walker<'_> {
    fn walk(&mut self, element: ElementRef<'_>, inherited: &EvalContext) {
        let mut ctx = inherited.clone();
        let attrs = element.value();

        if let Some(vocab) = attrs.attr("vocab") {
            if !vocab.trim().is_empty() {
                ctx.vocab = Some(vocab.trim().to_string());
            }
        }
        if let Some(prefix) = attrs.attr("prefix") {
            parse_prefix_attr(prefix, &mut ctx.prefixes);
        }
        if let Some(lang) = attrs.attr("lang").or_else(|| attrs.attr("xml:lang")) {
            if !lang.is_empty() {
                ctx.language = Some(lang.to_string());
            }
        }

        let about = attrs.attr("about").and_then(|v| self.resolve_ref(&ctx, v));
        let resource = attrs
            .attr("resource")
            .and_then(|v| self.resolve_ref(&ctx, v))
            .or_else(|| attrs.attr("href").and_then(|v| self.resolve_iri(v)))
            .or_else(|| attrs.attr("src").and_then(|v| self.resolve_iri(v)));

        let properties = attrs.attr("property");
        let rels = attrs.attr("rel");
        let types = attrs.attr("typeof");

        // New subject: an explicit about wins; a typeof without about (and
        // without a property using the resource as object) starts a fresh
        // blank node, the hanging-object case of RDFa chaining.
        let new_subject = match (&about, types) {
            (Some(s), _) => Some(s.clone()),
            (None, Some(_)) if properties.is_none() => {
                Some(resource.clone().unwrap_or_else(|| self.fresh_bnode()))
            }
            _ => None,
        };
        let current_subject = new_subject.clone().unwrap_or_else(|| ctx.subject.clone());

        if let Some(types) = types {
            let type_subject = new_subject.clone().unwrap_or_else(|| ctx.subject.clone());
            for name in types.split_whitespace() {
                if let Some(iri) = self.expand_term(&ctx, name) {
                    self.emit(
                        type_subject.clone(),
                        Term::named(RDF_TYPE),
                        Term::named(iri),
                    );
                }
            }
        }

        if let Some(properties) = properties {
            let object = self.property_object(element, &ctx, &resource);
            for name in properties.split_whitespace() {
                if let Some(iri) = self.expand_term(&ctx, name) {
                    self.emit(current_subject.clone(), Term::named(iri), object.clone());
                }
            }
        }

        if let Some(rels) = rels {
            if let Some(object) = &resource {
                for name in rels.split_whitespace() {
                    if let Some(iri) = self.expand_term(&ctx, name) {
                        self.emit(
                            current_subject.clone(),
                            Term::named(iri),
                            object.clone(),
                        );
                    }
                }
            }
            // A rel without a resource opens an incomplete triple; those
            // are rare in the harvested corpus and are not completed here.
        }

        // Children inherit the resource as subject when this element both
        // linked to it and descended into it; otherwise the new subject.
        ctx.subject = match (&rels, &resource) {
            (Some(_), Some(object)) => object.clone(),
            _ => current_subject,
        };

        for child in element.child_elements() {
            self.walk(child, &ctx);
        }
    }

    /// The object of a `property` attribute, in attribute-priority order.
    fn property_object(
        &mut self,
        element: ElementRef<'_>,
        ctx: &EvalContext,
        resource: &Option<Term>,
    ) -> Term {
        let attrs = element.value();
        let datatype = attrs
            .attr("datatype")
            .filter(|v| !v.is_empty())
            .and_then(|v| self.expand_term(ctx, v));

        if let Some(content) = attrs.attr("content") {
            return literal_with(content.to_string(), datatype, ctx.language.clone());
        }
        if let Some(dt) = datatype {
            // An explicit rdf:HTML datatype captures the element's inner
            // markup rather than its flattened text.
            if dt == gleaner_common::vocab::RDF_HTML {
                return literal_with(element.inner_html(), Some(dt), None);
            }
            return literal_with(text_content(element), Some(dt), None);
        }
        if attrs.attr("resource").is_some()
            || attrs.attr("href").is_some()
            || attrs.attr("src").is_some()
        {
            if let Some(object) = resource {
                return object.clone();
            }
        }
        literal_with(text_content(element), None, ctx.language.clone())
    }

    fn emit(&mut self, subject: Term, predicate: Term, object: Term) {
        (self.sink)(Statement::new(subject, predicate, object));
    }

    fn fresh_bnode(&mut self) -> Term {
        let term = Term::blank(format!("b{}", self.bnode_counter));
        self.bnode_counter += 1;
        term
    }

    /// Resolve an about/resource value: blank node, CURIE, or IRI.
    fn resolve_ref(&self, ctx: &EvalContext, value: &str) -> Option<Term> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        if let Some(label) = value.strip_prefix("_:") {
            return Some(Term::blank(label.to_string()));
        }
        if let Some((prefix, local)) = value.split_once(':') {
            if let Some(ns) = ctx.prefixes.get(prefix) {
                return Some(Term::named(format!("{ns}{local}")));
            }
        }
        self.resolve_iri(value)
    }

    /// Resolve a plain IRI reference against the base.
    fn resolve_iri(&self, value: &str) -> Option<Term> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        self.base
            .join(value)
            .ok()
            .map(|u| Term::named(u.to_string()))
    }

    /// Expand a property/rel/typeof/datatype name: CURIE first, then the
    /// in-scope vocab, then an absolute IRI as-is.
    fn expand_term(&self, ctx: &EvalContext, name: &str) -> Option<String> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if let Some((prefix, local)) = name.split_once(':') {
            if let Some(ns) = ctx.prefixes.get(prefix) {
                return Some(format!("{ns}{local}"));
            }
            // Looks like an absolute IRI already.
            if local.starts_with("//") || prefix == "urn" || prefix == "mailto" {
                return Some(name.to_string());
            }
            return None;
        }
        ctx.vocab.as_ref().map(|vocab| format!("{vocab}{name}"))
    }
}

fn literal_with(value: String, datatype: Option<String>, language: Option<String>) -> Term {
    match datatype {
        Some(dt) => Term::typed_literal(value, dt),
        None => match language {
            Some(lang) => Term::lang_literal(value, lang),
            None => Term::literal(value),
        },
    }
}

fn text_content(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn parse_prefix_attr(attr: &str, prefixes: &mut HashMap<String, String>) {
    // "pfx: http://… other: http://…" — token pairs.
    let mut tokens = attr.split_whitespace().peekable();
    while let Some(token) = tokens.next() {
        let Some(prefix) = token.strip_suffix(':') else {
            continue;
        };
        if let Some(iri) = tokens.next() {
            prefixes.insert(prefix.to_string(), iri.to_string());
        }
    }
}
