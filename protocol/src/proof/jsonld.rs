//! # JSON-LD to RDF
//!
//! Turns a JSON-LD document into the quads [`super::rdf`] canonicalizes.
//!
//! ```text
//!   document ──scan @context──> ContextSet::load (DocumentLoader, async)
//!                                     │
//!   document ──expand terms──> to_rdf(document, &contexts) ──> Vec<Quad>
//! ```
//!
//! Every context the document names (top level, embedded, property-scoped,
//! or referenced from another context) is fetched up front, so expansion
//! itself never suspends.
//!
//! | Feature                                   | Handling                 |
//! |-------------------------------------------|--------------------------|
//! | remote, inline, embedded contexts         | processed in order       |
//! | `@vocab`, compact IRIs, keyword aliases   | expanded                 |
//! | `@type` coercion (`@id`, `@vocab`, IRI)   | applied                  |
//! | property-scoped `@context`                | applied to the value     |
//! | `@list`, `@set`, `@graph`, `@language`    | containers and objects   |
//! | terms with no absolute IRI                | error, never dropped     |
//! | relative `@id` references                 | error                    |
//! | `@reverse`, `@nest`, `@included`, `@json` | error                    |

use std::collections::{HashMap, HashSet, VecDeque};

use serde_json::{Map, Number, Value};
use tracing::debug;

use super::loader::{load_document, DocumentLoader};
use super::rdf::{Quad, Term, RDF_FIRST, RDF_NIL, RDF_REST, RDF_TYPE, XSD_BOOLEAN, XSD_DOUBLE, XSD_INTEGER, XSD_STRING};
use crate::error::{BtcoError, BtcoResult};

/// Most distinct context documents one document may pull in.
pub const MAX_CONTEXTS: usize = 32;
const MAX_CONTEXT_DEPTH: usize = 16;

const KEYWORDS: &[&str] = &[
    "@base", "@container", "@context", "@direction", "@graph", "@id", "@import", "@included", "@index", "@json",
    "@language", "@list", "@nest", "@none", "@prefix", "@propagate", "@protected", "@reverse", "@set", "@type",
    "@value", "@version", "@vocab",
];

fn is_keyword(value: &str) -> bool {
    KEYWORDS.contains(&value)
}

fn is_absolute(iri: &str) -> bool {
    iri.split_once(':').is_some_and(|(scheme, _)| {
        !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    })
}

fn invalid(message: impl Into<String>) -> BtcoError {
    BtcoError::InvalidInput(message.into())
}

// ---------------------------------------------------------------------------
// Context documents
// ---------------------------------------------------------------------------

/// The remote contexts a set of documents depends on, keyed by IRI.
#[derive(Debug, Clone, Default)]
pub struct ContextSet {
    contexts: HashMap<String, Value>,
}

impl ContextSet {
    /// Fetch every context reachable from `documents`.
    pub async fn load(documents: &[&Value], loader: &dyn DocumentLoader) -> BtcoResult<Self> {
        let mut pending = VecDeque::new();
        for document in documents {
            embedded_references(document, &mut pending);
        }

        let mut set = Self::default();
        let mut seen = HashSet::new();
        while let Some(iri) = pending.pop_front() {
            if !seen.insert(iri.clone()) {
                continue;
            }
            if seen.len() > MAX_CONTEXTS {
                return Err(invalid(format!("document pulls in more than {MAX_CONTEXTS} contexts")));
            }
            let remote = load_document(loader, &iri).await?;
            let context = remote
                .document
                .get("@context")
                .cloned()
                .ok_or_else(|| BtcoError::Loader(format!("{iri} is not a JSON-LD context document")))?;
            let mut nested = VecDeque::new();
            context_references(&context, &mut nested);
            pending.extend(nested);
            debug!(iri = %iri, "loaded JSON-LD context");
            set.contexts.insert(iri, context);
        }
        Ok(set)
    }

    fn get(&self, iri: &str) -> BtcoResult<&Value> {
        self.contexts
            .get(iri)
            .ok_or_else(|| BtcoError::Loader(format!("context {iri} was not loaded")))
    }
}

/// Remote context IRIs named anywhere in `value`.
fn embedded_references(value: &Value, out: &mut VecDeque<String>) {
    match value {
        Value::Object(map) => {
            for (key, item) in map {
                if key == "@context" {
                    context_references(item, out);
                } else {
                    embedded_references(item, out);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| embedded_references(item, out)),
        _ => {}
    }
}

/// Remote context IRIs named by a local context, including scoped ones.
fn context_references(context: &Value, out: &mut VecDeque<String>) {
    match context {
        Value::String(iri) => out.push_back(iri.clone()),
        Value::Array(items) => items.iter().for_each(|item| context_references(item, out)),
        Value::Object(definitions) => {
            for definition in definitions.values() {
                if let Some(scoped) = definition.get("@context") {
                    context_references(scoped, out);
                }
            }
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Active context
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct TermDefinition {
    iri: String,
    type_mapping: Option<String>,
    container: Vec<String>,
    /// `Some(None)` clears the default language for this term.
    language: Option<Option<String>>,
    context: Option<Value>,
}

impl TermDefinition {
    fn has_container(&self, container: &str) -> bool {
        self.container.iter().any(|c| c == container)
    }
}

#[derive(Debug, Clone, Default)]
struct ActiveContext {
    /// `None` marks a term explicitly mapped to `null`.
    terms: HashMap<String, Option<TermDefinition>>,
    vocab: Option<String>,
    language: Option<String>,
}

impl ActiveContext {
    fn definition(&self, term: &str) -> Option<&TermDefinition> {
        self.terms.get(term).and_then(Option::as_ref)
    }

    /// Expand `value`; `None` when it is a term mapped to `null`.
    /// Values that cannot be expanded come back unchanged.
    fn expand_iri(&self, value: &str, vocab: bool) -> Option<String> {
        if is_keyword(value) {
            return Some(value.to_string());
        }
        if vocab {
            if let Some(definition) = self.terms.get(value) {
                return definition.as_ref().map(|d| d.iri.clone());
            }
        }
        if let Some((prefix, suffix)) = value.split_once(':') {
            if prefix == "_" || suffix.starts_with("//") {
                return Some(value.to_string());
            }
            if let Some(definition) = self.definition(prefix) {
                return Some(format!("{}{suffix}", definition.iri));
            }
            return Some(value.to_string());
        }
        match (&self.vocab, vocab) {
            (Some(base), true) => Some(format!("{base}{value}")),
            _ => Some(value.to_string()),
        }
    }
}

fn process_context(
    active: &ActiveContext,
    local: &Value,
    contexts: &ContextSet,
    depth: usize,
) -> BtcoResult<ActiveContext> {
    if depth > MAX_CONTEXT_DEPTH {
        return Err(invalid("@context nesting is too deep"));
    }
    let entries: Vec<&Value> = match local {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    let mut result = active.clone();
    for entry in entries {
        result = match entry {
            Value::Null => ActiveContext::default(),
            Value::String(iri) => process_context(&result, contexts.get(iri)?, contexts, depth + 1)?,
            Value::Object(definitions) => define_terms(result, definitions)?,
            other => return Err(invalid(format!("invalid @context entry {other}"))),
        };
    }
    Ok(result)
}

fn define_terms(mut active: ActiveContext, local: &Map<String, Value>) -> BtcoResult<ActiveContext> {
    if local.contains_key("@import") {
        return Err(invalid("@import is not supported"));
    }
    if let Some(language) = local.get("@language") {
        active.language = language.as_str().map(str::to_lowercase);
    }
    if let Some(vocab) = local.get("@vocab") {
        active.vocab = match vocab {
            Value::Null => None,
            Value::String(value) => active.expand_iri(value, true),
            other => return Err(invalid(format!("invalid @vocab {other}"))),
        };
    }

    let mut defined = HashMap::new();
    for term in local.keys().filter(|key| !key.starts_with('@')) {
        define_term(&mut active, local, term, &mut defined)?;
    }
    Ok(active)
}

fn define_term(
    active: &mut ActiveContext,
    local: &Map<String, Value>,
    term: &str,
    defined: &mut HashMap<String, bool>,
) -> BtcoResult<()> {
    match defined.get(term) {
        Some(true) => return Ok(()),
        Some(false) => return Err(invalid(format!("cyclic IRI mapping for term '{term}'"))),
        None => {}
    }
    defined.insert(term.to_string(), false);

    let definition = match local.get(term) {
        None | Some(Value::Null) => None,
        Some(Value::String(id)) => Some(TermDefinition {
            iri: definition_iri(active, local, defined, id)?,
            ..TermDefinition::default()
        }),
        Some(Value::Object(map)) if matches!(map.get("@id"), Some(Value::Null)) => None,
        Some(Value::Object(map)) => {
            if map.contains_key("@reverse") {
                return Err(invalid(format!("term '{term}' uses @reverse, which is not supported")));
            }
            let iri = match map.get("@id") {
                Some(Value::String(id)) => definition_iri(active, local, defined, id)?,
                Some(other) => return Err(invalid(format!("invalid @id {other} for term '{term}'"))),
                None if term.contains(':') => definition_iri(active, local, defined, term)?,
                None => match &active.vocab {
                    Some(vocab) => format!("{vocab}{term}"),
                    None => return Err(invalid(format!("term '{term}' has no IRI mapping"))),
                },
            };
            let type_mapping = match map.get("@type") {
                None => None,
                Some(Value::String(t)) if is_keyword(t) => Some(t.clone()),
                Some(Value::String(t)) => Some(definition_iri(active, local, defined, t)?),
                Some(other) => return Err(invalid(format!("invalid @type {other} for term '{term}'"))),
            };
            let container = match map.get("@container") {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::String(c)) => vec![c.clone()],
                Some(Value::Array(cs)) => cs.iter().filter_map(Value::as_str).map(str::to_string).collect(),
                Some(other) => return Err(invalid(format!("invalid @container {other} for term '{term}'"))),
            };
            Some(TermDefinition {
                iri,
                type_mapping,
                container,
                language: map.get("@language").map(|l| l.as_str().map(str::to_lowercase)),
                context: map.get("@context").cloned(),
            })
        }
        Some(other) => return Err(invalid(format!("invalid definition {other} for term '{term}'"))),
    };

    active.terms.insert(term.to_string(), definition);
    defined.insert(term.to_string(), true);
    Ok(())
}

/// Expand an IRI inside a context being defined, defining any term of the
/// same context it depends on first.
fn definition_iri(
    active: &mut ActiveContext,
    local: &Map<String, Value>,
    defined: &mut HashMap<String, bool>,
    value: &str,
) -> BtcoResult<String> {
    if is_keyword(value) {
        return Ok(value.to_string());
    }
    let dependency = match value.split_once(':') {
        Some((prefix, suffix)) if prefix != "_" && !suffix.starts_with("//") => prefix,
        Some(_) => return Ok(value.to_string()),
        None => value,
    };
    if local.contains_key(dependency) && defined.get(dependency) != Some(&true) {
        define_term(active, local, dependency, defined)?;
    }
    let iri = active
        .expand_iri(value, true)
        .ok_or_else(|| invalid(format!("'{value}' is mapped to null")))?;
    if is_keyword(&iri) || is_absolute(&iri) {
        Ok(iri)
    } else {
        Err(invalid(format!("'{value}' does not expand to an absolute IRI")))
    }
}

// ---------------------------------------------------------------------------
// Expansion to quads
// ---------------------------------------------------------------------------

/// The RDF dataset `document` denotes under `contexts`.
pub fn to_rdf(document: &Value, contexts: &ContextSet) -> BtcoResult<Vec<Quad>> {
    let object = document
        .as_object()
        .ok_or_else(|| invalid("a JSON-LD document must be an object"))?;
    let mut emitter = Emitter::new(contexts);
    let root = ActiveContext::default();

    let is_container = object.contains_key("@graph") && object.keys().all(|k| k == "@context" || k == "@graph");
    if is_container {
        let active = match object.get("@context") {
            Some(local) => process_context(&root, local, contexts, 0)?,
            None => root,
        };
        for item in object.get("@graph").map(flatten).unwrap_or_default() {
            emitter.graph_member(&active, item, None)?;
        }
    } else {
        emitter.node(&root, object, None)?;
    }
    Ok(emitter.quads)
}

/// Array items, with nested arrays and `@set` objects spliced in.
fn flatten(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().flat_map(flatten).collect(),
        Value::Object(map) if map.len() == 1 && map.contains_key("@set") => flatten(&map["@set"]),
        other => vec![other],
    }
}

struct Emitter<'c> {
    contexts: &'c ContextSet,
    quads: Vec<Quad>,
    next_blank: usize,
    blank_labels: HashMap<String, String>,
}

impl<'c> Emitter<'c> {
    fn new(contexts: &'c ContextSet) -> Self {
        Self {
            contexts,
            quads: Vec::new(),
            next_blank: 0,
            blank_labels: HashMap::new(),
        }
    }

    /// A fresh blank node, or the one already standing for `label`.
    fn blank(&mut self, label: Option<&str>) -> Term {
        if let Some(existing) = label.and_then(|l| self.blank_labels.get(l)) {
            return Term::Blank(existing.clone());
        }
        let id = format!("b{}", self.next_blank);
        self.next_blank += 1;
        if let Some(label) = label {
            self.blank_labels.insert(label.to_string(), id.clone());
        }
        Term::Blank(id)
    }

    fn push(&mut self, subject: Term, predicate: Term, object: Term, graph: Option<&Term>) {
        self.quads.push(Quad {
            subject,
            predicate,
            object,
            graph: graph.cloned(),
        });
    }

    /// A node reference: blank node label or absolute IRI.
    fn reference(&mut self, expanded: &str, original: &str) -> BtcoResult<Term> {
        if let Some(label) = expanded.strip_prefix("_:") {
            return Ok(self.blank(Some(label)));
        }
        if is_absolute(expanded) {
            return Ok(Term::Iri(expanded.to_string()));
        }
        Err(invalid(format!("'{original}' is not an absolute IRI")))
    }

    fn graph_member(&mut self, active: &ActiveContext, item: &Value, graph: Option<&Term>) -> BtcoResult<()> {
        match item {
            Value::Object(object) => self.node(active, object, graph).map(|_| ()),
            other => Err(invalid(format!("@graph members must be node objects, got {other}"))),
        }
    }

    fn node(&mut self, active: &ActiveContext, object: &Map<String, Value>, graph: Option<&Term>) -> BtcoResult<Term> {
        let scoped;
        let active = match object.get("@context") {
            Some(local) => {
                scoped = process_context(active, local, self.contexts, 0)?;
                &scoped
            }
            None => active,
        };

        let mut entries: Vec<(&String, &Value)> = object.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut subject = None;
        for (key, value) in &entries {
            if active.expand_iri(key, true).as_deref() == Some("@id") {
                let id = value
                    .as_str()
                    .ok_or_else(|| invalid(format!("@id must be a string, got {value}")))?;
                let expanded = active.expand_iri(id, false).unwrap_or_else(|| id.to_string());
                subject = Some(self.reference(&expanded, id)?);
            }
        }
        let subject = match subject {
            Some(subject) => subject,
            None => self.blank(None),
        };

        for (key, value) in entries {
            let Some(property) = active.expand_iri(key, true) else {
                continue;
            };
            match property.as_str() {
                "@context" | "@id" | "@index" => {}
                "@type" => {
                    for item in flatten(value) {
                        let name = item
                            .as_str()
                            .ok_or_else(|| invalid(format!("@type values must be strings, got {item}")))?;
                        let expanded = active
                            .expand_iri(name, true)
                            .ok_or_else(|| invalid(format!("type '{name}' is mapped to null")))?;
                        let type_term = self
                            .reference(&expanded, name)
                            .map_err(|_| invalid(format!("type '{name}' is not defined by the document's @context")))?;
                        self.push(subject.clone(), Term::Iri(RDF_TYPE.to_string()), type_term, graph);
                    }
                }
                "@graph" => {
                    let name = subject.clone();
                    for item in flatten(value) {
                        self.graph_member(active, item, Some(&name))?;
                    }
                }
                keyword if keyword.starts_with('@') => {
                    return Err(invalid(format!("{keyword} is not supported in signed documents")));
                }
                iri if !is_absolute(iri) => {
                    return Err(invalid(format!("'{key}' is not defined by the document's @context")));
                }
                iri => self.property(active, key, iri, value, &subject, graph)?,
            }
        }
        Ok(subject)
    }

    fn property(
        &mut self,
        active: &ActiveContext,
        key: &str,
        iri: &str,
        value: &Value,
        subject: &Term,
        graph: Option<&Term>,
    ) -> BtcoResult<()> {
        let definition = active.definition(key);
        let scoped;
        let value_context = match definition.and_then(|d| d.context.as_ref()) {
            Some(local) => {
                scoped = process_context(active, local, self.contexts, 0)?;
                &scoped
            }
            None => active,
        };
        let predicate = Term::Iri(iri.to_string());

        if definition.is_some_and(|d| d.has_container("@language")) {
            let languages = value
                .as_object()
                .ok_or_else(|| invalid(format!("'{key}' is a language map and must be an object")))?;
            for (language, texts) in languages {
                for text in flatten(texts) {
                    match text {
                        Value::Null => {}
                        Value::String(text) => {
                            let literal = Term::lang_string(text.as_str(), language.to_lowercase());
                            self.push(subject.clone(), predicate.clone(), literal, graph);
                        }
                        other => return Err(invalid(format!("language map values must be strings, got {other}"))),
                    }
                }
            }
            return Ok(());
        }

        if definition.is_some_and(|d| d.has_container("@list")) {
            let head = self.list(value_context, definition, &flatten_list(value)?, graph)?;
            self.push(subject.clone(), predicate, head, graph);
            return Ok(());
        }

        if definition.is_some_and(|d| d.has_container("@graph")) {
            for item in flatten(value) {
                let name = self.blank(None);
                self.graph_member(value_context, item, Some(&name))?;
                self.push(subject.clone(), predicate.clone(), name, graph);
            }
            return Ok(());
        }

        for item in flatten(value) {
            if let Some(object) = self.value(value_context, definition, item, graph)? {
                self.push(subject.clone(), predicate.clone(), object, graph);
            }
        }
        Ok(())
    }

    fn value(
        &mut self,
        active: &ActiveContext,
        definition: Option<&TermDefinition>,
        item: &Value,
        graph: Option<&Term>,
    ) -> BtcoResult<Option<Term>> {
        let coercion = definition.and_then(|d| d.type_mapping.as_deref());
        match item {
            Value::Null => Ok(None),
            Value::String(text) => match coercion {
                Some("@id") => {
                    let expanded = active.expand_iri(text, false).unwrap_or_else(|| text.clone());
                    self.reference(&expanded, text).map(Some)
                }
                Some("@vocab") => match active.expand_iri(text, true) {
                    Some(expanded) => self.reference(&expanded, text).map(Some),
                    None => Ok(None),
                },
                Some("@json") => Err(invalid("@json values are not supported")),
                Some(datatype) if !datatype.starts_with('@') => Ok(Some(Term::literal(text.as_str(), datatype))),
                _ => {
                    let language = match definition.and_then(|d| d.language.clone()) {
                        Some(language) => language,
                        None => active.language.clone(),
                    };
                    Ok(Some(match language {
                        Some(language) => Term::lang_string(text.as_str(), language),
                        None => Term::literal(text.as_str(), XSD_STRING),
                    }))
                }
            },
            Value::Bool(flag) => Ok(Some(Term::literal(flag.to_string(), datatype_or(coercion, XSD_BOOLEAN)))),
            Value::Number(number) => Ok(Some(number_literal(number, coercion.filter(|t| !t.starts_with('@'))))),
            Value::Array(_) => Err(invalid("nested arrays are only allowed in lists")),
            Value::Object(object) => {
                let keys: Vec<Option<String>> = object.keys().map(|k| active.expand_iri(k, true)).collect();
                if keys.iter().any(|k| k.as_deref() == Some("@value")) {
                    return value_object(active, object);
                }
                if let Some(items) = keyed(active, object, "@list") {
                    return self.list(active, definition, &flatten_list(items)?, graph).map(Some);
                }
                self.node(active, object, graph).map(Some)
            }
        }
    }

    fn list(
        &mut self,
        active: &ActiveContext,
        definition: Option<&TermDefinition>,
        items: &[&Value],
        graph: Option<&Term>,
    ) -> BtcoResult<Term> {
        let mut members = Vec::new();
        for item in items {
            if let Some(term) = self.value(active, definition, item, graph)? {
                members.push(term);
            }
        }
        let nodes: Vec<Term> = members.iter().map(|_| self.blank(None)).collect();
        for (i, member) in members.into_iter().enumerate() {
            let rest = nodes.get(i + 1).cloned().unwrap_or_else(|| Term::Iri(RDF_NIL.to_string()));
            self.push(nodes[i].clone(), Term::Iri(RDF_FIRST.to_string()), member, graph);
            self.push(nodes[i].clone(), Term::Iri(RDF_REST.to_string()), rest, graph);
        }
        Ok(nodes.into_iter().next().unwrap_or_else(|| Term::Iri(RDF_NIL.to_string())))
    }
}

/// The entry of `object` whose key expands to `keyword`.
fn keyed<'v>(active: &ActiveContext, object: &'v Map<String, Value>, keyword: &str) -> Option<&'v Value> {
    object
        .iter()
        .find(|(key, _)| active.expand_iri(key, true).as_deref() == Some(keyword))
        .map(|(_, value)| value)
}

/// List items. Lists of lists are refused.
fn flatten_list(value: &Value) -> BtcoResult<Vec<&Value>> {
    let items: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };
    if items.iter().any(|item| item.is_array()) {
        return Err(invalid("lists of lists are not supported"));
    }
    Ok(items)
}

fn value_object(active: &ActiveContext, object: &Map<String, Value>) -> BtcoResult<Option<Term>> {
    let mut literal = None;
    let mut datatype = None;
    let mut language = None;
    for (key, value) in object {
        match active.expand_iri(key, true).as_deref() {
            Some("@value") => literal = Some(value),
            Some("@type") => {
                let name = value
                    .as_str()
                    .ok_or_else(|| invalid(format!("value @type must be a string, got {value}")))?;
                if name == "@json" {
                    return Err(invalid("@json values are not supported"));
                }
                let expanded = active.expand_iri(name, true).unwrap_or_else(|| name.to_string());
                if !is_absolute(&expanded) {
                    return Err(invalid(format!("datatype '{name}' is not an absolute IRI")));
                }
                datatype = Some(expanded);
            }
            Some("@language") => language = value.as_str().map(str::to_lowercase),
            Some("@index") | Some("@context") => {}
            _ => return Err(invalid(format!("'{key}' is not allowed in a value object"))),
        }
    }

    let datatype = datatype.as_deref();
    match literal {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(text)) => Ok(Some(match (datatype, language) {
            (Some(datatype), _) => Term::literal(text.as_str(), datatype),
            (None, Some(language)) => Term::lang_string(text.as_str(), language),
            (None, None) => Term::literal(text.as_str(), XSD_STRING),
        })),
        Some(Value::Bool(flag)) => Ok(Some(Term::literal(flag.to_string(), datatype.unwrap_or(XSD_BOOLEAN)))),
        Some(Value::Number(number)) => Ok(Some(number_literal(number, datatype))),
        Some(other) => Err(invalid(format!("@value must be a scalar, got {other}"))),
    }
}

fn datatype_or<'a>(coercion: Option<&'a str>, natural: &'a str) -> &'a str {
    coercion.filter(|t| !t.starts_with('@')).unwrap_or(natural)
}

/// Integers keep their decimal form; anything else is a canonical double
/// (`1.5E0`, `1.0E2`).
fn number_literal(number: &Number, datatype: Option<&str>) -> Term {
    let as_double = datatype == Some(XSD_DOUBLE);
    if let Some(integer) = number.as_i64().map(|i| i.to_string()).or_else(|| number.as_u64().map(|u| u.to_string())) {
        if !as_double {
            return Term::literal(integer, datatype.unwrap_or(XSD_INTEGER));
        }
    }
    let value = number.as_f64().unwrap_or_default();
    if !as_double && value.fract() == 0.0 && value.abs() < 1e21 {
        return Term::literal(format!("{value:.0}"), datatype.unwrap_or(XSD_INTEGER));
    }
    Term::literal(canonical_double(value), datatype.unwrap_or(XSD_DOUBLE))
}

fn canonical_double(value: f64) -> String {
    let formatted = format!("{value:.15e}");
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((formatted.as_str(), "0"));
    let mantissa = mantissa.trim_end_matches('0');
    if mantissa.ends_with('.') {
        format!("{mantissa}0E{exponent}")
    } else {
        format!("{mantissa}E{exponent}")
    }
}
