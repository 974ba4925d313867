//! # RDF Dataset Canonicalization
//!
//! RDFC-1.0 over the quads JSON-LD expansion produces. Blank nodes are
//! relabelled `c14n0`, `c14n1`, ... from the shape of the graph around them,
//! so datasets that differ only in blank node labels or statement order
//! serialize to the same canonical N-Quads.
//!
//! ```text
//!   quads ──first-degree hash──> unique hash  ──> issue c14n id
//!                  │
//!                  └──────────> shared hash  ──N-degree hash──> issue c14n ids
//!
//!   relabelled quads ──N-Quads line each──> sort ──> canonical document
//! ```
//!
//! N-degree hashing permutes the blank nodes related to a node, which is
//! exponential on adversarial input. A dataset that needs more than
//! [`MAX_N_DEGREE_CALLS`] rounds, or permutes more than
//! [`MAX_PERMUTED_NODES`] nodes at once, is refused.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::crypto::hash::sha256_hex;
use crate::error::{BtcoError, BtcoResult};

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const RDF_FIRST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#first";
pub const RDF_REST: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#rest";
pub const RDF_NIL: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#nil";
pub const RDF_LANG_STRING: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString";
pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";

pub const MAX_N_DEGREE_CALLS: usize = 4096;
pub const MAX_PERMUTED_NODES: usize = 8;

// ---------------------------------------------------------------------------
// Terms and quads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Iri(String),
    Blank(String),
    Literal {
        value: String,
        datatype: String,
        language: Option<String>,
    },
}

impl Term {
    pub fn literal(value: impl Into<String>, datatype: &str) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: datatype.to_string(),
            language: None,
        }
    }

    pub fn lang_string(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self::Literal {
            value: value.into(),
            datatype: RDF_LANG_STRING.to_string(),
            language: Some(language.into()),
        }
    }

    fn blank_id(&self) -> Option<&str> {
        match self {
            Self::Blank(id) => Some(id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Quad {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
    /// `None` is the default graph.
    pub graph: Option<Term>,
}

impl Quad {
    fn predicate_iri(&self) -> &str {
        match &self.predicate {
            Term::Iri(iri) => iri,
            _ => "",
        }
    }

    /// Blank node components with their position tag.
    fn blank_components(&self) -> impl Iterator<Item = (char, &str)> {
        [
            ('s', Some(&self.subject)),
            ('o', Some(&self.object)),
            ('g', self.graph.as_ref()),
        ]
        .into_iter()
        .filter_map(|(position, term)| term.and_then(Term::blank_id).map(|id| (position, id)))
    }
}

// ---------------------------------------------------------------------------
// N-Quads
// ---------------------------------------------------------------------------

/// One N-Quads line, blank node labels mapped through `label`.
fn nquad(quad: &Quad, label: &impl Fn(&str) -> String) -> String {
    let mut line = String::new();
    write_term(&quad.subject, label, &mut line);
    line.push(' ');
    write_term(&quad.predicate, label, &mut line);
    line.push(' ');
    write_term(&quad.object, label, &mut line);
    if let Some(graph) = &quad.graph {
        line.push(' ');
        write_term(graph, label, &mut line);
    }
    line.push_str(" .\n");
    line
}

fn write_term(term: &Term, label: &impl Fn(&str) -> String, out: &mut String) {
    match term {
        Term::Iri(iri) => {
            out.push('<');
            out.push_str(iri);
            out.push('>');
        }
        Term::Blank(id) => {
            out.push_str("_:");
            out.push_str(&label(id));
        }
        Term::Literal {
            value,
            datatype,
            language,
        } => {
            out.push('"');
            escape_literal(value, out);
            out.push('"');
            if let Some(language) = language {
                out.push('@');
                out.push_str(language);
            } else if datatype != XSD_STRING {
                out.push_str("^^<");
                out.push_str(datatype);
                out.push('>');
            }
        }
    }
}

fn escape_literal(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if c <= '\u{1f}' || c == '\u{7f}' => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
}

// ---------------------------------------------------------------------------
// Identifier issuers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct IdentifierIssuer {
    prefix: &'static str,
    counter: usize,
    issued: HashMap<String, String>,
    /// Existing labels in the order they were issued.
    order: Vec<String>,
}

impl IdentifierIssuer {
    fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            counter: 0,
            issued: HashMap::new(),
            order: Vec::new(),
        }
    }

    fn issue(&mut self, existing: &str) -> String {
        if let Some(id) = self.issued.get(existing) {
            return id.clone();
        }
        let id = format!("{}{}", self.prefix, self.counter);
        self.counter += 1;
        self.issued.insert(existing.to_string(), id.clone());
        self.order.push(existing.to_string());
        id
    }

    fn get(&self, existing: &str) -> Option<&str> {
        self.issued.get(existing).map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Canonicalization
// ---------------------------------------------------------------------------

/// Canonical N-Quads of `quads`. Duplicate quads collapse to one line.
pub fn canonicalize(quads: &[Quad]) -> BtcoResult<String> {
    let mut seen = HashSet::new();
    let unique: Vec<Quad> = quads.iter().filter(|quad| seen.insert(*quad)).cloned().collect();

    let mut state = Canonicalizer::new(&unique);
    state.label_blank_nodes()?;

    let label = |id: &str| state.canonical.get(id).unwrap_or(id).to_string();
    let mut lines: Vec<String> = unique.iter().map(|quad| nquad(quad, &label)).collect();
    lines.sort();
    Ok(lines.concat())
}

struct Canonicalizer<'a> {
    quads: &'a [Quad],
    blank_to_quads: HashMap<String, Vec<usize>>,
    canonical: IdentifierIssuer,
    first_degree: HashMap<String, String>,
    n_degree_calls: usize,
}

impl<'a> Canonicalizer<'a> {
    fn new(quads: &'a [Quad]) -> Self {
        let mut blank_to_quads: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, quad) in quads.iter().enumerate() {
            for (_, id) in quad.blank_components() {
                let entries = blank_to_quads.entry(id.to_string()).or_default();
                if entries.last() != Some(&i) {
                    entries.push(i);
                }
            }
        }
        Self {
            quads,
            blank_to_quads,
            canonical: IdentifierIssuer::new("c14n"),
            first_degree: HashMap::new(),
            n_degree_calls: 0,
        }
    }

    fn label_blank_nodes(&mut self) -> BtcoResult<()> {
        let mut nodes: Vec<String> = self.blank_to_quads.keys().cloned().collect();
        nodes.sort();

        let mut by_hash: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for node in nodes {
            let hash = self.hash_first_degree(&node);
            by_hash.entry(hash).or_default().push(node);
        }

        let mut shared = Vec::new();
        for (_, nodes) in by_hash {
            if nodes.len() == 1 {
                self.canonical.issue(&nodes[0]);
            } else {
                shared.push(nodes);
            }
        }

        for nodes in shared {
            let mut paths = Vec::new();
            for node in &nodes {
                if self.canonical.get(node).is_some() {
                    continue;
                }
                let mut temporary = IdentifierIssuer::new("b");
                temporary.issue(node);
                paths.push(self.hash_n_degree(node, temporary)?);
            }
            paths.sort_by(|a, b| a.0.cmp(&b.0));
            for (_, issuer) in paths {
                for existing in &issuer.order {
                    self.canonical.issue(existing);
                }
            }
        }
        Ok(())
    }

    fn hash_first_degree(&mut self, node: &str) -> String {
        if let Some(hash) = self.first_degree.get(node) {
            return hash.clone();
        }
        let quads = self.quads;
        let label = |id: &str| if id == node { "a".to_string() } else { "z".to_string() };
        let mut lines: Vec<String> = self
            .blank_to_quads
            .get(node)
            .map(|indices| indices.iter().map(|&i| nquad(&quads[i], &label)).collect())
            .unwrap_or_default();
        lines.sort();
        let hash = sha256_hex(lines.concat().as_bytes());
        self.first_degree.insert(node.to_string(), hash.clone());
        hash
    }

    fn hash_related(&mut self, related: &str, quad: &Quad, issuer: &IdentifierIssuer, position: char) -> String {
        let mut input = position.to_string();
        if position != 'g' {
            input.push('<');
            input.push_str(quad.predicate_iri());
            input.push('>');
        }
        if let Some(id) = self.canonical.get(related) {
            input.push_str("_:");
            input.push_str(id);
        } else if let Some(id) = issuer.get(related) {
            input.push_str("_:");
            input.push_str(id);
        } else {
            let hash = self.hash_first_degree(related);
            input.push_str(&hash);
        }
        sha256_hex(input.as_bytes())
    }

    fn hash_n_degree(
        &mut self,
        node: &str,
        mut issuer: IdentifierIssuer,
    ) -> BtcoResult<(String, IdentifierIssuer)> {
        self.n_degree_calls += 1;
        if self.n_degree_calls > MAX_N_DEGREE_CALLS {
            return Err(BtcoError::InvalidInput(
                "dataset needs too many N-degree rounds to canonicalize".into(),
            ));
        }

        let quads = self.quads;
        let indices = self.blank_to_quads.get(node).cloned().unwrap_or_default();
        let mut related_by_hash: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for i in indices {
            let quad = &quads[i];
            for (position, related) in quad.blank_components() {
                if related != node {
                    let hash = self.hash_related(related, quad, &issuer, position);
                    related_by_hash.entry(hash).or_default().push(related.to_string());
                }
            }
        }

        let mut data = String::new();
        for (hash, related) in related_by_hash {
            data.push_str(&hash);
            if related.len() > MAX_PERMUTED_NODES {
                return Err(BtcoError::InvalidInput(format!(
                    "{} indistinguishable blank nodes cannot be canonicalized",
                    related.len()
                )));
            }

            let mut chosen_path = String::new();
            let mut chosen_issuer: Option<IdentifierIssuer> = None;
            'permutations: for permutation in permutations(&related) {
                let mut issuer_copy = issuer.clone();
                let mut path = String::new();
                let mut recursion = Vec::new();

                for other in &permutation {
                    if let Some(id) = self.canonical.get(other) {
                        path.push_str("_:");
                        path.push_str(id);
                    } else {
                        if issuer_copy.get(other).is_none() {
                            recursion.push(other.clone());
                        }
                        path.push_str("_:");
                        path.push_str(&issuer_copy.issue(other));
                    }
                    if worse(&path, &chosen_path) {
                        continue 'permutations;
                    }
                }

                for other in recursion {
                    let (result_hash, result_issuer) = self.hash_n_degree(&other, issuer_copy.clone())?;
                    path.push_str("_:");
                    path.push_str(&issuer_copy.issue(&other));
                    path.push('<');
                    path.push_str(&result_hash);
                    path.push('>');
                    issuer_copy = result_issuer;
                    if worse(&path, &chosen_path) {
                        continue 'permutations;
                    }
                }

                if chosen_path.is_empty() || path < chosen_path {
                    chosen_path = path;
                    chosen_issuer = Some(issuer_copy);
                }
            }

            data.push_str(&chosen_path);
            if let Some(chosen) = chosen_issuer {
                issuer = chosen;
            }
        }

        Ok((sha256_hex(data.as_bytes()), issuer))
    }
}

/// `path` can no longer beat `chosen`.
fn worse(path: &str, chosen: &str) -> bool {
    !chosen.is_empty() && path.len() >= chosen.len() && path > chosen
}

/// Every ordering of `items` (Heap's algorithm).
fn permutations(items: &[String]) -> Vec<Vec<String>> {
    let mut items = items.to_vec();
    let mut out = vec![items.clone()];
    let mut counters = vec![0usize; items.len()];
    let mut i = 1;
    while i < items.len() {
        if counters[i] < i {
            if i % 2 == 0 {
                items.swap(0, i);
            } else {
                items.swap(counters[i], i);
            }
            out.push(items.clone());
            counters[i] += 1;
            i = 1;
        } else {
            counters[i] = 0;
            i += 1;
        }
    }
    out
}
