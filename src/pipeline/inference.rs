//! Forward-chaining inference over the stored triples.
//!
//! Rules are Horn clauses over triple patterns, loaded from TOML:
//!
//! ```toml
//! [[rule]]
//! name = "innervates"
//! when = ["?m ow:innervatedBy ?n"]
//! then = ["?n ow:innervates ?m"]
//! ```
//!
//! Pattern terms are `?var`, `prefix:local` (`ow`, `rdf`), `<iri>`,
//! `"literal"`, an integer, or `a` for `rdf:type`.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

use crate::constants::expand_prefixed;
use crate::domain::{Term, Triple};
use crate::error::{IngestError, Result};
use crate::pipeline::storage::FactStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternTerm {
    Var(String),
    Const(Term),
}

impl PatternTerm {
    fn parse(token: &str) -> Result<Self> {
        if let Some(var) = token.strip_prefix('?') {
            if var.is_empty() {
                return Err(IngestError::Rule("empty variable name".to_string()));
            }
            return Ok(PatternTerm::Var(var.to_string()));
        }
        if let Some(literal) = token.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            return Ok(PatternTerm::Const(Term::literal(literal)));
        }
        if let Some(iri) = token.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
            return Ok(PatternTerm::Const(Term::iri(iri)));
        }
        if token == "a" {
            return Ok(PatternTerm::Const(Term::iri(
                expand_prefixed("rdf:type").unwrap_or_default(),
            )));
        }
        if let Ok(value) = token.parse::<i64>() {
            return Ok(PatternTerm::Const(Term::Integer(value)));
        }
        expand_prefixed(token)
            .map(|iri| PatternTerm::Const(Term::Iri(iri)))
            .ok_or_else(|| IngestError::Rule(format!("unrecognized term '{}'", token)))
    }

    fn resolve<'a>(&'a self, bindings: &'a Bindings) -> Option<&'a Term> {
        match self {
            PatternTerm::Const(term) => Some(term),
            PatternTerm::Var(name) => bindings.get(name),
        }
    }
}

type Bindings = HashMap<String, Term>;

/// Split a pattern into terms, keeping quoted literals whole
fn tokenize(pattern: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut chars = pattern.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut token = String::new();
        if c == '"' {
            token.push(chars.next().unwrap_or('"'));
            let mut closed = false;
            for c in chars.by_ref() {
                token.push(c);
                if c == '"' {
                    closed = true;
                    break;
                }
            }
            if !closed {
                return Err(IngestError::Rule(format!(
                    "unterminated literal in '{}'",
                    pattern
                )));
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                token.push(c);
                chars.next();
            }
        }
        tokens.push(token);
    }
    Ok(tokens)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: PatternTerm,
    pub predicate: PatternTerm,
    pub object: PatternTerm,
}

impl TriplePattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let tokens = tokenize(pattern)?;
        let [s, p, o] = tokens.as_slice() else {
            return Err(IngestError::Rule(format!(
                "pattern '{}' must have exactly three terms",
                pattern
            )));
        };
        Ok(Self {
            subject: PatternTerm::parse(s)?,
            predicate: PatternTerm::parse(p)?,
            object: PatternTerm::parse(o)?,
        })
    }

    fn variables(&self) -> impl Iterator<Item = &str> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .filter_map(|t| match t {
                PatternTerm::Var(name) => Some(name.as_str()),
                PatternTerm::Const(_) => None,
            })
    }

    /// Extend `bindings` so this pattern matches `triple`
    fn unify(&self, triple: &Triple, bindings: &Bindings) -> Option<Bindings> {
        let mut out = bindings.clone();
        for (pattern, term) in [
            (&self.subject, &triple.subject),
            (&self.predicate, &triple.predicate),
            (&self.object, &triple.object),
        ] {
            match pattern {
                PatternTerm::Const(expected) => {
                    if expected != term {
                        return None;
                    }
                }
                PatternTerm::Var(name) => match out.get(name) {
                    Some(bound) if bound != term => return None,
                    Some(_) => {}
                    None => {
                        out.insert(name.clone(), term.clone());
                    }
                },
            }
        }
        Some(out)
    }

    fn instantiate(&self, bindings: &Bindings) -> Option<Triple> {
        let triple = Triple::new(
            self.subject.resolve(bindings)?.clone(),
            self.predicate.resolve(bindings)?.clone(),
            self.object.resolve(bindings)?.clone(),
        );
        // Only IRIs may stand in subject or predicate position
        if triple.subject.as_iri().is_none() || triple.predicate.as_iri().is_none() {
            return None;
        }
        Some(triple)
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub when: Vec<TriplePattern>,
    pub then: Vec<TriplePattern>,
}

#[derive(Debug, Deserialize)]
struct RuleDef {
    name: String,
    when: Vec<String>,
    then: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rule: Vec<RuleDef>,
}

impl Rule {
    fn from_def(def: RuleDef) -> Result<Self> {
        if def.when.is_empty() || def.then.is_empty() {
            return Err(IngestError::Rule(format!(
                "rule '{}' needs at least one `when` and one `then` pattern",
                def.name
            )));
        }
        let when = def
            .when
            .iter()
            .map(|p| TriplePattern::parse(p))
            .collect::<Result<Vec<_>>>()?;
        let then = def
            .then
            .iter()
            .map(|p| TriplePattern::parse(p))
            .collect::<Result<Vec<_>>>()?;

        let bound: HashSet<&str> = when.iter().flat_map(|p| p.variables()).collect();
        if let Some(unbound) = then
            .iter()
            .flat_map(|p| p.variables())
            .find(|v| !bound.contains(v))
        {
            return Err(IngestError::Rule(format!(
                "rule '{}' uses ?{} in `then` without binding it in `when`",
                def.name, unbound
            )));
        }
        Ok(Self {
            name: def.name,
            when,
            then,
        })
    }
}

/// Facts derived by one engine run
#[derive(Debug, Clone, Default)]
pub struct Derivation {
    /// Triples not present in the input, in derivation order
    pub triples: Vec<Triple>,
    pub rounds: usize,
}

/// Forward-chaining engine seam
pub trait RuleEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Derive every consequence of `facts` that is not already among them.
    fn derive(&self, facts: &[Triple]) -> Result<Derivation>;
}

/// Naive fixpoint evaluation of Horn rules over triple patterns
pub struct HornRuleEngine {
    rules: Vec<Rule>,
    max_rounds: usize,
}

impl HornRuleEngine {
    pub fn new(rules: Vec<Rule>, max_rounds: usize) -> Self {
        Self {
            rules,
            max_rounds: max_rounds.max(1),
        }
    }

    pub fn from_toml_str(content: &str, max_rounds: usize) -> Result<Self> {
        let file: RuleFile = toml::from_str(content)?;
        let rules = file
            .rule
            .into_iter()
            .map(Rule::from_def)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(rules, max_rounds))
    }

    pub fn load(path: &Path, max_rounds: usize) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IngestError::Config(format!(
                "Failed to read rule file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let engine = Self::from_toml_str(&content, max_rounds)?;
        info!("Loaded {} inference rules from {}", engine.rules.len(), path.display());
        Ok(engine)
    }

    fn matches(
        rule: &Rule,
        by_predicate: &HashMap<&Term, Vec<&Triple>>,
        all: &[&Triple],
    ) -> Vec<Bindings> {
        let mut solutions = vec![Bindings::new()];
        for pattern in &rule.when {
            let candidates: &[&Triple] = match &pattern.predicate {
                PatternTerm::Const(predicate) => by_predicate
                    .get(predicate)
                    .map(|v| v.as_slice())
                    .unwrap_or(&[]),
                PatternTerm::Var(_) => all,
            };
            solutions = solutions
                .iter()
                .flat_map(|bindings| {
                    candidates
                        .iter()
                        .filter_map(move |triple| pattern.unify(triple, bindings))
                })
                .collect();
            if solutions.is_empty() {
                break;
            }
        }
        solutions
    }
}

impl RuleEngine for HornRuleEngine {
    fn name(&self) -> &str {
        "horn"
    }

    fn derive(&self, facts: &[Triple]) -> Result<Derivation> {
        let mut known: HashSet<Triple> = facts.iter().cloned().collect();
        let mut derivation = Derivation::default();

        while derivation.rounds < self.max_rounds {
            derivation.rounds += 1;
            let all: Vec<&Triple> = known.iter().collect();
            let mut by_predicate: HashMap<&Term, Vec<&Triple>> = HashMap::new();
            for triple in &all {
                by_predicate.entry(&triple.predicate).or_default().push(triple);
            }

            let mut fresh: Vec<Triple> = Vec::new();
            let mut new_in_round: HashSet<Triple> = HashSet::new();
            for rule in &self.rules {
                let solutions = Self::matches(rule, &by_predicate, &all);
                debug!("Rule {} matched {} times", rule.name, solutions.len());
                for bindings in &solutions {
                    for head in &rule.then {
                        let Some(triple) = head.instantiate(bindings) else {
                            continue;
                        };
                        if known.contains(&triple) || new_in_round.contains(&triple) {
                            continue;
                        }
                        new_in_round.insert(triple.clone());
                        fresh.push(triple);
                    }
                }
            }

            if fresh.is_empty() {
                return Ok(derivation);
            }
            known.extend(fresh.iter().cloned());
            derivation.triples.extend(fresh);
        }

        warn!(
            "Inference stopped after {} rounds without reaching a fixpoint",
            self.max_rounds
        );
        Ok(derivation)
    }
}

/// What one inference pass did to the store
#[derive(Debug, Clone, Default, Serialize)]
pub struct InferenceReport {
    pub engine: String,
    pub facts_in: usize,
    pub derived: usize,
    pub inserted: usize,
    pub rounds: usize,
}

/// Pull every stored triple, run `engine` over them and write back only the
/// triples it derived. Nothing already stored is touched.
#[instrument(skip_all, fields(engine = %engine.name()))]
pub async fn infer(store: &dyn FactStore, engine: &dyn RuleEngine) -> Result<InferenceReport> {
    let facts = store.triples().await?;
    info!("🧠 Running inference over {} triples", facts.len());
    let derivation = engine.derive(&facts)?;

    let existing: HashSet<&Triple> = facts.iter().collect();
    let delta: Vec<Triple> = derivation
        .triples
        .iter()
        .filter(|t| t.predicate.as_iri().is_some() && !existing.contains(t))
        .cloned()
        .collect();
    let inserted = store.insert(&delta).await?;
    metrics::counter!("worm_ingest_inferred_triples_total").increment(inserted as u64);
    info!(
        "Inference derived {} triples in {} rounds, inserted {}",
        derivation.triples.len(),
        derivation.rounds,
        inserted
    );

    Ok(InferenceReport {
        engine: engine.name().to_string(),
        facts_in: facts.len(),
        derived: derivation.triples.len(),
        inserted,
        rounds: derivation.rounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::storage::InMemoryFactStore;

    const RULES: &str = r#"
        [[rule]]
        name = "innervates"
        when = ["?m ow:innervatedBy ?n"]
        then = ["?n ow:innervates ?m"]

        [[rule]]
        name = "gap-junctions-are-symmetric"
        when = ["?c ow:syntype \"gapJunction\"", "?c ow:pre_cell ?a", "?c ow:post_cell ?b"]
        then = ["?a ow:gapJunctionWith ?b", "?b ow:gapJunctionWith ?a"]

        [[rule]]
        name = "neurons-are-cells"
        when = ["?n a ow:Neuron"]
        then = ["?n a ow:Cell"]

        [[rule]]
        name = "cells-are-things"
        when = ["?n a ow:Cell"]
        then = ["?n ow:isA \"thing\""]
    "#;

    fn ow(local: &str) -> Term {
        Term::iri(format!("http://openworm.org/entities/{local}"))
    }

    fn rdf_type() -> Term {
        Term::iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#type")
    }

    fn facts() -> Vec<Triple> {
        let conn = ow("Connection/AVAL/AVAR/gapJunction");
        vec![
            Triple::new(ow("Muscle/MDL08"), ow("innervatedBy"), ow("Neuron/DA1")),
            Triple::new(conn.clone(), ow("syntype"), Term::literal("gapJunction")),
            Triple::new(conn.clone(), ow("pre_cell"), ow("Neuron/AVAL")),
            Triple::new(conn, ow("post_cell"), ow("Neuron/AVAR")),
            Triple::new(ow("Neuron/AVAL"), rdf_type(), ow("Neuron")),
        ]
    }

    #[test]
    fn test_patterns_parse_every_term_form() {
        let pattern = TriplePattern::parse("?c ow:syntype \"gap junction\"").unwrap();
        assert_eq!(pattern.subject, PatternTerm::Var("c".to_string()));
        assert_eq!(pattern.predicate, PatternTerm::Const(ow("syntype")));
        assert_eq!(
            pattern.object,
            PatternTerm::Const(Term::literal("gap junction"))
        );
        let pattern = TriplePattern::parse("<urn:x> a 7").unwrap();
        assert_eq!(pattern.predicate, PatternTerm::Const(rdf_type()));
        assert_eq!(pattern.object, PatternTerm::Const(Term::Integer(7)));
    }

    #[test]
    fn test_bad_rules_are_rejected() {
        assert!(TriplePattern::parse("?a ow:x").is_err());
        assert!(TriplePattern::parse("?a foaf:knows ?b").is_err());
        let unbound = r#"
            [[rule]]
            name = "bad"
            when = ["?a ow:x ?b"]
            then = ["?a ow:y ?c"]
        "#;
        let err = HornRuleEngine::from_toml_str(unbound, 4).err().unwrap();
        assert!(matches!(err, IngestError::Rule(_)));
    }

    #[test]
    fn test_derives_to_fixpoint() {
        let engine = HornRuleEngine::from_toml_str(RULES, 16).unwrap();
        let derivation = engine.derive(&facts()).unwrap();
        let derived: HashSet<Triple> = derivation.triples.iter().cloned().collect();

        assert!(derived.contains(&Triple::new(
            ow("Neuron/DA1"),
            ow("innervates"),
            ow("Muscle/MDL08")
        )));
        assert!(derived.contains(&Triple::new(
            ow("Neuron/AVAR"),
            ow("gapJunctionWith"),
            ow("Neuron/AVAL")
        )));
        // second-round consequence of a first-round derivation
        assert!(derived.contains(&Triple::new(
            ow("Neuron/AVAL"),
            ow("isA"),
            Term::literal("thing")
        )));
        assert_eq!(derivation.triples.len(), 5);
        assert_eq!(derivation.rounds, 3);
    }

    #[test]
    fn test_round_limit_stops_chaining() {
        let engine = HornRuleEngine::from_toml_str(RULES, 1).unwrap();
        let derivation = engine.derive(&facts()).unwrap();
        assert_eq!(derivation.rounds, 1);
        assert_eq!(derivation.triples.len(), 4);
    }

    #[tokio::test]
    async fn test_infer_is_additive_and_idempotent() {
        let store = InMemoryFactStore::new();
        store.insert(&facts()).await.unwrap();
        let engine = HornRuleEngine::from_toml_str(RULES, 16).unwrap();

        let first = infer(&store, &engine).await.unwrap();
        assert_eq!(first.facts_in, 5);
        assert_eq!(first.inserted, 5);
        let after_first = store.triples().await.unwrap();
        assert_eq!(&after_first[..5], facts().as_slice());

        let second = infer(&store, &engine).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(store.len().await.unwrap(), 10);
    }
}
