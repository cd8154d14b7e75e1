//! Cell name canonicalization shared by every dataset stage.
//!
//! Providers disagree on how to spell the same cell: some zero-pad numeric
//! suffixes (`VB01`), some publish joint entries for cells they could not tell
//! apart (`DB1/3`), and some list the same name several times. The pure rules
//! live in [`canonical_name`]; per-pass collision handling is [`Disambiguator`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

static ZERO_PADDED: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\w+0+[1-9]+").unwrap());

/// How an alias resolves
enum AliasTarget {
    Fixed(&'static str),
    /// Resolved by the first character of the discriminant (the lineage name)
    ByDiscriminant(&'static [(char, &'static str)]),
}

const ALIASES: &[(&str, AliasTarget)] = &[
    ("DB1/3", AliasTarget::Fixed("DB1")),
    ("DB3/1", AliasTarget::Fixed("DB3")),
    (
        "AVFL/R",
        AliasTarget::ByDiscriminant(&[('W', "AVFL"), ('P', "AVFR")]),
    ),
];

fn resolve_alias<'a>(name: &'a str, discriminant: Option<&str>) -> &'a str {
    let Some((_, target)) = ALIASES.iter().find(|(alias, _)| *alias == name) else {
        return name;
    };
    match target {
        AliasTarget::Fixed(resolved) => *resolved,
        AliasTarget::ByDiscriminant(choices) => {
            let first = discriminant.and_then(|d| d.chars().next());
            choices
                .iter()
                .find(|(c, _)| Some(*c) == first)
                .map(|(_, resolved)| *resolved)
                .unwrap_or(name)
        }
    }
}

fn strip_zero_padding(name: &str) -> String {
    if ZERO_PADDED.is_match(name) {
        name.replace('0', "")
    } else {
        name.to_string()
    }
}

/// Alias substitution followed by zero-stripping. Pure and idempotent.
///
/// Stripping can turn a padded spelling into an alias key (`DB01/3`), so the
/// alias table is consulted again afterwards. Alias targets carry no zeros.
pub fn canonical_name(raw: &str, discriminant: Option<&str>) -> String {
    let stripped = strip_zero_padding(resolve_alias(raw.trim(), discriminant));
    resolve_alias(&stripped, discriminant).to_string()
}

/// Per-pass collision counter: the first occurrence of a name keeps it, later
/// ones get `(1)`, `(2)`, ... appended.
#[derive(Debug, Default)]
pub struct Disambiguator {
    counters: HashMap<String, u32>,
    assigned: HashSet<String>,
}

impl Disambiguator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(&mut self, base: String) -> String {
        if self.assigned.insert(base.clone()) {
            self.counters.insert(base.clone(), 0);
            return base;
        }
        let counter = self.counters.entry(base.clone()).or_insert(0);
        loop {
            *counter += 1;
            let candidate = format!("{}({})", base, counter);
            if self.assigned.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Full normalizer: canonical name plus optional disambiguation.
#[derive(Debug, Default)]
pub struct Normalizer {
    disambiguator: Option<Disambiguator>,
}

impl Normalizer {
    /// Normalizer that never renames repeats (connectivity rows repeat names legitimately)
    pub fn canonical_only() -> Self {
        Self { disambiguator: None }
    }

    pub fn disambiguating() -> Self {
        Self {
            disambiguator: Some(Disambiguator::new()),
        }
    }

    pub fn normalize(&mut self, raw: &str, discriminant: Option<&str>) -> String {
        let name = canonical_name(raw, discriminant);
        match self.disambiguator.as_mut() {
            Some(d) => d.assign(name),
            None => name,
        }
    }
}
