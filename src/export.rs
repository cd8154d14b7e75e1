//! N-Triples serialization of the fact store.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::domain::{Term, Triple};
use crate::error::Result;

const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";

fn escape_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out
}

fn term_to_ntriples(term: &Term) -> String {
    match term {
        Term::Iri(iri) => format!("<{}>", iri),
        Term::Literal(value) => format!("\"{}\"", escape_literal(value)),
        Term::Integer(value) => format!("\"{}\"^^<{}>", value, XSD_INTEGER),
    }
}

pub fn triple_line(triple: &Triple) -> String {
    format!(
        "{} {} {} .",
        term_to_ntriples(&triple.subject),
        term_to_ntriples(&triple.predicate),
        term_to_ntriples(&triple.object)
    )
}

pub fn write_ntriples_to<W: Write>(writer: &mut W, triples: &[Triple]) -> Result<usize> {
    for triple in triples {
        writeln!(writer, "{}", triple_line(triple))?;
    }
    writer.flush()?;
    Ok(triples.len())
}

/// Write `triples` to `path`, creating parent directories as needed.
pub fn write_ntriples(path: &Path, triples: &[Triple]) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    let written = write_ntriples_to(&mut writer, triples)?;
    info!("📄 Wrote {} triples to {}", written, path.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Vec<Triple> {
        vec![
            Triple::new(
                Term::iri("http://openworm.org/entities/Neuron/AVAL"),
                Term::iri("http://openworm.org/entities/description"),
                Term::literal("says \"hi\"\n\tback\\slash"),
            ),
            Triple::new(
                Term::iri("http://openworm.org/entities/Connection/AVAL/AVBL/send"),
                Term::iri("http://openworm.org/entities/number"),
                Term::Integer(8),
            ),
        ]
    }

    #[test]
    fn test_literals_are_escaped() {
        assert_eq!(
            triple_line(&sample()[0]),
            "<http://openworm.org/entities/Neuron/AVAL> \
             <http://openworm.org/entities/description> \
             \"says \\\"hi\\\"\\n\\tback\\\\slash\" ."
        );
    }

    #[test]
    fn test_integers_are_typed() {
        assert!(triple_line(&sample()[1])
            .ends_with("\"8\"^^<http://www.w3.org/2001/XMLSchema#integer> ."));
    }

    #[test]
    fn test_writes_one_line_per_triple() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("worm.nt");
        assert_eq!(write_ntriples(&path, &sample()).unwrap(), 2);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.lines().all(|l| l.ends_with(" .")));
    }
}
