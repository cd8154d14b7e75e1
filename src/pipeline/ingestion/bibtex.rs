use std::collections::HashMap;
use std::path::Path;

use crate::domain::EvidenceFields;
use crate::error::{IngestError, Result};

/// Read the first entry of a BibTeX file into evidence fields.
pub fn read_first_entry(path: &Path) -> Result<EvidenceFields> {
    let content = std::fs::read_to_string(path)?;
    let name = path.display().to_string();
    let fields = parse_first_entry(&content)
        .map_err(|(line, message)| IngestError::source_format(&name, line, message))?;

    let take = |key: &str| fields.get(key).filter(|v| !v.is_empty()).cloned();
    Ok(EvidenceFields {
        uri: take("url"),
        doi: take("doi"),
        author: take("author"),
        title: take("title"),
        year: take("year"),
    })
}

type ParseError = (usize, String);

struct Cursor {
    chars: Vec<char>,
    pos: usize,
}

impl Cursor {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
        }
    }

    fn line(&self) -> usize {
        let end = self.pos.min(self.chars.len());
        self.chars[..end].iter().filter(|c| **c == '\n').count() + 1
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        (self.line(), message.into())
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, wanted: char) -> std::result::Result<(), ParseError> {
        self.skip_ws();
        match self.bump() {
            Some(c) if c == wanted => Ok(()),
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", wanted, c))),
            None => Err(self.error(format!("expected '{}', found end of file", wanted))),
        }
    }

    fn identifier(&mut self) -> String {
        self.skip_ws();
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || "_-:.+/".contains(c) {
                out.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        out
    }

    /// `{...}` with nesting; inner braces are dropped
    fn braced(&mut self) -> std::result::Result<String, ParseError> {
        let mut depth = 1;
        let mut out = String::new();
        while let Some(c) = self.bump() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(out);
                    }
                }
                _ => out.push(c),
            }
        }
        Err(self.error("unterminated braced value"))
    }

    fn quoted(&mut self) -> std::result::Result<String, ParseError> {
        let mut depth = 0;
        let mut out = String::new();
        while let Some(c) = self.bump() {
            match c {
                '{' => depth += 1,
                '}' => depth -= 1,
                '"' if depth == 0 => return Ok(out),
                _ => out.push(c),
            }
        }
        Err(self.error("unterminated quoted value"))
    }

    /// Opening delimiter of a block, returning its closing counterpart.
    /// `None` leaves the cursor in place: the `@` was free text.
    fn open(&mut self) -> Option<char> {
        self.skip_ws();
        let close = match self.peek()? {
            '{' => '}',
            '(' => ')',
            _ => return None,
        };
        self.pos += 1;
        Some(close)
    }

    fn skip_block(&mut self) -> std::result::Result<(), ParseError> {
        match self.open() {
            Some('}') => self.braced().map(drop),
            Some(_) => {
                while let Some(c) = self.bump() {
                    if c == ')' {
                        return Ok(());
                    }
                }
                Err(self.error("unterminated block"))
            }
            None => Ok(()),
        }
    }

    /// Braced or quoted text, a bare number, or a string macro
    fn piece(&mut self, macros: &Macros) -> std::result::Result<String, ParseError> {
        self.skip_ws();
        match self.peek() {
            Some('{') => {
                self.pos += 1;
                self.braced()
            }
            Some('"') => {
                self.pos += 1;
                self.quoted()
            }
            Some(_) => {
                let name = self.identifier();
                if name.is_empty() {
                    return Err(self.error("missing field value"));
                }
                if name.chars().all(|c| c.is_ascii_digit()) {
                    return Ok(name);
                }
                macros
                    .get(&name.to_lowercase())
                    .cloned()
                    .ok_or_else(|| self.error(format!("undefined string macro '{}'", name)))
            }
            None => Err(self.error("missing field value")),
        }
    }

    /// Pieces joined with `#`, concatenated as written
    fn value(&mut self, macros: &Macros) -> std::result::Result<String, ParseError> {
        let mut out = self.piece(macros)?;
        loop {
            self.skip_ws();
            if self.peek() != Some('#') {
                return Ok(out);
            }
            self.pos += 1;
            out.push_str(&self.piece(macros)?);
        }
    }
}

type Macros = HashMap<String, String>;

const MONTHS: [(&str, &str); 12] = [
    ("jan", "January"),
    ("feb", "February"),
    ("mar", "March"),
    ("apr", "April"),
    ("may", "May"),
    ("jun", "June"),
    ("jul", "July"),
    ("aug", "August"),
    ("sep", "September"),
    ("oct", "October"),
    ("nov", "November"),
    ("dec", "December"),
];

fn collapse_ws(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Field map (lowercased keys) of the first `@type{key, field = value, ...}`
/// entry. `@string` definitions seen before it are expanded; `@comment` and
/// `@preamble` blocks are skipped.
fn parse_first_entry(text: &str) -> std::result::Result<HashMap<String, String>, ParseError> {
    let mut cursor = Cursor::new(text);
    let mut macros: Macros = MONTHS
        .iter()
        .map(|(name, month)| (name.to_string(), month.to_string()))
        .collect();
    loop {
        while cursor.peek().is_some_and(|c| c != '@') {
            cursor.pos += 1;
        }
        if cursor.bump().is_none() {
            return Err(cursor.error("no entry found"));
        }
        let kind = cursor.identifier().to_lowercase();
        match kind.as_str() {
            "" => continue,
            "comment" | "preamble" => cursor.skip_block()?,
            "string" => {
                let Some(close) = cursor.open() else { continue };
                let name = cursor.identifier().to_lowercase();
                if name.is_empty() {
                    return Err(cursor.error("expected a macro name"));
                }
                cursor.expect('=')?;
                let value = cursor.value(&macros)?;
                cursor.expect(close)?;
                macros.insert(name, value);
            }
            _ => {
                let Some(close) = cursor.open() else { continue };
                // citation key
                cursor.identifier();
                return fields(&mut cursor, &macros, close);
            }
        }
    }
}

fn fields(
    cursor: &mut Cursor,
    macros: &Macros,
    close: char,
) -> std::result::Result<HashMap<String, String>, ParseError> {
    let mut out = HashMap::new();
    loop {
        cursor.skip_ws();
        match cursor.peek() {
            Some(c) if c == close => return Ok(out),
            Some(',') => {
                cursor.pos += 1;
                continue;
            }
            Some(_) => {}
            None => return Err(cursor.error("unterminated entry")),
        }
        let key = cursor.identifier().to_lowercase();
        if key.is_empty() {
            return Err(cursor.error("expected a field name"));
        }
        cursor.expect('=')?;
        let value = collapse_ws(&cursor.value(macros)?);
        out.entry(key).or_insert(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const ALTUN: &str = r#"
% exported from a reference manager
@comment{ jabref-meta: databaseType:bibtex; }

@article{altun2009,
  author  = {Altun, Zeynep F. and Chen, Bojun and Wang, Zi-Wei and Hall, David H.},
  title   = {High resolution map of {Caenorhabditis elegans}
             gap junction proteins},
  journal = "Developmental Dynamics",
  year    = 2009,
  doi     = {10.1002/dvdy.21982}
}

@misc{second, title = {ignored}}
"#;

    #[test]
    fn test_first_entry_fields_are_extracted() {
        let fields = parse_first_entry(ALTUN).unwrap();
        assert_eq!(
            fields["title"],
            "High resolution map of Caenorhabditis elegans gap junction proteins"
        );
        assert_eq!(fields["year"], "2009");
        assert_eq!(fields["journal"], "Developmental Dynamics");
        assert_eq!(fields["doi"], "10.1002/dvdy.21982");
    }

    #[test]
    fn test_read_first_entry_maps_to_evidence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(ALTUN.as_bytes()).unwrap();
        let evidence = read_first_entry(file.path()).unwrap();
        assert_eq!(evidence.year.as_deref(), Some("2009"));
        assert!(evidence.author.unwrap().starts_with("Altun, Zeynep F."));
        assert_eq!(evidence.uri, None);
    }

    #[test]
    fn test_file_without_entries_is_malformed() {
        let (_, message) = parse_first_entry("% nothing here\n").unwrap_err();
        assert_eq!(message, "no entry found");
    }

    #[test]
    fn test_string_macros_and_concatenation_are_expanded() {
        let text = r#"
% contact: curator@example.org
@string{dd = "Developmental Dynamics"}
@STRING(wa = {Worm} # "Atlas")
@article{altun2009,
  journal = dd,
  title   = "Neuronal " # {wiring} # " via " # wa,
  month   = jun,
  year    = 2009
}
"#;
        let fields = parse_first_entry(text).unwrap();
        assert_eq!(fields["journal"], "Developmental Dynamics");
        assert_eq!(fields["title"], "Neuronal wiring via WormAtlas");
        assert_eq!(fields["month"], "June");
        assert_eq!(fields["year"], "2009");
    }

    #[test]
    fn test_undefined_macro_is_malformed() {
        let (line, message) = parse_first_entry("@misc{key,\n title = nowhere}").unwrap_err();
        assert_eq!(line, 2);
        assert!(message.contains("nowhere"));
    }

    #[test]
    fn test_comment_blocks_may_contain_entries() {
        let text = "@comment{ @misc{hidden, title = {no}} }\n@misc{shown, title = {yes}}";
        assert_eq!(parse_first_entry(text).unwrap()["title"], "yes");
    }

    #[test]
    fn test_unterminated_entry_reports_error() {
        assert!(parse_first_entry("@book{key,\n title = {open").is_err());
    }
}
