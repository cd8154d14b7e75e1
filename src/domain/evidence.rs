use serde::Serialize;
use uuid::Uuid;

/// Bibliographic fields of a provenance record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EvidenceFields {
    pub uri: Option<String>,
    pub doi: Option<String>,
    pub author: Option<String>,
    pub title: Option<String>,
    pub year: Option<String>,
}

impl EvidenceFields {
    pub fn titled(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            ..Self::default()
        }
    }

    pub fn with_uri(uri: &str) -> Self {
        Self {
            uri: Some(uri.to_string()),
            ..Self::default()
        }
    }

    pub fn is_unattributed(&self) -> bool {
        *self == Self::default()
    }

    /// Field name/value pairs that are set, in a fixed order
    pub fn entries(&self) -> Vec<(&'static str, &str)> {
        [
            ("uri", &self.uri),
            ("doi", &self.doi),
            ("author", &self.author),
            ("title", &self.title),
            ("year", &self.year),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_deref().map(|v| (name, v)))
        .collect()
    }
}

/// Accumulates evidence fields and the facts they justify. Fields can be added
/// or overwritten with non-empty values but never cleared.
#[derive(Debug, Clone)]
pub struct EvidenceBuilder {
    id: Uuid,
    fields: EvidenceFields,
    asserts: Vec<Uuid>,
}

/// Blank values leave the slot alone; anything else is stored as given
fn overwrite(slot: &mut Option<String>, value: &str) {
    if !value.trim().is_empty() {
        *slot = Some(value.to_string());
    }
}

impl EvidenceBuilder {
    pub fn new() -> Self {
        Self::seeded(EvidenceFields::default())
    }

    pub fn seeded(fields: EvidenceFields) -> Self {
        Self {
            id: Uuid::new_v4(),
            fields,
            asserts: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn fields(&self) -> &EvidenceFields {
        &self.fields
    }

    pub fn uri(&mut self, value: &str) -> &mut Self {
        overwrite(&mut self.fields.uri, value);
        self
    }

    pub fn doi(&mut self, value: &str) -> &mut Self {
        overwrite(&mut self.fields.doi, value);
        self
    }

    pub fn author(&mut self, value: &str) -> &mut Self {
        overwrite(&mut self.fields.author, value);
        self
    }

    pub fn title(&mut self, value: &str) -> &mut Self {
        overwrite(&mut self.fields.title, value);
        self
    }

    pub fn year(&mut self, value: &str) -> &mut Self {
        overwrite(&mut self.fields.year, value);
        self
    }

    pub fn asserts(&mut self, fact: Uuid) {
        self.asserts.push(fact);
    }

    pub fn assertion_count(&self) -> usize {
        self.asserts.len()
    }

    pub fn build(self) -> Evidence {
        Evidence {
            id: self.id,
            fields: self.fields,
            asserts: self.asserts,
        }
    }
}

impl Default for EvidenceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Sealed provenance record, ready to persist
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Evidence {
    pub id: Uuid,
    pub fields: EvidenceFields,
    pub asserts: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_are_overwritten_but_never_cleared() {
        let mut builder = EvidenceBuilder::seeded(EvidenceFields::titled("Altun 2009"));
        builder.uri("http://a").uri("").uri("   ").author("Altun");
        builder.uri("http://b");
        let evidence = builder.build();
        assert_eq!(evidence.fields.uri.as_deref(), Some("http://b"));
        assert_eq!(evidence.fields.title.as_deref(), Some("Altun 2009"));
        assert_eq!(evidence.fields.author.as_deref(), Some("Altun"));
    }

    #[test]
    fn test_set_values_are_stored_verbatim() {
        let mut builder = EvidenceBuilder::new();
        builder.author(" Altun ").title("Hall\tAltun\n");
        assert_eq!(builder.fields().author.as_deref(), Some(" Altun "));
        assert_eq!(builder.fields().title.as_deref(), Some("Hall\tAltun\n"));

        builder.author("\t");
        assert_eq!(builder.fields().author.as_deref(), Some(" Altun "));
    }

    #[test]
    fn test_entries_skip_unset_fields() {
        let fields = EvidenceFields {
            year: Some("2009".to_string()),
            title: Some("T".to_string()),
            ..EvidenceFields::default()
        };
        assert_eq!(fields.entries(), vec![("title", "T"), ("year", "2009")]);
        assert!(EvidenceFields::default().is_unattributed());
    }
}
