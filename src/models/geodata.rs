use crate::domain::{Envelope, Geometry, GeodataId, LayerId, TimeRange};

/// A geodata set, either loaded from the database or freshly parsed.
///
/// Parsed but unsaved geodata carry [`GeodataId::UNSAVED`].
#[derive(Debug, Clone, PartialEq)]
pub struct Geodata {
    pub id: GeodataId,
    pub url: String,
    pub datatype: String,
    pub title: String,
    pub bbox: Option<String>,
    pub keywords: Vec<String>,
    pub language: Option<String>,
    pub copyright: Option<String>,
    pub author: Option<String>,
    pub abstract_text: Option<String>,
    pub license: Option<String>,
    pub time: TimeRange,
}

impl Geodata {
    #[must_use]
    pub fn new(url: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            id: GeodataId::UNSAVED,
            url: url.into(),
            datatype: datatype.into(),
            title: String::new(),
            bbox: None,
            keywords: Vec::new(),
            language: None,
            copyright: None,
            author: None,
            abstract_text: None,
            license: None,
            time: TimeRange::default(),
        }
    }

    /// Envelope of the bounding box, if it is present and valid WKT.
    #[must_use]
    pub fn envelope(&self) -> Option<Envelope> {
        self.bbox
            .as_deref()
            .and_then(|wkt| Geometry::parse(wkt).ok())
            .map(|g| g.envelope())
    }

    /// Case-insensitive search across the descriptive metadata.
    #[must_use]
    pub fn metadata_contains(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        let hit = |value: &str| value.to_lowercase().contains(&needle);

        hit(&self.title)
            || self.abstract_text.as_deref().is_some_and(hit)
            || self.author.as_deref().is_some_and(hit)
            || self.keywords.iter().any(|k| hit(k))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layer {
    pub id: LayerId,
    pub name: String,
    pub title: Option<String>,
    pub bbox: Option<String>,
}

/// Output of a metadata parser: the geodata and its layers, nothing stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMetadata {
    pub geodata: Geodata,
    pub layers: Vec<Layer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_search_is_case_insensitive() {
        let mut g = Geodata::new("http://example.org/wms", "wms");
        g.title = "Land Cover".to_string();
        g.keywords = vec!["Forest".to_string()];
        g.abstract_text = Some("CORINE data".to_string());

        assert!(g.metadata_contains("land"));
        assert!(g.metadata_contains("FOREST"));
        assert!(g.metadata_contains("corine"));
        assert!(!g.metadata_contains("water"));
    }

    #[test]
    fn envelope_requires_valid_bbox() {
        let mut g = Geodata::new("http://example.org/wms", "wms");
        assert!(g.envelope().is_none());
        g.bbox = Some("POLYGON((0 0,2 0,2 1,0 1,0 0))".to_string());
        assert_eq!(g.envelope(), Some(Envelope::new(0.0, 0.0, 2.0, 1.0)));
        g.bbox = Some("garbage".to_string());
        assert!(g.envelope().is_none());
    }
}
