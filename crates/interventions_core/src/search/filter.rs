//! Substring filter over a fixed field projection.
//!
//! # Invariants
//! - Results are a subsequence of the input, in input order.
//! - An empty query matches every record.
//! - Matching is done on the lowercase, space-joined projection text, so a
//!   query may span adjacent projected fields.

use crate::model::intervention::{Field, Intervention};

/// Ordered list of fields a query is matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchProjection {
    fields: Vec<Field>,
}

impl SearchProjection {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Brand, model and fault.
    pub fn core() -> Self {
        Self::new(vec![Field::Brand, Field::Model, Field::Fault])
    }

    /// Core fields plus serial number, meter reading and comment.
    pub fn extended() -> Self {
        Self::new(vec![
            Field::Brand,
            Field::Model,
            Field::Fault,
            Field::SerialNumber,
            Field::MeterReading,
            Field::Comment,
        ])
    }

    /// Builds a projection from wire names, skipping blank entries.
    ///
    /// # Errors
    /// - Returns the first name that is not a known field.
    pub fn from_names<'a, I>(names: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut fields = Vec::new();
        for name in names.into_iter().map(str::trim).filter(|name| !name.is_empty()) {
            let field = Field::parse(name).ok_or_else(|| name.to_string())?;
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        Ok(Self::new(fields))
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Lowercase space-joined text of the projected fields.
    pub fn text_of(&self, record: &Intervention) -> String {
        self.fields
            .iter()
            .map(|field| record.value(*field))
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

impl Default for SearchProjection {
    fn default() -> Self {
        Self::core()
    }
}

/// Substring matcher bound to one projection.
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    projection: SearchProjection,
}

impl SearchIndex {
    pub fn new(projection: SearchProjection) -> Self {
        Self { projection }
    }

    pub fn projection(&self) -> &SearchProjection {
        &self.projection
    }

    /// Returns whether `record` matches `query`.
    pub fn matches(&self, record: &Intervention, query: &str) -> bool {
        let needle = query.to_lowercase();
        needle.is_empty() || self.projection.text_of(record).contains(&needle)
    }

    /// Returns the matching records in input order.
    pub fn filter<'a, I>(&self, records: I, query: &str) -> Vec<&'a Intervention>
    where
        I: IntoIterator<Item = &'a Intervention>,
    {
        let needle = query.to_lowercase();
        records
            .into_iter()
            .filter(|record| needle.is_empty() || self.projection.text_of(record).contains(&needle))
            .collect()
    }
}

/// One-shot form of [`SearchIndex::filter`].
pub fn filter<'a>(
    records: &'a [Intervention],
    query: &str,
    projection: &SearchProjection,
) -> Vec<&'a Intervention> {
    SearchIndex::new(projection.clone()).filter(records, query)
}

#[cfg(test)]
mod tests {
    use super::{filter, SearchIndex, SearchProjection};
    use crate::model::intervention::{Field, Intervention, InterventionDraft};

    fn record(id: &str, brand: &str, model: &str, fault: &str, comment: &str) -> Intervention {
        let draft = InterventionDraft::new()
            .with_field(Field::Brand, brand)
            .with_field(Field::Model, model)
            .with_field(Field::Fault, fault)
            .with_field(Field::Comment, comment);
        Intervention::from_draft(id, draft)
    }

    #[test]
    fn matches_case_insensitively_across_projection() {
        let records = vec![
            record("1", "Komatsu", "PC200", "Oil Leak", ""),
            record("2", "CAT", "320", "track tension", "oil checked"),
        ];

        let hits = filter(&records, "LEAK", &SearchProjection::core());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "1");

        let spanning = filter(&records, "komatsu pc2", &SearchProjection::core());
        assert_eq!(spanning.len(), 1);
    }

    #[test]
    fn comment_is_searched_only_by_extended_projection() {
        let records = vec![record("2", "CAT", "320", "track tension", "oil checked")];
        assert!(filter(&records, "oil", &SearchProjection::core()).is_empty());
        assert_eq!(filter(&records, "oil", &SearchProjection::extended()).len(), 1);
    }

    #[test]
    fn empty_query_returns_everything_in_order() {
        let records = vec![
            record("b", "CAT", "320", "x", ""),
            record("a", "Volvo", "EC220", "y", ""),
        ];
        let ids = SearchIndex::default()
            .filter(&records, "")
            .into_iter()
            .map(|record| record.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn from_names_rejects_unknown_and_deduplicates() {
        let projection = SearchProjection::from_names(["brand", " brand", "comment", ""]).unwrap();
        assert_eq!(projection.fields(), &[Field::Brand, Field::Comment]);
        assert_eq!(
            SearchProjection::from_names(["owner"]).unwrap_err(),
            "owner".to_string()
        );
    }
}
