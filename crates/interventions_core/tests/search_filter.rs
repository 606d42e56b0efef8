use interventions_core::{filter, Field, Intervention, InterventionDraft, SearchIndex, SearchProjection};

fn fleet() -> Vec<Intervention> {
    let rows = [
        ("1", "2024-05-02", "Komatsu", "PC200", "oil leak", "SN-1", "hose changed"),
        ("2", "2024-04-11", "Caterpillar", "320D", "track tension", "SN-2", ""),
        ("3", "2024-03-08", "Komatsu", "WA380", "hydraulic LEAK", "", "waiting for parts"),
        ("4", "2024-01-20", "Volvo", "EC220", "engine stall", "SN-4", "oil checked"),
    ];
    rows.into_iter()
        .map(|(id, date, brand, model, fault, serial, comment)| {
            Intervention::from_draft(
                id,
                InterventionDraft::new()
                    .with_field(Field::Date, date)
                    .with_field(Field::Brand, brand)
                    .with_field(Field::Model, model)
                    .with_field(Field::Fault, fault)
                    .with_field(Field::SerialNumber, serial)
                    .with_field(Field::Comment, comment),
            )
        })
        .collect()
}

fn ids(matches: &[&Intervention]) -> Vec<String> {
    matches.iter().map(|record| record.id.clone()).collect()
}

#[test]
fn query_is_case_insensitive_and_keeps_order() {
    let records = fleet();
    let matches = filter(&records, "Leak", &SearchProjection::core());
    assert_eq!(ids(&matches), vec!["1", "3"]);
}

#[test]
fn empty_query_returns_everything() {
    let records = fleet();
    assert_eq!(filter(&records, "", &SearchProjection::core()).len(), records.len());
}

#[test]
fn unmatched_query_returns_nothing() {
    let records = fleet();
    assert!(filter(&records, "xyz", &SearchProjection::core()).is_empty());
}

#[test]
fn comment_is_only_searched_by_extended_projection() {
    let records = fleet();
    assert!(filter(&records, "oil checked", &SearchProjection::core()).is_empty());

    let matches = filter(&records, "oil", &SearchProjection::extended());
    assert_eq!(ids(&matches), vec!["1", "4"]);
}

#[test]
fn query_may_span_adjacent_fields() {
    let records = fleet();
    let matches = filter(&records, "komatsu pc200", &SearchProjection::core());
    assert_eq!(ids(&matches), vec!["1"]);
}

#[test]
fn configured_projection_from_names() {
    let projection = SearchProjection::from_names(["serialNumber", " ", "serialnumber"]).unwrap();
    assert_eq!(projection.fields(), &[Field::SerialNumber]);

    let records = fleet();
    let index = SearchIndex::new(projection);
    assert_eq!(ids(&index.filter(&records, "sn-")), vec!["1", "2", "4"]);
    assert!(!index.matches(&records[0], "komatsu"));

    assert_eq!(
        SearchProjection::from_names(["brand", "colour"]).unwrap_err(),
        "colour"
    );
}

#[test]
fn results_are_always_a_subsequence_of_the_input() {
    let records = fleet();
    let index = SearchIndex::new(SearchProjection::extended());
    for query in ["", "o", "k", "a", "leak", "sn", " ", "20", "zzz"] {
        let matches = index.filter(&records, query);
        let mut cursor = records.iter();
        for found in &matches {
            assert!(
                cursor.any(|record| std::ptr::eq(record, *found)),
                "query {query:?} reordered results"
            );
        }
        for record in &records {
            let listed = matches.iter().any(|found| std::ptr::eq(*found, record));
            assert_eq!(listed, index.matches(record, query));
        }
    }
}
