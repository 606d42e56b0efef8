use interventions_core::{
    export_csv, write_csv_file, CsvError, CsvOptions, Field, Intervention, InterventionDraft,
};

fn record(id: &str, fault: &str, comment: &str) -> Intervention {
    Intervention::from_draft(
        id,
        InterventionDraft::new()
            .with_field(Field::Date, "2024-01-01")
            .with_field(Field::Brand, "Komatsu")
            .with_field(Field::Model, "PC200")
            .with_field(Field::Fault, fault)
            .with_field(Field::Comment, comment),
    )
}

fn read_csv(input: &str, delimiter: u8) -> Vec<Vec<String>> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_reader(input.as_bytes())
        .records()
        .map(|row| row.unwrap().iter().map(str::to_string).collect())
        .collect()
}

#[test]
fn header_uses_display_labels_in_field_order() {
    let csv = export_csv(&Vec::<Intervention>::new(), &CsvOptions::default());
    assert_eq!(
        csv,
        "Date;Marque;Modèle;N° Série;Horamètre;Panne;Résolution;Commentaire"
    );
}

#[test]
fn rows_follow_list_order_without_trailing_newline() {
    let records = vec![record("b", "second", ""), record("a", "first", "")];
    let csv = export_csv(&records, &CsvOptions::default());

    let lines = csv.split('\n').collect::<Vec<_>>();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[1], "2024-01-01;Komatsu;PC200;;;second;;");
    assert_eq!(lines[2], "2024-01-01;Komatsu;PC200;;;first;;");
    assert!(!csv.ends_with('\n'));
}

#[test]
fn special_characters_survive_a_spreadsheet_read() {
    let tricky = record("a", "line 1\nline 2", "a;b\"c");
    let csv = export_csv([&tricky], &CsvOptions::default());

    let parsed = read_csv(&csv, b';');
    assert_eq!(parsed.len(), 2);
    assert_eq!(parsed[1][7], "a;b\"c");
    assert_eq!(parsed[1][5], "line 1\nline 2");
    assert_eq!(parsed[1].len(), Field::ALL.len());
}

#[test]
fn comma_delimiter_quotes_commas_only() {
    let options = CsvOptions::default().with_delimiter(',').unwrap();
    let csv = export_csv([&record("a", "a,b", "x;y")], &options);

    let row = csv.split('\n').nth(1).unwrap();
    assert_eq!(row, "2024-01-01,Komatsu,PC200,,,\"a,b\",,x;y");
    let parsed = read_csv(&csv, b',');
    assert_eq!(parsed[1][5], "a,b");
    assert_eq!(parsed[1][7], "x;y");
}

#[test]
fn unsupported_delimiter_is_rejected() {
    assert!(matches!(
        CsvOptions::default().with_delimiter('|'),
        Err(CsvError::UnsupportedDelimiter('|'))
    ));
}

#[test]
fn custom_field_selection() {
    let options = CsvOptions::new(';', vec![Field::Brand, Field::Fault]).unwrap();
    let csv = export_csv([&record("a", "oil leak", "")], &options);
    assert_eq!(csv, "Marque;Panne\nKomatsu;oil leak");
}

#[test]
fn file_export_writes_utf8_and_counts_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("interventions.csv");
    let records = vec![
        record("a", "multi\nline", ""),
        record("b", "oil leak", "Résolu"),
    ];

    let written = write_csv_file(&path, &records, &CsvOptions::default()).unwrap();
    assert_eq!(written, 2);

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content, export_csv(&records, &CsvOptions::default()));
    assert_eq!(read_csv(&content, b';').len(), 3);
}
