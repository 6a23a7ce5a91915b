use sweeper_core::{ColumnSelection, Session, TextEncoding, UploadedFile, UserChoices};

fn csv(name: &str, body: &str) -> UploadedFile {
    UploadedFile::new(name, body.as_bytes().to_vec())
}

#[test]
fn same_named_uploads_keep_independent_choices() {
    let mut session = Session::new();
    let first = session.upload(csv("data.csv", "a,b\n1,2\n"));
    let second = session.upload(csv("data.csv", "a,b\n3,4\n5,6\n"));
    assert_ne!(first, second);

    session.choices_mut(second).unwrap().columns = ColumnSelection::only(["b"]);

    assert_eq!(session.choices(first).unwrap().columns, ColumnSelection::All);
    assert_eq!(
        session.choices(second).unwrap().columns,
        ColumnSelection::only(["b"])
    );
}

#[test]
fn evaluate_reports_in_upload_order() {
    let mut session = Session::new();
    let utf8 = UserChoices {
        encoding: TextEncoding::Utf8,
        ..UserChoices::default()
    };
    let a = session.upload_with(csv("a.csv", "x\n1\n"), utf8.clone());
    let b = session.upload_with(csv("b.txt", "ignored"), utf8.clone());
    let c = session.upload_with(csv("c.csv", "x\n1\n2\n"), utf8);

    let reports = session.evaluate();
    let ids: Vec<_> = reports.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, vec![a, b, c]);
    assert_eq!(reports[0].1.file_name, "a.csv");
    assert!(reports[1].1.summary.is_none());
    assert_eq!(reports[2].1.summary.as_ref().map(|s| s.rows), Some(2));
}

#[test]
fn removing_and_resetting_drops_state() {
    let mut session = Session::new();
    let first = session.upload(csv("one.csv", "x\n1\n"));
    let second = session.upload(csv("two.csv", "x\n2\n"));

    let removed = session.remove(first).expect("upload present");
    assert_eq!(removed.name(), "one.csv");
    assert!(session.choices(first).is_none());
    assert_eq!(session.len(), 1);
    assert_eq!(session.file(second).map(|f| f.name()), Some("two.csv"));

    session.reset();
    assert!(session.is_empty());
    assert!(session.evaluate().is_empty());

    // Ids are never reused after a reset.
    let third = session.upload(csv("one.csv", "x\n1\n"));
    assert_ne!(third, first);
    assert_ne!(third, second);
}
