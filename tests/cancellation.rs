//! Failure propagation: every pipeline must return the first error and
//! never hang, whichever stage fails.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use entline::testing::{FailingWriter, MemoryStore, failing_source, numbered_entities};
use entline::*;

fn exported(n: u64, cfg: &TransferConfig) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    export(
        numbered_entities("Row", n).into_iter().map(Ok::<_, BoxError>),
        &mut out,
        cfg,
    )?;
    Ok(out)
}

#[test]
fn store_failure_after_n_batches_is_returned() -> Result<()> {
    let cfg = TransferConfig::default().with_queue_depth(1).with_batch_size(10);
    let file = exported(2_000, &cfg)?;

    let mut store = MemoryStore::failing_after(3);
    let err = import(file.as_slice(), &mut store, &cfg).unwrap_err();
    assert!(matches!(err, TransferError::Sink(_)), "got {err}");
    assert!(err.to_string().contains("injected failure"));
    assert_eq!(store.put_batches(), &[10, 10, 10]);
    assert_eq!(store.len(), 30);
    Ok(())
}

#[test]
fn store_failure_on_first_batch() -> Result<()> {
    let cfg = TransferConfig::default().with_batch_size(1);
    let file = exported(100, &cfg)?;
    let mut store = MemoryStore::failing_after(0);
    let err = delete(file.as_slice(), &mut store, &cfg).unwrap_err();
    assert!(matches!(err, TransferError::Sink(_)));
    assert!(store.delete_batches().is_empty());
    Ok(())
}

#[test]
fn source_failure_is_returned_and_prefix_is_written() -> Result<()> {
    let cfg = TransferConfig::default();
    let mut out = Vec::new();
    let err = export(
        failing_source(numbered_entities("Row", 10), 4),
        &mut out,
        &cfg,
    )
    .unwrap_err();
    assert!(matches!(err, TransferError::Source(_)), "got {err}");
    assert!(err.to_string().contains("source cursor failed"));

    // the four entities before the failure made it out
    let text = String::from_utf8(out)?;
    assert_eq!(text.lines().filter(|l| l.starts_with("{\"k\"")).count(), 4);
    Ok(())
}

#[test]
fn writer_failure_is_an_io_error() {
    let cfg = TransferConfig::default()
        .with_queue_depth(1)
        .with_write_buffer(64);
    let mut writer = FailingWriter::after(256);
    let err = export(
        numbered_entities("Row", 5_000).into_iter().map(Ok::<_, BoxError>),
        &mut writer,
        &cfg,
    )
    .unwrap_err();
    assert!(matches!(err, TransferError::Io(_)), "got {err}");
    assert_eq!(writer.written.len(), 256);
}

#[test]
fn source_error_wins_over_writer_error() {
    let cfg = TransferConfig::default();
    let err = export(
        failing_source(numbered_entities("Row", 3), 2),
        FailingWriter::after(0),
        &cfg,
    )
    .unwrap_err();
    assert!(matches!(err, TransferError::Source(_)), "got {err}");
}

#[test]
fn output_that_fills_the_writer_exactly_is_not_an_error() -> Result<()> {
    let cfg = TransferConfig::default();
    let expected = exported(50, &cfg)?;
    let mut writer = FailingWriter::after(expected.len());
    let summary = export(
        numbered_entities("Row", 50).into_iter().map(Ok::<_, BoxError>),
        &mut writer,
        &cfg,
    )?;
    assert_eq!(summary.bytes, expected.len() as u64);
    assert_eq!(writer.written, expected);
    Ok(())
}

#[test]
fn unreadable_values_fail_the_export_not_the_import() {
    let far_future = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
    let cases = [
        Entity::new(Key::id("K", 1)).with("At", far_future),
        Entity::new(Key::name("K", "")).with("x", 1i64),
        Entity::new(Key::id("", 1)).with("x", 1i64),
    ];
    for entity in cases {
        let mut out = Vec::new();
        let err = export(
            std::iter::once(Ok::<_, BoxError>(entity)),
            &mut out,
            &TransferConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, TransferError::Encode(_)), "got {err}");
        assert!(out.is_empty());
    }
}

#[test]
fn out_of_range_fields_from_is_a_line_error() {
    // the first overflows while registering, the second lands far from the row
    for (fields_from, expected_line) in [("18446744073709551615", 1), ("4000000000000", 2)] {
        let input = format!(
            "{{\"FieldsFrom\":{fields_from},\"Fields\":[{{\"n\":\"a\",\"t\":\"int64\"}},{{\"n\":\"b\",\"t\":\"int64\"}}]}}\n{{\"k\":\"/P,1\",\"d\":[1]}}\n"
        );
        let err = import(input.as_bytes(), MemoryStore::new(), &TransferConfig::default())
            .unwrap_err();
        match err {
            TransferError::Line { line, .. } => assert_eq!(line, expected_line, "{fields_from}"),
            other => panic!("unexpected {other} for {fields_from}"),
        }
    }
}

#[test]
fn encode_failure_stops_export() {
    let entities = vec![
        Entity::new(Key::id("K", 1)).with("v", 1i64),
        Entity::new(Key::id("K", 2)).with("v", "one"),
    ]
    .into_iter()
    .chain(numbered_entities("K", 1_000));
    let cfg = TransferConfig::default().with_queue_depth(1);
    let err = export(entities.map(Ok::<_, BoxError>), Vec::new(), &cfg).unwrap_err();
    assert!(
        matches!(err, TransferError::Encode(EncodeError::TypeConflict { .. })),
        "got {err}"
    );
}

#[test]
fn decode_failure_reports_line_and_content() {
    let input = concat!(
        "{\"FieldsFrom\":0,\"Fields\":[{\"n\":\"Age\",\"t\":\"int64\",\"i\":false}]}\n",
        "{\"k\":\"/P,1\",\"d\":[1]}\n",
        "\n",
        "{\"k\":\"/P,2\",\"d\":[\"old\"]}\n",
        "{\"k\":\"/P,3\",\"d\":[3]}\n",
    );
    let mut store = MemoryStore::new();
    let err = import(input.as_bytes(), &mut store, &TransferConfig::default()).unwrap_err();
    match &err {
        TransferError::Line {
            line,
            content,
            source,
        } => {
            assert_eq!(*line, 4);
            assert_eq!(content, "{\"k\":\"/P,2\",\"d\":[\"old\"]}");
            assert!(matches!(
                source,
                DecodeError::InvalidValue {
                    tag: TypeTag::Int64,
                    ..
                }
            ));
        }
        other => panic!("unexpected {other}"),
    }
    assert!(err.to_string().starts_with("line 4: "));
    // no rollback of what was decoded before the failure
    assert!(store.get(&Key::id("P", 3)).is_none());
}

#[test]
fn structural_errors_abort_with_line_numbers() {
    let cases = [
        ("not json\n", 1),
        ("{\"k\":\"/P,1\",\"d\":[1]}\n", 1),
        (
            "{\"FieldsFrom\":0,\"Fields\":[{\"n\":\"G\",\"t\":\"GeoPoint\",\"i\":false}]}\n{\"k\":\"/P,1\",\"d\":[{}]}\n",
            2,
        ),
        (
            "{\"FieldsFrom\":0,\"Fields\":[{\"n\":\"a\",\"t\":\"int64\",\"i\":false}]}\n{\"k\":\"P,1\",\"d\":[1]}\n",
            2,
        ),
    ];
    for (input, expected_line) in cases {
        let err = import(
            input.as_bytes(),
            MemoryStore::new(),
            &TransferConfig::default(),
        )
        .unwrap_err();
        match err {
            TransferError::Line { line, .. } => assert_eq!(line, expected_line, "{input}"),
            other => panic!("unexpected {other} for {input}"),
        }
    }
}

#[test]
fn over_long_line_is_rejected() {
    let cfg = TransferConfig::default().with_max_line_bytes(32);
    let long = format!("{{\"k\":\"/P,1\",\"d\":[\"{}\"]}}\n", "x".repeat(100));
    let input = format!("\n{long}");
    let err = import(input.as_bytes(), MemoryStore::new(), &cfg).unwrap_err();
    assert!(
        matches!(err, TransferError::LineTooLong { line: 2, limit: 32 }),
        "got {err}"
    );
}

#[test]
fn consumer_failure_in_custom_import() {
    let cfg = TransferConfig::default().with_queue_depth(1);
    let file = exported(1_000, &cfg).expect("export");
    let err = run_import(file.as_slice(), &cfg, |entities| {
        for (i, _) in entities.iter().enumerate() {
            if i == 5 {
                return Err(TransferError::sink_failure("consumer gave up"));
            }
        }
        Ok(BatchCounts::default())
    })
    .unwrap_err();
    assert!(matches!(err, TransferError::Sink(_)));
}
