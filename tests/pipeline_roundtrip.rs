//! Export → import round trips through in-memory buffers.

use anyhow::Result;
use entline::testing::{MemoryStore, numbered_entities, sample_entities};
use entline::*;

fn ok_source(entities: Vec<Entity>) -> impl Iterator<Item = std::result::Result<Entity, BoxError>> {
    entities.into_iter().map(Ok)
}

fn by_name(e: &Entity) -> (Key, Vec<Property>) {
    let mut props = e.properties.clone();
    props.sort_by(|a, b| a.name.cmp(&b.name));
    (e.key.clone(), props)
}

fn export_to_vec(entities: Vec<Entity>, cfg: &TransferConfig) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    export(ok_source(entities), &mut out, cfg)?;
    Ok(out)
}

#[test]
fn sample_entities_round_trip() -> Result<()> {
    let cfg = TransferConfig::default();
    let file = export_to_vec(sample_entities(), &cfg)?;

    let mut store = MemoryStore::new();
    let summary = import(file.as_slice(), &mut store, &cfg)?;
    assert_eq!(summary.entities, sample_entities().len() as u64);
    assert_eq!(store.put_batches(), &[sample_entities().len()]);

    for expected in sample_entities() {
        let got = store
            .get(&expected.key)
            .unwrap_or_else(|| panic!("missing {}", expected.key));
        assert_eq!(by_name(got), by_name(&expected));
    }
    Ok(())
}

#[test]
fn order_is_preserved_end_to_end() -> Result<()> {
    let cfg = TransferConfig::default().with_queue_depth(2).with_batch_size(7);
    let input = numbered_entities("Item", 500);
    let file = export_to_vec(input.clone(), &cfg)?;

    let mut store = MemoryStore::new();
    let summary = import(file.as_slice(), &mut store, &cfg)?;
    assert_eq!(summary.entities, 500);
    assert_eq!(summary.batches, 72);
    assert_eq!(store.put_batches().iter().sum::<usize>(), 500);
    assert_eq!(store.put_batches().last(), Some(&3));
    let keys: Vec<_> = store.entities().map(|e| e.key.clone()).collect();
    let expected: Vec<_> = input.iter().map(|e| e.key.clone()).collect();
    assert_eq!(keys, expected);
    Ok(())
}

#[test]
fn schema_frames_grow_monotonically() -> Result<()> {
    let entities = vec![
        Entity::new(Key::id("K", 1)).with("b", 1i64).with("a", "x"),
        Entity::new(Key::id("K", 2)).with("c", true).with("a", "y"),
        Entity::new(Key::id("K", 3)).with("a", "z"),
        Entity::new(Key::id("K", 4)).with("e", 1.0).with("d", vec![1u8]),
    ];
    let cfg = TransferConfig::default();
    let mut out = Vec::new();
    let summary = export(ok_source(entities), &mut out, &cfg)?;
    assert_eq!(summary.entities, 4);
    assert_eq!(summary.schema_frames, 3);
    assert_eq!(summary.frames, 7);
    assert_eq!(summary.columns, 5);

    let text = String::from_utf8(out)?;
    let mut next_column = 0;
    for line in text.lines() {
        let frame: serde_json::Value = serde_json::from_str(line)?;
        if let Some(from) = frame.get("FieldsFrom") {
            assert_eq!(from.as_u64(), Some(next_column));
            next_column += frame["Fields"].as_array().map_or(0, Vec::len) as u64;
        }
    }
    assert_eq!(next_column, 5);
    assert!(text.contains(r#"{"FieldsFrom":3,"Fields":[{"n":"d","t":"[]uint8","i":false},{"n":"e","t":"float64","i":false}]}"#));
    Ok(())
}

#[test]
fn zero_values_and_holes_decode_differently() -> Result<()> {
    let entities = vec![
        Entity::new(Key::id("K", 1)).with("n", 0i64).with("s", ""),
        Entity::new(Key::id("K", 2)).with("s", "only"),
    ];
    let cfg = TransferConfig::default();
    let file = export_to_vec(entities, &cfg)?;
    let mut store = MemoryStore::new();
    import(file.as_slice(), &mut store, &cfg)?;

    let first = store.get(&Key::id("K", 1)).expect("K,1");
    assert_eq!(first.get("n"), Some(&Value::Int(0)));
    assert_eq!(first.get("s"), Some(&Value::String(String::new())));
    let second = store.get(&Key::id("K", 2)).expect("K,2");
    assert_eq!(second.get("n"), None);
    Ok(())
}

#[test]
fn entities_without_properties_are_dropped_on_import() -> Result<()> {
    let entities = vec![
        Entity::new(Key::id("K", 1)),
        Entity::new(Key::id("K", 2)).with("x", 1i64),
    ];
    let cfg = TransferConfig::default();
    let file = export_to_vec(entities, &cfg)?;
    assert!(String::from_utf8(file.clone())?.starts_with("{\"k\":\"/K,1\",\"d\":[]}\n"));

    let mut store = MemoryStore::new();
    let summary = import(file.as_slice(), &mut store, &cfg)?;
    assert_eq!(summary.lines, 3);
    assert_eq!(summary.entities, 1);
    assert!(store.get(&Key::id("K", 1)).is_none());
    Ok(())
}

#[test]
fn hand_written_file_with_blank_lines() -> Result<()> {
    let input = concat!(
        "{\"FieldsFrom\":0,\"Fields\":[{\"n\":\"Name\",\"t\":\"string\",\"i\":false},{\"n\":\"Blob\",\"t\":\"[]uint8\",\"i\":true}]}\n",
        "\n",
        "   \n",
        "{\"k\":\"/A,0`ns1^`/B,^`2^``ns2^^\",\"d\":[\"x\",\"AQI\"]}\r\n",
        "{\"k\":\"/A,x/B,22\",\"d\":[null,\"AQID\"]}",
    );
    let mut store = MemoryStore::new();
    let summary = import(input.as_bytes(), &mut store, &TransferConfig::default())?;
    assert_eq!(summary.lines, 3);
    assert_eq!(summary.columns, 2);

    let namespaced = Key::id("A", 0)
        .with_namespace("ns1`")
        .child_name("B", "`2`")
        .with_namespace("ns2^");
    let e = store.get(&namespaced).expect("namespaced key");
    assert_eq!(e.get("Blob"), Some(&Value::Bytes(vec![1, 2])));
    let blob = e.properties.iter().find(|p| p.name == "Blob").expect("blob");
    assert!(!blob.indexed);

    let e = store.get(&Key::name("A", "x").child_id("B", 22)).expect("id key");
    assert_eq!(e.properties.len(), 1);
    Ok(())
}

#[test]
fn delete_removes_every_key_in_batches() -> Result<()> {
    let cfg = TransferConfig::default().with_batch_size(4);
    let entities = numbered_entities("Gone", 10);
    let file = export_to_vec(entities.clone(), &cfg)?;

    let mut store = MemoryStore::with_entities(entities);
    store.put_multi(&[Entity::new(Key::id("Kept", 1)).with("x", 1i64)])
        .map_err(|e| anyhow::anyhow!(e))?;
    let summary = delete(file.as_slice(), &mut store, &cfg)?;
    assert_eq!(summary.entities, 10);
    assert_eq!(store.delete_batches(), &[4, 4, 2]);
    assert_eq!(store.len(), 1);
    Ok(())
}

#[test]
fn convert_dumps_object_notation() -> Result<()> {
    let entities = vec![
        Entity::new(Key::id("K", 1)).with("Name", "Ada").with("Age", 0i64),
        Entity::new(Key::id("K", 2)).with("Name", "").with("Age", 3i64),
    ];
    let cfg = TransferConfig::default();
    let file = export_to_vec(entities, &cfg)?;

    let mut out = Vec::new();
    convert(file.as_slice(), &mut out, ConvertOptions::default(), &cfg)?;
    assert_eq!(
        String::from_utf8(out)?,
        "{Age:0,Name:\"Ada\"},\n{Age:3,Name:\"\"},\n"
    );

    let mut out = Vec::new();
    let summary = convert(
        file.as_slice(),
        &mut out,
        ConvertOptions { skip_default: true },
        &cfg,
    )?;
    assert_eq!(summary.entities, 2);
    assert_eq!(String::from_utf8(out)?, "{Name:\"Ada\"},\n{Age:3},\n");
    Ok(())
}
