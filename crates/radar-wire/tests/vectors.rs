use radar_wire::{Message, SyncBatch};
use std::fs;

#[test]
fn vectors_match_message_encoding() {
    let dir = "tests/vectors";
    let mut seen = 0;
    for entry in fs::read_dir(dir).expect("read vectors dir") {
        let entry = entry.expect("entry");
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        let contents = fs::read_to_string(&path).expect("read vector");
        let value: serde_json::Value = serde_json::from_str(&contents).expect("json");
        let frame = value["frame"].as_str().expect("frame");
        let op = value["op"].as_str().expect("op");

        let message = Message::decode(frame.as_bytes()).expect("message decode");
        assert_eq!(message.op.as_str(), op, "op mismatch for {:?}", path);
        assert_eq!(
            message.to.as_deref(),
            value["to"].as_str(),
            "destination mismatch for {:?}",
            path
        );

        let encoded = message.encode().expect("message encode");
        assert_eq!(
            encoded.as_ref(),
            frame.as_bytes(),
            "round trip mismatch for {:?}",
            path
        );

        if let Some(expected) = value["entries"].as_u64() {
            let batch = SyncBatch::from_message(&message)
                .expect("sync decode")
                .expect("sync batch");
            assert_eq!(batch.entries.len() as u64, expected, "entries for {:?}", path);
        }
        seen += 1;
    }
    assert!(seen > 0, "no vectors found in {dir}");
}
