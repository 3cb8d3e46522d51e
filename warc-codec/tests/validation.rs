// Copyright 2025 Janek Bevendorff
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use proptest::prelude::*;

use warc_codec::{
    field_policy, is_record_start, DiagnosisType, FieldName, FieldPolicy, ReaderConfig, Timestamp, WarcHeaderBuilder,
    WarcReader, WarcReaderUncompressed, WarcRecordType, WarcVersion, WarcWriter, WarcWriterUncompressed, WriterConfig,
    WriterState,
};

const BLOCK: &[u8] = b"HTTP/1.1 200 OK\r\n\r\nhello";

fn response(block_digest: &str, payload_digest: &str, newlines: &str) -> Vec<u8> {
    let mut data = format!(
        "WARC/1.0\r\n\
         WARC-Type: response\r\n\
         WARC-Record-ID: <urn:uuid:1>\r\n\
         WARC-Date: 2020-05-05T10:00:00Z\r\n\
         WARC-Target-URI: http://example.com/\r\n\
         Content-Type: application/http; msgtype=response\r\n\
         WARC-Block-Digest: {block_digest}\r\n\
         WARC-Payload-Digest: {payload_digest}\r\n\
         Content-Length: {}\r\n\
         \r\n",
        BLOCK.len()
    )
    .into_bytes();
    data.extend_from_slice(BLOCK);
    data.extend_from_slice(newlines.as_bytes());
    data
}

fn sha1_hex(data: &[u8]) -> String {
    let algorithm = warc_codec::DigestRegistry::with_defaults().get("sha1").unwrap();
    let mut accumulator = algorithm.accumulator();
    accumulator.update(data);
    format!("sha1:{}", hex::encode(accumulator.finish()))
}

#[test]
fn matching_digests_in_any_encoding() {
    let data = response(&sha1_hex(BLOCK), "sha1:VL2MMHO4YXUKFWV63YHTWSBM3GXKSQ2N", "\r\n\r\n");
    let mut reader = WarcReaderUncompressed::from_reader(data.as_slice(), ReaderConfig::default());
    let mut record = reader.next_record().unwrap().unwrap();
    record.close().unwrap();
    assert!(record.diagnostics().is_empty(), "{:?}", record.diagnostics());
    assert_eq!(record.is_valid_block_digest(), Some(true));
    assert_eq!(record.is_valid_payload_digest(), Some(true));
    assert_eq!(record.computed_block_digest().unwrap().to_string(), sha1_hex(BLOCK));
}

#[test]
fn unknown_algorithms_are_undecided() {
    let data = response("md5:XUFAKrxLKna5cZ2REBfFkg==", "crc32:3610a686", "\r\n\r\n");
    let mut reader = WarcReaderUncompressed::from_reader(data.as_slice(), ReaderConfig::default());
    let mut record = reader.next_record().unwrap().unwrap();
    record.close().unwrap();

    assert_eq!(record.is_valid_block_digest(), None);
    assert_eq!(record.is_valid_payload_digest(), None);
    let errors = record.diagnostics().errors();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|d| d.kind == DiagnosisType::Unknown));
    assert_eq!(errors[0].entity, "Block digest encoding scheme");
    assert_eq!(errors[1].entity, "Payload digest encoding scheme");
}

#[test]
fn wrong_digests_are_invalid() {
    let data = response(&sha1_hex(b"other"), "sha1:3I42H3S6NNFQ2MSVX7XZKYAYSCX5QBYJ", "\r\n\r\n");
    let mut reader = WarcReaderUncompressed::from_reader(data.as_slice(), ReaderConfig::default());
    let mut record = reader.next_record().unwrap().unwrap();
    record.close().unwrap();

    assert_eq!(record.is_valid_block_digest(), Some(false));
    assert_eq!(record.is_valid_payload_digest(), Some(false));
    let entities: Vec<_> = record.diagnostics().errors().iter().map(|d| d.entity.as_str()).collect();
    assert_eq!(entities, ["Incorrect block digest", "Incorrect payload digest"]);
    assert!(!record.is_compliant());
}

#[test]
fn undecodable_digest_text() {
    let data = response("sha1:not-a-digest", "sha1:VL2MMHO4YXUKFWV63YHTWSBM3GXKSQ2N", "\r\n\r\n");
    let mut reader = WarcReaderUncompressed::from_reader(data.as_slice(), ReaderConfig::default());
    let mut record = reader.next_record().unwrap().unwrap();
    record.close().unwrap();
    assert_eq!(record.is_valid_block_digest(), None);
    assert_eq!(record.is_valid_payload_digest(), Some(true));
    assert_eq!(record.diagnostics().errors()[0].information, ["not-a-digest"]);
}

#[test]
fn digests_can_be_disabled() {
    let data = response("md5:XUFAKrxLKna5cZ2REBfFkg==", "md5:XUFAKrxLKna5cZ2REBfFkg==", "\r\n\r\n");
    let config = ReaderConfig::default().with_block_digest(false).with_payload_digest(false);
    let mut reader = WarcReaderUncompressed::from_reader(data.as_slice(), config);
    let mut record = reader.next_record().unwrap().unwrap();
    record.close().unwrap();
    assert!(record.diagnostics().is_empty());
    assert!(record.computed_block_digest().is_none());
}

#[test]
fn trailing_newline_counts() {
    for (newlines, count) in [("", 0), ("\n", 1), ("\r\n\n", 2), ("\r\n\r\n\r\n", 3)] {
        let record = response(&sha1_hex(BLOCK), "sha1:VL2MMHO4YXUKFWV63YHTWSBM3GXKSQ2N", newlines);
        let data = [record.as_slice(), record.as_slice()].concat();
        let mut reader = WarcReaderUncompressed::from_reader(data.as_slice(), ReaderConfig::default());
        let mut seen = 0;
        while let Some(mut record) = reader.next_record().unwrap() {
            record.close().unwrap();
            assert_eq!(record.trailing_newlines(), Some(count));
            let trailing: Vec<_> = record
                .diagnostics()
                .errors()
                .iter()
                .filter(|d| d.entity == "Trailing newlines")
                .collect();
            if count == 2 {
                assert!(trailing.is_empty());
            } else {
                assert_eq!(trailing.len(), 1);
                assert_eq!(trailing[0].information, [count.to_string(), "2".to_string()]);
            }
            seen += 1;
        }
        assert_eq!(seen, 2, "{newlines:?}");
        assert!(reader.is_compliant());
    }
}

#[test]
fn writer_state_machine() {
    let mut writer = WarcWriterUncompressed::new(Vec::new(), WriterConfig::default());
    assert_eq!(writer.state(), WriterState::Init);
    writer.close_record().unwrap();
    assert_eq!(writer.state(), WriterState::Init);

    let header = WarcHeaderBuilder::init(WarcRecordType::Metadata, 2).build();
    writer.write_header(&header).unwrap();
    assert_eq!(writer.state(), WriterState::HeaderWritten);
    assert!(writer.write_header(&header).is_err());
    writer.write_payload(b"a").unwrap();
    writer.write_payload(b"b").unwrap();
    assert_eq!(writer.state(), WriterState::PayloadWritten);
    writer.close_record().unwrap();
    assert_eq!(writer.state(), WriterState::RecordClosed);
    assert!(writer.write_payload(b"c").is_err());
    assert_eq!(writer.records(), 1);
}

#[test]
fn record_magic() {
    assert!(is_record_start(b"WARC/1.0"));
    assert!(is_record_start(b"WARC/"));
    for bad in [&b"WARC"[..], b"Warc/1.0", b"WARC\\1.0", b"", b"\r\nWARC/1.0"] {
        assert!(!is_record_start(bad));
    }
}

proptest! {
    #[test]
    fn duplicates_keep_first(seconds in prop::collection::vec(0u32..60, 1..8)) {
        let mut b = WarcHeaderBuilder::new(WarcVersion::V1_0);
        for s in &seconds {
            b.add_header("WARC-Date", &format!("2020-01-01T00:00:{s:02}Z"));
        }
        let header = b.build();
        let duplicates = header
            .diagnostics()
            .errors()
            .iter()
            .filter(|d| d.kind == DiagnosisType::Duplicate)
            .count();
        prop_assert_eq!(duplicates, seconds.len() - 1);
        prop_assert_eq!(header.date().unwrap().second() as u32, seconds[0]);
        prop_assert_eq!(header.get_all("WARC-Date").len(), seconds.len());
    }

    #[test]
    fn fractional_timestamps_round_trip(digits in "[0-9]{1,25}", second in 0u8..60) {
        let text = format!("2019-12-31T23:59:{second:02}.{digits}Z");
        let ts = Timestamp::parse(&text).unwrap();
        prop_assert_eq!(ts.fraction_digits(), digits.len());
        prop_assert_eq!(ts.to_string(), text);
    }

    #[test]
    fn required_fields_are_diagnosed(type_index in 0usize..8) {
        let record_type = [
            "warcinfo", "response", "resource", "request", "metadata", "revisit", "conversion", "continuation",
        ][type_index];
        let mut b = WarcHeaderBuilder::new(WarcVersion::V1_1);
        b.add_header("WARC-Type", record_type);
        b.check_fields();
        let header = b.build();
        let rt = WarcRecordType::from_name(record_type);
        let required = FieldName::ALL
            .iter()
            .filter(|&&f| f != FieldName::WarcType)
            .filter(|&&f| matches!(field_policy(rt, f), FieldPolicy::Mandatory | FieldPolicy::Shall))
            .count();
        let missing = header
            .diagnostics()
            .errors()
            .iter()
            .filter(|d| d.kind == DiagnosisType::RequiredInvalid)
            .count();
        prop_assert_eq!(missing, required);
    }
}
