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

use std::io::Cursor;

use warc_codec::{
    open_reader, Digest, DigestEncoding, DigestRegistry, ReaderConfig, WarcHeader, WarcHeaderBuilder,
    WarcReaderCompressed, WarcReaderUncompressed, WarcRecordType, WarcVersion, WarcWriter, WarcWriterCompressed,
    WarcWriterUncompressed, WriterConfig,
};

const RESPONSE_HEAD: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: 15\r\n\r\n";
const RESPONSE_BODY: &[u8] = b"<html>hi</html>";
const REQUEST: &[u8] = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
const WARCINFO: &[u8] = b"software: warc-codec\r\nformat: WARC File Format 1.1\r\n";

fn sha1_base32(data: &[u8]) -> String {
    let algorithm = DigestRegistry::with_defaults().get("sha1").unwrap();
    let mut accumulator = algorithm.accumulator();
    accumulator.update(data);
    Digest::encode("sha1", &accumulator.finish(), DigestEncoding::Base32)
        .unwrap()
        .to_string()
}

fn record_id(n: u32) -> String {
    format!("<urn:uuid:6c1bd5e4-7f8a-4c55-9c0e-{n:012}>")
}

struct TestRecord {
    header: WarcHeader,
    block: Vec<u8>,
}

fn test_records() -> Vec<TestRecord> {
    let mut records = Vec::new();

    let mut b = WarcHeaderBuilder::new(WarcVersion::V1_1);
    b.add_header("WARC-Type", "warcinfo");
    b.add_header("WARC-Record-ID", &record_id(1));
    b.add_header("WARC-Date", "2024-03-01T12:30:45Z");
    b.add_header("WARC-Filename", "test.warc");
    b.add_header("Content-Type", "application/warc-fields");
    b.add_header("Content-Length", &WARCINFO.len().to_string());
    b.add_header("WARC-Block-Digest", &sha1_base32(WARCINFO));
    records.push((b, WARCINFO.to_vec()));

    let mut b = WarcHeaderBuilder::new(WarcVersion::V1_1);
    b.add_header("WARC-Type", "request");
    b.add_header("WARC-Record-ID", &record_id(2));
    b.add_header("WARC-Date", "2024-03-01T12:30:45.123456Z");
    b.add_header("WARC-Target-URI", "http://example.com/");
    b.add_header("WARC-Warcinfo-ID", &record_id(1));
    b.add_header("Content-Type", "application/http; msgtype=request");
    b.add_header("Content-Length", &REQUEST.len().to_string());
    b.add_header("WARC-Block-Digest", &sha1_base32(REQUEST));
    records.push((b, REQUEST.to_vec()));

    let response = [RESPONSE_HEAD, RESPONSE_BODY].concat();
    let mut b = WarcHeaderBuilder::new(WarcVersion::V1_1);
    b.add_header("WARC-Type", "response");
    b.add_header("WARC-Record-ID", &record_id(3));
    b.add_header("WARC-Date", "2024-03-01T12:30:46.5Z");
    b.add_header("WARC-Target-URI", "http://example.com/");
    b.add_header("WARC-IP-Address", "2001:db8::1");
    b.add_header("WARC-Concurrent-To", &record_id(2));
    b.add_header("WARC-Warcinfo-ID", &record_id(1));
    b.add_header("Content-Type", "application/http; msgtype=response");
    b.add_header("Content-Length", &response.len().to_string());
    b.add_header("WARC-Block-Digest", &sha1_base32(&response));
    b.add_header("WARC-Payload-Digest", &sha1_base32(RESPONSE_BODY));
    b.add_header("WARC-Identified-Payload-Type", "text/html");
    records.push((b, response));

    let init = WarcHeaderBuilder::init(WarcRecordType::Resource, 4);
    let mut b = init;
    b.add_header("WARC-Target-URI", "file:///tmp/data.bin");
    b.add_header("Content-Type", "application/octet-stream");
    records.push((b, vec![0, 1, 2, 3]));

    records
        .into_iter()
        .map(|(mut b, block)| {
            b.check_fields();
            let header = b.build();
            assert!(header.diagnostics().is_empty(), "{:?}", header.diagnostics());
            TestRecord { header, block }
        })
        .collect()
}

fn write_all(writer: &mut dyn WarcWriter, records: &[TestRecord]) -> Vec<u64> {
    let mut offsets = Vec::new();
    for record in records {
        offsets.push(writer.offset());
        writer.write_header(&record.header).unwrap();
        writer.write_payload(&record.block).unwrap();
        writer.close_record().unwrap();
    }
    writer.close().unwrap();
    assert!(writer.is_compliant());
    assert_eq!(writer.records(), records.len() as u64);
    offsets
}

fn check_read_back(data: &[u8], compressed: bool, records: &[TestRecord], offsets: &[u64]) {
    let mut reader = open_reader(data, ReaderConfig::default()).unwrap();
    assert_eq!(reader.is_compressed(), compressed);
    let mut i = 0;
    while let Some(mut record) = reader.next_record().unwrap() {
        let expected = &records[i];
        assert_eq!(record.start_offset(), offsets[i]);
        assert_eq!(record.header().record_id(), expected.header.record_id());
        assert_eq!(record.header().to_bytes(), expected.header.to_bytes());
        assert_eq!(record.read_payload().unwrap(), expected.block);
        record.close().unwrap();

        assert!(record.diagnostics().is_empty(), "record {i}: {:?}", record.diagnostics());
        assert_eq!(record.trailing_newlines(), Some(2));
        if expected.header.block_digest().is_some() {
            assert_eq!(record.is_valid_block_digest(), Some(true));
        }
        if expected.header.payload_digest().is_some() {
            assert_eq!(record.is_valid_payload_digest(), Some(true));
            let http = record.http_header().unwrap();
            assert_eq!(http.status_code(), Some(200));
            assert_eq!(http.len(), RESPONSE_HEAD.len());
        }
        i += 1;
    }
    assert_eq!(i, records.len());
    assert_eq!(reader.records(), records.len() as u64);
    assert_eq!(reader.consumed(), data.len() as u64);
    assert!(reader.diagnostics().is_empty());
}

#[test]
fn flat_round_trip() {
    let records = test_records();
    let mut writer = WarcWriterUncompressed::new(Vec::new(), WriterConfig::default());
    let offsets = write_all(&mut writer, &records);
    let data = writer.into_inner().unwrap();

    assert!(data.starts_with(b"WARC/1.1\r\nWARC-Type: warcinfo\r\n"));
    check_read_back(&data, false, &records, &offsets);
}

#[test]
fn gzip_round_trip() {
    let records = test_records();
    let mut writer = WarcWriterCompressed::new(Vec::new(), WriterConfig::default());
    let offsets = write_all(&mut writer, &records);
    let data = writer.into_inner().unwrap().unwrap();

    assert_eq!(offsets[0], 0);
    assert!(offsets.windows(2).all(|w| w[0] < w[1]));
    check_read_back(&data, true, &records, &offsets);
}

#[test]
fn random_access_flat() {
    let records = test_records();
    let mut writer = WarcWriterUncompressed::new(Vec::new(), WriterConfig::default());
    let offsets = write_all(&mut writer, &records);
    let data = writer.into_inner().unwrap();

    let mut reader = WarcReaderUncompressed::new(ReaderConfig::default());
    for (i, &offset) in offsets.iter().enumerate().rev() {
        let mut record = reader.next_record_from(Cursor::new(data.as_slice()), offset).unwrap().unwrap();
        assert_eq!(record.start_offset(), offset);
        assert_eq!(record.header().record_id(), records[i].header.record_id());
        record.close().unwrap();
        assert!(record.is_compliant());
    }
}

#[test]
fn random_access_gzip() {
    let records = test_records();
    let mut writer = WarcWriterCompressed::new(Vec::new(), WriterConfig::default());
    let offsets = write_all(&mut writer, &records);
    let data = writer.into_inner().unwrap().unwrap();

    let mut reader = WarcReaderCompressed::new(ReaderConfig::default());
    for (i, &offset) in offsets.iter().enumerate().rev() {
        let record = reader
            .next_record_from_with_buffer(Cursor::new(data.as_slice()), offset, 512)
            .unwrap()
            .unwrap();
        assert_eq!(record.start_offset(), offset);
        assert_eq!(record.header().record_id(), records[i].header.record_id());
    }
}

#[test]
fn skipping_unclosed_records() {
    let records = test_records();
    for compressed in [false, true] {
        let data = if compressed {
            let mut writer = WarcWriterCompressed::new(Vec::new(), WriterConfig::default());
            write_all(&mut writer, &records);
            writer.into_inner().unwrap().unwrap()
        } else {
            let mut writer = WarcWriterUncompressed::new(Vec::new(), WriterConfig::default());
            write_all(&mut writer, &records);
            writer.into_inner().unwrap()
        };

        let mut reader = open_reader(data.as_slice(), ReaderConfig::default()).unwrap();
        let mut types = Vec::new();
        while let Some(mut record) = reader.next_record().unwrap() {
            types.push(record.header().record_type());
            // Read only part of the block.
            let mut first = [0u8; 1];
            std::io::Read::read_exact(record.payload(), &mut first).unwrap();
        }
        assert_eq!(
            types,
            [
                WarcRecordType::WarcInfo,
                WarcRecordType::Request,
                WarcRecordType::Response,
                WarcRecordType::Resource
            ]
        );
        assert!(reader.diagnostics().is_empty(), "{:?}", reader.diagnostics());
    }
}
