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

//! Reading, writing and validation of WARC records.
//!
//! Headers are parsed into typed fields and checked against the field rules of
//! their record type. Problems with the data are collected as [`Diagnosis`]
//! values instead of failing the read; only I/O failures and API misuse are
//! returned as [`WarcError`].
//!
//! ```no_run
//! use std::fs::File;
//! use warc_codec::{open_reader, ReaderConfig};
//!
//! # fn main() -> warc_codec::Result<()> {
//! let mut reader = open_reader(File::open("crawl.warc.gz")?, ReaderConfig::default())?;
//! while let Some(mut record) = reader.next_record()? {
//!     record.close()?;
//!     println!("{} {:?}", record.header().record_type().as_str(), record.is_valid_block_digest());
//! }
//! # Ok(())
//! # }
//! ```

pub mod content_type;
pub mod diagnosis;
pub mod digest;
pub mod error;
pub mod field;
pub mod field_parsers;
pub mod gzip;
pub mod header;
pub mod http;
pub mod input;
pub mod policy;
pub mod reader;
pub mod record;
pub mod timestamp;
pub mod uri;
pub mod writer;

pub use content_type::ContentType;
pub use diagnosis::{Diagnosis, DiagnosisType, Diagnostics};
pub use digest::{Digest, DigestAccumulator, DigestAlgorithm, DigestEncoding, DigestRegistry};
pub use error::{Result, WarcError};
pub use field::{FieldKind, FieldName, FieldValue, TypedField};
pub use field_parsers::FieldParsers;
pub use header::{HeaderLine, WarcHeader, WarcHeaderBuilder, WarcVersion};
pub use http::HttpHeader;
pub use input::is_record_start;
pub use policy::{check_field_policy, field_policy, FieldPolicy, WarcRecordType};
pub use reader::{open_reader, ReaderConfig, WarcReader, WarcReaderCompressed, WarcReaderUncompressed};
pub use record::{Payload, WarcRecord};
pub use timestamp::{Precision, Timestamp};
pub use uri::{Uri, UriProfile};
pub use writer::{WarcWriter, WarcWriterCompressed, WarcWriterUncompressed, WriterConfig, WriterState};
