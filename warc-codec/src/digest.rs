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

//! Record digests (`WARC-Block-Digest`, `WARC-Payload-Digest`).
//!
//! A digest header value has the form `algorithm:text`, where `text` is the
//! digest bytes in base32 (the common case), base16 or base64. The encoding is
//! not part of the value and has to be inferred from the expected digest length
//! of the algorithm.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use parking_lot::RwLock;

use crate::error::{Result, WarcError};

/// Text encoding of digest bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestEncoding {
    Base16,
    Base32,
    Base64,
}

impl DigestEncoding {
    /// Encodings in the order they are tried when detecting the encoding of a digest.
    pub const DETECTION_ORDER: [DigestEncoding; 3] =
        [DigestEncoding::Base32, DigestEncoding::Base16, DigestEncoding::Base64];

    pub fn as_str(&self) -> &'static str {
        match self {
            DigestEncoding::Base16 => "base16",
            DigestEncoding::Base32 => "base32",
            DigestEncoding::Base64 => "base64",
        }
    }

    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            DigestEncoding::Base16 => hex::encode(bytes),
            DigestEncoding::Base32 => base32::encode(base32::Alphabet::Rfc4648 { padding: true }, bytes),
            DigestEncoding::Base64 => BASE64.encode(bytes),
        }
    }

    /// Decode `text`, returning `None` if it is not valid in this encoding.
    pub fn decode(&self, text: &str) -> Option<Vec<u8>> {
        match self {
            DigestEncoding::Base16 => hex::decode(text).ok(),
            DigestEncoding::Base32 => {
                if text.bytes().any(|b| b.is_ascii_lowercase()) {
                    // Lower-case base32 is tolerated, but must not be mixed-case.
                    if text.bytes().any(|b| b.is_ascii_uppercase()) {
                        return None;
                    }
                }
                base32::decode(base32::Alphabet::Rfc4648 { padding: true }, &text.to_ascii_uppercase())
            }
            DigestEncoding::Base64 => BASE64.decode(text).ok(),
        }
    }
}

impl TryFrom<&str> for DigestEncoding {
    type Error = &'static str;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "base16" | "hex" => Ok(DigestEncoding::Base16),
            "base32" => Ok(DigestEncoding::Base32),
            "base64" => Ok(DigestEncoding::Base64),
            _ => Err("Unknown digest encoding."),
        }
    }
}

impl fmt::Display for DigestEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A digest value as found in or written to a WARC header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    algorithm: String,
    digest_bytes: Option<Vec<u8>>,
    encoding: Option<DigestEncoding>,
    digest_string: String,
}

impl Digest {
    /// Parse an `algorithm:text` header value.
    ///
    /// Returns `None` if the colon is missing or either side is empty. The digest
    /// bytes and encoding stay unresolved until [`Digest::resolve`] is called.
    pub fn parse(text: &str) -> Option<Digest> {
        let (algorithm, digest) = text.trim().split_once(':')?;
        let algorithm = algorithm.trim();
        let digest = digest.trim();
        if algorithm.is_empty() || digest.is_empty() {
            return None;
        }
        Some(Digest {
            algorithm: algorithm.to_lowercase(),
            digest_bytes: None,
            encoding: None,
            digest_string: digest.to_string(),
        })
    }

    /// Create a digest from computed bytes.
    ///
    /// # Arguments
    ///
    /// * `algorithm` - Digest algorithm name
    /// * `bytes` - Raw digest bytes
    /// * `encoding` - Encoding `text` was produced with
    /// * `text` - Encoded digest bytes
    pub fn from_computed(algorithm: &str, bytes: &[u8], encoding: DigestEncoding, text: &str) -> Result<Digest> {
        if algorithm.trim().is_empty() {
            return Err(WarcError::InvalidArgument("digest algorithm is empty".into()));
        }
        if bytes.is_empty() {
            return Err(WarcError::InvalidArgument("digest bytes are empty".into()));
        }
        if text.is_empty() {
            return Err(WarcError::InvalidArgument("digest text is empty".into()));
        }
        Ok(Digest {
            algorithm: algorithm.trim().to_lowercase(),
            digest_bytes: Some(bytes.to_vec()),
            encoding: Some(encoding),
            digest_string: text.to_string(),
        })
    }

    /// Create a digest from computed bytes, encoding them with `encoding`.
    pub fn encode(algorithm: &str, bytes: &[u8], encoding: DigestEncoding) -> Result<Digest> {
        Self::from_computed(algorithm, bytes, encoding, &encoding.encode(bytes))
    }

    /// Detect the encoding of a parsed digest by decoding it to a digest of
    /// `expected_len` bytes. Returns the detected encoding, or `None` if no known
    /// encoding yields the expected length.
    pub fn resolve(&mut self, expected_len: usize) -> Option<DigestEncoding> {
        if let Some(encoding) = self.encoding {
            return Some(encoding);
        }
        for encoding in DigestEncoding::DETECTION_ORDER {
            if let Some(bytes) = encoding.decode(&self.digest_string) {
                if bytes.len() == expected_len {
                    self.digest_bytes = Some(bytes);
                    self.encoding = Some(encoding);
                    return Some(encoding);
                }
            }
        }
        None
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    pub fn digest_bytes(&self) -> Option<&[u8]> {
        self.digest_bytes.as_deref()
    }

    pub fn encoding(&self) -> Option<DigestEncoding> {
        self.encoding
    }

    /// Encoded digest text (the part after the colon).
    pub fn digest_string(&self) -> &str {
        &self.digest_string
    }

    /// Re-encode a digest with known bytes.
    pub fn with_encoding(&self, encoding: DigestEncoding) -> Option<Digest> {
        let bytes = self.digest_bytes.as_ref()?;
        Some(Digest {
            algorithm: self.algorithm.clone(),
            digest_bytes: Some(bytes.clone()),
            encoding: Some(encoding),
            digest_string: encoding.encode(bytes),
        })
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algorithm, self.digest_string)
    }
}

/// Streaming hash state.
pub trait DigestAccumulator {
    fn update(&mut self, data: &[u8]);

    fn finish(self: Box<Self>) -> Vec<u8>;
}

/// A named digest algorithm.
pub trait DigestAlgorithm: Send + Sync {
    /// Canonical lower-case name as written in digest headers.
    fn name(&self) -> &str;

    /// Digest length in bytes.
    fn output_len(&self) -> usize;

    fn accumulator(&self) -> Box<dyn DigestAccumulator>;
}

struct Sha1Algorithm;
struct Sha256Algorithm;
struct Sha512Algorithm;

struct Sha1Accumulator(sha1::Sha1);
struct Sha256Accumulator(sha2::Sha256);
struct Sha512Accumulator(sha2::Sha512);

impl DigestAccumulator for Sha1Accumulator {
    fn update(&mut self, data: &[u8]) {
        sha1::Digest::update(&mut self.0, data);
    }

    fn finish(self: Box<Self>) -> Vec<u8> {
        sha1::Digest::finalize(self.0).as_slice().to_vec()
    }
}

impl DigestAccumulator for Sha256Accumulator {
    fn update(&mut self, data: &[u8]) {
        sha2::Digest::update(&mut self.0, data);
    }

    fn finish(self: Box<Self>) -> Vec<u8> {
        sha2::Digest::finalize(self.0).as_slice().to_vec()
    }
}

impl DigestAccumulator for Sha512Accumulator {
    fn update(&mut self, data: &[u8]) {
        sha2::Digest::update(&mut self.0, data);
    }

    fn finish(self: Box<Self>) -> Vec<u8> {
        sha2::Digest::finalize(self.0).as_slice().to_vec()
    }
}

impl DigestAlgorithm for Sha1Algorithm {
    fn name(&self) -> &str {
        "sha1"
    }

    fn output_len(&self) -> usize {
        20
    }

    fn accumulator(&self) -> Box<dyn DigestAccumulator> {
        Box::new(Sha1Accumulator(<sha1::Sha1 as sha1::Digest>::new()))
    }
}

impl DigestAlgorithm for Sha256Algorithm {
    fn name(&self) -> &str {
        "sha256"
    }

    fn output_len(&self) -> usize {
        32
    }

    fn accumulator(&self) -> Box<dyn DigestAccumulator> {
        Box::new(Sha256Accumulator(<sha2::Sha256 as sha2::Digest>::new()))
    }
}

impl DigestAlgorithm for Sha512Algorithm {
    fn name(&self) -> &str {
        "sha512"
    }

    fn output_len(&self) -> usize {
        64
    }

    fn accumulator(&self) -> Box<dyn DigestAccumulator> {
        Box::new(Sha512Accumulator(<sha2::Sha512 as sha2::Digest>::new()))
    }
}

/// Name-to-algorithm lookup shared by readers.
///
/// Names are matched case-insensitively.
pub struct DigestRegistry {
    algorithms: RwLock<HashMap<String, Arc<dyn DigestAlgorithm>>>,
}

impl fmt::Debug for DigestRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.algorithms.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("DigestRegistry").field("algorithms", &names).finish()
    }
}

impl Default for DigestRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl DigestRegistry {
    /// Create a registry without any algorithms.
    pub fn empty() -> Self {
        DigestRegistry {
            algorithms: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with SHA-1, SHA-256 and SHA-512 (also under their dashed names).
    pub fn with_defaults() -> Self {
        let registry = Self::empty();
        let sha1: Arc<dyn DigestAlgorithm> = Arc::new(Sha1Algorithm);
        let sha256: Arc<dyn DigestAlgorithm> = Arc::new(Sha256Algorithm);
        let sha512: Arc<dyn DigestAlgorithm> = Arc::new(Sha512Algorithm);
        registry.register_as("sha-1", sha1.clone());
        registry.register(sha1);
        registry.register_as("sha-256", sha256.clone());
        registry.register(sha256);
        registry.register_as("sha-512", sha512.clone());
        registry.register(sha512);
        registry
    }

    /// Register an algorithm under its own name, replacing any previous entry.
    pub fn register(&self, algorithm: Arc<dyn DigestAlgorithm>) {
        let name = algorithm.name().to_lowercase();
        self.register_as(&name, algorithm);
    }

    /// Register an algorithm under an alias.
    pub fn register_as(&self, name: &str, algorithm: Arc<dyn DigestAlgorithm>) {
        self.algorithms.write().insert(name.to_lowercase(), algorithm);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DigestAlgorithm>> {
        self.algorithms.read().get(&name.to_lowercase()).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.algorithms.read().contains_key(&name.to_lowercase())
    }

    /// Digest length in bytes of the named algorithm, if known.
    pub fn output_len(&self, name: &str) -> Option<usize> {
        self.get(name).map(|a| a.output_len())
    }
}
