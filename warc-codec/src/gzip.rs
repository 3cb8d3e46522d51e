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

//! Member-by-member access to a multi-member gzip stream.

use std::io::{self, BufRead, Read};

use flate2::bufread::GzDecoder;

use crate::input::{ByteSource, InputBuffer};

pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decompressed view of the current member.
pub type MemberInput<R> = InputBuffer<GzDecoder<InputBuffer<R>>>;

#[derive(Debug)]
enum State<R> {
    Between(InputBuffer<R>),
    Inside(MemberInput<R>),
    Poisoned,
}

/// Iterates over the members of a gzip stream, one member at a time.
///
/// Each member is decompressed through its own [`InputBuffer`], so offsets
/// reported by [`GzipMembers::current`] are relative to the member start,
/// while [`GzipMembers::member_offset`] is the compressed position.
#[derive(Debug)]
pub struct GzipMembers<R> {
    state: State<R>,
    member_offset: u64,
    buffer_size: usize,
}

impl<R: Read> GzipMembers<R> {
    pub fn new(input: InputBuffer<R>, buffer_size: usize) -> Self {
        GzipMembers {
            member_offset: input.offset(),
            state: State::Between(input),
            buffer_size,
        }
    }

    /// Whether more compressed input follows the current position.
    ///
    /// Fails if called while a member is open.
    pub fn has_next_member(&mut self) -> io::Result<bool> {
        match &mut self.state {
            State::Between(input) => Ok(!input.peek(1)?.is_empty()),
            State::Inside(_) => Err(io::Error::other("gzip member still open")),
            State::Poisoned => Ok(false),
        }
    }

    /// Consume zero bytes between members. Returns how many were skipped.
    ///
    /// Does nothing while a member is open.
    pub fn skip_padding(&mut self) -> io::Result<u64> {
        let State::Between(input) = &mut self.state else {
            return Ok(0);
        };
        let mut skipped = 0u64;
        loop {
            let available = input.fill_buf()?;
            let zeros = available.iter().take_while(|&&b| b == 0).count();
            if zeros == 0 {
                return Ok(skipped);
            }
            input.consume(zeros);
            skipped += zeros as u64;
        }
    }

    /// Open the next member. Does nothing if a member is already open.
    pub fn next_member(&mut self) -> io::Result<()> {
        match std::mem::replace(&mut self.state, State::Poisoned) {
            State::Between(mut input) => {
                let magic = input.peek(2)?;
                if magic != GZIP_MAGIC {
                    let found = magic.to_vec();
                    self.state = State::Between(input);
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("invalid gzip member header {found:02x?} at offset {}", self.member_offset),
                    ));
                }
                self.member_offset = input.offset();
                self.state = State::Inside(InputBuffer::with_offset(GzDecoder::new(input), 0, self.buffer_size));
                Ok(())
            }
            other => {
                self.state = other;
                Ok(())
            }
        }
    }

    /// Skip the rest of the open member.
    ///
    /// Returns the number of decompressed bytes that were left unread.
    pub fn finish_member(&mut self) -> io::Result<u64> {
        match std::mem::replace(&mut self.state, State::Poisoned) {
            State::Inside(mut member) => {
                let remaining = io::copy(&mut member, &mut io::sink())?;
                let input = member.into_inner().into_inner();
                self.state = State::Between(input);
                Ok(remaining)
            }
            other => {
                self.state = other;
                Ok(0)
            }
        }
    }

    /// Decompressed input of the open member.
    pub fn current(&mut self) -> Option<&mut MemberInput<R>> {
        match &mut self.state {
            State::Inside(member) => Some(member),
            _ => None,
        }
    }

    pub fn is_inside_member(&self) -> bool {
        matches!(self.state, State::Inside(_))
    }

    /// Compressed offset at which the current (or last) member starts.
    pub fn member_offset(&self) -> u64 {
        self.member_offset
    }

    /// Compressed offset consumed so far.
    pub fn offset(&self) -> u64 {
        match &self.state {
            State::Between(input) => input.offset(),
            State::Inside(member) => member.get_ref().get_ref().offset(),
            State::Poisoned => self.member_offset,
        }
    }
}
