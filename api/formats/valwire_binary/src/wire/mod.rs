// Copyright 2015-2023 Swim Inc.
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

//! Message framing. A stream is a sequence of messages, each of which is a message start
//! tag, any number of fields and an end marker. Every tag is a varint holding an identifier
//! in its high bits and a [`kind`] in its low three bits. The varint `0` ends the current
//! message.

use std::io::{self, Read, Write};

use bytes::{BufMut, BytesMut};
use integer_encoding::{VarInt, VarIntReader};

use crate::window::{ReadWindow, WriteWindow};
use crate::{FormatError, ValueIoError};


pub mod kind {
    pub const MESSAGE: u8 = 0;
    pub const STRING: u8 = 1;
    pub const INT: u8 = 2;
    pub const BYTES: u8 = 3;
    pub const PREVIOUS_STRING: u8 = 4;
}

const KIND_BITS: u32 = 3;
const KIND_MASK: u64 = (1 << KIND_BITS) - 1;
const MESSAGE_END: u8 = 0;
const FLUSH_THRESHOLD: usize = 8 * 1024;
const MAX_VARINT_LEN: usize = 10;

/// Writes framed messages to an underlying sink. Output is staged in a buffer and written to
/// the sink in large blocks.
pub struct WireWriter<W> {
    inner: W,
    buffer: BytesMut,
    strings: WriteWindow<String>,
}

impl<W: Write> WireWriter<W> {
    /// # Arguments
    /// * `inner` - The sink.
    /// * `strings_window` - The number of distinct strings to remember for back-references.
    pub fn new(inner: W, strings_window: usize) -> Self {
        WireWriter {
            inner,
            buffer: BytesMut::with_capacity(FLUSH_THRESHOLD),
            strings: WriteWindow::new(strings_window),
        }
    }

    fn put_varint<V: VarInt>(&mut self, value: V) {
        let mut scratch = [0u8; MAX_VARINT_LEN];
        let len = value.encode_var(&mut scratch);
        self.buffer.put_slice(&scratch[..len]);
    }

    fn put_tag(&mut self, id: u32, kind: u8) {
        self.put_varint((u64::from(id) << KIND_BITS) | u64::from(kind));
    }

    fn stage(&mut self) -> io::Result<()> {
        if self.buffer.len() >= FLUSH_THRESHOLD {
            self.drain()
        } else {
            Ok(())
        }
    }

    fn drain(&mut self) -> io::Result<()> {
        self.inner.write_all(&self.buffer)?;
        self.buffer.clear();
        Ok(())
    }

    pub fn start_message(&mut self, id: u32) -> io::Result<()> {
        debug_assert!(id > 0);
        self.put_tag(id, kind::MESSAGE);
        self.stage()
    }

    pub fn end_message(&mut self) -> io::Result<()> {
        self.buffer.put_u8(MESSAGE_END);
        self.stage()
    }

    pub fn write_empty_message(&mut self, id: u32) -> io::Result<()> {
        self.start_message(id)?;
        self.end_message()
    }

    pub fn write_int(&mut self, field: u32, value: i64) -> io::Result<()> {
        self.put_tag(field, kind::INT);
        self.put_varint(value);
        self.stage()
    }

    /// Write a string field. A string that is still in the strings window is replaced with
    /// a reference to its previous occurrence.
    pub fn write_str(&mut self, field: u32, value: &str) -> io::Result<()> {
        match self.strings.how_long_ago(value) {
            Some(distance) => {
                self.put_tag(field, kind::PREVIOUS_STRING);
                self.put_varint(distance as u64);
            }
            None => {
                self.put_tag(field, kind::STRING);
                self.put_varint(value.len() as u64);
                self.buffer.put_slice(value.as_bytes());
                self.strings.write(value.to_string(), ());
            }
        }
        self.stage()
    }

    pub fn write_bytes(&mut self, field: u32, value: &[u8]) -> io::Result<()> {
        self.put_tag(field, kind::BYTES);
        self.put_varint(value.len() as u64);
        self.buffer.put_slice(value);
        self.stage()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.drain()?;
        self.inner.flush()
    }

    /// Flush any staged output and recover the sink.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

/// The value of a field. References to previous strings are resolved by the reader so are
/// never seen here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WireEvent {
    MessageStart(u32),
    Field(u32, FieldValue),
    MessageEnd,
}

/// Reads framed messages from an underlying source.
pub struct WireReader<R> {
    inner: R,
    strings: ReadWindow<String>,
    depth: usize,
}

impl<R: Read> WireReader<R> {
    pub fn new(inner: R, strings_window: usize) -> Self {
        WireReader {
            inner,
            strings: ReadWindow::new(strings_window),
            depth: 0,
        }
    }

    /// The number of messages that are currently open.
    pub fn depth(&self) -> usize {
        self.depth
    }

    fn read_blob(&mut self) -> Result<Vec<u8>, ValueIoError> {
        let len: u64 = self.inner.read_varint()?;
        let mut blob = vec![];
        (&mut self.inner).take(len).read_to_end(&mut blob)?;
        if blob.len() as u64 == len {
            Ok(blob)
        } else {
            Err(ValueIoError::Truncated)
        }
    }

    pub fn next_event(&mut self) -> Result<WireEvent, ValueIoError> {
        let tag: u64 = self.inner.read_varint()?;
        if tag == u64::from(MESSAGE_END) {
            return if self.depth == 0 {
                Err(FormatError::UnexpectedMessageEnd.into())
            } else {
                self.depth -= 1;
                Ok(WireEvent::MessageEnd)
            };
        }
        let id = u32::try_from(tag >> KIND_BITS).map_err(|_| FormatError::OutOfRange)?;
        let field_kind = (tag & KIND_MASK) as u8;
        if field_kind == kind::MESSAGE {
            self.depth += 1;
            return Ok(WireEvent::MessageStart(id));
        }
        if self.depth == 0 {
            return Err(FormatError::FieldOutsideMessage.into());
        }
        let value = match field_kind {
            kind::STRING => {
                let content =
                    String::from_utf8(self.read_blob()?).map_err(|_| FormatError::InvalidUtf8)?;
                self.strings.write(content.clone());
                FieldValue::Str(content)
            }
            kind::INT => FieldValue::Int(self.inner.read_varint()?),
            kind::BYTES => FieldValue::Bytes(self.read_blob()?),
            kind::PREVIOUS_STRING => {
                let distance: u64 = self.inner.read_varint()?;
                let distance = usize::try_from(distance).map_err(|_| FormatError::OutOfRange)?;
                FieldValue::Str(self.strings.look_back(distance)?)
            }
            ow => return Err(FormatError::UnknownFieldKind(ow).into()),
        };
        Ok(WireEvent::Field(id, value))
    }

    /// Consume the remainder of the innermost open message, including any messages nested
    /// within it.
    pub fn skip_message(&mut self) -> Result<(), ValueIoError> {
        let target = self.depth.saturating_sub(1);
        while self.depth > target {
            self.next_event()?;
        }
        Ok(())
    }
}
