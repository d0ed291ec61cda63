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

use std::io;

use thiserror::Error;
use valwire_model::ModelError;

/// The bytes of a stream do not constitute a valid encoding. The stream should be
/// considered corrupt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The stream did not start with the expected magic and version bytes.
    #[error("The stream does not start with the expected magic bytes.")]
    BadMagic,
    /// A field tag contained an unknown kind.
    #[error("Unknown field kind: {0}")]
    UnknownFieldKind(u8),
    /// A message end marker was encountered with no open message.
    #[error("A message end was encountered with no open message.")]
    UnexpectedMessageEnd,
    /// A field was encountered with no open message.
    #[error("A field was encountered with no open message.")]
    FieldOutsideMessage,
    /// A root value or type was not preceded by a header message.
    #[error("Missing header message.")]
    MissingHeader,
    /// A header message appeared within a root value or type.
    #[error("A header message occurred within a value.")]
    MisplacedHeader,
    /// A message was missing a mandatory field.
    #[error("Message {message} is missing field {field}.")]
    MissingField { message: u32, field: u32 },
    /// The end of a root was reached while the stacks were in an unexpected state.
    #[error("End message before stack was ready: {values} values and {types} types remain.")]
    BadStackShape { values: usize, types: usize },
    /// A value stream was terminated as a type stream, or the converse.
    #[error("Unexpected end of root marker.")]
    UnexpectedTerminator,
    /// A message required more operands than were available.
    #[error("A message required more operands than were available.")]
    StackUnderflow,
    /// An operand of the wrong kind was found on a stack.
    #[error("Expected an operand of kind: {0}")]
    UnexpectedOperand(&'static str),
    /// A string field contained invalid UTF8.
    #[error("A string field contained invalid UTF8.")]
    InvalidUtf8,
    /// The stream was compressed with an algorithm that is not supported.
    #[error("Unsupported compression algorithm: {0}")]
    UnsupportedCompression(u8),
    /// A numeric field was out of the range permitted for its use.
    #[error("A numeric field was out of range.")]
    OutOfRange,
}

/// Errors that can occur writing or reading values.
#[derive(Debug, Error)]
pub enum ValueIoError {
    /// The stream was malformed.
    #[error("Malformed stream: {0}")]
    Format(#[from] FormatError),
    /// The stream ended part of the way through a value.
    #[error("The stream ended before the value was complete.")]
    Truncated,
    /// A back-reference pointed outside of the window. This indicates that the writer and
    /// reader disagree on window capacities.
    #[error("Back-reference to {distance} items ago but only {occupancy} are held.")]
    CacheMiss { distance: usize, occupancy: usize },
    /// A kind of value or type that cannot be encoded or decoded.
    #[error("Unsupported kind: {0}")]
    UnsupportedKind(String),
    /// The underlying stream failed.
    #[error("IO error: {0}")]
    Io(#[source] io::Error),
    /// A decoded value or type could not be constructed.
    #[error("Invalid value: {0}")]
    Model(#[from] ModelError),
    /// An earlier failure has left the stream unusable.
    #[error("The stream is unusable after an earlier failure.")]
    Poisoned,
}

impl From<io::Error> for ValueIoError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => ValueIoError::Truncated,
            _ => ValueIoError::Io(err),
        }
    }
}
