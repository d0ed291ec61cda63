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

//! A compact binary format for [`Value`]s and [`Type`]s. Sub-values that are shared by
//! reference are written once and then referred back to, so the encoding of a value with a
//! lot of structural sharing is proportional to the number of distinct instances rather than
//! to the size of the fully expanded tree.

mod compression;
pub mod config;
mod error;
pub mod ids;
pub mod iter;
mod reader;
#[cfg(test)]
mod tests;
pub mod window;
pub mod wire;
mod writer;

use std::io::{Read, Write};

use valwire_model::{Type, TypeStore, Value, ValueFactory};

pub use compression::Compression;
pub use config::{CompressionRate, WindowSizes, WriterConfig};
pub use error::{FormatError, ValueIoError};
pub use reader::ValueReader;
pub use writer::{estimate_type_size, estimate_value_size, ValueWriter};

/// The magic bytes and format version at the start of every stream.
pub const MAGIC: [u8; 5] = [b'R', b'V', 1, 0, 0];

/// Write a single value to a sink using the default configuration.
pub fn write<W: Write>(sink: W, value: &Value) -> Result<W, ValueIoError> {
    write_with(sink, value, WriterConfig::default())
}

/// Write a single value to a sink.
pub fn write_with<W: Write>(
    sink: W,
    value: &Value,
    config: WriterConfig,
) -> Result<W, ValueIoError> {
    let mut writer = ValueWriter::new(sink, config)?;
    writer.write_value(value)?;
    writer.close()
}

/// Write a single type to a sink.
pub fn write_type<W: Write>(sink: W, t: &Type, config: WriterConfig) -> Result<W, ValueIoError> {
    let mut writer = ValueWriter::new(sink, config)?;
    writer.write_type(t)?;
    writer.close()
}

/// Read a single value from a stream written by [`write`].
///
/// # Arguments
/// * `source` - The stream.
/// * `factory` - Builds the compound values.
/// * `store` - Declarations of nominal types. Types declared in the stream are added to it.
pub fn read<R, F>(source: R, factory: &F, store: &mut TypeStore) -> Result<Value, ValueIoError>
where
    R: Read,
    F: ValueFactory + ?Sized,
{
    ValueReader::new(source)?.read_value(factory, store)
}

/// Read a single type from a stream written by [`write_type`].
pub fn read_type<R, F>(source: R, factory: &F, store: &mut TypeStore) -> Result<Type, ValueIoError>
where
    R: Read,
    F: ValueFactory + ?Sized,
{
    ValueReader::new(source)?.read_type(factory, store)
}
