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

use std::io::{self, Write};

use integer_encoding::VarInt;
use valwire_model::{Type, Value};

use crate::compression::Compression;
use crate::config::{CompressionRate, WindowSizes, WriterConfig};
use crate::ids;
use crate::wire::{WireEvent, WireReader};
use crate::writer::{estimate_type_size, estimate_value_size, ValueWriter};
use crate::{ValueIoError, MAGIC};

/// Split an uncompressed stream into its prologue and the ids of its messages.
fn message_ids(bytes: &[u8]) -> (u64, Vec<u32>) {
    assert_eq!(&bytes[..MAGIC.len()], &MAGIC);
    let rest = &bytes[MAGIC.len()..];
    let (strings, n) = u64::decode_var(rest).unwrap();
    assert_eq!(rest[n], Compression::None.header());
    let mut reader = WireReader::new(&rest[n + 1..], strings as usize);
    let mut ids = vec![];
    loop {
        match reader.next_event() {
            Ok(WireEvent::MessageStart(id)) => ids.push(id),
            Ok(_) => {}
            Err(ValueIoError::Truncated) => break,
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }
    (strings, ids)
}

fn write_one(value: &Value, config: WriterConfig) -> Vec<u8> {
    let mut writer = ValueWriter::new(vec![], config).unwrap();
    writer.write_value(value).unwrap();
    writer.close().unwrap()
}

#[test]
fn estimate_counts_compounds() {
    let inner = Value::list(vec![Value::from(1), Value::from(2)]);
    let root = Value::list(vec![inner.clone(), inner, Value::from("a")]);
    assert_eq!(estimate_value_size(&root, 100), 3);
    assert_eq!(estimate_value_size(&root, 2), 2);
    assert_eq!(estimate_value_size(&Value::from(true), 100), 0);

    let t = Type::map(Type::String, Type::list(Type::Integer));
    assert_eq!(estimate_type_size(&t, 100), 2);
}

#[test]
fn prologue_for_small_value() {
    let bytes = write_one(&Value::from(1), WriterConfig::default());
    let (strings, ids) = message_ids(&bytes);
    assert_eq!(strings, WindowSizes::TINY.strings as u64);
    assert_eq!(ids, vec![ids::HEADER, ids::value::INTEGER, ids::LAST_VALUE]);
}

#[test]
fn closing_an_unused_writer() {
    let writer = ValueWriter::new(vec![], WriterConfig::default()).unwrap();
    assert_eq!(writer.close().unwrap(), MAGIC.to_vec());
}

#[test]
fn repeated_instance_is_back_referenced() {
    let inner = Value::list(vec![Value::from(1)]);
    let root = Value::list(vec![inner.clone(), inner]);
    let (_, ids) = message_ids(&write_one(&root, WriterConfig::default()));
    assert_eq!(
        ids,
        vec![
            ids::HEADER,
            ids::value::INTEGER,
            ids::value::LIST,
            ids::value::PREVIOUS,
            ids::value::LIST,
            ids::LAST_VALUE
        ]
    );
}

#[test]
fn no_sharing_expands_repeats() {
    let inner = Value::list(vec![Value::from(1)]);
    let root = Value::list(vec![inner.clone(), inner]);
    let (strings, ids) = message_ids(&write_one(
        &root,
        WriterConfig::with_compression(CompressionRate::NoSharing),
    ));
    assert_eq!(strings, 0);
    assert_eq!(
        ids,
        vec![
            ids::HEADER,
            ids::value::INTEGER,
            ids::value::LIST,
            ids::value::INTEGER,
            ids::value::LIST,
            ids::value::LIST,
            ids::LAST_VALUE
        ]
    );
}

#[test]
fn constructor_type_precedes_constructor() {
    let adt = Type::adt("Shape", Type::tuple(vec![])).unwrap();
    let ctype = Type::constructor(adt, "square", Type::tuple(vec![Type::Integer])).unwrap();
    let value = Value::constructor(ctype, vec![Value::from(3)], Default::default()).unwrap();
    let (_, ids) = message_ids(&write_one(&value, WriterConfig::default()));
    assert_eq!(
        ids,
        vec![
            ids::HEADER,
            ids::value::INTEGER,
            ids::types::TUPLE,
            ids::types::ADT,
            ids::types::INTEGER,
            ids::types::TUPLE,
            ids::types::CONSTRUCTOR,
            ids::value::CONSTRUCTOR,
            ids::LAST_VALUE
        ]
    );
}

#[test]
fn large_first_root_is_compressed() {
    let root = Value::list((0..600).map(|i| Value::list(vec![Value::from(i)])));
    let bytes = write_one(&root, WriterConfig::default());
    let rest = &bytes[MAGIC.len()..];
    let (strings, n) = u64::decode_var(rest).unwrap();
    assert_eq!(strings, WindowSizes::SMALL.strings as u64);
    let expected = if cfg!(feature = "zstd") {
        Compression::Zstd
    } else {
        Compression::Gzip
    };
    assert_eq!(rest[n], expected.header());
}

struct LimitedSink {
    remaining: usize,
}

impl Write for LimitedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            Err(io::Error::new(io::ErrorKind::Other, "Sink full."))
        } else {
            let n = buf.len().min(self.remaining);
            self.remaining -= n;
            Ok(n)
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn failure_poisons_writer() {
    assert!(matches!(
        ValueWriter::new(LimitedSink { remaining: 0 }, WriterConfig::default()),
        Err(ValueIoError::Io(_))
    ));

    let sink = LimitedSink {
        remaining: MAGIC.len(),
    };
    let mut writer = ValueWriter::new(sink, WriterConfig::default()).unwrap();
    assert!(matches!(
        writer.write_value(&Value::from(1)),
        Err(ValueIoError::Io(_))
    ));
    assert!(matches!(
        writer.write_value(&Value::from(1)),
        Err(ValueIoError::Poisoned)
    ));
    assert!(matches!(writer.close(), Err(ValueIoError::Poisoned)));
}

#[test]
fn failure_within_root_poisons_writer() {
    // Room for the prologue only. The root is large enough to be drained to the sink
    // before it is complete.
    let sink = LimitedSink {
        remaining: MAGIC.len() + (WindowSizes::TINY.strings as u64).required_space() + 1,
    };
    let mut writer = ValueWriter::new(sink, WriterConfig::default()).unwrap();
    let long = Value::from("x".repeat(20_000));
    assert!(matches!(
        writer.write_value(&long),
        Err(ValueIoError::Io(_))
    ));
    assert!(matches!(
        writer.write_value(&Value::from(1)),
        Err(ValueIoError::Poisoned)
    ));
    assert!(matches!(writer.flush(), Err(ValueIoError::Poisoned)));
    assert!(matches!(writer.close(), Err(ValueIoError::Poisoned)));
}
