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

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use integer_encoding::VarInt;
use num_bigint::BigInt;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use valwire_model::{
    DateTimeValue, Parameters, SourceLocation, SourceUri, StandardValueFactory, Type, TypeStore,
    Value,
};

use crate::wire::{WireEvent, WireReader};
use crate::{
    ids, read, read_type, write, write_type, write_with, Compression, CompressionRate, FormatError,
    ValueIoError, ValueReader, ValueWriter, WindowSizes, WriterConfig, MAGIC,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}

fn encode(value: &Value, config: WriterConfig) -> Vec<u8> {
    write_with(vec![], value, config).unwrap()
}

fn decode(bytes: &[u8]) -> Result<Value, ValueIoError> {
    read(bytes, &StandardValueFactory, &mut TypeStore::new())
}

fn round_trip_with(value: &Value, config: WriterConfig) -> Value {
    decode(&encode(value, config)).unwrap()
}

fn round_trip(value: &Value) -> Value {
    round_trip_with(value, WriterConfig::default())
}

fn uncompressed() -> WriterConfig {
    WriterConfig::with_compression(CompressionRate::None)
}

/// The ids of the fields of every message with the given id, in an uncompressed stream.
fn fields_of(bytes: &[u8], message: u32) -> Vec<u32> {
    let rest = &bytes[MAGIC.len()..];
    let (strings, n) = u64::decode_var(rest).unwrap();
    let mut reader = WireReader::new(&rest[n + 1..], strings as usize);
    let mut open = vec![];
    let mut fields = vec![];
    loop {
        match reader.next_event() {
            Ok(WireEvent::MessageStart(id)) => open.push(id),
            Ok(WireEvent::MessageEnd) => {
                open.pop();
            }
            Ok(WireEvent::Field(id, _)) => {
                if open.last() == Some(&message) {
                    fields.push(id);
                }
            }
            Err(ValueIoError::Truncated) => break,
            Err(e) => panic!("Unexpected error: {}", e),
        }
    }
    fields
}

fn keywords(entries: Vec<(&str, Value)>) -> Parameters {
    Parameters::Keywords(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<BTreeMap<_, _>>(),
    )
}

fn relation() -> Value {
    Value::set(vec![
        Value::tuple(vec![Value::from(1), Value::from("a")]),
        Value::tuple(vec![Value::from(2), Value::from("b")]),
    ])
}

#[test]
fn atomic_values() {
    init_tracing();
    let values = vec![
        Value::from(true),
        Value::from(false),
        Value::from(0),
        Value::from(-17),
        Value::from(""),
        Value::from("hello"),
        Value::from("ünïcödé ✓"),
        Value::real(12345, 2),
        Value::real(-1, 0),
    ];
    for value in values {
        assert_eq!(round_trip(&value), value);
    }
}

#[test]
fn date_times() {
    let date = DateTimeValue::date(2023, 3, 14).unwrap();
    let time = DateTimeValue::time(
        NaiveTime::from_hms_milli_opt(13, 5, 7, 250).unwrap(),
        -330,
    )
    .unwrap();
    let date_time = DateTimeValue::date_time(
        NaiveDate::from_ymd_opt(1999, 12, 31)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 999)
            .unwrap(),
        60,
    )
    .unwrap();
    for dt in [date, time, date_time] {
        let value = Value::from(dt);
        assert_eq!(round_trip(&value), value);
    }
}

#[test]
fn sub_millisecond_date_times_survive() {
    let datetime = NaiveDate::from_ymd_opt(2001, 2, 3)
        .unwrap()
        .and_hms_nano_opt(3, 4, 5, 1_234_567)
        .unwrap();
    let value = Value::from(DateTimeValue::date_time(datetime, 0).unwrap());
    assert_eq!(round_trip(&value), value);
}

#[test]
fn integer_boundaries() {
    let compact = [i64::from(i32::MAX), i64::from(i32::MIN)];
    for n in compact {
        let value = Value::from(n);
        let bytes = encode(&value, uncompressed());
        assert_eq!(
            fields_of(&bytes, ids::value::INTEGER),
            vec![ids::integer::INT]
        );
        assert_eq!(decode(&bytes).unwrap(), value);
    }

    let big = [
        BigInt::from(i32::MAX) + 1,
        BigInt::from(i32::MIN) - 1,
        BigInt::from(u64::MAX) * BigInt::from(u64::MAX),
    ];
    for n in big {
        let value = Value::from(n);
        let bytes = encode(&value, uncompressed());
        assert_eq!(
            fields_of(&bytes, ids::value::INTEGER),
            vec![ids::integer::BIG]
        );
        assert_eq!(decode(&bytes).unwrap(), value);
    }
}

#[test]
fn real_scales() {
    let zero_scale = Value::real(BigInt::from(987_654_321_987_654_321i64), 0);
    let negative_scale = Value::real(-42, -1_000_000);
    for value in [zero_scale, negative_scale] {
        let restored = round_trip(&value);
        assert_eq!(restored, value);
        match (restored, value) {
            (Value::Real(restored), Value::Real(original)) => {
                assert_eq!(restored.unscaled(), original.unscaled());
                assert_eq!(restored.scale(), original.scale());
            }
            ow => panic!("Unexpected values: {:?}", ow),
        }
    }
}

#[test]
fn rationals() {
    let value = Value::list(vec![
        Value::rational(3, 4).unwrap(),
        Value::rational(-10, 4).unwrap(),
        Value::rational(BigInt::from(u64::MAX), 7).unwrap(),
    ]);
    assert_eq!(round_trip(&value), value);
}

#[test]
fn compound_values() {
    let empty = vec![
        Value::list(vec![]),
        Value::set(vec![]),
        Value::map(vec![]),
        Value::tuple(vec![]),
        Value::node("leaf", vec![]),
    ];
    for value in empty {
        assert_eq!(round_trip(&value), value);
    }

    let nested = Value::list(vec![Value::set(vec![
        Value::tuple(vec![
            Value::map(vec![
                (Value::from("x"), Value::from(1)),
                (Value::from("y"), Value::list(vec![Value::from(true)])),
            ]),
            Value::from(2),
        ]),
        Value::named_tuple(
            vec![Value::from(1), Value::from("b")],
            vec!["first".to_string(), "second".to_string()],
        )
        .unwrap(),
    ])]);
    assert_eq!(round_trip(&nested), nested);
}

#[test]
fn nodes_and_constructors() {
    let annotated = Value::node_with(
        "call",
        vec![Value::from("f"), Value::from(1)],
        Parameters::Annotations(
            [("loc".to_string(), Value::from("here"))]
                .into_iter()
                .collect(),
        ),
    );
    let empty_keywords = Value::node_with("empty", vec![], keywords(vec![]));
    let adt = Type::adt("Shape", Type::tuple(vec![])).unwrap();
    let circle = Type::constructor(
        adt.clone(),
        "circle",
        Type::named_tuple(vec![Type::Real], vec!["radius".to_string()]).unwrap(),
    )
    .unwrap();
    let unit = Type::constructor(adt, "unit", Type::tuple(vec![])).unwrap();
    let value = Value::list(vec![
        annotated,
        empty_keywords,
        Value::constructor(
            circle.clone(),
            vec![Value::real(15, 1)],
            keywords(vec![("colour", Value::from("red")), ("filled", Value::from(true))]),
        )
        .unwrap(),
        Value::constructor(circle, vec![Value::real(1, 0)], Parameters::None).unwrap(),
        Value::constructor(unit, vec![], Parameters::None).unwrap(),
    ]);
    let mut store = TypeStore::new();
    let bytes = encode(&value, WriterConfig::default());
    let restored = read(bytes.as_slice(), &StandardValueFactory, &mut store).unwrap();
    assert_eq!(restored, value);
    // One algebraic data type with two constructors.
    assert_eq!(store.len(), 3);
}

#[test]
fn source_location_uri_is_shared() {
    let uri = Arc::new(SourceUri::new("file").with_path("/tmp/a.txt"));
    let first = SourceLocation::new(uri.clone()).with_offset(10, 5);
    let second = SourceLocation::new(uri.clone())
        .with_offset(20, 3)
        .with_lines(2, 2, 0, 3);
    let shared = Value::list(vec![Value::from(first.clone()), Value::from(second.clone())]);

    let other_uri = Arc::new(SourceUri::new("file").with_path("/tmp/a.txt"));
    let distinct = Value::list(vec![
        Value::from(first.clone()),
        Value::from(SourceLocation::new(other_uri).with_offset(20, 3).with_lines(2, 2, 0, 3)),
    ]);

    let shared_bytes = encode(&shared, uncompressed());
    let distinct_bytes = encode(&distinct, uncompressed());
    assert!(shared_bytes.len() < distinct_bytes.len());
    assert_eq!(
        fields_of(&shared_bytes, ids::value::SOURCE_LOCATION)
            .iter()
            .filter(|id| **id == ids::location::PREVIOUS_URI)
            .count(),
        1
    );

    let restored = decode(&shared_bytes).unwrap();
    assert_eq!(restored, shared);
    match restored {
        Value::List(elements) => match (&elements[0], &elements[1]) {
            (Value::SourceLocation(a), Value::SourceLocation(b)) => {
                assert!(Arc::ptr_eq(a.top(), b.top()));
                assert_eq!(a.offset_length(), first.offset_length());
                assert_eq!(b.offset_length(), second.offset_length());
                assert_eq!(b.line_column(), second.line_column());
            }
            ow => panic!("Unexpected elements: {:?}", ow),
        },
        ow => panic!("Unexpected value: {:?}", ow),
    }
}

#[test]
fn shared_relation_is_smaller() {
    let r = relation();
    let shared = Value::list(vec![r.clone(), Value::from("middle"), r]);
    let distinct = Value::list(vec![relation(), Value::from("middle"), relation()]);
    assert_eq!(shared, distinct);

    let shared_bytes = encode(&shared, WriterConfig::default());
    let distinct_bytes = encode(&distinct, WriterConfig::default());
    assert!(shared_bytes.len() < distinct_bytes.len());
    assert_eq!(decode(&shared_bytes).unwrap(), shared);
    assert_eq!(decode(&distinct_bytes).unwrap(), distinct);
}

#[test]
fn small_window_falls_back_to_full_encoding() {
    let a = Value::list(vec![Value::from(1), Value::from("a")]);
    let b = Value::list(vec![Value::from(2)]);
    let value = Value::list(vec![a.clone(), b, a]);

    let tiny = uncompressed().with_windows(WindowSizes::new(1, 1, 1, 1));
    let restricted = encode(&value, tiny);
    let unrestricted = encode(&value, uncompressed());
    assert!(restricted.len() > unrestricted.len());
    assert_eq!(decode(&restricted).unwrap(), value);
    assert_eq!(decode(&unrestricted).unwrap(), value);

    let none = encode(&value, uncompressed().with_windows(WindowSizes::NO_WINDOW));
    assert_eq!(decode(&none).unwrap(), value);
}

#[test]
fn truncated_streams() {
    let value = Value::list(vec![
        Value::from("some text"),
        Value::from(BigInt::from(u64::MAX)),
        Value::node("n", vec![Value::from(true)]),
        Value::rational(1, 3).unwrap(),
    ]);
    let bytes = encode(&value, uncompressed());
    for len in 0..bytes.len() {
        assert!(
            matches!(decode(&bytes[..len]), Err(ValueIoError::Truncated)),
            "Prefix of length {} was not reported as truncated.",
            len
        );
    }
    assert_eq!(decode(&bytes).unwrap(), value);
}

#[test]
fn truncated_compressed_streams() {
    // Large enough to be compressed. Only the trailer of the compressed stream may be lost
    // without the value being affected.
    const TRAILER: usize = 64;
    let value = Value::list((0..600).map(|i| {
        Value::list(vec![Value::from(i), Value::from(format!("entry {}", i * 7919))])
    }));
    assert_eq!(CompressionRate::Extreme.algorithm(), Compression::Xz);
    for rate in [CompressionRate::Normal, CompressionRate::Extreme] {
        let bytes = encode(&value, WriterConfig::with_compression(rate));
        assert_eq!(
            bytes[MAGIC.len() + 2],
            rate.algorithm().or_fallback().header()
        );
        for len in (0..bytes.len()).step_by(3) {
            match decode(&bytes[..len]) {
                Err(ValueIoError::Truncated) => {}
                Ok(decoded) if bytes.len() - len <= TRAILER => assert_eq!(decoded, value),
                ow => panic!(
                    "Prefix of length {} of {:?} gave {:?}.",
                    len, rate, ow
                ),
            }
        }
        assert_eq!(decode(&bytes).unwrap(), value);
    }
}

#[test]
fn injected_message_end() {
    let value = Value::list(vec![Value::from(1), Value::from(2)]);
    let mut bytes = encode(&value, uncompressed());
    let at = bytes.len() - 2;
    bytes.insert(at, 0);
    assert!(matches!(
        decode(&bytes),
        Err(ValueIoError::Format(FormatError::UnexpectedMessageEnd))
    ));
}

#[test]
fn not_a_value_stream() {
    assert!(matches!(
        decode(b"NOT A STREAM"),
        Err(ValueIoError::Format(FormatError::BadMagic))
    ));
}

#[test]
fn large_values_are_compressed() {
    init_tracing();
    let shared = Value::from("a shared string that repeats");
    let value = Value::list((0..2_000).map(|i| {
        Value::tuple(vec![
            Value::from(i),
            Value::list(vec![shared.clone(), Value::from(format!("item {}", i % 10))]),
        ])
    }));
    let compressed = encode(&value, WriterConfig::default());
    let plain = encode(&value, uncompressed());
    assert!(compressed.len() < plain.len());
    assert_eq!(decode(&compressed).unwrap(), value);
    assert_eq!(decode(&plain).unwrap(), value);

    for rate in [CompressionRate::Light, CompressionRate::Extreme] {
        let bytes = encode(&value, WriterConfig::with_compression(rate));
        assert_eq!(decode(&bytes).unwrap(), value);
    }
}

#[test]
fn roots_share_windows() {
    let r = relation();
    let mut writer = ValueWriter::new(vec![], WriterConfig::default()).unwrap();
    writer.write_value(&r).unwrap();
    writer
        .write_value(&Value::list(vec![r.clone(), r.clone()]))
        .unwrap();
    writer.write_type(&Type::list(Type::Integer)).unwrap();
    writer.write_value(&Value::from(5)).unwrap();
    let bytes = writer.close().unwrap();

    let mut reader = ValueReader::new(bytes.as_slice()).unwrap();
    let mut store = TypeStore::new();
    let first = reader.read_value(&StandardValueFactory, &mut store).unwrap();
    let second = reader.read_value(&StandardValueFactory, &mut store).unwrap();
    let t = reader.read_type(&StandardValueFactory, &mut store).unwrap();
    let last = reader.read_value(&StandardValueFactory, &mut store).unwrap();

    assert_eq!(first, r);
    assert_eq!(t, Type::list(Type::Integer));
    assert_eq!(last, Value::from(5));
    match second {
        Value::List(elements) => {
            assert_eq!(elements.len(), 2);
            assert_eq!(elements[0].identity(), first.identity());
            assert_eq!(elements[1].identity(), first.identity());
        }
        ow => panic!("Unexpected value: {:?}", ow),
    }
    assert!(matches!(
        reader.read_value(&StandardValueFactory, &mut store),
        Err(ValueIoError::Truncated)
    ));
}

#[test]
fn roots_of_different_sizes() {
    let small = Value::list(vec![Value::from(1)]);
    let large = Value::list((0..600).map(|i| Value::list(vec![Value::from(i)])));
    let mut writer = ValueWriter::new(vec![], WriterConfig::default()).unwrap();
    for value in [&small, &large, &small] {
        writer.write_value(value).unwrap();
    }
    let bytes = writer.close().unwrap();

    let mut reader = ValueReader::new(bytes.as_slice()).unwrap();
    let mut store = TypeStore::new();
    for value in [&small, &large, &small] {
        assert_eq!(
            &reader.read_value(&StandardValueFactory, &mut store).unwrap(),
            value
        );
    }
}

#[test]
fn value_and_type_streams_are_distinct() {
    let bytes = write(vec![], &Value::from(1)).unwrap();
    assert!(matches!(
        read_type(bytes.as_slice(), &StandardValueFactory, &mut TypeStore::new()),
        Err(ValueIoError::Format(FormatError::UnexpectedTerminator))
    ));
}

#[test]
fn types() {
    let param = Type::parameter("T", Type::Value);
    let adt = Type::adt("Shape", Type::tuple(vec![param.clone()])).unwrap();
    let cons = Type::constructor(
        adt.clone(),
        "circle",
        Type::named_tuple(vec![Type::Real, param], vec!["radius".into(), "tag".into()])
            .unwrap(),
    )
    .unwrap();
    let alias = Type::alias(
        "Point",
        Type::tuple(vec![Type::Integer, Type::Integer]),
        Type::tuple(vec![]),
    )
    .unwrap();
    let function = Type::function(
        Type::Bool,
        Type::tuple(vec![alias.clone(), Type::list(Type::String)]),
        Type::tuple(vec![]),
    )
    .unwrap();
    let root = Type::tuple(vec![
        adt,
        cons,
        alias,
        function.clone(),
        Type::reified(Type::tuple(vec![Type::Number])).unwrap(),
        Type::overloaded(vec![function, Type::set(Type::Rational)]),
        Type::non_terminal(Value::node("sym", vec![Value::from("x")])),
        Type::labelled_map(Type::String, Type::DateTime, "name", "when"),
        Type::map(Type::Node, Type::SourceLocation),
        Type::Void,
    ]);

    let mut store = TypeStore::new();
    let bytes = write_type(vec![], &root, WriterConfig::default()).unwrap();
    let restored = read_type(bytes.as_slice(), &StandardValueFactory, &mut store).unwrap();
    assert_eq!(restored, root);
    assert_eq!(store.len(), 3);

    // Reading again resolves to the declarations already held by the store.
    let again = read_type(bytes.as_slice(), &StandardValueFactory, &mut store).unwrap();
    assert_eq!(store.len(), 3);
    match (restored, again) {
        (Type::Tuple(first), Type::Tuple(second)) => {
            assert_eq!(first.fields()[0].identity(), second.fields()[0].identity());
            assert_eq!(first.fields()[1].identity(), second.fields()[1].identity());
        }
        ow => panic!("Unexpected types: {:?}", ow),
    }
}

fn random_value(rng: &mut StdRng, depth: usize, pool: &mut Vec<Value>) -> Value {
    if !pool.is_empty() && rng.gen_bool(0.1) {
        return pool[rng.gen_range(0..pool.len())].clone();
    }
    let leaf = depth == 0 || rng.gen_bool(0.4);
    let value = if leaf {
        match rng.gen_range(0..5) {
            0 => Value::from(rng.gen_bool(0.5)),
            1 => Value::from(rng.gen::<i64>()),
            2 => Value::from(format!("s{}", rng.gen_range(0..20))),
            3 => Value::real(rng.gen::<i32>(), rng.gen_range(-10..10)),
            _ => Value::from(rng.gen::<i32>()),
        }
    } else {
        let width = rng.gen_range(0..4);
        let mut children = (0..width)
            .map(|_| random_value(rng, depth - 1, pool))
            .collect::<Vec<_>>();
        match rng.gen_range(0..5) {
            0 => Value::list(children),
            1 => Value::set(children),
            2 => Value::tuple(children),
            3 => {
                let mut entries = vec![];
                while children.len() >= 2 {
                    let value = children.pop().unwrap_or_else(|| Value::from(0));
                    let key = children.pop().unwrap_or_else(|| Value::from(0));
                    entries.push((key, value));
                }
                Value::map(entries)
            }
            _ => Value::node(format!("n{}", rng.gen_range(0..5)), children),
        }
    };
    if value.is_compound() {
        pool.push(value.clone());
    }
    value
}

#[test]
fn random_values() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut pool = vec![];
    let mut writer = ValueWriter::new(vec![], WriterConfig::default()).unwrap();
    let values = (0..50)
        .map(|_| random_value(&mut rng, 5, &mut pool))
        .collect::<Vec<_>>();
    for value in &values {
        writer.write_value(value).unwrap();
    }
    let bytes = writer.close().unwrap();

    let mut reader = ValueReader::new(bytes.as_slice()).unwrap();
    let mut store = TypeStore::new();
    for value in &values {
        assert_eq!(
            &reader.read_value(&StandardValueFactory, &mut store).unwrap(),
            value
        );
    }
}
