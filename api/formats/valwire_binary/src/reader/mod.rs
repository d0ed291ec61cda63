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
use std::io::{BufReader, Read};
use std::sync::Arc;

use integer_encoding::VarIntReader;
use num_bigint::BigInt;
use smallvec::SmallVec;
use tracing::{debug, trace};
use valwire_model::{
    DateFields, DateTimeValue, Parameters, SourceLocation, SourceUri, TimeFields, Type,
    TypeStore, Value, ValueFactory,
};

use crate::compression::{Compression, Source};
use crate::ids;
use crate::window::ReadWindow;
use crate::wire::{FieldValue, WireEvent, WireReader};
use crate::{FormatError, ValueIoError, MAGIC};


/// The fields of a single message, in the order in which they were read.
#[derive(Debug, Default)]
struct Fields {
    message: u32,
    entries: SmallVec<[(u32, FieldValue); 8]>,
}

impl Fields {
    fn new(message: u32) -> Self {
        Fields {
            message,
            entries: SmallVec::new(),
        }
    }

    fn has(&self, field: u32) -> bool {
        self.entries.iter().any(|(id, _)| *id == field)
    }

    fn int(&self, field: u32) -> Option<i64> {
        self.entries.iter().find_map(|(id, value)| match value {
            FieldValue::Int(n) if *id == field => Some(*n),
            _ => None,
        })
    }

    fn str(&self, field: u32) -> Option<&str> {
        self.entries.iter().find_map(|(id, value)| match value {
            FieldValue::Str(s) if *id == field => Some(s.as_str()),
            _ => None,
        })
    }

    fn bytes(&self, field: u32) -> Option<&[u8]> {
        self.entries.iter().find_map(|(id, value)| match value {
            FieldValue::Bytes(b) if *id == field => Some(b.as_slice()),
            _ => None,
        })
    }

    /// Every occurrence of a repeated string field.
    fn strings(&self, field: u32) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|(id, value)| match value {
                FieldValue::Str(s) if *id == field => Some(s.clone()),
                _ => None,
            })
            .collect()
    }

    fn missing(&self, field: u32) -> FormatError {
        FormatError::MissingField {
            message: self.message,
            field,
        }
    }

    fn require_int(&self, field: u32) -> Result<i64, FormatError> {
        self.int(field).ok_or_else(|| self.missing(field))
    }

    fn require_str(&self, field: u32) -> Result<&str, FormatError> {
        self.str(field).ok_or_else(|| self.missing(field))
    }

    /// A non-negative count or distance, defaulting to 0.
    fn count(&self, field: u32) -> Result<usize, FormatError> {
        self.int(field).map_or(Ok(0), to_usize)
    }

    fn optional_count(&self, field: u32) -> Result<Option<usize>, FormatError> {
        self.int(field).map(to_usize).transpose()
    }

    fn small<T: TryFrom<i64>>(&self, field: u32) -> Result<Option<T>, FormatError> {
        self.int(field)
            .map(|n| T::try_from(n).map_err(|_| FormatError::OutOfRange))
            .transpose()
    }

    fn small_or_zero<T: TryFrom<i64> + Default>(&self, field: u32) -> Result<T, FormatError> {
        Ok(self.small(field)?.unwrap_or_default())
    }

    fn names(&self, field: u32) -> Option<Vec<String>> {
        let names = self.strings(field);
        if names.is_empty() {
            None
        } else {
            Some(names)
        }
    }
}

fn to_usize(n: i64) -> Result<usize, FormatError> {
    usize::try_from(n).map_err(|_| FormatError::OutOfRange)
}

/// The operands of the messages of a root. Values and types are built bottom up, each message
/// consuming the items that were built for its children.
#[derive(Debug, Default)]
struct Stacks {
    values: Vec<Value>,
    types: Vec<Type>,
}

impl Stacks {
    fn pop_values(&mut self, n: usize) -> Result<Vec<Value>, FormatError> {
        let len = self.values.len();
        if n > len {
            Err(FormatError::StackUnderflow)
        } else {
            Ok(self.values.split_off(len - n))
        }
    }

    fn pop_types(&mut self, n: usize) -> Result<Vec<Type>, FormatError> {
        let len = self.types.len();
        if n > len {
            Err(FormatError::StackUnderflow)
        } else {
            Ok(self.types.split_off(len - n))
        }
    }

    fn pop_type(&mut self) -> Result<Type, FormatError> {
        self.types.pop().ok_or(FormatError::StackUnderflow)
    }

    fn pop_value(&mut self) -> Result<Value, FormatError> {
        self.values.pop().ok_or(FormatError::StackUnderflow)
    }

    fn pop_integer(&mut self) -> Result<BigInt, FormatError> {
        match self.pop_value()? {
            Value::Integer(n) => Ok(n),
            _ => Err(FormatError::UnexpectedOperand("int")),
        }
    }

    /// Pop the positional children and the keyword parameters or annotations of a node or
    /// constructor.
    fn pop_children(
        &mut self,
        arity: usize,
        keywords: Option<usize>,
        annotations: Option<usize>,
    ) -> Result<(Vec<Value>, Parameters), FormatError> {
        let num_params = keywords
            .unwrap_or(0)
            .checked_add(annotations.unwrap_or(0))
            .ok_or(FormatError::OutOfRange)?;
        let total = num_params
            .checked_mul(2)
            .and_then(|n| n.checked_add(arity))
            .ok_or(FormatError::OutOfRange)?;
        let mut children = self.pop_values(total)?;
        let params = children.split_off(arity);
        let mut entries = BTreeMap::new();
        let mut it = params.into_iter();
        while let (Some(key), Some(value)) = (it.next(), it.next()) {
            match key {
                Value::String(key) => {
                    entries.insert(key.to_string(), value);
                }
                _ => return Err(FormatError::UnexpectedOperand("string")),
            }
        }
        let parameters = match (keywords, annotations) {
            (Some(_), _) => Parameters::Keywords(entries),
            (None, Some(_)) => Parameters::Annotations(entries),
            (None, None) => Parameters::None,
        };
        Ok((children, parameters))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeaderSizes {
    values: usize,
    types: usize,
    uris: usize,
}

struct Windows {
    sizes: HeaderSizes,
    values: ReadWindow<Value>,
    types: ReadWindow<Type>,
    uris: ReadWindow<Arc<SourceUri>>,
}

impl Windows {
    fn new(sizes: HeaderSizes) -> Self {
        Windows {
            sizes,
            values: ReadWindow::new(sizes.values),
            types: ReadWindow::new(sizes.types),
            uris: ReadWindow::new(sizes.uris),
        }
    }
}

/// A stream for which the compression and strings window are known.
struct Session<R: Read> {
    wire: WireReader<Source<R>>,
    windows: Option<Windows>,
}

enum State<R: Read> {
    Fresh(BufReader<R>),
    Active(Box<Session<R>>),
    Failed,
}

/// Reads the values and types written by a [`crate::ValueWriter`], in the order in which
/// they were written.
///
/// Any error leaves the reader unusable and subsequent reads will fail with
/// [`ValueIoError::Poisoned`].
pub struct ValueReader<R: Read> {
    state: State<R>,
}

impl<R: Read> ValueReader<R> {
    /// Create a reader, immediately consuming and checking the magic bytes.
    pub fn new(source: R) -> Result<Self, ValueIoError> {
        let mut source = BufReader::new(source);
        let mut magic = [0u8; MAGIC.len()];
        source.read_exact(&mut magic)?;
        if magic != MAGIC {
            return Err(FormatError::BadMagic.into());
        }
        Ok(ValueReader {
            state: State::Fresh(source),
        })
    }

    fn session(&mut self) -> Result<&mut Session<R>, ValueIoError> {
        if matches!(self.state, State::Fresh(_)) {
            if let State::Fresh(source) = std::mem::replace(&mut self.state, State::Failed) {
                self.state = State::Active(Box::new(Session::open(source)?));
            }
        }
        match &mut self.state {
            State::Active(session) => Ok(&mut **session),
            _ => Err(ValueIoError::Poisoned),
        }
    }

    fn read_root<F>(
        &mut self,
        factory: &F,
        store: &mut TypeStore,
        terminator: u32,
    ) -> Result<Stacks, ValueIoError>
    where
        F: ValueFactory + ?Sized,
    {
        let result = match self.session() {
            Ok(session) => session.read_root(factory, store, terminator),
            Err(err) => Err(err),
        };
        if result.is_err() {
            self.state = State::Failed;
        }
        result
    }

    /// Read the next root, which must be a value.
    pub fn read_value<F>(&mut self, factory: &F, store: &mut TypeStore) -> Result<Value, ValueIoError>
    where
        F: ValueFactory + ?Sized,
    {
        let mut stacks = self.read_root(factory, store, ids::LAST_VALUE)?;
        Ok(stacks.pop_value()?)
    }

    /// Read the next root, which must be a type.
    pub fn read_type<F>(&mut self, factory: &F, store: &mut TypeStore) -> Result<Type, ValueIoError>
    where
        F: ValueFactory + ?Sized,
    {
        let mut stacks = self.read_root(factory, store, ids::LAST_TYPE)?;
        Ok(stacks.pop_type()?)
    }
}

impl<R: Read> Session<R> {
    fn open(mut source: BufReader<R>) -> Result<Self, ValueIoError> {
        let strings: u64 = source.read_varint()?;
        let strings = usize::try_from(strings).map_err(|_| FormatError::OutOfRange)?;
        let mut header = [0u8; 1];
        source.read_exact(&mut header)?;
        let compression = Compression::from_header(header[0])?;
        debug!(?compression, strings, "Opened value stream.");
        Ok(Session {
            wire: WireReader::new(Source::open(compression, source)?, strings),
            windows: None,
        })
    }

    /// Collect the fields of the message that has just started. Unrecognized nested
    /// messages are skipped.
    fn read_fields(&mut self, message: u32) -> Result<Fields, ValueIoError> {
        let mut fields = Fields::new(message);
        loop {
            match self.wire.next_event()? {
                WireEvent::Field(id, value) => fields.entries.push((id, value)),
                WireEvent::MessageEnd => return Ok(fields),
                WireEvent::MessageStart(_) => self.wire.skip_message()?,
            }
        }
    }

    fn read_header(&mut self) -> Result<(), ValueIoError> {
        match self.wire.next_event()? {
            WireEvent::MessageStart(ids::HEADER) => {}
            _ => return Err(FormatError::MissingHeader.into()),
        }
        let fields = self.read_fields(ids::HEADER)?;
        let sizes = HeaderSizes {
            values: fields.count(ids::header::VALUE_WINDOW)?,
            types: fields.count(ids::header::TYPE_WINDOW)?,
            uris: fields.count(ids::header::URI_WINDOW)?,
        };
        match &mut self.windows {
            Some(windows) if windows.sizes == sizes => {}
            windows => {
                debug!(?sizes, "Replacing back-reference windows.");
                *windows = Some(Windows::new(sizes));
            }
        }
        Ok(())
    }

    fn read_root<F>(
        &mut self,
        factory: &F,
        store: &mut TypeStore,
        terminator: u32,
    ) -> Result<Stacks, ValueIoError>
    where
        F: ValueFactory + ?Sized,
    {
        self.read_header()?;
        let mut stacks = Stacks::default();
        loop {
            let id = match self.wire.next_event()? {
                WireEvent::MessageStart(id) => id,
                _ => return Err(FormatError::FieldOutsideMessage.into()),
            };
            let fields = self.read_fields(id)?;
            let windows = self
                .windows
                .as_mut()
                .ok_or(FormatError::MissingHeader)?;
            match id {
                ids::HEADER => return Err(FormatError::MisplacedHeader.into()),
                ids::LAST_VALUE | ids::LAST_TYPE => {
                    if id != terminator {
                        return Err(FormatError::UnexpectedTerminator.into());
                    }
                    let expected = if id == ids::LAST_VALUE { (1, 0) } else { (0, 1) };
                    let shape = (stacks.values.len(), stacks.types.len());
                    if shape != expected {
                        return Err(FormatError::BadStackShape {
                            values: shape.0,
                            types: shape.1,
                        }
                        .into());
                    }
                    trace!(terminator, "Read root.");
                    return Ok(stacks);
                }
                ids::value::PREVIOUS => {
                    let distance = to_usize(fields.require_int(ids::previous::HOW_FAR_BACK)?)?;
                    let value = windows.values.look_back(distance)?;
                    stacks.values.push(value);
                }
                ids::types::PREVIOUS => {
                    let distance = to_usize(fields.require_int(ids::previous::HOW_FAR_BACK)?)?;
                    let t = windows.types.look_back(distance)?;
                    stacks.types.push(t);
                }
                ids::VALUES_MIN..=ids::VALUES_MAX => {
                    let value = read_value_message(id, &fields, factory, &mut stacks, windows)?;
                    if fields.has(ids::CAN_BE_BACK_REFERENCED) {
                        windows.values.write(value.clone());
                    }
                    stacks.values.push(value);
                }
                ids::TYPES_MIN..=ids::TYPES_MAX => {
                    let t = read_type_message(id, &fields, store, &mut stacks)?;
                    if fields.has(ids::CAN_BE_BACK_REFERENCED) {
                        windows.types.write(t.clone());
                    }
                    stacks.types.push(t);
                }
                ow => return Err(ValueIoError::UnsupportedKind(format!("message {}", ow))),
            }
        }
    }
}

fn read_value_message<F>(
    id: u32,
    fields: &Fields,
    factory: &F,
    stacks: &mut Stacks,
    windows: &mut Windows,
) -> Result<Value, ValueIoError>
where
    F: ValueFactory + ?Sized,
{
    let value = match id {
        ids::value::BOOL => Value::Bool(fields.int(ids::bool_value::VALUE).unwrap_or(0) != 0),
        ids::value::INTEGER => match (
            fields.int(ids::integer::INT),
            fields.bytes(ids::integer::BIG),
        ) {
            (Some(n), _) => Value::Integer(BigInt::from(n)),
            (None, Some(bytes)) => Value::Integer(BigInt::from_signed_bytes_be(bytes)),
            _ => return Err(fields.missing(ids::integer::INT).into()),
        },
        ids::value::REAL => {
            let content = fields
                .bytes(ids::real::CONTENT)
                .ok_or_else(|| fields.missing(ids::real::CONTENT))?;
            let scale = fields.small_or_zero(ids::real::SCALE)?;
            Value::real(BigInt::from_signed_bytes_be(content), scale)
        }
        ids::value::STRING => Value::from(fields.require_str(ids::string::CONTENT)?),
        ids::value::DATE_TIME => Value::DateTime(read_date_time(fields)?),
        ids::value::SOURCE_LOCATION => {
            Value::SourceLocation(read_location(fields, &mut windows.uris)?)
        }
        ids::value::RATIONAL => {
            let denominator = stacks.pop_integer()?;
            let numerator = stacks.pop_integer()?;
            factory.rational(numerator, denominator)?
        }
        ids::value::LIST => {
            let size = fields.count(ids::collection::SIZE)?;
            factory.list(stacks.pop_values(size)?)?
        }
        ids::value::SET => {
            let size = fields.count(ids::collection::SIZE)?;
            factory.set(stacks.pop_values(size)?)?
        }
        ids::value::MAP => {
            let size = fields.count(ids::collection::SIZE)?;
            let flat = stacks.pop_values(size.checked_mul(2).ok_or(FormatError::OutOfRange)?)?;
            let mut entries = Vec::with_capacity(size);
            let mut it = flat.into_iter();
            while let (Some(key), Some(value)) = (it.next(), it.next()) {
                entries.push((key, value));
            }
            factory.map(entries)?
        }
        ids::value::TUPLE => {
            let size = fields.count(ids::tuple::SIZE)?;
            let elements = stacks.pop_values(size)?;
            factory.tuple(elements, fields.names(ids::tuple::NAMES))?
        }
        ids::value::NODE => {
            let name = fields.require_str(ids::node::NAME)?.to_string();
            let (children, parameters) = stacks.pop_children(
                fields.count(ids::node::ARITY)?,
                fields.optional_count(ids::node::KWPARAMS)?,
                fields.optional_count(ids::node::ANNOS)?,
            )?;
            factory.node(name, children, parameters)?
        }
        ids::value::CONSTRUCTOR => {
            let ctype = stacks.pop_type()?;
            let (children, parameters) = stacks.pop_children(
                fields.count(ids::constructor::ARITY)?,
                fields.optional_count(ids::constructor::KWPARAMS)?,
                fields.optional_count(ids::constructor::ANNOS)?,
            )?;
            factory.constructor(ctype, children, parameters)?
        }
        ow => return Err(ValueIoError::UnsupportedKind(format!("value message {}", ow))),
    };
    Ok(value)
}

fn read_date_time(fields: &Fields) -> Result<DateTimeValue, ValueIoError> {
    use ids::date_time::*;
    let date = match fields.small(YEAR)? {
        Some(year) => Some(DateFields {
            year,
            month: fields.small_or_zero(MONTH)?,
            day: fields.small_or_zero(DAY)?,
        }),
        None => None,
    };
    let time = match fields.small(HOUR)? {
        Some(hour) => Some(TimeFields {
            hour,
            minute: fields.small_or_zero(MINUTE)?,
            second: fields.small_or_zero(SECOND)?,
            millisecond: fields.small_or_zero(MILLISECOND)?,
            tz_hours: fields.small_or_zero(TZ_HOURS)?,
            tz_minutes: fields.small_or_zero(TZ_MINUTES)?,
        }),
        None => None,
    };
    Ok(DateTimeValue::from_fields(date, time)?)
}

fn read_location(
    fields: &Fields,
    uris: &mut ReadWindow<Arc<SourceUri>>,
) -> Result<SourceLocation, ValueIoError> {
    use ids::location::*;
    let uri = match fields.int(PREVIOUS_URI) {
        Some(distance) => uris.look_back(to_usize(distance)?)?,
        None => {
            let mut uri = SourceUri::new(fields.require_str(SCHEME)?);
            if let Some(authority) = fields.str(AUTHORITY) {
                uri = uri.with_authority(authority);
            }
            if let Some(path) = fields.str(PATH) {
                uri = uri.with_path(path);
            }
            if let Some(query) = fields.str(QUERY) {
                uri = uri.with_query(query);
            }
            if let Some(fragment) = fields.str(FRAGMENT) {
                uri = uri.with_fragment(fragment);
            }
            let uri = Arc::new(uri);
            uris.write(uri.clone());
            uri
        }
    };
    let mut location = SourceLocation::new(uri);
    if let Some(offset) = fields.small(OFFSET)? {
        location = location.with_offset(offset, fields.small_or_zero(LENGTH)?);
    }
    if let Some(begin_line) = fields.small(BEGIN_LINE)? {
        location = location.with_lines(
            begin_line,
            fields.small_or_zero(END_LINE)?,
            fields.small_or_zero(BEGIN_COLUMN)?,
            fields.small_or_zero(END_COLUMN)?,
        );
    }
    Ok(location)
}

fn read_type_message(
    id: u32,
    fields: &Fields,
    store: &mut TypeStore,
    stacks: &mut Stacks,
) -> Result<Type, ValueIoError> {
    use ids::types;
    let name = || fields.require_str(ids::named_type::NAME);
    let t = match id {
        types::BOOL => Type::Bool,
        types::DATE_TIME => Type::DateTime,
        types::INTEGER => Type::Integer,
        types::NODE => Type::Node,
        types::NUMBER => Type::Number,
        types::RATIONAL => Type::Rational,
        types::REAL => Type::Real,
        types::SOURCE_LOCATION => Type::SourceLocation,
        types::STRING => Type::String,
        types::VALUE => Type::Value,
        types::VOID => Type::Void,
        types::ADT => {
            let parameters = stacks.pop_type()?;
            store.adt(name()?, parameters)?
        }
        types::ALIAS => {
            let parameters = stacks.pop_type()?;
            let aliased = stacks.pop_type()?;
            store.alias(name()?, aliased, parameters)?
        }
        types::CONSTRUCTOR => {
            let fields_type = stacks.pop_type()?;
            let adt = stacks.pop_type()?;
            store.constructor(&adt, name()?, fields_type)?
        }
        types::PARAMETER => {
            let bound = stacks.pop_type()?;
            Type::parameter(name()?, bound)
        }
        types::FUNCTION => {
            let keyword_params = stacks.pop_type()?;
            let args = stacks.pop_type()?;
            let ret = stacks.pop_type()?;
            Type::function(ret, args, keyword_params)?
        }
        types::REIFIED => Type::reified(stacks.pop_type()?)?,
        types::LIST => Type::list(stacks.pop_type()?),
        types::SET => Type::set(stacks.pop_type()?),
        types::OVERLOADED => {
            let size = fields.count(ids::overloaded_type::SIZE)?;
            Type::overloaded(stacks.pop_types(size)?)
        }
        types::NON_TERMINAL => Type::non_terminal(stacks.pop_value()?),
        types::MAP => {
            let value = stacks.pop_type()?;
            let key = stacks.pop_type()?;
            Type::map_with_labels(
                key,
                value,
                fields.str(ids::map_type::KEY_LABEL).map(str::to_string),
                fields.str(ids::map_type::VALUE_LABEL).map(str::to_string),
            )
        }
        types::TUPLE => {
            let arity = fields.count(ids::tuple_type::ARITY)?;
            let elements = stacks.pop_types(arity)?;
            match fields.names(ids::tuple_type::NAMES) {
                Some(names) => Type::named_tuple(elements, names)?,
                None => Type::tuple(elements),
            }
        }
        ow => return Err(ValueIoError::UnsupportedKind(format!("type message {}", ow))),
    };
    Ok(t)
}
