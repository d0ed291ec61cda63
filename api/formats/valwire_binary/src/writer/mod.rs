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
use std::sync::Arc;

use integer_encoding::VarIntWriter;
use num_traits::ToPrimitive;
use tracing::{debug, trace};
use valwire_model::{LineColumn, OffsetLength, Parameters, SourceLocation, SourceUri, Type, Value};

use crate::compression::Sink;
use crate::config::{CompressionRate, WindowSizes, WriterConfig, NORMAL_SIZE, SMALL_SIZE};
use crate::ids;
use crate::iter::{PrePostTypeIterator, PrePostValueIterator, Visit};
use crate::window::WriteWindow;
use crate::wire::WireWriter;
use crate::{ValueIoError, MAGIC};

#[cfg(test)]
mod tests;

/// Count the compound nodes in a value, stopping once `stop_after` have been seen. Shared
/// sub-values are counted once per occurrence.
pub fn estimate_value_size(root: &Value, stop_after: usize) -> usize {
    PrePostValueIterator::new(root)
        .filter(|(_, visit)| *visit == Visit::Enter)
        .take(stop_after)
        .count()
}

/// Count the composite types in a type, stopping once `stop_after` have been seen.
pub fn estimate_type_size(root: &Type, stop_after: usize) -> usize {
    PrePostTypeIterator::new(root)
        .filter(|(_, visit)| *visit == Visit::Enter)
        .take(stop_after)
        .count()
}

struct Windows {
    sizes: WindowSizes,
    values: WriteWindow<usize, Value>,
    types: WriteWindow<usize, Type>,
    uris: WriteWindow<usize, Arc<SourceUri>>,
}

impl Windows {
    fn new(sizes: WindowSizes) -> Self {
        Windows {
            sizes,
            values: WriteWindow::new(sizes.values),
            types: WriteWindow::new(sizes.types),
            uris: WriteWindow::new(sizes.uris),
        }
    }
}

/// A stream for which the compression and strings window have been negotiated.
struct Session<W: Write> {
    wire: WireWriter<Sink<W>>,
    windows: Windows,
}

enum State<W: Write> {
    Fresh(W),
    Active(Session<W>),
    Failed,
}

/// Writes a sequence of values and types to a sink. Windows persist between roots so later
/// roots may refer back to structure written by earlier ones. This only holds while
/// consecutive roots use the same window capacities: when the size of a root selects a
/// different profile, the value, type and URI windows are emptied and rebuilt at the new
/// capacities on both sides of the stream. Fixing the capacities with
/// [`WriterConfig::with_windows`] keeps every root in the same windows.
///
/// If any write fails, the stream is left incomplete and all further operations fail with
/// [`ValueIoError::Poisoned`].
///
/// The sink is owned by the writer; pass `&mut W` to retain ownership of it. The writer must
/// be closed with [`ValueWriter::close`] to complete the stream.
pub struct ValueWriter<W: Write> {
    config: WriterConfig,
    state: State<W>,
}

impl<W: Write> ValueWriter<W> {
    /// Create a writer, immediately writing the magic bytes to the sink.
    pub fn new(mut sink: W, config: WriterConfig) -> Result<Self, ValueIoError> {
        sink.write_all(&MAGIC)?;
        Ok(ValueWriter {
            config,
            state: State::Fresh(sink),
        })
    }

    fn session(&mut self, estimate: usize) -> Result<&mut Session<W>, ValueIoError> {
        if matches!(self.state, State::Fresh(_)) {
            if let State::Fresh(sink) = std::mem::replace(&mut self.state, State::Failed) {
                self.state = State::Active(Session::open(sink, &self.config, estimate)?);
            }
        }
        match &mut self.state {
            State::Active(session) => Ok(session),
            _ => Err(ValueIoError::Poisoned),
        }
    }

    /// Write a single root, poisoning the writer if any part of it fails.
    fn write_root<F>(&mut self, estimate: usize, f: F) -> Result<(), ValueIoError>
    where
        F: FnOnce(&mut Session<W>) -> Result<(), ValueIoError>,
    {
        let sizes = self.config.window_sizes(estimate);
        let result = self.session(estimate).and_then(|session| {
            session.begin_root(sizes)?;
            f(session)
        });
        if result.is_err() {
            self.state = State::Failed;
        }
        result
    }

    /// Write a root value, followed by the end of value marker.
    pub fn write_value(&mut self, value: &Value) -> Result<(), ValueIoError> {
        let estimate = estimate_value_size(value, NORMAL_SIZE);
        self.write_root(estimate, |session| {
            session.value(value)?;
            Ok(session.wire.write_empty_message(ids::LAST_VALUE)?)
        })?;
        trace!(kind = %value.kind(), estimate, "Wrote value.");
        Ok(())
    }

    /// Write a root type, followed by the end of type marker.
    pub fn write_type(&mut self, t: &Type) -> Result<(), ValueIoError> {
        let estimate = estimate_type_size(t, NORMAL_SIZE);
        self.write_root(estimate, |session| {
            session.type_(t)?;
            Ok(session.wire.write_empty_message(ids::LAST_TYPE)?)
        })?;
        trace!(estimate, "Wrote type.");
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ValueIoError> {
        let result = match &mut self.state {
            State::Fresh(sink) => sink.flush(),
            State::Active(session) => session.wire.flush(),
            State::Failed => return Err(ValueIoError::Poisoned),
        };
        if result.is_err() {
            self.state = State::Failed;
        }
        Ok(result?)
    }

    /// Complete the stream (finishing any compression) and return the sink.
    pub fn close(self) -> Result<W, ValueIoError> {
        let mut sink = match self.state {
            State::Fresh(sink) => sink,
            State::Active(session) => session.wire.into_inner()?.finish()?,
            State::Failed => return Err(ValueIoError::Poisoned),
        };
        sink.flush()?;
        Ok(sink)
    }
}

impl<W: Write> Session<W> {
    fn open(mut sink: W, config: &WriterConfig, estimate: usize) -> Result<Self, ValueIoError> {
        let sizes = config.window_sizes(estimate);
        let rate = if estimate < SMALL_SIZE {
            CompressionRate::None
        } else {
            config.compression
        };
        let compression = rate.algorithm().or_fallback();
        sink.write_varint(sizes.strings as u64)?;
        sink.write_all(&[compression.header()])?;
        debug!(?compression, level = rate.level(), ?sizes, estimate, "Opened value stream.");
        let wire = WireWriter::new(Sink::open(compression, rate.level(), sink)?, sizes.strings);
        Ok(Session {
            wire,
            windows: Windows::new(sizes),
        })
    }

    fn begin_root(&mut self, sizes: WindowSizes) -> io::Result<()> {
        // The strings window is fixed for the lifetime of the stream.
        let sizes = WindowSizes {
            strings: self.windows.sizes.strings,
            ..sizes
        };
        if self.windows.sizes != sizes {
            debug!(?sizes, "Replacing back-reference windows.");
            self.windows = Windows::new(sizes);
        }
        let WindowSizes {
            values,
            types,
            uris,
            ..
        } = self.windows.sizes;
        let wire = &mut self.wire;
        wire.start_message(ids::HEADER)?;
        wire.write_int(ids::header::VALUE_WINDOW, values as i64)?;
        wire.write_int(ids::header::TYPE_WINDOW, types as i64)?;
        wire.write_int(ids::header::URI_WINDOW, uris as i64)?;
        wire.end_message()
    }

    fn value(&mut self, root: &Value) -> Result<(), ValueIoError> {
        let mut iter = PrePostValueIterator::new(root);
        while let Some((value, visit)) = iter.next() {
            match visit {
                Visit::Enter => {
                    let hit = value
                        .identity()
                        .and_then(|id| self.windows.values.how_long_ago(&id));
                    if let Some(distance) = hit {
                        let wire = &mut self.wire;
                        wire.start_message(ids::value::PREVIOUS)?;
                        wire.write_int(ids::previous::HOW_FAR_BACK, distance as i64)?;
                        wire.end_message()?;
                        iter.skip_subtree();
                    }
                }
                Visit::Exit => {
                    self.value_message(&value)?;
                    if let Some(id) = value.identity() {
                        self.windows.values.write(id, value);
                    }
                }
                Visit::Leaf => self.value_message(&value)?,
            }
        }
        Ok(())
    }

    fn type_(&mut self, root: &Type) -> Result<(), ValueIoError> {
        let mut iter = PrePostTypeIterator::new(root);
        while let Some((t, visit)) = iter.next() {
            match visit {
                Visit::Enter => {
                    let hit = t.identity().and_then(|id| self.windows.types.how_long_ago(&id));
                    if let Some(distance) = hit {
                        let wire = &mut self.wire;
                        wire.start_message(ids::types::PREVIOUS)?;
                        wire.write_int(ids::previous::HOW_FAR_BACK, distance as i64)?;
                        wire.end_message()?;
                        iter.skip_subtree();
                    }
                }
                Visit::Exit => {
                    self.type_message(&t)?;
                    if let Some(id) = t.identity() {
                        self.windows.types.write(id, t);
                    }
                }
                Visit::Leaf => self.type_message(&t)?,
            }
        }
        Ok(())
    }

    fn start_referenceable(&mut self, id: u32) -> io::Result<()> {
        self.wire.start_message(id)?;
        self.wire.write_int(ids::CAN_BE_BACK_REFERENCED, 1)
    }

    fn write_parameter_count(
        &mut self,
        parameters: &Parameters,
        keywords_field: u32,
        annotations_field: u32,
    ) -> io::Result<()> {
        match parameters {
            Parameters::None => Ok(()),
            Parameters::Keywords(params) => self.wire.write_int(keywords_field, params.len() as i64),
            Parameters::Annotations(params) => {
                self.wire.write_int(annotations_field, params.len() as i64)
            }
        }
    }

    fn write_collection(&mut self, id: u32, size: usize) -> io::Result<()> {
        self.start_referenceable(id)?;
        if size > 0 {
            self.wire.write_int(ids::collection::SIZE, size as i64)?;
        }
        self.wire.end_message()
    }

    fn write_names(&mut self, field: u32, names: Option<&[String]>) -> io::Result<()> {
        for name in names.into_iter().flatten() {
            self.wire.write_str(field, name)?;
        }
        Ok(())
    }

    /// The descriptor of a value. The children of a compound value must already have been
    /// written.
    fn value_message(&mut self, value: &Value) -> Result<(), ValueIoError> {
        match value {
            Value::Bool(true) => {
                self.wire.start_message(ids::value::BOOL)?;
                self.wire.write_int(ids::bool_value::VALUE, 1)?;
                self.wire.end_message()?;
            }
            Value::Bool(false) => self.wire.write_empty_message(ids::value::BOOL)?,
            Value::Integer(n) => {
                self.wire.start_message(ids::value::INTEGER)?;
                match n.to_i32() {
                    Some(small) => self.wire.write_int(ids::integer::INT, i64::from(small))?,
                    None => self
                        .wire
                        .write_bytes(ids::integer::BIG, &n.to_signed_bytes_be())?,
                }
                self.wire.end_message()?;
            }
            Value::Real(real) => {
                self.wire.start_message(ids::value::REAL)?;
                self.wire
                    .write_bytes(ids::real::CONTENT, &real.unscaled().to_signed_bytes_be())?;
                self.wire
                    .write_int(ids::real::SCALE, i64::from(real.scale()))?;
                self.wire.end_message()?;
            }
            Value::String(content) => {
                self.wire.start_message(ids::value::STRING)?;
                self.wire.write_str(ids::string::CONTENT, content)?;
                self.wire.end_message()?;
            }
            Value::DateTime(dt) => {
                use ids::date_time::*;
                let wire = &mut self.wire;
                wire.start_message(ids::value::DATE_TIME)?;
                if let Some(date) = dt.date_fields() {
                    wire.write_int(YEAR, i64::from(date.year))?;
                    wire.write_int(MONTH, i64::from(date.month))?;
                    wire.write_int(DAY, i64::from(date.day))?;
                }
                if let Some(time) = dt.time_fields() {
                    wire.write_int(HOUR, i64::from(time.hour))?;
                    wire.write_int(MINUTE, i64::from(time.minute))?;
                    wire.write_int(SECOND, i64::from(time.second))?;
                    wire.write_int(MILLISECOND, i64::from(time.millisecond))?;
                    wire.write_int(TZ_HOURS, i64::from(time.tz_hours))?;
                    wire.write_int(TZ_MINUTES, i64::from(time.tz_minutes))?;
                }
                wire.end_message()?;
            }
            Value::SourceLocation(loc) => self.location(loc)?,
            Value::Rational(_) => {
                self.start_referenceable(ids::value::RATIONAL)?;
                self.wire.end_message()?;
            }
            Value::List(elements) => self.write_collection(ids::value::LIST, elements.len())?,
            Value::Set(elements) => self.write_collection(ids::value::SET, elements.len())?,
            Value::Map(entries) => self.write_collection(ids::value::MAP, entries.len())?,
            Value::Tuple(tuple) => {
                self.start_referenceable(ids::value::TUPLE)?;
                self.wire
                    .write_int(ids::tuple::SIZE, tuple.elements().len() as i64)?;
                self.write_names(ids::tuple::NAMES, tuple.names())?;
                self.wire.end_message()?;
            }
            Value::Node(node) => {
                self.start_referenceable(ids::value::NODE)?;
                self.wire.write_str(ids::node::NAME, node.name())?;
                self.wire
                    .write_int(ids::node::ARITY, node.children().len() as i64)?;
                self.write_parameter_count(node.parameters(), ids::node::KWPARAMS, ids::node::ANNOS)?;
                self.wire.end_message()?;
            }
            Value::Constructor(cons) => {
                self.type_(cons.constructor_type())?;
                self.start_referenceable(ids::value::CONSTRUCTOR)?;
                let arity = cons.children().len();
                if arity > 0 {
                    self.wire.write_int(ids::constructor::ARITY, arity as i64)?;
                }
                self.write_parameter_count(
                    cons.parameters(),
                    ids::constructor::KWPARAMS,
                    ids::constructor::ANNOS,
                )?;
                self.wire.end_message()?;
            }
        }
        Ok(())
    }

    /// The URI of a location is shared through its own window. The range is always written
    /// in full.
    fn location(&mut self, loc: &SourceLocation) -> io::Result<()> {
        use ids::location::*;
        self.wire.start_message(ids::value::SOURCE_LOCATION)?;
        let uri = loc.top();
        let key = Arc::as_ptr(uri) as usize;
        match self.windows.uris.how_long_ago(&key) {
            Some(distance) => self.wire.write_int(PREVIOUS_URI, distance as i64)?,
            None => {
                self.wire.write_str(SCHEME, uri.scheme())?;
                if let Some(authority) = uri.authority() {
                    self.wire.write_str(AUTHORITY, authority)?;
                }
                if let Some(path) = uri.path() {
                    self.wire.write_str(PATH, path)?;
                }
                if let Some(query) = uri.query() {
                    self.wire.write_str(QUERY, query)?;
                }
                if let Some(fragment) = uri.fragment() {
                    self.wire.write_str(FRAGMENT, fragment)?;
                }
                self.windows.uris.write(key, uri.clone());
            }
        }
        if let Some(OffsetLength { offset, length }) = loc.offset_length() {
            self.wire.write_int(OFFSET, i64::from(offset))?;
            self.wire.write_int(LENGTH, i64::from(length))?;
        }
        if let Some(LineColumn {
            begin_line,
            end_line,
            begin_column,
            end_column,
        }) = loc.line_column()
        {
            self.wire.write_int(BEGIN_LINE, i64::from(begin_line))?;
            self.wire.write_int(END_LINE, i64::from(end_line))?;
            self.wire.write_int(BEGIN_COLUMN, i64::from(begin_column))?;
            self.wire.write_int(END_COLUMN, i64::from(end_column))?;
        }
        self.wire.end_message()
    }

    fn named_type(&mut self, id: u32, name: &str) -> io::Result<()> {
        self.start_referenceable(id)?;
        self.wire.write_str(ids::named_type::NAME, name)?;
        self.wire.end_message()
    }

    fn referenceable_type(&mut self, id: u32) -> io::Result<()> {
        self.start_referenceable(id)?;
        self.wire.end_message()
    }

    /// The descriptor of a type. The children of a composite type must already have been
    /// written.
    fn type_message(&mut self, t: &Type) -> Result<(), ValueIoError> {
        use ids::types;
        match t {
            Type::Bool => self.wire.write_empty_message(types::BOOL)?,
            Type::Integer => self.wire.write_empty_message(types::INTEGER)?,
            Type::Real => self.wire.write_empty_message(types::REAL)?,
            Type::Rational => self.wire.write_empty_message(types::RATIONAL)?,
            Type::String => self.wire.write_empty_message(types::STRING)?,
            Type::DateTime => self.wire.write_empty_message(types::DATE_TIME)?,
            Type::Node => self.wire.write_empty_message(types::NODE)?,
            Type::Number => self.wire.write_empty_message(types::NUMBER)?,
            Type::Value => self.wire.write_empty_message(types::VALUE)?,
            Type::Void => self.wire.write_empty_message(types::VOID)?,
            Type::SourceLocation => self.wire.write_empty_message(types::SOURCE_LOCATION)?,
            Type::Adt(adt) => self.named_type(types::ADT, adt.name())?,
            Type::Alias(alias) => self.named_type(types::ALIAS, alias.name())?,
            Type::Constructor(cons) => self.named_type(types::CONSTRUCTOR, cons.name())?,
            Type::Parameter(param) => self.named_type(types::PARAMETER, param.name())?,
            Type::Function(_) => self.referenceable_type(types::FUNCTION)?,
            Type::Reified(_) => self.referenceable_type(types::REIFIED)?,
            Type::List(_) => self.referenceable_type(types::LIST)?,
            Type::Set(_) => self.referenceable_type(types::SET)?,
            Type::Overloaded(alternatives) => {
                self.start_referenceable(types::OVERLOADED)?;
                self.wire
                    .write_int(ids::overloaded_type::SIZE, alternatives.len() as i64)?;
                self.wire.end_message()?;
            }
            Type::NonTerminal(symbol) => {
                self.value(symbol)?;
                self.referenceable_type(types::NON_TERMINAL)?;
            }
            Type::Map(map) => {
                self.start_referenceable(types::MAP)?;
                if let Some(label) = map.key_label() {
                    self.wire.write_str(ids::map_type::KEY_LABEL, label)?;
                }
                if let Some(label) = map.value_label() {
                    self.wire.write_str(ids::map_type::VALUE_LABEL, label)?;
                }
                self.wire.end_message()?;
            }
            Type::Tuple(tuple) => {
                self.start_referenceable(types::TUPLE)?;
                self.wire
                    .write_int(ids::tuple_type::ARITY, tuple.fields().len() as i64)?;
                self.write_names(ids::tuple_type::NAMES, tuple.names())?;
                self.wire.end_message()?;
            }
        }
        Ok(())
    }
}
