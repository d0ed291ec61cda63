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

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use num::Integer;
use num_bigint::BigInt;
use num_traits::{Signed, Zero};

use crate::location::SourceLocation;
use crate::time::DateTimeValue;
use crate::types::Type;
use crate::ModelError;

/// An immutable value. Compound values hold their children behind an [`Arc`] so that
/// cloning a value is cheap and sub-trees may be shared between parents. Equality,
/// ordering and hashing are all structural.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    Bool(bool),
    Integer(BigInt),
    Real(Real),
    Rational(Arc<Rational>),
    String(Arc<str>),
    DateTime(DateTimeValue),
    SourceLocation(SourceLocation),
    List(Arc<Vec<Value>>),
    Set(Arc<BTreeSet<Value>>),
    Map(Arc<BTreeMap<Value, Value>>),
    Tuple(Arc<Tuple>),
    Node(Arc<Node>),
    Constructor(Arc<Constructor>),
}

/// The kinds of [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Bool,
    Integer,
    Real,
    Rational,
    String,
    DateTime,
    SourceLocation,
    List,
    Set,
    Map,
    Tuple,
    Node,
    Constructor,
}

impl Display for ValueKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Bool => "bool",
            ValueKind::Integer => "int",
            ValueKind::Real => "real",
            ValueKind::Rational => "rat",
            ValueKind::String => "str",
            ValueKind::DateTime => "datetime",
            ValueKind::SourceLocation => "loc",
            ValueKind::List => "list",
            ValueKind::Set => "set",
            ValueKind::Map => "map",
            ValueKind::Tuple => "tuple",
            ValueKind::Node => "node",
            ValueKind::Constructor => "constructor",
        };
        f.write_str(name)
    }
}

/// An arbitrary precision decimal: `unscaled * 10^-scale`. The scale is significant so
/// `1.0` and `1.00` are distinct values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Real {
    unscaled: BigInt,
    scale: i32,
}

impl Real {
    pub fn new(unscaled: BigInt, scale: i32) -> Self {
        Real { unscaled, scale }
    }

    pub fn unscaled(&self) -> &BigInt {
        &self.unscaled
    }

    pub fn scale(&self) -> i32 {
        self.scale
    }
}

/// A rational number, always held in lowest terms with a positive denominator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rational {
    numerator: BigInt,
    denominator: BigInt,
}

impl Rational {
    pub fn new(numerator: BigInt, denominator: BigInt) -> Result<Self, ModelError> {
        if denominator.is_zero() {
            return Err(ModelError::ZeroDenominator);
        }
        let divisor = numerator.gcd(&denominator);
        let (mut numerator, mut denominator) = (numerator / &divisor, denominator / &divisor);
        if denominator.is_negative() {
            numerator = -numerator;
            denominator = -denominator;
        }
        Ok(Rational {
            numerator,
            denominator,
        })
    }

    pub fn numerator(&self) -> &BigInt {
        &self.numerator
    }

    pub fn denominator(&self) -> &BigInt {
        &self.denominator
    }
}

/// A fixed length sequence of values with optional field names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tuple {
    elements: Vec<Value>,
    names: Option<Vec<String>>,
}

impl Tuple {
    pub fn elements(&self) -> &[Value] {
        &self.elements
    }

    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }
}

/// Optional named parameters attached to a node or constructor. A node carries either
/// keyword parameters or annotations, never both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Parameters {
    #[default]
    None,
    Keywords(BTreeMap<String, Value>),
    Annotations(BTreeMap<String, Value>),
}

impl Parameters {
    pub fn len(&self) -> usize {
        match self {
            Parameters::None => 0,
            Parameters::Keywords(params) | Parameters::Annotations(params) => params.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        let params = match self {
            Parameters::None => None,
            Parameters::Keywords(params) | Parameters::Annotations(params) => Some(params),
        };
        params.into_iter().flat_map(|p| p.iter())
    }
}

/// An untyped, named tree node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node {
    name: String,
    children: Vec<Value>,
    parameters: Parameters,
}

impl Node {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn children(&self) -> &[Value] {
        &self.children
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

/// A tree node tagged with a constructor type drawn from an algebraic data type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Constructor {
    ctype: Type,
    children: Vec<Value>,
    parameters: Parameters,
}

impl Constructor {
    pub fn constructor_type(&self) -> &Type {
        &self.ctype
    }

    pub fn name(&self) -> &str {
        match &self.ctype {
            Type::Constructor(cons) => cons.name(),
            _ => "",
        }
    }

    pub fn children(&self) -> &[Value] {
        &self.children
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }
}

impl Value {
    pub fn real(unscaled: impl Into<BigInt>, scale: i32) -> Value {
        Value::Real(Real::new(unscaled.into(), scale))
    }

    pub fn rational(
        numerator: impl Into<BigInt>,
        denominator: impl Into<BigInt>,
    ) -> Result<Value, ModelError> {
        Ok(Value::Rational(Arc::new(Rational::new(
            numerator.into(),
            denominator.into(),
        )?)))
    }

    pub fn list<I: IntoIterator<Item = Value>>(elements: I) -> Value {
        Value::List(Arc::new(elements.into_iter().collect()))
    }

    pub fn set<I: IntoIterator<Item = Value>>(elements: I) -> Value {
        Value::Set(Arc::new(elements.into_iter().collect()))
    }

    pub fn map<I: IntoIterator<Item = (Value, Value)>>(entries: I) -> Value {
        Value::Map(Arc::new(entries.into_iter().collect()))
    }

    pub fn tuple<I: IntoIterator<Item = Value>>(elements: I) -> Value {
        Value::Tuple(Arc::new(Tuple {
            elements: elements.into_iter().collect(),
            names: None,
        }))
    }

    /// A tuple with field names. An empty tuple has no names.
    pub fn named_tuple(elements: Vec<Value>, names: Vec<String>) -> Result<Value, ModelError> {
        if elements.len() != names.len() {
            return Err(ModelError::NamesMismatch {
                expected: elements.len(),
                actual: names.len(),
            });
        }
        let names = if names.is_empty() { None } else { Some(names) };
        Ok(Value::Tuple(Arc::new(Tuple { elements, names })))
    }

    pub fn node<S: Into<String>>(name: S, children: Vec<Value>) -> Value {
        Value::node_with(name, children, Parameters::None)
    }

    pub fn node_with<S: Into<String>>(
        name: S,
        children: Vec<Value>,
        parameters: Parameters,
    ) -> Value {
        Value::Node(Arc::new(Node {
            name: name.into(),
            children,
            parameters,
        }))
    }

    /// Create a constructor value. The type must be a constructor type with a field for
    /// each child.
    pub fn constructor(
        ctype: Type,
        children: Vec<Value>,
        parameters: Parameters,
    ) -> Result<Value, ModelError> {
        let arity = match &ctype {
            Type::Constructor(cons) => cons.arity(),
            ow => return Err(ModelError::NotAConstructorType(ow.to_string())),
        };
        if arity != children.len() {
            return Err(ModelError::ArityMismatch {
                expected: arity,
                actual: children.len(),
            });
        }
        Ok(Value::Constructor(Arc::new(Constructor {
            ctype,
            children,
            parameters,
        })))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Bool(_) => ValueKind::Bool,
            Value::Integer(_) => ValueKind::Integer,
            Value::Real(_) => ValueKind::Real,
            Value::Rational(_) => ValueKind::Rational,
            Value::String(_) => ValueKind::String,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::SourceLocation(_) => ValueKind::SourceLocation,
            Value::List(_) => ValueKind::List,
            Value::Set(_) => ValueKind::Set,
            Value::Map(_) => ValueKind::Map,
            Value::Tuple(_) => ValueKind::Tuple,
            Value::Node(_) => ValueKind::Node,
            Value::Constructor(_) => ValueKind::Constructor,
        }
    }

    /// Whether this value has children (and so is visited on entry and on exit by a
    /// pre/post traversal).
    pub fn is_compound(&self) -> bool {
        self.identity().is_some()
    }

    /// The address of the shared allocation behind a compound value. Two values with the
    /// same identity are the same instance, not just equal.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Rational(r) => Some(Arc::as_ptr(r) as *const () as usize),
            Value::List(l) => Some(Arc::as_ptr(l) as *const () as usize),
            Value::Set(s) => Some(Arc::as_ptr(s) as *const () as usize),
            Value::Map(m) => Some(Arc::as_ptr(m) as *const () as usize),
            Value::Tuple(t) => Some(Arc::as_ptr(t) as *const () as usize),
            Value::Node(n) => Some(Arc::as_ptr(n) as *const () as usize),
            Value::Constructor(c) => Some(Arc::as_ptr(c) as *const () as usize),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<&BigInt> {
        match self {
            Value::Integer(n) => Some(n),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Integer(BigInt::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(BigInt::from(n))
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Arc::from(s))
    }
}

impl From<DateTimeValue> for Value {
    fn from(dt: DateTimeValue) -> Self {
        Value::DateTime(dt)
    }
}

impl From<SourceLocation> for Value {
    fn from(loc: SourceLocation) -> Self {
        Value::SourceLocation(loc)
    }
}
