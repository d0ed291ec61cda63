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

//! Immutable values with structural sharing, together with the nominal type system that
//! describes them. Compound values and composite types are reference counted so that a
//! single sub-tree may be shared between many parents.

pub use num_bigint as bigint;

mod error;
mod factory;
mod location;
mod store;
mod time;
mod types;
mod value;

pub use error::ModelError;
pub use factory::{StandardValueFactory, ValueFactory};
pub use location::{LineColumn, OffsetLength, SourceLocation, SourceUri};
pub use store::TypeStore;
pub use time::{DateFields, DateTimeValue, TimeFields};
pub use types::{
    AdtType, AliasType, ConstructorType, FunctionType, MapType, ParameterType, TupleType, Type,
};
pub use value::{Constructor, Node, Parameters, Rational, Real, Tuple, Value, ValueKind};
