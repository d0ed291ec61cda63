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

use num_bigint::BigInt;

use crate::types::Type;
use crate::value::{Parameters, Value};
use crate::ModelError;

/// Builds compound values from children that have already been constructed. Decoders
/// call into a factory rather than building values directly so that an embedding can
/// substitute its own collection implementations or validation.
pub trait ValueFactory {
    fn list(&self, elements: Vec<Value>) -> Result<Value, ModelError> {
        Ok(Value::list(elements))
    }

    fn set(&self, elements: Vec<Value>) -> Result<Value, ModelError> {
        Ok(Value::set(elements))
    }

    /// Later entries replace earlier ones with the same key.
    fn map(&self, entries: Vec<(Value, Value)>) -> Result<Value, ModelError> {
        Ok(Value::map(entries))
    }

    fn tuple(&self, elements: Vec<Value>, names: Option<Vec<String>>) -> Result<Value, ModelError> {
        match names {
            Some(names) => Value::named_tuple(elements, names),
            None => Ok(Value::tuple(elements)),
        }
    }

    fn node(
        &self,
        name: String,
        children: Vec<Value>,
        parameters: Parameters,
    ) -> Result<Value, ModelError> {
        Ok(Value::node_with(name, children, parameters))
    }

    fn constructor(
        &self,
        ctype: Type,
        children: Vec<Value>,
        parameters: Parameters,
    ) -> Result<Value, ModelError> {
        Value::constructor(ctype, children, parameters)
    }

    fn rational(&self, numerator: BigInt, denominator: BigInt) -> Result<Value, ModelError> {
        Value::rational(numerator, denominator)
    }
}

/// The default factory, backed by the standard library collections used by [`Value`].
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardValueFactory;

impl ValueFactory for StandardValueFactory {}
