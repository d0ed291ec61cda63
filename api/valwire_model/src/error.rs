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

use thiserror::Error;

/// Errors that can occur when assembling a value or a type from its components.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A rational number was given a denominator of zero.
    #[error("A rational number cannot have a zero denominator.")]
    ZeroDenominator,
    /// The number of children did not match the arity of a constructor type.
    #[error("Expected {expected} children but {actual} were provided.")]
    ArityMismatch { expected: usize, actual: usize },
    /// The number of field names did not match the number of fields.
    #[error("Expected {expected} field names but {actual} were provided.")]
    NamesMismatch { expected: usize, actual: usize },
    /// A tuple type was required (for parameters or fields).
    #[error("Expected a tuple type but found: {0}")]
    NotATupleType(String),
    /// An algebraic data type was required.
    #[error("Expected an algebraic data type but found: {0}")]
    NotAnAdtType(String),
    /// A constructor value was tagged with a type that is not a constructor type.
    #[error("Expected a constructor type but found: {0}")]
    NotAConstructorType(String),
    /// The components of a date or time do not describe a valid instant.
    #[error("Invalid date or time components.")]
    InvalidDateTime,
    /// A timezone offset was outside of the range of a day.
    #[error("Timezone offset of {0} minutes is out of range.")]
    InvalidOffset(i32),
}
