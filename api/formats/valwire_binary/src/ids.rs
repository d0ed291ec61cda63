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

//! Message and field identifiers. Field identifiers are scoped to their message, apart from
//! [`CAN_BE_BACK_REFERENCED`] which may occur in any message.

/// Marks an item that the reader must register in the corresponding window.
pub const CAN_BE_BACK_REFERENCED: u32 = 31;

pub const HEADER: u32 = 1;
pub const LAST_VALUE: u32 = 2;
pub const LAST_TYPE: u32 = 3;

pub mod header {
    pub const VALUE_WINDOW: u32 = 1;
    pub const TYPE_WINDOW: u32 = 2;
    pub const URI_WINDOW: u32 = 3;
}

pub const VALUES_MIN: u32 = 10;
pub const VALUES_MAX: u32 = 23;

pub mod value {
    pub const BOOL: u32 = 10;
    pub const CONSTRUCTOR: u32 = 11;
    pub const DATE_TIME: u32 = 12;
    pub const INTEGER: u32 = 13;
    pub const LIST: u32 = 14;
    pub const SOURCE_LOCATION: u32 = 15;
    pub const MAP: u32 = 16;
    pub const NODE: u32 = 17;
    pub const RATIONAL: u32 = 18;
    pub const REAL: u32 = 19;
    pub const SET: u32 = 20;
    pub const STRING: u32 = 21;
    pub const TUPLE: u32 = 22;
    pub const PREVIOUS: u32 = 23;
}

pub const TYPES_MIN: u32 = 30;
pub const TYPES_MAX: u32 = 53;

pub mod types {
    pub const BOOL: u32 = 30;
    pub const DATE_TIME: u32 = 31;
    pub const INTEGER: u32 = 32;
    pub const NODE: u32 = 33;
    pub const NUMBER: u32 = 34;
    pub const RATIONAL: u32 = 35;
    pub const REAL: u32 = 36;
    pub const SOURCE_LOCATION: u32 = 37;
    pub const STRING: u32 = 38;
    pub const VALUE: u32 = 39;
    pub const VOID: u32 = 40;
    pub const ADT: u32 = 41;
    pub const ALIAS: u32 = 42;
    pub const CONSTRUCTOR: u32 = 43;
    pub const FUNCTION: u32 = 44;
    pub const REIFIED: u32 = 45;
    pub const OVERLOADED: u32 = 46;
    pub const NON_TERMINAL: u32 = 47;
    pub const LIST: u32 = 48;
    pub const MAP: u32 = 49;
    pub const PARAMETER: u32 = 50;
    pub const SET: u32 = 51;
    pub const TUPLE: u32 = 52;
    pub const PREVIOUS: u32 = 53;
}

/// Previous value and previous type messages.
pub mod previous {
    pub const HOW_FAR_BACK: u32 = 1;
}

pub mod bool_value {
    pub const VALUE: u32 = 1;
}

pub mod integer {
    pub const INT: u32 = 1;
    pub const BIG: u32 = 2;
}

pub mod real {
    pub const CONTENT: u32 = 1;
    pub const SCALE: u32 = 2;
}

pub mod string {
    pub const CONTENT: u32 = 1;
}

pub mod date_time {
    pub const YEAR: u32 = 1;
    pub const MONTH: u32 = 2;
    pub const DAY: u32 = 3;
    pub const HOUR: u32 = 4;
    pub const MINUTE: u32 = 5;
    pub const SECOND: u32 = 6;
    pub const MILLISECOND: u32 = 7;
    pub const TZ_HOURS: u32 = 8;
    pub const TZ_MINUTES: u32 = 9;
}

pub mod location {
    pub const SCHEME: u32 = 1;
    pub const AUTHORITY: u32 = 2;
    pub const PATH: u32 = 3;
    pub const QUERY: u32 = 4;
    pub const FRAGMENT: u32 = 5;
    pub const PREVIOUS_URI: u32 = 6;
    pub const OFFSET: u32 = 7;
    pub const LENGTH: u32 = 8;
    pub const BEGIN_LINE: u32 = 9;
    pub const END_LINE: u32 = 10;
    pub const BEGIN_COLUMN: u32 = 11;
    pub const END_COLUMN: u32 = 12;
}

/// List, set and map values.
pub mod collection {
    pub const SIZE: u32 = 1;
}

pub mod tuple {
    pub const SIZE: u32 = 1;
    pub const NAMES: u32 = 2;
}

pub mod node {
    pub const NAME: u32 = 1;
    pub const ARITY: u32 = 2;
    pub const KWPARAMS: u32 = 3;
    pub const ANNOS: u32 = 4;
}

pub mod constructor {
    pub const ARITY: u32 = 1;
    pub const KWPARAMS: u32 = 2;
    pub const ANNOS: u32 = 3;
}

/// ADT, alias, constructor and parameter types.
pub mod named_type {
    pub const NAME: u32 = 1;
}

pub mod overloaded_type {
    pub const SIZE: u32 = 1;
}

pub mod map_type {
    pub const KEY_LABEL: u32 = 1;
    pub const VALUE_LABEL: u32 = 2;
}

pub mod tuple_type {
    pub const ARITY: u32 = 1;
    pub const NAMES: u32 = 2;
}
