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

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::value::Value;
use crate::ModelError;

/// A type from the nominal, parametric type system describing [`Value`]s. Composite types
/// are reference counted and may be shared in the same way as compound values.
///
/// Algebraic data types, aliases and constructor types are normally obtained from a
/// [`crate::TypeStore`] so that repeated declarations collapse to a single instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Type {
    Bool,
    Integer,
    Real,
    Rational,
    String,
    DateTime,
    Node,
    Number,
    Value,
    Void,
    SourceLocation,
    Adt(Arc<AdtType>),
    Alias(Arc<AliasType>),
    Constructor(Arc<ConstructorType>),
    List(Arc<Type>),
    Set(Arc<Type>),
    Map(Arc<MapType>),
    Tuple(Arc<TupleType>),
    Parameter(Arc<ParameterType>),
    Function(Arc<FunctionType>),
    /// The type of reified types; holds a tuple of type parameters.
    Reified(Arc<Type>),
    Overloaded(Arc<Vec<Type>>),
    /// A grammar non-terminal, described by a symbol value.
    NonTerminal(Arc<Value>),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AdtType {
    name: String,
    parameters: Type,
}

impl AdtType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &Type {
        &self.parameters
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AliasType {
    name: String,
    aliased: Type,
    parameters: Type,
}

impl AliasType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliased(&self) -> &Type {
        &self.aliased
    }

    pub fn parameters(&self) -> &Type {
        &self.parameters
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstructorType {
    name: String,
    adt: Type,
    fields: Type,
}

impl ConstructorType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adt(&self) -> &Type {
        &self.adt
    }

    /// The field types as a tuple type.
    pub fn fields(&self) -> &Type {
        &self.fields
    }

    pub fn arity(&self) -> usize {
        self.fields.arity()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapType {
    key: Type,
    value: Type,
    key_label: Option<String>,
    value_label: Option<String>,
}

impl MapType {
    pub fn key(&self) -> &Type {
        &self.key
    }

    pub fn value(&self) -> &Type {
        &self.value
    }

    pub fn key_label(&self) -> Option<&str> {
        self.key_label.as_deref()
    }

    pub fn value_label(&self) -> Option<&str> {
        self.value_label.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TupleType {
    fields: Vec<Type>,
    names: Option<Vec<String>>,
}

impl TupleType {
    pub fn fields(&self) -> &[Type] {
        &self.fields
    }

    pub fn names(&self) -> Option<&[String]> {
        self.names.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParameterType {
    name: String,
    bound: Type,
}

impl ParameterType {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bound(&self) -> &Type {
        &self.bound
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionType {
    ret: Type,
    args: Type,
    keyword_params: Type,
}

impl FunctionType {
    pub fn return_type(&self) -> &Type {
        &self.ret
    }

    pub fn arguments(&self) -> &Type {
        &self.args
    }

    pub fn keyword_parameters(&self) -> &Type {
        &self.keyword_params
    }
}

fn require_tuple(t: &Type) -> Result<(), ModelError> {
    if matches!(t, Type::Tuple(_)) {
        Ok(())
    } else {
        Err(ModelError::NotATupleType(t.to_string()))
    }
}

impl Type {
    pub fn tuple(fields: Vec<Type>) -> Type {
        Type::Tuple(Arc::new(TupleType {
            fields,
            names: None,
        }))
    }

    pub fn named_tuple(fields: Vec<Type>, names: Vec<String>) -> Result<Type, ModelError> {
        if fields.len() != names.len() {
            return Err(ModelError::NamesMismatch {
                expected: fields.len(),
                actual: names.len(),
            });
        }
        let names = if names.is_empty() { None } else { Some(names) };
        Ok(Type::Tuple(Arc::new(TupleType { fields, names })))
    }

    pub fn list(element: Type) -> Type {
        Type::List(Arc::new(element))
    }

    pub fn set(element: Type) -> Type {
        Type::Set(Arc::new(element))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map(Arc::new(MapType {
            key,
            value,
            key_label: None,
            value_label: None,
        }))
    }

    pub fn labelled_map<K, V>(key: Type, value: Type, key_label: K, value_label: V) -> Type
    where
        K: Into<String>,
        V: Into<String>,
    {
        Type::map_with_labels(key, value, Some(key_label.into()), Some(value_label.into()))
    }

    pub fn map_with_labels(
        key: Type,
        value: Type,
        key_label: Option<String>,
        value_label: Option<String>,
    ) -> Type {
        Type::Map(Arc::new(MapType {
            key,
            value,
            key_label,
            value_label,
        }))
    }

    pub fn parameter<S: Into<String>>(name: S, bound: Type) -> Type {
        Type::Parameter(Arc::new(ParameterType {
            name: name.into(),
            bound,
        }))
    }

    pub fn function(ret: Type, args: Type, keyword_params: Type) -> Result<Type, ModelError> {
        require_tuple(&args)?;
        require_tuple(&keyword_params)?;
        Ok(Type::Function(Arc::new(FunctionType {
            ret,
            args,
            keyword_params,
        })))
    }

    pub fn reified(parameters: Type) -> Result<Type, ModelError> {
        require_tuple(&parameters)?;
        Ok(Type::Reified(Arc::new(parameters)))
    }

    pub fn overloaded(alternatives: Vec<Type>) -> Type {
        Type::Overloaded(Arc::new(alternatives))
    }

    pub fn non_terminal(symbol: Value) -> Type {
        Type::NonTerminal(Arc::new(symbol))
    }

    /// An algebraic data type that has not been interned. Prefer [`crate::TypeStore::adt`].
    pub fn adt<S: Into<String>>(name: S, parameters: Type) -> Result<Type, ModelError> {
        require_tuple(&parameters)?;
        Ok(Type::Adt(Arc::new(AdtType {
            name: name.into(),
            parameters,
        })))
    }

    /// An alias that has not been interned. Prefer [`crate::TypeStore::alias`].
    pub fn alias<S: Into<String>>(
        name: S,
        aliased: Type,
        parameters: Type,
    ) -> Result<Type, ModelError> {
        require_tuple(&parameters)?;
        Ok(Type::Alias(Arc::new(AliasType {
            name: name.into(),
            aliased,
            parameters,
        })))
    }

    /// A constructor type that has not been interned. Prefer
    /// [`crate::TypeStore::constructor`].
    pub fn constructor<S: Into<String>>(
        adt: Type,
        name: S,
        fields: Type,
    ) -> Result<Type, ModelError> {
        if !matches!(adt, Type::Adt(_)) {
            return Err(ModelError::NotAnAdtType(adt.to_string()));
        }
        require_tuple(&fields)?;
        Ok(Type::Constructor(Arc::new(ConstructorType {
            name: name.into(),
            adt,
            fields,
        })))
    }

    /// The number of fields of a tuple type (zero for any other type).
    pub fn arity(&self) -> usize {
        match self {
            Type::Tuple(tuple) => tuple.fields.len(),
            _ => 0,
        }
    }

    /// Atomic types have no children and are never shared by reference.
    pub fn is_atomic(&self) -> bool {
        self.identity().is_none()
    }

    /// The address of the shared allocation behind a composite type.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Type::Adt(t) => Some(Arc::as_ptr(t) as *const () as usize),
            Type::Alias(t) => Some(Arc::as_ptr(t) as *const () as usize),
            Type::Constructor(t) => Some(Arc::as_ptr(t) as *const () as usize),
            Type::List(t) | Type::Set(t) | Type::Reified(t) => {
                Some(Arc::as_ptr(t) as *const () as usize)
            }
            Type::Map(t) => Some(Arc::as_ptr(t) as *const () as usize),
            Type::Tuple(t) => Some(Arc::as_ptr(t) as *const () as usize),
            Type::Parameter(t) => Some(Arc::as_ptr(t) as *const () as usize),
            Type::Function(t) => Some(Arc::as_ptr(t) as *const () as usize),
            Type::Overloaded(t) => Some(Arc::as_ptr(t) as *const () as usize),
            Type::NonTerminal(t) => Some(Arc::as_ptr(t) as *const () as usize),
            _ => None,
        }
    }
}

fn write_list<T: Display>(f: &mut Formatter<'_>, items: &[T]) -> std::fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

fn write_params(f: &mut Formatter<'_>, parameters: &Type) -> std::fmt::Result {
    if let Type::Tuple(params) = parameters {
        if !params.fields.is_empty() {
            f.write_str("[")?;
            write_list(f, &params.fields)?;
            f.write_str("]")?;
        }
    }
    Ok(())
}

impl Display for Type {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Bool => f.write_str("bool"),
            Type::Integer => f.write_str("int"),
            Type::Real => f.write_str("real"),
            Type::Rational => f.write_str("rat"),
            Type::String => f.write_str("str"),
            Type::DateTime => f.write_str("datetime"),
            Type::Node => f.write_str("node"),
            Type::Number => f.write_str("num"),
            Type::Value => f.write_str("value"),
            Type::Void => f.write_str("void"),
            Type::SourceLocation => f.write_str("loc"),
            Type::Adt(adt) => {
                f.write_str(&adt.name)?;
                write_params(f, &adt.parameters)
            }
            Type::Alias(alias) => {
                f.write_str(&alias.name)?;
                write_params(f, &alias.parameters)
            }
            Type::Constructor(cons) => {
                write!(f, "{}::{}", cons.adt, cons.name)?;
                if let Type::Tuple(fields) = &cons.fields {
                    f.write_str("(")?;
                    write_list(f, &fields.fields)?;
                    f.write_str(")")?;
                }
                Ok(())
            }
            Type::List(elem) => write!(f, "list[{}]", elem),
            Type::Set(elem) => write!(f, "set[{}]", elem),
            Type::Map(map) => write!(f, "map[{}, {}]", map.key, map.value),
            Type::Tuple(tuple) => {
                f.write_str("tuple[")?;
                write_list(f, &tuple.fields)?;
                f.write_str("]")
            }
            Type::Parameter(param) => write!(f, "&{} <: {}", param.name, param.bound),
            Type::Function(fun) => write!(f, "{} ({})", fun.ret, fun.args),
            Type::Reified(params) => {
                f.write_str("type")?;
                write_params(f, params)
            }
            Type::Overloaded(alts) => {
                f.write_str("overloaded[")?;
                write_list(f, alts.as_slice())?;
                f.write_str("]")
            }
            Type::NonTerminal(symbol) => write!(f, "non-terminal({:?})", symbol),
        }
    }
}
