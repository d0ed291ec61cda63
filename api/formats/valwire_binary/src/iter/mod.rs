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

use std::sync::Arc;

use valwire_model::{Parameters, Type, Value};

#[cfg(test)]
mod tests;

/// How a traversal is visiting an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// A compound item, before any of its children.
    Enter,
    /// A compound item, after all of its children.
    Exit,
    /// An item with no children. These are visited only once.
    Leaf,
}

/// Depth first traversal of a value that visits compound values both before and after
/// their children. This uses an explicit stack so arbitrarily deep values can be
/// traversed.
///
/// After an [`Visit::Enter`], calling [`PrePostValueIterator::skip_subtree`] will suppress
/// the children and the [`Visit::Exit`] of that value.
#[derive(Debug)]
pub struct PrePostValueIterator {
    stack: Vec<(Value, bool)>,
    entered: Option<Value>,
}

impl PrePostValueIterator {
    pub fn new(root: &Value) -> Self {
        PrePostValueIterator {
            stack: vec![(root.clone(), true)],
            entered: None,
        }
    }

    pub fn skip_subtree(&mut self) {
        self.entered = None;
    }
}

fn push_parameters(stack: &mut Vec<(Value, bool)>, parameters: &Parameters) {
    let entries = parameters.entries().collect::<Vec<_>>();
    for (key, value) in entries.into_iter().rev() {
        stack.push((value.clone(), true));
        stack.push((Value::String(Arc::from(key.as_str())), true));
    }
}

fn push_value_children(stack: &mut Vec<(Value, bool)>, value: &Value) {
    match value {
        Value::Rational(rational) => {
            stack.push((Value::Integer(rational.denominator().clone()), true));
            stack.push((Value::Integer(rational.numerator().clone()), true));
        }
        Value::List(elements) => {
            stack.extend(elements.iter().rev().map(|v| (v.clone(), true)));
        }
        Value::Set(elements) => {
            stack.extend(elements.iter().rev().map(|v| (v.clone(), true)));
        }
        Value::Map(entries) => {
            for (key, value) in entries.iter().rev() {
                stack.push((value.clone(), true));
                stack.push((key.clone(), true));
            }
        }
        Value::Tuple(tuple) => {
            stack.extend(tuple.elements().iter().rev().map(|v| (v.clone(), true)));
        }
        Value::Node(node) => {
            push_parameters(stack, node.parameters());
            stack.extend(node.children().iter().rev().map(|v| (v.clone(), true)));
        }
        Value::Constructor(cons) => {
            push_parameters(stack, cons.parameters());
            stack.extend(cons.children().iter().rev().map(|v| (v.clone(), true)));
        }
        _ => {}
    }
}

impl Iterator for PrePostValueIterator {
    type Item = (Value, Visit);

    fn next(&mut self) -> Option<Self::Item> {
        let PrePostValueIterator { stack, entered } = self;
        if let Some(value) = entered.take() {
            stack.push((value.clone(), false));
            push_value_children(stack, &value);
        }
        let (value, beginning) = stack.pop()?;
        if !value.is_compound() {
            Some((value, Visit::Leaf))
        } else if beginning {
            *entered = Some(value.clone());
            Some((value, Visit::Enter))
        } else {
            Some((value, Visit::Exit))
        }
    }
}

/// The type counterpart of [`PrePostValueIterator`]. Atomic types are leaves.
#[derive(Debug)]
pub struct PrePostTypeIterator {
    stack: Vec<(Type, bool)>,
    entered: Option<Type>,
}

impl PrePostTypeIterator {
    pub fn new(root: &Type) -> Self {
        PrePostTypeIterator {
            stack: vec![(root.clone(), true)],
            entered: None,
        }
    }

    pub fn skip_subtree(&mut self) {
        self.entered = None;
    }
}

/// The children of a type, in the order in which they are written.
pub fn type_children(t: &Type) -> Vec<Type> {
    match t {
        Type::Adt(adt) => vec![adt.parameters().clone()],
        Type::Alias(alias) => vec![alias.aliased().clone(), alias.parameters().clone()],
        Type::Constructor(cons) => vec![cons.adt().clone(), cons.fields().clone()],
        Type::List(elem) | Type::Set(elem) => vec![elem.as_ref().clone()],
        Type::Map(map) => vec![map.key().clone(), map.value().clone()],
        Type::Tuple(tuple) => tuple.fields().to_vec(),
        Type::Parameter(param) => vec![param.bound().clone()],
        Type::Function(fun) => vec![
            fun.return_type().clone(),
            fun.arguments().clone(),
            fun.keyword_parameters().clone(),
        ],
        Type::Reified(params) => vec![params.as_ref().clone()],
        Type::Overloaded(alternatives) => alternatives.as_ref().clone(),
        _ => vec![],
    }
}

impl Iterator for PrePostTypeIterator {
    type Item = (Type, Visit);

    fn next(&mut self) -> Option<Self::Item> {
        let PrePostTypeIterator { stack, entered } = self;
        if let Some(t) = entered.take() {
            let children = type_children(&t);
            stack.push((t, false));
            stack.extend(children.into_iter().rev().map(|child| (child, true)));
        }
        let (t, beginning) = stack.pop()?;
        if t.is_atomic() {
            Some((t, Visit::Leaf))
        } else if beginning {
            *entered = Some(t.clone());
            Some((t, Visit::Enter))
        } else {
            Some((t, Visit::Exit))
        }
    }
}
