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

use valwire_model::{Parameters, Type, Value};

use crate::iter::{PrePostTypeIterator, PrePostValueIterator, Visit};

#[test]
fn leaf_root() {
    let events = PrePostValueIterator::new(&Value::from(1)).collect::<Vec<_>>();
    assert_eq!(events, vec![(Value::from(1), Visit::Leaf)]);
}

#[test]
fn list_order() {
    let inner = Value::list(vec![Value::from(2)]);
    let root = Value::list(vec![Value::from(1), inner.clone(), Value::from(3)]);
    let events = PrePostValueIterator::new(&root).collect::<Vec<_>>();
    assert_eq!(
        events,
        vec![
            (root.clone(), Visit::Enter),
            (Value::from(1), Visit::Leaf),
            (inner.clone(), Visit::Enter),
            (Value::from(2), Visit::Leaf),
            (inner, Visit::Exit),
            (Value::from(3), Visit::Leaf),
            (root, Visit::Exit),
        ]
    );
}

#[test]
fn node_children_then_parameters() {
    let mut kw = BTreeMap::new();
    kw.insert("k".to_string(), Value::from(true));
    let node = Value::node_with("f", vec![Value::from(1), Value::from(2)], Parameters::Keywords(kw));
    let events = PrePostValueIterator::new(&node)
        .map(|(v, _)| v)
        .collect::<Vec<_>>();
    assert_eq!(
        events,
        vec![
            node.clone(),
            Value::from(1),
            Value::from(2),
            Value::from("k"),
            Value::from(true),
            node,
        ]
    );
}

#[test]
fn map_and_rational_order() {
    let map = Value::map(vec![
        (Value::from("b"), Value::from(2)),
        (Value::from("a"), Value::from(1)),
    ]);
    let leaves = PrePostValueIterator::new(&map)
        .filter(|(_, visit)| *visit == Visit::Leaf)
        .map(|(v, _)| v)
        .collect::<Vec<_>>();
    assert_eq!(
        leaves,
        vec![
            Value::from("a"),
            Value::from(1),
            Value::from("b"),
            Value::from(2)
        ]
    );

    let rational = Value::rational(3, 4).unwrap();
    let leaves = PrePostValueIterator::new(&rational)
        .filter(|(_, visit)| *visit == Visit::Leaf)
        .map(|(v, _)| v)
        .collect::<Vec<_>>();
    assert_eq!(leaves, vec![Value::from(3), Value::from(4)]);
}

#[test]
fn skip_subtree_suppresses_children_and_exit() {
    let inner = Value::list(vec![Value::from(1), Value::from(2)]);
    let root = Value::list(vec![inner.clone(), Value::from(3)]);
    let mut iter = PrePostValueIterator::new(&root);
    let mut seen = vec![];
    while let Some((value, visit)) = iter.next() {
        if visit == Visit::Enter && value == inner {
            iter.skip_subtree();
        }
        seen.push((value, visit));
    }
    assert_eq!(
        seen,
        vec![
            (root.clone(), Visit::Enter),
            (inner, Visit::Enter),
            (Value::from(3), Visit::Leaf),
            (root, Visit::Exit),
        ]
    );
}

#[test]
fn deep_nesting() {
    let mut value = Value::from(0);
    for _ in 0..100_000 {
        value = Value::list(vec![value]);
    }
    let count = PrePostValueIterator::new(&value).count();
    assert_eq!(count, 200_001);
    // Dropping a deeply nested value recurses, so unwind it iteratively.
    while let Value::List(mut list) = value {
        value = match std::sync::Arc::get_mut(&mut list).and_then(|l| l.pop()) {
            Some(inner) => inner,
            None => break,
        };
    }
}

#[test]
fn type_order() {
    let elem = Type::tuple(vec![Type::Integer, Type::String]);
    let root = Type::map(Type::String, Type::list(elem.clone()));
    let events = PrePostTypeIterator::new(&root).collect::<Vec<_>>();
    let list = Type::list(elem.clone());
    assert_eq!(
        events,
        vec![
            (root.clone(), Visit::Enter),
            (Type::String, Visit::Leaf),
            (list.clone(), Visit::Enter),
            (elem.clone(), Visit::Enter),
            (Type::Integer, Visit::Leaf),
            (Type::String, Visit::Leaf),
            (elem, Visit::Exit),
            (list, Visit::Exit),
            (root, Visit::Exit),
        ]
    );
}

#[test]
fn type_skip_subtree() {
    let elem = Type::set(Type::Real);
    let root = Type::tuple(vec![elem.clone(), Type::Bool]);
    let mut iter = PrePostTypeIterator::new(&root);
    let mut seen = vec![];
    while let Some((t, visit)) = iter.next() {
        if visit == Visit::Enter && t == elem {
            iter.skip_subtree();
        }
        seen.push(visit);
    }
    assert_eq!(
        seen,
        vec![Visit::Enter, Visit::Enter, Visit::Leaf, Visit::Exit]
    );
}
