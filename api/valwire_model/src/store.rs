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

use std::collections::HashMap;

use crate::types::Type;
use crate::ModelError;

/// A registry of nominal types. Algebraic data types, aliases and constructors are interned
/// by their name and signature so that every request for the same declaration yields the
/// same instance.
#[derive(Debug, Default)]
pub struct TypeStore {
    adts: HashMap<(String, Type), Type>,
    aliases: HashMap<(String, Type, Type), Type>,
    constructors: HashMap<(Type, String, Type), Type>,
}

impl TypeStore {
    pub fn new() -> Self {
        Default::default()
    }

    /// Look up or declare an algebraic data type.
    ///
    /// # Arguments
    /// * `name` - The name of the type.
    /// * `parameters` - A tuple of the type parameters.
    pub fn adt(&mut self, name: &str, parameters: Type) -> Result<Type, ModelError> {
        let key = (name.to_string(), parameters);
        if let Some(existing) = self.adts.get(&key) {
            return Ok(existing.clone());
        }
        let adt = Type::adt(name, key.1.clone())?;
        self.adts.insert(key, adt.clone());
        Ok(adt)
    }

    /// Look up or declare an alias.
    pub fn alias(
        &mut self,
        name: &str,
        aliased: Type,
        parameters: Type,
    ) -> Result<Type, ModelError> {
        let key = (name.to_string(), aliased, parameters);
        if let Some(existing) = self.aliases.get(&key) {
            return Ok(existing.clone());
        }
        let alias = Type::alias(name, key.1.clone(), key.2.clone())?;
        self.aliases.insert(key, alias.clone());
        Ok(alias)
    }

    /// Look up or declare a constructor of an algebraic data type.
    pub fn constructor(
        &mut self,
        adt: &Type,
        name: &str,
        fields: Type,
    ) -> Result<Type, ModelError> {
        let key = (adt.clone(), name.to_string(), fields);
        if let Some(existing) = self.constructors.get(&key) {
            return Ok(existing.clone());
        }
        let cons = Type::constructor(adt.clone(), name, key.2.clone())?;
        self.constructors.insert(key, cons.clone());
        Ok(cons)
    }

    /// All declared constructors of an algebraic data type.
    pub fn constructors_of<'a>(&'a self, adt: &'a Type) -> impl Iterator<Item = &'a Type> + 'a {
        self.constructors
            .iter()
            .filter(move |((owner, _, _), _)| owner == adt)
            .map(|(_, cons)| cons)
    }

    /// The number of declarations held in the store.
    pub fn len(&self) -> usize {
        self.adts.len() + self.aliases.len() + self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
