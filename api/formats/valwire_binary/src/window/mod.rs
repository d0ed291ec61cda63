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

use std::borrow::Borrow;
use std::collections::VecDeque;
use std::hash::Hash;

use fnv::FnvHashMap;

use crate::ValueIoError;

#[cfg(test)]
mod tests;

/// Tracks the most recently written items so that a repeat can be replaced with the
/// distance back to its previous occurrence. The most recently written item is at
/// distance 0.
///
/// Items are keyed by `K` (an identity for values and types, the content for strings). The
/// payload `T` is held for as long as the item is in the window, which keeps the allocation
/// behind an identity key alive so that its address cannot be reused.
#[derive(Debug)]
pub struct WriteWindow<K, T = ()> {
    capacity: usize,
    written: u64,
    positions: FnvHashMap<K, u64>,
    ring: VecDeque<(K, T)>,
}

impl<K, T> WriteWindow<K, T>
where
    K: Hash + Eq + Clone,
{
    pub fn new(capacity: usize) -> Self {
        WriteWindow {
            capacity,
            written: 0,
            positions: Default::default(),
            ring: Default::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// How many items have been written since `key` was written, if it is still in the window.
    pub fn how_long_ago<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.positions
            .get(key)
            .map(|pos| (self.written - 1 - *pos) as usize)
    }

    pub fn write(&mut self, key: K, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.ring.len() == self.capacity {
            if let Some((oldest, _)) = self.ring.pop_front() {
                let oldest_pos = self.written - self.capacity as u64;
                if self.positions.get(&oldest) == Some(&oldest_pos) {
                    self.positions.remove(&oldest);
                }
            }
        }
        self.positions.insert(key.clone(), self.written);
        self.ring.push_back((key, item));
        self.written += 1;
    }
}

/// The reading side of a [`WriteWindow`]: a circular buffer of the most recently read
/// items, addressed by distance back from the most recent.
#[derive(Debug)]
pub struct ReadWindow<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T: Clone> ReadWindow<T> {
    pub fn new(capacity: usize) -> Self {
        ReadWindow {
            capacity,
            items: Default::default(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn write(&mut self, item: T) {
        if self.capacity == 0 {
            return;
        }
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn look_back(&self, distance: usize) -> Result<T, ValueIoError> {
        let occupancy = self.items.len();
        if distance < occupancy {
            Ok(self.items[occupancy - 1 - distance].clone())
        } else {
            Err(ValueIoError::CacheMiss {
                distance,
                occupancy,
            })
        }
    }
}
