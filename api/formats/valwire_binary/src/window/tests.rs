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

use crate::window::{ReadWindow, WriteWindow};
use crate::ValueIoError;

#[test]
fn most_recent_is_distance_zero() {
    let mut window: WriteWindow<String> = WriteWindow::new(4);
    window.write("a".to_string(), ());
    assert_eq!(window.how_long_ago("a"), Some(0));
    window.write("b".to_string(), ());
    window.write("c".to_string(), ());
    assert_eq!(window.how_long_ago("a"), Some(2));
    assert_eq!(window.how_long_ago("c"), Some(0));
    assert_eq!(window.how_long_ago("d"), None);
}

#[test]
fn oldest_evicted() {
    let mut window: WriteWindow<u32> = WriteWindow::new(2);
    window.write(1, ());
    window.write(2, ());
    window.write(3, ());
    assert_eq!(window.how_long_ago(&1), None);
    assert_eq!(window.how_long_ago(&2), Some(1));
    assert_eq!(window.how_long_ago(&3), Some(0));
}

#[test]
fn rewritten_key_survives_eviction_of_old_slot() {
    let mut window: WriteWindow<u32> = WriteWindow::new(2);
    window.write(1, ());
    window.write(1, ());
    window.write(2, ());
    assert_eq!(window.how_long_ago(&1), Some(1));
}

#[test]
fn zero_capacity_always_misses() {
    let mut writer: WriteWindow<u32> = WriteWindow::new(0);
    writer.write(1, ());
    assert_eq!(writer.how_long_ago(&1), None);

    let mut reader: ReadWindow<u32> = ReadWindow::new(0);
    reader.write(1);
    assert!(matches!(
        reader.look_back(0),
        Err(ValueIoError::CacheMiss {
            distance: 0,
            occupancy: 0
        })
    ));
}

#[test]
fn reader_mirrors_writer() {
    let mut writer: WriteWindow<u32, char> = WriteWindow::new(3);
    let mut reader: ReadWindow<char> = ReadWindow::new(3);
    for (key, item) in (0..5).zip("abcde".chars()) {
        writer.write(key, item);
        reader.write(item);
    }
    for key in 2..5 {
        let distance = writer.how_long_ago(&key).unwrap();
        let expected = "abcde".chars().nth(key as usize).unwrap();
        assert_eq!(reader.look_back(distance).unwrap(), expected);
    }
    assert!(matches!(
        reader.look_back(3),
        Err(ValueIoError::CacheMiss {
            distance: 3,
            occupancy: 3
        })
    ));
}
