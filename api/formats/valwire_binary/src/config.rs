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

use crate::compression::Compression;

/// Roots with fewer compound nodes than this are written uncompressed with the tiny window
/// profile.
pub const SMALL_SIZE: usize = 512;
/// Roots with at least this many compound nodes use the normal window profile. The size
/// estimate stops counting here.
pub const NORMAL_SIZE: usize = 8 * 1024;

/// How hard the writer should work to reduce the size of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionRate {
    /// No compression and no back-references.
    NoSharing,
    /// Back-references only.
    None,
    Light,
    #[default]
    Normal,
    Strong,
    Extreme,
}

impl CompressionRate {
    /// The preferred algorithm. If it is not available in this build, the writer falls back to
    /// gzip.
    pub fn algorithm(&self) -> Compression {
        match self {
            CompressionRate::NoSharing | CompressionRate::None => Compression::None,
            CompressionRate::Extreme => Compression::Xz,
            _ => Compression::Zstd,
        }
    }

    /// The compression level on the zstd scale. Other algorithms rescale it.
    pub fn level(&self) -> i32 {
        match self {
            CompressionRate::NoSharing | CompressionRate::None => 0,
            CompressionRate::Light => 1,
            CompressionRate::Normal => 5,
            CompressionRate::Strong => 13,
            CompressionRate::Extreme => 19,
        }
    }
}

/// The capacities of the back-reference windows of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSizes {
    pub values: usize,
    pub types: usize,
    pub uris: usize,
    pub strings: usize,
}

impl WindowSizes {
    pub const NO_WINDOW: WindowSizes = WindowSizes::new(0, 0, 0, 0);
    pub const TINY: WindowSizes = WindowSizes::new(500, 100, 200, 500);
    pub const SMALL: WindowSizes = WindowSizes::new(5_000, 800, 1_000, 1_000);
    pub const NORMAL: WindowSizes = WindowSizes::new(100_000, 5_000, 40_000, 10_000);

    pub const fn new(values: usize, types: usize, uris: usize, strings: usize) -> Self {
        WindowSizes {
            values,
            types,
            uris,
            strings,
        }
    }

    /// Choose a profile from an estimate of the number of compound nodes in a root.
    pub fn for_estimate(estimate: usize) -> Self {
        if estimate < SMALL_SIZE {
            WindowSizes::TINY
        } else if estimate < NORMAL_SIZE {
            WindowSizes::SMALL
        } else {
            WindowSizes::NORMAL
        }
    }
}

/// Configuration for a [`crate::ValueWriter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriterConfig {
    pub compression: CompressionRate,
    /// Fixed window capacities. If absent, they are chosen from the size of each root.
    pub windows: Option<WindowSizes>,
}

impl WriterConfig {
    pub fn with_compression(compression: CompressionRate) -> Self {
        WriterConfig {
            compression,
            windows: None,
        }
    }

    pub fn with_windows(mut self, windows: WindowSizes) -> Self {
        self.windows = Some(windows);
        self
    }

    pub(crate) fn window_sizes(&self, estimate: usize) -> WindowSizes {
        match (self.compression, self.windows) {
            (CompressionRate::NoSharing, _) => WindowSizes::NO_WINDOW,
            (_, Some(windows)) => windows,
            _ => WindowSizes::for_estimate(estimate),
        }
    }
}
