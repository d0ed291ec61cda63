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

use std::io::{self, BufReader, Read, Write};

use flate2::bufread::GzDecoder;
use flate2::write::GzEncoder;
use tracing::warn;

use crate::FormatError;


const MAX_GZIP_LEVEL: i32 = 9;
#[cfg(feature = "xz")]
const MAX_XZ_PRESET: i32 = 6;
const MAX_ZSTD_LEVEL: i32 = 19;

/// Compression algorithms that may be applied to the message stream. The discriminants are
/// recorded in the stream so that readers never need to guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Xz,
    Zstd,
}

impl Compression {
    pub fn header(&self) -> u8 {
        match self {
            Compression::None => 0,
            Compression::Gzip => 1,
            Compression::Xz => 2,
            Compression::Zstd => 3,
        }
    }

    pub fn from_header(byte: u8) -> Result<Compression, FormatError> {
        match byte {
            0 => Ok(Compression::None),
            1 => Ok(Compression::Gzip),
            2 => Ok(Compression::Xz),
            3 => Ok(Compression::Zstd),
            ow => Err(FormatError::UnsupportedCompression(ow)),
        }
    }

    /// Whether this build can read and write the algorithm.
    pub fn is_available(&self) -> bool {
        match self {
            Compression::None | Compression::Gzip => true,
            Compression::Xz => cfg!(feature = "xz"),
            Compression::Zstd => cfg!(feature = "zstd"),
        }
    }

    /// Replace an unavailable algorithm with gzip, which is always available.
    pub fn or_fallback(self) -> Compression {
        if self.is_available() {
            self
        } else {
            warn!(requested = ?self, "Compression algorithm unavailable. Falling back to gzip.");
            Compression::Gzip
        }
    }
}

fn rescale(level: i32, max: i32) -> u32 {
    let clamped = level.clamp(1, MAX_ZSTD_LEVEL);
    ((clamped * max + MAX_ZSTD_LEVEL - 1) / MAX_ZSTD_LEVEL) as u32
}

/// Map a level on the zstd scale onto the gzip scale.
fn gzip_level(level: i32) -> flate2::Compression {
    flate2::Compression::new(rescale(level, MAX_GZIP_LEVEL))
}

/// Map a level on the zstd scale onto the xz presets. The strongest zstd level is preset 6,
/// the xz default; the presets above it cost far more memory for little gain.
#[cfg(feature = "xz")]
fn xz_preset(level: i32) -> u32 {
    rescale(level, MAX_XZ_PRESET)
}

/// The sink for the message stream, possibly compressing.
pub enum Sink<W: Write> {
    Raw(W),
    Gzip(GzEncoder<W>),
    #[cfg(feature = "xz")]
    Xz(xz2::write::XzEncoder<W>),
    #[cfg(feature = "zstd")]
    Zstd(zstd::stream::write::Encoder<'static, W>),
}

impl<W: Write> Sink<W> {
    /// # Arguments
    /// * `compression` - The algorithm. This must be available.
    /// * `level` - The compression level, on the zstd scale.
    /// * `inner` - The underlying sink.
    pub fn open(compression: Compression, level: i32, inner: W) -> io::Result<Self> {
        match compression {
            Compression::None => Ok(Sink::Raw(inner)),
            Compression::Gzip => Ok(Sink::Gzip(GzEncoder::new(inner, gzip_level(level)))),
            #[cfg(feature = "xz")]
            Compression::Xz => Ok(Sink::Xz(xz2::write::XzEncoder::new(
                inner,
                xz_preset(level),
            ))),
            #[cfg(feature = "zstd")]
            Compression::Zstd => Ok(Sink::Zstd(zstd::stream::write::Encoder::new(
                inner, level,
            )?)),
            #[cfg(not(all(feature = "xz", feature = "zstd")))]
            ow => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                format!("Compression algorithm {:?} is not available.", ow),
            )),
        }
    }

    /// Complete the compressed stream and recover the underlying sink.
    pub fn finish(self) -> io::Result<W> {
        match self {
            Sink::Raw(inner) => Ok(inner),
            Sink::Gzip(encoder) => encoder.finish(),
            #[cfg(feature = "xz")]
            Sink::Xz(encoder) => encoder.finish(),
            #[cfg(feature = "zstd")]
            Sink::Zstd(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for Sink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Raw(inner) => inner.write(buf),
            Sink::Gzip(encoder) => encoder.write(buf),
            #[cfg(feature = "xz")]
            Sink::Xz(encoder) => encoder.write(buf),
            #[cfg(feature = "zstd")]
            Sink::Zstd(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Raw(inner) => inner.flush(),
            Sink::Gzip(encoder) => encoder.flush(),
            #[cfg(feature = "xz")]
            Sink::Xz(encoder) => encoder.flush(),
            #[cfg(feature = "zstd")]
            Sink::Zstd(encoder) => encoder.flush(),
        }
    }
}

/// The source of the message stream, possibly decompressing.
pub enum Source<R: Read> {
    Raw(BufReader<R>),
    Gzip(BufReader<GzDecoder<BufReader<R>>>),
    #[cfg(feature = "xz")]
    Xz(BufReader<xz2::bufread::XzDecoder<BufReader<R>>>),
    #[cfg(feature = "zstd")]
    Zstd(BufReader<zstd::stream::read::Decoder<'static, BufReader<R>>>),
}

impl<R: Read> Source<R> {
    pub fn open(compression: Compression, inner: BufReader<R>) -> Result<Self, FormatError> {
        match compression {
            Compression::None => Ok(Source::Raw(inner)),
            Compression::Gzip => Ok(Source::Gzip(BufReader::new(GzDecoder::new(inner)))),
            #[cfg(feature = "xz")]
            Compression::Xz => Ok(Source::Xz(BufReader::new(xz2::bufread::XzDecoder::new(
                inner,
            )))),
            #[cfg(feature = "zstd")]
            Compression::Zstd => zstd::stream::read::Decoder::with_buffer(inner)
                .map(|decoder| Source::Zstd(BufReader::new(decoder)))
                .map_err(|_| FormatError::UnsupportedCompression(compression.header())),
            #[cfg(not(all(feature = "xz", feature = "zstd")))]
            ow => Err(FormatError::UnsupportedCompression(ow.header())),
        }
    }
}

impl<R: Read> Read for Source<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Source::Raw(inner) => inner.read(buf),
            Source::Gzip(decoder) => decoder.read(buf),
            #[cfg(feature = "xz")]
            Source::Xz(decoder) => decoder.read(buf),
            #[cfg(feature = "zstd")]
            Source::Zstd(decoder) => decoder.read(buf),
        }
    }
}
