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

/// The URI part of a source location. Many locations typically point into the same
/// resource so this is held behind an [`Arc`] and shared between them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceUri {
    scheme: String,
    authority: Option<String>,
    path: Option<String>,
    query: Option<String>,
    fragment: Option<String>,
}

impl SourceUri {
    pub fn new<S: Into<String>>(scheme: S) -> Self {
        SourceUri {
            scheme: scheme.into(),
            authority: None,
            path: None,
            query: None,
            fragment: None,
        }
    }

    pub fn with_authority<S: Into<String>>(mut self, authority: S) -> Self {
        self.authority = Some(authority.into());
        self
    }

    pub fn with_path<S: Into<String>>(mut self, path: S) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_query<S: Into<String>>(mut self, query: S) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_fragment<S: Into<String>>(mut self, fragment: S) -> Self {
        self.fragment = Some(fragment.into());
        self
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn authority(&self) -> Option<&str> {
        self.authority.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }
}

impl Display for SourceUri {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:", self.scheme)?;
        if let Some(authority) = &self.authority {
            write!(f, "//{}", authority)?;
        }
        if let Some(path) = &self.path {
            f.write_str(path)?;
        }
        if let Some(query) = &self.query {
            write!(f, "?{}", query)?;
        }
        if let Some(fragment) = &self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

/// A character range within a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OffsetLength {
    pub offset: u32,
    pub length: u32,
}

/// The lines and columns spanned by a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineColumn {
    pub begin_line: u32,
    pub end_line: u32,
    pub begin_column: u32,
    pub end_column: u32,
}

/// A pointer into a resource: the resource URI plus an optional range within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceLocation {
    uri: Arc<SourceUri>,
    offset_length: Option<OffsetLength>,
    line_column: Option<LineColumn>,
}

impl SourceLocation {
    /// Create a location for a shared URI. Locations created from clones of the same [`Arc`]
    /// will have their URI written only once by the binary writer.
    pub fn new(uri: Arc<SourceUri>) -> Self {
        SourceLocation {
            uri,
            offset_length: None,
            line_column: None,
        }
    }

    pub fn with_offset(mut self, offset: u32, length: u32) -> Self {
        self.offset_length = Some(OffsetLength { offset, length });
        self
    }

    pub fn with_lines(
        mut self,
        begin_line: u32,
        end_line: u32,
        begin_column: u32,
        end_column: u32,
    ) -> Self {
        self.line_column = Some(LineColumn {
            begin_line,
            end_line,
            begin_column,
            end_column,
        });
        self
    }

    /// The URI, without any range information.
    pub fn top(&self) -> &Arc<SourceUri> {
        &self.uri
    }

    pub fn offset_length(&self) -> Option<OffsetLength> {
        self.offset_length
    }

    pub fn line_column(&self) -> Option<LineColumn> {
        self.line_column
    }
}

impl From<SourceUri> for SourceLocation {
    fn from(uri: SourceUri) -> Self {
        SourceLocation::new(Arc::new(uri))
    }
}

impl Display for SourceLocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "|{}|", self.uri)?;
        match (self.offset_length, self.line_column) {
            (Some(OffsetLength { offset, length }), Some(lc)) => write!(
                f,
                "({},{},<{},{}>,<{},{}>)",
                offset, length, lc.begin_line, lc.begin_column, lc.end_line, lc.end_column
            ),
            (Some(OffsetLength { offset, length }), None) => write!(f, "({},{})", offset, length),
            (None, Some(lc)) => write!(
                f,
                "(<{},{}>,<{},{}>)",
                lc.begin_line, lc.begin_column, lc.end_line, lc.end_column
            ),
            (None, None) => Ok(()),
        }
    }
}
