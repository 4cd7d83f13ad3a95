// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! Identifier newtypes. Station numbers are plant-assigned (e.g. 301, 302)
//! and ordered; a recipe stage names its permissible stations as a closed
//! id interval, so `StationId` keeps its `Ord`.

use serde::Serialize;
use std::fmt::Display;

/// A plant station number.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StationId(u32);

impl StationId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        StationId(id)
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Display for StationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StationId({})", self.0)
    }
}

impl From<u32> for StationId {
    #[inline]
    fn from(value: u32) -> Self {
        StationId(value)
    }
}

/// An equivalence class of interchangeable stations (same chemistry).
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct GroupId(u32);

impl GroupId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        GroupId(id)
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GroupId({})", self.0)
    }
}

impl From<u32> for GroupId {
    #[inline]
    fn from(value: u32) -> Self {
        GroupId(value)
    }
}

/// An overhead transporter.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TransporterId(u32);

impl TransporterId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        TransporterId(id)
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Display for TransporterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TransporterId({})", self.0)
    }
}

impl From<u32> for TransporterId {
    #[inline]
    fn from(value: u32) -> Self {
        TransporterId(value)
    }
}

/// A work unit traversing the line.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct BatchId(u32);

impl BatchId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        BatchId(id)
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Display for BatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "BatchId({})", self.0)
    }
}

impl From<u32> for BatchId {
    #[inline]
    fn from(value: u32) -> Self {
        BatchId(value)
    }
}

/// A treatment recipe.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct RecipeId(u32);

impl RecipeId {
    #[inline]
    pub const fn new(id: u32) -> Self {
        RecipeId(id)
    }

    #[inline]
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl Display for RecipeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecipeId({})", self.0)
    }
}

impl From<u32> for RecipeId {
    #[inline]
    fn from(value: u32) -> Self {
        RecipeId(value)
    }
}

/// A position within a recipe. Stage 0 is the virtual entry stage.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct StageIndex(usize);

impl StageIndex {
    #[inline]
    pub const fn new(idx: usize) -> Self {
        StageIndex(idx)
    }

    #[inline]
    pub const fn entry() -> Self {
        StageIndex(0)
    }

    #[inline]
    pub const fn value(self) -> usize {
        self.0
    }

    #[inline]
    pub const fn is_entry(self) -> bool {
        self.0 == 0
    }

    /// The preceding stage; `None` at the entry stage.
    #[inline]
    pub const fn prev(self) -> Option<StageIndex> {
        match self.0 {
            0 => None,
            n => Some(StageIndex(n - 1)),
        }
    }

    #[inline]
    pub const fn next(self) -> StageIndex {
        StageIndex(self.0 + 1)
    }
}

impl Display for StageIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Stage({})", self.0)
    }
}

impl From<usize> for StageIndex {
    #[inline]
    fn from(value: usize) -> Self {
        StageIndex(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_roundtrip() {
        assert_eq!(StationId::new(301).value(), 301);
        assert_eq!(TransporterId::from(2).value(), 2);
        assert_eq!(BatchId::new(7), BatchId::from(7));
    }

    #[test]
    fn test_station_ordering() {
        assert!(StationId::new(301) < StationId::new(302));
    }

    #[test]
    fn test_stage_index_navigation() {
        let s = StageIndex::new(2);
        assert_eq!(s.prev(), Some(StageIndex::new(1)));
        assert_eq!(s.next(), StageIndex::new(3));
        assert!(StageIndex::entry().is_entry());
        assert_eq!(StageIndex::entry().prev(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", StationId::new(301)), "StationId(301)");
        assert_eq!(format!("{}", StageIndex::new(1)), "Stage(1)");
    }
}
