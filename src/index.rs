// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::collections::{BTreeSet, HashMap};

use super::{Error, OttId};

/// Bijection between external taxon ids and the dense `0..n-1` index space
/// used by every core algorithm.
///
/// Built from a sorted id set, so index order equals id order; the mapping
/// is immutable for the lifetime of a subproblem.
#[derive(Debug, Clone, Default)]
pub struct LeafIndexMap {
    ids: Vec<OttId>,
    index: HashMap<OttId, usize>,
}

impl LeafIndexMap {
    /// Builds the map from a sorted id sequence.
    ///
    /// Fails with [`Error::DuplicateId`] if an id repeats.
    pub fn from_ids<I: IntoIterator<Item = OttId>>(ids: I) -> Result<Self, Error> {
        let mut map = Self::default();
        for id in ids {
            let i = map.ids.len();
            if map.index.insert(id, i).is_some() {
                return Err(Error::DuplicateId(id));
            }
            map.ids.push(id);
        }
        Ok(map)
    }

    /// Builds the map from an id set (already deduplicated and sorted).
    pub fn from_set(ids: &BTreeSet<OttId>) -> Self {
        Self::from_ids(ids.iter().cloned()).expect("sets hold no duplicates")
    }

    /// Number of mapped ids.
    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// true if the map is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// returns the id at `index`.
    #[inline]
    pub fn id(&self, index: usize) -> OttId {
        self.ids[index]
    }

    /// returns the index of `id`, or None.
    #[inline]
    pub fn index_of(&self, id: OttId) -> Option<usize> {
        self.index.get(&id).cloned()
    }

    /// returns the index of `id`, failing with [`Error::UnknownId`].
    pub fn require(&self, id: OttId) -> Result<usize, Error> {
        self.index_of(id).ok_or(Error::UnknownId(id))
    }

    /// Remaps a set of external ids to their sorted indices.
    pub fn remap(&self, ids: &BTreeSet<OttId>) -> Result<Vec<usize>, Error> {
        let mut out = Vec::with_capacity(ids.len());
        for &id in ids {
            out.push(self.require(id)?);
        }
        Ok(out)
    }

    /// All indices, `0..n`.
    pub fn all_indices(&self) -> Vec<usize> {
        (0..self.ids.len()).collect()
    }
}
