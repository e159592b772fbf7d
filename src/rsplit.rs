// Copyright (c) 2022, MaidSafe.
// All rights reserved.
//
// This SAFE Network Software is licensed under the BSD-3-Clause license.
// Please see the LICENSE file for more details.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

// Monotone counter backing the optional split ids; the ids only serve
// logging and deterministic debug output.
static NEXT_ID: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug)]
struct RSplitData {
    include: Vec<usize>,
    exclude: Vec<usize>,
    id: usize,
}

/// A rooted bipartition ("rsplit") over a leaf index space.
///
/// The split asserts that the leaves in the include group share an ancestor
/// that excludes every leaf of the exclude group.  Both groups are sorted
/// and disjoint; the include group is nonempty, while the exclude group may
/// be empty for the trivial root split.
///
/// `RSplit` is an immutable value with shared ownership: cloning is cheap
/// and the same split may sit in several solutions at once.
#[derive(Debug, Clone)]
pub struct RSplit(Rc<RSplitData>);

impl RSplit {
    /// Builds a split from its include group and the full taxon set; the
    /// exclude group is `all \ include`.  Both inputs must be sorted.
    pub fn from_include_all(include: &[usize], all: &[usize]) -> Self {
        let exclude = set_difference(all, include);
        Self::make(include.to_vec(), exclude)
    }

    /// Builds a split from explicit sorted include and exclude groups.
    pub fn from_include_exclude(include: &[usize], exclude: &[usize]) -> Self {
        Self::make(include.to_vec(), exclude.to_vec())
    }

    fn make(include: Vec<usize>, exclude: Vec<usize>) -> Self {
        debug_assert!(!include.is_empty());
        debug_assert!(include.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(exclude.windows(2).all(|w| w[0] < w[1]));
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        RSplit(Rc::new(RSplitData {
            include,
            exclude,
            id,
        }))
    }

    /// The sorted include group.
    #[inline]
    pub fn include(&self) -> &[usize] {
        &self.0.include
    }

    /// The sorted exclude group.
    #[inline]
    pub fn exclude(&self) -> &[usize] {
        &self.0.exclude
    }

    /// The split's monotone id, for logging.
    #[inline]
    pub fn id(&self) -> usize {
        self.0.id
    }

    /// Number of leaves the split mentions.
    #[inline]
    pub fn num_tips(&self) -> usize {
        self.0.include.len() + self.0.exclude.len()
    }
}

/// Sorted-sequence difference `a \ b`.
fn set_difference(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut out = Vec::with_capacity(a.len());
    let mut bi = 0;
    for &x in a {
        while bi < b.len() && b[bi] < x {
            bi += 1;
        }
        if bi < b.len() && b[bi] == x {
            continue;
        }
        out.push(x);
    }
    out
}

impl fmt::Display for RSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for x in self.include() {
            write!(f, "{} ", x)?;
        }
        write!(f, "|")?;
        // very large exclude groups are truncated to keep the logs readable
        for (i, x) in self.exclude().iter().enumerate() {
            if i == 100 {
                write!(f, " ...")?;
                break;
            }
            write!(f, " {}", x)?;
        }
        Ok(())
    }
}
