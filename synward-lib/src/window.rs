//! Double-buffered per-source port observations.
//!
//! Two windows exist at any time: `previous` holds the last fully elapsed
//! sampling interval, `current` accumulates the running one. The rate engine
//! reads both; only `rotate` moves data between them.

use std::collections::{BTreeSet, HashMap};

use ahash::RandomState;

/// Ports observed from one source during one sampling window.
///
/// Ports are kept sorted and unique. `dest` is the most recently observed
/// destination address for the source; it is advisory (reporting only) and
/// not part of set identity.
#[derive(Debug, Clone, Default)]
pub struct PortSet {
    ports: BTreeSet<u16>,
    dest: u32,
}

impl PortSet {
    fn ghost(dest: u32) -> Self {
        Self {
            ports: BTreeSet::new(),
            dest,
        }
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    pub fn dest(&self) -> u32 {
        self.dest
    }

    /// Observed ports, ascending.
    pub fn ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.ports.iter().copied()
    }
}

type Window = HashMap<u32, PortSet, RandomState>;

#[derive(Debug, Default)]
pub struct WindowStore {
    prev: Window,
    curr: Window,
}

impl WindowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one SYN observation in the current window.
    ///
    /// The port set for `host` is created on first sight, one per source per
    /// window; repeated ports are idempotent. `dest` always overwrites the
    /// last observed destination.
    pub fn insert(&mut self, host: u32, dest: u32, port: u16) {
        let entry = self.curr.entry(host).or_default();
        entry.dest = dest;
        entry.ports.insert(port);
    }

    /// Cardinality of `host`'s current port set, or 0 if absent.
    pub fn size_current(&self, host: u32) -> usize {
        self.curr.get(&host).map_or(0, PortSet::len)
    }

    /// Cardinality of `host`'s previous port set, or 0 if absent.
    pub fn size_previous(&self, host: u32) -> usize {
        self.prev.get(&host).map_or(0, PortSet::len)
    }

    pub fn iter_current(&self) -> impl Iterator<Item = (u32, &PortSet)> + '_ {
        self.curr.iter().map(|(host, set)| (*host, set))
    }

    /// Swap windows and install ghosts.
    ///
    /// The accumulated window becomes `previous`; the storage from two
    /// intervals ago is cleared in bulk and reused as `current`. Every source
    /// that was active in the new `previous` then gets an empty entry in
    /// `current` carrying its destination forward, so its decaying rate
    /// contribution stays associable until the next rotation drops it.
    pub fn rotate(&mut self) {
        std::mem::swap(&mut self.prev, &mut self.curr);
        self.curr.clear();
        for (host, set) in &self.prev {
            if !set.is_empty() {
                self.curr.insert(*host, PortSet::ghost(set.dest));
            }
        }
    }
}
