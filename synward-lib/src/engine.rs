//! The sliding two-window rate engine.
//!
//! Consumes drained SYN events into the current window, rotates windows on
//! the sample tick, and on every measure tick estimates each active source's
//! SYN rate and drives blacklist membership.

use std::net::Ipv4Addr;

use thiserror::Error;
use tracing::{debug, info, warn};

use synward_ebpf_common::SynEvent;

use crate::report::ScanReport;
use crate::window::WindowStore;

#[derive(Debug, Error)]
pub enum BlacklistError {
    /// The kernel map is at capacity; the source stays admitted until churn
    /// frees a slot.
    #[error("blacklist is full")]
    Capacity,

    #[error("blacklist map access failed: {0}")]
    Map(String),
}

/// Mutable view of the kernel blacklist.
///
/// The engine only sees this trait, so it can be driven against an in-memory
/// set in tests. Both mutation operations are no-ops when the precondition
/// does not hold (present on insert, absent on remove).
pub trait Blacklist {
    fn contains(&self, host: u32) -> bool;
    fn insert_if_absent(&mut self, host: u32) -> Result<(), BlacklistError>;
    fn remove(&mut self, host: u32) -> Result<(), BlacklistError>;
}

pub struct RateEngine {
    windows: WindowStore,
    threshold: f64,
}

impl RateEngine {
    /// `num_packets` is the threshold on the estimated rate, not on a raw
    /// packet count.
    pub fn new(num_packets: u64) -> Self {
        Self {
            windows: WindowStore::new(),
            threshold: num_packets as f64,
        }
    }

    /// Feed one drained SYN event into the current window.
    pub fn handle_event(&mut self, event: &SynEvent) {
        self.windows.insert(event.host, event.dest, event.port);
    }

    /// Sample tick: swap windows and install ghosts.
    pub fn rotate(&mut self) {
        self.windows.rotate();
        debug!("windows rotated");
    }

    /// Measure tick: estimate each active source's SYN rate and apply
    /// blacklist transitions.
    ///
    /// `fraction_remaining` is the share of the sampling interval still ahead
    /// of the next rotation, in [0, 1]; the previous window's count decays
    /// linearly with it: `rate = previous * fraction_remaining + current`.
    /// Out-of-range inputs are clamped.
    pub fn measure(&self, fraction_remaining: f64, blacklist: &mut impl Blacklist) {
        let r = fraction_remaining.clamp(0.0, 1.0);
        for (host, set) in self.windows.iter_current() {
            let prev = self.windows.size_previous(host) as f64;
            let rate = prev * r + set.len() as f64;
            let banned = blacklist.contains(host);

            if rate > self.threshold && !banned {
                info!(
                    "port scan detected: {}",
                    ScanReport {
                        source: host,
                        dest: set.dest(),
                        ports: set
                    }
                );
                match blacklist.insert_if_absent(host) {
                    Ok(()) => {}
                    Err(BlacklistError::Capacity) => {
                        info!(host = %Ipv4Addr::from(host), "blacklist full, source stays admitted");
                    }
                    Err(err) => warn!(%err, "blacklist insert failed"),
                }
            } else if rate <= self.threshold && banned {
                if let Err(err) = blacklist.remove(host) {
                    warn!(%err, "blacklist remove failed");
                } else {
                    debug!(host = %Ipv4Addr::from(host), rate, "rate dropped, source released");
                }
            }
        }
    }
}
