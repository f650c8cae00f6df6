use std::os::fd::{AsRawFd, RawFd};

use aya::maps::{Map, MapData, RingBuf};
use tracing::warn;

use synward_ebpf_common::SynEvent;

use crate::FilterError;

/// Consumer side of the kernel SYN event ring buffer.
///
/// `AsRawFd` lets the event loop wait for readability; `drain` then delivers
/// every available record in producer-submission order (per producer CPU).
pub struct EventRing {
    ring: RingBuf<MapData>,
}

impl EventRing {
    pub(crate) fn new(map: Map) -> Result<Self, FilterError> {
        Ok(Self { ring: RingBuf::try_from(map)? })
    }

    /// Deliver every currently-available event to `handler`.
    pub fn drain(&mut self, mut handler: impl FnMut(SynEvent)) {
        while let Some(record) = self.ring.next() {
            match decode(&record) {
                Some(event) => handler(event),
                None => warn!(len = record.len(), "undersized ring record, skipping"),
            }
        }
    }
}

impl AsRawFd for EventRing {
    fn as_raw_fd(&self) -> RawFd {
        self.ring.as_raw_fd()
    }
}

/// Decode one ring record into a `SynEvent`.
///
/// The XDP program writes the `#[repr(C)]` struct in place; the record may
/// carry allocator padding beyond it.
fn decode(bytes: &[u8]) -> Option<SynEvent> {
    if bytes.len() < std::mem::size_of::<SynEvent>() {
        return None;
    }
    // SAFETY: length checked above; SynEvent is #[repr(C)] + Copy with every
    // bit pattern valid, read unaligned straight from the record bytes.
    Some(unsafe { std::ptr::read_unaligned(bytes.as_ptr().cast::<SynEvent>()) })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_event_from_record_bytes() {
        let event = SynEvent { host: 0x0A00_0001, dest: 0xC0A8_0101, port: 443 };
        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&event.host.to_ne_bytes());
        bytes[4..8].copy_from_slice(&event.dest.to_ne_bytes());
        bytes[8..10].copy_from_slice(&event.port.to_ne_bytes());
        assert_eq!(decode(&bytes), Some(event));
    }

    #[test]
    fn test_decode_tolerates_trailing_padding() {
        let event = SynEvent { host: 1, dest: 2, port: 3 };
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(&event.host.to_ne_bytes());
        bytes[4..8].copy_from_slice(&event.dest.to_ne_bytes());
        bytes[8..10].copy_from_slice(&event.port.to_ne_bytes());
        assert_eq!(decode(&bytes), Some(event));
    }

    #[test]
    fn test_undersized_record_is_rejected() {
        assert_eq!(decode(&[0u8; 4]), None);
    }
}
