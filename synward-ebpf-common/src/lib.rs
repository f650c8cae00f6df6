//! Types shared between the XDP kernel program and the user-space control plane.
//!
//! This crate is `no_std` so it can be compiled for both targets:
//! - `bpfel-unknown-none` (kernel-side XDP program)
//! - the host target (userspace consumer in `synward-ebpf` / `synward-lib`)
#![no_std]

/// Name of the kernel blacklist map, as named by the XDP program's `#[map]` static.
pub const BLACKLIST_MAP: &str = "BLACKLIST";

/// Name of the SYN event ring buffer map.
pub const EVENTS_MAP: &str = "EVENTS";

/// Capacity of the kernel blacklist map.
pub const BLACKLIST_MAX_ENTRIES: u32 = 8192;

/// Size of the SYN event ring buffer, in bytes.
pub const EVENT_RING_BYTES: u32 = 256 * 1024;

/// One TCP SYN observation, submitted by the XDP program for every inbound
/// IPv4 SYN. SYNs from already-blacklisted sources are included, so the
/// control plane keeps observing attempts while they are being dropped.
///
/// All fields are in host byte order; the XDP program converts before
/// submission. The record is written once into a reserved ring-buffer slot and
/// never referenced again after the consumer drains it.
///
/// ```text
/// offset 0: host  u32  (source IPv4)
/// offset 4: dest  u32  (destination IPv4, advisory: reporting only)
/// offset 8: port  u16  (destination TCP port)
/// ```
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SynEvent {
    pub host: u32,
    pub dest: u32,
    pub port: u16,
}

const _: () = {
    use core::mem::{offset_of, size_of};
    assert!(size_of::<SynEvent>() == 12);
    assert!(offset_of!(SynEvent, host) == 0);
    assert!(offset_of!(SynEvent, dest) == 4);
    assert!(offset_of!(SynEvent, port) == 8);
};
