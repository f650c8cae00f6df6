//! XDP program for SYN-flood and port-scan mitigation.
//!
//! Drops packets from blacklisted sources at the earliest hook and reports
//! every inbound IPv4 TCP SYN to user space through a ring buffer. Blacklist
//! membership is decided entirely in user space by the rate engine; this
//! program only reads the map.
#![no_std]
#![no_main]

use aya_ebpf::{
    bindings::xdp_action::{XDP_DROP, XDP_PASS},
    macros::{map, xdp},
    maps::{HashMap, RingBuf},
    programs::XdpContext,
};

use core::mem;

use synward_ebpf_common::{SynEvent, BLACKLIST_MAX_ENTRIES, EVENT_RING_BYTES};

// ── Network protocol constants (network byte order on LE host) ──────────────

const ETH_P_IPV6: u16 = 0x86DD_u16.swap_bytes();

const IPPROTO_TCP: u8 = 6;

// ── Network header definitions ───────────────────────────────────────────────
//
// aya-ebpf-bindings does not include ethernet/IP/TCP headers (those are UAPI
// network headers, not BPF-specific). We define minimal versions here.

#[repr(C)]
struct EthHdr {
    h_dest: [u8; 6],
    h_source: [u8; 6],
    h_proto: u16, // network byte order
}

/// Minimal IPv4 header (no options).
/// The first byte encodes `ihl` (low nibble) and `version` (high nibble)
/// following `__LITTLE_ENDIAN_BITFIELD` ordering.
#[repr(C)]
struct IpHdr {
    version_ihl: u8,
    tos: u8,
    tot_len: u16,
    id: u16,
    frag_off: u16,
    ttl: u8,
    protocol: u8,
    check: u16,
    saddr: u32, // network byte order
    daddr: u32, // network byte order
}

impl IpHdr {
    #[inline(always)]
    fn ihl(&self) -> u8 {
        // On LE: ihl is the lower 4 bits of the first byte
        self.version_ihl & 0x0F
    }
}

/// Minimal TCP header (fixed 20 bytes).
/// Bytes 12-13 encode `doff` and the flag bits using `__LITTLE_ENDIAN_BITFIELD`.
///
/// As a LE u16 (low byte first in memory):
///   bits [0-3]  = reserved (res1)
///   bits [4-7]  = doff (data offset)
///   bits [8]    = FIN
///   bits [9]    = SYN
///   bits [10]   = RST
///   bits [11]   = PSH
///   bits [12]   = ACK
#[repr(C)]
struct TcpHdr {
    source: u16, // network byte order
    dest: u16,   // network byte order
    seq: u32,
    ack_seq: u32,
    offset_flags: u16, // doff + flags, LE layout described above
    window: u16,
    check: u16,
    urg_ptr: u16,
}

impl TcpHdr {
    #[inline(always)]
    fn syn(&self) -> bool {
        (self.offset_flags >> 9) & 1 != 0
    }
    #[inline(always)]
    fn ack(&self) -> bool {
        (self.offset_flags >> 12) & 1 != 0
    }
}

// ── BPF maps ─────────────────────────────────────────────────────────────────

/// Banned source addresses, host byte order. Written only from user space;
/// this program does lookups.
#[map]
static BLACKLIST: HashMap<u32, u8> = HashMap::with_max_entries(BLACKLIST_MAX_ENTRIES, 0);

#[map]
static EVENTS: RingBuf = RingBuf::with_byte_size(EVENT_RING_BYTES, 0);

// ── Packet access helper ─────────────────────────────────────────────────────

/// Returns a const pointer to `T` at `offset` bytes from the start of the
/// packet, or `None` if the access would exceed `data_end`.
///
/// The BPF verifier accepts this pattern (explicit bounds check before cast).
#[inline(always)]
unsafe fn ptr_at<T>(ctx: &XdpContext, offset: usize) -> Option<*const T> {
    let start = ctx.data();
    let end = ctx.data_end();
    let access_end = start.checked_add(offset)?.checked_add(mem::size_of::<T>())?;
    if access_end > end {
        return None;
    }
    Some(start.checked_add(offset)? as *const T)
}

// ── Entry point ──────────────────────────────────────────────────────────────

#[xdp]
pub fn synward_filter(ctx: XdpContext) -> u32 {
    match try_filter(&ctx) {
        Ok(verdict) => verdict,
        // Truncated or otherwise malformed packets never get past us.
        Err(()) => XDP_DROP,
    }
}

fn try_filter(ctx: &XdpContext) -> Result<u32, ()> {
    let mut offset = 0usize;

    // ── Ethernet ─────────────────────────────────────────────────────────────
    let eth = unsafe { ptr_at::<EthHdr>(ctx, offset).ok_or(())? };
    offset = offset.saturating_add(mem::size_of::<EthHdr>());

    // IPv6 is out of scope; let the stack handle it. No VLAN tag handling.
    if unsafe { (*eth).h_proto } == ETH_P_IPV6 {
        return Ok(XDP_PASS);
    }

    // ── IPv4 ─────────────────────────────────────────────────────────────────
    let ip = unsafe { ptr_at::<IpHdr>(ctx, offset).ok_or(())? };
    let host = u32::from_be(unsafe { (*ip).saddr });

    // Blacklisted sources still get reported below, so attempts made while
    // banned keep feeding the rate estimate. Hold the verdict until then.
    let verdict = if unsafe { BLACKLIST.get(&host) }.is_some() {
        XDP_DROP
    } else {
        XDP_PASS
    };

    // IPv4 headers are variable length; the whole header must be in bounds.
    let ip_hdr_len = usize::from(unsafe { (*ip).ihl() }).saturating_mul(4);
    if ip_hdr_len < mem::size_of::<IpHdr>() {
        return Err(());
    }
    let ip_end = offset.saturating_add(ip_hdr_len);
    if unsafe { ptr_at::<u8>(ctx, ip_end.saturating_sub(1)).is_none() } {
        return Err(());
    }

    if unsafe { (*ip).protocol } != IPPROTO_TCP {
        return Ok(verdict);
    }
    offset = ip_end;

    // ── TCP ──────────────────────────────────────────────────────────────────
    let tcp = unsafe { ptr_at::<TcpHdr>(ctx, offset).ok_or(())? };

    // SYN only; a SYN-ACK is a response, not a probe.
    if unsafe { !(*tcp).syn() || (*tcp).ack() } {
        return Ok(verdict);
    }

    let Some(mut entry) = EVENTS.reserve::<SynEvent>(0) else {
        // Ring full: lose the sample rather than stall the fast path.
        return Ok(XDP_PASS);
    };
    entry.write(SynEvent {
        host,
        dest: u32::from_be(unsafe { (*ip).daddr }),
        port: u16::from_be(unsafe { (*tcp).dest }),
    });
    entry.submit(0);

    Ok(verdict)
}

// ── Required for no_std + no_main ────────────────────────────────────────────

#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    loop {}
}
