//! Host-side model of the XDP classifier.
//!
//! The kernel program in `synward-ebpf-xdp` cannot be exercised off-box, so
//! the same parse-and-verdict algorithm is kept here over plain byte slices,
//! parameterized by a blacklist lookup and an event sink. The test suite
//! drives it with a mock blacklist and a mock transport.

use synward_ebpf_common::SynEvent;

/// Verdict returned for every ingress frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Drop,
    Pass,
}

const ETH_HDR_LEN: usize = 14;
const IP_HDR_MIN_LEN: usize = 20;
const TCP_HDR_LEN: usize = 20;

const ETH_P_IPV6: u16 = 0x86DD;
const IPPROTO_TCP: u8 = 6;

const TCP_FLAG_SYN: u8 = 0x02;
const TCP_FLAG_ACK: u8 = 0x10;

/// Classify one ingress Ethernet frame.
///
/// `is_blacklisted` is the blacklist lookup. `submit` is the transport
/// reservation; it returns `false` when the ring is full, in which case the
/// event is lost and the frame passes. Exactly one event is submitted per
/// IPv4 TCP SYN (SYN set, ACK clear) unless the transport refuses it;
/// blacklisted sources are dropped but still reported.
pub fn classify(
    frame: &[u8],
    is_blacklisted: impl Fn(u32) -> bool,
    submit: impl FnOnce(SynEvent) -> bool,
) -> Verdict {
    if frame.len() < ETH_HDR_LEN {
        return Verdict::Drop;
    }
    let eth_type = u16::from_be_bytes([frame[12], frame[13]]);
    // IPv6 is out of scope. No VLAN tag handling.
    if eth_type == ETH_P_IPV6 {
        return Verdict::Pass;
    }

    let Some(ip) = frame.get(ETH_HDR_LEN..ETH_HDR_LEN + IP_HDR_MIN_LEN) else {
        return Verdict::Drop;
    };
    let host = u32::from_be_bytes([ip[12], ip[13], ip[14], ip[15]]);

    // Hold the verdict: blocked sources still get counted below.
    let verdict = if is_blacklisted(host) {
        Verdict::Drop
    } else {
        Verdict::Pass
    };

    // IPv4 headers are variable length; the whole header must be in bounds.
    let ihl = usize::from(ip[0] & 0x0F) * 4;
    if ihl < IP_HDR_MIN_LEN || frame.len() < ETH_HDR_LEN + ihl {
        return Verdict::Drop;
    }

    if ip[9] != IPPROTO_TCP {
        return verdict;
    }

    let tcp_off = ETH_HDR_LEN + ihl;
    let Some(tcp) = frame.get(tcp_off..tcp_off + TCP_HDR_LEN) else {
        return Verdict::Drop;
    };

    // SYN only; a SYN-ACK is a response, not a probe.
    let flags = tcp[13];
    if flags & TCP_FLAG_SYN == 0 || flags & TCP_FLAG_ACK != 0 {
        return verdict;
    }

    let event = SynEvent {
        host,
        dest: u32::from_be_bytes([ip[16], ip[17], ip[18], ip[19]]),
        port: u16::from_be_bytes([tcp[2], tcp[3]]),
    };
    if !submit(event) {
        return Verdict::Pass;
    }
    verdict
}
