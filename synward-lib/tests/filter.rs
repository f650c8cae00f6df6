use synward_ebpf_common::SynEvent;
use synward_lib::filter::{classify, Verdict};

const SYN: u8 = 0x02;
const ACK: u8 = 0x10;

const SRC: u32 = 0x0A00_0001; // 10.0.0.1
const DST: u32 = 0xC0A8_0101; // 192.168.1.1

/// Ethernet + IPv4 (no options) + fixed TCP header, 54 bytes.
fn tcp_frame(src: u32, dst: u32, dport: u16, flags: u8) -> Vec<u8> {
    let mut frame = vec![0u8; 54];
    frame[12..14].copy_from_slice(&0x0800u16.to_be_bytes()); // EtherType IPv4
    frame[14] = 0x45; // version 4, ihl 5
    frame[23] = 6; // protocol TCP
    frame[26..30].copy_from_slice(&src.to_be_bytes());
    frame[30..34].copy_from_slice(&dst.to_be_bytes());
    frame[36..38].copy_from_slice(&dport.to_be_bytes());
    frame[46] = 0x50; // doff 5
    frame[47] = flags;
    frame
}

fn no_blacklist(_host: u32) -> bool {
    false
}

#[test]
fn test_syn_emits_exactly_one_event() {
    let frame = tcp_frame(SRC, DST, 22, SYN);
    let mut events = Vec::new();
    let verdict = classify(&frame, no_blacklist, |event| {
        events.push(event);
        true
    });
    assert_eq!(verdict, Verdict::Pass);
    assert_eq!(
        events,
        vec![SynEvent {
            host: SRC,
            dest: DST,
            port: 22
        }]
    );
}

#[test]
fn test_syn_ack_is_ignored() {
    let frame = tcp_frame(SRC, DST, 22, SYN | ACK);
    let verdict = classify(&frame, no_blacklist, |_| panic!("no event for SYN-ACK"));
    assert_eq!(verdict, Verdict::Pass);
}

#[test]
fn test_plain_ack_is_ignored() {
    let frame = tcp_frame(SRC, DST, 22, ACK);
    let verdict = classify(&frame, no_blacklist, |_| panic!("no event for plain ACK"));
    assert_eq!(verdict, Verdict::Pass);
}

#[test]
fn test_blacklisted_source_is_dropped_and_still_counted() {
    let frame = tcp_frame(SRC, DST, 22, SYN);
    let mut events = Vec::new();
    let verdict = classify(
        &frame,
        |host| host == SRC,
        |event| {
            events.push(event);
            true
        },
    );
    assert_eq!(verdict, Verdict::Drop);
    assert_eq!(events.len(), 1);
}

#[test]
fn test_blacklisted_non_syn_is_still_dropped() {
    let frame = tcp_frame(SRC, DST, 22, ACK);
    let verdict = classify(&frame, |host| host == SRC, |_| panic!("no event"));
    assert_eq!(verdict, Verdict::Drop);
}

#[test]
fn test_transport_full_falls_back_to_pass() {
    // Even a blacklisted source passes when the ring refuses the event; the
    // measurement is lossy, the fast path is not.
    let frame = tcp_frame(SRC, DST, 22, SYN);
    let verdict = classify(&frame, |_| true, |_| false);
    assert_eq!(verdict, Verdict::Pass);
}

#[test]
fn test_short_ethernet_frame_is_dropped() {
    let frame = vec![0u8; 13];
    let verdict = classify(&frame, no_blacklist, |_| panic!("no event for runt frames"));
    assert_eq!(verdict, Verdict::Drop);
}

#[test]
fn test_truncated_ip_header_is_dropped() {
    let mut frame = tcp_frame(SRC, DST, 22, SYN);
    frame.truncate(20);
    assert_eq!(
        classify(&frame, no_blacklist, |_| panic!("no event")),
        Verdict::Drop
    );
}

#[test]
fn test_truncated_tcp_header_is_dropped() {
    let mut frame = tcp_frame(SRC, DST, 22, SYN);
    frame.truncate(40);
    assert_eq!(
        classify(&frame, no_blacklist, |_| panic!("no event")),
        Verdict::Drop
    );
}

#[test]
fn test_undersized_ihl_is_dropped() {
    let mut frame = tcp_frame(SRC, DST, 22, SYN);
    frame[14] = 0x42; // ihl 2 < 5
    assert_eq!(
        classify(&frame, no_blacklist, |_| panic!("no event")),
        Verdict::Drop
    );
}

#[test]
fn test_ip_options_shift_tcp_parse() {
    // ihl 6: one 4-byte option word before the TCP header.
    let mut frame = vec![0u8; 58];
    frame[12..14].copy_from_slice(&0x0800u16.to_be_bytes());
    frame[14] = 0x46; // version 4, ihl 6
    frame[23] = 6;
    frame[26..30].copy_from_slice(&SRC.to_be_bytes());
    frame[30..34].copy_from_slice(&DST.to_be_bytes());
    frame[40..42].copy_from_slice(&443u16.to_be_bytes());
    frame[50] = 0x50;
    frame[51] = SYN;

    let mut events = Vec::new();
    let verdict = classify(&frame, no_blacklist, |event| {
        events.push(event);
        true
    });
    assert_eq!(verdict, Verdict::Pass);
    assert_eq!(
        events,
        vec![SynEvent {
            host: SRC,
            dest: DST,
            port: 443
        }]
    );
}

#[test]
fn test_ipv6_passes_without_event() {
    let mut frame = vec![0u8; 54];
    frame[12..14].copy_from_slice(&0x86DDu16.to_be_bytes());
    for _ in 0..1000 {
        let verdict = classify(&frame, no_blacklist, |_| panic!("no event for IPv6"));
        assert_eq!(verdict, Verdict::Pass);
    }
}

#[test]
fn test_non_tcp_protocol_returns_held_verdict() {
    let mut frame = tcp_frame(SRC, DST, 22, SYN);
    frame[23] = 17; // UDP

    let verdict = classify(&frame, no_blacklist, |_| panic!("no event for UDP"));
    assert_eq!(verdict, Verdict::Pass);

    let verdict = classify(&frame, |host| host == SRC, |_| panic!("no event for UDP"));
    assert_eq!(verdict, Verdict::Drop);
}
