use std::fmt;
use std::net::Ipv4Addr;

use crate::window::PortSet;

/// Body of a port-scan report line: `source -> dest on ports 22 23 80`.
///
/// Logged at INFO; the subscriber prefixes the ISO-8601 timestamp.
pub struct ScanReport<'a> {
    pub source: u32,
    pub dest: u32,
    pub ports: &'a PortSet,
}

impl fmt::Display for ScanReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} on ports",
            Ipv4Addr::from(self.source),
            Ipv4Addr::from(self.dest)
        )?;
        for port in self.ports.ports() {
            write!(f, " {port}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowStore;

    #[test]
    fn test_report_line_format() {
        let mut store = WindowStore::new();
        store.insert(0x0A00_0001, 0xC0A8_0101, 443);
        store.insert(0x0A00_0001, 0xC0A8_0101, 22);
        store.insert(0x0A00_0001, 0xC0A8_0101, 80);
        let (host, set) = store.iter_current().next().expect("entry exists");

        let line = format!(
            "{}",
            ScanReport {
                source: host,
                dest: set.dest(),
                ports: set
            }
        );
        assert_eq!(line, "10.0.0.1 -> 192.168.1.1 on ports 22 80 443");
    }
}
