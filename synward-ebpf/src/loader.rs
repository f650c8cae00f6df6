use aya::programs::{Xdp, XdpFlags};
use aya::Ebpf;
use tracing::info;

use synward_ebpf_common::{BLACKLIST_MAP, EVENTS_MAP};

use crate::blacklist::BlacklistHandle;
use crate::events::EventRing;
use crate::FilterError;

/// Raw bytes of the compiled XDP BPF object, embedded at compile time.
/// `include_bytes_aligned!` ensures 8-byte alignment required by aya's ELF parser.
static XDP_BPF_BYTES: &[u8] = aya::include_bytes_aligned!(concat!(env!("OUT_DIR"), "/xdp.bpf.o"));

const PROGRAM_NAME: &str = "synward_filter";

/// Owns the loaded XDP SYN filter for the lifetime of the process.
///
/// Dropping the filter detaches the program and closes its maps, so kernel
/// resources are released in reverse creation order on shutdown.
pub struct SynFilter {
    ebpf: Ebpf,
    interface: String,
}

impl SynFilter {
    /// Load the XDP program into the kernel and attach it to `interface`.
    pub fn attach(interface: &str) -> Result<Self, FilterError> {
        // BPF map creation charges against RLIMIT_MEMLOCK; lift the limit
        // before the load so the ring buffer and blacklist map fit.
        unsafe {
            let rlim =
                libc::rlimit { rlim_cur: libc::RLIM_INFINITY, rlim_max: libc::RLIM_INFINITY };
            let _ = libc::setrlimit(libc::RLIMIT_MEMLOCK, &rlim);
        }

        let mut ebpf = Ebpf::load(XDP_BPF_BYTES).map_err(FilterError::Load)?;

        let program: &mut Xdp = ebpf
            .program_mut(PROGRAM_NAME)
            .ok_or(FilterError::ProgramNotFound)?
            .try_into()
            .map_err(FilterError::ProgramType)?;

        program.load().map_err(FilterError::ProgramLoad)?;
        program
            .attach(interface, XdpFlags::default())
            .map_err(FilterError::Attach)?;

        info!(interface, "XDP SYN filter attached");

        Ok(Self { ebpf, interface: interface.to_string() })
    }

    /// Take ownership of the blacklist write handle. Call at most once.
    pub fn take_blacklist(&mut self) -> Result<BlacklistHandle, FilterError> {
        let map = self
            .ebpf
            .take_map(BLACKLIST_MAP)
            .ok_or(FilterError::MapNotFound(BLACKLIST_MAP))?;
        BlacklistHandle::new(map)
    }

    /// Take ownership of the event ring consumer. Call at most once.
    pub fn take_events(&mut self) -> Result<EventRing, FilterError> {
        let map = self
            .ebpf
            .take_map(EVENTS_MAP)
            .ok_or(FilterError::MapNotFound(EVENTS_MAP))?;
        EventRing::new(map)
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}
