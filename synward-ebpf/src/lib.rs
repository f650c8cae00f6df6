// eBPF/XDP is Linux-only. This crate does not compile for other targets.
#![cfg(target_os = "linux")]

pub mod blacklist;
pub mod events;
pub mod loader;

pub use blacklist::BlacklistHandle;
pub use events::EventRing;
pub use loader::SynFilter;

#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("failed to load BPF object: {0}")]
    Load(#[from] aya::EbpfError),

    #[error("XDP program 'synward_filter' not found in BPF object")]
    ProgramNotFound,

    #[error("BPF program is not an XDP program: {0}")]
    ProgramType(#[source] aya::programs::ProgramError),

    #[error("failed to load XDP program into kernel: {0}")]
    ProgramLoad(#[source] aya::programs::ProgramError),

    #[error("failed to attach XDP program to interface: {0}")]
    Attach(#[source] aya::programs::ProgramError),

    #[error("BPF map '{0}' not found in loaded object")]
    MapNotFound(&'static str),

    #[error("BPF map access failed: {0}")]
    Map(#[from] aya::maps::MapError),
}
