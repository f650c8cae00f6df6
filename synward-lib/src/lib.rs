#![forbid(unsafe_code)]

pub mod engine;
pub mod filter;
pub mod report;
pub mod window;

pub use engine::{Blacklist, BlacklistError, RateEngine};
pub use filter::{classify, Verdict};
pub use window::{PortSet, WindowStore};
