use aya::maps::{HashMap, Map, MapData, MapError};

use synward_lib::engine::{Blacklist, BlacklistError};

use crate::FilterError;

const BPF_NOEXIST: u64 = 1;
const BLOCKED: u8 = 1;

/// Write handle over the kernel blacklist map.
///
/// The XDP program only ever reads; all mutation is serialized through this
/// handle on the control-plane task. Keys are source IPv4 addresses in host
/// byte order, the value is a presence sentinel.
pub struct BlacklistHandle {
    map: HashMap<MapData, u32, u8>,
}

impl BlacklistHandle {
    pub(crate) fn new(map: Map) -> Result<Self, FilterError> {
        Ok(Self { map: HashMap::try_from(map)? })
    }
}

impl Blacklist for BlacklistHandle {
    fn contains(&self, host: u32) -> bool {
        self.map.get(&host, 0).is_ok()
    }

    fn insert_if_absent(&mut self, host: u32) -> Result<(), BlacklistError> {
        match self.map.insert(host, BLOCKED, BPF_NOEXIST) {
            Ok(()) => Ok(()),
            // Already present: the precondition makes this a no-op.
            Err(ref err) if errno_is(err, libc::EEXIST) => Ok(()),
            Err(ref err) if errno_is(err, libc::E2BIG) => Err(BlacklistError::Capacity),
            Err(err) => Err(BlacklistError::Map(err.to_string())),
        }
    }

    fn remove(&mut self, host: u32) -> Result<(), BlacklistError> {
        match self.map.remove(&host) {
            Ok(()) => Ok(()),
            // Absent already: the removal is a no-op.
            Err(ref err) if errno_is(err, libc::ENOENT) => Ok(()),
            Err(err) => Err(BlacklistError::Map(err.to_string())),
        }
    }
}

fn errno_is(err: &MapError, errno: i32) -> bool {
    match err {
        MapError::SyscallError(sys) => sys.io_error.raw_os_error() == Some(errno),
        _ => false,
    }
}
