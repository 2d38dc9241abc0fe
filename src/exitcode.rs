//! Process exit codes (BSD sysexits.h compatible)

/// Successful termination
pub const OK: i32 = 0;

/// Command line usage error
pub const USAGE: i32 = 64;

/// Data format error (conflicting token)
pub const DATAERR: i32 = 65;

/// Addressee unknown (no token stored for user)
pub const NOUSER: i32 = 67;

/// Service unavailable (connection refused, timeout, DNS)
pub const UNAVAILABLE: i32 = 69;

/// Input/output error
pub const IOERR: i32 = 74;

/// Remote error in protocol (non-200 response)
pub const PROTOCOL: i32 = 76;
