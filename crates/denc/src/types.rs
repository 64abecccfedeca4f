// ============= Basic types used across multiple crates =============

/// OSDMap epoch number
///
/// An epoch of 0 is never issued by the monitor and is used as "unset".
pub type Epoch = u32;

/// Generic version number
pub type Version = u64;
