/// World tick counter stamped into snapshot packets.
pub type Tick = u32;

/// Server-assigned player identifier. Also the networked entity id of the
/// player's ship.
pub type PlayerId = u32;

/// Monotonic per-connection packet sequence number.
pub type SequenceNumber = u32;
