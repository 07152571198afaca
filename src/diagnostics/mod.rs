// Pipeline statistics and snapshots.

pub mod stats;
