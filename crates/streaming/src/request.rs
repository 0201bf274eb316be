/// Identifies one load pass issued by a [`crate::LayerStore`].
///
/// Tickets are ordered by issue time; only the most recent one may commit.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(pub u64);
