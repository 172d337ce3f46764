pub(crate) mod evidence;
pub(crate) mod mask;

pub use evidence::Evidence;
pub use mask::{EventLabel, EventMask, Run};
