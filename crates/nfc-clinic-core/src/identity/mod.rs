//! Identity Poller: background tag reads that yield a single UID.

mod cancel;
mod poller;
mod source;

pub use cancel::*;
pub use poller::*;
pub use source::*;
