//!  Local tracking state is organized through [store::Store].
//!  The basic idea is:
//!   - Projects form a tree addressed by `/` separated paths.
//!   - Every project node keeps the frames recorded for it, in insertion order.
//!   - At most one session is running at a time, stopping it turns it into a frame.
//!   - The whole state lives in a single JSON file that is rewritten on every save.

pub mod session;
pub mod store;
pub mod timestamp;
pub mod tree;
