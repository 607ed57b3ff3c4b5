mod gc;
mod handle;
pub mod node;
mod trace;

pub use gc::{Collection, HeapStats, GC};
pub use handle::Handle;
pub use node::Node;

use trace::Traced;
