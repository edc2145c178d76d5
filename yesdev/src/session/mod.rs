//! Session layer: handle identifiers and the registry that creates one
//! pattern cache per open handle.

mod handle;
mod registry;

pub use handle::SessionHandle;
pub use registry::SessionRegistry;
