//! API endpoint modules.

mod clock;
mod directory;
mod sync;

pub use clock::ClockApi;
pub use directory::DirectoryApi;
pub use sync::SyncApi;
