pub mod diagnostics;
pub mod storage;

pub use diagnostics::Diagnostics;
pub use storage::OutputStore;
