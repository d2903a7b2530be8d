pub mod export;
pub mod pipeline;
pub mod scan;
pub mod session;
pub mod stats;
pub mod store;

pub use scan::Scanner;
pub use session::ScanSession;
pub use stats::ScanStats;
pub use store::ResultStore;
