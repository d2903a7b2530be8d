pub mod extract;
pub mod query;
pub mod search;
pub mod synthesize;
