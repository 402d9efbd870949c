pub mod analyzer;
pub mod cancel;
pub mod deleter;
pub mod events;
pub mod fs;
pub mod group_scanner;
pub mod progress;
pub mod prober;
pub mod tree_builder;
