//! Host integrations that sit beside the engine: opening paths in the file
//! manager and resolving display names. Implementations are picked once per
//! host and injected where needed.

pub mod names;
pub mod opener;
