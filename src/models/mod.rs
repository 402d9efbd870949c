pub mod node;
pub mod scan_result;
