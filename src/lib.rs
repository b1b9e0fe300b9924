pub mod config;
pub mod report;
pub mod sink;
pub mod source;
pub mod storage;
pub mod trend;
