// 提交历史：分页加载、区间选择与对比
pub mod compare;
pub mod controller;
pub mod decoder;
pub mod models;
pub mod range;
pub mod store;

pub use compare::{DiffComparison, FileContentCache, FileDiff};
pub use controller::{HistoryController, PageLoad, DEFAULT_PAGE_SIZE};
pub use decoder::{CommitDecoder, JsonCommitDecoder};
pub use models::Commit;
pub use range::RangeSelector;
pub use store::CommitStore;
