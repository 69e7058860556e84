pub mod dead_letters;
pub mod dispatch;
pub mod logs;
pub mod pipeline;
pub mod snapshots;
pub mod summary;
