//! Job queue and worker pool / 任务队列与工作池
//!
//! Jobs are rows in the `jobs` table, unique per (jobtype, remote_id). A
//! bounded pool of workers claims them; the query-worker cap is the
//! backpressure policy that bounds load on the shared index and store.

pub mod expire;
pub mod models;
pub mod queue;
pub mod worker;

pub use expire::DatasetExpirer;
pub use models::Job;
pub use queue::JobQueue;
pub use worker::WorkerPool;

/// Job type handled by the search engine / 搜索引擎处理的任务类型
pub const JOBTYPE_QUERY: &str = "query";
/// Job type of the recurring dataset expiry sweep / 数据集过期清理任务类型
pub const JOBTYPE_EXPIRE: &str = "expire-datasets";
