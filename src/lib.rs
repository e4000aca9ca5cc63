//! Легковесный самомасштабируемый пул воркеров
//!
//! # Features
//! - Неблокирующий fire-and-forget `run` / `run_with_context`
//! - Воркеры запускаются по требованию и завершаются, когда очередь пуста
//! - Паника задачи не убивает воркера: failure handler или лог через tracing
//! - Переиспользование записей задач и хэндлов воркеров (free-list)
//! - Глобальный реестр пулов по имени и пул по умолчанию
//!
//! ```no_run
//! use spawnpool::{Config, Pool};
//!
//! let pool = Pool::new("ingest", 16, Config::default());
//! pool.run(|| println!("hello from a worker"));
//! ```

pub mod errors;
pub mod model;
pub mod pool;
pub mod recycle;
pub mod registry;
pub mod task;
pub mod worker;

pub use errors::{PanicPayload, RegistryError};
pub use model::PoolMetrics;
pub use pool::{Config, FailureHandler, Pool, PoolHandle};
pub use registry::{
    create_pool, default_pool, lookup_pool, register_pool, run, run_with_context, set_capacity,
    set_failure_handler, worker_count,
};
pub use tokio_util::sync::CancellationToken;
