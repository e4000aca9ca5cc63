//! Глобальный реестр пулов по имени и пул по умолчанию.

use super::{
    errors::{PanicPayload, RegistryError},
    pool::{Config, Pool, PoolHandle},
};
use parking_lot::RwLock;
use std::{
    collections::{hash_map::Entry, HashMap},
    sync::LazyLock,
};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POOL_NAME: &str = "spawnpool.default";
pub const DEFAULT_POOL_CAPACITY: usize = 1000;

static REGISTRY: LazyLock<RwLock<HashMap<String, PoolHandle>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

static DEFAULT_POOL: LazyLock<PoolHandle> =
    LazyLock::new(|| Pool::new(DEFAULT_POOL_NAME, DEFAULT_POOL_CAPACITY, Config::default()));

/// Создает пул, не регистрируя его
#[inline]
pub fn create_pool(name: impl Into<String>, capacity: usize, config: Config) -> PoolHandle {
    Pool::new(name, capacity, config)
}

/// Регистрирует пул под его именем. Существующую запись не перезаписывает.
pub fn register_pool(pool: PoolHandle) -> Result<(), RegistryError> {
    let mut registry = REGISTRY.write();
    match registry.entry(pool.name().to_owned()) {
        Entry::Occupied(entry) => Err(RegistryError::Duplicate(entry.key().clone())),
        Entry::Vacant(entry) => {
            tracing::debug!(pool = %pool.name(), "pool registered");
            entry.insert(pool);
            Ok(())
        }
    }
}

pub fn lookup_pool(name: &str) -> Option<PoolHandle> {
    REGISTRY.read().get(name).cloned()
}

/// Пул по умолчанию: capacity 1000, порог 1, создается при первом обращении
#[inline]
pub fn default_pool() -> &'static PoolHandle {
    &DEFAULT_POOL
}

#[inline]
pub fn run<F>(work: F)
where
    F: FnOnce() + Send + 'static,
{
    default_pool().run(work);
}

#[inline]
pub fn run_with_context<F>(ctx: CancellationToken, work: F)
where
    F: FnOnce() + Send + 'static,
{
    default_pool().run_with_context(ctx, work);
}

pub fn set_capacity(capacity: usize) {
    default_pool().set_capacity(capacity);
}

pub fn set_failure_handler<F>(handler: F)
where
    F: Fn(&CancellationToken, &PanicPayload) + Send + Sync + 'static,
{
    default_pool().set_failure_handler(handler);
}

pub fn worker_count() -> usize {
    default_pool().worker_count()
}
