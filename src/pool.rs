use super::{
    errors::PanicPayload,
    model::PoolMetrics,
    task::{TaskQueue, TASK_RECORDS},
    worker::{install_panic_hook, WORKER_HANDLES},
};
use parking_lot::RwLock;
use std::{
    fmt,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};
use tokio::{sync::Notify, time::Duration};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_SCALE_THRESHOLD: usize = 1;

/// Конфигурация пула
#[derive(Debug, Clone)]
pub struct Config {
    /// Минимальное число задач в очереди, при котором пул добавляет воркера
    pub scale_threshold: usize,
    /// Размер стека потоков-воркеров, `None` — системный
    pub stack_size: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scale_threshold: DEFAULT_SCALE_THRESHOLD,
            stack_size: None,
        }
    }
}

impl Config {
    /// Любая очередь (в пределах capacity) — повод для нового воркера
    pub fn eager() -> Self {
        Self::default()
    }

    /// Новый воркер только когда в очереди накопилось `threshold` задач
    pub fn batched(threshold: usize) -> Self {
        Self {
            scale_threshold: threshold,
            ..Default::default()
        }
    }

    pub fn with_scale_threshold(mut self, threshold: usize) -> Self {
        self.scale_threshold = threshold;
        self
    }

    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }
}

pub type FailureHandler = dyn Fn(&CancellationToken, &PanicPayload) + Send + Sync + 'static;

pub type PoolHandle = Arc<Pool>;

/// Решение о запуске нового воркера.
///
/// Первое условие ограничивает число воркеров `capacity` и растит пул только
/// при накопившейся очереди. Второе гарантирует живость: если все воркеры
/// завершились, задача не должна зависнуть в очереди.
#[inline(always)]
pub(crate) fn should_spawn(pending: usize, workers: usize, capacity: usize, threshold: usize) -> bool {
    (pending >= threshold && workers < capacity) || workers == 0
}

/// Самомасштабируемый пул воркеров
pub struct Pool {
    name: String,
    capacity: AtomicUsize,
    config: Config,
    queue: TaskQueue,
    workers: AtomicUsize,
    failure_handler: RwLock<Option<Arc<FailureHandler>>>,
    background: CancellationToken,
    idle: Notify,
    submitted: AtomicUsize,
    completed: AtomicUsize,
    panicked: AtomicUsize,
    spawned_workers: AtomicUsize,
}

impl Pool {
    pub fn new(name: impl Into<String>, capacity: usize, mut config: Config) -> PoolHandle {
        let name = name.into();
        if config.scale_threshold == 0 {
            tracing::warn!(pool = %name, "scale_threshold 0 is not allowed, using 1");
            config.scale_threshold = 1;
        }
        tracing::debug!(pool = %name, capacity, scale_threshold = config.scale_threshold, "pool created");
        install_panic_hook();

        Arc::new(Pool {
            name,
            capacity: AtomicUsize::new(capacity),
            config,
            queue: TaskQueue::new(),
            workers: AtomicUsize::new(0),
            failure_handler: RwLock::new(None),
            background: CancellationToken::new(),
            idle: Notify::new(),
            submitted: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            panicked: AtomicUsize::new(0),
            spawned_workers: AtomicUsize::new(0),
        })
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Меняет capacity для будущих решений; уже запущенные воркеры не останавливаются
    #[inline]
    pub fn set_capacity(&self, capacity: usize) {
        self.capacity.store(capacity, Ordering::Release);
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity.load(Ordering::Acquire)
    }

    /// Число живых воркеров; значение может устареть сразу после чтения
    #[inline]
    pub fn worker_count(&self) -> usize {
        self.workers.load(Ordering::Acquire)
    }

    #[inline]
    pub fn pending(&self) -> usize {
        self.queue.pending()
    }

    /// Хендлер получает контекст задачи и payload паники. Паники задач не
    /// пишутся в stderr стандартным hook'ом: без хендлера они уходят в
    /// `tracing::error!` вместе с backtrace места паники.
    pub fn set_failure_handler<F>(&self, handler: F)
    where
        F: Fn(&CancellationToken, &PanicPayload) + Send + Sync + 'static,
    {
        *self.failure_handler.write() = Some(Arc::new(handler));
    }

    /// Возвращает пул к логированию паник через tracing
    pub fn clear_failure_handler(&self) {
        *self.failure_handler.write() = None;
    }

    #[inline]
    pub fn run<F>(self: &Arc<Self>, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.run_with_context(self.background.clone(), work);
    }

    /// Ставит задачу в очередь и при необходимости запускает воркера.
    /// Никогда не блокируется на выполнении задач.
    pub fn run_with_context<F>(self: &Arc<Self>, ctx: CancellationToken, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut task = TASK_RECORDS.acquire();
        task.fill(ctx, Box::new(work));
        self.queue.push(task);
        self.submitted.fetch_add(1, Ordering::Relaxed);

        if self.try_reserve_worker() {
            self.spawn_worker();
        }
    }

    #[inline]
    fn try_reserve_worker(&self) -> bool {
        let pending = self.queue.pending();
        let threshold = self.config.scale_threshold;
        self.workers
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |workers| {
                should_spawn(pending, workers, self.capacity(), threshold).then_some(workers + 1)
            })
            .is_ok()
    }

    fn spawn_worker(self: &Arc<Self>) {
        let mut worker = WORKER_HANDLES.acquire();
        worker.bind(Arc::clone(self));
        self.spawned_workers.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(pool = %self.name, workers = self.worker_count(), "worker spawned");

        if let Err(e) = worker.start() {
            tracing::warn!(pool = %self.name, error = %e, "failed to spawn worker thread");
            if self.release_worker_slot() {
                self.notify_idle();
            }
        }
    }

    /// Возвращает `true`, если завершился последний воркер
    #[inline]
    pub(crate) fn release_worker_slot(&self) -> bool {
        self.workers.fetch_sub(1, Ordering::AcqRel) == 1
    }

    #[inline]
    pub(crate) fn notify_idle(&self) {
        self.idle.notify_waiters();
    }

    #[inline]
    pub(crate) fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    #[inline]
    pub(crate) fn background(&self) -> &CancellationToken {
        &self.background
    }

    #[inline]
    pub(crate) fn failure_handler(&self) -> Option<Arc<FailureHandler>> {
        self.failure_handler.read().clone()
    }

    #[inline]
    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_panicked(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn is_idle(&self) -> bool {
        self.worker_count() == 0 && self.queue.pending() == 0
    }

    #[inline]
    pub fn metrics(&self) -> PoolMetrics {
        PoolMetrics {
            workers: self.workers.load(Ordering::Relaxed),
            pending: self.queue.pending(),
            capacity: self.capacity.load(Ordering::Relaxed),
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            spawned_workers: self.spawned_workers.load(Ordering::Relaxed),
        }
    }

    /// Ждет, пока очередь опустеет и все воркеры завершатся
    pub async fn join_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }

    pub async fn join_idle_timeout(&self, timeout: Duration) -> bool {
        tokio::time::timeout(timeout, self.join_idle()).await.is_ok()
    }
}

impl fmt::Debug for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("name", &self.name)
            .field("capacity", &self.capacity())
            .field("workers", &self.worker_count())
            .field("pending", &self.pending())
            .field("config", &self.config)
            .finish()
    }
}
