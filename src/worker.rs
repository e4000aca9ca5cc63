//! Воркер: снимает задачи из очереди пула и выполняет их по одной,
//! пока очередь не опустеет, затем завершается.

use super::{
    errors::PanicPayload,
    pool::{Pool, PoolHandle},
    recycle::{Recycle, Recycler},
    task::{TaskRecord, TASK_RECORDS},
};
use std::{
    backtrace::Backtrace,
    cell::Cell,
    io,
    panic::{self, AssertUnwindSafe},
    sync::{LazyLock, Once},
    thread,
};

pub(crate) static WORKER_HANDLES: LazyLock<Recycler<Worker>> = LazyLock::new(Recycler::default);

static PANIC_HOOK: Once = Once::new();

thread_local! {
    static IN_TASK: Cell<bool> = const { Cell::new(false) };
    static PANIC_TRACE: Cell<Option<Backtrace>> = const { Cell::new(None) };
}

/// Ставит panic hook поверх текущего. Внутри задачи пула hook только
/// сохраняет backtrace места паники; stderr не трогается, о панике
/// сообщает failure handler или `tracing::error!`. Вне задач работает
/// предыдущий hook.
pub(crate) fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if IN_TASK.with(Cell::get) {
                PANIC_TRACE.with(|trace| trace.set(Some(Backtrace::force_capture())));
            } else {
                previous(info);
            }
        }));
    });
}

/// `catch_unwind` с пометкой потока, что паника пришла из пользовательского кода
fn guarded<R>(f: impl FnOnce() -> R) -> thread::Result<R> {
    PANIC_TRACE.with(Cell::take);
    IN_TASK.with(|flag| flag.set(true));
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    IN_TASK.with(|flag| flag.set(false));
    result
}

/// Backtrace последней паники в `guarded` на этом потоке
fn take_panic_trace() -> Option<Backtrace> {
    PANIC_TRACE.with(Cell::take)
}

#[derive(Default)]
pub struct Worker {
    pool: Option<PoolHandle>,
}

impl Recycle for Worker {
    fn clear(&mut self) {
        self.pool = None;
    }
}

impl Worker {
    #[inline]
    pub(crate) fn bind(&mut self, pool: PoolHandle) {
        self.pool = Some(pool);
    }

    #[cfg(test)]
    pub(crate) fn is_bound(&self) -> bool {
        self.pool.is_some()
    }

    /// Запускает цикл воркера в отдельном потоке
    pub(crate) fn start(self: Box<Self>) -> io::Result<()> {
        let mut builder = thread::Builder::new();
        if let Some(pool) = &self.pool {
            builder = builder.name(pool.name().to_owned());
            if let Some(stack_size) = pool.config().stack_size {
                builder = builder.stack_size(stack_size);
            }
        }
        builder.spawn(move || self.run()).map(|_| ())
    }

    fn run(mut self: Box<Self>) {
        if let Some(pool) = self.pool.take() {
            drain(&pool);
        }
        WORKER_HANDLES.release(self);
    }
}

fn drain(pool: &Pool) {
    loop {
        let mut last = false;
        // Счетчик воркеров уменьшается под локом очереди: сабмиттер,
        // положивший задачу после этой проверки, увидит уменьшенное значение
        let task = pool.queue().pop_or_else(|| last = pool.release_worker_slot());

        let Some(mut task) = task else {
            tracing::trace!(pool = %pool.name(), workers = pool.worker_count(), "worker retired");
            if last {
                pool.notify_idle();
            }
            return;
        };

        execute(pool, &mut task);
        TASK_RECORDS.release(task);
    }
}

fn execute(pool: &Pool, task: &mut TaskRecord) {
    let Some(work) = task.take_work() else {
        return;
    };

    let payload = match guarded(work) {
        Ok(()) => {
            pool.record_completed();
            return;
        }
        Err(payload) => PanicPayload::new(payload),
    };
    // Hook может быть заменен пользователем, тогда остается стек воркера
    let backtrace = take_panic_trace().unwrap_or_else(Backtrace::force_capture);
    pool.record_panicked();

    let ctx = task.context().unwrap_or_else(|| pool.background());
    match pool.failure_handler() {
        Some(handler) => {
            if let Err(nested) = guarded(|| handler(ctx, &payload)) {
                tracing::error!(
                    pool = %pool.name(),
                    panic = %payload,
                    handler_panic = %PanicPayload::new(nested),
                    backtrace = %backtrace,
                    "failure handler panicked"
                );
            }
        }
        None => {
            tracing::error!(
                pool = %pool.name(),
                panic = %payload,
                backtrace = %backtrace,
                "task panicked"
            );
        }
    }
}
