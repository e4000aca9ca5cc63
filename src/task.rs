use super::recycle::{Recycle, Recycler};
use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        LazyLock,
    },
};
use tokio_util::sync::CancellationToken;

pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Записи задач переиспользуются всеми пулами процесса
pub(crate) static TASK_RECORDS: LazyLock<Recycler<TaskRecord>> = LazyLock::new(Recycler::default);

/// Отложенная задача в очереди: контекст + функция
#[derive(Default)]
pub struct TaskRecord {
    ctx: Option<CancellationToken>,
    work: Option<Work>,
}

impl TaskRecord {
    pub fn fill(&mut self, ctx: CancellationToken, work: Work) {
        self.ctx = Some(ctx);
        self.work = Some(work);
    }

    #[inline]
    pub fn context(&self) -> Option<&CancellationToken> {
        self.ctx.as_ref()
    }

    #[inline]
    pub fn take_work(&mut self) -> Option<Work> {
        self.work.take()
    }

    #[cfg(test)]
    pub(crate) fn is_cleared(&self) -> bool {
        self.ctx.is_none() && self.work.is_none()
    }
}

impl Recycle for TaskRecord {
    fn clear(&mut self) {
        self.ctx = None;
        self.work = None;
    }
}

/// FIFO очередь задач пула. Один мутекс, держится только на время push/pop.
pub struct TaskQueue {
    list: Mutex<VecDeque<Box<TaskRecord>>>,
    pending: AtomicUsize,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            list: Mutex::new(VecDeque::new()),
            pending: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn push(&self, task: Box<TaskRecord>) {
        let mut list = self.list.lock();
        list.push_back(task);
        // Внутри лока: счетчик никогда не уходит ниже числа записей в списке
        self.pending.fetch_add(1, Ordering::Release);
    }

    #[inline]
    pub fn pop(&self) -> Option<Box<TaskRecord>> {
        self.pop_or_else(|| {})
    }

    /// Снимает голову очереди. Если очередь пуста, `on_empty` вызывается
    /// до отпускания лока.
    pub fn pop_or_else<F: FnOnce()>(&self, on_empty: F) -> Option<Box<TaskRecord>> {
        let mut list = self.list.lock();
        match list.pop_front() {
            Some(task) => {
                self.pending.fetch_sub(1, Ordering::Release);
                Some(task)
            }
            None => {
                on_empty();
                None
            }
        }
    }

    /// Приблизительное число задач, используется эвристикой масштабирования
    #[inline]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Relaxed)
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
