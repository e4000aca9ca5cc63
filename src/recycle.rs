//! Free-list переиспользуемых объектов (записи задач, хэндлы воркеров).
//!
//! Чистая оптимизация: корректность не зависит от того, вернулся ли объект
//! из списка или был создан заново.

use crossbeam::queue::ArrayQueue;

pub const DEFAULT_RECYCLER_SLOTS: usize = 1024;

/// Объект, который можно очистить перед возвратом в [`Recycler`]
pub trait Recycle: Default {
    /// Сбрасывает все поля, отпуская захваченные ссылки
    fn clear(&mut self);
}

pub struct Recycler<T> {
    free: ArrayQueue<Box<T>>,
}

impl<T: Recycle> Recycler<T> {
    pub fn new(slots: usize) -> Self {
        Self {
            free: ArrayQueue::new(slots.max(1)),
        }
    }

    #[inline]
    pub fn acquire(&self) -> Box<T> {
        self.free.pop().unwrap_or_default()
    }

    /// Очищает объект и кладет его обратно; если список полон, объект дропается
    #[inline]
    pub fn release(&self, mut item: Box<T>) {
        item.clear();
        let _ = self.free.push(item);
    }

    pub fn len(&self) -> usize {
        self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.free.is_empty()
    }
}

impl<T: Recycle> Default for Recycler<T> {
    fn default() -> Self {
        Self::new(DEFAULT_RECYCLER_SLOTS)
    }
}
