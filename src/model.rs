/// Снимок счетчиков пула. Значения читаются Relaxed и носят справочный характер.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolMetrics {
    pub workers: usize,
    pub pending: usize,
    pub capacity: usize,
    pub submitted: usize,
    pub completed: usize,
    pub panicked: usize,
    pub spawned_workers: usize,
}

impl PoolMetrics {
    /// Задачи, которые приняты, но еще не завершились (в очереди или выполняются)
    pub fn in_flight(&self) -> usize {
        self.submitted.saturating_sub(self.completed + self.panicked)
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.completed + self.panicked;
        if total == 0 {
            return 1.0;
        }
        self.completed as f64 / total as f64
    }

    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.0;
        }
        self.workers as f64 / self.capacity as f64
    }
}
