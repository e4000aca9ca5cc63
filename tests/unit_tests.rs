#[cfg(test)]
mod tests {
    use parking_lot::Mutex;
    use spawnpool::{
        lookup_pool, register_pool, CancellationToken, Config, Pool, RegistryError,
    };
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread,
        time::{Duration, Instant},
    };
    use tokio::sync::{mpsc, oneshot};

    fn gate() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    fn wait_gate(gate: &AtomicBool) {
        while !gate.load(Ordering::Acquire) {
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[tokio::test]
    async fn test_fifo_single_worker() {
        println!("\n=== TEST: Порядок FIFO при capacity = 1 ===");
        let pool = Pool::new("unit.fifo", 1, Config::default());
        let log = Arc::new(Mutex::new(Vec::new()));

        for i in 0..500 {
            let log = log.clone();
            pool.run(move || log.lock().push(i));
            assert!(pool.worker_count() <= 1);
        }

        assert!(pool.join_idle_timeout(Duration::from_secs(5)).await, "pool did not drain");
        assert_eq!(*log.lock(), (0..500).collect::<Vec<_>>());
        println!("  ✓ 500 задач выполнены по порядку");
    }

    #[tokio::test]
    async fn test_liveness_after_drain() {
        println!("\n=== TEST: Новый воркер после завершения всех ===");
        let pool = Pool::new("unit.liveness", 4, Config::default());

        let (tx, rx) = oneshot::channel();
        pool.run(move || {
            let _ = tx.send(());
        });
        tokio::time::timeout(Duration::from_secs(1), rx).await.unwrap().unwrap();
        assert!(pool.join_idle_timeout(Duration::from_secs(1)).await);
        assert_eq!(pool.worker_count(), 0);

        let open = gate();
        let (tx, rx) = oneshot::channel();
        let g = open.clone();
        pool.run(move || {
            wait_gate(&g);
            let _ = tx.send(());
        });
        assert!(pool.worker_count() >= 1, "submit after drain must spawn a worker");

        open.store(true, Ordering::Release);
        tokio::time::timeout(Duration::from_secs(1), rx)
            .await
            .expect("task after drain never ran")
            .unwrap();
        assert!(pool.join_idle_timeout(Duration::from_secs(1)).await);
        println!("  ✓ Задача после простоя выполнена");
    }

    #[tokio::test]
    async fn test_fault_isolation_with_handler() {
        println!("\n=== TEST: Паника задачи и failure handler ===");
        let pool = Pool::new("unit.fault", 1, Config::default());
        let (events_tx, mut events) = mpsc::unbounded_channel::<String>();

        let handler_tx = events_tx.clone();
        pool.set_failure_handler(move |ctx, panic| {
            let _ = handler_tx.send(format!(
                "handler:{}:{}",
                panic.message().unwrap_or("?"),
                ctx.is_cancelled()
            ));
        });

        // Контекст только передается хендлеру, задача все равно выполняется
        let ctx = CancellationToken::new();
        ctx.cancel();
        pool.run_with_context(ctx, || panic!("boom"));

        let next_tx = events_tx.clone();
        pool.run(move || {
            let _ = next_tx.send("next".into());
        });

        let first = tokio::time::timeout(Duration::from_secs(1), events.recv()).await.unwrap();
        let second = tokio::time::timeout(Duration::from_secs(1), events.recv()).await.unwrap();
        assert_eq!(first.as_deref(), Some("handler:boom:true"));
        assert_eq!(second.as_deref(), Some("next"));

        assert!(pool.join_idle_timeout(Duration::from_secs(1)).await);
        let metrics = pool.metrics();
        assert_eq!(metrics.panicked, 1);
        assert_eq!(metrics.completed, 1);
        println!("  ✓ Handler вызван, следующая задача выполнена");
    }

    #[tokio::test]
    async fn test_fault_isolation_without_handler() {
        println!("\n=== TEST: Паника без handler ===");
        let pool = Pool::new("unit.fault.default", 1, Config::default());

        pool.run(|| panic!("unhandled"));
        let (tx, rx) = oneshot::channel();
        pool.run(move || {
            let _ = tx.send(7);
        });

        let v = tokio::time::timeout(Duration::from_secs(1), rx).await.unwrap().unwrap();
        assert_eq!(v, 7);
        assert!(pool.join_idle_timeout(Duration::from_secs(1)).await);
        assert_eq!(pool.metrics().panicked, 1);
        println!("  ✓ Воркер пережил панику");
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        println!("\n=== TEST: Паника внутри failure handler ===");
        let pool = Pool::new("unit.fault.handler", 1, Config::default());
        pool.set_failure_handler(|_, _| panic!("handler broke"));

        pool.run(|| panic!("task broke"));
        let (tx, rx) = oneshot::channel();
        pool.run(move || {
            let _ = tx.send(());
        });

        assert!(tokio::time::timeout(Duration::from_secs(1), rx).await.is_ok());
        assert!(pool.join_idle_timeout(Duration::from_secs(1)).await);
        println!("  ✓ Воркер продолжил работу");
    }

    #[tokio::test]
    async fn test_handler_replaced_at_runtime() {
        println!("\n=== TEST: Замена failure handler ===");
        let pool = Pool::new("unit.fault.swap", 1, Config::default());
        let (tx, mut rx) = mpsc::unbounded_channel::<&'static str>();

        let old = tx.clone();
        pool.set_failure_handler(move |_, _| {
            let _ = old.send("old");
        });
        pool.run(|| panic!("first"));
        assert_eq!(
            tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap(),
            Some("old")
        );
        assert!(pool.join_idle_timeout(Duration::from_secs(1)).await);

        let new = tx.clone();
        pool.set_failure_handler(move |_, _| {
            let _ = new.send("new");
        });
        pool.run(|| panic!("second"));
        assert_eq!(
            tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap(),
            Some("new")
        );
        println!("  ✓ Используется новый handler");
    }

    #[tokio::test]
    async fn test_submit_is_non_blocking() {
        println!("\n=== TEST: run() не блокируется ===");
        let pool = Pool::new("unit.nonblocking", 2, Config::default());
        let open = gate();

        for _ in 0..2 {
            let g = open.clone();
            pool.run(move || wait_gate(&g));
        }

        let start = Instant::now();
        for _ in 0..10_000 {
            pool.run(|| {});
        }
        let elapsed = start.elapsed();
        println!("  10k submit: {:?}", elapsed);

        assert!(elapsed < Duration::from_secs(2), "submit blocked: {:?}", elapsed);
        assert!(pool.worker_count() <= 2);
        assert!(pool.pending() > 0);

        open.store(true, Ordering::Release);
        assert!(pool.join_idle_timeout(Duration::from_secs(5)).await);
        assert_eq!(pool.metrics().completed, 10_002);
        println!("  ✓ Все задачи выполнены после открытия gate");
    }

    #[tokio::test]
    async fn test_registry_duplicate_rejected() {
        println!("\n=== TEST: Повторная регистрация имени ===");
        let first = Pool::new("unit.registry", 2, Config::default());
        let second = Pool::new("unit.registry", 3, Config::default());

        register_pool(first.clone()).unwrap();
        match register_pool(second) {
            Err(RegistryError::Duplicate(name)) => assert_eq!(name, "unit.registry"),
            other => panic!("expected duplicate error, got {:?}", other),
        }

        let found = lookup_pool("unit.registry").unwrap();
        assert!(Arc::ptr_eq(&found, &first));
        assert!(lookup_pool("unit.registry.missing").is_none());
        println!("  ✓ Первый пул остался в реестре");
    }

    #[tokio::test]
    async fn test_default_pool_helpers() {
        println!("\n=== TEST: Пул по умолчанию ===");
        let (tx, rx) = oneshot::channel();
        spawnpool::run(move || {
            let _ = tx.send(1);
        });
        assert_eq!(tokio::time::timeout(Duration::from_secs(1), rx).await.unwrap().unwrap(), 1);

        let ctx = CancellationToken::new();
        let (tx, rx) = oneshot::channel();
        spawnpool::run_with_context(ctx.child_token(), move || {
            let _ = tx.send(2);
        });
        assert_eq!(tokio::time::timeout(Duration::from_secs(1), rx).await.unwrap().unwrap(), 2);

        assert!(spawnpool::worker_count() <= spawnpool::default_pool().capacity().max(1));
        println!("  ✓ run / run_with_context работают");
    }

    #[tokio::test]
    async fn test_default_pool_setters() {
        println!("\n=== TEST: set_capacity / set_failure_handler пула по умолчанию ===");
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        spawnpool::set_failure_handler(move |_, panic| {
            let _ = tx.send(panic.to_string());
        });

        spawnpool::run(|| panic!("default pool failure"));
        let got = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
        assert_eq!(got.as_deref(), Some("default pool failure"));
        spawnpool::default_pool().clear_failure_handler();

        spawnpool::set_capacity(8);
        assert_eq!(spawnpool::default_pool().capacity(), 8);
        spawnpool::set_capacity(spawnpool::registry::DEFAULT_POOL_CAPACITY);
        assert_eq!(spawnpool::default_pool().capacity(), 1000);
        println!("  ✓ Handler сработал, capacity изменена и восстановлена");
    }
}
