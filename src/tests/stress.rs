//! Stress tests: contention, many workers, cancellation under load.

#[cfg(test)]
mod stress_tests {
    use crate::sync::{CondVar, Lock};
    use crate::tests::{init_logging, wait_until, EVENTUALLY};
    use crate::worker::{Worker, WorkerState};
    use portable_atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn mutual_exclusion_under_contention() {
        init_logging();
        const THREADS: usize = 8;
        const ITERATIONS: usize = 10_000;

        let lock = Lock::new();
        // The increment is a deliberate non-atomic read-modify-write; only
        // the lock keeps it from losing updates.
        let counter = Arc::new(AtomicU64::new(0));

        let mut workers = Vec::with_capacity(THREADS);
        for id in 0..THREADS {
            let lock = lock.clone();
            let counter = Arc::clone(&counter);
            let worker = Worker::builder().name(format!("mutex-{id}")).build(move || {
                for _ in 0..ITERATIONS {
                    lock.acquire();
                    let value = counter.load(Ordering::Relaxed);
                    counter.store(value + 1, Ordering::Relaxed);
                    lock.release().unwrap();
                }
            });
            worker.start().unwrap();
            workers.push(worker);
        }

        for worker in &workers {
            worker.join().unwrap();
        }
        assert_eq!(
            counter.load(Ordering::SeqCst),
            (THREADS * ITERATIONS) as u64
        );
    }

    #[test]
    fn many_workers_run_once_each() {
        init_logging();
        const WORKERS: usize = 32;

        let counter = Arc::new(AtomicUsize::new(0));
        let mut workers = Vec::with_capacity(WORKERS);
        for id in 0..WORKERS {
            let counter = Arc::clone(&counter);
            let worker = Worker::builder().name(format!("batch-{id}")).build(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            worker.start().unwrap();
            workers.push(worker);
        }

        for worker in &workers {
            worker.join().unwrap();
            assert_eq!(worker.state(), WorkerState::Finished);
        }
        assert_eq!(counter.load(Ordering::SeqCst), WORKERS);
    }

    #[test]
    fn producer_consumer_handoff() {
        init_logging();
        const ITEMS: usize = 1_000;

        let lock = Lock::new();
        let items_ready = CondVar::new();
        items_ready.bind(&lock).unwrap();

        // Guarded by `lock`; the atomic is just a shared cell.
        let queued = Arc::new(AtomicUsize::new(0));
        let consumed_total = Arc::new(AtomicUsize::new(0));

        let consumer = {
            let lock = lock.clone();
            let items_ready = items_ready.clone();
            let queued = Arc::clone(&queued);
            let consumed_total = Arc::clone(&consumed_total);
            Worker::builder().name("consumer").build(move || {
                let mut consumed = 0usize;
                lock.acquire();
                while consumed < ITEMS {
                    while queued.load(Ordering::Relaxed) == 0 {
                        items_ready.wait(&lock).unwrap();
                    }
                    let backlog = queued.load(Ordering::Relaxed);
                    queued.store(backlog - 1, Ordering::Relaxed);
                    consumed += 1;
                }
                lock.release().unwrap();
                consumed_total.store(consumed, Ordering::SeqCst);
            })
        };

        let producer = {
            let lock = lock.clone();
            let items_ready = items_ready.clone();
            let queued = Arc::clone(&queued);
            Worker::builder().name("producer").build(move || {
                for _ in 0..ITEMS {
                    lock.acquire();
                    let backlog = queued.load(Ordering::Relaxed);
                    queued.store(backlog + 1, Ordering::Relaxed);
                    items_ready.signal().unwrap();
                    lock.release().unwrap();
                }
            })
        };

        consumer.start().unwrap();
        producer.start().unwrap();
        producer.join().unwrap();
        consumer.join().unwrap();

        assert_eq!(consumed_total.load(Ordering::SeqCst), ITEMS);
        assert_eq!(queued.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn cancelling_a_crowd_of_waiters() {
        init_logging();
        const WAITERS: usize = 16;

        let lock = Lock::new();
        let never_signalled = CondVar::new();
        never_signalled.bind(&lock).unwrap();

        let mut workers = Vec::with_capacity(WAITERS);
        for id in 0..WAITERS {
            let lock = lock.clone();
            let never_signalled = never_signalled.clone();
            let worker = Worker::builder().name(format!("waiter-{id}")).build(move || {
                lock.acquire();
                loop {
                    match never_signalled.wait(&lock) {
                        // Interrupted: this waiter was cancelled.
                        Err(_) => break,
                        // Woken by a neighbour's cancellation; park again.
                        Ok(()) => {
                            if crate::is_interrupted() {
                                break;
                            }
                        }
                    }
                }
                lock.release().unwrap();
            });
            worker.start().unwrap();
            workers.push(worker);
        }

        assert!(wait_until(EVENTUALLY, || never_signalled.has_waiters()));

        for worker in &workers {
            worker.cancel();
        }
        for worker in &workers {
            worker.join().unwrap();
            assert_eq!(worker.state(), WorkerState::Finished);
        }
        assert!(!never_signalled.has_waiters());
    }
}
