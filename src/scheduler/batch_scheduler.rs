use futures::future::join_all;
use std::future::Future;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

/// Progress snapshot emitted after each completed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub batch: usize,
    pub total_batches: usize,
    pub processed: usize,
    pub total: usize,
    pub elapsed: Duration,
}

impl BatchProgress {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.processed as f64 / self.total as f64) * 100.0
        }
    }
}

/// Runs jobs in consecutive batches of at most `batch_size`. Jobs within a
/// batch run concurrently; the next batch starts only after every job in the
/// current one has finished. Results come back in input order.
///
/// Jobs are infallible from the scheduler's point of view: failure must be
/// encoded in `R`.
pub async fn run_batches<T, R, F, Fut>(
    items: Vec<T>,
    batch_size: NonZeroUsize,
    job: F,
    progress_callback: Option<&(dyn Fn(&BatchProgress) + Send + Sync)>,
) -> Vec<R>
where
    F: Fn(T) -> Fut,
    Fut: Future<Output = R>,
{
    let total = items.len();
    let size = batch_size.get();
    let total_batches = total.div_ceil(size);
    let start_time = Instant::now();

    let mut results = Vec::with_capacity(total);
    let mut remaining = items.into_iter();

    for batch in 1..=total_batches {
        let futures: Vec<Fut> = remaining.by_ref().take(size).map(&job).collect();
        results.extend(join_all(futures).await);

        if let Some(callback) = progress_callback {
            callback(&BatchProgress {
                batch,
                total_batches,
                processed: results.len(),
                total,
                elapsed: start_time.elapsed(),
            });
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[tokio::test]
    async fn test_batches_run_in_order_with_barrier() {
        let events = Arc::new(Mutex::new(Vec::<String>::new()));
        let items = vec![("a", 30u64), ("b", 5), ("c", 20), ("d", 1), ("e", 1)];

        let job = |(name, delay): (&'static str, u64)| {
            let events = events.clone();
            async move {
                events.lock().unwrap().push(format!("start {}", name));
                tokio::time::sleep(Duration::from_millis(delay)).await;
                events.lock().unwrap().push(format!("end {}", name));
                name
            }
        };

        let results = run_batches(items, size(2), job, None).await;
        assert_eq!(results, vec!["a", "b", "c", "d", "e"]);

        let events = events.lock().unwrap().clone();
        let pos = |event: &str| events.iter().position(|e| e == event).unwrap();

        // Every job of a batch ends before any job of the next batch starts
        assert!(pos("end a") < pos("start c"));
        assert!(pos("end b") < pos("start c"));
        assert!(pos("end c") < pos("start e"));
        assert!(pos("end d") < pos("start e"));

        // Jobs within a batch overlap
        assert!(pos("start b") < pos("end a"));
    }

    #[tokio::test]
    async fn test_progress_reported_per_batch() {
        let seen = Mutex::new(Vec::new());
        let callback = |progress: &BatchProgress| {
            seen.lock().unwrap().push((progress.batch, progress.processed, progress.total));
        };

        let results = run_batches(
            (1..=5).collect::<Vec<u32>>(),
            size(2),
            |n| async move { n * 10 },
            Some(&callback),
        )
        .await;

        assert_eq!(results, vec![10, 20, 30, 40, 50]);
        assert_eq!(*seen.lock().unwrap(), vec![(1, 2, 5), (2, 4, 5), (3, 5, 5)]);
    }

    #[tokio::test]
    async fn test_concurrency_never_exceeds_batch_size() {
        let active = Arc::new(Mutex::new((0usize, 0usize))); // (current, max)

        let job = |_: usize| {
            let active = active.clone();
            async move {
                {
                    let mut guard = active.lock().unwrap();
                    guard.0 += 1;
                    guard.1 = guard.1.max(guard.0);
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.lock().unwrap().0 -= 1;
            }
        };

        run_batches((0..10).collect(), size(3), job, None).await;
        assert_eq!(active.lock().unwrap().1, 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let called = Mutex::new(0);
        let callback = |_: &BatchProgress| *called.lock().unwrap() += 1;
        let results: Vec<u8> = run_batches(Vec::<u8>::new(), size(4), |n| async move { n }, Some(&callback)).await;
        assert!(results.is_empty());
        assert_eq!(*called.lock().unwrap(), 0);
    }

    #[test]
    fn test_progress_percentage() {
        let progress = BatchProgress {
            batch: 1,
            total_batches: 2,
            processed: 5,
            total: 10,
            elapsed: Duration::ZERO,
        };
        assert_eq!(progress.percentage(), 50.0);
    }
}
