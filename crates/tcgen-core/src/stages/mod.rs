//! The four pipeline stages and the worker pool they share.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub mod filter;
pub mod synth;
pub mod taxonomy;
pub mod validate;

/// Run `task` over `items` with at most `parallel` in flight and return the outputs
/// sorted by item index, not completion order.
///
/// Once an output satisfies `halts`, no further items are started; items already in
/// flight still complete. With `parallel == 1` nothing runs after the halting item.
pub(crate) async fn run_indexed<I, T, F, Fut>(
    items: Vec<I>,
    parallel: usize,
    task: F,
    halts: fn(&T) -> bool,
) -> Vec<T>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(usize, I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    let sem = Arc::new(Semaphore::new(parallel.max(1)));
    let halted = Arc::new(AtomicBool::new(false));
    let task = Arc::new(task);
    let mut join_set = JoinSet::new();

    for (index, item) in items.into_iter().enumerate() {
        // acquire first: a permit is only released after the previous output was inspected
        let Ok(permit) = sem.clone().acquire_owned().await else {
            break;
        };
        if halted.load(Ordering::SeqCst) {
            break;
        }
        let task = task.clone();
        let halted = halted.clone();
        join_set.spawn(async move {
            let _permit = permit;
            let output = task(index, item).await;
            if halts(&output) {
                halted.store(true, Ordering::SeqCst);
            }
            (index, output)
        });
    }

    let mut rows = Vec::new();
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(row) => rows.push(row),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => tracing::error!(error = %e, "stage task cancelled"),
        }
    }

    rows.sort_by_key(|(index, _)| *index);
    rows.into_iter().map(|(_, output)| output).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn never(_: &usize) -> bool {
        false
    }

    fn is_three(v: &usize) -> bool {
        *v == 3
    }

    #[tokio::test]
    async fn output_follows_input_order() {
        let items: Vec<u64> = vec![30, 5, 20, 1];
        let out = run_indexed(
            items,
            4,
            |index, delay| async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                index
            },
            never,
        )
        .await;
        assert_eq!(out, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn sequential_pool_stops_after_halting_item() {
        let started = Arc::new(AtomicUsize::new(0));
        let counter = started.clone();
        let out = run_indexed(
            (0..10usize).collect(),
            1,
            move |_, v| {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    v
                }
            },
            is_three,
        )
        .await;
        assert_eq!(out, vec![0, 1, 2, 3]);
        assert_eq!(started.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn empty_input_is_empty_output() {
        let out = run_indexed(Vec::<usize>::new(), 3, |_, v| async move { v }, never).await;
        assert!(out.is_empty());
    }
}
