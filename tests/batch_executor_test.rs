// Batch executor behavior: partial failure, concurrency bound, retry,
// busy rejection, and cooperative abort.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use linkpipe::batch::{BatchError, BatchExecutor, BatchOptions, ErrorStrategy};

#[tokio::test]
async fn partial_failure_under_continue_strategy() {
    // 5 URLs in chunks of 1; #3 fails. Continue strategy must yield 4
    // results, 1 failure entry, and invoke on_error exactly once.
    let urls: Vec<String> = (1..=5).map(|i| format!("https://ex.com/{i}")).collect();
    let error_calls = Arc::new(AtomicUsize::new(0));
    let error_calls_cb = Arc::clone(&error_calls);

    let executor = BatchExecutor::new();
    let options = BatchOptions {
        batch_size: 1,
        max_concurrency: 2,
        error_strategy: ErrorStrategy::Continue,
        on_error: Some(Arc::new(move |_err, _items, _index| {
            error_calls_cb.fetch_add(1, Ordering::SeqCst);
        })),
        ..BatchOptions::default()
    };

    let outcome = executor
        .process(
            urls,
            |chunk: Vec<String>| async move {
                if chunk[0].ends_with("/3") {
                    anyhow::bail!("validation blew up");
                }
                Ok(chunk)
            },
            options,
        )
        .await
        .expect("continue strategy must not fail the job");

    assert_eq!(outcome.results.len(), 4);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].items, vec!["https://ex.com/3".to_string()]);
    assert_eq!(error_calls.load(Ordering::SeqCst), 1);
    assert_eq!(outcome.stats.failed_batches, 1);
    assert_eq!(outcome.stats.successful_batches, 4);
}

#[tokio::test]
async fn fail_fast_propagates_the_first_failure() {
    let executor = BatchExecutor::new();
    let options = BatchOptions {
        batch_size: 1,
        max_concurrency: 1,
        error_strategy: ErrorStrategy::FailFast,
        ..BatchOptions::default()
    };

    let result: Result<linkpipe::batch::BatchOutcome<i32, i32>, _> = executor
        .process(
            vec![1, 2, 3, 4],
            |chunk: Vec<i32>| async move {
                if chunk[0] == 2 {
                    anyhow::bail!("boom");
                }
                Ok(chunk)
            },
            options,
        )
        .await;

    match result {
        Err(BatchError::ChunkFailed { index, message }) => {
            assert_eq!(index, 1);
            assert!(message.contains("boom"));
        }
        other => panic!("expected ChunkFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrency_never_exceeds_the_configured_bound() {
    // 30 single-item chunks against 3 permits: at no point may more than 3
    // chunk bodies run at once.
    let permits = 3usize;
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let executor = BatchExecutor::new();
    let options = BatchOptions {
        batch_size: 1,
        max_concurrency: permits,
        ..BatchOptions::default()
    };

    let active_cl = Arc::clone(&active);
    let peak_cl = Arc::clone(&peak);
    let outcome = executor
        .process(
            (0..30).collect::<Vec<i32>>(),
            move |chunk: Vec<i32>| {
                let active = Arc::clone(&active_cl);
                let peak = Arc::clone(&peak_cl);
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok(chunk)
                }
            },
            options,
        )
        .await
        .expect("job should succeed");

    assert_eq!(outcome.results.len(), 30);
    assert!(peak.load(Ordering::SeqCst) <= permits);
}

#[tokio::test]
async fn results_are_reassembled_in_chunk_order() {
    // Later chunks finish first; the outcome must still follow input order.
    let executor = BatchExecutor::new();
    let options = BatchOptions {
        batch_size: 2,
        max_concurrency: 4,
        ..BatchOptions::default()
    };

    let outcome = executor
        .process(
            (0..10).collect::<Vec<u64>>(),
            |chunk: Vec<u64>| async move {
                // Earlier chunks sleep longer
                tokio::time::sleep(Duration::from_millis(50 - chunk[0] * 4)).await;
                Ok(chunk)
            },
            options,
        )
        .await
        .expect("job should succeed");

    assert_eq!(outcome.results, (0..10).collect::<Vec<u64>>());
}

#[tokio::test]
async fn retry_recovers_a_transiently_failing_chunk() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let attempts_cl = Arc::clone(&attempts);

    let executor = BatchExecutor::new();
    let options = BatchOptions {
        batch_size: 1,
        retry_count: 2,
        retry_delay: Duration::from_millis(1),
        ..BatchOptions::default()
    };

    let outcome = executor
        .process(
            vec!["only".to_string()],
            move |chunk: Vec<String>| {
                let attempts = Arc::clone(&attempts_cl);
                async move {
                    if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                        anyhow::bail!("transient");
                    }
                    Ok(chunk)
                }
            },
            options,
        )
        .await
        .expect("third attempt succeeds");

    assert_eq!(outcome.results.len(), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert!(outcome.failures.is_empty());
}

#[tokio::test]
async fn second_job_on_a_busy_executor_is_rejected() {
    let executor = Arc::new(BatchExecutor::new());

    let slow = Arc::clone(&executor);
    let handle = tokio::spawn(async move {
        slow.process(
            vec![1],
            |chunk: Vec<i32>| async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(chunk)
            },
            BatchOptions::default(),
        )
        .await
    });

    // Give the first job time to claim the executor
    tokio::time::sleep(Duration::from_millis(20)).await;

    let second: Result<linkpipe::batch::BatchOutcome<i32, i32>, _> = executor
        .process(
            vec![2],
            |chunk: Vec<i32>| async move { Ok(chunk) },
            BatchOptions::default(),
        )
        .await;
    assert!(matches!(second, Err(BatchError::Busy)));

    let first = handle.await.expect("task completes").expect("job succeeds");
    assert_eq!(first.results, vec![1]);
}

#[tokio::test]
async fn abort_stops_unstarted_chunks() {
    let executor = Arc::new(BatchExecutor::new());
    let processed = Arc::new(AtomicUsize::new(0));

    let exec = Arc::clone(&executor);
    let processed_cl = Arc::clone(&processed);
    let aborter = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        aborter.abort();
    });

    let result: Result<linkpipe::batch::BatchOutcome<i32, i32>, _> = exec
        .process(
            (0..50).collect::<Vec<i32>>(),
            move |chunk: Vec<i32>| {
                let processed = Arc::clone(&processed_cl);
                async move {
                    processed.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Ok(chunk)
                }
            },
            BatchOptions {
                batch_size: 1,
                max_concurrency: 2,
                ..BatchOptions::default()
            },
        )
        .await;

    assert!(matches!(result, Err(BatchError::Aborted)));
    assert!(processed.load(Ordering::SeqCst) < 50);
}
