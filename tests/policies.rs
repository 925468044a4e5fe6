mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Barrier;

use common::Recorder;
use tasknest::{
    ConcurrentTaskBehavior, Config, ErrorKind, EventKind, Launcher, TaskError, TaskRunnable,
};

fn launcher(behavior: ConcurrentTaskBehavior, recorder: &Recorder) -> Launcher {
    Launcher::builder(Config {
        behavior,
        ..Config::default()
    })
    .with_sink(recorder.sink())
    .build()
}

fn slow(name: &'static str, ms: u64) -> TaskRunnable<()> {
    TaskRunnable::named(name, move |_scope| async move {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(())
    })
}

/// Parent that spawns `elder` then `younger` and reports the younger's outcome.
fn siblings(
    elder: TaskRunnable<()>,
    younger: TaskRunnable<()>,
) -> TaskRunnable<Result<(), TaskError>> {
    TaskRunnable::named("parent", move |scope| {
        let (elder, younger) = (elder.clone(), younger.clone());
        async move {
            let a = scope.spawn(&elder);
            let b = scope.spawn(&younger);
            let younger_outcome = b.join().await;
            a.join().await?;
            Ok(younger_outcome)
        }
    })
}

async fn check_await_ordering() {
    let recorder = Recorder::new();
    let parent = siblings(slow("elder", 50), slow("younger", 1));

    let outcome = launcher(ConcurrentTaskBehavior::Await, &recorder)
        .run(&parent)
        .await
        .unwrap();
    assert_eq!(outcome, Ok(()));

    let elder_done = recorder.position("elder", EventKind::Finish).unwrap();
    let younger_begin = recorder.position("younger", EventKind::Begin).unwrap();
    assert!(elder_done < younger_begin, "{:?}", recorder.trace());
}

#[tokio::test]
async fn await_policy_orders_sibling_lifecycles() {
    check_await_ordering().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn await_policy_orders_sibling_lifecycles_across_workers() {
    for _ in 0..10 {
        check_await_ordering().await;
    }
}

async fn check_error_refusal() {
    let recorder = Recorder::new();
    let ran = Arc::new(AtomicBool::new(false));
    let flag = ran.clone();
    let younger: TaskRunnable<()> = TaskRunnable::named("younger", move |_scope| {
        flag.store(true, Ordering::SeqCst);
        async { Ok(()) }
    });
    let parent = siblings(slow("elder", 50), younger);

    let outcome = launcher(ConcurrentTaskBehavior::Error, &recorder)
        .run(&parent)
        .await
        .unwrap();

    let err = outcome.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Concurrency);
    assert_eq!(err.offending_tasks(), ["elder"]);
    assert!(!ran.load(Ordering::SeqCst));
    assert_eq!(recorder.kinds_of("younger"), [EventKind::Fail]);
    assert_eq!(recorder.kinds_of("elder"), [EventKind::Begin, EventKind::Finish]);
}

#[tokio::test]
async fn error_policy_refuses_younger_and_names_elder() {
    check_error_refusal().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn error_policy_refuses_younger_across_workers() {
    for _ in 0..10 {
        check_error_refusal().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn ignore_policy_lets_siblings_overlap() {
    let recorder = Recorder::new();
    // Both siblings must be inside their bodies at once to get past the barrier.
    let meet = Arc::new(Barrier::new(2));
    let rendezvous = |name: &'static str| -> TaskRunnable<()> {
        let meet = meet.clone();
        TaskRunnable::named(name, move |_scope| {
            let meet = meet.clone();
            async move {
                meet.wait().await;
                Ok(())
            }
        })
    };
    let parent = siblings(rendezvous("elder"), rendezvous("younger"));

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        launcher(ConcurrentTaskBehavior::Ignore, &recorder).run(&parent),
    )
    .await
    .expect("siblings did not overlap")
    .unwrap();
    assert_eq!(outcome, Ok(()));

    let younger_begin = recorder.position("younger", EventKind::Begin).unwrap();
    let elder_done = recorder.position("elder", EventKind::Finish).unwrap();
    assert!(younger_begin < elder_done);
}

#[tokio::test]
async fn policy_is_inherited_from_the_root() {
    let recorder = Recorder::new();
    let inner = TaskRunnable::named("inner", |scope| async move {
        Ok(scope.task_context().behavior())
    });
    let outer = TaskRunnable::named("outer", move |scope| {
        let inner = inner.clone();
        async move { scope.run(&inner).await }
    });

    let behavior = launcher(ConcurrentTaskBehavior::Error, &recorder)
        .run(&outer)
        .await
        .unwrap();
    assert_eq!(behavior, ConcurrentTaskBehavior::Error);
}

#[tokio::test]
async fn finished_elder_does_not_block_younger() {
    let recorder = Recorder::new();
    let quick = TaskRunnable::named("quick", |_scope| async { Ok(()) });
    let parent = TaskRunnable::named("parent", move |scope| {
        let quick = quick.clone();
        async move {
            scope.run(&quick).await?;
            scope.run(&quick).await?;
            Ok(())
        }
    });

    launcher(ConcurrentTaskBehavior::Error, &recorder)
        .run(&parent)
        .await
        .unwrap();
    assert_eq!(
        recorder.kinds_of("quick"),
        [EventKind::Begin, EventKind::Finish, EventKind::Begin, EventKind::Finish]
    );
}
