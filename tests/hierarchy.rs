mod common;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{Barrier, Notify};

use common::Recorder;
use tasknest::{
    Config, ErrorKind, EventKind, Launcher, LiveTaskContext, StaticTaskContext, TaskContext,
    TaskError, TaskRunnable,
};

type Seen = Arc<Mutex<Vec<Arc<LiveTaskContext>>>>;

fn leaf(name: &'static str, seen: &Seen, ready: &Arc<Barrier>, release: &Arc<Barrier>) -> TaskRunnable<()> {
    let (seen, ready, release) = (seen.clone(), ready.clone(), release.clone());
    TaskRunnable::named(name, move |scope| {
        seen.lock().push(Arc::clone(scope.task_context()));
        let (ready, release) = (ready.clone(), release.clone());
        async move {
            ready.wait().await;
            release.wait().await;
            Ok(())
        }
    })
}

fn branch(name: &'static str, seen: &Seen, kids: Vec<TaskRunnable<()>>) -> TaskRunnable<()> {
    let seen = seen.clone();
    TaskRunnable::named(name, move |scope| {
        seen.lock().push(Arc::clone(scope.task_context()));
        let kids = kids.clone();
        async move {
            let handles: Vec<_> = kids.iter().map(|kid| scope.spawn(kid)).collect();
            for handle in handles {
                handle.join().await?;
            }
            Ok(())
        }
    })
}

async fn check_tree_snapshot() {
    let seen: Seen = Arc::default();
    // four leaves plus the root body
    let ready = Arc::new(Barrier::new(5));
    let release = Arc::new(Barrier::new(5));

    let first = branch(
        "first",
        &seen,
        vec![
            leaf("first-a", &seen, &ready, &release),
            leaf("first-b", &seen, &ready, &release),
        ],
    );
    let second = branch("second", &seen, vec![leaf("second-a", &seen, &ready, &release)]);
    let third = leaf("third", &seen, &ready, &release);

    let root_seen = seen.clone();
    let root: TaskRunnable<StaticTaskContext> = TaskRunnable::named("root", move |scope| {
        root_seen.lock().push(Arc::clone(scope.task_context()));
        let (first, second, third) = (first.clone(), second.clone(), third.clone());
        let (ready, release) = (ready.clone(), release.clone());
        async move {
            let handles = [scope.spawn(&first), scope.spawn(&second), scope.spawn(&third)];
            ready.wait().await;
            let snap = scope.task_context().snapshot();
            release.wait().await;
            for handle in handles {
                handle.join().await?;
            }
            Ok(snap)
        }
    });

    let snap = Launcher::default().run(&root).await.unwrap();

    assert_eq!(snap.level(), 0);
    assert_eq!(snap.child_count(), 3);
    let children = snap.children();
    let names: Vec<String> = children
        .iter()
        .map(|c| c.task().unwrap().to_string())
        .collect();
    assert_eq!(names, ["first", "second", "third"]);
    let counts: Vec<usize> = children.iter().map(|c| c.child_count()).collect();
    assert_eq!(counts, [2, 1, 0]);
    assert_eq!(snap.descendant_count(), 6);

    let grandchild = &children[0].children()[1];
    assert_eq!(grandchild.level(), 2);
    assert!(grandchild.is_active());
    let up = grandchild.parent().and_then(|p| p.parent()).unwrap();
    assert_eq!(up.context_id(), snap.context_id());

    let seen = seen.lock();
    assert_eq!(seen.len(), 7);
    for ctx in seen.iter() {
        assert!(ctx.is_completed(), "{ctx:?} not completed");
        assert!(!ctx.is_failed());
        assert_eq!(ctx.level(), 0);
        assert!(ctx.parent().is_none());
        assert!(ctx.task().is_err());
        assert_eq!(ctx.child_count(), 0);
    }
}

#[tokio::test]
async fn tree_snapshot_counts_children_in_start_order() {
    check_tree_snapshot().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn tree_snapshot_keeps_start_order_across_workers() {
    for _ in 0..20 {
        check_tree_snapshot().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn spawned_children_register_in_call_order() {
    let names = ["a", "b", "c"];
    let kids: Vec<TaskRunnable<()>> = names
        .iter()
        .map(|name| {
            TaskRunnable::named(*name, |_scope| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(())
            })
        })
        .collect();
    let root: TaskRunnable<Vec<String>> = TaskRunnable::named("root", move |scope| {
        let kids = kids.clone();
        async move {
            let handles: Vec<_> = kids.iter().map(|kid| scope.spawn(kid)).collect();
            let registered = scope
                .task_context()
                .snapshot()
                .children()
                .iter()
                .map(|c| c.task().unwrap().to_string())
                .collect();
            for handle in handles {
                handle.join().await?;
            }
            Ok(registered)
        }
    });

    for _ in 0..50 {
        assert_eq!(root.run().await.unwrap(), names);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parent_returning_over_a_spawned_child_fails() {
    let ran = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let release = Arc::new(Notify::new());
    let child: TaskRunnable<u8> = {
        let (ran, release) = (ran.clone(), release.clone());
        TaskRunnable::named("stashed", move |_scope| {
            ran.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let release = release.clone();
            async move {
                release.notified().await;
                Ok(9)
            }
        })
    };

    let stash: Arc<Mutex<Option<tasknest::TaskHandle<u8>>>> = Arc::default();
    let parent: TaskRunnable<()> = {
        let stash = stash.clone();
        TaskRunnable::named("parent", move |scope| {
            *stash.lock() = Some(scope.spawn(&child));
            async { Ok(()) }
        })
    };

    let err = parent.run().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Concurrency);
    assert_eq!(err.offending_tasks(), ["stashed"]);

    release.notify_one();
    let handle = stash.lock().take().unwrap();
    let joined = tokio::time::timeout(Duration::from_secs(5), handle.join())
        .await
        .unwrap();
    assert_eq!(joined, Ok(9));
    assert_eq!(ran.load(std::sync::atomic::Ordering::SeqCst), 1);
}

#[tokio::test]
async fn deep_chain_snapshot_links_every_level() {
    fn chain(depth: usize, max: usize) -> TaskRunnable<StaticTaskContext> {
        TaskRunnable::named(format!("level-{depth}"), move |scope| async move {
            if depth == max {
                Ok(scope.task_context().snapshot())
            } else {
                scope.run(&chain(depth + 1, max)).await
            }
        })
    }

    let bottom = chain(0, 40).run().await.unwrap();
    assert_eq!(bottom.level(), 40);
    assert_eq!(bottom.task().unwrap().name(), Some("level-40"));

    let mut hops = 0;
    let mut current = bottom.clone();
    while let Some(parent) = current.parent() {
        assert_eq!(parent.child_count(), 1);
        current = parent;
        hops += 1;
    }
    assert_eq!(hops, 40);
    assert_eq!(current.task().unwrap().name(), Some("level-0"));
    assert_eq!(bottom.root().descendant_count(), 40);
    assert!(bottom.root().to_string().lines().count() == 41);
}

#[tokio::test]
async fn body_failure_emits_one_fail_and_no_finish() {
    let recorder = Recorder::new();
    let launcher = Launcher::builder(Config::default())
        .with_sink(recorder.sink())
        .build();

    let child: TaskRunnable<u8> =
        TaskRunnable::named("child", |_scope| async { Err(TaskError::fail("bad input")) });
    let parent = TaskRunnable::named("parent", move |scope| {
        let child = child.clone();
        async move { scope.run(&child).await }
    });

    let err = launcher.run(&parent).await.unwrap_err();
    assert_eq!(err, TaskError::fail("bad input"));
    assert_eq!(recorder.kinds_of("child"), [EventKind::Begin, EventKind::Fail]);
    assert_eq!(recorder.kinds_of("parent"), [EventKind::Begin, EventKind::Fail]);

    let fail = recorder
        .events()
        .into_iter()
        .find(|ev| ev.kind() == EventKind::Fail)
        .unwrap();
    assert_eq!(fail.context().failure_cause(), Some(TaskError::fail("bad input")));
    assert!(fail.context().is_failed());
}

#[tokio::test]
async fn returning_with_a_running_child_is_a_concurrency_error() {
    let recorder = Recorder::new();
    let launcher = Launcher::builder(Config::default())
        .with_sink(recorder.sink())
        .build();

    let release = Arc::new(Notify::new());
    let (started_tx, started_rx) = tokio::sync::mpsc::channel::<()>(1);
    let straggler: TaskRunnable<()> = TaskRunnable::named("straggler", {
        let release = release.clone();
        move |_scope| {
            let release = release.clone();
            let started = started_tx.clone();
            async move {
                let _ = started.send(()).await;
                release.notified().await;
                Ok(())
            }
        }
    });

    let root_ctx: Arc<Mutex<Option<Arc<LiveTaskContext>>>> = Arc::default();
    let root_slot = root_ctx.clone();
    let started_rx = Arc::new(tokio::sync::Mutex::new(started_rx));
    let parent: TaskRunnable<()> = TaskRunnable::named("careless", move |scope| {
        *root_slot.lock() = Some(Arc::clone(scope.task_context()));
        let straggler = straggler.clone();
        let started_rx = started_rx.clone();
        async move {
            let _detached = scope.spawn(&straggler);
            started_rx.lock().await.recv().await;
            Ok(())
        }
    });

    let err = launcher.run(&parent).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Concurrency);
    assert_eq!(err.offending_tasks(), ["straggler"]);
    assert_eq!(recorder.kinds_of("careless"), [EventKind::Begin, EventKind::Fail]);

    let root = root_ctx.lock().clone().unwrap();
    assert!(root.is_failed());
    assert!(!root.is_completed());

    release.notify_one();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !root.is_completed() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(recorder.kinds_of("straggler"), [EventKind::Begin, EventKind::Finish]);
}

#[tokio::test]
async fn late_child_cannot_attach_to_finished_parent() {
    let parent_ctx: Arc<Mutex<Option<Arc<LiveTaskContext>>>> = Arc::default();
    let slot = parent_ctx.clone();
    let parent: TaskRunnable<()> = TaskRunnable::named("short-lived", move |scope| {
        *slot.lock() = Some(Arc::clone(scope.task_context()));
        async { Ok(()) }
    });
    parent.run().await.unwrap();

    let recorder = Recorder::new();
    let orphan: TaskRunnable<()> = TaskRunnable::named("orphan", |_scope| async { Ok(()) });
    let dead = parent_ctx.lock().clone().unwrap();
    let err = LiveTaskContext::new()
        .enter(Some(dead), Some(recorder.sink()), Default::default(), &orphan)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Concurrency);
    assert!(recorder.events().is_empty());
}

#[test]
fn run_blocking_drives_a_whole_tree() {
    let child = TaskRunnable::named("child", |scope| async move {
        Ok(scope.task_context().level() as u32)
    });
    let root = TaskRunnable::named("root", move |scope| {
        let child = child.clone();
        async move {
            let a = scope.run(&child).await?;
            let b = child.run().await?;
            Ok(a + b)
        }
    });
    assert_eq!(root.run_blocking(), Ok(2));
}
