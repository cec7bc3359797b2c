//! End-to-end scenarios (§8.2) that don't require an I/O ring: S3 (join
//! handoff) and S4 (event handshake). S5/S6 (file I/O, TCP echo) live in
//! `cthreads-io`'s integration tests since they need the reactor.

use cthreads::api::{join, signal_all, spawn, suspend};
use cthreads::{run_main, KernelConfig};

fn config() -> KernelConfig {
    KernelConfig::new(1 << 20, 0)
}

/// S3 — Join handoff: `A` suspends five times then returns 0; `B`
/// returns 7 immediately; main joins both and observes `B`'s value.
#[test]
fn s3_join_handoff() {
    let exit = run_main(config(), None, async {
        let a = spawn(async {
            for _ in 0..5 {
                suspend().await;
            }
            0
        })
        .unwrap();
        let b = spawn(async { 7 }).unwrap();

        join(a).await;
        let r = join(b).await;
        assert_eq!(r, 7);
        0
    });
    assert_eq!(exit, 0);
}

/// S4 — Event handshake: a reader and a writer cthread hand 11 integers
/// back and forth through two events, terminating on the value `0`.
/// Neither side should loop more than 12 times (no spurious wakeups).
#[test]
fn s4_event_handshake() {
    use std::cell::Cell;
    use std::rc::Rc;

    let exit = run_main(config(), None, async {
        let mailbox = Rc::new(Cell::new(0i32));
        let writer_done = Rc::new(cthreads::Event::new());
        let item_ready = Rc::new(cthreads::Event::new());

        let values = [11, 10, 9, 8, 7, 6, 5, 4, 3, 2, 1, 0];

        let (mb1, wd1, ir1) = (mailbox.clone(), writer_done.clone(), item_ready.clone());
        let writer = spawn(async move {
            let mut iterations = 0;
            for v in values {
                mb1.set(v);
                ir1.signal();
                iterations += 1;
                if v != 0 {
                    wd1.wait().await;
                }
            }
            assert!(iterations <= 12, "writer spurious-wakeup bound violated");
            0
        })
        .unwrap();

        let (mb2, wd2, ir2) = (mailbox.clone(), writer_done.clone(), item_ready.clone());
        let reader = spawn(async move {
            let mut iterations = 0;
            loop {
                ir2.wait().await;
                iterations += 1;
                let v = mb2.get();
                if v == 0 {
                    break;
                }
                wd2.signal();
            }
            assert!(iterations <= 12, "reader spurious-wakeup bound violated");
            0
        })
        .unwrap();

        join(writer).await;
        join(reader).await;
        assert_eq!(mailbox.get(), 0);
        0
    });
    assert_eq!(exit, 0);
}

/// §8.1.8 Event FIFO: N waiters entering `wait(e)` in order are resumed
/// in the same order by `signal_all`.
#[test]
fn event_fifo_signal_all_wakes_in_order() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let exit = run_main(config(), None, async {
        let event = Rc::new(cthreads::Event::new());
        let order = Rc::new(RefCell::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..5 {
            let (e, o) = (event.clone(), order.clone());
            handles.push(
                spawn(async move {
                    e.wait().await;
                    o.borrow_mut().push(i);
                    0
                })
                .unwrap(),
            );
            // Ensure each waiter actually reaches `wait` before the next is
            // spawned, so wait-list order matches spawn order.
            suspend().await;
        }

        let woken = signal_all(&event);
        assert_eq!(woken, 5);
        for h in handles {
            join(h).await;
        }
        assert_eq!(*order.borrow(), vec![0, 1, 2, 3, 4]);
        0
    });
    assert_eq!(exit, 0);
}
