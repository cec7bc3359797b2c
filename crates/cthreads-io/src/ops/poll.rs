//! Polling/signalling opcodes (§6.1 "Polling/signalling").

use super::{fd, submit};
use io_uring::opcode;

pub async fn poll_add(fildes: i32, events: u32) -> i32 {
    let entry = opcode::PollAdd::new(fd(fildes), events).build();
    submit(entry).await
}

/// §4.5 multishot caveat applies.
pub async fn poll_multishot(fildes: i32, events: u32) -> i32 {
    let entry = opcode::PollAdd::new(fd(fildes), events).multi(true).build();
    submit(entry).await
}

/// `poll_remove` cancels a previously submitted poll by the target
/// SQE's original `user_data`.
pub async fn poll_remove(target_user_data: u64) -> i32 {
    let entry = opcode::PollRemove::new(target_user_data).build();
    submit(entry).await
}

/// Updates an in-flight poll's event mask / user_data in place rather
/// than cancel-then-resubmit.
pub async fn poll_update(old_user_data: u64, new_user_data: u64, events: u32, flags: u32) -> i32 {
    let entry = opcode::PollUpdate::new(old_user_data, new_user_data)
        .flags(flags)
        .mask(events)
        .build();
    submit(entry).await
}

pub async fn epoll_ctl(epfd: i32, fildes: i32, op: i32, event: &libc::epoll_event) -> i32 {
    let entry = opcode::EpollCtl::new(fd(epfd), fd(fildes), op, event as *const libc::epoll_event).build();
    submit(entry).await
}

/// There is no single-shot `IORING_OP_EPOLL_WAIT`; waiting for epoll
/// readiness through the ring is expressed as a poll on the epoll fd
/// itself (`POLLIN`), which is what this wraps.
pub async fn epoll_wait(epfd: i32) -> i32 {
    poll_add(epfd, libc::POLLIN as u32).await
}

pub async fn futex_wake(futex: &std::sync::atomic::AtomicU32, val: u64, mask: u64, futex_flags: u32) -> i32 {
    let entry = opcode::FutexWake::new(futex.as_ptr().cast(), val, mask, futex_flags).build();
    submit(entry).await
}

pub async fn futex_wait(futex: &std::sync::atomic::AtomicU32, val: u64, mask: u64, futex_flags: u32) -> i32 {
    let entry = opcode::FutexWait::new(futex.as_ptr().cast(), val, mask, futex_flags).build();
    submit(entry).await
}

pub async fn futex_waitv(futexes: &[io_uring::types::FutexWaitV]) -> i32 {
    let entry = opcode::FutexWaitV::new(futexes.as_ptr(), futexes.len() as u32).build();
    submit(entry).await
}
