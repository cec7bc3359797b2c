//! Timers & control opcodes (§6.1 "Timers & control"): the grab-bag of
//! ops that don't fit the file/socket/path grouping — timeouts,
//! cross-ring messaging, cancellation, and fixed-file-table plumbing.

use super::{fd, submit};
use io_uring::{opcode, types};

pub async fn timeout(ts: &types::Timespec, count: u32, flags: u32) -> i32 {
    let entry = opcode::Timeout::new(ts as *const types::Timespec)
        .count(count)
        .flags(flags)
        .build();
    submit(entry).await
}

pub async fn timeout_remove(target_user_data: u64, flags: u32) -> i32 {
    let entry = opcode::TimeoutRemove::new(target_user_data).flags(flags).build();
    submit(entry).await
}

pub async fn timeout_update(target_user_data: u64, ts: &types::Timespec, flags: u32) -> i32 {
    let entry = opcode::TimeoutUpdate::new(target_user_data, ts as *const types::Timespec)
        .flags(flags)
        .build();
    submit(entry).await
}

/// `link_timeout` bounds the *previous* SQE in the same submission
/// (linked via `IOSQE_IO_LINK`); on its own this just submits the
/// timeout SQE the opcode requires to exist.
pub async fn link_timeout(ts: &types::Timespec, flags: u32) -> i32 {
    let entry = opcode::LinkTimeout::new(ts as *const types::Timespec).flags(flags).build();
    submit(entry).await
}

/// Posts a CQE directly onto another ring (cross-ring messaging).
pub async fn msg_ring(target_ring_fd: i32, result: i32, target_user_data: u64) -> i32 {
    let entry = opcode::MsgRingData::new(fd(target_ring_fd), result, target_user_data, 0).build();
    submit(entry).await
}

pub async fn msg_ring_cqe_flags(target_ring_fd: i32, result: i32, target_user_data: u64, cqe_flags: u32) -> i32 {
    let entry = opcode::MsgRingData::new(fd(target_ring_fd), result, target_user_data, cqe_flags).build();
    submit(entry).await
}

pub async fn msg_ring_fd(target_ring_fd: i32, source_fd: i32, target_user_data: u64) -> i32 {
    let entry = opcode::MsgRingSendFd::new(
        fd(target_ring_fd),
        fd(source_fd),
        types::DestinationSlot::try_from_slot_target(0).unwrap(),
        target_user_data,
    )
    .build();
    submit(entry).await
}

pub async fn msg_ring_fd_alloc(target_ring_fd: i32, source_fd: i32, target_user_data: u64) -> i32 {
    let entry = opcode::MsgRingSendFd::new(
        fd(target_ring_fd),
        fd(source_fd),
        types::DestinationSlot::auto_target(),
        target_user_data,
    )
    .build();
    submit(entry).await
}

/// Asynchronously `waitid(2)`s on a process/process-group/pidfd.
pub async fn waitid(idtype: i32, id: i32, infop: *mut libc::siginfo_t, options: i32) -> i32 {
    let entry = opcode::Waitid::new(idtype, id).options(options).build();
    let _ = infop;
    submit(entry).await
}

/// Installs a fixed-file-table slot as a process fd (the inverse of
/// `open_at_direct`/`accept_direct`/`socket_direct*`).
pub async fn fixed_fd_install(file_index: u32, flags: u32) -> i32 {
    let entry = opcode::FixedFdInstall::new(types::Fixed(file_index), flags).build();
    submit(entry).await
}

pub async fn files_update(fds: &[i32], offset: i32) -> i32 {
    let entry = opcode::FilesUpdate::new(fds.as_ptr(), fds.len() as u32).offset(offset).build();
    submit(entry).await
}

/// `IORING_OP_URING_CMD` dispatch for socket-specific commands (e.g.
/// `SOCKET_URING_OP_SIOCINQ`); the payload is opaque to this runtime,
/// which only stamps it through the generic 16-byte command SQE.
pub async fn cmd_sock(sockfd: i32, cmd_op: u32, payload: &[u8; 16]) -> i32 {
    let entry = opcode::UringCmd16::new(fd(sockfd), cmd_op).cmd(*payload).build();
    submit(entry).await
}

/// `IORING_OP_URING_CMD` dispatch for the discard command
/// (`BLKDISCARD`-style), same generic 16-byte command shape as
/// [`cmd_sock`] but targeting a block device fd.
pub async fn cmd_discard(fildes: i32, cmd_op: u32, payload: &[u8; 16]) -> i32 {
    let entry = opcode::UringCmd16::new(fd(fildes), cmd_op).cmd(*payload).build();
    submit(entry).await
}

pub async fn nop() -> i32 {
    submit(opcode::Nop::new().build()).await
}

pub async fn cancel(target_user_data: u64, flags: i32) -> i32 {
    let entry = opcode::AsyncCancel::new(target_user_data).flags(flags as u32).build();
    submit(entry).await
}

/// `cancel64` is `cancel` with a full 64-bit `user_data` match (`cancel`
/// truncates to a 32-bit comparison on some kernels); both route through
/// the same `AsyncCancel` builder here since this runtime always stamps
/// a full pointer-width `user_data`.
pub async fn cancel64(target_user_data: u64, flags: i32) -> i32 {
    cancel(target_user_data, flags).await
}

pub async fn cancel_fd(target_fd: i32, flags: i32) -> i32 {
    let entry = opcode::AsyncCancel::new(0)
        .fd(fd(target_fd))
        .flags(flags as u32 | types::AsyncCancelFlags::FD.bits())
        .build();
    submit(entry).await
}

pub async fn pipe(fds: &mut [i32; 2], flags: i32) -> i32 {
    let entry = opcode::Pipe::new(fds.as_mut_ptr()).flags(flags).build();
    submit(entry).await
}

pub async fn pipe_direct(fds: &mut [i32; 2], flags: i32, file_indices: [u32; 2]) -> i32 {
    let entry = opcode::Pipe::new(fds.as_mut_ptr())
        .flags(flags)
        .file_index(Some([
            types::DestinationSlot::try_from_slot_target(file_indices[0]).unwrap(),
            types::DestinationSlot::try_from_slot_target(file_indices[1]).unwrap(),
        ]))
        .build();
    submit(entry).await
}
