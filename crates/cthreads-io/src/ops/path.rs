//! Path opcodes (§6.1 "Path"): directory entry mutation ops that take a
//! path rather than an open fd.

use super::{fd, submit};
use io_uring::opcode;
use std::ffi::CStr;

pub async fn mkdir(path: &CStr, mode: u32) -> i32 {
    mkdir_at(libc::AT_FDCWD, path, mode).await
}

pub async fn mkdir_at(dirfd: i32, path: &CStr, mode: u32) -> i32 {
    let entry = opcode::MkDirAt::new(fd(dirfd), path.as_ptr()).mode(mode).build();
    submit(entry).await
}

pub async fn symlink(target: &CStr, linkpath: &CStr) -> i32 {
    symlink_at(target, libc::AT_FDCWD, linkpath).await
}

pub async fn symlink_at(target: &CStr, newdirfd: i32, linkpath: &CStr) -> i32 {
    let entry = opcode::SymlinkAt::new(target.as_ptr(), fd(newdirfd), linkpath.as_ptr()).build();
    submit(entry).await
}

pub async fn link(oldpath: &CStr, newpath: &CStr) -> i32 {
    link_at(libc::AT_FDCWD, oldpath, libc::AT_FDCWD, newpath, 0).await
}

pub async fn link_at(olddirfd: i32, oldpath: &CStr, newdirfd: i32, newpath: &CStr, flags: i32) -> i32 {
    let entry = opcode::LinkAt::new(fd(olddirfd), oldpath.as_ptr(), fd(newdirfd), newpath.as_ptr())
        .flags(flags)
        .build();
    submit(entry).await
}

pub async fn unlink(path: &CStr) -> i32 {
    unlink_at(libc::AT_FDCWD, path, 0).await
}

pub async fn unlink_at(dirfd: i32, path: &CStr, flags: i32) -> i32 {
    let entry = opcode::UnlinkAt::new(fd(dirfd), path.as_ptr()).flags(flags).build();
    submit(entry).await
}

pub async fn rename(oldpath: &CStr, newpath: &CStr) -> i32 {
    rename_at(libc::AT_FDCWD, oldpath, libc::AT_FDCWD, newpath, 0).await
}

pub async fn rename_at(olddirfd: i32, oldpath: &CStr, newdirfd: i32, newpath: &CStr, flags: u32) -> i32 {
    let entry = opcode::RenameAt::new(fd(olddirfd), oldpath.as_ptr(), fd(newdirfd), newpath.as_ptr())
        .flags(flags)
        .build();
    submit(entry).await
}
