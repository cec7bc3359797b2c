//! Extended-attribute opcodes (§6.1 "xattr").

use super::{fd, submit};
use io_uring::opcode;
use std::ffi::CStr;

pub async fn get_xattr(name: &CStr, value: &mut [u8], path: &CStr) -> i32 {
    let entry = opcode::GetXattr::new(name.as_ptr(), value.as_mut_ptr(), path.as_ptr(), value.len() as u32).build();
    submit(entry).await
}

pub async fn set_xattr(name: &CStr, value: &[u8], path: &CStr, flags: i32) -> i32 {
    let entry = opcode::SetXattr::new(name.as_ptr(), value.as_ptr(), path.as_ptr(), flags, value.len() as u32).build();
    submit(entry).await
}

pub async fn fget_xattr(fildes: i32, name: &CStr, value: &mut [u8]) -> i32 {
    let entry = opcode::FGetXattr::new(fd(fildes), name.as_ptr(), value.as_mut_ptr(), value.len() as u32).build();
    submit(entry).await
}

pub async fn fset_xattr(fildes: i32, name: &CStr, value: &[u8], flags: i32) -> i32 {
    let entry = opcode::FSetXattr::new(fd(fildes), name.as_ptr(), value.as_ptr(), flags, value.len() as u32).build();
    submit(entry).await
}
