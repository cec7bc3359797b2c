//! Provided-buffer opcodes (§6.1 "Buffer"): the ring-managed buffer
//! pool that multishot reads/recvs and `send_bundle` draw from.

use io_uring::opcode;

use super::submit;

pub async fn provide_buffers(addr: *mut u8, len: i32, nbufs: u16, buf_group: u16, bid_start: u16) -> i32 {
    let entry = opcode::ProvideBuffers::new(addr, len, nbufs, buf_group, bid_start).build();
    submit(entry).await
}

pub async fn remove_buffers(nbufs: u16, buf_group: u16) -> i32 {
    let entry = opcode::RemoveBuffers::new(nbufs, buf_group).build();
    submit(entry).await
}
