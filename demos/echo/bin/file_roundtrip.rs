//! File write/read round-trip (§8.2 S5) built on `cthreads` + `cthreads-io`.
//!
//! Run with: `cargo run -p cthreads-echo-demo --bin file-roundtrip`

use anyhow::{bail, Result};
use cthreads::KernelConfig;
use cthreads_io::prelude::{close, open, read, write};
use std::ffi::CString;

async fn round_trip(path: CString, payload: Vec<u8>) -> i32 {
    let flags = libc::O_CREAT | libc::O_RDWR | libc::O_TRUNC;
    let fildes = open(&path, flags, 0o600).await;
    if fildes < 0 {
        eprintln!("open failed: {fildes}");
        return fildes;
    }

    let mut written = 0usize;
    while written < payload.len() {
        let n = write(fildes, &payload[written..], written as u64).await;
        if n <= 0 {
            close(fildes).await;
            return n;
        }
        written += n as usize;
    }

    let mut buf = vec![0u8; payload.len()];
    let mut got = 0usize;
    while got < buf.len() {
        let n = read(fildes, &mut buf[got..], got as u64).await;
        if n <= 0 {
            break;
        }
        got += n as usize;
    }

    close(fildes).await;

    if buf == payload.as_slice() {
        println!("round-trip matched {} bytes", buf.len());
        0
    } else {
        eprintln!("round-trip mismatch: wrote {payload:?}, read {buf:?}");
        1
    }
}

fn main() -> Result<()> {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("cthreads-roundtrip-{}.bin", std::process::id()));
    let path_c = CString::new(path.to_str().expect("non-utf8 temp path"))?;
    let payload = b"the quick brown fox jumps over the lazy dog".to_vec();

    let config = KernelConfig::new(1 << 16, 32);
    let reactor = cthreads_io::init(config.ring_entries)?;
    let exit = cthreads::run_main(config, Some(reactor), round_trip(path_c, payload));
    cthreads_io::fini();

    if std::fs::remove_file(&path).is_err() {
        // Already gone, or the open() above failed before creating it.
    }

    if exit != 0 {
        bail!("round-trip failed with exit code {exit}");
    }
    Ok(())
}
