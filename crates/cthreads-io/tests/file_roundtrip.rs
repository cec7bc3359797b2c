//! §8.2 S5 — file I/O round-trip: write a buffer through the ring, read
//! it back, and confirm the bytes match.

use cthreads::api::spawn;
use cthreads::KernelConfig;
use cthreads_io::prelude::{close, open, read, unlink, write};
use std::ffi::CString;

#[test]
fn s5_file_write_read_round_trip() {
    let path = std::env::temp_dir().join(format!("cthreads-io-s5-{}.bin", std::process::id()));
    let path_c = CString::new(path.to_str().unwrap()).unwrap();
    let payload = b"cthreads file round-trip payload".to_vec();

    let config = KernelConfig::new(1 << 16, 32);
    let reactor = cthreads_io::init(config.ring_entries).expect("io_uring init");

    let exit = cthreads::run_main(config, Some(reactor), async move {
        let h = spawn(async move {
            let flags = libc::O_CREAT | libc::O_RDWR | libc::O_TRUNC;
            let fildes = open(&path_c, flags, 0o600).await;
            assert!(fildes >= 0, "open failed: {fildes}");

            let mut written = 0usize;
            while written < payload.len() {
                let n = write(fildes, &payload[written..], written as u64).await;
                assert!(n > 0, "write failed: {n}");
                written += n as usize;
            }

            let mut buf = vec![0u8; payload.len()];
            let mut got = 0usize;
            while got < buf.len() {
                let n = read(fildes, &mut buf[got..], got as u64).await;
                assert!(n > 0, "read failed: {n}");
                got += n as usize;
            }

            close(fildes).await;
            assert_eq!(buf, payload);

            let rc = unlink(&path_c).await;
            assert!(rc == 0, "unlink failed: {rc}");
            0
        })
        .unwrap();
        cthreads::api::join(h).await
    });
    cthreads_io::fini();

    assert_eq!(exit, 0);
}
