//! TCP echo server (§8.2 S6) built on `cthreads` + `cthreads-io`.
//!
//! Run with: `cargo run -p cthreads-echo-demo --bin echo-server -- 7070`
//!
//! The listening socket is created and bound synchronously with `libc`
//! (`socket`/`bind`/`listen` are not on the hot path and most real
//! io_uring servers set them up this way); every `accept`/`recv`/`send`
//! after that goes through the ring.

use anyhow::{Context, Result};
use cthreads::api::spawn;
use cthreads::KernelConfig;
use cthreads_io::prelude::{accept, close, recv, send};
use std::mem;

fn listen_on(port: u16) -> Result<i32> {
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0);
        anyhow::ensure!(fd >= 0, "socket() failed");

        let one: libc::c_int = 1;
        libc::setsockopt(
            fd,
            libc::SOL_SOCKET,
            libc::SO_REUSEADDR,
            (&one as *const libc::c_int).cast(),
            mem::size_of::<libc::c_int>() as libc::socklen_t,
        );

        let mut addr: libc::sockaddr_in = mem::zeroed();
        addr.sin_family = libc::AF_INET as libc::sa_family_t;
        addr.sin_addr.s_addr = libc::INADDR_ANY.to_be();
        addr.sin_port = port.to_be();

        let rc = libc::bind(
            fd,
            (&addr as *const libc::sockaddr_in).cast(),
            mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        );
        anyhow::ensure!(rc == 0, "bind() failed");

        let rc = libc::listen(fd, 128);
        anyhow::ensure!(rc == 0, "listen() failed");

        Ok(fd)
    }
}

/// Echoes every byte received back to the peer until `recv` reports EOF
/// (`0`) or an error (negative `-errno`), then closes the connection.
async fn handle_connection(client_fd: i32) {
    let mut buf = [0u8; 4096];
    loop {
        let n = recv(client_fd, &mut buf, 0).await;
        if n <= 0 {
            break;
        }
        let mut sent = 0usize;
        while sent < n as usize {
            let w = send(client_fd, &buf[sent..n as usize], 0).await;
            if w <= 0 {
                break;
            }
            sent += w as usize;
        }
    }
    close(client_fd).await;
}

async fn serve(listen_fd: i32, max_connections: u32) -> i32 {
    let mut handled = 0u32;
    let mut handles = Vec::new();
    while max_connections == 0 || handled < max_connections {
        let mut addr: libc::sockaddr = unsafe { mem::zeroed() };
        let mut addrlen = mem::size_of::<libc::sockaddr>() as libc::socklen_t;
        let client_fd = accept(listen_fd, &mut addr, &mut addrlen, 0).await;
        if client_fd < 0 {
            continue;
        }
        handled += 1;
        handles.push(spawn(handle_connection(client_fd)).expect("spawn handler"));
    }
    for h in handles {
        cthreads::api::join(h).await;
    }
    0
}

fn main() -> Result<()> {
    let port: u16 = std::env::args()
        .nth(1)
        .map(|s| s.parse().context("port must be a u16"))
        .transpose()?
        .unwrap_or(7070);
    let max_connections: u32 = std::env::args().nth(2).and_then(|s| s.parse().ok()).unwrap_or(1);

    let listen_fd = listen_on(port)?;
    println!("echo-server listening on 0.0.0.0:{port}, serving {max_connections} connection(s)");

    let config = KernelConfig::new(1 << 20, 256);
    let reactor = cthreads_io::init(config.ring_entries)?;
    let exit = cthreads::run_main(config, Some(reactor), serve(listen_fd, max_connections));
    cthreads_io::fini();

    unsafe {
        libc::close(listen_fd);
    }
    std::process::exit(exit);
}
