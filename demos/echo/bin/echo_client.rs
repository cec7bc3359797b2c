//! TCP echo client (§8.2 S6) built on `cthreads` + `cthreads-io`.
//!
//! Run with: `cargo run -p cthreads-echo-demo --bin echo-client -- 127.0.0.1 7070 "hello"`

use anyhow::{Context, Result};
use cthreads::KernelConfig;
use cthreads_io::prelude::{close, connect, recv, send};
use std::mem;
use std::net::Ipv4Addr;

async fn round_trip(sock_fd: i32, addr: libc::sockaddr_in, message: Vec<u8>) -> i32 {
    let message = message.as_slice();
    let rc = connect(
        sock_fd,
        (&addr as *const libc::sockaddr_in).cast(),
        mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
    )
    .await;
    if rc < 0 {
        eprintln!("connect failed: {rc}");
        return rc;
    }

    let mut sent = 0usize;
    while sent < message.len() {
        let w = send(sock_fd, &message[sent..], 0).await;
        if w <= 0 {
            return w;
        }
        sent += w as usize;
    }

    let mut echoed = vec![0u8; message.len()];
    let mut got = 0usize;
    while got < echoed.len() {
        let n = recv(sock_fd, &mut echoed[got..], 0).await;
        if n <= 0 {
            break;
        }
        got += n as usize;
    }

    close(sock_fd).await;

    if echoed == message {
        println!("echo matched: {:?}", String::from_utf8_lossy(&echoed));
        0
    } else {
        eprintln!("echo mismatch: sent {message:?}, got {echoed:?}");
        1
    }
}

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let host: Ipv4Addr = args
        .next()
        .unwrap_or_else(|| "127.0.0.1".to_string())
        .parse()
        .context("host must be an IPv4 address")?;
    let port: u16 = args.next().unwrap_or_else(|| "7070".to_string()).parse().context("port must be a u16")?;
    let message = args.next().unwrap_or_else(|| "hello, cthreads".to_string());

    let sock_fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0) };
    anyhow::ensure!(sock_fd >= 0, "socket() failed");

    let mut addr: libc::sockaddr_in = unsafe { mem::zeroed() };
    addr.sin_family = libc::AF_INET as libc::sa_family_t;
    addr.sin_addr.s_addr = u32::from(host).to_be();
    addr.sin_port = port.to_be();

    let config = KernelConfig::new(1 << 16, 32);
    let reactor = cthreads_io::init(config.ring_entries)?;
    let exit = cthreads::run_main(config, Some(reactor), round_trip(sock_fd, addr, message.into_bytes()));
    cthreads_io::fini();

    std::process::exit(exit);
}
