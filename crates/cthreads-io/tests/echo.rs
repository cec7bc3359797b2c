//! §8.2 S6 — TCP echo: a server cthread multi-accepts clients, handling
//! each on its own child cthread (read-then-write-back until EOF); N
//! client cthreads each connect over loopback, send 10 messages of the
//! form `"Message {i} from Task {tid}"`, and confirm every echo matches
//! before the server is told how many connections to expect and shuts
//! its listener down.

use cthreads::api::{join, spawn};
use cthreads::KernelConfig;
use cthreads_io::prelude::{accept, close, connect, recv, send};
use std::mem;

const MESSAGES_PER_CLIENT: usize = 10;
const CLIENT_COUNT: usize = 3;

fn bind_loopback_any_port() -> (i32, u16) {
    unsafe {
        let fd = libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0);
        assert!(fd >= 0, "socket() failed");

        let mut addr: libc::sockaddr_in = mem::zeroed();
        addr.sin_family = libc::AF_INET as libc::sa_family_t;
        addr.sin_addr.s_addr = libc::INADDR_LOOPBACK.to_be();
        addr.sin_port = 0; // ask the kernel to pick a free port

        let rc = libc::bind(
            fd,
            (&addr as *const libc::sockaddr_in).cast(),
            mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
        );
        assert_eq!(rc, 0, "bind() failed");

        let mut got: libc::sockaddr_in = mem::zeroed();
        let mut got_len = mem::size_of::<libc::sockaddr_in>() as libc::socklen_t;
        let rc = libc::getsockname(fd, (&mut got as *mut libc::sockaddr_in).cast(), &mut got_len);
        assert_eq!(rc, 0, "getsockname() failed");

        let rc = libc::listen(fd, 16);
        assert_eq!(rc, 0, "listen() failed");

        (fd, u16::from_be(got.sin_port))
    }
}

/// Reads whatever arrives and writes it straight back, until the peer
/// closes (`recv` returns 0) or errors.
async fn handle_client(client_fd: i32) {
    let mut buf = [0u8; 256];
    loop {
        let n = recv(client_fd, &mut buf, 0).await;
        if n <= 0 {
            break;
        }
        let mut sent = 0usize;
        while sent < n as usize {
            let w = send(client_fd, &buf[sent..n as usize], 0).await;
            assert!(w > 0, "server send failed: {w}");
            sent += w as usize;
        }
    }
    close(client_fd).await;
}

async fn run_client(tid: usize, port: u16) {
    let sock_fd = unsafe { libc::socket(libc::AF_INET, libc::SOCK_STREAM, 0) };
    assert!(sock_fd >= 0, "client socket() failed");

    let mut addr: libc::sockaddr_in = unsafe { mem::zeroed() };
    addr.sin_family = libc::AF_INET as libc::sa_family_t;
    addr.sin_addr.s_addr = libc::INADDR_LOOPBACK.to_be();
    addr.sin_port = port.to_be();

    let rc = connect(
        sock_fd,
        (&addr as *const libc::sockaddr_in).cast(),
        mem::size_of::<libc::sockaddr_in>() as libc::socklen_t,
    )
    .await;
    assert_eq!(rc, 0, "client {tid} connect failed: {rc}");

    for i in 0..MESSAGES_PER_CLIENT {
        let message = format!("Message {i} from Task {tid}").into_bytes();

        let mut sent = 0usize;
        while sent < message.len() {
            let w = send(sock_fd, &message[sent..], 0).await;
            assert!(w > 0, "client {tid} send failed: {w}");
            sent += w as usize;
        }

        let mut echoed = vec![0u8; message.len()];
        let mut got = 0usize;
        while got < echoed.len() {
            let n = recv(sock_fd, &mut echoed[got..], 0).await;
            assert!(n > 0, "client {tid} recv failed: {n}");
            got += n as usize;
        }
        assert_eq!(echoed, message, "client {tid} message {i} mismatch");
    }

    close(sock_fd).await;
}

#[test]
fn s6_tcp_echo_round_trip() {
    let (listen_fd, port) = bind_loopback_any_port();

    let config = KernelConfig::new(1 << 17, 128);
    let reactor = cthreads_io::init(config.ring_entries).expect("io_uring init");

    let exit = cthreads::run_main(config, Some(reactor), async move {
        let server = spawn(async move {
            let mut handlers = Vec::new();
            for _ in 0..CLIENT_COUNT {
                let mut addr: libc::sockaddr = unsafe { mem::zeroed() };
                let mut addrlen = mem::size_of::<libc::sockaddr>() as libc::socklen_t;
                let client_fd = accept(listen_fd, &mut addr, &mut addrlen, 0).await;
                assert!(client_fd >= 0, "accept failed: {client_fd}");
                handlers.push(spawn(handle_client(client_fd)).expect("spawn handler"));
            }
            for h in handlers {
                join(h).await;
            }
            unsafe { libc::close(listen_fd) };
            0
        })
        .unwrap();

        let mut clients = Vec::new();
        for tid in 0..CLIENT_COUNT {
            clients.push(spawn(run_client(tid, port)).unwrap());
        }
        for c in clients {
            join(c).await;
        }
        join(server).await;
        0
    });
    cthreads_io::fini();

    assert_eq!(exit, 0);
}
