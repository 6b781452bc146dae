//! Free TCP port allocation.
use std::{io, net::TcpListener};

/// Hands out a TCP port that is currently free.
pub trait PortAllocator {
    /// Returns a port in `1..=65535` that nothing was listening on at the time of the call.
    fn allocate(&self) -> io::Result<u16>;
}

/// Asks the kernel for an ephemeral port on the loopback interface.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoopbackPorts;

impl PortAllocator for LoopbackPorts {
    fn allocate(&self) -> io::Result<u16> {
        let listener = TcpListener::bind(("127.0.0.1", 0))?;
        Ok(listener.local_addr()?.port())
    }
}
