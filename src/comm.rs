//! Thin façade over intra-process (threaded) or inter-process (MPI)
//! message passing.
//!
//! Messages are *contiguous byte slices* (no zero-copy guarantees). All
//! handles are **waitable** but non-blocking -– exchange.rs calls `.wait()`
//! before it trusts that a buffer is ready. On top of the raw primitives
//! the trait provides the two composite operations the stepping core
//! needs: a paired [`send_recv`](Communicator::send_recv) rendezvous and a
//! [`reduce_sum`](Communicator::reduce_sum) delivered to rank 0.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::sim_error::SimError;

/// Base value for a family of related message tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommTag(pub u16);

impl CommTag {
    #[inline]
    pub fn base(self) -> u16 {
        self.0
    }

    /// Derive the tag at fixed offset `k` within this family.
    #[inline]
    pub fn offset(self, k: u16) -> CommTag {
        CommTag(self.0 + k)
    }
}

/// Anything that can be waited on.
pub trait Wait {
    /// Wait for completion and return the received data (if any).
    fn wait(self) -> Option<Vec<u8>>;
}

impl Wait for () {
    fn wait(self) -> Option<Vec<u8>> {
        None
    }
}

/// Non-blocking communication interface (minimal by design).
pub trait Communicator: Send + Sync + 'static {
    /// Handle returned by `isend`.
    type SendHandle: Wait;
    /// Handle returned by `irecv`.
    type RecvHandle: Wait;

    fn rank(&self) -> usize;
    fn size(&self) -> usize;

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle;
    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle;

    /// Paired blocking rendezvous with one `peer`: send `send` and receive
    /// exactly `recv_len` bytes under the same tag. Both sides of a link
    /// must call this symmetrically; the call does not return until its
    /// half of the pair completed.
    ///
    /// The default stages the receive, posts the send, then waits.
    /// Backends with a native combined primitive may override.
    ///
    /// # Errors
    /// [`SimError::Communication`] if the receive never completes,
    /// [`SimError::HaloPayloadSize`] if the peer's payload has the wrong
    /// length.
    fn send_recv(
        &self,
        peer: usize,
        tag: CommTag,
        send: &[u8],
        recv_len: usize,
    ) -> Result<Vec<u8>, SimError> {
        let mut buf = vec![0u8; recv_len];
        let rh = self.irecv(peer, tag.base(), &mut buf);
        let sh = self.isend(peer, tag.base(), send);
        let _ = sh.wait();
        let data = rh.wait().ok_or(SimError::Communication {
            peer,
            op: "paired send-recv",
        })?;
        if data.len() != recv_len {
            return Err(SimError::HaloPayloadSize {
                peer,
                expected: recv_len,
                got: data.len(),
            });
        }
        Ok(data)
    }

    /// Sum `local` over all ranks, delivering the total to rank 0.
    ///
    /// Returns `Ok(Some(total))` on rank 0 and `Ok(None)` everywhere else.
    /// The default gathers to rank 0 and sums in rank order, so its result
    /// is deterministic; backends may override with a native reduction
    /// whose summation order differs (callers feed this into reporting
    /// only, never into field state).
    fn reduce_sum(&self, tag: CommTag, local: f64) -> Result<Option<f64>, SimError> {
        if self.size() == 1 {
            return Ok(Some(local));
        }
        if self.rank() == 0 {
            let mut total = local;
            for peer in 1..self.size() {
                let mut buf = [0u8; 8];
                let h = self.irecv(peer, tag.base(), &mut buf);
                let raw = h.wait().ok_or(SimError::Communication {
                    peer,
                    op: "reduce-sum gather",
                })?;
                if raw.len() != 8 {
                    return Err(SimError::HaloPayloadSize {
                        peer,
                        expected: 8,
                        got: raw.len(),
                    });
                }
                let mut scalar = [0u8; 8];
                scalar.copy_from_slice(&raw[..8]);
                total += f64::from_ne_bytes(scalar);
            }
            Ok(Some(total))
        } else {
            let h = self.isend(0, tag.base(), &local.to_ne_bytes());
            let _ = h.wait();
            Ok(None)
        }
    }
}

/// Compile-time no-op comm for pure serial runs and unit tests.
///
/// A single rank has no exchange partners, so `isend`/`irecv` are never
/// reached by the stepping core; `reduce_sum` returns the local value.
#[derive(Clone, Debug, Default)]
pub struct NoComm;

impl Communicator for NoComm {
    type SendHandle = ();
    type RecvHandle = ();

    fn rank(&self) -> usize {
        0
    }
    fn size(&self) -> usize {
        1
    }

    fn isend(&self, _peer: usize, _tag: u16, _buf: &[u8]) {}
    fn irecv(&self, _peer: usize, _tag: u16, _buf: &mut [u8]) {}
}

// --- RayonComm: intra-process / multi-thread ---

type Key = (usize, usize, u16); // (src, dst, tag)

/// Process-global mailbox. Each key holds a FIFO queue so back-to-back
/// steps on the same link cannot overwrite one another; tests that reuse
/// ranks and tags must therefore be serialized per test binary.
static MAILBOX: Lazy<DashMap<Key, VecDeque<Bytes>>> = Lazy::new(DashMap::new);

pub struct LocalHandle {
    buf: Arc<Mutex<Option<Vec<u8>>>>,
    handle: Option<JoinHandle<()>>,
}

impl Wait for LocalHandle {
    fn wait(mut self) -> Option<Vec<u8>> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        let mut guard = self.buf.lock().unwrap();
        guard.take()
    }
}

/// In-process communicator: every simulated rank lives on its own thread
/// of one test process and talks through [`MAILBOX`].
#[derive(Clone, Debug)]
pub struct RayonComm {
    rank: usize,
    size: usize,
}

impl RayonComm {
    pub fn new(rank: usize, size: usize) -> Self {
        Self { rank, size }
    }
}

impl Communicator for RayonComm {
    type SendHandle = ();
    type RecvHandle = LocalHandle;

    fn rank(&self) -> usize {
        self.rank
    }
    fn size(&self) -> usize {
        self.size
    }

    fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> Self::SendHandle {
        let key = (self.rank, peer, tag);
        MAILBOX
            .entry(key)
            .or_default()
            .push_back(Bytes::from(buf.to_vec()));
    }

    fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> Self::RecvHandle {
        let key = (peer, self.rank, tag);
        let buf_arc = Arc::new(Mutex::new(None));
        let buf_arc_clone = buf_arc.clone();
        let buf_len = buf.len();
        let handle = std::thread::spawn(move || {
            loop {
                let popped = MAILBOX.get_mut(&key).and_then(|mut q| q.pop_front());
                if let Some(bytes) = popped {
                    let n = bytes.len().min(buf_len);
                    let mut guard = buf_arc_clone.lock().unwrap();
                    *guard = Some(bytes[..n].to_vec());
                    break;
                }
                std::thread::yield_now();
            }
        });
        LocalHandle {
            buf: buf_arc,
            handle: Some(handle),
        }
    }
}

// --- MPI backend (feature = "mpi-support") ---
#[cfg(feature = "mpi-support")]
mod mpi_backend {
    use super::{CommTag, Communicator, Wait};
    use crate::sim_error::SimError;
    use mpi::collective::SystemOperation;
    use mpi::environment::Universe;
    use mpi::point_to_point as p2p;
    use mpi::topology::SimpleCommunicator;
    use mpi::traits::*;

    /// One-per-process MPI communicator; owns the universe for the
    /// lifetime of the run.
    pub struct MpiComm {
        universe: Universe,
        rank: usize,
        size: usize,
    }

    impl MpiComm {
        /// Initialize MPI. Returns `None` if it was already initialized
        /// in this process.
        pub fn new() -> Option<Self> {
            let universe = mpi::initialize()?;
            let world = universe.world();
            let rank = world.rank() as usize;
            let size = world.size() as usize;
            Some(Self {
                universe,
                rank,
                size,
            })
        }

        fn world(&self) -> SimpleCommunicator {
            self.universe.world()
        }
    }

    /// Completed-send marker; `isend` on this backend sends eagerly.
    pub struct MpiDone;

    impl Wait for MpiDone {
        fn wait(self) -> Option<Vec<u8>> {
            None
        }
    }

    /// Completed receive carrying its payload; `irecv` on this backend
    /// receives eagerly.
    pub struct MpiReceived(Vec<u8>);

    impl Wait for MpiReceived {
        fn wait(self) -> Option<Vec<u8>> {
            Some(self.0)
        }
    }

    // The immediate calls below complete eagerly, which is only safe for
    // gather-shaped patterns (peers send, the root receives). The pairwise
    // halo rendezvous never goes through them: `send_recv` is overridden
    // with MPI's combined send-receive.
    impl Communicator for MpiComm {
        type SendHandle = MpiDone;
        type RecvHandle = MpiReceived;

        fn rank(&self) -> usize {
            self.rank
        }
        fn size(&self) -> usize {
            self.size
        }

        fn isend(&self, peer: usize, tag: u16, buf: &[u8]) -> MpiDone {
            self.world()
                .process_at_rank(peer as i32)
                .send_with_tag(buf, tag as i32);
            MpiDone
        }

        fn irecv(&self, peer: usize, tag: u16, buf: &mut [u8]) -> MpiReceived {
            self.world()
                .process_at_rank(peer as i32)
                .receive_into_with_tag(buf, tag as i32);
            MpiReceived(buf.to_vec())
        }

        fn send_recv(
            &self,
            peer: usize,
            tag: CommTag,
            send: &[u8],
            recv_len: usize,
        ) -> Result<Vec<u8>, SimError> {
            let mut recv = vec![0u8; recv_len];
            let world = self.world();
            let process = world.process_at_rank(peer as i32);
            p2p::send_receive_into_with_tags(
                send,
                &process,
                tag.base() as i32,
                &mut recv[..],
                &process,
                tag.base() as i32,
            );
            Ok(recv)
        }

        fn reduce_sum(&self, _tag: CommTag, local: f64) -> Result<Option<f64>, SimError> {
            let world = self.world();
            let root = world.process_at_rank(0);
            if self.rank == 0 {
                let mut total = 0.0f64;
                root.reduce_into_root(&local, &mut total, SystemOperation::sum());
                Ok(Some(total))
            } else {
                root.reduce_into(&local, SystemOperation::sum());
                Ok(None)
            }
        }
    }
}

#[cfg(feature = "mpi-support")]
pub use mpi_backend::MpiComm;

#[cfg(test)]
mod tests {
    use super::*;

    // Each test uses its own tag family so the process-global mailbox
    // never cross-talks between tests.

    #[test]
    fn rayon_round_trip() {
        let tag = CommTag(0x1000);
        let c0 = RayonComm::new(0, 2);
        let c1 = RayonComm::new(1, 2);

        let msg = b"hello";
        let _s = c0.isend(1, tag.base(), msg);

        let mut buf = [0u8; 5];
        let h = c1.irecv(0, tag.base(), &mut buf);
        let got = h.wait().unwrap();
        assert_eq!(&got, msg);
    }

    #[test]
    fn rayon_fifo_order() {
        let tag = CommTag(0x1001);
        let c0 = RayonComm::new(0, 2);
        let c1 = RayonComm::new(1, 2);

        for i in 0..10u8 {
            c0.isend(1, tag.base(), &[i]);
        }
        let mut out = Vec::new();
        for _ in 0..10 {
            let mut b = [0u8; 1];
            let h = c1.irecv(0, tag.base(), &mut b);
            out.push(h.wait().unwrap()[0]);
        }
        assert_eq!(out, (0u8..10u8).collect::<Vec<_>>());
    }

    #[test]
    fn truncation_is_ok() {
        let tag = CommTag(0x1002);
        let c0 = RayonComm::new(0, 2);
        let c1 = RayonComm::new(1, 2);

        c0.isend(1, tag.base(), &[1, 2, 3, 4, 5, 6]);
        let mut b = [0u8; 4];
        let h = c1.irecv(0, tag.base(), &mut b);
        let got = h.wait().unwrap();
        assert_eq!(got, vec![1, 2, 3, 4]);
    }

    #[test]
    fn paired_send_recv_both_directions() {
        let tag = CommTag(0x1003);
        let lo = std::thread::spawn(move || {
            let c = RayonComm::new(0, 2);
            c.send_recv(1, tag, &[1, 1, 1, 1], 4).unwrap()
        });
        let hi = std::thread::spawn(move || {
            let c = RayonComm::new(1, 2);
            c.send_recv(0, tag, &[2, 2, 2, 2], 4).unwrap()
        });
        assert_eq!(lo.join().unwrap(), vec![2, 2, 2, 2]);
        assert_eq!(hi.join().unwrap(), vec![1, 1, 1, 1]);
    }

    #[test]
    fn reduce_sum_gathers_to_rank_zero() {
        let tag = CommTag(0x1004);
        let mut workers = Vec::new();
        for rank in 0..3usize {
            workers.push(std::thread::spawn(move || {
                let c = RayonComm::new(rank, 3);
                c.reduce_sum(tag, (rank + 1) as f64).unwrap()
            }));
        }
        let results: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
        assert_eq!(results[0], Some(6.0));
        assert_eq!(results[1], None);
        assert_eq!(results[2], None);
    }

    #[test]
    fn no_comm_reduce_is_identity() {
        assert_eq!(NoComm.reduce_sum(CommTag(0x1005), 2.5), Ok(Some(2.5)));
    }
}
