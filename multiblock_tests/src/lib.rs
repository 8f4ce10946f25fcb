// Test-only observer for cluster pipeline integration tests.
//
// Wraps a real `ReplicaWorld` (from `multiblock_sim::replica`) behind a byte
// stream: every message the sim produces is framed with
// `multiblock_protocol::send_message`, read back with `recv_message`, and
// only then applied to the replica. The tests therefore exercise the same
// framing, JSON envelope, and delta decoding an out-of-process observer
// would.
//
// See also: `tests/full_pipeline.rs` for the scenarios.

use std::io::Cursor;

use multiblock_protocol::{ObserverMessage, recv_message, send_message};
use multiblock_sim::kind::ClusterKind;
use multiblock_sim::replica::{ReplicaEvent, ReplicaWorld};
use multiblock_sim::sim::ClusterSim;

/// A replica fed through the real wire path.
#[derive(Debug, Default)]
pub struct TestObserver {
    pub replica: ReplicaWorld,
    /// Messages that framed and parsed but whose delta was rejected.
    pub rejected: usize,
    /// Messages delivered, rejected or not.
    pub received: usize,
}

impl TestObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to a running sim: receive its full current state.
    pub fn attach<K: ClusterKind>(sim: &ClusterSim<K>) -> Self {
        let mut observer = Self::new();
        observer.receive(&sim.snapshot_for_observer());
        observer
    }

    /// Push `messages` through a framed stream and apply what comes out.
    pub fn receive(&mut self, messages: &[ObserverMessage]) {
        let mut wire = Vec::new();
        for msg in messages {
            send_message(&mut wire, msg).expect("framing an observer message failed");
        }
        let mut reader = Cursor::new(wire);
        while let Some(msg) = recv_message(&mut reader).expect("reading an observer message failed") {
            self.received += 1;
            if self.replica.apply_message(&msg).is_err() {
                self.rejected += 1;
            }
        }
    }

    /// Drain the sim's outbound deltas into this observer.
    pub fn pump<K: ClusterKind>(&mut self, sim: &mut ClusterSim<K>) {
        let messages = sim.drain_outbound();
        self.receive(&messages);
    }

    pub fn tick(&mut self) -> Vec<ReplicaEvent> {
        self.replica.tick()
    }
}
