//! Defines the peer topology exercised by the performance harness.
use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a peerset within a topology.
pub type PeersetIdx = usize;
/// Index of a peer within its peerset.
pub type PeerIdx = usize;

/// Describes a group of cooperating peers.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Peerset {
    /// Position of the peerset in the topology.
    pub index: PeersetIdx,
    /// Number of peers in the peerset.
    pub peers: u32,
}

/// Ordered list of peersets, built from the number of peers in each.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PeerTopology {
    peersets: Vec<Peerset>,
}

impl PeerTopology {
    /// Build a topology where `counts[i]` is the number of peers in peerset `i`.
    pub fn from_counts(counts: &[u32]) -> Self {
        Self {
            peersets: counts
                .iter()
                .enumerate()
                .map(|(index, peers)| Peerset {
                    index,
                    peers: *peers,
                })
                .collect(),
        }
    }

    /// Report the peersets in order.
    pub fn peersets(&self) -> &[Peerset] {
        &self.peersets
    }

    /// Report the number of peers across all peersets.
    pub fn total_peers(&self) -> u32 {
        self.peersets.iter().map(|p| p.peers).sum()
    }

    /// Cluster-internal service name of a single peer.
    pub fn service_name(peerset: PeersetIdx, peer: PeerIdx) -> String {
        format!("peer{peer}-peerset{peerset}-service")
    }

    /// Render the topology as `addr,addr;addr,...` where each address is a
    /// peer service reachable on `port`.
    pub fn descriptor(&self, port: u16) -> String {
        self.peersets
            .iter()
            .map(|peerset| {
                (0..peerset.peers as usize)
                    .map(|peer| format!("{}:{port}", Self::service_name(peerset.index, peer)))
                    .collect::<Vec<String>>()
                    .join(",")
            })
            .collect::<Vec<String>>()
            .join(";")
    }
}

impl fmt::Display for PeerTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self
            .peersets
            .iter()
            .map(|p| p.peers.to_string())
            .collect::<Vec<String>>();
        write!(f, "[{}]", counts.join(","))
    }
}
