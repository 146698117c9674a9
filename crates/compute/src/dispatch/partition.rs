//! Deterministic assignment of transactions to worker partitions.

use std::collections::{BTreeSet, HashMap};

use sha2::{Digest, Sha256};

use verdict_core::MetricRecord;

/// Run-independent hash of a transaction name: the first 8 bytes of its
/// SHA-256 digest, big-endian.
pub fn stable_hash(name: &str) -> u64 {
    let digest = Sha256::digest(name.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

pub fn partition_of(name: &str, workers: usize) -> usize {
    (stable_hash(name) % workers.max(1) as u64) as usize
}

/// One worker's share of both windows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Partition {
    pub id: usize,
    /// Transaction names, sorted.
    pub transactions: Vec<String>,
    pub control: Vec<MetricRecord>,
    pub test: Vec<MetricRecord>,
}

/// Split both windows into `min(requested, distinct transactions)`
/// partitions by [`partition_of`]. Partitions that receive no transaction
/// are dropped, so ids may have holes.
pub fn partition_records(
    control: Vec<MetricRecord>,
    test: Vec<MetricRecord>,
    requested: usize,
) -> Vec<Partition> {
    let names: BTreeSet<&str> = control
        .iter()
        .chain(test.iter())
        .map(|r| r.name.as_str())
        .collect();
    if names.is_empty() {
        return Vec::new();
    }
    let workers = requested.max(1).min(names.len());

    let mut partitions: Vec<Partition> = (0..workers)
        .map(|id| Partition {
            id,
            ..Partition::default()
        })
        .collect();
    let mut slot: HashMap<String, usize> = HashMap::with_capacity(names.len());
    for name in names {
        let p = partition_of(name, workers);
        partitions[p].transactions.push(name.to_string());
        slot.insert(name.to_string(), p);
    }

    for rec in control {
        if let Some(&p) = slot.get(&rec.name) {
            partitions[p].control.push(rec);
        }
    }
    for rec in test {
        if let Some(&p) = slot.get(&rec.name) {
            partitions[p].test.push(rec);
        }
    }

    partitions.retain(|p| !p.transactions.is_empty());
    partitions
}
