//! AFL Fuzz harness for the replicated document
//!
//! This harness tests the critical CRDT properties:
//! 1. Convergence: replicas that see the same operations render the same text
//! 2. Merge idempotency: merging the same replica twice is a no-op
//! 3. Structure: tree sizes, the order list and the tree traversal agree
//!
//! Model: Each user has their own replica. They edit locally and periodically
//! broadcast their operations to other users.

use afl::fuzz;
use strand::Config;
use strand::Crdt;
use strand::Document;
use strand::SiteId;

const NUM_USERS: usize = 3;

/// Operation types the fuzzer can generate
#[derive(Debug, Clone, Copy)]
enum FuzzOp {
    /// User inserts text at a position in their replica
    Insert { user: u8, pos_frac: u8, len: u8 },
    /// User deletes text from their replica
    Delete { user: u8, pos_frac: u8, len: u8 },
    /// User B receives everything user A has seen
    Broadcast { from: u8, to: u8 },
    /// All users sync (full mesh broadcast)
    FullSync,
}

impl FuzzOp {
    fn from_bytes(bytes: &[u8]) -> Option<(FuzzOp, &[u8])> {
        if bytes.is_empty() {
            return None;
        }

        let op_type = bytes[0] % 4;
        let rest = &bytes[1..];

        match op_type {
            0 if rest.len() >= 3 => {
                let op = FuzzOp::Insert {
                    user: rest[0] % NUM_USERS as u8,
                    pos_frac: rest[1],
                    len: (rest[2] % 32).saturating_add(1),
                };
                Some((op, &rest[3..]))
            }
            1 if rest.len() >= 3 => {
                let op = FuzzOp::Delete {
                    user: rest[0] % NUM_USERS as u8,
                    pos_frac: rest[1],
                    len: (rest[2] % 16).saturating_add(1),
                };
                Some((op, &rest[3..]))
            }
            2 if rest.len() >= 2 => {
                let op = FuzzOp::Broadcast {
                    from: rest[0] % NUM_USERS as u8,
                    to: rest[1] % NUM_USERS as u8,
                };
                Some((op, &rest[2..]))
            }
            3 => Some((FuzzOp::FullSync, rest)),
            _ => None,
        }
    }
}

/// Merge replica `from` into replica `to`.
fn broadcast(replicas: &mut [Document], from: usize, to: usize) {
    if from == to {
        return;
    }
    let (source, target) = if from < to {
        let (left, right) = replicas.split_at_mut(to);
        (&left[from], &mut right[0])
    } else {
        let (left, right) = replicas.split_at_mut(from);
        (&right[0], &mut left[to])
    };
    target.merge(source).unwrap();
}

fn full_sync(replicas: &mut [Document]) {
    for i in 0..NUM_USERS {
        for j in 0..NUM_USERS {
            broadcast(replicas, j, i);
        }
    }
}

fn main() {
    fuzz!(|data: &[u8]| {
        // Deterministic sites and a small degree so splits happen early
        let mut replicas: Vec<Document> = (0..NUM_USERS)
            .map(|i| Document::with_config(Config::new().site(SiteId(i as u128 + 1)).degree(2)).unwrap())
            .collect();
        let mut remaining = data;

        while let Some((op, rest)) = FuzzOp::from_bytes(remaining) {
            remaining = rest;

            match op {
                FuzzOp::Insert { user, pos_frac, len } => {
                    let r = &mut replicas[user as usize];
                    let doc_len = r.visible_len();
                    let pos = (pos_frac as usize * doc_len / 256).min(doc_len);
                    let content: String = (0..len)
                        .map(|i| (b'A' + (user.wrapping_add(i) % 26)) as char)
                        .collect();
                    r.insert_text(pos, &content).unwrap();
                }

                FuzzOp::Delete { user, pos_frac, len } => {
                    let r = &mut replicas[user as usize];
                    let doc_len = r.visible_len();
                    if doc_len > 0 {
                        let pos = (pos_frac as usize * doc_len / 256).min(doc_len - 1);
                        let end = (pos + len as usize).min(doc_len);
                        r.delete_range(pos, end).unwrap();
                    }
                }

                FuzzOp::Broadcast { from, to } => {
                    broadcast(&mut replicas, from as usize, to as usize);
                }

                FuzzOp::FullSync => {
                    full_sync(&mut replicas);

                    // CRITICAL INVARIANT: All replicas must converge!
                    let first = replicas[0].render();
                    for (i, r) in replicas.iter().enumerate().skip(1) {
                        assert_eq!(r.render(), first, "Convergence failure! User {} != User 0 after full sync", i);
                    }
                }
            }
        }

        full_sync(&mut replicas);
        let first = replicas[0].render();
        for (i, r) in replicas.iter().enumerate().skip(1) {
            assert_eq!(r.render(), first, "Final convergence failure! User {} != User 0", i);
        }

        // A second sync must change nothing
        let revisions: Vec<u64> = replicas.iter().map(Document::revision).collect();
        full_sync(&mut replicas);
        for (r, revision) in replicas.iter().zip(revisions) {
            assert_eq!(r.revision(), revision, "Merge was not idempotent");
        }

        for r in &replicas {
            r.validate().unwrap();
            assert_eq!(r.render().chars().count(), r.visible_len(), "Length mismatch");
            assert_eq!(r.pending_len(), 0, "Operations left pending after full sync");
        }
    });
}
