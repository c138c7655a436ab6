use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};

use mini_rpc_protocol::ServiceMetaInfo;

use crate::config::LoadBalancerKind;

/// Picks one candidate out of a non-empty discovery result (`spec.md` §4.5).
/// Candidates are never mutated or filtered here — that happens upstream in
/// discovery; a balancer only chooses among whatever it's handed.
pub trait LoadBalancer: Send + Sync {
    /// `call_key` is whatever the caller wants selection to be stable on
    /// (e.g. `"{serviceKey}#{methodName}"` for consistent hashing); balancers
    /// that don't need it ignore the argument.
    fn select<'a>(&self, call_key: &str, candidates: &'a [ServiceMetaInfo]) -> Option<&'a ServiceMetaInfo>;
}

/// Cycles through candidates using one counter shared across every call this
/// balancer handles, so repeated calls against a stable candidate list spread
/// evenly rather than restarting from index 0 each time.
#[derive(Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobin {
    fn select<'a>(&self, _call_key: &str, candidates: &'a [ServiceMetaInfo]) -> Option<&'a ServiceMetaInfo> {
        if candidates.is_empty() {
            return None;
        }
        let i = self.counter.fetch_add(1, Ordering::Relaxed) % candidates.len();
        candidates.get(i)
    }
}

pub struct Random;

impl LoadBalancer for Random {
    fn select<'a>(&self, _call_key: &str, candidates: &'a [ServiceMetaInfo]) -> Option<&'a ServiceMetaInfo> {
        if candidates.is_empty() {
            return None;
        }
        let i = rand::random::<usize>() % candidates.len();
        candidates.get(i)
    }
}

const VIRTUAL_NODE_NUM: u32 = 100;

/// Hashes `call_key` onto a ring of `VIRTUAL_NODE_NUM` virtual points per
/// candidate, so the same key keeps landing on the same candidate across
/// calls as long as the candidate list is unchanged (`spec.md` §4.5). The
/// ring is rebuilt from scratch on every `select` call rather than cached —
/// candidate lists here are short (a handful of provider nodes), so the cost
/// is negligible next to the network round trip that follows.
pub struct ConsistentHash;

impl LoadBalancer for ConsistentHash {
    fn select<'a>(&self, call_key: &str, candidates: &'a [ServiceMetaInfo]) -> Option<&'a ServiceMetaInfo> {
        if candidates.is_empty() {
            return None;
        }

        let target = hash_str(call_key);

        let mut ring: Vec<(u64, usize)> = Vec::with_capacity(candidates.len() * VIRTUAL_NODE_NUM as usize);
        for (idx, candidate) in candidates.iter().enumerate() {
            for v in 0..VIRTUAL_NODE_NUM {
                let point = format!("{}#{v}", candidate.service_node_key());
                ring.push((hash_str(&point), idx));
            }
        }
        ring.sort_unstable_by_key(|(h, _)| *h);

        let chosen = ring
            .iter()
            .find(|(h, _)| *h >= target)
            .or_else(|| ring.first())
            .map(|(_, idx)| *idx)?;

        candidates.get(chosen)
    }
}

fn hash_str(s: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    s.hash(&mut hasher);
    hasher.finish()
}

/// Builds the configured balancer. A `ServiceProxy` keeps one instance alive
/// for its whole lifetime rather than constructing one per call, since
/// `RoundRobin`'s counter must persist across calls to spread candidates
/// evenly (`spec.md` §4.5).
pub fn for_kind(kind: LoadBalancerKind) -> Box<dyn LoadBalancer> {
    match kind {
        LoadBalancerKind::RoundRobin => Box::new(RoundRobin::new()),
        LoadBalancerKind::Random => Box::new(Random),
        LoadBalancerKind::ConsistentHash => Box::new(ConsistentHash),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(port: u16) -> ServiceMetaInfo {
        ServiceMetaInfo::new("demo", "localhost", port)
    }

    #[test]
    fn round_robin_visits_every_candidate_before_repeating() {
        let candidates = vec![node(1), node(2), node(3)];
        let lb = RoundRobin::new();

        let mut seen = std::collections::HashSet::new();
        for _ in 0..3 {
            let chosen = lb.select("k", &candidates).unwrap();
            seen.insert(chosen.service_port);
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn round_robin_returns_none_for_empty_candidates() {
        let lb = RoundRobin::new();
        assert!(lb.select("k", &[]).is_none());
    }

    #[test]
    fn consistent_hash_is_deterministic_for_a_fixed_candidate_list() {
        let candidates = vec![node(1), node(2), node(3), node(4)];
        let lb = ConsistentHash;

        let first = lb.select("same-key", &candidates).unwrap().service_port;
        let second = lb.select("same-key", &candidates).unwrap().service_port;
        assert_eq!(first, second);
    }

    #[test]
    fn consistent_hash_always_selects_a_real_candidate() {
        let candidates = vec![node(1), node(2)];
        let lb = ConsistentHash;

        for i in 0..50 {
            let chosen = lb.select(&format!("key-{i}"), &candidates).unwrap();
            assert!(candidates.iter().any(|c| c.service_port == chosen.service_port));
        }
    }
}
