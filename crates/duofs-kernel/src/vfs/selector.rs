//! Backend selection for single-backend queries.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::vfs::resolve::Backend;

/// How single-backend queries pick the backend that answers.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SelectionPolicy {
    /// Uniformly random per call, independent across calls.
    #[default]
    Random,
    /// Always backend A.
    A,
    /// Always backend B.
    B,
}

/// Picks one backend for directory listing, readlink, access, statfs and
/// extended-attribute reads.
///
/// Both backends hold mirrored copies of these objects, so which one answers
/// is not observable as long as replication has not diverged.
#[derive(Debug, Clone, Copy)]
pub struct BackendSelector {
    policy: SelectionPolicy,
}

impl BackendSelector {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self { policy }
    }

    /// Choose the backend for one call.
    pub fn pick(&self) -> Backend {
        match self.policy {
            SelectionPolicy::Random => {
                if rand::random::<bool>() {
                    Backend::A
                } else {
                    Backend::B
                }
            }
            SelectionPolicy::A => Backend::A,
            SelectionPolicy::B => Backend::B,
        }
    }
}

impl Default for BackendSelector {
    fn default() -> Self {
        Self::new(SelectionPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_policies() {
        let a = BackendSelector::new(SelectionPolicy::A);
        let b = BackendSelector::new(SelectionPolicy::B);
        for _ in 0..16 {
            assert_eq!(a.pick(), Backend::A);
            assert_eq!(b.pick(), Backend::B);
        }
    }

    #[test]
    fn test_random_policy_uses_both_backends() {
        let selector = BackendSelector::default();
        let picks: Vec<Backend> = (0..256).map(|_| selector.pick()).collect();
        assert!(picks.contains(&Backend::A));
        assert!(picks.contains(&Backend::B));
    }

    #[test]
    fn test_policy_parse() {
        assert_eq!("random".parse::<SelectionPolicy>().unwrap(), SelectionPolicy::Random);
        assert_eq!(SelectionPolicy::B.to_string(), "b");
    }
}
