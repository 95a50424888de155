//! Next-rotator selection.

use {
    rand::Rng,
    tracing::{debug, warn},
};

use crate::{Error, Result, history::RotationHistory, rules::RotatorRules, types::Member};

/// Outcome of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub rotator: String,
    /// The shuffled candidate order; `rotator` is its first element.
    pub order: Vec<String>,
    /// Whether the history was exhausted and reset for this pick.
    pub replenished: bool,
}

/// Names of members that are active and pass the channel's name rules, in
/// membership order.
#[must_use]
pub fn eligible_names(members: &[Member], rules: &RotatorRules) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(members.len());
    for member in members.iter().filter(|m| rules.is_eligible(m)) {
        if !names.contains(&member.name) {
            names.push(member.name.clone());
        }
    }
    names
}

/// In-place Fisher–Yates shuffle.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.random_range(0..=i);
        items.swap(i, j);
    }
}

/// Pick the next rotator for `channel` and record it in `history`.
///
/// Members already in the history are skipped. When nobody is left the
/// history is cleared and the full eligible set is used instead; this happens
/// at most once per call. Fails with [`Error::NoEligibleRotators`] when the
/// eligible set itself is empty.
pub fn select_rotator<R: Rng + ?Sized>(
    channel: &str,
    members: &[Member],
    rules: &RotatorRules,
    history: &mut RotationHistory,
    rng: &mut R,
) -> Result<Selection> {
    let eligible = eligible_names(members, rules);

    for replenish in [false, true] {
        let mut available: Vec<String> = if replenish {
            eligible.clone()
        } else {
            eligible
                .iter()
                .filter(|name| !history.contains(name))
                .cloned()
                .collect()
        };

        if available.is_empty() {
            if !replenish {
                warn!(channel, "no rotators left, resetting history");
                history.reset();
            }
            continue;
        }

        shuffle(&mut available, rng);
        let rotator = available[0].clone();
        history.record(rotator.clone());
        debug!(channel, order = ?available, replenish, "rotator candidates");

        return Ok(Selection {
            rotator,
            order: available,
            replenished: replenish,
        });
    }

    Err(Error::no_eligible_rotators(channel))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::types::Presence,
        rand::{SeedableRng, rngs::StdRng},
        std::collections::{BTreeSet, HashMap},
    };

    fn rules() -> RotatorRules {
        RotatorRules::new("POC: %s", "%s is now the POC for #%s").unwrap()
    }

    fn active(names: &[&str]) -> Vec<Member> {
        names
            .iter()
            .enumerate()
            .map(|(i, n)| Member::new(format!("U{i}"), *n, Presence::Active))
            .collect()
    }

    #[test]
    fn eligible_set_respects_inclusion_and_exclusion() {
        let r = rules().include(["alice", "bob"]).exclude(["bob"]);
        let members = active(&["alice", "bob", "carol"]);
        assert_eq!(eligible_names(&members, &r), vec!["alice".to_string()]);
    }

    #[test]
    fn eligible_set_skips_inactive() {
        let mut members = active(&["alice", "bob"]);
        members.push(Member::new("U9", "carol", Presence::Inactive));
        assert_eq!(eligible_names(&members, &rules()), vec!["alice", "bob"]);
    }

    #[test]
    fn never_returns_name_outside_eligible_set() {
        let r = rules().exclude(["bob"]);
        let mut members = active(&["alice", "bob", "carol", "dave"]);
        members.push(Member::new("U9", "erin", Presence::Inactive));
        let eligible: BTreeSet<_> = eligible_names(&members, &r).into_iter().collect();

        let mut rng = StdRng::seed_from_u64(7);
        let mut history = RotationHistory::new();
        for _ in 0..50 {
            let s = select_rotator("ops", &members, &r, &mut history, &mut rng).unwrap();
            assert!(eligible.contains(&s.rotator));
            assert!(history.names().all(|n| eligible.contains(n)));
        }
    }

    #[test]
    fn each_member_rotates_once_before_reset() {
        let members = active(&["alice", "bob", "carol"]);
        let r = rules();
        let mut rng = StdRng::seed_from_u64(42);
        let mut history = RotationHistory::new();

        let mut seen = BTreeSet::new();
        for _ in 0..3 {
            let s = select_rotator("ops", &members, &r, &mut history, &mut rng).unwrap();
            assert!(!s.replenished);
            assert!(seen.insert(s.rotator));
        }
        assert_eq!(history.len(), 3);

        let s = select_rotator("ops", &members, &r, &mut history, &mut rng).unwrap();
        assert!(s.replenished);
        assert_eq!(s.order.len(), 3);
        assert_eq!(history.len(), 1);
        assert!(history.contains(&s.rotator));
    }

    #[test]
    fn available_set_excludes_history() {
        let members = active(&["alice", "bob", "carol"]);
        let mut history = RotationHistory::new();
        history.record("alice");
        history.record("carol");
        let mut rng = StdRng::seed_from_u64(1);

        let s = select_rotator("ops", &members, &rules(), &mut history, &mut rng).unwrap();
        assert_eq!(s.rotator, "bob");
        assert_eq!(s.order, vec!["bob"]);
    }

    #[test]
    fn single_member_always_selected() {
        let members = active(&["alice"]);
        let mut rng = StdRng::seed_from_u64(3);
        let mut history = RotationHistory::new();
        for i in 0..5 {
            let s = select_rotator("ops", &members, &rules(), &mut history, &mut rng).unwrap();
            assert_eq!(s.rotator, "alice");
            assert_eq!(s.replenished, i > 0);
        }
    }

    #[test]
    fn empty_eligible_set_fails_and_clears_history() {
        let members = vec![Member::new("U1", "alice", Presence::Inactive)];
        let mut history = RotationHistory::new();
        history.record("alice");
        let mut rng = StdRng::seed_from_u64(3);

        let err = select_rotator("ops", &members, &rules(), &mut history, &mut rng).unwrap_err();
        assert!(matches!(err, Error::NoEligibleRotators { ref channel } if channel == "ops"));
        assert!(history.is_empty());
    }

    #[test]
    fn no_members_fails() {
        let mut rng = StdRng::seed_from_u64(3);
        let result = select_rotator("ops", &[], &rules(), &mut RotationHistory::new(), &mut rng);
        assert!(result.is_err());
    }

    #[test]
    fn same_seed_same_sequence() {
        let members = active(&["alice", "bob", "carol", "dave", "erin"]);
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut history = RotationHistory::new();
            (0..12)
                .map(|_| {
                    select_rotator("ops", &members, &rules(), &mut history, &mut rng)
                        .unwrap()
                        .rotator
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(run(99), run(99));
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = StdRng::seed_from_u64(5);
        let original: Vec<u32> = (0..20).collect();
        let mut items = original.clone();
        shuffle(&mut items, &mut rng);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, original);
    }

    #[test]
    fn first_pick_is_roughly_uniform() {
        let members = active(&["alice", "bob", "carol"]);
        let r = rules();
        let mut rng = StdRng::seed_from_u64(2024);
        let mut counts: HashMap<String, usize> = HashMap::new();

        let samples = 3_000;
        for _ in 0..samples {
            let mut history = RotationHistory::new();
            let s = select_rotator("ops", &members, &r, &mut history, &mut rng).unwrap();
            *counts.entry(s.rotator).or_default() += 1;
        }

        assert_eq!(counts.len(), 3);
        for (name, count) in counts {
            assert!(
                (800..=1_200).contains(&count),
                "{name} picked {count} times out of {samples}"
            );
        }
    }
}
