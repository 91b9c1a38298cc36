//! Invariants that must hold for every pass, checked over a grid of
//! destination shapes (list fill levels x number of source labels).

use std::collections::{BTreeSet, HashSet};

use tsync_reconcile::*;

/// Apply intents the way the destination would: updates replace entries by id,
/// creates append a new list with a fresh id.
fn apply(snapshot: &DestinationSnapshot, intents: &[WriteIntent]) -> DestinationSnapshot {
    let mut lists = snapshot.lists.clone();
    for (n, intent) in intents.iter().enumerate() {
        match intent {
            WriteIntent::UpdateList { id, entries, .. } => {
                let l = lists
                    .iter_mut()
                    .find(|l| l.id.as_deref() == Some(id.as_str()))
                    .expect("update targets a known list");
                l.entries = entries.clone();
            }
            WriteIntent::CreateList { label, entries } => {
                lists.push(DestinationList::new(
                    Some(format!("created-{n}")),
                    label.clone(),
                    entries.clone(),
                ));
            }
        }
    }
    DestinationSnapshot::from_lists(lists)
}

fn destination(fills: &[usize]) -> DestinationSnapshot {
    let lists = fills
        .iter()
        .enumerate()
        .map(|(i, &n)| {
            DestinationList::new(
                Some(format!("id-{i}")),
                format!("Server-{}", i + 1),
                (0..n).map(|k| Entry::keyword(format!("pre-{i}-{k}"))).collect(),
            )
        })
        .collect();
    DestinationSnapshot::from_lists(lists)
}

fn source(n: usize) -> TypeGroup {
    // Every fifth label repeats, to exercise dedup against the source itself.
    (0..n)
        .map(|i| ("Server", format!("host-{}", if i % 5 == 4 { i - 1 } else { i })))
        .collect()
}

fn grid() -> Vec<(Vec<usize>, usize)> {
    let shapes: Vec<Vec<usize>> = vec![
        vec![],
        vec![0],
        vec![49],
        vec![50],
        vec![50, 10],
        vec![25, 50, 49],
        vec![55, 3],
    ];
    let sizes = [0, 1, 2, 49, 50, 51, 120, 175];
    shapes
        .into_iter()
        .flat_map(|s| sizes.iter().map(move |&n| (s.clone(), n)))
        .collect()
}

#[test]
fn every_intent_respects_capacity_and_uniqueness() {
    for (fills, n) in grid() {
        let plan = reconcile(&source(n), destination(&fills), ReconcilePolicy::default());
        for intent in plan.intents() {
            let entries = intent.entries();
            assert!(
                entries.len() <= LIST_CAPACITY,
                "fills={fills:?} n={n}: {} has {} entries",
                intent.label(),
                entries.len()
            );
            let uniq: HashSet<&str> = entries.iter().filter_map(Entry::text).collect();
            assert_eq!(uniq.len(), entries.len(), "fills={fills:?} n={n}: duplicate text");
        }
    }
}

#[test]
fn applying_the_plan_covers_every_source_label() {
    for (fills, n) in grid() {
        let before = destination(&fills);
        let group = source(n);
        let intents = reconcile(&group, before.clone(), ReconcilePolicy::default()).into_intents();
        let after = apply(&before, &intents);

        let have: HashSet<&str> = after
            .lists
            .iter()
            .filter(|l| l.label.starts_with("Server"))
            .flat_map(|l| l.entries.iter().filter_map(Entry::text))
            .collect();
        for label in group.labels("Server").unwrap_or_default() {
            assert!(have.contains(label.as_str()), "fills={fills:?} n={n}: {label} missing");
        }
    }
}

#[test]
fn creates_only_what_spare_capacity_cannot_absorb() {
    for (fills, n) in grid() {
        let plan = reconcile(&source(n), destination(&fills), ReconcilePolicy::default());
        let tp = match plan.type_plan("Server") {
            Some(tp) => tp,
            None => continue,
        };
        let overflow = tp.missing.saturating_sub(tp.spare_capacity);
        let expected = overflow.div_ceil(LIST_CAPACITY);
        assert_eq!(tp.creates(), expected, "fills={fills:?} n={n}");
    }
}

#[test]
fn second_pass_over_applied_state_is_a_noop() {
    for (fills, n) in grid() {
        let before = destination(&fills);
        let group = source(n);
        let intents = reconcile(&group, before.clone(), ReconcilePolicy::default()).into_intents();
        let after = apply(&before, &intents);

        let again = reconcile(&group, after, ReconcilePolicy::default());
        assert!(again.is_noop(), "fills={fills:?} n={n}: {:?}", again.into_intents());
    }
}

#[test]
fn new_labels_never_collide_and_strictly_increase() {
    for (fills, n) in grid() {
        let before = destination(&fills);
        let existing: BTreeSet<String> = before.reserved_labels.clone();
        let plan = reconcile(&source(n), before, ReconcilePolicy::default());

        let mut last = fills.len() as u32;
        for intent in plan.intents().filter(|i| i.is_create()) {
            assert!(!existing.contains(intent.label()), "collision on {}", intent.label());
            let k = list_suffix(intent.label(), "Server").expect("sequential label");
            assert!(k > last, "fills={fills:?} n={n}: {k} after {last}");
            last = k;
        }
    }
}
