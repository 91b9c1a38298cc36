use std::collections::HashSet;
use std::num::NonZeroUsize;

use serde::Serialize;

use crate::{
    DestinationList, DestinationSnapshot, Entry, ListCounts, MembershipRule, PlanWarning,
    TypeGroup, WriteIntent, LIST_CAPACITY,
};

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(LIST_CAPACITY) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

/// Knobs of the packing algorithm.
///
/// `capacity` is non-zero by construction: every packing or create step
/// moves at least one label out of the missing set, which is what bounds
/// the loops in [`Reconciler::plan_type`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ReconcilePolicy {
    pub capacity: NonZeroUsize,
    pub membership: MembershipRule,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            membership: MembershipRule::default(),
        }
    }
}

impl ReconcilePolicy {
    pub fn with_membership(membership: MembershipRule) -> Self {
        Self {
            membership,
            ..Self::default()
        }
    }
}

/// Planning outcome for one source type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TypePlan {
    pub type_name: String,
    /// Distinct source labels for the type.
    pub labels: usize,
    /// Destination lists that belong to the type at planning time.
    pub existing_lists: usize,
    /// Free slots across those lists before packing.
    pub spare_capacity: usize,
    /// Labels absent from every list of the type before packing.
    pub missing: usize,
    pub intents: Vec<WriteIntent>,
    pub warnings: Vec<PlanWarning>,
}

impl TypePlan {
    fn new(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            ..Self::default()
        }
    }

    pub fn updates(&self) -> usize {
        self.intents.iter().filter(|i| !i.is_create()).count()
    }

    pub fn creates(&self) -> usize {
        self.intents.iter().filter(|i| i.is_create()).count()
    }
}

/// Planning outcome for a whole [`TypeGroup`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    pub types: Vec<TypePlan>,
    /// Run-wide warnings (membership ambiguity).
    pub warnings: Vec<PlanWarning>,
}

impl ReconcilePlan {
    pub fn intents(&self) -> impl Iterator<Item = &WriteIntent> {
        self.types.iter().flat_map(|t| t.intents.iter())
    }

    pub fn into_intents(self) -> Vec<WriteIntent> {
        self.types.into_iter().flat_map(|t| t.intents).collect()
    }

    pub fn intent_count(&self) -> usize {
        self.types.iter().map(|t| t.intents.len()).sum()
    }

    pub fn is_noop(&self) -> bool {
        self.intent_count() == 0
    }

    pub fn type_plan(&self, type_name: &str) -> Option<&TypePlan> {
        self.types.iter().find(|t| t.type_name == type_name)
    }
}

/// Owns the destination snapshot for one pass and plans types one at a time.
///
/// Each planned intent is applied to the snapshot immediately, so a later
/// type sees the lists (and list names) an earlier type produced.
#[derive(Clone, Debug)]
pub struct Reconciler {
    snapshot: DestinationSnapshot,
    policy: ReconcilePolicy,
    counts: ListCounts,
}

impl Reconciler {
    pub fn new(snapshot: DestinationSnapshot, policy: ReconcilePolicy) -> Self {
        Self {
            snapshot,
            policy,
            counts: ListCounts::new(),
        }
    }

    pub fn policy(&self) -> ReconcilePolicy {
        self.policy
    }

    pub fn snapshot(&self) -> &DestinationSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> DestinationSnapshot {
        self.snapshot
    }

    /// Lists whose label matches more than one type of `group`.
    pub fn ambiguities(&self, group: &TypeGroup) -> Vec<PlanWarning> {
        let rule = self.policy.membership;
        let mut out: Vec<PlanWarning> = self
            .snapshot
            .lists
            .iter()
            .filter_map(|l| {
                let type_names: Vec<String> = group
                    .type_names()
                    .filter(|t| rule.belongs(&l.label, t))
                    .map(str::to_string)
                    .collect();
                (type_names.len() > 1).then(|| PlanWarning::AmbiguousMembership {
                    label: l.label.clone(),
                    type_names,
                })
            })
            .collect();
        out.sort();
        out
    }

    /// Plan every write needed so each of `labels` is present in some list of
    /// `type_name`.
    pub fn plan_type(&mut self, type_name: &str, labels: &[String]) -> TypePlan {
        let capacity = self.policy.capacity.get();
        let rule = self.policy.membership;
        let mut plan = TypePlan::new(type_name);

        let mut seen: HashSet<&String> = HashSet::new();
        let names: Vec<&String> = labels.iter().filter(|l| seen.insert(*l)).collect();
        plan.labels = names.len();
        if names.is_empty() {
            return plan;
        }

        let existing: Vec<usize> = self
            .snapshot
            .lists
            .iter()
            .enumerate()
            .filter(|(_, l)| rule.belongs(&l.label, type_name))
            .map(|(i, _)| i)
            .collect();

        plan.existing_lists = existing.len();
        self.counts.observe(
            type_name,
            members(&self.snapshot.lists, &existing).map(|l| l.label.as_str()),
        );

        let have: HashSet<&str> = members(&self.snapshot.lists, &existing)
            .flat_map(|l| l.entries.iter().filter_map(Entry::text))
            .collect();
        let mut missing: Vec<String> = names
            .into_iter()
            .filter(|n| !have.contains(n.as_str()))
            .cloned()
            .collect();
        plan.missing = missing.len();

        for l in members(&self.snapshot.lists, &existing) {
            if l.id.is_some() {
                plan.spare_capacity += l.spare(capacity);
            } else {
                plan.warnings.push(PlanWarning::PendingListSkipped {
                    label: l.label.clone(),
                });
            }
        }

        while !missing.is_empty() {
            let before = missing.len();
            let Some(intent) = self.pack_once(&existing, &mut missing, capacity) else {
                break;
            };
            debug_assert!(missing.len() < before, "packing must place at least one label");
            plan.intents.push(intent);
        }

        while !missing.is_empty() {
            let take = missing.len().min(capacity);
            let entries: Vec<Entry> = missing.drain(..take).map(Entry::keyword).collect();
            let label = self
                .counts
                .next_label(type_name, &self.snapshot.reserved_labels);

            self.snapshot.reserved_labels.insert(label.clone());
            self.snapshot
                .lists
                .push(DestinationList::new(None, label.clone(), entries.clone()));
            plan.intents.push(WriteIntent::CreateList { label, entries });
        }

        plan
    }

    /// Fill the first list (in destination order) that has room for at least
    /// one missing label. Returns the full-replace update for that list.
    fn pack_once(
        &mut self,
        existing: &[usize],
        missing: &mut Vec<String>,
        capacity: usize,
    ) -> Option<WriteIntent> {
        for &i in existing {
            let Some(list) = self.snapshot.lists.get_mut(i) else {
                continue;
            };
            let Some(id) = list.id.clone() else {
                continue;
            };
            let spare = list.spare(capacity);
            if spare == 0 {
                continue;
            }

            let take: Vec<String> = missing
                .iter()
                .filter(|m| !list.contains(m))
                .take(spare)
                .cloned()
                .collect();
            if take.is_empty() {
                continue;
            }

            missing.retain(|m| !take.contains(m));
            list.entries.extend(take.into_iter().map(Entry::keyword));

            return Some(WriteIntent::UpdateList {
                id,
                label: list.label.clone(),
                entries: list.entries.clone(),
            });
        }
        None
    }
}

fn members<'a>(
    lists: &'a [DestinationList],
    idx: &'a [usize],
) -> impl Iterator<Item = &'a DestinationList> + 'a {
    idx.iter().filter_map(move |&i| lists.get(i))
}

/// Plan all types of `group` against `snapshot`, in the group's type order.
pub fn reconcile(
    group: &TypeGroup,
    snapshot: DestinationSnapshot,
    policy: ReconcilePolicy,
) -> ReconcilePlan {
    let mut reconciler = Reconciler::new(snapshot, policy);
    let warnings = reconciler.ambiguities(group);
    let types = group
        .iter()
        .map(|g| reconciler.plan_type(&g.type_name, &g.labels))
        .collect();
    ReconcilePlan { types, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(id: &str, label: &str, texts: &[&str]) -> DestinationList {
        DestinationList::new(
            Some(id.to_string()),
            label,
            texts.iter().map(|t| Entry::keyword(*t)).collect(),
        )
    }

    fn labels(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    fn small(capacity: usize) -> ReconcilePolicy {
        ReconcilePolicy {
            capacity: NonZeroUsize::new(capacity).unwrap(),
            membership: MembershipRule::Prefix,
        }
    }

    #[test]
    fn empty_labels_plan_nothing() {
        let snap = DestinationSnapshot::from_lists(vec![list("1", "Server-1", &[])]);
        let mut r = Reconciler::new(snap, ReconcilePolicy::default());
        let plan = r.plan_type("Server", &[]);
        assert!(plan.intents.is_empty());
        assert_eq!(plan.labels, 0);
    }

    #[test]
    fn duplicate_source_labels_are_written_once() {
        let mut r = Reconciler::new(DestinationSnapshot::empty(), ReconcilePolicy::default());
        let plan = r.plan_type("Server", &labels(&["a", "a", "b"]));
        assert_eq!(plan.intents.len(), 1);
        let texts: Vec<&str> = plan.intents[0].entries().iter().filter_map(Entry::text).collect();
        assert_eq!(texts, vec!["a", "b"]);
    }

    #[test]
    fn packing_follows_destination_order_and_restarts() {
        let snap = DestinationSnapshot::from_lists(vec![
            list("1", "Server-1", &["x", "y"]),
            list("2", "Server-2", &["z"]),
        ]);
        let mut r = Reconciler::new(snap, small(3));
        let plan = r.plan_type("Server", &labels(&["a", "b", "c"]));

        assert_eq!(plan.spare_capacity, 3);
        assert_eq!(plan.intents.len(), 2);
        assert_eq!(
            plan.intents[0],
            WriteIntent::UpdateList {
                id: "1".into(),
                label: "Server-1".into(),
                entries: vec![Entry::keyword("x"), Entry::keyword("y"), Entry::keyword("a")],
            }
        );
        assert_eq!(
            plan.intents[1],
            WriteIntent::UpdateList {
                id: "2".into(),
                label: "Server-2".into(),
                entries: vec![Entry::keyword("z"), Entry::keyword("b"), Entry::keyword("c")],
            }
        );
    }

    #[test]
    fn overflow_creates_lists_sized_to_capacity() {
        let mut r = Reconciler::new(DestinationSnapshot::empty(), small(2));
        let plan = r.plan_type("Asset", &labels(&["a", "b", "c", "d", "e"]));
        let sizes: Vec<(String, usize)> = plan
            .intents
            .iter()
            .map(|i| (i.label().to_string(), i.entries().len()))
            .collect();
        assert_eq!(
            sizes,
            vec![
                ("Asset-1".to_string(), 2),
                ("Asset-2".to_string(), 2),
                ("Asset-3".to_string(), 1)
            ]
        );
        assert_eq!(r.snapshot().lists.len(), 3);
        assert!(r.snapshot().lists.iter().all(|l| l.id.is_none()));
    }

    #[test]
    fn later_type_does_not_pack_into_pending_list() {
        // "Serv" prefix-matches the "Server-1" list created for "Server".
        let mut r = Reconciler::new(DestinationSnapshot::empty(), ReconcilePolicy::default());
        r.plan_type("Server", &labels(&["web-1"]));
        let plan = r.plan_type("Serv", &labels(&["s-1"]));

        assert_eq!(
            plan.warnings,
            vec![PlanWarning::PendingListSkipped {
                label: "Server-1".into()
            }]
        );
        assert_eq!(plan.intents.len(), 1);
        assert!(plan.intents[0].is_create());
        // The pending list still counts toward the base index.
        assert_eq!(plan.intents[0].label(), "Serv-2");
    }

    #[test]
    fn ambiguity_is_reported_under_prefix_rule_only() {
        let snap = DestinationSnapshot::from_lists(vec![list("1", "ServerRack-1", &[])]);
        let group: TypeGroup = [("Server", "a"), ("ServerRack", "b")].into_iter().collect();

        let prefix = Reconciler::new(snap.clone(), ReconcilePolicy::default());
        assert_eq!(
            prefix.ambiguities(&group),
            vec![PlanWarning::AmbiguousMembership {
                label: "ServerRack-1".into(),
                type_names: vec!["Server".into(), "ServerRack".into()],
            }]
        );

        let delimited = Reconciler::new(
            snap,
            ReconcilePolicy::with_membership(MembershipRule::Delimited),
        );
        assert!(delimited.ambiguities(&group).is_empty());
    }
}
