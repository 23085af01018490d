//! Identifier-keyed set difference over declared volume lists.

use std::collections::HashSet;

use crate::provider::{VolumeDescriptor, VolumeId};

/// Returns the descriptors of `from` whose identifier does not appear in
/// `without`, in the order they appear in `from`.
///
/// Duplicate identifiers in `from` are kept; declared lists are expected to
/// be unique already (see [`MachineConfig::validate`](crate::config::MachineConfig::validate)).
#[must_use]
pub fn diff_volumes<'a>(
    from: &'a [VolumeDescriptor],
    without: &[VolumeDescriptor],
) -> Vec<&'a VolumeDescriptor> {
    let excluded: HashSet<&VolumeId> = without.iter().map(|volume| &volume.id).collect();
    from.iter()
        .filter(|volume| !excluded.contains(&volume.id))
        .collect()
}

/// Attach and detach sets derived from two declarations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VolumePlan<'a> {
    /// Declared before, no longer declared.
    pub to_detach: Vec<&'a VolumeDescriptor>,
    /// Newly declared.
    pub to_attach: Vec<&'a VolumeDescriptor>,
}

impl<'a> VolumePlan<'a> {
    /// Plans the move from the `old` declaration to the `new` one.
    #[must_use]
    pub fn between(old: &'a [VolumeDescriptor], new: &'a [VolumeDescriptor]) -> Self {
        Self {
            to_detach: diff_volumes(old, new),
            to_attach: diff_volumes(new, old),
        }
    }

    /// Returns `true` when nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_detach.is_empty() && self.to_attach.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn volumes(ids: &[&str]) -> Vec<VolumeDescriptor> {
        ids.iter().map(|id| VolumeDescriptor::new(*id)).collect()
    }

    fn ids(found: &[&VolumeDescriptor]) -> Vec<String> {
        found.iter().map(|volume| volume.id.to_string()).collect()
    }

    #[rstest]
    #[case(&[], &[], &[])]
    #[case(&["v1", "v2"], &[], &["v1", "v2"])]
    #[case(&[], &["v1"], &[])]
    #[case(&["v1", "v2"], &["v2", "v3"], &["v1"])]
    #[case(&["v3", "v1", "v2"], &["v2"], &["v3", "v1"])]
    #[case(&["v1", "v1", "v2"], &["v2"], &["v1", "v1"])]
    fn diff_keeps_order_of_first_list(
        #[case] from: &[&str],
        #[case] without: &[&str],
        #[case] expected: &[&str],
    ) {
        let from_list = volumes(from);
        let without_list = volumes(without);
        assert_eq!(ids(&diff_volumes(&from_list, &without_list)), expected);
    }

    #[rstest]
    #[case(&["v1", "v2", "v3"])]
    #[case(&["v1"])]
    #[case(&[])]
    fn diff_of_a_list_with_itself_is_empty(#[case] list: &[&str]) {
        let declared = volumes(list);
        assert!(diff_volumes(&declared, &declared).is_empty());
        assert!(VolumePlan::between(&declared, &declared).is_empty());
    }

    #[rstest]
    #[case(&["v1", "v2"], &["v2", "v3"])]
    #[case(&["a", "b", "c"], &["c", "d", "a"])]
    #[case(&[], &["x"])]
    fn attach_and_detach_sets_are_disjoint(#[case] old: &[&str], #[case] new: &[&str]) {
        let old_list = volumes(old);
        let new_list = volumes(new);
        let plan = VolumePlan::between(&old_list, &new_list);
        for detached in &plan.to_detach {
            assert!(
                plan.to_attach.iter().all(|attached| attached.id != detached.id),
                "{} appears in both sets",
                detached.id
            );
        }
    }

    #[test]
    fn metadata_changes_are_not_a_difference() {
        let old = vec![VolumeDescriptor::new("v1").with_name("cache")];
        let new = vec![VolumeDescriptor::new("v1").with_name("renamed")];
        assert!(VolumePlan::between(&old, &new).is_empty());
    }

    #[test]
    fn plan_names_both_directions() {
        let old = volumes(&["v1", "v2"]);
        let new = volumes(&["v2", "v3"]);
        let plan = VolumePlan::between(&old, &new);
        assert_eq!(ids(&plan.to_detach), ["v1"]);
        assert_eq!(ids(&plan.to_attach), ["v3"]);
    }
}
