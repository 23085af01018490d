//! BDD scenarios for volume reconciliation.

use rstest_bdd_macros::scenario;

use super::test_helpers::{ReconcileContext, reconcile_context};

#[scenario(
    path = "tests/features/reconcile.feature",
    name = "Attach declared volumes to a bare machine"
)]
fn scenario_attach_to_bare_machine(reconcile_context: ReconcileContext) {
    drop(reconcile_context);
}

#[scenario(
    path = "tests/features/reconcile.feature",
    name = "Detach before attaching"
)]
fn scenario_detach_before_attach(reconcile_context: ReconcileContext) {
    drop(reconcile_context);
}

#[scenario(
    path = "tests/features/reconcile.feature",
    name = "Skip a volume that is already attached"
)]
fn scenario_skip_attached(reconcile_context: ReconcileContext) {
    drop(reconcile_context);
}

#[scenario(
    path = "tests/features/reconcile.feature",
    name = "Stop at the first failed attachment"
)]
fn scenario_stop_at_failure(reconcile_context: ReconcileContext) {
    drop(reconcile_context);
}

#[scenario(
    path = "tests/features/reconcile.feature",
    name = "Create a machine with its declared volumes"
)]
fn scenario_create_with_volumes(reconcile_context: ReconcileContext) {
    drop(reconcile_context);
}

#[scenario(
    path = "tests/features/reconcile.feature",
    name = "Delete a machine that is already gone"
)]
fn scenario_delete_absent(reconcile_context: ReconcileContext) {
    drop(reconcile_context);
}
