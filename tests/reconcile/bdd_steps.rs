//! BDD step definitions for volume reconciliation.

use rstest_bdd_macros::{given, then, when};
use stevedore::test_support::CallKind;
use stevedore::{ProviderError, ResourceId};
use tokio::runtime::Runtime;

use super::test_helpers::{
    ReconcileContext, StepOutcome, describe_volume_calls, spec, volumes,
};

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("assertion failed: {0}")]
    Assertion(String),
}

fn runtime() -> Result<Runtime, StepError> {
    Runtime::new().map_err(|err| StepError::Assertion(err.to_string()))
}

#[given("a running machine \"{machine}\" with no volumes")]
fn bare_machine(reconcile_context: &ReconcileContext, machine: String) {
    reconcile_context.seed(&machine, Vec::new());
}

#[given("a running machine \"{machine}\" with volumes \"{attached}\"")]
fn machine_with_volumes(reconcile_context: &ReconcileContext, machine: String, attached: String) {
    reconcile_context.seed(&machine, volumes(&attached));
}

#[given("the declaration adds \"{new}\"")]
fn declaration_adds(reconcile_context: &ReconcileContext, new: String) {
    reconcile_context.old.replace(Vec::new());
    reconcile_context.new.replace(volumes(&new));
}

#[given("the declaration changes from \"{old}\" to \"{new}\"")]
fn declaration_changes(reconcile_context: &ReconcileContext, old: String, new: String) {
    reconcile_context.old.replace(volumes(&old));
    reconcile_context.new.replace(volumes(&new));
}

#[given("the next attachment fails with \"{message}\"")]
fn attachment_fails(reconcile_context: &ReconcileContext, message: String) {
    reconcile_context.provider.fail_next(
        CallKind::Attach,
        ProviderError::Rejected {
            status: 409,
            message,
        },
    );
}

#[given("no machine exists")]
fn no_machine(reconcile_context: &ReconcileContext) {
    reconcile_context.machine_id.replace(None);
}

#[when("the volumes are reconciled")]
fn reconcile_volumes(reconcile_context: &ReconcileContext) -> Result<(), StepError> {
    let machine_id = reconcile_context
        .machine_id
        .borrow()
        .clone()
        .ok_or_else(|| StepError::Assertion(String::from("no machine seeded")))?;
    let old = reconcile_context.old.borrow().clone();
    let new = reconcile_context.new.borrow().clone();
    let controller = reconcile_context.controller();

    let result = runtime()?
        .block_on(async { controller.reconcile_volumes(&machine_id, &old, &new).await });
    reconcile_context.record(match result {
        Ok(report) if report.skipped.is_empty() => StepOutcome::Success,
        Ok(report) => StepOutcome::Skipped(report.skipped.iter().map(ToString::to_string).collect()),
        Err(err) => StepOutcome::Failure(err.to_string()),
    });
    Ok(())
}

#[when("a machine is created with volumes \"{declared}\"")]
fn create_machine(reconcile_context: &ReconcileContext, declared: String) -> Result<(), StepError> {
    let controller = reconcile_context.controller();
    let declared = volumes(&declared);

    let result = runtime()?.block_on(async { controller.create(&spec(), &declared).await });
    reconcile_context.record(match result {
        Ok(machine) => {
            reconcile_context.machine_id.replace(Some(machine.id));
            StepOutcome::Success
        }
        Err(err) => StepOutcome::Failure(err.to_string()),
    });
    Ok(())
}

#[when("machine \"{machine}\" is deleted")]
fn delete_machine(reconcile_context: &ReconcileContext, machine: String) -> Result<(), StepError> {
    let controller = reconcile_context.controller();
    let machine_id = ResourceId::from(machine);

    let result = runtime()?.block_on(async { controller.delete(&machine_id).await });
    reconcile_context.record(match result {
        Ok(()) => StepOutcome::Success,
        Err(err) => StepOutcome::Failure(err.to_string()),
    });
    Ok(())
}

#[then("the step succeeds")]
fn step_succeeds(reconcile_context: &ReconcileContext) -> Result<(), StepError> {
    match reconcile_context.outcome.borrow().as_ref() {
        Some(StepOutcome::Success | StepOutcome::Skipped(_)) => Ok(()),
        Some(StepOutcome::Failure(message)) => Err(StepError::Assertion(format!(
            "expected success, got failure: {message}"
        ))),
        None => Err(StepError::Assertion(String::from("missing outcome"))),
    }
}

#[then("the step fails mentioning \"{text}\"")]
fn step_fails(reconcile_context: &ReconcileContext, text: String) -> Result<(), StepError> {
    let outcome = reconcile_context.outcome.borrow();
    let Some(StepOutcome::Failure(message)) = outcome.as_ref() else {
        return Err(StepError::Assertion(String::from(
            "expected failure outcome",
        )));
    };
    if message.contains(&text) {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected failure mentioning {text}, got: {message}"
        )))
    }
}

#[then("the volume calls are \"{expected}\"")]
fn volume_calls_are(reconcile_context: &ReconcileContext, expected: String) -> Result<(), StepError> {
    let actual = describe_volume_calls(&reconcile_context.provider.volume_calls());
    if actual == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected volume calls {expected:?}, got {actual:?}"
        )))
    }
}

#[then("no volume calls are made")]
fn no_volume_calls(reconcile_context: &ReconcileContext) -> Result<(), StepError> {
    let calls = reconcile_context.provider.volume_calls();
    if calls.is_empty() {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected no volume calls, got {}",
            describe_volume_calls(&calls)
        )))
    }
}

#[then("volume \"{volume}\" is reported as skipped")]
fn volume_skipped(reconcile_context: &ReconcileContext, volume: String) -> Result<(), StepError> {
    match reconcile_context.outcome.borrow().as_ref() {
        Some(StepOutcome::Skipped(skipped)) if skipped.contains(&volume) => Ok(()),
        other => Err(StepError::Assertion(format!(
            "expected {volume} to be skipped, got {other:?}"
        ))),
    }
}

#[then("machine \"{machine}\" has volumes \"{attached}\"")]
fn machine_has_volumes(
    reconcile_context: &ReconcileContext,
    machine: String,
    attached: String,
) -> Result<(), StepError> {
    let state = reconcile_context
        .provider
        .machine(&machine)
        .ok_or_else(|| StepError::Assertion(format!("machine {machine} is missing")))?;
    let expected = volumes(&attached);
    if state.volumes == expected {
        Ok(())
    } else {
        Err(StepError::Assertion(format!(
            "expected volumes {expected:?}, got {:?}",
            state.volumes
        )))
    }
}
