//! Unit tests for manifests and change detection.

use rstest::{fixture, rstest};

use super::{ConfigChange, ConfigError, MachineConfig, Placement};
use crate::provider::{MachineFields, VolumeDescriptor};

#[fixture]
fn manifest() -> MachineConfig {
    MachineConfig {
        name: String::from("builder"),
        size_class: String::from("DEV1-S"),
        image: String::from("ubuntu-24-04"),
        description: None,
        tags: vec![String::from("ci")],
        project_id: None,
        region: None,
        volumes: vec![VolumeDescriptor::new("v1"), VolumeDescriptor::new("v2")],
    }
}

fn defaults() -> Placement {
    Placement {
        project_id: String::from("proj-default"),
        region: String::from("fr-par"),
    }
}

#[test]
fn parses_manifest_with_volumes() {
    let manifest = MachineConfig::parse(
        r#"
name = "builder"
size_class = "DEV1-M"
image = "ubuntu-24-04"
region = "nl-ams"

[[volumes]]
id = "vol-cache"
name = "cache"
description = "build cache"

[[volumes]]
id = "vol-data"
"#,
    )
    .unwrap_or_else(|err| panic!("manifest should parse: {err}"));

    assert_eq!(manifest.size_class, "DEV1-M");
    assert_eq!(manifest.region.as_deref(), Some("nl-ams"));
    assert_eq!(
        manifest.volumes,
        vec![
            VolumeDescriptor::new("vol-cache")
                .with_name("cache")
                .with_description("build cache"),
            VolumeDescriptor::new("vol-data"),
        ]
    );
}

#[rstest]
#[case::unknown_key("name = \"a\"\nsize_class = \"b\"\nimage = \"c\"\ncolour = \"red\"\n")]
#[case::missing_image("name = \"a\"\nsize_class = \"b\"\n")]
#[case::malformed("name = [")]
fn rejects_malformed_manifests(#[case] contents: &str) {
    let err = MachineConfig::parse(contents).expect_err("manifest should be rejected");
    assert!(matches!(err, ConfigError::Parse(_)), "unexpected error: {err}");
}

#[rstest]
fn rejects_blank_required_fields(mut manifest: MachineConfig) {
    manifest.size_class = String::from("  ");
    let err = manifest.validate().expect_err("blank size class");
    assert!(err.to_string().contains("size_class"), "unexpected error: {err}");
}

#[rstest]
fn rejects_duplicate_volume_ids(mut manifest: MachineConfig) {
    manifest
        .volumes
        .push(VolumeDescriptor::new("v1").with_name("again"));
    let err = manifest.validate().expect_err("duplicate volume");
    assert_eq!(
        err,
        ConfigError::DuplicateVolume {
            volume_id: String::from("v1")
        }
    );
}

#[rstest]
fn placement_prefers_manifest_overrides(mut manifest: MachineConfig) {
    assert_eq!(manifest.placement(&defaults()), defaults());

    manifest.region = Some(String::from("pl-waw"));
    let placement = manifest.placement(&defaults());
    assert_eq!(placement.project_id, "proj-default");
    assert_eq!(placement.region, "pl-waw");

    let spec = manifest.to_spec(&defaults());
    assert_eq!(spec.region, "pl-waw");
    assert_eq!(spec.tags, vec![String::from("ci")]);
}

#[rstest]
fn identical_manifests_are_a_noop(manifest: MachineConfig) {
    let change = ConfigChange::new(&manifest, &manifest);
    assert!(change.is_noop());
    assert!(change.replacement_fields(&defaults()).is_empty());
}

#[rstest]
fn detects_each_kind_of_change(manifest: MachineConfig) {
    let mut next = manifest.clone();
    next.size_class = String::from("DEV1-L");
    next.description = Some(String::from("ci runner"));
    next.volumes = vec![VolumeDescriptor::new("v2"), VolumeDescriptor::new("v3")];
    let change = ConfigChange::new(&manifest, &next);

    assert!(change.size_class_changed());
    assert!(change.volumes_changed());
    assert_eq!(
        change.field_updates(),
        MachineFields {
            name: None,
            description: Some(String::from("ci runner")),
            tags: None,
        }
    );
}

#[rstest]
fn removed_description_is_sent_empty(mut manifest: MachineConfig) {
    manifest.description = Some(String::from("old"));
    let mut next = manifest.clone();
    next.description = None;

    let fields = ConfigChange::new(&manifest, &next).field_updates();
    assert_eq!(fields.description, Some(String::new()));
}

#[rstest]
fn volume_metadata_edits_do_not_count_as_changes(manifest: MachineConfig) {
    let mut next = manifest.clone();
    next.volumes = vec![
        VolumeDescriptor::new("v1").with_name("renamed"),
        VolumeDescriptor::new("v2"),
    ];
    assert!(!ConfigChange::new(&manifest, &next).volumes_changed());
}

#[rstest]
fn immutable_fields_require_replacement(manifest: MachineConfig) {
    let mut next = manifest.clone();
    next.image = String::from("debian-12");
    next.project_id = Some(String::from("proj-other"));
    let fields = ConfigChange::new(&manifest, &next).replacement_fields(&defaults());
    assert_eq!(fields, vec!["image", "project_id"]);
}

#[rstest]
fn explicit_default_placement_is_not_a_change(manifest: MachineConfig) {
    let mut next = manifest.clone();
    next.region = Some(String::from("fr-par"));
    assert!(
        ConfigChange::new(&manifest, &next)
            .replacement_fields(&defaults())
            .is_empty()
    );
}
