//! End-to-end tests of the import orchestrator over a fake tarball
//! source: no network, no package-manager binary.

#![allow(clippy::arithmetic_side_effects)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use vincent_core::contract::{ABILITY_METADATA_PATH, POLICY_METADATA_PATH, UI_SCHEMA_PATH};
use vincent_core::{PackageIdentity, PackageKind};
use vincent_import::{ImportError, ImportResult, TarballImporter, TarballSource};

/// Builds the same `.tgz` for every request and records where each
/// import asked for it.
struct FakeTarballSource {
    tarball: Vec<u8>,
    requests: Mutex<Vec<PathBuf>>,
}

impl FakeTarballSource {
    fn new(entries: &[(&str, &[u8])]) -> Self {
        Self {
            tarball: build_tarball(entries),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn raw(tarball: Vec<u8>) -> Self {
        Self {
            tarball,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn request_dirs(&self) -> Vec<PathBuf> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TarballSource for FakeTarballSource {
    async fn fetch_tarball(
        &self,
        _identity: &PackageIdentity,
        dest: &Path,
    ) -> ImportResult<PathBuf> {
        self.requests.lock().unwrap().push(dest.to_path_buf());
        let path = dest.join("package.tgz");
        tokio::fs::write(&path, &self.tarball).await?;
        Ok(path)
    }
}

/// Always fails, the way a registry miss surfaces from the HTTP source.
struct UnavailableSource;

#[async_trait]
impl TarballSource for UnavailableSource {
    async fn fetch_tarball(
        &self,
        identity: &PackageIdentity,
        _dest: &Path,
    ) -> ImportResult<PathBuf> {
        Err(ImportError::PackageLookupFailed {
            message: format!("registry returned 404 Not Found for {}", identity.package_name()),
        })
    }
}

fn build_tarball(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for &(path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_path(path).unwrap();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append(&header, data).unwrap();
    }
    let tar_data = builder.into_inner().unwrap();

    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(&tar_data).unwrap();
    encoder.finish().unwrap()
}

fn identity() -> PackageIdentity {
    PackageIdentity::new("@vincent/test-package", "1.0.0").unwrap()
}

fn wrapped(relative: &str) -> String {
    format!("package/{relative}")
}

fn ability_source() -> FakeTarballSource {
    FakeTarballSource::new(&[
        ("package/package.json", br#"{"name":"@vincent/test-package"}"#),
        (
            &wrapped(ABILITY_METADATA_PATH),
            br#"{"ipfsCid":"QmAbilityCid"}"#,
        ),
    ])
}

fn policy_source() -> FakeTarballSource {
    FakeTarballSource::new(&[
        ("package/package.json", br#"{"name":"@vincent/test-package"}"#),
        (
            &wrapped(POLICY_METADATA_PATH),
            br#"{"ipfsCid":"QmPolicyCid"}"#,
        ),
        (
            &wrapped(UI_SCHEMA_PATH),
            br#"{"uiSchema":{"ui:order":["limit"]},"jsonSchema":{"type":"object"}}"#,
        ),
    ])
}

#[tokio::test]
async fn ability_import_reads_generated_metadata() {
    let importer = TarballImporter::with_source(Arc::new(ability_source()));

    let metadata = importer
        .import_package(&identity(), PackageKind::Ability)
        .await
        .unwrap();

    assert_eq!(metadata.ipfs_cid, "QmAbilityCid");
    assert!(metadata.ui_schema.is_none());
    assert!(metadata.json_schema.is_none());
}

#[tokio::test]
async fn policy_import_reads_schema_pair() {
    let importer = TarballImporter::with_source(Arc::new(policy_source()));

    let metadata = importer
        .import_package(&identity(), PackageKind::Policy)
        .await
        .unwrap();

    assert_eq!(metadata.ipfs_cid, "QmPolicyCid");
    assert_eq!(
        metadata.ui_schema.unwrap()["ui:order"][0],
        serde_json::json!("limit")
    );
    assert_eq!(metadata.json_schema.unwrap()["type"], serde_json::json!("object"));
}

#[tokio::test]
async fn ability_import_never_reads_schema_file() {
    // The schema file is deliberately invalid JSON; an ability import
    // that tried to read it would fail.
    let source = FakeTarballSource::new(&[
        (
            &wrapped(ABILITY_METADATA_PATH),
            br#"{"ipfsCid":"QmAbilityCid"}"#,
        ),
        (&wrapped(UI_SCHEMA_PATH), b"this is not json"),
    ]);
    let importer = TarballImporter::with_source(Arc::new(source));

    let metadata = importer
        .import_package(&identity(), PackageKind::Ability)
        .await
        .unwrap();

    assert_eq!(metadata.ipfs_cid, "QmAbilityCid");
    assert!(metadata.ui_schema.is_none());
}

#[tokio::test]
async fn missing_generated_metadata_is_a_hard_failure() {
    let source = FakeTarballSource::new(&[("package/package.json", b"{}")]);
    let importer = TarballImporter::with_source(Arc::new(source));

    let err = importer
        .import_package(&identity(), PackageKind::Ability)
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::MetadataNotFound { .. }));
    let message = err.to_string();
    assert!(message.contains("Metadata file"), "message: {message}");
    assert!(message.contains("not found"), "message: {message}");
    assert!(message.contains(ABILITY_METADATA_PATH), "message: {message}");
}

#[tokio::test]
async fn metadata_without_cid_is_invalid() {
    let source = FakeTarballSource::new(&[(
        &wrapped(POLICY_METADATA_PATH),
        br#"{"somethingElse":true}"#,
    )]);
    let importer = TarballImporter::with_source(Arc::new(source));

    let err = importer
        .import_package(&identity(), PackageKind::Policy)
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::MetadataInvalid { .. }));
    assert!(err.to_string().contains("ipfsCid"));
}

#[tokio::test]
async fn metadata_with_empty_cid_is_invalid() {
    let source = FakeTarballSource::new(&[(
        &wrapped(ABILITY_METADATA_PATH),
        br#"{"ipfsCid":""}"#,
    )]);
    let importer = TarballImporter::with_source(Arc::new(source));

    let err = importer
        .import_package(&identity(), PackageKind::Ability)
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::MetadataInvalid { .. }));
}

#[tokio::test]
async fn policy_missing_schema_file_fails() {
    let source = FakeTarballSource::new(&[(
        &wrapped(POLICY_METADATA_PATH),
        br#"{"ipfsCid":"QmPolicyCid"}"#,
    )]);
    let importer = TarballImporter::with_source(Arc::new(source));

    let err = importer
        .import_package(&identity(), PackageKind::Policy)
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::MetadataNotFound { .. }));
}

#[tokio::test]
async fn policy_missing_schema_field_fails() {
    let source = FakeTarballSource::new(&[
        (
            &wrapped(POLICY_METADATA_PATH),
            br#"{"ipfsCid":"QmPolicyCid"}"#,
        ),
        (
            &wrapped(UI_SCHEMA_PATH),
            br#"{"uiSchema":{"ui:order":[]}}"#,
        ),
    ]);
    let importer = TarballImporter::with_source(Arc::new(source));

    let err = importer
        .import_package(&identity(), PackageKind::Policy)
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::MetadataInvalid { .. }));
    assert!(err.to_string().contains("jsonSchema"));
}

#[tokio::test]
async fn unavailable_package_reports_download_failure() {
    let importer = TarballImporter::with_source(Arc::new(UnavailableSource));

    let err = importer
        .import_package(&identity(), PackageKind::Ability)
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::DownloadFailed { .. }));
    assert!(
        err.to_string()
            .contains("Failed to download and extract package"),
        "message: {err}"
    );
}

#[tokio::test]
async fn corrupt_tarball_reports_download_failure() {
    let source = FakeTarballSource::raw(b"definitely not gzip data".to_vec());
    let importer = TarballImporter::with_source(Arc::new(source));

    let err = importer
        .import_package(&identity(), PackageKind::Ability)
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::DownloadFailed { .. }));
    assert!(
        err.to_string()
            .contains("Failed to download and extract package"),
        "message: {err}"
    );
}

#[tokio::test]
async fn concurrent_imports_use_isolated_directories() {
    let source = Arc::new(ability_source());
    let importer = Arc::new(TarballImporter::with_source(source.clone()));

    let first = {
        let importer = Arc::clone(&importer);
        tokio::spawn(async move {
            importer
                .import_package(&identity(), PackageKind::Ability)
                .await
        })
    };
    let second = {
        let importer = Arc::clone(&importer);
        tokio::spawn(async move {
            importer
                .import_package(&identity(), PackageKind::Ability)
                .await
        })
    };

    let (first, second) = tokio::join!(first, second);
    first.unwrap().unwrap();
    second.unwrap().unwrap();

    let dirs = source.request_dirs();
    assert_eq!(dirs.len(), 2);
    assert_ne!(dirs[0], dirs[1], "imports shared a work directory");
}

#[tokio::test]
async fn concurrent_failure_does_not_affect_success() {
    let good = Arc::new(TarballImporter::with_source(Arc::new(ability_source())));
    let bad = Arc::new(TarballImporter::with_source(Arc::new(UnavailableSource)));

    let ok_task = {
        let good = Arc::clone(&good);
        tokio::spawn(
            async move { good.import_package(&identity(), PackageKind::Ability).await },
        )
    };
    let err_task = {
        let bad = Arc::clone(&bad);
        tokio::spawn(
            async move { bad.import_package(&identity(), PackageKind::Ability).await },
        )
    };

    let (ok_result, err_result) = tokio::join!(ok_task, err_task);
    ok_result.unwrap().unwrap();
    assert!(err_result.unwrap().is_err());
}

#[tokio::test]
async fn work_directory_is_removed_after_success_and_failure() {
    let source = Arc::new(ability_source());
    let importer = TarballImporter::with_source(source.clone());

    importer
        .import_package(&identity(), PackageKind::Ability)
        .await
        .unwrap();

    let failing_source = Arc::new(FakeTarballSource::new(&[("package/package.json", b"{}")]));
    let failing_importer = TarballImporter::with_source(failing_source.clone());
    failing_importer
        .import_package(&identity(), PackageKind::Ability)
        .await
        .unwrap_err();

    for dir in source
        .request_dirs()
        .into_iter()
        .chain(failing_source.request_dirs())
    {
        assert!(!dir.exists(), "work directory {} survived", dir.display());
    }
}
