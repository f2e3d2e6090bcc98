use anyhow::Result;
use hybrid_build_kit::{
    BuildConfig, BuildContext, BuildError, Environment, Finalizer, LocalStorage, Platform,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

const LEGACY_APK_DIR: &str = "platforms/android/build/outputs/apk";
const GRADLE_APK_DIR: &str = "platforms/android/app/build/outputs/apk";

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Project with published versions and no build output yet.
fn create_project() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    write(
        temp_dir.path(),
        "_build/json/versions.json",
        r#"{ "testing": "1.4.2", "staging": "1.5.0", "production": "2.0.17" }"#,
    );
    temp_dir
}

fn finalizer(root: &Path, env: Environment, platform: Platform) -> Finalizer<LocalStorage> {
    let context = BuildContext::new(LocalStorage::new(root), BuildConfig::default());
    Finalizer::new(Arc::new(context), env, platform)
}

#[tokio::test]
async fn test_debug_apk_is_copied_for_testing() -> Result<()> {
    let project = create_project();
    let root = project.path();
    write(root, &format!("{}/android-debug.apk", LEGACY_APK_DIR), "debug");
    write(root, &format!("{}/android-release.apk", LEGACY_APK_DIR), "release");

    let target = finalizer(root, Environment::Testing, Platform::Android)
        .copy_output()
        .await?
        .unwrap();

    assert!(target.ends_with("bin/android/testing/testing_1.04.002.apk"));
    assert_eq!(
        fs::read_to_string(root.join("bin/android/testing/testing_1.04.002.apk"))?,
        "debug"
    );

    Ok(())
}

#[tokio::test]
async fn test_release_apk_is_copied_for_production() -> Result<()> {
    let project = create_project();
    let root = project.path();
    write(root, &format!("{}/android-debug.apk", LEGACY_APK_DIR), "debug");
    write(root, &format!("{}/android-release.apk", LEGACY_APK_DIR), "release");

    finalizer(root, Environment::Production, Platform::Android)
        .copy_output()
        .await?;

    assert_eq!(
        fs::read_to_string(root.join("bin/android/production/production_2.00.017.apk"))?,
        "release"
    );

    Ok(())
}

#[tokio::test]
async fn test_local_builds_use_pinned_version() -> Result<()> {
    let project = create_project();
    let root = project.path();
    write(root, &format!("{}/android-debug.apk", LEGACY_APK_DIR), "debug");

    finalizer(root, Environment::Dev, Platform::Android)
        .copy_output()
        .await?;

    assert!(root.join("bin/android/dev/dev_1.00.000.apk").exists());

    Ok(())
}

#[tokio::test]
async fn test_crosswalk_artifact_from_package_manifest() -> Result<()> {
    let project = create_project();
    let root = project.path();
    write(
        root,
        "package.json",
        r#"{ "cordova": { "plugins": { "cordova-plugin-crosswalk-webview": {} } } }"#,
    );
    write(root, &format!("{}/android-release.apk", LEGACY_APK_DIR), "plain");
    write(
        root,
        &format!("{}/android-armv7-release.apk", LEGACY_APK_DIR),
        "armv7",
    );

    finalizer(root, Environment::Staging, Platform::Android)
        .copy_output()
        .await?;

    assert_eq!(
        fs::read_to_string(root.join("bin/android/staging/staging_1.05.000.apk"))?,
        "armv7"
    );

    Ok(())
}

#[tokio::test]
async fn test_gradle_layout_is_used_when_legacy_output_is_missing() -> Result<()> {
    let project = create_project();
    let root = project.path();
    write(root, &format!("{}/release/app-release.apk", GRADLE_APK_DIR), "gradle");

    finalizer(root, Environment::Staging, Platform::Android)
        .copy_output()
        .await?;

    assert_eq!(
        fs::read_to_string(root.join("bin/android/staging/staging_1.05.000.apk"))?,
        "gradle"
    );

    Ok(())
}

#[tokio::test]
async fn test_previous_output_is_replaced() -> Result<()> {
    let project = create_project();
    let root = project.path();
    write(root, "bin/android/testing/testing_1.04.002.apk", "stale");
    write(root, &format!("{}/android-debug.apk", LEGACY_APK_DIR), "fresh");

    finalizer(root, Environment::Testing, Platform::Android)
        .copy_output()
        .await?;

    assert_eq!(
        fs::read_to_string(root.join("bin/android/testing/testing_1.04.002.apk"))?,
        "fresh"
    );

    Ok(())
}

#[tokio::test]
async fn test_other_platforms_have_nothing_to_copy() -> Result<()> {
    let project = create_project();
    let root = project.path();

    for platform in [Platform::Ios, Platform::Pwa] {
        let target = finalizer(root, Environment::Production, platform)
            .copy_output()
            .await?;
        assert!(target.is_none());
    }
    assert!(!root.join("bin").exists());

    Ok(())
}

#[tokio::test]
async fn test_missing_apk_is_an_error() -> Result<()> {
    let project = create_project();
    let root = project.path();

    let err = finalizer(root, Environment::Production, Platform::Android)
        .copy_output()
        .await
        .unwrap_err();

    match err {
        BuildError::FileError { path, .. } => assert!(path.ends_with("android-release.apk")),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(!root.join("bin").exists());

    Ok(())
}
