use crate::core::context::BuildContext;
use crate::domain::model::{Environment, Platform};
use crate::domain::ports::Storage;
use crate::utils::console;
use crate::utils::error::{BuildError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const CROSSWALK_PLUGIN: &str = "cordova-plugin-crosswalk-webview";

const LEGACY_APK_DIR: &str = "platforms/android/build/outputs/apk";
const GRADLE_APK_DIR: &str = "platforms/android/app/build/outputs/apk";

/// Moves build output into the versioned `bin/` layout.
pub struct Finalizer<S: Storage> {
    context: Arc<BuildContext<S>>,
    env: Environment,
    platform: Platform,
}

impl<S: Storage> Finalizer<S> {
    pub fn new(context: Arc<BuildContext<S>>, env: Environment, platform: Platform) -> Self {
        Self {
            context,
            env,
            platform,
        }
    }

    /// Copies the artifact for the platform and returns where it landed.
    /// Only Android produces a file to copy.
    pub async fn copy_output(&self) -> Result<Option<PathBuf>> {
        match self.platform {
            Platform::Android => self.copy_android_output().await.map(Some),
            other => {
                console::step(&format!("No build output to copy for {}", other));
                Ok(None)
            }
        }
    }

    async fn copy_android_output(&self) -> Result<PathBuf> {
        console::step(&format!("Copying {} build output..", self.platform));
        let storage = self.context.storage();

        let crosswalk = self.is_crosswalk_build().await?;
        let candidates = apk_candidates(self.env, crosswalk);
        let mut source = None;
        for candidate in &candidates {
            if storage.exists(candidate).await {
                source = Some(candidate.clone());
                break;
            }
        }
        let source = source.ok_or_else(|| {
            BuildError::file(
                candidates[0].display().to_string(),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no generated apk found"),
            )
        })?;

        let details = self.context.version_details(self.env).await?;
        let destination = self
            .context
            .layout()
            .output_dir()
            .join(self.platform.as_str())
            .join(self.env.as_str());
        storage.create_dir_all(&destination).await?;

        let target = destination.join(format!("{}_{}.apk", self.env, details.formatted_version()));
        if storage.exists(&target).await {
            tracing::debug!("replacing previous build {}", target.display());
            storage.remove_file(&target).await?;
        }

        storage.copy_file(&source, &target).await.inspect_err(|_| {
            console::step("\nFailed to copy generated apk");
            console::step(&format!(
                "source: {}\ntarget: {}\n",
                source.display(),
                target.display()
            ));
        })?;

        tracing::info!(source = %source.display(), target = %target.display(), "apk copied");
        console::success("Done copying output.");
        Ok(target)
    }

    /// Crosswalk builds emit per-ABI artifacts.
    async fn is_crosswalk_build(&self) -> Result<bool> {
        let storage = self.context.storage();
        if storage.exists(&Path::new("plugins").join(CROSSWALK_PLUGIN)).await {
            return Ok(true);
        }

        let package = Path::new("package.json");
        if !storage.exists(package).await {
            return Ok(false);
        }
        let manifest: serde_json::Value = serde_json::from_str(&storage.read_to_string(package).await?)?;
        Ok(manifest
            .pointer("/cordova/plugins")
            .and_then(|plugins| plugins.get(CROSSWALK_PLUGIN))
            .is_some_and(|plugin| !plugin.is_null() && plugin != &serde_json::Value::Bool(false)))
    }
}

/// Release artifacts for staging/production, debug otherwise; the legacy
/// Cordova layout first, then the Gradle app module layout.
pub fn apk_candidates(env: Environment, crosswalk: bool) -> Vec<PathBuf> {
    let kind = if env.is_release() { "release" } else { "debug" };
    let legacy_name = if crosswalk {
        format!("android-armv7-{}.apk", kind)
    } else {
        format!("android-{}.apk", kind)
    };
    let gradle_name = if crosswalk {
        format!("app-armv7-{}.apk", kind)
    } else {
        format!("app-{}.apk", kind)
    };

    vec![
        Path::new(LEGACY_APK_DIR).join(legacy_name),
        Path::new(GRADLE_APK_DIR).join(kind).join(gradle_name),
    ]
}
