use crate::core::context::BuildContext;
use crate::core::engine::BuildEngine;
use crate::core::markup::{self, MarkupPatch, Selector};
use crate::domain::model::{Environment, Platform};
use crate::domain::ports::{BuildTask, Storage};
use crate::utils::console;
use crate::utils::error::{BuildError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

pub const CORDOVA_SCRIPT_ID: &str = "cordova-script";
pub const SERVICE_WORKER_ID: &str = "service-worker";
pub const CSP_ID: &str = "csp";

/// Rewrites the project for one environment/platform pair.
pub struct Initializer<S: Storage + 'static> {
    context: Arc<BuildContext<S>>,
    env: Environment,
    platform: Platform,
}

impl<S: Storage + 'static> Initializer<S> {
    pub fn new(context: Arc<BuildContext<S>>, env: Environment, platform: Platform) -> Self {
        Self {
            context,
            env,
            platform,
        }
    }

    pub fn tasks(&self) -> Vec<Box<dyn BuildTask>> {
        let target = Target {
            context: Arc::clone(&self.context),
            env: self.env,
            platform: self.platform,
        };
        vec![
            Box::new(CopyConfigurations(target.clone())),
            Box::new(PrepareCordovaConfig(target.clone())),
            Box::new(PrepareIndex(target.clone())),
            Box::new(PrepareEndpoint(target.clone())),
            Box::new(PrepareVersion(target)),
        ]
    }

    pub async fn run(&self) -> Result<()> {
        console::target("Targeted Environment: ", self.env.as_str());
        console::target("Targeted Platform: ", &format!("{}\n", self.platform));
        tracing::info!(env = %self.env, platform = %self.platform, "initializing");

        BuildEngine::new(self.tasks()).run().await
    }
}

struct Target<S: Storage> {
    context: Arc<BuildContext<S>>,
    env: Environment,
    platform: Platform,
}

impl<S: Storage> Clone for Target<S> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            env: self.env,
            platform: self.platform,
        }
    }
}

/// Env config stubs and the PWA service worker.
struct CopyConfigurations<S: Storage>(Target<S>);

#[async_trait]
impl<S: Storage + 'static> BuildTask for CopyConfigurations<S> {
    fn name(&self) -> &'static str {
        "copy configurations"
    }

    async fn run(&self) -> Result<()> {
        let Target {
            context,
            env,
            platform,
        } = &self.0;
        let storage = context.storage();
        let layout = context.layout();
        console::step(&format!("Copying {} configurations...", env));

        let mut errors = Vec::new();
        let config_dir = layout.app_config_dir();
        if let Err(e) = storage.create_dir_all(&config_dir).await {
            errors.push(e);
        }

        let configs = layout.configs_dir();
        let copies = [
            (configs.join("configuration.ts"), config_dir.join("configuration.ts")),
            (
                configs.join(format!("{}.config.ts", env)),
                config_dir.join("env.config.ts"),
            ),
        ];
        for (source, target) in &copies {
            if let Err(e) = storage.copy_file(source, target).await {
                errors.push(e);
            }
        }

        let pwa_script = layout.pwa_script();
        if storage.exists(&pwa_script).await {
            let target = www_target(&pwa_script, layout.www_dir());
            if let Err(e) = storage.copy_file(&pwa_script, &target).await {
                errors.push(e);
            }
        } else if *platform == Platform::Pwa {
            errors.push(BuildError::file(
                pwa_script.display().to_string(),
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "the pwa platform needs a service worker script",
                ),
            ));
        } else {
            console::warning(&format!("{} not found, skipping", pwa_script.display()));
        }

        if errors.is_empty() {
            console::success(&format!("Done copying {} configurations", env));
            return Ok(());
        }

        for err in &errors {
            console::failure(&err.to_string());
        }
        console::step("Error(s) occurred while copying files\n");
        if errors.len() == 1 {
            return Err(errors.remove(0));
        }
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        Err(BuildError::config(messages.join("; ")))
    }
}

fn www_target(pwa_script: &std::path::Path, www_dir: PathBuf) -> PathBuf {
    match pwa_script.file_name() {
        Some(name) => www_dir.join(name),
        None => www_dir,
    }
}

struct PrepareCordovaConfig<S: Storage>(Target<S>);

#[async_trait]
impl<S: Storage + 'static> BuildTask for PrepareCordovaConfig<S> {
    fn name(&self) -> &'static str {
        "prepare config.xml"
    }

    async fn run(&self) -> Result<()> {
        let Target { context, env, .. } = &self.0;
        console::step("Preparing config.xml...");

        let identity = context.app_identity(*env).await?;
        let origin = context.endpoint_origin(*env).await?;
        let version = context.version_details(*env).await?;
        let version_string = version.version();
        let version_code = version.android_version_code.to_string();

        let patch = MarkupPatch::new()
            .set_attr(Selector::tag("widget"), "id", &identity.package_name)
            .set_text(Selector::tag("name"), &identity.app_name)
            .set_first_attr(Selector::tag("access"), "origin", &origin)
            .set_attr(Selector::tag("allow-navigation"), "href", &origin)
            .set_attr(Selector::tag("widget"), "version", &version_string)
            .set_attr(Selector::tag("widget"), "android-versionCode", &version_code)
            .set_attr(Selector::tag("widget"), "ios-CFBundleVersion", &version_string);

        let path = context.layout().cordova_config();
        let source = context.storage().read_to_string(&path).await?;
        let output = patch
            .apply(&source)
            .map_err(|e| BuildError::markup(path.display().to_string(), e))?;
        context
            .storage()
            .write_file(&path, output.as_bytes())
            .await
            .inspect_err(|_| console::step("Could not save config.xml!\n"))?;

        tracing::info!(
            package = %identity.package_name,
            version = %version_string,
            code = version.android_version_code,
            "config.xml updated"
        );
        console::success("Done preparing config.xml");
        Ok(())
    }
}

struct PrepareIndex<S: Storage>(Target<S>);

impl<S: Storage> PrepareIndex<S> {
    /// `cordova.js` breaks plugin initialization outside a device, so the
    /// browser env and PWA builds load nothing.
    fn cordova_script(&self) -> &'static str {
        if self.0.env == Environment::Browser || self.0.platform == Platform::Pwa {
            ""
        } else {
            "cordova.js"
        }
    }

    fn service_worker(&self) -> &'static str {
        if self.0.platform == Platform::Pwa {
            "pwa.js"
        } else {
            ""
        }
    }
}

#[async_trait]
impl<S: Storage + 'static> BuildTask for PrepareIndex<S> {
    fn name(&self) -> &'static str {
        "prepare index.html"
    }

    async fn run(&self) -> Result<()> {
        let Target { context, env, .. } = &self.0;
        console::step("Preparing index.html...");

        let csp = context.content_security_policy(*env).await?;
        let settings = context.settings().await?;

        let patch = MarkupPatch::new()
            .set_attr(Selector::id(CORDOVA_SCRIPT_ID), "src", self.cordova_script())
            .set_attr(Selector::id(SERVICE_WORKER_ID), "src", self.service_worker())
            .set_attr(Selector::id(CSP_ID), "content", &csp.to_header())
            .set_text(Selector::tag("title"), &settings.app_name);

        let path = context.layout().index();
        let source = context.storage().read_to_string(&path).await?;
        let output = patch
            .apply(markup::strip_bom(&source))
            .map_err(|e| BuildError::markup(path.display().to_string(), e))?;
        context
            .storage()
            .write_file(&path, output.as_bytes())
            .await
            .inspect_err(|_| console::step("Could not save index.html!\n"))?;

        tracing::debug!(csp = %csp, "index.html updated");
        console::success("Done preparing index.html");
        Ok(())
    }
}

/// `endpoint.json` holding only the targeted environment's URL.
struct PrepareEndpoint<S: Storage>(Target<S>);

#[async_trait]
impl<S: Storage + 'static> BuildTask for PrepareEndpoint<S> {
    fn name(&self) -> &'static str {
        "prepare endpoint"
    }

    async fn run(&self) -> Result<()> {
        let Target { context, env, .. } = &self.0;

        let mut endpoint = serde_json::Map::new();
        // local envs may point at a dev-server proxy path or have no backend
        let url = if env.is_local() {
            context.endpoints().await?.get(env.as_str()).cloned()
        } else {
            Some(context.endpoint(*env).await?)
        };
        if let Some(url) = url {
            endpoint.insert(env.to_string(), serde_json::Value::String(url));
        }

        let path = context.layout().app_config_dir().join("endpoint.json");
        context
            .write_json(&path, &endpoint)
            .await
            .inspect_err(|_| console::step("Could not save endpoint file\n"))
    }
}

/// `version.json` read by the env config stubs.
struct PrepareVersion<S: Storage>(Target<S>);

#[async_trait]
impl<S: Storage + 'static> BuildTask for PrepareVersion<S> {
    fn name(&self) -> &'static str {
        "prepare version"
    }

    async fn run(&self) -> Result<()> {
        let Target { context, env, .. } = &self.0;

        let details = context.version_details(*env).await?;
        let version = serde_json::json!({ "version": details.version() });

        let path = context.layout().app_config_dir().join("version.json");
        context
            .write_json(&path, &version)
            .await
            .inspect_err(|_| console::step("Could not save version file\n"))
    }
}
