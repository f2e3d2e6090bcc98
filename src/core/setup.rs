//! One-time project preparation: the `_build/` tree, app settings taken from
//! `config.xml`, and the `index.html` hooks the initializer rewrites.

use crate::core::context::BuildContext;
use crate::core::engine::BuildEngine;
use crate::core::initializer::{CORDOVA_SCRIPT_ID, CSP_ID, SERVICE_WORKER_ID};
use crate::core::markup::{self, MarkupPatch, Selector};
use crate::domain::model::{AppSettings, Environment};
use crate::domain::ports::{BuildTask, Storage};
use crate::utils::console;
use crate::utils::error::{BuildError, Result};
use crate::utils::validation::Validate;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

const CORDOVA_SCRIPT_TAG: &str = r#"<script src="cordova.js" id="cordova-script"></script>"#;
const SERVICE_WORKER_TAG: &str = r#"<script src="" id="service-worker"></script>"#;

const ENV_PLACEHOLDER: &str = "__ENV__";
const ENV_CONFIG_TEMPLATE: &str = include_str!("../../templates/configs/env.config.ts");
const TEMPLATES: [(&str, &str); 5] = [
    (
        "configs/configuration.ts",
        include_str!("../../templates/configs/configuration.ts"),
    ),
    (
        "json/endpoints.json",
        include_str!("../../templates/json/endpoints.json"),
    ),
    (
        "json/whitelist.json",
        include_str!("../../templates/json/whitelist.json"),
    ),
    (
        "json/versions.json",
        include_str!("../../templates/json/versions.json"),
    ),
    ("settings.json", include_str!("../../templates/settings.json")),
];

/// Bundled build files, relative to the build directory.
pub fn bundled_templates() -> Vec<(PathBuf, String)> {
    let mut files: Vec<(PathBuf, String)> = TEMPLATES
        .iter()
        .map(|(path, content)| (PathBuf::from(path), content.to_string()))
        .collect();

    for env in Environment::ALL {
        files.push((
            PathBuf::from("configs").join(format!("{}.config.ts", env)),
            ENV_CONFIG_TEMPLATE.replace(ENV_PLACEHOLDER, env.as_str()),
        ));
    }
    files
}

pub struct Setup<S: Storage + 'static> {
    context: Arc<BuildContext<S>>,
    templates: Option<PathBuf>,
    force: bool,
}

impl<S: Storage + 'static> Setup<S> {
    pub fn new(context: Arc<BuildContext<S>>, templates: Option<PathBuf>, force: bool) -> Self {
        Self {
            context,
            templates,
            force,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let written = self.scaffold().await.inspect_err(|_| {
            console::step("Could not copy files to project\n");
        })?;
        tracing::info!(files = written, "build directory scaffolded");

        BuildEngine::new(vec![
            Box::new(RecordAppSettings {
                context: Arc::clone(&self.context),
                force: self.force,
            }),
            Box::new(PrepareIndexHooks {
                context: Arc::clone(&self.context),
            }),
        ])
        .run()
        .await
    }

    /// Returns how many files were written.
    pub async fn scaffold(&self) -> Result<usize> {
        let storage = self.context.storage();
        let build_dir = self.context.layout().build_dir();
        console::step(&format!("Copying build files to {}...", build_dir.display()));

        if let Some(templates) = &self.templates {
            let written = storage.copy_dir(templates, &build_dir, self.force).await?;
            return Ok(written.len());
        }

        let mut written = 0;
        for (relative, content) in bundled_templates() {
            let path = build_dir.join(relative);
            if !self.force && storage.exists(&path).await {
                tracing::debug!("keeping existing {}", path.display());
                continue;
            }
            storage.write_file(&path, content.as_bytes()).await?;
            written += 1;
        }
        Ok(written)
    }
}

/// Records the app name and package id from `config.xml`.
struct RecordAppSettings<S: Storage> {
    context: Arc<BuildContext<S>>,
    force: bool,
}

#[async_trait]
impl<S: Storage + 'static> BuildTask for RecordAppSettings<S> {
    fn name(&self) -> &'static str {
        "record app settings"
    }

    async fn run(&self) -> Result<()> {
        let storage = self.context.storage();
        let layout = self.context.layout();

        let config_path = layout.cordova_config();
        let source = storage.read_to_string(&config_path).await?;
        let markup_error = |e: markup::MarkupError| BuildError::markup(config_path.display().to_string(), e);

        let app_name = markup::first_text(&source, &Selector::tag("name"))
            .map_err(markup_error)?
            .filter(|name| !name.is_empty())
            .ok_or_else(|| BuildError::MissingConfigError {
                field: "config.xml <name>".to_string(),
            })?;
        let package_name = markup::first_attribute(&source, &Selector::tag("widget"), "id")
            .map_err(markup_error)?
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BuildError::MissingConfigError {
                field: "config.xml <widget id>".to_string(),
            })?;

        let settings_path = layout.settings();
        let mut settings: AppSettings = if storage.exists(&settings_path).await {
            serde_json::from_str(&storage.read_to_string(&settings_path).await?)?
        } else {
            AppSettings::default()
        };

        // config.xml carries env suffixes once initialized, so recorded
        // names win unless forced
        if self.force || settings.app_name.trim().is_empty() {
            settings.app_name = app_name;
        }
        if self.force || settings.package_name.trim().is_empty() {
            settings.package_name = package_name;
        }
        settings.validate()?;

        self.context
            .write_json(&settings_path, &settings)
            .await
            .inspect_err(|_| console::step("Could not save app and package name to settings\n"))?;
        tracing::info!(app = %settings.app_name, package = %settings.package_name, "settings recorded");
        Ok(())
    }
}

/// Tags `index.html` elements with the ids the initializer looks for.
struct PrepareIndexHooks<S: Storage> {
    context: Arc<BuildContext<S>>,
}

impl<S: Storage> PrepareIndexHooks<S> {
    fn patch(source: &str) -> std::result::Result<MarkupPatch, markup::MarkupError> {
        let csp_meta = Selector::attr("meta", "http-equiv", "Content-Security-Policy");
        let cordova_src = Selector::attr("script", "src", "cordova.js");
        let cordova_id = Selector::id(CORDOVA_SCRIPT_ID);

        let mut patch = MarkupPatch::new();
        // a missing CSP tag is left to the user
        if !markup::contains(source, &Selector::id(CSP_ID))?
            && markup::contains(source, &csp_meta)?
        {
            patch = patch.set_attr(csp_meta, "id", CSP_ID);
        }

        let has_service_worker = markup::contains(source, &Selector::id(SERVICE_WORKER_ID))?;
        if markup::contains(source, &cordova_id)? {
            if !has_service_worker {
                patch = patch.insert_after(cordova_id, SERVICE_WORKER_TAG);
            }
        } else if markup::contains(source, &cordova_src)? {
            patch = patch.set_attr(cordova_src.clone(), "id", CORDOVA_SCRIPT_ID);
            if !has_service_worker {
                patch = patch.insert_after(cordova_src, SERVICE_WORKER_TAG);
            }
        } else {
            let mut tags = CORDOVA_SCRIPT_TAG.to_string();
            if !has_service_worker {
                tags.push_str(SERVICE_WORKER_TAG);
            }
            patch = patch.append_child("head", &tags);
        }
        Ok(patch)
    }
}

#[async_trait]
impl<S: Storage + 'static> BuildTask for PrepareIndexHooks<S> {
    fn name(&self) -> &'static str {
        "prepare index.html hooks"
    }

    async fn run(&self) -> Result<()> {
        let storage = self.context.storage();
        let path = self.context.layout().index();
        let markup_error = |e: markup::MarkupError| BuildError::markup(path.display().to_string(), e);

        let content = storage.read_to_string(&path).await?;
        let source = markup::strip_bom(&content);
        let patch = Self::patch(source).map_err(markup_error)?;
        if patch.is_empty() {
            tracing::debug!("index.html already prepared");
            return Ok(());
        }

        let output = patch.apply(source).map_err(markup_error)?;
        storage
            .write_file(&path, output.as_bytes())
            .await
            .inspect_err(|_| console::step("Could not update index.html\n"))
    }
}
