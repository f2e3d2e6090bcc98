use crate::config::{BuildConfig, ProjectLayout};
use crate::core::csp::ContentSecurityPolicy;
use crate::core::endpoint;
use crate::core::version::VersionScheme;
use crate::domain::model::{
    AppSettings, EndpointMap, Environment, VersionDetails, VersionMap, Whitelist,
};
use crate::domain::ports::Storage;
use crate::utils::error::{BuildError, Result};
use crate::utils::validation::{self, Validate};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;

/// Package id and display name an environment is built under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppIdentity {
    pub package_name: String,
    pub app_name: String,
}

impl AppIdentity {
    /// Production keeps the configured names; every other environment gets
    /// its own id so builds can be installed side by side.
    pub fn for_environment(settings: &AppSettings, env: Environment) -> Self {
        match env {
            Environment::Production => Self {
                package_name: settings.package_name.clone(),
                app_name: settings.app_name.clone(),
            },
            other => Self {
                package_name: format!("{}.{}", settings.package_name, other),
                app_name: format!("{} - {}", settings.app_name, other),
            },
        }
    }
}

impl Validate for AppSettings {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("settings.app_name", &self.app_name)?;
        validation::validate_package_name("settings.package_name", &self.package_name)
    }
}

/// State shared by the tasks of one invocation. Project documents are read
/// on first use and cached for the rest of the run.
pub struct BuildContext<S: Storage> {
    storage: S,
    config: BuildConfig,
    settings: OnceCell<AppSettings>,
    endpoints: OnceCell<EndpointMap>,
    whitelist: OnceCell<Whitelist>,
    versions: OnceCell<VersionMap>,
}

impl<S: Storage> BuildContext<S> {
    pub fn new(storage: S, config: BuildConfig) -> Self {
        Self {
            storage,
            config,
            settings: OnceCell::new(),
            endpoints: OnceCell::new(),
            whitelist: OnceCell::new(),
            versions: OnceCell::new(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.config.layout
    }

    pub fn version_scheme(&self) -> &VersionScheme {
        &self.config.version
    }

    pub async fn settings(&self) -> Result<&AppSettings> {
        self.settings
            .get_or_try_init(|| async {
                let settings: AppSettings = self.read_json(self.layout().settings()).await?;
                settings.validate()?;
                Ok(settings)
            })
            .await
    }

    pub async fn endpoints(&self) -> Result<&EndpointMap> {
        self.endpoints
            .get_or_try_init(|| self.read_json(self.config.layout.endpoints()))
            .await
    }

    pub async fn whitelist(&self) -> Result<&Whitelist> {
        self.whitelist
            .get_or_try_init(|| self.read_json(self.config.layout.whitelist()))
            .await
    }

    pub async fn versions(&self) -> Result<&VersionMap> {
        self.versions
            .get_or_try_init(|| self.read_json(self.config.layout.versions()))
            .await
    }

    pub async fn app_identity(&self, env: Environment) -> Result<AppIdentity> {
        Ok(AppIdentity::for_environment(self.settings().await?, env))
    }

    /// Backend URL configured for `env`.
    pub async fn endpoint(&self, env: Environment) -> Result<String> {
        let url = endpoint::endpoint_for(env, self.endpoints().await?)?;
        validation::validate_url(&format!("endpoints.{}", env), url)?;
        Ok(url.to_string())
    }

    pub async fn endpoint_origin(&self, env: Environment) -> Result<String> {
        if env.is_local() {
            return endpoint::endpoint_origin(env, &EndpointMap::new());
        }
        self.endpoint(env).await?;
        endpoint::endpoint_origin(env, self.endpoints().await?)
    }

    pub async fn version_details(&self, env: Environment) -> Result<VersionDetails> {
        if env.is_local() {
            return self.version_scheme().details_for(env, &VersionMap::new());
        }
        self.version_scheme().details_for(env, self.versions().await?)
    }

    pub async fn content_security_policy(&self, env: Environment) -> Result<ContentSecurityPolicy> {
        let origin = self.endpoint_origin(env).await?;
        let whitelist = self.whitelist().await?;
        Ok(ContentSecurityPolicy::for_environment(whitelist, env, &origin))
    }

    async fn read_json<T: DeserializeOwned + Send>(&self, path: PathBuf) -> Result<T> {
        tracing::debug!("reading {}", path.display());
        let content = self.storage.read_to_string(&path).await?;
        serde_json::from_str(&content).map_err(|e| {
            BuildError::config(format!("{} is not valid: {}", path.display(), e))
        })
    }

    pub async fn write_json<T: Serialize + Sync>(&self, path: &Path, value: &T) -> Result<()> {
        let data = to_tabbed_json(value)?;
        self.storage.write_file(path, &data).await
    }
}

/// Pretty JSON indented with tabs, the way the project files are written.
pub fn to_tabbed_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut data, formatter);
    value.serialize(&mut serializer)?;
    data.push(b'\n');
    Ok(data)
}
