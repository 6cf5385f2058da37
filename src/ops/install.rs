//! The per-package pipeline: locate, fetch, inspect, install dependencies, build.

use std::path::Path;

use crate::builder::{BuildDispatcher, DependencyInstaller};
use crate::core::artifact::SourceOrigin;
use crate::core::descriptor::{BuildDialect, ProjectDescriptor};
use crate::core::error::InstallError;
use crate::core::plan::{InstallPlan, InstallTarget};
use crate::core::request::PackageRequest;
use crate::core::workspace::Workspace;
use crate::inspect::{Inspector, PartialMetadata};
use crate::sources::{Fetcher, RegistryClient, SourceLocator};
use crate::util::config::Config;
use crate::util::fs::remove_dir_all_if_exists;
use crate::util::interrupt::InterruptFlag;
use crate::util::process::CommandRunner;

/// Fallback download timeout when commands run without one.
const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 3600;

/// Installs one package request end to end.
pub trait PackageInstaller {
    fn install(&mut self, request: &PackageRequest) -> Result<ProjectDescriptor, InstallError>;
}

/// The real pipeline, scoped to one run workspace.
pub struct Installer<'a> {
    config: &'a Config,
    target: InstallTarget,
    runner: &'a dyn CommandRunner,
    workspace: &'a mut Workspace,
    interrupt: InterruptFlag,
    locator: SourceLocator,
    fetcher: Fetcher,
}

impl<'a> Installer<'a> {
    pub fn new(
        config: &'a Config,
        target: InstallTarget,
        runner: &'a dyn CommandRunner,
        workspace: &'a mut Workspace,
        interrupt: InterruptFlag,
    ) -> Result<Self, InstallError> {
        let registry = RegistryClient::new(config.registry.url.clone(), config.registry.timeout())?;
        let download_timeout = config
            .commands
            .timeout()
            .unwrap_or(std::time::Duration::from_secs(DEFAULT_DOWNLOAD_TIMEOUT_SECS));
        let fetcher = Fetcher::new(download_timeout, interrupt.clone())?;

        Ok(Installer {
            config,
            target,
            runner,
            workspace,
            interrupt,
            locator: SourceLocator::new(registry),
            fetcher,
        })
    }

    /// Show a download progress bar.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.fetcher = self.fetcher.with_progress(show);
        self
    }

    fn check_interrupt(&self) -> Result<(), InstallError> {
        if self.interrupt.is_set() {
            Err(InstallError::Interrupted)
        } else {
            Ok(())
        }
    }

    fn pipeline(&self, request: &PackageRequest, scratch: &Path) -> Result<ProjectDescriptor, InstallError> {
        let origin = self.locator.locate(request)?;
        self.check_interrupt()?;

        let tree = self.fetcher.fetch(&origin, scratch)?;
        self.check_interrupt()?;

        let hint = match &origin {
            SourceOrigin::Registry { name, version, .. } => Some(PartialMetadata {
                name: Some(name.clone()),
                version: version.clone(),
                ..Default::default()
            }),
            SourceOrigin::VersionControl { .. } => None,
        };

        let inspector = Inspector::new(self.runner, self.config.install.python.clone(), &self.config.inspect);
        let descriptor = inspector.inspect(&tree.root, hint.as_ref());
        self.check_interrupt()?;

        if descriptor.build_dialect() == BuildDialect::Unknown {
            return Err(InstallError::NoBuildSystem { path: tree.root });
        }

        DependencyInstaller::new(self.runner, &self.config.install)
            .install_dependencies(&descriptor, &tree.root);
        self.check_interrupt()?;

        let plan = InstallPlan::new(self.target, descriptor, tree.root);
        BuildDispatcher::new(self.runner, &self.config.install, &self.config.host)
            .build_and_install(&plan, scratch)?;

        Ok(plan.descriptor)
    }
}

impl PackageInstaller for Installer<'_> {
    fn install(&mut self, request: &PackageRequest) -> Result<ProjectDescriptor, InstallError> {
        self.check_interrupt()?;
        tracing::info!("Installing {}", request.label());

        let scratch = self
            .workspace
            .scratch_dir(&request.label())
            .map_err(|e| InstallError::Io(std::io::Error::other(format!("{:#}", e))))?;

        let result = self.pipeline(request, &scratch);

        if let Err(e) = remove_dir_all_if_exists(&scratch) {
            tracing::warn!("Failed to remove {}: {:#}", scratch.display(), e);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixtures, fixtures::GitFixture, RecordingRunner};
    use crate::util::config::WorkspaceConfig;
    use crate::util::hash::sha256_bytes;
    use crate::util::process::CommandOutput;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    fn workspace_in(parent: &Path) -> Workspace {
        Workspace::create(&WorkspaceConfig {
            prefix: "srcinstall_test_".to_string(),
            parent: Some(parent.to_path_buf()),
        })
        .unwrap()
    }

    fn config_for(server: &MockServer) -> Config {
        let mut config = Config::default();
        config.registry.url = server.url("/pypi");
        config
    }

    #[test]
    fn test_registry_package_end_to_end() {
        let tmp = TempDir::new().unwrap();
        let archive = fixtures::tar_gz_bytes(&[
            ("foo-1.2.3/pyproject.toml", &fixtures::pyproject("foo", "1.2.3", &["click"])),
            ("foo-1.2.3/requirements.txt", "click\n"),
            ("foo-1.2.3/foo/__init__.py", ""),
        ]);
        let digest = sha256_bytes(&archive);

        let server = MockServer::start();
        let files_url = server.url("/files/foo-1.2.3.tar.gz");
        server.mock(|when, then| {
            when.method(GET).path("/pypi/foo/1.2.3/json");
            then.status(200).json_body(serde_json::json!({
                "info": {"name": "foo", "version": "1.2.3"},
                "urls": [{
                    "packagetype": "sdist",
                    "url": files_url,
                    "filename": "foo-1.2.3.tar.gz",
                    "digests": {"sha256": digest}
                }]
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/files/foo-1.2.3.tar.gz");
            then.status(200).body(archive.clone());
        });

        let config = config_for(&server);
        let runner = RecordingRunner::new();
        let mut workspace = workspace_in(tmp.path());
        let workspace_path = workspace.path().to_path_buf();

        let descriptor = {
            let mut installer = Installer::new(
                &config,
                InstallTarget::DirectHostInstall,
                &runner,
                &mut workspace,
                InterruptFlag::new(),
            )
            .unwrap();
            let request = PackageRequest::registry("foo", Some("1.2.3".into())).unwrap();
            installer.install(&request).unwrap()
        };

        assert_eq!(descriptor.name(), "foo");
        assert_eq!(descriptor.version(), "1.2.3");

        let calls = runner.calls();
        assert_eq!(
            calls,
            vec![
                "python3 -m pip install -r requirements.txt",
                "python3 -m pip install click",
                "python3 -m pip install . --prefix=/usr/local --root=/",
                "ldconfig",
            ]
        );
        let install_cwd = runner.recorded()[2].cwd.clone().unwrap();
        assert!(install_cwd.ends_with("extracted/foo-1.2.3"));

        // Per-entry scratch directory is gone, the workspace itself remains until dropped.
        assert!(workspace_path.exists());
        assert_eq!(std::fs::read_dir(&workspace_path).unwrap().count(), 0);
    }

    #[test]
    fn test_not_found_stops_before_any_command() {
        let tmp = TempDir::new().unwrap();
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/pypi/ghost/json");
            then.status(404);
        });

        let config = config_for(&server);
        let runner = RecordingRunner::new();
        let mut workspace = workspace_in(tmp.path());
        let mut installer = Installer::new(
            &config,
            InstallTarget::DirectHostInstall,
            &runner,
            &mut workspace,
            InterruptFlag::new(),
        )
        .unwrap();

        let err = installer
            .install(&PackageRequest::registry("ghost", None).unwrap())
            .unwrap_err();
        assert!(matches!(err, InstallError::NotFound { .. }));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_vcs_package_with_unknown_layout_fails_without_installing() {
        let tmp = TempDir::new().unwrap();
        let fixture = GitFixture::new(&tmp.path().join("remote"));
        fixture.commit("README.md", "nothing to build\n", "initial");

        let config = Config::default();
        let runner = RecordingRunner::new();
        let mut workspace = workspace_in(tmp.path());
        let mut installer = Installer::new(
            &config,
            InstallTarget::DirectHostInstall,
            &runner,
            &mut workspace,
            InterruptFlag::new(),
        )
        .unwrap();

        let request = PackageRequest::vcs(fixture.url(), None, None, None).unwrap();
        let err = installer.install(&request).unwrap_err();

        assert!(matches!(err, InstallError::NoBuildSystem { .. }));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_vcs_legacy_package_native_build_failure_surfaces() {
        let tmp = TempDir::new().unwrap();
        let fixture = GitFixture::new(&tmp.path().join("remote"));
        fixture.commit("setup.py", &fixtures::setup_py("legacy", "0.4", &[]), "initial");

        let mut config = Config::default();
        config.inspect.allow_setup_script_execution = false;
        let runner = RecordingRunner::new().expect_prefix("rpmbuild", CommandOutput::failure(1, "spec error"));
        let mut workspace = workspace_in(tmp.path());
        let mut installer = Installer::new(
            &config,
            InstallTarget::NativePackageBuild,
            &runner,
            &mut workspace,
            InterruptFlag::new(),
        )
        .unwrap();

        let request = PackageRequest::vcs(fixture.url(), None, None, None).unwrap();
        let err = installer.install(&request).unwrap_err();

        assert!(matches!(err, InstallError::PackagingFailed { .. }));
        assert!(runner.ran("rpmbuild -ba"));
        assert!(!runner.ran("python3 setup.py egg_info"));
    }

    #[test]
    fn test_interrupted_before_start() {
        let tmp = TempDir::new().unwrap();
        let config = Config::default();
        let runner = RecordingRunner::new();
        let mut workspace = workspace_in(tmp.path());
        let flag = InterruptFlag::new();
        flag.trigger();

        let mut installer = Installer::new(
            &config,
            InstallTarget::DirectHostInstall,
            &runner,
            &mut workspace,
            flag,
        )
        .unwrap();

        let err = installer
            .install(&PackageRequest::registry("foo", None).unwrap())
            .unwrap_err();
        assert!(err.is_interrupted());
    }
}
