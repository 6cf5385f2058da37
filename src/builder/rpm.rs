//! Native package build: spec generation, `rpmbuild`, install of the result.
//!
//! Build tree layout under the entry's work directory:
//!
//! ```text
//! rpmbuild/
//!   SOURCES/<name>-<version>.tar.gz
//!   SPECS/python-<name>.spec
//!   BUILD/  RPMS/  SRPMS/
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::core::descriptor::{BuildDialect, ProjectDescriptor};
use crate::core::error::InstallError;
use crate::core::plan::InstallPlan;
use crate::util::config::HostConfig;
use crate::util::fs::find_files_with_suffix;
use crate::util::process::{CommandRunner, ProcessBuilder};

/// Subdirectories `rpmbuild` expects under `_topdir`.
pub const BUILD_TREE_DIRS: [&str; 5] = ["SOURCES", "SPECS", "BUILD", "RPMS", "SRPMS"];

/// Builds and installs an RPM for a source tree.
pub struct RpmBuilder<'a> {
    runner: &'a dyn CommandRunner,
    host: &'a HostConfig,
}

impl<'a> RpmBuilder<'a> {
    pub fn new(runner: &'a dyn CommandRunner, host: &'a HostConfig) -> Self {
        RpmBuilder { runner, host }
    }

    /// Build the plan's source tree into an RPM under `work_dir` and install it.
    pub fn build_and_install(&self, plan: &InstallPlan, work_dir: &Path) -> Result<(), InstallError> {
        let descriptor = &plan.descriptor;
        let tree = create_build_tree(work_dir, &plan.source_dir)?;

        let stem = source_stem(descriptor);
        let tarball = tree.join("SOURCES").join(format!("{}.tar.gz", stem));
        tracing::info!("Creating source archive {}", tarball.display());
        create_source_tarball(&plan.source_dir, &stem, &tarball).map_err(|e| {
            InstallError::PackagingFailed {
                message: format!("failed to create source archive: {}", e),
                source: None,
            }
        })?;

        let spec_path = tree
            .join("SPECS")
            .join(format!("python-{}.spec", rpm_name(descriptor.name())));
        let changelog_date = chrono::Local::now().format("%a %b %d %Y").to_string();
        std::fs::write(&spec_path, render_spec(descriptor, &changelog_date))?;
        tracing::info!("Generated spec {}", spec_path.display());

        let rpmbuild = ProcessBuilder::new(&self.host.rpmbuild)
            .arg("-ba")
            .arg("--define")
            .arg(format!("_topdir {}", tree.display()))
            .arg(&spec_path);
        tracing::info!("Running: {}", rpmbuild.display_command());
        self.runner
            .run_checked(&rpmbuild)
            .map_err(|e| InstallError::PackagingFailed {
                message: "rpmbuild failed".to_string(),
                source: Some(e),
            })?;

        let rpm = find_binary_package(&tree.join("RPMS")).ok_or_else(|| InstallError::PackagingFailed {
            message: format!("no binary package found under {}", tree.join("RPMS").display()),
            source: None,
        })?;
        tracing::info!("Built {}", rpm.display());

        let install = ProcessBuilder::new(&self.host.package_tool)
            .args(["install", "-y"])
            .arg(&rpm);
        tracing::info!("Running: {}", install.display_command());
        self.runner
            .run_checked(&install)
            .map_err(|e| InstallError::PackagingFailed {
                message: format!("failed to install {}", rpm.display()),
                source: Some(e),
            })?;

        tracing::info!("Installed {} {} from RPM", descriptor.name(), descriptor.version());
        Ok(())
    }
}

/// Create `<work_dir>/rpmbuild` with its five subdirectories.
///
/// The tree must not end up inside `source_dir`, or the source archive would
/// contain the build tree. When `rpmbuild` is taken by the source checkout a
/// numbered sibling (`rpmbuild-1`, ...) is used instead.
pub fn create_build_tree(work_dir: &Path, source_dir: &Path) -> Result<PathBuf, InstallError> {
    if work_dir.starts_with(source_dir) {
        return Err(InstallError::PackagingFailed {
            message: format!(
                "build directory {} lies inside the source tree {}",
                work_dir.display(),
                source_dir.display()
            ),
            source: None,
        });
    }

    let mut tree = work_dir.join("rpmbuild");
    let mut suffix = 1;
    while source_dir.starts_with(&tree) {
        tree = work_dir.join(format!("rpmbuild-{}", suffix));
        suffix += 1;
    }

    for sub in BUILD_TREE_DIRS {
        std::fs::create_dir_all(tree.join(sub))?;
    }
    Ok(tree)
}

/// `<name>-<version>`: the archive stem and its top-level directory.
fn source_stem(descriptor: &ProjectDescriptor) -> String {
    format!(
        "{}-{}",
        rpm_name(descriptor.name()),
        rpm_version(descriptor.version())
    )
}

/// Archive `source_dir` as `<dest>` with every entry under `top_dir/`.
pub fn create_source_tarball(source_dir: &Path, top_dir: &str, dest: &Path) -> std::io::Result<()> {
    let file = File::create(dest)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);
    builder.append_dir_all(top_dir, source_dir)?;
    builder.into_inner()?.finish()?;
    Ok(())
}

/// First `*.rpm` under `rpms_dir` that is not a source package.
pub fn find_binary_package(rpms_dir: &Path) -> Option<PathBuf> {
    find_files_with_suffix(rpms_dir, ".rpm")
        .into_iter()
        .find(|p| !p.to_string_lossy().ends_with(".src.rpm"))
}

/// Package names may not contain whitespace.
fn rpm_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("-")
}

/// RPM versions may not contain `-`.
fn rpm_version(version: &str) -> String {
    version.replace('-', "_")
}

/// Map a dependency specifier to the distribution's package name.
///
/// `Requests[socks]>=2.31; python_version>"3"` becomes `python3-requests`.
pub fn python3_requirement(specifier: &str) -> Option<String> {
    let name: String = specifier
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        .collect();
    if name.is_empty() {
        return None;
    }
    let normalized = name
        .to_ascii_lowercase()
        .replace(['_', '.'], "-");
    Some(format!("python3-{}", normalized))
}

/// Render the `.spec` document for a descriptor.
pub fn render_spec(descriptor: &ProjectDescriptor, changelog_date: &str) -> String {
    let name = rpm_name(descriptor.name());
    let version = rpm_version(descriptor.version());
    let summary = descriptor
        .summary()
        .map(|s| s.lines().next().unwrap_or("").trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("Python module for {}", name));
    let license = descriptor.license().unwrap_or("UNKNOWN");

    let modern = descriptor.build_dialect() == BuildDialect::ModernProject;

    let mut build_requires = vec![
        "python3-devel",
        "python3-setuptools",
        "python3-pip",
        "python3-wheel",
    ];
    if modern {
        build_requires.push("pyproject-rpm-macros");
    }

    let mut requires: Vec<String> = Vec::new();
    for dep in descriptor.declared_dependencies() {
        if let Some(req) = python3_requirement(dep) {
            if !requires.contains(&req) {
                requires.push(req);
            }
        }
    }

    let (build_step, install_step) = if modern {
        ("%pyproject_wheel", "%pyproject_install")
    } else {
        ("%py3_build", "%py3_install")
    };

    let mut spec = String::new();
    spec.push_str("%define _unpackaged_files_terminate_build 0\n\n");
    spec.push_str(&format!("Name:           python-{}\n", name));
    spec.push_str(&format!("Version:        {}\n", version));
    spec.push_str("Release:        1%{?dist}\n");
    spec.push_str(&format!("Summary:        {}\n", summary));
    spec.push_str(&format!("License:        {}\n", license));
    spec.push_str(&format!("Source0:        {}-{}.tar.gz\n", name, version));
    spec.push_str("BuildArch:      noarch\n\n");
    for req in &build_requires {
        spec.push_str(&format!("BuildRequires:  {}\n", req));
    }
    for req in &requires {
        spec.push_str(&format!("Requires:       {}\n", req));
    }
    spec.push_str(&format!("\n%description\n{}\n\n", summary));
    spec.push_str(&format!("%prep\n%setup -q -n {}-{}\n\n", name, version));
    spec.push_str(&format!("%build\n{}\n\n", build_step));
    spec.push_str(&format!("%install\n{}\n\n", install_step));
    spec.push_str("%files\n%{python3_sitelib}/*\n\n");
    spec.push_str(&format!(
        "%changelog\n* {} srcinstall <root@localhost> - {}-1\n- Auto-generated by srcinstall\n",
        changelog_date, version
    ));
    spec
}
