//! Git fetcher - clone a repository and check out the requested revision.

use std::path::Path;

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{AutotagOption, FetchOptions, RemoteCallbacks, Repository};

use crate::core::error::InstallError;
use crate::core::request::VcsReference;
use crate::util::fs::remove_dir_all_if_exists;
use crate::util::interrupt::InterruptFlag;

/// Clones repositories into the workspace.
pub struct GitFetcher {
    interrupt: InterruptFlag,
}

impl GitFetcher {
    pub fn new(interrupt: InterruptFlag) -> Self {
        GitFetcher { interrupt }
    }

    /// Clone `url` into `dest` and check out `reference`.
    ///
    /// Branches are passed to the clone itself. Tags and commits are checked
    /// out afterwards; tags through their qualified `refs/tags/` name so an
    /// identically named branch is never picked. On any failure `dest` is
    /// removed.
    pub fn fetch(&self, url: &str, reference: &VcsReference, dest: &Path) -> Result<(), InstallError> {
        if self.interrupt.is_set() {
            return Err(InstallError::Interrupted);
        }

        tracing::info!("Cloning {} ({})", url, reference);

        let repo = match self.clone_repo(url, reference, dest) {
            Ok(repo) => repo,
            Err(e) => {
                discard(dest);
                if self.interrupt.is_set() {
                    return Err(InstallError::Interrupted);
                }
                return Err(InstallError::Clone {
                    url: url.to_string(),
                    message: e.message().to_string(),
                });
            }
        };

        let spec = match reference {
            VcsReference::DefaultBranch | VcsReference::Branch(_) => None,
            VcsReference::Tag(tag) => Some(format!("refs/tags/{}", tag)),
            VcsReference::Commit(commit) => Some(commit.clone()),
        };

        if let Some(spec) = spec {
            tracing::info!("Checking out {}", reference);
            let result = checkout(&repo, &spec);
            drop(repo);
            if let Err(e) = result {
                discard(dest);
                return Err(InstallError::Checkout {
                    url: url.to_string(),
                    reference: reference.to_string(),
                    message: e.message().to_string(),
                });
            }
        }

        Ok(())
    }

    fn clone_repo(
        &self,
        url: &str,
        reference: &VcsReference,
        dest: &Path,
    ) -> Result<Repository, git2::Error> {
        let flag = self.interrupt.clone();
        let mut callbacks = RemoteCallbacks::new();
        // Returning false aborts the transfer.
        callbacks.transfer_progress(move |_| !flag.is_set());

        let mut fetch_options = FetchOptions::new();
        fetch_options.remote_callbacks(callbacks);
        fetch_options.download_tags(AutotagOption::All);

        let mut builder = RepoBuilder::new();
        builder.fetch_options(fetch_options);
        if let VcsReference::Branch(branch) = reference {
            builder.branch(branch);
        }

        builder.clone(url, dest)
    }
}

/// Detach HEAD at the commit `spec` resolves to.
fn checkout(repo: &Repository, spec: &str) -> Result<(), git2::Error> {
    let object = repo.revparse_single(spec)?;
    let commit = object.peel_to_commit()?;

    let mut checkout = CheckoutBuilder::new();
    checkout.force();
    repo.checkout_tree(commit.as_object(), Some(&mut checkout))?;
    repo.set_head_detached(commit.id())?;

    tracing::debug!("HEAD is now at {}", commit.id());
    Ok(())
}

fn discard(dest: &Path) {
    if let Err(e) = remove_dir_all_if_exists(dest) {
        tracing::warn!("Failed to remove {}: {}", dest.display(), e);
    }
}
