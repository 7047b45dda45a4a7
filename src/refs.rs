/// Reference resolution: choose the git ref string a link pins to.
use crate::config::Config;
use crate::error::Error;
use crate::git;
use crate::types::{BranchRef, LinkType, Repository};

/// A resolved reference together with the concrete link type used.
/// The type matters downstream: templates see it as `type`, and handlers
/// may suppress selections for particular types.
#[derive(Debug, Clone)]
pub struct ResolvedRef {
    /// The concrete link type after defaulting.
    pub link_type: LinkType,
    /// The ref string to substitute into URL templates.
    pub name: String,
}

/// Resolve the ref for `requested` against the working copy.
///
/// A `None` request consults the configured default link type, falling back
/// to a current-branch link when nothing is configured.
///
/// # Errors
///
/// Returns `Error::DetachedHead` for a current-branch link off a branch,
/// `Error::NoRemoteHead` for a default-branch link with no configured
/// default and no recorded remote HEAD, or `Error::ExternalCommand` when
/// git itself fails.
pub fn resolve(
    repo: &Repository,
    config: &Config,
    branch_ref: BranchRef,
    requested: Option<LinkType>,
) -> Result<ResolvedRef, Error> {
    let link_type = requested
        .or(config.link_type)
        .unwrap_or(LinkType::CurrentBranch);

    let name = match link_type {
        LinkType::Commit => git::commit_hash(&repo.root, config.short_hashes)?,
        LinkType::CurrentBranch => {
            let branch = git::current_branch(&repo.root)?;
            spell(branch, branch_ref)
        },
        LinkType::DefaultBranch => {
            if config.default_branch.is_empty() {
                let branch = git::remote_head_branch(&repo.root, &repo.remote.name)?;
                spell(branch, branch_ref)
            } else {
                spell(config.default_branch.clone(), branch_ref)
            }
        },
    };

    Ok(ResolvedRef { link_type, name })
}

/// Spell a branch name per the handler's preference.
fn spell(branch: String, branch_ref: BranchRef) -> String {
    return match branch_ref {
        BranchRef::Abbreviated => branch,
        BranchRef::Full => format!("refs/heads/{branch}"),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_ref_spelling_prefixes_heads() {
        assert_eq!(
            spell("main".to_string(), BranchRef::Full),
            "refs/heads/main"
        );
        assert_eq!(spell("main".to_string(), BranchRef::Abbreviated), "main");
    }
}
