//! Git integration
//!
//! Lists the files a pending commit would change, using libgit2 so no `git`
//! binary is required.

mod staged;

pub use staged::{is_git_repo, staged_files};
