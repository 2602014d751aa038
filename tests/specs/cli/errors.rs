use crate::prelude::*;

#[test]
fn nonexistent_repo_path_fails_with_exit_1() {
    // §6: exit 1 on startup failure (cwd/repo resolution). This never
    // reaches raw-mode setup, so it is safe to run without a tty.
    cli()
        .args(&["--repo", "/this/path/does/not/exist/kasmos-spec-test"])
        .fails()
        .stderr_has("Error:")
        .stderr_has("resolving");
}

#[test]
fn malformed_permission_cache_fails_with_exit_1() {
    let project = Project::git_repo();
    project.file(".kasmos/permissions.json", "{ this is not json");

    project
        .kasmos()
        .fails()
        .stderr_has("Error:")
        .stderr_has("loading permission cache");
}
