use crate::prelude::*;

#[test]
fn help_lists_flags() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("orchestrator for concurrent coding-agent sessions")
        .stdout_has("--program")
        .stdout_has("--auto-yes")
        .stdout_has("--auto-advance");
}

#[test]
fn version_prints_name() {
    cli().args(&["--version"]).passes().stdout_has("kasmos");
}

#[test]
fn unknown_flag_fails_before_any_side_effect() {
    // clap rejects this before `run()` ever touches the filesystem, so it
    // exercises the same exit-1-on-startup-failure contract (§6) without
    // needing a real repo.
    cli().args(&["--not-a-real-flag"]).fails().stderr_has("unexpected argument");
}
