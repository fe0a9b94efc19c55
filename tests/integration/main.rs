//! Integration tests for the shed CLI.
//!
//! These exercise the command surface without requiring a Go toolchain:
//! every case either never reaches the toolchain or fails before it would.

mod cli_tests {
    use assert_cmd::Command;
    use predicates::prelude::*;
    use tempfile::TempDir;

    // A shed command sandboxed to its own directory and cache.
    fn shed(dir: &TempDir) -> Command {
        let mut cmd = Command::cargo_bin("shed").unwrap();
        cmd.current_dir(dir.path())
            .env("SHED_CACHE_DIR", dir.path().join("cache"))
            .env_remove("SHED_LOCKFILE");
        cmd
    }

    #[test]
    fn help_displays() {
        let dir = TempDir::new().unwrap();
        shed(&dir)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("managing Go tool dependencies"));
    }

    #[test]
    fn version_displays() {
        let dir = TempDir::new().unwrap();
        shed(&dir)
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("shed"));
    }

    #[test]
    fn init_creates_lockfile() {
        let dir = TempDir::new().unwrap();
        shed(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Created shed.lock"));

        let data = std::fs::read_to_string(dir.path().join("shed.lock")).unwrap();
        let got: serde_json::Value = serde_json::from_str(&data).unwrap();
        assert_eq!(got, serde_json::json!({ "tools": {} }));
    }

    #[test]
    fn init_twice_is_a_noop() {
        let dir = TempDir::new().unwrap();
        shed(&dir).arg("init").assert().success();
        shed(&dir)
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already exists"));
    }

    #[test]
    fn cache_dir_prints_path() {
        let dir = TempDir::new().unwrap();
        shed(&dir)
            .args(["cache", "dir"])
            .assert()
            .success()
            .stdout(predicate::str::contains("cache"));
    }

    #[test]
    fn cache_clean_succeeds() {
        let dir = TempDir::new().unwrap();
        shed(&dir).args(["cache", "clean"]).assert().success();
        assert!(!dir.path().join("cache").exists());
    }

    #[test]
    fn list_empty() {
        let dir = TempDir::new().unwrap();
        shed(&dir)
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn run_missing_tool_fails() {
        let dir = TempDir::new().unwrap();
        shed(&dir)
            .args(["run", "stringer"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("No tool named stringer"));
    }

    #[test]
    fn get_invalid_tool_name_fails() {
        let dir = TempDir::new().unwrap();
        // A bare binary name is not a valid import path.
        shed(&dir)
            .args(["get", "stringer"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid tool name"));
    }

    #[test]
    fn get_with_no_tools_writes_empty_lockfile() {
        let dir = TempDir::new().unwrap();
        shed(&dir).arg("get").assert().success();
        assert!(dir.path().join("shed.lock").exists());
    }
}
