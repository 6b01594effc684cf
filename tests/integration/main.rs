//! Integration tests for bpack

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    /// bpack isolated from the user's configuration
    fn bpack(temp: &TempDir) -> Command {
        let mut cmd = cargo_bin_cmd!("bpack");
        cmd.env("BPACK_CONFIG", temp.path().join("bpack-config.toml"));
        cmd
    }

    /// A package descriptor with one local buildpack directory
    fn write_package(dir: &Path) -> String {
        let bp = dir.join("bp");
        std::fs::create_dir_all(bp.join("bin")).unwrap();
        std::fs::write(bp.join("buildpack.toml"), "api = \"0.8\"\n").unwrap();
        std::fs::write(bp.join("bin").join("build"), "#!/bin/sh\n").unwrap();

        let config = dir.join("package.toml");
        std::fs::write(&config, "[buildpack]\nuri = \"bp\"\n").unwrap();
        config.to_string_lossy().into_owned()
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        bpack(&temp)
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("package-buildpack"));
    }

    #[test]
    fn package_help_hides_deprecated_flag() {
        let temp = TempDir::new().unwrap();
        bpack(&temp)
            .args(["package-buildpack", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--config"))
            .stdout(predicate::str::contains("--package-config").not());
    }

    #[test]
    fn missing_config_fails() {
        let temp = TempDir::new().unwrap();
        bpack(&temp)
            .args(["package-buildpack", "mybp"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("Successfully").not())
            .stderr(predicate::str::contains(
                "Please provide a package config path, using --config",
            ));
    }

    #[test]
    fn publish_and_no_pull_conflict() {
        let temp = TempDir::new().unwrap();
        bpack(&temp)
            .args([
                "package-buildpack",
                "mybp",
                "-c",
                "package.toml",
                "--publish",
                "--no-pull",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("cannot be used together"));
    }

    #[test]
    fn unreadable_config_fails() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("missing.toml");
        bpack(&temp)
            .args(["package-buildpack", "mybp", "--config"])
            .arg(&missing)
            .assert()
            .failure()
            .stderr(predicate::str::contains("reading config"));
    }

    #[test]
    fn file_package_is_created() {
        let temp = TempDir::new().unwrap();
        let config = write_package(temp.path());
        let out = temp.path().join("mybp.cnb");

        bpack(&temp)
            .args(["package-buildpack"])
            .arg(&out)
            .args(["--config", &config, "--format", "file"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Successfully created package"));

        assert!(out.is_file());
    }

    #[test]
    fn deprecated_flag_warns_and_still_packages() {
        let temp = TempDir::new().unwrap();
        let config = write_package(temp.path());
        let out = temp.path().join("legacy.cnb");

        let assert = bpack(&temp)
            .args(["package-buildpack"])
            .arg(&out)
            .args(["--package-config", &config, "-f", "file"])
            .assert()
            .success();

        let output = assert.get_output();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert_eq!(stderr.matches("--package-config has been deprecated").count(), 1);
        assert_eq!(stdout.matches("Successfully created package").count(), 1);
        assert!(out.is_file());
    }

    #[test]
    fn verbose_run_reports_each_line_once() {
        let temp = TempDir::new().unwrap();
        let config = write_package(temp.path());
        let out = temp.path().join("verbose.cnb");

        let assert = bpack(&temp)
            .args(["-v", "package-buildpack"])
            .arg(&out)
            .args(["-p", &config, "-f", "file"])
            .assert()
            .success();

        let output = assert.get_output();
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert_eq!(stderr.matches("--package-config has been deprecated").count(), 1);
        assert_eq!(stdout.matches("Successfully created package").count(), 1);
        assert!(!stderr.contains("Successfully created package"));
    }

    #[test]
    fn file_format_cannot_publish() {
        let temp = TempDir::new().unwrap();
        let config = write_package(temp.path());
        let out = temp.path().join("mybp.cnb");

        bpack(&temp)
            .args(["package-buildpack"])
            .arg(&out)
            .args(["-c", &config, "-f", "file", "--publish"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Cannot publish"));

        assert!(!out.exists());
    }

    #[test]
    fn default_format_from_config_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("bpack-config.toml"),
            "[packager]\ndefault_format = \"file\"\n",
        )
        .unwrap();
        let config = write_package(temp.path());
        let out = temp.path().join("default.cnb");

        bpack(&temp)
            .args(["package-buildpack"])
            .arg(&out)
            .args(["-c", &config])
            .assert()
            .success();

        assert!(out.is_file());
    }

    #[test]
    fn cache_info_shows_volume() {
        let temp = TempDir::new().unwrap();
        bpack(&temp)
            .args(["cache", "info", "mybp"])
            .assert()
            .success()
            .stdout(predicate::str::contains("bpack-cache-"));
    }

    #[test]
    fn config_path_uses_override() {
        let temp = TempDir::new().unwrap();
        bpack(&temp)
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("bpack-config.toml"));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        bpack(&temp)
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[packager]"));
    }
}
