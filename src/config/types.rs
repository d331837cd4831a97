//! Configuration types.

use serde::{Deserialize, Serialize};

/// Top-level launcher configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherConfig {
    /// How to reach the remote host.
    pub ssh: SshConfig,
    /// Where Spark lives on the remote host and how jobs are staged.
    pub spark: SparkConfig,
}

/// Remote invocation prefix.
///
/// The base arguments are prepended to every spawned command and treated as
/// opaque; anything that puts the rest of the argument vector on the remote
/// host works here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub base_args: Vec<String>,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            base_args: vec![
                "ssh".to_string(),
                "-o".to_string(),
                "StrictHostKeyChecking=no".to_string(),
                "hadoop@localhost".to_string(),
            ],
        }
    }
}

/// Remote Spark installation and job staging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SparkConfig {
    /// Path of the `spark-shell` binary on the remote host.
    pub shell_path: String,
    /// Extra options passed to `spark-shell`, verbatim.
    pub shell_opts: String,
    /// mktemp template for the staged script file.
    pub temp_file_template: String,
    /// mktemp suffix for the staged script file.
    pub temp_file_suffix: String,
    /// Environment variable carrying the run cookie into the remote script.
    pub cookie_env_var: String,
}

impl Default for SparkConfig {
    fn default() -> Self {
        Self {
            shell_path: "spark-shell".to_string(),
            shell_opts: String::new(),
            temp_file_template: "spark-job-script-XXXXXXXXXX".to_string(),
            temp_file_suffix: ".scala".to_string(),
            cookie_env_var: "SPARK_LAUNCHER_COOKIE".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LauncherConfig::default();
        assert_eq!(config.ssh.base_args[0], "ssh");
        assert_eq!(config.spark.shell_path, "spark-shell");
        assert_eq!(config.spark.temp_file_suffix, ".scala");
        assert_eq!(config.spark.cookie_env_var, "SPARK_LAUNCHER_COOKIE");
    }

    #[test]
    fn test_parse_toml_config() {
        let toml_str = r#"
            [ssh]
            base_args = ["ssh", "hadoop@10.6.10.244"]

            [spark]
            shell_path = "/opt/spark-1.0.2/bin/spark-shell"
            shell_opts = "--driver-memory 2g"
        "#;

        let config: LauncherConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.ssh.base_args,
            vec!["ssh".to_string(), "hadoop@10.6.10.244".to_string()]
        );
        assert_eq!(config.spark.shell_path, "/opt/spark-1.0.2/bin/spark-shell");
        assert_eq!(config.spark.shell_opts, "--driver-memory 2g");
        // Unset sections keep their defaults.
        assert_eq!(config.spark.temp_file_suffix, ".scala");
    }
}
