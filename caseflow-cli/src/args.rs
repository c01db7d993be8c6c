//! Command-line arguments for the caseflow runner.
//!
//! Runner flags are declared with `clap` derive; the flags each test file
//! and the framework declare are appended to `--help` at run time, since
//! they only exist once the registry is built.

use anyhow::Context;
use caseflow::context::ArgMap;
use caseflow::hooks::FrameworkHooks;
use caseflow::registry::{ArgSpec, FileRegistry};
use clap::Parser;
use std::path::PathBuf;

/// The main CLI argument structure.
#[derive(Debug, Parser)]
#[command(
    name = "caseflow",
    version,
    about = "Staged test-execution harness: runs registered test files through layered setup/cleanup hooks."
)]
pub struct RunnerArgs {
    /// Test case files or directories; a directory selects every
    /// registered file beneath it.
    pub paths: Vec<PathBuf>,

    /// Log directory (default logs/<current-timestamp>).
    #[arg(short = 'd', long = "logdir", value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Print test case names and exit.
    #[arg(short, long)]
    pub list: bool,

    /// key=value arguments forwarded to the framework and to the test
    /// files that declare the key.
    #[arg(short = 'a', long = "arg", value_name = "KEY=VALUE")]
    pub args: Vec<String>,
}

/// Parses repeated `key=value` pairs into the shared argument map.
pub fn parse_arg_pairs(pairs: &[String]) -> anyhow::Result<ArgMap> {
    let mut map = ArgMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("argument '{pair}' is not of the form key=value"))?;
        map.insert(key, serde_json::Value::String(value.to_string()));
    }
    Ok(map)
}

/// Renders the framework and per-file flag declarations for `--help`.
pub fn render_flag_help(registry: &FileRegistry, framework: &FrameworkHooks) -> String {
    let mut out = String::new();

    if !framework.arg_specs.is_empty() {
        out.push_str("Parameters of Framework:\n");
        render_specs(&mut out, &framework.arg_specs);
    }
    for file in registry.files() {
        if file.arg_specs().is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!(
            "Parameters of Test Case {}:\n",
            file.path().display()
        ));
        render_specs(&mut out, file.arg_specs());
    }
    out
}

fn render_specs(out: &mut String, specs: &[ArgSpec]) {
    let width = specs.iter().map(|s| s.name.len()).max().unwrap_or(0);
    for spec in specs {
        out.push_str(&format!(
            "  --{name:<width$}  {help}\n",
            name = spec.name,
            help = spec.help
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arg_pairs() {
        let map = parse_arg_pairs(&["num=5".to_string(), "topology=mesh".to_string()]).unwrap();
        assert_eq!(map.get_str("num"), Some("5"));
        assert_eq!(map.get_str("topology"), Some("mesh"));
    }

    #[test]
    fn test_parse_arg_pairs_rejects_bare_keys() {
        assert!(parse_arg_pairs(&["num".to_string()]).is_err());
    }

    #[test]
    fn test_flag_help_lists_framework_and_files() {
        let framework = FrameworkHooks::new().with_flag("topology", "Framework level topology");
        let mut registry = FileRegistry::new();
        registry
            .register(
                caseflow::registry::TestFileBuilder::new("tests/feature1")
                    .flag("num", "Number of requests")
                    .build(),
            )
            .unwrap();

        let help = render_flag_help(&registry, &framework);
        assert!(help.contains("Parameters of Framework:"));
        assert!(help.contains("--topology"));
        assert!(help.contains("tests/feature1"));
        assert!(help.contains("Number of requests"));
    }
}
