//! hasslc
//!
//! Compiles a directory of serialized HASSL modules into Home Assistant
//! package files and a merged `helpers.yaml`.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches, Command};
use hassl_codegen::generate;
use hassl_config::{ModuleLoader, PackageWriter, ProjectConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("hasslc")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Compile HASSL modules into Home Assistant packages")
        .arg(
            Arg::new("source")
                .help("Directory holding the module files and optional hassl.yaml")
                .required(true)
                .index(1)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("out")
                .help("Output directory, overriding hassl.yaml")
                .short('o')
                .long("out")
                .value_name("DIR")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .help("Log at debug level unless RUST_LOG is set")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue),
        )
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();
}

fn run(matches: &ArgMatches) -> Result<()> {
    let source = matches
        .get_one::<PathBuf>("source")
        .context("missing source directory")?;

    let config = ProjectConfig::load(source)
        .with_context(|| format!("failed to load project file in {}", source.display()))?;
    let output_dir = match matches.get_one::<PathBuf>("out") {
        Some(dir) => dir.clone(),
        None => config.output_dir_in(source),
    };

    let programs = ModuleLoader::new(source)?.load_all()?;
    info!(modules = programs.len(), "Loaded modules from {}", source.display());

    let (modules, _exports) =
        hassl_semantics::build(&programs).context("semantic analysis failed")?;
    let docs: Vec<_> = modules
        .iter()
        .map(|module| generate(module, &config.codegen))
        .collect();

    let writer = PackageWriter::new(&output_dir)?;
    let written = writer.write_all(&docs)?;
    for path in &written {
        info!("Wrote {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("verbose"));
    run(&matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_definition() {
        cli().debug_assert();
    }

    #[test]
    fn test_arguments() {
        let matches = cli()
            .try_get_matches_from(["hasslc", "modules", "--out", "dist", "-v"])
            .unwrap();
        assert_eq!(
            matches.get_one::<PathBuf>("source"),
            Some(&PathBuf::from("modules"))
        );
        assert_eq!(matches.get_one::<PathBuf>("out"), Some(&PathBuf::from("dist")));
        assert!(matches.get_flag("verbose"));
    }

    #[test]
    fn test_run_writes_packages() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("home.yaml"),
            r#"
package: home
statements:
  - kind: sync
    name: ksync
    sync_kind: onoff
    members: [light.kitchen, light.pantry]
"#,
        )
        .unwrap();
        let out = dir.path().join("dist");
        let source = dir.path().to_string_lossy().to_string();
        let target = out.to_string_lossy().to_string();

        let matches = cli()
            .try_get_matches_from(["hasslc", source.as_str(), "--out", target.as_str()])
            .unwrap();
        run(&matches).unwrap();

        let package = fs::read_to_string(out.join("hassl__home.yaml")).unwrap();
        assert!(package.contains("hassl_sync__home__ksync__onoff__downstream"));
        let helpers = fs::read_to_string(out.join("helpers.yaml")).unwrap();
        assert!(helpers.contains("hassl_sync__home__ksync__onoff"));
    }
}
