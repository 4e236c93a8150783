use anyhow::{Context, Result};
use clap::{Arg, ArgAction, CommandFactory, FromArgMatches, Parser};
use hostpick::cache::{self, CacheUpdate, CacheWrite};
use hostpick::config::{self, Config, ConfigError, Proxy};
use hostpick::tsh::Tsh;
use hostpick::wizard::{self, DialoguerPrompter};
use hostpick::{logging, ui};
use std::path::Path;

const EXAMPLES: &str = "\
Examples:
  hostpick -c --add         Set up a proxy environment
  hostpick -c --edit        Edit the whole configuration
  hostpick staging          Pick a node of the staging environment
  hostpick staging --edit   Edit the staging proxy configuration
  hostpick prod -a          Append the latest nodes to the prod cache
  hostpick prod -r          Replace the prod cache with the latest nodes";

const ABOUT: &str = "Pick a Teleport node from a cached list and ssh into it";

#[derive(Parser, Debug)]
#[command(name = "hostpick", version, disable_version_flag = true)]
#[command(about = ABOUT)]
#[command(after_help = EXAMPLES)]
struct Cli {
    /// Proxy environment to connect through
    env: Option<String>,

    /// Replace the node cache with the list from the proxy
    #[arg(short, long)]
    refresh: bool,

    /// Append the fresh node list to the cache
    #[arg(short, long)]
    append: bool,

    /// Show the configuration
    #[arg(short, long)]
    config: bool,

    /// Add a proxy configuration (with --config)
    #[arg(long)]
    add: bool,

    /// Edit the whole configuration, or the proxy of ENV
    #[arg(short, long)]
    edit: bool,
}

/// The CLI with `-v/--version` and the config directory in the long help.
fn cli_command(dir: &Path) -> clap::Command {
    Cli::command()
        .long_about(format!("{ABOUT}\n\nConfig files are inside {}", dir.display()))
        .arg(
            Arg::new("version")
                .short('v')
                .long("version")
                .action(ArgAction::Version)
                .help("Print version"),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let dir = config::config_dir()?;
    let mut command = cli_command(&dir);
    let cli = Cli::from_arg_matches(&command.get_matches_mut()).unwrap_or_else(|err| err.exit());
    if let Err(err) = logging::init(&dir) {
        eprintln!("{err:#}");
    }
    ui::install_panic_hook();

    let config_path = config::config_path(&dir);
    let mut config = config::load(&config_path)?;

    if cli.config {
        return config_command(&cli, &dir, &config_path, &mut config);
    }

    let Some(env) = cli.env.as_deref() else {
        command.print_long_help()?;
        return Ok(());
    };

    let proxy = match config.find_proxy(env) {
        Ok(proxy) => proxy.clone(),
        Err(err) if matches!(err.downcast_ref::<ConfigError>(), Some(ConfigError::EnvNotFound(_))) => {
            eprintln!("Env {env} not found\n");
            command.print_long_help()?;
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    if cli.edit {
        return edit_proxy(&dir, &config_path, &config, env);
    }

    let (hosts, cache_write) = load_hosts(&cli, &dir, &proxy).await?;
    let ui_config = config.ui.clone();
    let host = tokio::task::block_in_place(|| ui::select_host(hosts, &ui_config))?;

    if host.is_empty() {
        eprintln!("Pick at least one host to login");
    } else {
        Tsh::new(&proxy).ssh(&config.ssh_user, &host).await?;
    }

    if let Some(write) = cache_write {
        cache::finish(write).await;
    }
    Ok(())
}

/// Hostnames to pick from, plus the cache write started when the list was
/// fetched fresh. The write is not awaited before the picker runs.
async fn load_hosts(cli: &Cli, dir: &Path, proxy: &Proxy) -> Result<(Vec<String>, Option<CacheWrite>)> {
    let path = config::nodes_path(dir, &proxy.env);
    let mode = if cli.append {
        CacheUpdate::Append
    } else if cli.refresh {
        CacheUpdate::Replace
    } else {
        return Ok((cache::cached_hosts(&path, &proxy.env)?, None));
    };

    let fresh = Tsh::new(proxy).list_nodes().await.context("Failed to get nodes")?;
    let (hosts, write) = cache::update(path, &proxy.env, mode, fresh)?;
    Ok((hosts, Some(write)))
}

fn config_command(cli: &Cli, dir: &Path, path: &Path, config: &mut Config) -> Result<()> {
    let mut prompter = DialoguerPrompter::new();

    if cli.edit {
        let initial = config.to_toml_string()?;
        let current = config.clone();
        let edited = wizard::edit_until_valid(
            initial,
            &mut prompter,
            |text| config::edit_text(dir, text),
            |text| config::apply_edit_all(&current, text),
        )?;
        match edited {
            Some(new_config) => {
                config::save(path, &new_config)?;
                println!("Success to edit config");
            }
            None => println!("Config unchanged"),
        }
        return Ok(());
    }

    if cli.add {
        println!("Config will be saved to {}", path.display());
        let proxy = wizard::run_proxy_setup(config, &mut prompter)?;
        let env = proxy.env.clone();
        config.add_proxy(proxy)?;
        config::save(path, config).context("Unable to save config")?;
        println!("{env} has been added");
        return Ok(());
    }

    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn edit_proxy(dir: &Path, path: &Path, config: &Config, env: &str) -> Result<()> {
    let initial = config::proxy_to_toml_string(config.find_proxy(env)?)?;
    let mut prompter = DialoguerPrompter::new();
    let edited = wizard::edit_until_valid(
        initial,
        &mut prompter,
        |text| config::edit_text(dir, text),
        |text| config::apply_edit_proxy(config, env, text),
    )?;
    match edited {
        Some(new_config) => {
            config::save(path, &new_config)?;
            println!("{env} has updated successfully");
        }
        None => println!("{env} unchanged"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
        cli_command(Path::new("/home/me/.config/hostpick")).debug_assert();
    }

    #[test]
    fn version_is_lowercase_v() {
        let err = cli_command(Path::new("/tmp")).try_get_matches_from(["hostpick", "-v"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        let err = cli_command(Path::new("/tmp")).try_get_matches_from(["hostpick", "-V"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn long_help_names_config_dir() {
        let help = cli_command(Path::new("/home/me/.config/hostpick")).render_long_help().to_string();
        assert!(help.contains("Config files are inside /home/me/.config/hostpick"));
    }

    #[test]
    fn parses_env_and_flags() {
        let cli = Cli::try_parse_from(["hostpick", "prod", "-a"]).unwrap();
        assert_eq!(cli.env.as_deref(), Some("prod"));
        assert!(cli.append && !cli.refresh && !cli.config);

        let cli = Cli::try_parse_from(["hostpick", "-c", "--add"]).unwrap();
        assert!(cli.config && cli.add && cli.env.is_none());

        let cli = Cli::try_parse_from(["hostpick", "staging", "-e"]).unwrap();
        assert!(cli.edit);
    }
}
