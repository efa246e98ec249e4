use {
    anyhow::{Context, Result},
    clap::Subcommand,
    tether_config::TetherConfig,
    tether_sessions::SessionClient,
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration as TOML.
    Show,
    /// Print the config file location.
    Path,
    /// Write a default config file.
    Init,
    /// Persist a new session service base URL.
    SetBase {
        /// Root URL of the session service.
        url: String,
    },
}

pub fn handle_config(action: ConfigAction, config: &TetherConfig) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let rendered = toml::to_string_pretty(config).context("serialize config")?;
            print!("{rendered}");
        },
        ConfigAction::Path => {
            println!("{}", tether_config::find_or_default_config_path().display());
        },
        ConfigAction::Init => {
            let path = tether_config::init_config()?;
            println!("wrote {}", path.display());
        },
        ConfigAction::SetBase { url } => {
            SessionClient::new(&url)?;
            let mut updated = config.clone();
            updated.session.base_url = url;
            let path = tether_config::save_config(&updated)?;
            println!("saved {}", path.display());
        },
    }
    Ok(())
}
