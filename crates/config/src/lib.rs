//! Configuration: schema, discovery and loading of `tether.{toml,yaml,yml,json}`.

pub mod env_subst;
pub mod loader;
pub mod schema;

pub use {
    loader::{
        BASE_URL_ENV, apply_env_overrides, clear_config_dir, config_dir, discover_and_load,
        find_or_default_config_path, init_config, load_config, save_config, set_config_dir,
    },
    schema::{SessionConfig, TetherConfig},
};
