//! Config file bootstrap

use std::path::Path;

use crate::config::Config;

pub fn cmd_init_config(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (pass --force to overwrite)",
            path.display()
        );
    }

    Config::default().save_to_path(path)?;
    println!("Wrote default config to {}", path.display());
    println!("Set {} before serving.", crate::config::ENV_TOKEN_SECRET);
    Ok(())
}
