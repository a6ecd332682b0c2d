//! Clean command implementation.

use crate::cli::CleanArgs;
use crate::commands::utils;
use crate::config::{ConfigOverrides, SiteConfig};
use crate::error::Result;
use crate::ui;

/// Execute the clean command.
///
/// Page validation is skipped: a broken config should not stop cleaning.
pub async fn execute(args: CleanArgs) -> Result<()> {
    let cwd = utils::get_cwd()?;
    let (config, _) = SiteConfig::load(&ConfigOverrides::default(), args.config.as_deref(), &cwd)?;
    let out_dir = config.paths.output_dir.display().to_string();

    if utils::remove_output_dir(&config, &cwd)? {
        ui::success(&format!("Removed {}", out_dir));
    } else {
        ui::info(&format!("Nothing to clean: {} does not exist", out_dir));
    }
    Ok(())
}
