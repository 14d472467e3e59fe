//! Clean command - undo main chart changes and remove working directories

use console::style;
use std::path::Path;

use super::selected_packages;
use crate::error::Result;

pub fn run(root: &Path, package: Option<&str>) -> Result<()> {
    for package in selected_packages(root, package)? {
        package.clean()?;
        println!("{} Cleaned {}", style("✓").green(), package.name);
    }

    Ok(())
}
