//! Patch command - record local edits as changes against the upstream

use chartfork_core::paths::GENERATED_CHANGES_DIR;
use console::style;
use std::path::Path;

use super::selected_packages;
use crate::error::Result;

pub fn run(root: &Path, package: Option<&str>) -> Result<()> {
    for package in selected_packages(root, package)? {
        println!("{} Generating patches for {}", style("→").blue(), style(&package.name).bold());
        package.generate_patch(root)?;
        println!(
            "  {} Changes written to {}",
            style("✓").green(),
            package.path.join(GENERATED_CHANGES_DIR).display()
        );
    }

    Ok(())
}
