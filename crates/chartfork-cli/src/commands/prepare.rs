//! Prepare command - pull charts and replay their changes

use console::style;
use std::path::Path;

use super::selected_packages;
use crate::error::Result;

pub fn run(root: &Path, package: Option<&str>) -> Result<()> {
    let packages = selected_packages(root, package)?;
    if packages.is_empty() {
        println!("No packages found under {}", root.display());
        return Ok(());
    }

    for package in &packages {
        println!("{} Preparing {}", style("→").blue(), style(&package.name).bold());
        package.prepare(root)?;
        println!("  {} {} is ready", style("✓").green(), package.chart.working_dir);
        for additional_chart in &package.additional_charts {
            println!("  {} {} is ready", style("✓").green(), additional_chart.working_dir);
        }
    }

    Ok(())
}
