//! Charts command - export prepared charts into assets/ and charts/

use console::style;
use std::path::Path;

use super::selected_packages;
use crate::error::Result;

pub fn run(root: &Path, package: Option<&str>) -> Result<()> {
    let mut total = 0;
    for package in selected_packages(root, package)? {
        if package.do_not_release {
            println!("{} Skipping {} (doNotRelease)", style("⚠").yellow(), package.name);
            continue;
        }

        println!("{} Exporting {}", style("→").blue(), style(&package.name).bold());
        for exported in package.generate_charts(root)? {
            let archive = exported.archive.strip_prefix(root).unwrap_or(&exported.archive);
            println!(
                "  {} {} {} → {}",
                style("✓").green(),
                exported.name,
                style(&exported.version).cyan(),
                archive.display()
            );
            total += 1;
        }
    }

    println!("Exported {} chart(s)", total);
    Ok(())
}
