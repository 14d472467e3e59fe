//! List command - list the packages of a repository

use chartfork_charts::list_packages;
use std::path::Path;

use crate::error::Result;

pub fn run(root: &Path) -> Result<()> {
    for name in list_packages(root)? {
        println!("{}", name);
    }
    Ok(())
}
