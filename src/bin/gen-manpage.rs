//! Man page generator
//!
//! Writes `lps25hb.1` plus one `lps25hb-<command>.1` page per subcommand.
//!
//! Usage: cargo run --bin gen-manpage -- [output-dir]

use clap::CommandFactory;
use std::fs;
use std::path::{Path, PathBuf};

#[path = "../cli.rs"]
mod cli;

/// Render `cmd` to `<dir>/<page>.1`
fn write_page(dir: &Path, page: &str, man: clap_mangen::Man) -> std::io::Result<PathBuf> {
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    let path = dir.join(format!("{}.1", page));
    fs::write(&path, buffer)?;
    Ok(path)
}

/// Render the main page and every subcommand page into `output_dir`
fn generate(output_dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;

    let cmd = cli::Cli::command();
    let name = cmd.get_name().to_string();

    let mut pages = vec![write_page(
        output_dir,
        &name,
        clap_mangen::Man::new(cmd.clone()),
    )?];

    for sub in cmd.get_subcommands().filter(|s| s.get_name() != "help") {
        let page = format!("{}-{}", name, sub.get_name());
        let man = clap_mangen::Man::new(sub.clone()).title(page.to_uppercase());
        pages.push(write_page(output_dir, &page, man)?);
    }
    Ok(pages)
}

fn main() -> std::io::Result<()> {
    let output_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("man"));

    let pages = generate(&output_dir)?;
    for page in &pages {
        println!("Generated {}", page.display());
    }
    println!("\nView with: man -l {}", pages[0].display());

    Ok(())
}
