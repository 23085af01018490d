//! Renders the stevedore(1) manual pages into `OUT_DIR`.
//!
//! One page covers the top-level command and one more is written per
//! subcommand (`stevedore-apply.1` and so on), all from the clap definitions
//! in `src/cli/mod.rs`.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_mangen::Man;

#[path = "src/cli/mod.rs"]
mod cli;

use cli::Cli;

fn render(man: &Man, target: &Path) -> io::Result<()> {
    let mut page = Vec::new();
    man.render(&mut page)?;
    fs::write(target, page)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut stdout = io::stdout();
    writeln!(stdout, "cargo:rerun-if-changed=build.rs")?;
    writeln!(stdout, "cargo:rerun-if-changed=src/cli/mod.rs")?;

    let out_dir = env::var_os("OUT_DIR")
        .map(PathBuf::from)
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "OUT_DIR is unset"))?;

    let command = Cli::command();
    for sub in command.get_subcommands() {
        let page = format!("stevedore-{}", sub.get_name());
        render(
            &Man::new(sub.clone()).title(page.to_uppercase()),
            &out_dir.join(format!("{page}.1")),
        )?;
    }
    render(&Man::new(command), &out_dir.join("stevedore.1"))?;

    Ok(())
}
