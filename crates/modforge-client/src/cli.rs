use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "modforge", version, about = "modforge - mod objects and level tooling")]
pub struct CliArgs {
    /// Path to the mod root (overrides modforge.yaml)
    #[arg(long, global = true)]
    pub mod_dir: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List object definitions in objects.json
    Objects,
    /// List levels under levels/
    Levels,
    /// Validate a level and print every violation
    Validate {
        /// Level name (file stem under levels/)
        level: String,
    },
    /// Spawn a level and run its scripts
    Load {
        /// Level name (defaults to default_level from modforge.yaml)
        level: Option<String>,
        /// Number of Update ticks to run after Ready
        #[arg(long, default_value_t = 60)]
        ticks: u32,
    },
    /// Write a new level seeded with one object at the origin
    New {
        /// Level id, also the file name
        id: String,
        /// Object definition id to place
        #[arg(long)]
        object: String,
        /// Display name of the level
        #[arg(long)]
        name: Option<String>,
    },
}
