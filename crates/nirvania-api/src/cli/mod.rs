//! CLI command definitions for the `nirv` binary.
//!
//! Uses clap derive macros for argument parsing. Skill operations live under
//! `nirv skill ...`; `nirv tools` lists the tool catalog.

pub mod skill;
pub mod tools;

use clap::{Parser, Subcommand};

/// Run and inspect CRM automation skills.
#[derive(Parser)]
#[command(name = "nirv", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for info, -vv for debug, -vvv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export spans as OpenTelemetry traces on stdout.
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate, run and inspect skills.
    Skill {
        #[command(subcommand)]
        action: skill::SkillCommand,
    },

    /// List the tool catalog.
    Tools,
}
