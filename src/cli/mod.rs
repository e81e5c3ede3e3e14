//! CLI module - Command-line interface for My Meta Maps
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// My Meta Maps - comments and ratings for geodata services
#[derive(Parser)]
#[command(name = "metamaps")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP API server
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Import a geodata service without commenting on it
    Import {
        /// Service URL, with or without GetCapabilities parameters
        url: String,
        /// Service type code (wms, wfs, wcs, wmts)
        #[arg(short, long, default_value = "wms")]
        datatype: String,
    },

    /// List stored geodata
    #[command(alias = "ls")]
    List,

    /// List supported service types
    Services,
}

pub use commands::*;
