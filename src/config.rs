//! Configuration module.
//!
//! This module defines the command-line interface (CLI) using `clap`.
//! It handles parsing the input file, the passes to run and where to write the
//! recovered names.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// An analysis pass over the loaded image.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pass {
    /// Name Objective-C method implementations `-[Class selector]`
    ObjcMethods,
    /// Name selector reference slots `selRef_Selector`
    Selrefs,
    /// Define symbols for dyld bind entries
    Bind,
}

/// Recovers symbol names for a Mach-O binary.
///
/// Names come from Objective-C class metadata, the selector reference table and
/// dyld bind information. The resulting address to name map is printed one
/// entry per line.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Mach-O file to analyze
    pub input: PathBuf,

    /// Passes to run, in order
    #[arg(short, long = "pass", value_enum, default_values_t = [Pass::ObjcMethods])]
    pub passes: Vec<Pass>,

    /// Captured `dyldinfo -bind` output to use instead of running dyldinfo
    #[arg(long, value_name = "FILE")]
    pub bind_listing: Option<PathBuf>,

    /// Output file
    #[arg(short, long, help = "Write the name map here instead of stdout")]
    pub output: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", help = "Set the logging level")]
    pub log_level: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objc_methods_is_the_default_pass() {
        let config = Config::try_parse_from(["machsym", "App"]).unwrap();
        assert_eq!(config.input, PathBuf::from("App"));
        assert_eq!(config.passes, vec![Pass::ObjcMethods]);
        assert_eq!(config.log_level, "info");
        assert!(config.output.is_none());
    }

    #[test]
    fn passes_run_in_the_order_given() {
        let config = Config::try_parse_from([
            "machsym",
            "App",
            "-p",
            "selrefs",
            "--pass",
            "bind",
            "-p",
            "objc-methods",
            "--bind-listing",
            "bind.txt",
            "-o",
            "names.txt",
        ])
        .unwrap();
        assert_eq!(config.passes, vec![Pass::Selrefs, Pass::Bind, Pass::ObjcMethods]);
        assert_eq!(config.bind_listing, Some(PathBuf::from("bind.txt")));
        assert_eq!(config.output, Some(PathBuf::from("names.txt")));
    }

    #[test]
    fn unknown_pass_is_rejected() {
        assert!(Config::try_parse_from(["machsym", "App", "-p", "categories"]).is_err());
    }
}
