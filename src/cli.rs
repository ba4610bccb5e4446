use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::Overrides;

/// Translation engine for Minecraft quest books, mod lang files and mod jars.
#[derive(Debug, Parser)]
#[command(name = "blocklate-core", author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOptions,

    /// Defaults to `serve`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Args)]
pub struct GlobalOptions {
    /// TOML settings file (default: ./blocklate.toml if present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Target language code, e.g. `ru` or `pt-BR`
    #[arg(long, global = true)]
    pub lang: Option<String>,

    /// SQLite translation cache
    #[arg(long, global = true, value_name = "DB")]
    pub cache: Option<String>,

    /// Keep translations in memory only
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Parallel jobs
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

impl GlobalOptions {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            lang: self.lang.clone(),
            cache: self.cache.clone(),
            no_cache: self.no_cache,
            workers: self.workers,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Speak the JSON line protocol on stdin/stdout
    Serve,

    /// Translate an FTB Quests directory into `<dir>-translate`
    Quests { dir: PathBuf },

    /// Translate a lang file, Patchouli page or `.snbt` file
    Lang {
        file: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Translate mod jars into new `<name>_<lang>.jar` archives
    Jars {
        #[arg(required = true)]
        jars: Vec<PathBuf>,

        #[arg(short, long, value_name = "DIR")]
        output: PathBuf,

        /// Translate the strings of all jars in one pass first
        #[arg(long)]
        preload: bool,

        /// Name each output after its source jar
        #[arg(long)]
        replace_original: bool,
    },

    /// Report which jars still need a translation, as JSON
    Analyze {
        #[arg(required = true)]
        jars: Vec<PathBuf>,
    },

    /// Translate strings given on the command line
    Text {
        #[arg(required = true)]
        texts: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_work_after_subcommand() {
        let cli = Cli::try_parse_from(["blocklate-core", "jars", "a.jar", "b.jar", "-o", "out", "--lang", "de", "-vv"])
            .unwrap();
        assert_eq!(cli.global.lang.as_deref(), Some("de"));
        assert_eq!(cli.global.verbose, 2);
        match cli.command {
            Some(Command::Jars {
                jars,
                output,
                preload,
                replace_original,
            }) => {
                assert_eq!(jars.len(), 2);
                assert_eq!(output, PathBuf::from("out"));
                assert!(!preload);
                assert!(!replace_original);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn jar_flags_and_analyze_parse() {
        let cli =
            Cli::try_parse_from(["blocklate-core", "jars", "a.jar", "-o", "mods", "--preload", "--replace-original"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Jars {
                preload: true,
                replace_original: true,
                ..
            })
        ));

        let cli = Cli::try_parse_from(["blocklate-core", "analyze", "a.jar", "b.jar"]).unwrap();
        match cli.command {
            Some(Command::Analyze { jars }) => assert_eq!(jars, vec![PathBuf::from("a.jar"), PathBuf::from("b.jar")]),
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["blocklate-core", "analyze"]).is_err());
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::try_parse_from(["blocklate-core", "--no-cache"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.global.overrides().no_cache);
    }
}
