// CLI module for argument parsing, configuration and the line-command driver

use crate::config::UserConfig;
use crate::domain::CandidateFilter;
use crate::preview::ThumbnailSize;
use crate::session::SessionOptions;
use clap::{ArgAction, Parser};
use std::path::PathBuf;
use std::time::Duration;

/// Shotswp - screenshot triage from the terminal
///
/// Go through your screenshots one by one: keep what matters, queue the rest,
/// then delete the whole queue in one go.
#[derive(Parser, Debug, Clone)]
#[command(name = "shotswp")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding the photo library
    ///
    /// Falls back to `library_dir` from the config file, then to the current directory.
    pub directory: Option<PathBuf>,

    /// Maximum number of candidates to load
    #[arg(short = 'l', long = "limit")]
    pub limit: Option<usize>,

    /// Offer every image, not only screenshots
    #[arg(short = 'a', long = "all-images", action = ArgAction::SetTrue)]
    pub all_images: bool,

    /// Dry run mode - nothing is moved to the trash
    #[arg(short = 'n', long = "dry-run", action = ArgAction::SetTrue)]
    pub dry_run: bool,

    /// Print the candidates and exit
    #[arg(long = "list", action = ArgAction::SetTrue)]
    pub list: bool,

    /// Do not ask for confirmation before cleaning
    #[arg(short = 'y', long = "yes", action = ArgAction::SetTrue)]
    pub yes: bool,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", action = ArgAction::SetTrue)]
    pub verbose: bool,
}

impl Args {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Args::parse()
    }

    /// Validate the arguments and return any errors
    pub fn validate(&self) -> Result<(), String> {
        if let Some(ref dir) = self.directory {
            if !dir.exists() {
                return Err(format!("Directory does not exist: {}", dir.display()));
            }
            if !dir.is_dir() {
                return Err(format!("Path is not a directory: {}", dir.display()));
            }
        }

        if self.limit == Some(0) {
            return Err("--limit must be at least 1".to_string());
        }

        Ok(())
    }
}

/// Configuration derived from CLI arguments layered over the user config
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub directory: PathBuf,
    pub filter: CandidateFilter,
    pub candidate_limit: usize,
    pub dry_run: bool,
    pub list_only: bool,
    pub skip_confirm: bool,
    pub verbose: bool,
    pub thumbnail_size: u32,
    pub thumbnail_wait: Duration,
    pub thumbnail_cache_size: usize,
    pub screenshot_patterns: Vec<String>,
}

impl AppConfig {
    pub fn from_args(args: Args, user: &UserConfig) -> Self {
        AppConfig {
            directory: args
                .directory
                .or_else(|| user.library_dir.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            filter: if args.all_images {
                CandidateFilter::AllImages
            } else {
                CandidateFilter::Screenshots
            },
            candidate_limit: args.limit.unwrap_or(user.candidate_limit),
            dry_run: args.dry_run,
            list_only: args.list,
            skip_confirm: args.yes,
            verbose: args.verbose,
            thumbnail_size: user.thumbnail_size,
            thumbnail_wait: user.thumbnail_wait(),
            thumbnail_cache_size: user.thumbnail_cache_size,
            screenshot_patterns: user.screenshot_patterns.clone(),
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            filter: self.filter,
            candidate_limit: self.candidate_limit,
            thumbnail_size: ThumbnailSize::square(self.thumbnail_size),
            thumbnail_wait: self.thumbnail_wait,
            thumbnail_cache_size: self.thumbnail_cache_size,
        }
    }
}

/// A line typed at the triage prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Keep,
    Delete,
    /// Remove the n-th queued item (1-based, as listed)
    Unqueue(usize),
    ShowQueue,
    /// Empty the queue without deleting anything
    ClearQueue,
    Clean,
    Help,
    Exit,
    Unknown(String),
}

/// Maps a prompt line to a command
pub fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let head = parts.next().unwrap_or("").to_lowercase();

    match head.as_str() {
        "k" | "keep" | "right" => Command::Keep,
        "d" | "delete" | "left" => Command::Delete,
        "u" | "unqueue" => match parts.next().and_then(|n| n.parse::<usize>().ok()) {
            Some(n) if n > 0 => Command::Unqueue(n),
            _ => Command::Unknown(line.to_string()),
        },
        "q" | "queue" => Command::ShowQueue,
        "clear" => Command::ClearQueue,
        "c" | "clean" => Command::Clean,
        "?" | "h" | "help" => Command::Help,
        "x" | "exit" | "quit" => Command::Exit,
        _ => Command::Unknown(line.to_string()),
    }
}

/// Maps a confirmation answer; anything but yes is a no
pub fn is_confirmation(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
}

pub const HELP_TEXT: &str = "\
  k, keep        keep this screenshot
  d, delete      queue this screenshot for deletion
  q, queue       show the deletion queue
  u <n>          remove item n from the queue
  clear          empty the queue
  c, clean       delete everything in the queue
  x, exit        quit without deleting
  ?, help        show this help";

/// Formats a byte count for display (e.g. "1.5 MB")
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args {
            directory: None,
            limit: None,
            all_images: false,
            dry_run: false,
            list: false,
            yes: false,
            verbose: false,
        }
    }

    mod args_tests {
        use super::*;

        #[test]
        fn test_args_parse_flags() {
            let args = Args::try_parse_from([
                "shotswp",
                "/photos",
                "--limit",
                "20",
                "--all-images",
                "-n",
                "-y",
            ])
            .unwrap();

            assert_eq!(args.directory, Some(PathBuf::from("/photos")));
            assert_eq!(args.limit, Some(20));
            assert!(args.all_images);
            assert!(args.dry_run);
            assert!(args.yes);
            assert!(!args.list);
        }

        #[test]
        fn test_args_validate_nonexistent_directory() {
            let args = Args {
                directory: Some(PathBuf::from("/nonexistent/path/12345")),
                ..args()
            };

            let result = args.validate();
            assert!(result.unwrap_err().contains("does not exist"));
        }

        #[test]
        fn test_args_validate_zero_limit() {
            let args = Args {
                limit: Some(0),
                ..args()
            };
            assert!(args.validate().is_err());
        }

        #[test]
        fn test_args_validate_success() {
            let args = Args {
                directory: Some(PathBuf::from(".")),
                limit: Some(5),
                ..args()
            };
            assert!(args.validate().is_ok());
        }
    }

    mod config_tests {
        use super::*;

        #[test]
        fn test_app_config_defaults_from_user_config() {
            let config = AppConfig::from_args(args(), &UserConfig::default());

            assert_eq!(config.directory, PathBuf::from("."));
            assert_eq!(config.filter, CandidateFilter::Screenshots);
            assert_eq!(config.candidate_limit, 300);
            assert_eq!(config.thumbnail_wait, Duration::from_millis(250));
            assert!(!config.dry_run);
        }

        #[test]
        fn test_app_config_args_override_user_config() {
            let user = UserConfig {
                library_dir: Some(PathBuf::from("/configured")),
                candidate_limit: 100,
                ..UserConfig::default()
            };
            let args = Args {
                directory: Some(PathBuf::from("/given")),
                limit: Some(7),
                all_images: true,
                ..args()
            };

            let config = AppConfig::from_args(args, &user);

            assert_eq!(config.directory, PathBuf::from("/given"));
            assert_eq!(config.candidate_limit, 7);
            assert_eq!(config.filter, CandidateFilter::AllImages);
        }

        #[test]
        fn test_app_config_uses_configured_library() {
            let user = UserConfig {
                library_dir: Some(PathBuf::from("/configured")),
                ..UserConfig::default()
            };
            let config = AppConfig::from_args(args(), &user);
            assert_eq!(config.directory, PathBuf::from("/configured"));
        }

        #[test]
        fn test_session_options() {
            let mut config = AppConfig::from_args(args(), &UserConfig::default());
            config.thumbnail_size = 320;

            let options = config.session_options();
            assert_eq!(options.thumbnail_size, ThumbnailSize::square(320));
            assert_eq!(options.candidate_limit, 300);
        }
    }

    mod command_tests {
        use super::*;

        #[test]
        fn test_parse_keep_and_delete() {
            assert_eq!(parse_command("k"), Command::Keep);
            assert_eq!(parse_command("  KEEP "), Command::Keep);
            assert_eq!(parse_command("right"), Command::Keep);
            assert_eq!(parse_command("d"), Command::Delete);
            assert_eq!(parse_command("left"), Command::Delete);
        }

        #[test]
        fn test_parse_unqueue() {
            assert_eq!(parse_command("u 2"), Command::Unqueue(2));
            assert_eq!(parse_command("u 0"), Command::Unknown("u 0".to_string()));
            assert_eq!(parse_command("u"), Command::Unknown("u".to_string()));
            assert_eq!(parse_command("u x"), Command::Unknown("u x".to_string()));
        }

        #[test]
        fn test_parse_other_commands() {
            assert_eq!(parse_command("q"), Command::ShowQueue);
            assert_eq!(parse_command("clear"), Command::ClearQueue);
            assert_eq!(parse_command("c"), Command::Clean);
            assert_eq!(parse_command("?"), Command::Help);
            assert_eq!(parse_command("x"), Command::Exit);
            assert_eq!(parse_command(""), Command::Unknown(String::new()));
            assert_eq!(parse_command("zz"), Command::Unknown("zz".to_string()));
        }

        #[test]
        fn test_is_confirmation() {
            assert!(is_confirmation("y"));
            assert!(is_confirmation("YES\n"));
            assert!(!is_confirmation("n"));
            assert!(!is_confirmation(""));
        }
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1536), "1.5 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
