//! Command-line interface for the commission desk.

mod commands;

pub use commands::{
    cmd_create_admin, cmd_init_config, cmd_list_users, cmd_referral_create, cmd_referral_delete,
    cmd_referral_list,
};

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Commission desk - referral-gated intake for sourcing requests
#[derive(Parser)]
#[command(name = "commission-desk")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API (default)
    #[command(alias = "daemon")]
    Serve,

    /// Create an admin account, bypassing the referral gate
    CreateAdmin {
        username: String,

        /// Password for the new account
        #[arg(long, env = "COMMISSION_DESK_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Manage referral codes
    Referral {
        #[command(subcommand)]
        command: ReferralCommands,
    },

    /// List user accounts
    #[command(alias = "users")]
    ListUsers,

    /// Write a config file with the default settings
    InitConfig {
        #[arg(default_value = "config.toml")]
        path: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum ReferralCommands {
    /// Create a referral code
    #[command(alias = "add")]
    Create {
        code: String,

        #[arg(long)]
        description: Option<String>,

        /// Maximum number of signups
        #[arg(long)]
        limit: Option<i64>,

        /// RFC3339 instant after which the code is refused
        #[arg(long)]
        expires: Option<String>,
    },

    /// List referral codes with their usage
    #[command(alias = "ls")]
    List,

    /// Delete a referral code by ID
    #[command(alias = "rm")]
    Delete { id: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_referral_create() {
        let cli = Cli::parse_from([
            "commission-desk",
            "referral",
            "create",
            "VIP",
            "--limit",
            "1",
            "--expires",
            "2030-01-01T00:00:00Z",
        ]);
        match cli.command {
            Some(Commands::Referral {
                command:
                    ReferralCommands::Create {
                        code,
                        limit,
                        expires,
                        description,
                    },
            }) => {
                assert_eq!(code, "VIP");
                assert_eq!(limit, Some(1));
                assert_eq!(expires.as_deref(), Some("2030-01-01T00:00:00Z"));
                assert!(description.is_none());
            }
            _ => panic!("expected referral create"),
        }
    }

    #[test]
    fn no_subcommand_means_serve() {
        let cli = Cli::parse_from(["commission-desk"]);
        assert!(cli.command.is_none());
    }
}
