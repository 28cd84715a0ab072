//! Command-line argument parsing

use std::path::PathBuf;

use aerospacer_core::{AccountId, AccountIdError};
use thiserror::Error;

pub const USAGE: &str = "\
usage: aerospacer-cli [--price <usd>] <config.json|-> <command> [args]

commands:
  troves                              ordered ledger snapshot
  liquidatable                        troves below the threshold, batched
  hints <owner> <collateral> <debt>   neighbor hints for an open or update
  redeem <amount>                     redemption estimate for a gross aUSD amount
  stake <owner>                       stability pool position
  watch                               print a snapshot on every refresh

A config path of '-' uses the built-in devnet defaults. The price falls
back to AEROSPACER_PRICE_USD when --price is not given.";

#[derive(Debug, Error, PartialEq)]
pub enum ArgsError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("unexpected argument {0:?}")]
    Unexpected(String),

    #[error("invalid price {0:?}")]
    InvalidPrice(String),

    #[error("invalid owner {value:?}: {source}")]
    InvalidOwner {
        value: String,
        source: AccountIdError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Defaults,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Troves,
    Liquidatable,
    Hints {
        owner: AccountId,
        collateral: String,
        debt: String,
    },
    Redeem {
        amount: String,
    },
    Stake {
        owner: AccountId,
    },
    Watch,
}

impl Command {
    pub fn needs_price(&self) -> bool {
        !matches!(self, Self::Stake { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cli {
    pub config: ConfigSource,
    pub price: Option<f64>,
    pub command: Command,
}

fn parse_owner(value: String) -> Result<AccountId, ArgsError> {
    value
        .parse()
        .map_err(|source| ArgsError::InvalidOwner { value, source })
}

fn parse_price(value: &str) -> Result<f64, ArgsError> {
    match value.parse::<f64>() {
        Ok(p) if p.is_finite() && p > 0.0 => Ok(p),
        _ => Err(ArgsError::InvalidPrice(value.to_string())),
    }
}

/// Parse arguments, excluding the program name
pub fn parse_args<I>(args: I) -> Result<Cli, ArgsError>
where
    I: IntoIterator<Item = String>,
{
    let mut price = None;
    let mut positional = Vec::new();

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        if arg == "--price" {
            let value = iter.next().ok_or(ArgsError::Missing("--price value"))?;
            price = Some(parse_price(&value)?);
        } else if let Some(value) = arg.strip_prefix("--price=") {
            price = Some(parse_price(value)?);
        } else {
            positional.push(arg);
        }
    }

    let mut positional = positional.into_iter();
    let config = match positional.next() {
        Some(path) if path == "-" => ConfigSource::Defaults,
        Some(path) => ConfigSource::File(PathBuf::from(path)),
        None => return Err(ArgsError::Missing("config path")),
    };

    let name = positional.next().ok_or(ArgsError::Missing("command"))?;
    let command = match name.as_str() {
        "troves" => Command::Troves,
        "liquidatable" => Command::Liquidatable,
        "watch" => Command::Watch,
        "hints" => Command::Hints {
            owner: parse_owner(positional.next().ok_or(ArgsError::Missing("owner"))?)?,
            collateral: positional.next().ok_or(ArgsError::Missing("collateral"))?,
            debt: positional.next().ok_or(ArgsError::Missing("debt"))?,
        },
        "redeem" => Command::Redeem {
            amount: positional.next().ok_or(ArgsError::Missing("amount"))?,
        },
        "stake" => Command::Stake {
            owner: parse_owner(positional.next().ok_or(ArgsError::Missing("owner"))?)?,
        },
        _ => return Err(ArgsError::UnknownCommand(name)),
    };

    if let Some(extra) = positional.next() {
        return Err(ArgsError::Unexpected(extra));
    }

    Ok(Cli {
        config,
        price,
        command,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: &str = "HQbV7SKnWuWPHEci5eejsnJG7qwYuQkGzJHJ6nhLZhxk";

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_simple_command() {
        let cli = parse_args(args(&["config.json", "troves"])).unwrap();
        assert_eq!(cli.config, ConfigSource::File(PathBuf::from("config.json")));
        assert_eq!(cli.command, Command::Troves);
        assert_eq!(cli.price, None);
    }

    #[test]
    fn test_price_flag_anywhere() {
        let cli = parse_args(args(&["-", "liquidatable", "--price", "150.5"])).unwrap();
        assert_eq!(cli.config, ConfigSource::Defaults);
        assert_eq!(cli.price, Some(150.5));

        let cli = parse_args(args(&["--price=2", "-", "watch"])).unwrap();
        assert_eq!(cli.price, Some(2.0));
        assert_eq!(cli.command, Command::Watch);
    }

    #[test]
    fn test_hints_arguments() {
        let cli = parse_args(args(&["-", "hints", OWNER, "1.5", "10"])).unwrap();
        match cli.command {
            Command::Hints {
                owner,
                collateral,
                debt,
            } => {
                assert_eq!(owner.to_string(), OWNER);
                assert_eq!(collateral, "1.5");
                assert_eq!(debt, "10");
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_stake_needs_no_price() {
        let cli = parse_args(args(&["-", "stake", OWNER])).unwrap();
        assert!(!cli.command.needs_price());
        assert!(Command::Troves.needs_price());
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_args(args(&[])), Err(ArgsError::Missing("config path")));
        assert_eq!(parse_args(args(&["-"])), Err(ArgsError::Missing("command")));
        assert_eq!(
            parse_args(args(&["-", "mint"])),
            Err(ArgsError::UnknownCommand("mint".to_string()))
        );
        assert_eq!(
            parse_args(args(&["-", "troves", "extra"])),
            Err(ArgsError::Unexpected("extra".to_string()))
        );
        assert_eq!(
            parse_args(args(&["-", "troves", "--price", "-1"])),
            Err(ArgsError::InvalidPrice("-1".to_string()))
        );
        assert!(matches!(
            parse_args(args(&["-", "stake", "not-base58!"])),
            Err(ArgsError::InvalidOwner { .. })
        ));
    }
}
