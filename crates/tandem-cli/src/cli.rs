use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "tandem",
    about = "Tandem: two peer nodes sharing content-addressed blocks",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP gateway
    Serve(ServeArgs),
    /// Run the publish-and-fetch scenario in-process
    Demo(DemoArgs),
    /// Print the content identifier for a piece of text
    Cid(CidArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long, env = "TANDEM_CONFIG")]
    pub config: Option<PathBuf>,
    /// Address to bind, overriding the config file and PORT
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct DemoArgs {
    #[arg(long, default_value = "Hello World 101")]
    pub text: String,
}

#[derive(Args)]
pub struct CidArgs {
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve_defaults() {
        let cli = Cli::try_parse_from(["tandem", "serve"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert!(args.bind.is_none());
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_serve_with_flags() {
        let cli = Cli::try_parse_from([
            "tandem",
            "serve",
            "--config",
            "tandem.toml",
            "--bind",
            "0.0.0.0:8080",
        ])
        .unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.config, Some(PathBuf::from("tandem.toml")));
            assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn bad_bind_address_is_rejected() {
        assert!(Cli::try_parse_from(["tandem", "serve", "--bind", "nowhere"]).is_err());
    }

    #[test]
    fn parse_demo() {
        let cli = Cli::try_parse_from(["tandem", "demo"]).unwrap();
        if let Command::Demo(args) = cli.command {
            assert_eq!(args.text, "Hello World 101");
        } else {
            panic!("wrong command");
        }
        let cli = Cli::try_parse_from(["tandem", "demo", "--text", "hi"]).unwrap();
        assert!(matches!(cli.command, Command::Demo(DemoArgs { text }) if text == "hi"));
    }

    #[test]
    fn parse_cid() {
        let cli = Cli::try_parse_from(["tandem", "cid", "hello"]).unwrap();
        assert!(matches!(cli.command, Command::Cid(CidArgs { text }) if text == "hello"));
        assert!(Cli::try_parse_from(["tandem", "cid"]).is_err());
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["tandem", "--verbose", "demo"]).unwrap();
        assert!(cli.verbose);
    }
}
