use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dorarelay")]
#[command(author, version, about = "HTTP download relay in front of yt-dlp", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the metadata projection for a URL
    Info {
        /// Video URL
        url: String,

        /// Print JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// Probe the yt-dlp installation and print what would be used
    Probe,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_defaults_to_none() {
        let cli = Cli::parse_from(["dorarelay"]);
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_serve_port() {
        let cli = Cli::parse_from(["dorarelay", "serve", "--port", "8080"]);
        assert_eq!(cli.command, Some(Commands::Serve { port: Some(8080) }));
    }

    #[test]
    fn test_info_json() {
        let cli = Cli::parse_from(["dorarelay", "info", "https://youtu.be/abc", "--json"]);
        assert_eq!(
            cli.command,
            Some(Commands::Info {
                url: "https://youtu.be/abc".to_string(),
                json: true
            })
        );
    }
}
