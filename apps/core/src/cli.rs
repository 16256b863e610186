use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "hallucination-detector",
    version,
    about = "Checks statements against the hallucination detection service"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Analyze a statement the way a page selection would be analyzed.
    Check {
        /// The statement to verify.
        text: String,
        /// Print the reply as JSON instead of the rendered modal.
        #[arg(long)]
        json: bool,
        /// Go through the context-menu entry instead of the page selection.
        #[arg(long, conflicts_with = "json")]
        menu: bool,
    },
    /// Probe the detection backend once.
    Status,
    /// Turn the extension on.
    Enable,
    /// Turn the extension off.
    Disable,
    /// Show the persisted on/off state.
    State,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_check() {
        let cli = Cli::try_parse_from(["hallucination-detector", "check", "Paris is in Spain", "--json"]).unwrap();
        match cli.command {
            Commands::Check { text, json, menu } => {
                assert_eq!(text, "Paris is in Spain");
                assert!(json);
                assert!(!menu);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_check_through_menu() {
        let cli = Cli::try_parse_from(["hallucination-detector", "check", "--menu", "Paris is in Spain"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { menu: true, json: false, .. }));
        assert!(Cli::try_parse_from(["hallucination-detector", "check", "--menu", "--json", "x"]).is_err());
    }

    #[test]
    fn test_check_requires_text() {
        assert!(Cli::try_parse_from(["hallucination-detector", "check"]).is_err());
    }
}
