//! Interface de linha de comando do loan-review baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (invoke, state)
//! e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Núcleo do workflow de revisão de empréstimos.
#[derive(Debug, Parser)]
#[command(name = "loan-review", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: `loan-review.toml`).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita saída detalhada (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa um passo do workflow a partir de uma entrada JSON.
    Invoke {
        /// Arquivo JSON com a entrada do passo. Sem valor, lê da entrada padrão.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Mostra o estado armazenado de um workflow.
    State(StateQuery),
}

/// Busca por chave exata ou pelo estado mais recente de um empréstimo.
#[derive(Debug, Args)]
#[command(group = clap::ArgGroup::new("lookup").required(true).args(["request", "loan"]))]
pub struct StateQuery {
    #[arg(long, requires = "execution")]
    pub request: Option<String>,

    #[arg(long, requires = "request")]
    pub execution: Option<String>,

    #[arg(long, conflicts_with = "request")]
    pub loan: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_parses_invoke_subcommand() {
        let cli = Cli::parse_from(["loan-review", "invoke", "--file", "input.json"]);
        match cli.command {
            Command::Invoke { file } => {
                assert_eq!(file.unwrap(), PathBuf::from("input.json"));
            }
            _ => panic!("expected Invoke command"),
        }
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::parse_from([
            "loan-review",
            "--config",
            "custom.toml",
            "--verbose",
            "invoke",
        ]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
    }

    #[test]
    fn cli_parses_state_by_key_and_by_loan() {
        let cli = Cli::parse_from([
            "loan-review",
            "state",
            "--request",
            "REQ-1",
            "--execution",
            "exec-1",
        ]);
        match cli.command {
            Command::State(query) => {
                assert_eq!(query.request.as_deref(), Some("REQ-1"));
                assert_eq!(query.execution.as_deref(), Some("exec-1"));
                assert!(query.loan.is_none());
            }
            _ => panic!("expected State command"),
        }

        let cli = Cli::parse_from(["loan-review", "state", "--loan", "LOAN-1"]);
        assert!(matches!(cli.command, Command::State(StateQuery { loan: Some(_), .. })));
    }

    #[test]
    fn cli_state_requires_a_lookup() {
        assert!(Cli::try_parse_from(["loan-review", "state"]).is_err());
        assert!(Cli::try_parse_from(["loan-review", "state", "--request", "REQ-1"]).is_err());
        assert!(
            Cli::try_parse_from([
                "loan-review",
                "state",
                "--request",
                "REQ-1",
                "--execution",
                "exec-1",
                "--loan",
                "LOAN-1"
            ])
            .is_err()
        );
    }

    #[test]
    fn cli_verify() {
        Cli::command().debug_assert();
    }
}
