//! Configuração do loan-review carregada a partir de `loan-review.toml`.
//!
//! A struct [`LoanReviewConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis.
//! Variáveis de ambiente (`DYNAMODB_TABLE`, `AUDIT_TABLE_NAME`, `AWS_REGION`,
//! `LOAN_REVIEW_CONTROL_ENDPOINT`, `LOAN_REVIEW_DATA_DIR`) têm precedência
//! sobre o arquivo.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::notifier::client::regional_endpoint;

pub const DEFAULT_CONFIG_FILE: &str = "loan-review.toml";

/// Formato de saída dos logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Configuração de nível superior carregada de `loan-review.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct LoanReviewConfig {
    /// Nome da tabela de estado do workflow.
    #[serde(default = "default_state_table")]
    pub state_table: String,

    /// Nome da tabela de auditoria. Sem valor, usa `<state_table>-audit`.
    #[serde(default)]
    pub audit_table: Option<String>,

    /// Região usada para montar o endpoint de controle padrão.
    #[serde(default = "default_region")]
    pub region: String,

    /// Endpoint explícito da API de controle do orquestrador.
    #[serde(default)]
    pub control_endpoint: Option<String>,

    /// Diretório dos documentos JSON do armazenamento em arquivo.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Nível de log padrão quando `RUST_LOG` não está definido.
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Prefixo dos nomes de parâmetros (templates de email, destinatários).
    #[serde(default = "default_parameter_prefix")]
    pub parameter_prefix: String,

    /// Parâmetros estáticos, indexados pelo nome completo.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
}

// Valor padrão para a tabela de estado.
fn default_state_table() -> String {
    "ldc-loan-review-state".to_string()
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".loan-review")
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_parameter_prefix() -> String {
    "/ldc-workflow".to_string()
}

impl Default for LoanReviewConfig {
    fn default() -> Self {
        Self {
            state_table: default_state_table(),
            audit_table: None,
            region: default_region(),
            control_endpoint: None,
            data_dir: default_data_dir(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            log_level: default_log_level(),
            log_format: LogFormat::default(),
            parameter_prefix: default_parameter_prefix(),
            parameters: HashMap::new(),
        }
    }
}

impl LoanReviewConfig {
    /// Carrega a configuração do caminho fornecido, ou de `loan-review.toml`
    /// no diretório atual. Usa valores padrão se o arquivo não existir.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        let config = if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str::<LoanReviewConfig>(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    /// Aplica sobrescritas de ambiente. Valores vazios são ignorados.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(table) = var("DYNAMODB_TABLE") {
            self.state_table = table;
        }
        if let Some(table) = var("AUDIT_TABLE_NAME") {
            self.audit_table = Some(table);
        }
        if let Some(region) = var("AWS_REGION") {
            self.region = region;
        }
        if let Some(endpoint) = var("LOAN_REVIEW_CONTROL_ENDPOINT") {
            self.control_endpoint = Some(endpoint);
        }
        if let Some(dir) = var("LOAN_REVIEW_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        self
    }

    pub fn audit_table_name(&self) -> String {
        self.audit_table
            .clone()
            .unwrap_or_else(|| format!("{}-audit", self.state_table))
    }

    pub fn control_endpoint(&self) -> String {
        self.control_endpoint
            .clone()
            .unwrap_or_else(|| regional_endpoint(&self.region))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
