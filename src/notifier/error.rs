//! Tipos de erro para o notificador de retomada.
//!
//! Define [`NotifierError`] com variantes para respostas não-2xx da API de
//! controle, falhas de rede e payloads que não puderam ser serializados.
//! Nenhuma variante é retentada aqui: quem chama decide.

use thiserror::Error;

/// Erros ao sinalizar sucesso ou falha de uma execução suspensa.
#[derive(Debug, Error)]
pub enum NotifierError {
    /// A API de controle respondeu com status fora da faixa 2xx.
    /// Contém o código HTTP e o corpo da resposta.
    #[error("control API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// O payload de saída não pôde ser serializado.
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}
