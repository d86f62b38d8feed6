//! Corpos de requisição da API de controle do orquestrador.
//!
//! Os nomes de campo seguem o formato JSON esperado pelas ações
//! `SendTaskSuccess` e `SendTaskFailure`.

use serde::{Deserialize, Serialize};

/// Alvo `X-Amz-Target` para retomar uma execução com sucesso.
pub const SEND_TASK_SUCCESS: &str = "AWSStepFunctions.SendTaskSuccess";
/// Alvo `X-Amz-Target` para encerrar uma execução com falha.
pub const SEND_TASK_FAILURE: &str = "AWSStepFunctions.SendTaskFailure";

/// Corpo de `SendTaskSuccess`. O campo `output` é o payload JSON
/// já serializado como string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTaskSuccessRequest {
    pub task_token: String,
    pub output: String,
}

/// Corpo de `SendTaskFailure`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTaskFailureRequest {
    pub task_token: String,
    pub error: String,
    pub cause: String,
}
