//! Tipos de erro para o cliente do control plane Atlas.
//!
//! Define [`AtlasError`] com variantes para falhas de autenticação, erros
//! retornados pela API e erros de rede. Usa `thiserror` para derivar
//! `Display` e `Error` a partir dos atributos `#[error(...)]`.

use thiserror::Error;

use crate::error::ErrorClass;

/// Erros que podem ocorrer ao interagir com a API do Atlas.
///
/// As variantes cobrem os cenários mais comuns de falha:
/// - [`Unauthorized`](AtlasError::Unauthorized) — HTTP 401/403 (credenciais digest inválidas)
/// - [`ApiError`](AtlasError::ApiError) — qualquer outro erro HTTP (4xx/5xx)
/// - [`Network`](AtlasError::Network) — falha na camada de rede
/// - [`Digest`](AtlasError::Digest) — falha no handshake de digest auth
#[derive(Debug, Error)]
pub enum AtlasError {
    /// O servidor rejeitou as credenciais (HTTP 401 ou 403).
    /// Verifique `ATLAS_PUBLIC_KEY` e `ATLAS_PRIVATE_KEY`.
    #[error("authentication rejected (status {status}); check ATLAS_PUBLIC_KEY/ATLAS_PRIVATE_KEY")]
    Unauthorized { status: u16 },

    /// Erro retornado pela API (ex.: 400 payload inválido, 500 erro interno).
    /// Contém o código de status HTTP e o corpo da resposta.
    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    /// Falha de rede subjacente (DNS, conexão recusada, timeout).
    /// Encapsula o erro original do `reqwest` via `#[from]`.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Falha ao montar a resposta de digest auth.
    #[error("digest auth error: {0}")]
    Digest(#[from] diqwest::error::Error),
}

impl AtlasError {
    /// Classificação para os laços de sondagem: credenciais rejeitadas são
    /// fatais; todo o resto é tratado como transitório.
    pub fn class(&self) -> ErrorClass {
        match self {
            AtlasError::Unauthorized { .. } => ErrorClass::Fatal,
            _ => ErrorClass::Retryable,
        }
    }
}
