#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    #[error("Generic {0}")]
    Generic(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not a PDF: {0}")]
    NotAPdf(String),

    #[error("Sticker rejected: {0}")]
    Rejected(String),
}
