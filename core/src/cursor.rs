use base64::Engine as _;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::engine::PagingError;

/// Where a list was last being looked at, so a replacement list can start there.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResumeToken<K> {
  pub position: usize,
  pub key: Option<K>,
}

pub fn encode_resume_token<K: Serialize>(token: &ResumeToken<K>) -> Result<String, PagingError> {
  let json = serde_json::to_vec(token)?;
  Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(json))
}

pub fn decode_resume_token<K: DeserializeOwned>(token: &str) -> Result<ResumeToken<K>, PagingError> {
  if token.is_empty() {
    return Err(PagingError::BadResumeToken("empty token".into()));
  }
  let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
    .decode(token)
    .map_err(|e| PagingError::BadResumeToken(e.to_string()))?;
  serde_json::from_slice(&bytes).map_err(|e| PagingError::BadResumeToken(e.to_string()))
}
