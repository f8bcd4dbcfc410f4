use crate::error::{CertError, Result};

/// Encode bytes into a PEM block with the provided banner.
pub fn to_pem(banner: &str, contents: &[u8]) -> String {
    let pem = pem::Pem::new(banner, contents);
    pem::encode_config(&pem, pem::EncodeConfig::new().set_line_ending(pem::LineEnding::LF))
}

/// Decode the first PEM block, returning its banner and contents.
pub fn from_pem(pem_str: &str) -> Result<(String, Vec<u8>)> {
    let pem = pem::parse(pem_str)?;
    Ok((pem.tag().to_string(), pem.contents().to_vec()))
}

/// Decode every PEM block in `pem_str`, in order.
pub fn from_pem_many(pem_str: &str) -> Result<Vec<(String, Vec<u8>)>> {
    let blocks = pem::parse_many(pem_str)?;
    if blocks.is_empty() {
        return Err(CertError::Pem(pem::PemError::MalformedFraming));
    }
    Ok(blocks
        .into_iter()
        .map(|p| (p.tag().to_string(), p.contents().to_vec()))
        .collect())
}
