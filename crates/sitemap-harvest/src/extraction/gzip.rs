//! Transparent inflation of `.xml.gz` sitemap bodies.

use flate2::read::GzDecoder;
use std::io::Read;

/// The sitemap protocol caps an uncompressed sitemap at 50 MiB.
pub const MAX_INFLATED_BYTES: u64 = 50 * 1024 * 1024;

/// Whether `bytes` starts with the gzip magic number.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.starts_with(&[0x1f, 0x8b])
}

/// Inflate a gzip body, refusing output larger than [`MAX_INFLATED_BYTES`].
pub fn inflate(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .take(MAX_INFLATED_BYTES + 1)
        .read_to_end(&mut out)?;

    if out.len() as u64 > MAX_INFLATED_BYTES {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("inflated sitemap exceeds {MAX_INFLATED_BYTES} bytes"),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_roundtrip() {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"<urlset/>").unwrap();
        let gz = enc.finish().unwrap();

        assert!(is_gzip(&gz));
        assert_eq!(inflate(&gz).unwrap(), b"<urlset/>");
    }

    #[test]
    fn test_plain_xml_is_not_gzip() {
        assert!(!is_gzip(b"<?xml version=\"1.0\"?>"));
        assert!(!is_gzip(b""));
    }

    #[test]
    fn test_bad_header_errors() {
        // Magic number followed by an unknown compression method.
        let bogus = [0x1f, 0x8b, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x03, 0x01];
        assert!(is_gzip(&bogus));
        assert!(inflate(&bogus).is_err());
    }
}
