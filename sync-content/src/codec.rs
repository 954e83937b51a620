//! Built-in compression transforms.

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

use crate::data::Data;
use crate::error::ContentError;

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_QUALITY: u32 = 11;
const BROTLI_LG_WINDOW: u32 = 22;

/// A built-in content codec usable as a rule transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    /// gzip at maximum compression.
    Gzip,
    /// brotli at maximum quality.
    Brotli,
}

impl Codec {
    /// Codec name as written in configuration.
    pub fn name(self) -> &'static str {
        match self {
            Codec::Gzip => "gzip",
            Codec::Brotli => "brotli",
        }
    }

    /// Compress bytes on the current thread.
    pub fn encode(self, input: &[u8]) -> Result<Vec<u8>, ContentError> {
        let compress_error = |source| ContentError::Compress {
            codec: self.name(),
            source,
        };
        match self {
            Codec::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
                encoder.write_all(input).map_err(compress_error)?;
                encoder.finish().map_err(compress_error)
            }
            Codec::Brotli => {
                let mut writer = brotli::CompressorWriter::new(
                    Vec::new(),
                    BROTLI_BUFFER_SIZE,
                    BROTLI_QUALITY,
                    BROTLI_LG_WINDOW,
                );
                writer.write_all(input).map_err(compress_error)?;
                writer.flush().map_err(compress_error)?;
                Ok(writer.into_inner())
            }
        }
    }

    /// Compress content on the blocking thread pool.
    pub async fn apply(self, data: Data) -> Result<Data, ContentError> {
        tokio::task::spawn_blocking(move || self.encode(data.as_bytes()).map(Data::from_bytes))
            .await
            .map_err(|e| ContentError::Task(e.to_string()))?
    }
}

impl FromStr for Codec {
    type Err = ContentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gzip" => Ok(Codec::Gzip),
            "brotli" => Ok(Codec::Brotli),
            other => Err(ContentError::UnknownCodec(other.to_string())),
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn gzip_roundtrip() {
        let input = "<html>".repeat(100);
        let compressed = Codec::Gzip.encode(input.as_bytes()).unwrap();

        let mut decoded = String::new();
        flate2::read::GzDecoder::new(compressed.as_slice())
            .read_to_string(&mut decoded)
            .unwrap();

        assert_eq!(decoded, input);
        assert!(compressed.len() < input.len());
    }

    #[test]
    fn brotli_roundtrip() {
        let input = "body { color: red }\n".repeat(50);
        let compressed = Codec::Brotli.encode(input.as_bytes()).unwrap();

        let mut decoded = String::new();
        brotli::Decompressor::new(compressed.as_slice(), 4096)
            .read_to_string(&mut decoded)
            .unwrap();

        assert_eq!(decoded, input);
    }

    #[test]
    fn parse_names() {
        assert_eq!("gzip".parse::<Codec>().unwrap(), Codec::Gzip);
        assert_eq!("brotli".parse::<Codec>().unwrap(), Codec::Brotli);
        assert!(matches!(
            "zstd".parse::<Codec>(),
            Err(ContentError::UnknownCodec(name)) if name == "zstd"
        ));
    }

    #[tokio::test]
    async fn apply_runs_off_thread() {
        let data = Data::from("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        let out = Codec::Gzip.apply(data).await.unwrap();
        assert_eq!(&out.as_bytes()[..2], &[0x1f, 0x8b]);
    }
}
