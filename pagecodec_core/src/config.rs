use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};
use crate::format::{
    DEFAULT_BZIP2_LEVEL, DEFAULT_DEFLATE_LEVEL, DEFAULT_MAX_OUTPUT_LEN, MAX_BZIP2_LEVEL,
    MAX_DEFLATE_LEVEL,
};

// ── Algorithm ──────────────────────────────────────────────────────────────

/// The closed set of block compression algorithms.
///
/// `Gzip` and `Deflate` share one codec and differ only in container:
/// gzip header/trailer versus zlib header/trailer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    Gzip,
    Deflate,
    Bzip2,
    SnappyBlocked,
    Snappy,
}

impl Algorithm {
    pub const ALL: [Algorithm; 5] = [
        Algorithm::Gzip,
        Algorithm::Deflate,
        Algorithm::Bzip2,
        Algorithm::SnappyBlocked,
        Algorithm::Snappy,
    ];

    /// Stable id for callers that record the algorithm in their own page headers.
    pub fn id(self) -> u16 {
        match self {
            Algorithm::Gzip => 0,
            Algorithm::Deflate => 1,
            Algorithm::Bzip2 => 2,
            Algorithm::SnappyBlocked => 3,
            Algorithm::Snappy => 4,
        }
    }

    pub fn from_id(id: u16) -> Result<Self> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.id() == id)
            .ok_or_else(|| CodecError::InvalidConfig(format!("unknown algorithm id {id}")))
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Gzip => "gzip",
            Algorithm::Deflate => "deflate",
            Algorithm::Bzip2 => "bzip2",
            Algorithm::SnappyBlocked => "snappy_blocked",
            Algorithm::Snappy => "snappy",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "gzip" | "gz" => Ok(Algorithm::Gzip),
            "deflate" | "zlib" => Ok(Algorithm::Deflate),
            "bzip2" | "bzip" | "bz2" => Ok(Algorithm::Bzip2),
            "snappy_blocked" | "snappy_block" => Ok(Algorithm::SnappyBlocked),
            "snappy" | "snappy_raw" => Ok(Algorithm::Snappy),
            other => Err(CodecError::InvalidConfig(format!(
                "unknown algorithm '{other}'. Valid options: gzip, deflate, bzip2, snappy_blocked, snappy"
            ))),
        }
    }
}

// ── Direction ──────────────────────────────────────────────────────────────

/// Which way a codec runs. Fixed for the codec's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Compress,
    Decompress,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Compress => "compress",
            Direction::Decompress => "decompress",
        })
    }
}

// ── CodecConfig ────────────────────────────────────────────────────────────

/// Everything needed to build a codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    pub algorithm: Algorithm,
    pub direction: Direction,
    /// Keep one growing output buffer inside the codec instead of allocating per call.
    pub reuse_buffer: bool,
    /// Compression level. `None` picks the algorithm default.
    pub level: Option<u32>,
    /// Upper bound on a decompressed block.
    pub max_output_len: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Gzip,
            direction: Direction::Compress,
            reuse_buffer: false,
            level: None,
            max_output_len: DEFAULT_MAX_OUTPUT_LEN,
        }
    }
}

impl CodecConfig {
    pub fn new(algorithm: Algorithm, direction: Direction) -> Self {
        Self {
            algorithm,
            direction,
            ..Self::default()
        }
    }

    pub fn with_reuse_buffer(mut self, reuse_buffer: bool) -> Self {
        self.reuse_buffer = reuse_buffer;
        self
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_max_output_len(mut self, max_output_len: usize) -> Self {
        self.max_output_len = max_output_len;
        self
    }

    /// Level to hand to the library, after applying the algorithm default.
    pub fn effective_level(&self) -> u32 {
        match (self.level, self.algorithm) {
            (Some(level), _) => level,
            (None, Algorithm::Bzip2) => DEFAULT_BZIP2_LEVEL,
            (None, _) => DEFAULT_DEFLATE_LEVEL,
        }
    }

    /// Reject settings no library would accept.
    pub fn validate(&self) -> Result<()> {
        if self.max_output_len == 0 {
            return Err(CodecError::InvalidConfig(
                "max_output_len must be greater than zero".into(),
            ));
        }
        let level = self.effective_level();
        match self.algorithm {
            Algorithm::Gzip | Algorithm::Deflate if level > MAX_DEFLATE_LEVEL => {
                Err(CodecError::initialization(
                    self.algorithm,
                    format!("level {level} outside 0..={MAX_DEFLATE_LEVEL}"),
                ))
            }
            Algorithm::Bzip2 if !(1..=MAX_BZIP2_LEVEL).contains(&level) => {
                Err(CodecError::initialization(
                    self.algorithm,
                    format!("block size {level} outside 1..={MAX_BZIP2_LEVEL}"),
                ))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("gzip", Algorithm::Gzip)]
    #[case("zlib", Algorithm::Deflate)]
    #[case("DEFLATE", Algorithm::Deflate)]
    #[case("bz2", Algorithm::Bzip2)]
    #[case("snappy_block", Algorithm::SnappyBlocked)]
    #[case("snappy_raw", Algorithm::Snappy)]
    fn test_parse_aliases(#[case] name: &str, #[case] expected: Algorithm) {
        assert_eq!(name.parse::<Algorithm>().unwrap(), expected);
    }

    #[test]
    fn test_unknown_name_rejected() {
        let err = "lzo".parse::<Algorithm>().unwrap_err();
        assert!(err.to_string().contains("unknown algorithm 'lzo'"));
    }

    #[test]
    fn test_ids_are_stable_and_round_trip() {
        for algorithm in Algorithm::ALL {
            assert_eq!(Algorithm::from_id(algorithm.id()).unwrap(), algorithm);
            assert_eq!(algorithm.to_string().parse::<Algorithm>().unwrap(), algorithm);
        }
        assert_eq!(Algorithm::SnappyBlocked.id(), 3);
        assert!(Algorithm::from_id(99).is_err());
    }

    #[test]
    fn test_default_levels() {
        assert_eq!(CodecConfig::new(Algorithm::Gzip, Direction::Compress).effective_level(), 6);
        assert_eq!(CodecConfig::new(Algorithm::Bzip2, Direction::Compress).effective_level(), 9);
        assert_eq!(
            CodecConfig::new(Algorithm::Deflate, Direction::Compress)
                .with_level(1)
                .effective_level(),
            1
        );
    }

    #[test]
    fn test_validate_levels() {
        assert!(CodecConfig::new(Algorithm::Gzip, Direction::Compress)
            .with_level(10)
            .validate()
            .is_err());
        assert!(CodecConfig::new(Algorithm::Bzip2, Direction::Compress)
            .with_level(0)
            .validate()
            .is_err());
        assert!(CodecConfig::new(Algorithm::Gzip, Direction::Compress)
            .with_level(0)
            .validate()
            .is_ok());
        assert!(CodecConfig::new(Algorithm::Snappy, Direction::Compress)
            .with_max_output_len(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_json_uses_defaults_for_missing_fields() -> anyhow::Result<()> {
        let config: CodecConfig =
            serde_json::from_str(r#"{"algorithm": "snappy_blocked", "reuse_buffer": true}"#)?;
        assert_eq!(config.algorithm, Algorithm::SnappyBlocked);
        assert_eq!(config.direction, Direction::Compress);
        assert!(config.reuse_buffer);
        assert_eq!(config.max_output_len, DEFAULT_MAX_OUTPUT_LEN);

        let json = serde_json::to_string(&config)?;
        let back: CodecConfig = serde_json::from_str(&json)?;
        assert_eq!(back, config);
        Ok(())
    }

    #[test]
    fn test_json_rejects_unknown_algorithm() {
        let result = serde_json::from_str::<CodecConfig>(r#"{"algorithm": "lz4"}"#);
        assert!(result.is_err());
    }
}
