//! GSR sensor text protocol.
//!
//! The device writes newline-terminated text at 9600 baud. Lines look like:
//!   当前GSR值: 512
//!   GSR: 37
//!   信号检测中...
//! Anything that is not a reading is dropped without complaint.

use anyhow::Result;
use regex::Regex;
use tracing::debug;

/// Upper bound of the sensor's raw ADC scale.
pub const ADC_MAX: f64 = 1023.0;

/// Status/diagnostic lines carry numbers that are not readings.
const DIAGNOSTIC_KEYWORDS: [&str; 8] = ["分析", "情绪", "信号", "检测", "analy", "mood", "signal", "detect"];

/// Splits a byte stream into complete lines, keeping the trailing fragment.
///
/// Works on bytes so a multi-byte character cut across two reads is
/// reassembled before decoding.
#[derive(Debug, Clone, Default)]
pub struct LineAssembler {
    carry: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes held back waiting for a newline.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    /// Feed a chunk and get every completed, non-blank line (trimmed).
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.carry.extend_from_slice(chunk);
        let Some(last_nl) = self.carry.iter().rposition(|b| *b == b'\n') else {
            return Vec::new();
        };

        let rest = self.carry.split_off(last_nl + 1);
        let complete = std::mem::replace(&mut self.carry, rest);
        complete
            .split(|b| *b == b'\n')
            .map(|line| String::from_utf8_lossy(line).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect()
    }

    pub fn clear(&mut self) {
        self.carry.clear();
    }
}

/// Map a raw number onto 0..=100. Non-positive or non-finite numbers are rejected.
pub fn scale_and_clamp(num: f64) -> Option<f64> {
    if !num.is_finite() || num <= 0.0 {
        return None;
    }
    let scaled = if num > 100.0 { num / ADC_MAX * 100.0 } else { num };
    Some(scaled.clamp(0.0, 100.0))
}

#[derive(Debug, Clone)]
pub struct GsrLineParser {
    labeled: Regex,
    any_number: Regex,
}

impl GsrLineParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            labeled: Regex::new(r"(?i)GSR(?:值|\s*value)?\s*[：:]\s*(\d+)")?,
            any_number: Regex::new(r"[-+]?\d*\.?\d+")?,
        })
    }

    /// Extract a reading from one line, or None when the line is not one.
    pub fn parse(&self, line: &str) -> Option<f64> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if let Some(caps) = self.labeled.captures(line) {
            if let Some(v) = caps[1].parse::<f64>().ok().and_then(scale_and_clamp) {
                debug!(line, value = v, "labeled GSR reading");
                return Some(v);
            }
        }

        let lower = line.to_lowercase();
        if DIAGNOSTIC_KEYWORDS.iter().any(|k| lower.contains(k)) {
            return None;
        }

        let m = self.any_number.find(line)?;
        let v = m.as_str().parse::<f64>().ok().and_then(scale_and_clamp)?;
        debug!(line, value = v, "bare numeric reading");
        Some(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assembler_keeps_partial_lines() {
        let mut a = LineAssembler::new();
        assert!(a.push(b"GSR: 4").is_empty());
        assert_eq!(a.pending(), 6);
        assert_eq!(a.push(b"2\r\nGSR: 3"), vec!["GSR: 42".to_string()]);
        assert_eq!(a.push(b"7\n\n  \n"), vec!["GSR: 37".to_string()]);
        assert_eq!(a.pending(), 0);
    }

    #[test]
    fn assembler_rejoins_split_utf8() {
        let line = "当前GSR值: 512\n".as_bytes();
        let mut a = LineAssembler::new();
        // cut inside the first three-byte character
        assert!(a.push(&line[..1]).is_empty());
        let out = a.push(&line[1..]);
        assert_eq!(out, vec!["当前GSR值: 512".to_string()]);
    }

    #[test]
    fn labeled_readings() {
        let p = GsrLineParser::new().unwrap();
        assert_eq!(p.parse("GSR值: 45"), Some(45.0));
        assert_eq!(p.parse("当前GSR值：30"), Some(30.0));
        assert_eq!(p.parse("GSR value: 88"), Some(88.0));
    }

    #[test]
    fn large_values_are_rescaled_from_adc_range() {
        let p = GsrLineParser::new().unwrap();
        let v = p.parse("GSR值: 512").unwrap();
        assert!((v - 512.0 / 1023.0 * 100.0).abs() < 1e-9);
        assert_eq!(p.parse("GSR: 5000"), Some(100.0));
    }

    #[test]
    fn fallback_takes_first_number() {
        let p = GsrLineParser::new().unwrap();
        assert_eq!(p.parse("42.5"), Some(42.5));
        assert_eq!(p.parse("raw=33 ok"), Some(33.0));
    }

    #[test]
    fn diagnostics_and_junk_are_ignored() {
        let p = GsrLineParser::new().unwrap();
        assert_eq!(p.parse("信号检测中 3"), None);
        assert_eq!(p.parse("情绪分析: 2"), None);
        assert_eq!(p.parse("Signal quality 80"), None);
        assert_eq!(p.parse("hello"), None);
        assert_eq!(p.parse(""), None);
        assert_eq!(p.parse("-12"), None);
        assert_eq!(p.parse("GSR值: 0"), None);
    }

    #[test]
    fn scale_and_clamp_bounds() {
        assert_eq!(scale_and_clamp(0.0), None);
        assert_eq!(scale_and_clamp(f64::NAN), None);
        assert_eq!(scale_and_clamp(100.0), Some(100.0));
        assert_eq!(scale_and_clamp(1023.0), Some(100.0));
        assert_eq!(scale_and_clamp(0.5), Some(0.5));
    }
}
