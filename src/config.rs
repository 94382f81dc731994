use crate::error::{DialogError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Parse a gap threshold such as `1.5s`, `800ms`, `2m` or a bare number of seconds.
pub fn parse_duration(text: &str) -> Result<Duration> {
    let trimmed = text.trim();
    let (number, scale) = if let Some(n) = trimmed.strip_suffix("ms") {
        (n, 0.001)
    } else if let Some(n) = trimmed.strip_suffix('s') {
        (n, 1.0)
    } else if let Some(n) = trimmed.strip_suffix('m') {
        (n, 60.0)
    } else {
        (trimmed, 1.0)
    };

    let value: f64 = number
        .trim()
        .parse()
        .map_err(|_| DialogError::Config(format!("Invalid duration: {text}")))?;
    if !value.is_finite() || value < 0.0 {
        return Err(DialogError::Config(format!("Invalid duration: {text}")));
    }

    // Round to whole milliseconds; timestamps carry no finer precision.
    Ok(Duration::from_millis((value * scale * 1000.0).round() as u64))
}

/// Render a duration the way [`parse_duration`] reads it back.
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis % 1000 == 0 {
        return format!("{}s", millis / 1000);
    }
    let fraction = format!("{:03}", millis % 1000);
    format!("{}.{}s", millis / 1000, fraction.trim_end_matches('0'))
}

mod duration_str {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_duration(*d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(deserializer)?;
        super::parse_duration(&text).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Cues separated by a gap no larger than this are merged.
    #[serde(with = "duration_str")]
    pub threshold: Duration,
    pub output_dir: PathBuf,
    /// Number of audio fragments cut at once.
    pub concurrency: usize,
    /// MP3 VBR quality, 0 (best) to 9.
    pub audio_quality: u8,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            threshold: Duration::from_millis(1500),
            output_dir: PathBuf::from("./output"),
            concurrency: 4,
            audio_quality: 0,
            log_file: None,
        }
    }
}

impl Config {
    /// Load the config file and environment overrides.
    ///
    /// Also returns the overrides that were rejected, for logging once a
    /// subscriber is installed.
    pub fn load() -> Result<(Self, Vec<String>)> {
        let mut config = match Self::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };

        let rejected = config.apply_overrides(|key| std::env::var(key).ok());
        Ok((config, rejected))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
            .map_err(|e| DialogError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| DialogError::Config(e.to_string()))
    }

    /// Apply `EXTRACT_DIALOG_*` overrides read through `lookup`.
    ///
    /// Values that do not parse leave the field unchanged and are reported
    /// in the returned messages.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut rejected = Vec::new();
        if let Some(threshold) = lookup("EXTRACT_DIALOG_THRESHOLD") {
            match parse_duration(&threshold) {
                Ok(t) => self.threshold = t,
                Err(e) => rejected.push(format!("Ignoring EXTRACT_DIALOG_THRESHOLD: {e}")),
            }
        }
        if let Some(dir) = lookup("EXTRACT_DIALOG_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }
        if let Some(concurrency) = lookup("EXTRACT_DIALOG_CONCURRENCY") {
            match concurrency.parse() {
                Ok(c) => self.concurrency = c,
                Err(_) => {
                    rejected.push(format!("Ignoring EXTRACT_DIALOG_CONCURRENCY: {concurrency}"))
                }
            }
        }
        if let Some(quality) = lookup("EXTRACT_DIALOG_AUDIO_QUALITY") {
            match quality.parse() {
                Ok(q) => self.audio_quality = q,
                Err(_) => {
                    rejected.push(format!("Ignoring EXTRACT_DIALOG_AUDIO_QUALITY: {quality}"))
                }
            }
        }
        if let Some(path) = lookup("EXTRACT_DIALOG_LOG_FILE") {
            self.log_file = Some(PathBuf::from(path));
        }
        rejected
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(DialogError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        if self.audio_quality > 9 {
            return Err(DialogError::Config(format!(
                "Audio quality must be between 0 and 9, got {}",
                self.audio_quality
            )));
        }

        Ok(())
    }

    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("extract-dialog").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("1.5s").unwrap(), Duration::from_millis(1500));
        assert_eq!(parse_duration("800ms").unwrap(), Duration::from_millis(800));
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
        assert_eq!(parse_duration(" 0.002s ").unwrap(), Duration::from_millis(2));
        assert_eq!(parse_duration("0").unwrap(), Duration::ZERO);
    }

    #[test]
    fn test_parse_duration_rejects_garbage() {
        for bad in ["", "fast", "-1s", "1h", "NaN", "inf"] {
            assert!(parse_duration(bad).is_err(), "expected error for {bad:?}");
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(2)), "2s");
        assert_eq!(format_duration(Duration::from_millis(2)), "0.002s");
        assert_eq!(format_duration(Duration::from_millis(1250)), "1.25s");
        assert_eq!(
            parse_duration(&format_duration(Duration::from_millis(1234))).unwrap(),
            Duration::from_millis(1234)
        );
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.threshold, Duration::from_millis(1500));
        assert_eq!(config.output_dir, PathBuf::from("./output"));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.audio_quality, 0);
        assert!(config.log_file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = Config::from_toml_str(
            r#"
            threshold = "800ms"
            output_dir = "/tmp/dialog"
            "#,
        )
        .unwrap();
        assert_eq!(config.threshold, Duration::from_millis(800));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/dialog"));
        assert_eq!(config.concurrency, 4);
    }

    #[test]
    fn test_from_toml_bad_threshold() {
        let result = Config::from_toml_str(r#"threshold = "soon""#);
        assert!(matches!(result, Err(DialogError::Config(_))));
    }

    #[test]
    fn test_toml_round_trip_of_defaults() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("threshold = \"1.5s\""));
        assert_eq!(Config::from_toml_str(&text).unwrap(), Config::default());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "concurrency = 2\naudio_quality = 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.concurrency, 2);
        assert_eq!(config.audio_quality, 5);
    }

    #[test]
    fn test_apply_overrides() {
        let env: HashMap<&str, &str> = [
            ("EXTRACT_DIALOG_THRESHOLD", "2s"),
            ("EXTRACT_DIALOG_OUTPUT_DIR", "/srv/out"),
            ("EXTRACT_DIALOG_CONCURRENCY", "not-a-number"),
            ("EXTRACT_DIALOG_LOG_FILE", "/tmp/log.txt"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        let rejected = config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.threshold, Duration::from_secs(2));
        assert_eq!(config.output_dir, PathBuf::from("/srv/out"));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/log.txt")));
        assert_eq!(
            rejected,
            vec!["Ignoring EXTRACT_DIALOG_CONCURRENCY: not-a-number".to_string()]
        );
    }

    #[test]
    fn test_apply_overrides_reports_every_rejection() {
        let env: HashMap<&str, &str> = [
            ("EXTRACT_DIALOG_THRESHOLD", "soon"),
            ("EXTRACT_DIALOG_CONCURRENCY", "abc"),
            ("EXTRACT_DIALOG_AUDIO_QUALITY", "high"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        let rejected = config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config, Config::default());
        assert_eq!(rejected.len(), 3);
        assert!(rejected[0].starts_with("Ignoring EXTRACT_DIALOG_THRESHOLD"));
        assert!(rejected[1].ends_with("abc"));
        assert!(rejected[2].ends_with("high"));
    }

    #[test]
    fn test_apply_overrides_without_environment() {
        let mut config = Config::default();
        assert!(config.apply_overrides(|_| None).is_empty());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.audio_quality = 10;
        assert!(config.validate().is_err());
    }
}
