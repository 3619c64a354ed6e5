use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the upload endpoint and the reassembly pipeline
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory holding parts and merged files (default: "uploads")
    pub upload_dir: PathBuf,

    /// Directory for in-flight payloads and merge outputs (default: "<upload_dir>/.staging").
    /// Must live on the same filesystem as `upload_dir` so files can be renamed into place.
    pub staging_dir: PathBuf,

    /// Maximum size of a single uploaded payload in bytes (default: 1 GB)
    pub max_file_size: usize,

    /// Largest `totalParts` a multipart upload may declare (default: 10000)
    pub max_total_parts: u32,

    /// Time budget for one merge in seconds (default: 300)
    pub merge_timeout_secs: u64,

    /// Parts untouched for this many hours are considered abandoned (default: 24)
    pub stale_part_age_hours: u64,

    /// How often the sweeper runs, in seconds (default: 3600)
    pub sweep_interval_secs: u64,

    /// Lowercase file extensions rejected at upload time
    pub blocked_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        let upload_dir = PathBuf::from("uploads");
        Self {
            staging_dir: upload_dir.join(".staging"),
            upload_dir,
            max_file_size: 1024 * 1024 * 1024, // 1 GB
            max_total_parts: 10_000,
            merge_timeout_secs: 300,
            stale_part_age_hours: 24,
            sweep_interval_secs: 3600,
            blocked_extensions: Vec::new(),
        }
    }
}

impl UploadConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        let upload_dir = env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or(default.upload_dir);

        Self {
            staging_dir: env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| upload_dir.join(".staging")),

            upload_dir,

            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            max_total_parts: env::var("MAX_TOTAL_PARTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n| n > 0)
                .unwrap_or(default.max_total_parts),

            merge_timeout_secs: env::var("MERGE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.merge_timeout_secs),

            stale_part_age_hours: env::var("STALE_PART_AGE_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.stale_part_age_hours),

            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.sweep_interval_secs),

            blocked_extensions: env::var("BLOCKED_EXTENSIONS")
                .ok()
                .map(|v| parse_extensions(&v))
                .unwrap_or(default.blocked_extensions),
        }
    }

    /// Create config for development (local directory, nothing blocked)
    pub fn development() -> Self {
        Self {
            max_file_size: 256 * 1024 * 1024,
            sweep_interval_secs: 600,
            ..Self::default()
        }
    }

    /// Create config for production (executables blocked, env overrides honored)
    pub fn production() -> Self {
        let from_env = Self::from_env();
        let blocked_extensions = if env::var("BLOCKED_EXTENSIONS").is_ok() {
            from_env.blocked_extensions
        } else {
            parse_extensions("exe,bat,cmd,com,msi,scr,ps1,sh")
        };

        Self {
            blocked_extensions,
            ..from_env
        }
    }

    /// Point both directories at `root`, keeping staging inside it
    pub fn with_upload_dir(mut self, root: impl Into<PathBuf>) -> Self {
        self.upload_dir = root.into();
        self.staging_dir = self.upload_dir.join(".staging");
        self
    }

    pub fn merge_timeout(&self) -> Duration {
        Duration::from_secs(self.merge_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn stale_part_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.stale_part_age_hours as i64)
    }
}

fn parse_extensions(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_start_matches('.').to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
