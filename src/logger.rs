use chrono::{DateTime, Utc};
use colored::*;
use log::{Level, Metadata, Record};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

static STUDIO_LOGGER: Lazy<StudioLogger> = Lazy::new(StudioLogger::new);
static INSTALLED: AtomicBool = AtomicBool::new(false);

pub fn init_with_config(config: LoggerConfig) -> Result<(), String> {
    STUDIO_LOGGER.update_config(config.clone());

    if let Err(e) = log::set_logger(&*STUDIO_LOGGER) {
        return Err(format!("Failed to set logger: {:?}", e));
    }
    INSTALLED.store(true, Ordering::Release);

    log::set_max_level(config.min_level.to_log_level_filter());
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl LogLevel {
    pub fn color(&self) -> Color {
        match self {
            LogLevel::Trace => Color::Cyan,
            LogLevel::Debug => Color::Blue,
            LogLevel::Info => Color::Green,
            LogLevel::Warn => Color::Yellow,
            LogLevel::Error => Color::Red,
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            LogLevel::Trace => "🔍",
            LogLevel::Debug => "🐛",
            LogLevel::Info => "💡",
            LogLevel::Warn => "⚠️",
            LogLevel::Error => "❌",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    pub fn to_log_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::Trace,
            LogLevel::Debug => Level::Debug,
            LogLevel::Info => Level::Info,
            LogLevel::Warn => Level::Warn,
            LogLevel::Error => Level::Error,
        }
    }

    pub fn to_log_level_filter(&self) -> log::LevelFilter {
        self.to_log_level().to_level_filter()
    }

    pub fn from_log_level(level: Level) -> Self {
        match level {
            Level::Trace => LogLevel::Trace,
            Level::Debug => LogLevel::Debug,
            Level::Info => LogLevel::Info,
            Level::Warn => LogLevel::Warn,
            Level::Error => LogLevel::Error,
        }
    }

    /// Parses `RUST_LOG`-style level names, case-insensitively.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub module: String,
    pub file: String,
    pub line: u32,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: String, module: String, file: String, line: u32) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level,
            message,
            module,
            file,
            line,
            context: HashMap::new(),
            duration_ms: None,
        }
    }

    fn from_record(record: &Record) -> Self {
        Self::new(
            LogLevel::from_log_level(record.level()),
            record.args().to_string(),
            record.module_path().unwrap_or("unknown").to_string(),
            record.file().unwrap_or("unknown").to_string(),
            record.line().unwrap_or(0),
        )
    }

    pub fn with_context(mut self, key: &str, value: serde_json::Value) -> Self {
        self.context.insert(key.to_string(), value);
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration_ms = Some(duration.as_millis() as u64);
        self
    }
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub min_level: LogLevel,
    pub show_colors: bool,
    pub show_emojis: bool,
    pub show_file_location: bool,
    pub show_module: bool,
    pub include_timestamp: bool,
    pub timestamp_format: String,
    pub output_json: bool,
    pub log_file_path: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            show_colors: true,
            show_emojis: true,
            show_file_location: false,
            show_module: true,
            include_timestamp: true,
            timestamp_format: "%Y-%m-%d %H:%M:%S%.3f".to_string(),
            output_json: false,
            log_file_path: None,
        }
    }
}

impl LoggerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Debug level with source locations, for `--verbose`.
    pub fn development() -> Self {
        Self {
            min_level: LogLevel::Debug,
            show_file_location: true,
            ..Default::default()
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Appends every entry to `path` as well as stderr. File lines never
    /// carry colour codes.
    pub fn with_file_output(mut self, path: &str) -> Self {
        self.log_file_path = Some(path.to_string());
        self
    }

    pub fn with_json_output(mut self, enabled: bool) -> Self {
        self.output_json = enabled;
        self
    }
}

/// `log` backend writing to stderr and, optionally, a file.
pub struct StudioLogger {
    config: Arc<Mutex<LoggerConfig>>,
    log_file: Arc<Mutex<Option<File>>>,
}

impl StudioLogger {
    pub fn new() -> Self {
        Self {
            config: Arc::new(Mutex::new(LoggerConfig::default())),
            log_file: Arc::new(Mutex::new(None)),
        }
    }

    pub fn update_config(&self, new_config: LoggerConfig) {
        let file = new_config.log_file_path.as_deref().and_then(|path| {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| eprintln!("could not open log file {}: {}", path, e))
                .ok()
        });
        if let Ok(mut log_file) = self.log_file.lock() {
            *log_file = file;
        }
        if let Ok(mut config) = self.config.lock() {
            *config = new_config;
        }
    }

    fn format_console_output(&self, entry: &LogEntry, config: &LoggerConfig) -> String {
        let colors = config.show_colors;
        let mut fields = Vec::new();

        if config.include_timestamp {
            let timestamp = entry.timestamp.format(&config.timestamp_format).to_string();
            fields.push(paint(&timestamp, colors, |s| s.bright_black()));
        }

        let level = if config.show_emojis {
            format!("{} {}", entry.level.emoji(), entry.level.as_str())
        } else {
            entry.level.as_str().to_string()
        };
        let level_color = entry.level.color();
        fields.push(format!(
            "[{}]",
            paint(&level, colors, |s| s.color(level_color).bold())
        ));

        let mut message = String::new();
        if config.show_module && !entry.module.is_empty() {
            message.push_str(&paint(&entry.module, colors, |s| s.bright_blue()));
            message.push_str("::");
        }
        message.push_str(&paint(&entry.message, colors, |s| s.white().bold()));
        fields.push(message);

        if !entry.context.is_empty() {
            let context = serde_json::to_string(&entry.context).unwrap_or_default();
            fields.push(paint(&context, colors, |s| s.bright_cyan()));
        }
        if let Some(duration) = entry.duration_ms {
            fields.push(format!(
                "[{}ms]",
                paint(&duration.to_string(), colors, |s| s.bright_magenta())
            ));
        }
        if config.show_file_location {
            let location = format!("{}:{}", entry.file, entry.line);
            fields.push(format!("({})", paint(&location, colors, |s| s.bright_black())));
        }

        fields.join(" ")
    }

    fn render(&self, entry: &LogEntry, config: &LoggerConfig, colors: bool) -> String {
        if config.output_json {
            serde_json::to_string(entry).unwrap_or_default()
        } else if colors == config.show_colors {
            self.format_console_output(entry, config)
        } else {
            let plain = LoggerConfig {
                show_colors: colors,
                ..config.clone()
            };
            self.format_console_output(entry, &plain)
        }
    }

    /// Writes one entry to stderr and the log file, if its level passes.
    pub fn emit(&self, entry: &LogEntry) {
        let Ok(config) = self.config.lock() else {
            return;
        };
        if entry.level < config.min_level {
            return;
        }

        // stdout carries the result surface, so logs go to stderr
        eprintln!("{}", self.render(entry, &config, config.show_colors));

        if let Ok(mut log_file) = self.log_file.lock() {
            if let Some(file) = log_file.as_mut() {
                let line = self.render(entry, &config, false) + "\n";
                let _ = file.write_all(line.as_bytes());
            }
        }
    }
}

fn paint(text: &str, colors: bool, style: impl FnOnce(&str) -> ColoredString) -> String {
    if colors {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

impl Default for StudioLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl log::Log for StudioLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        match self.config.lock() {
            Ok(config) => metadata.level() <= config.min_level.to_log_level(),
            Err(_) => true,
        }
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            self.emit(&LogEntry::from_record(record));
        }
    }

    fn flush(&self) {
        let _ = io::stderr().flush();
        if let Ok(mut log_file) = self.log_file.lock() {
            if let Some(file) = log_file.as_mut() {
                let _ = file.flush();
            }
        }
    }
}

/// Logs how long an operation took when dropped, as an entry carrying
/// `duration_ms` and the operation name in its context.
pub struct Timer {
    start: Instant,
    name: String,
    location: &'static Location<'static>,
}

impl Timer {
    #[track_caller]
    pub fn new(name: &str) -> Self {
        log::debug!("⏱️  Starting timer: {}", name);
        Self {
            start: Instant::now(),
            name: name.to_string(),
            location: Location::caller(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    fn entry(&self) -> LogEntry {
        LogEntry::new(
            LogLevel::Info,
            format!("⏱️  {} completed", self.name),
            module_path!().to_string(),
            self.location.file().to_string(),
            self.location.line(),
        )
        .with_context("operation", serde_json::Value::from(self.name.clone()))
        .with_duration(self.elapsed())
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        if INSTALLED.load(Ordering::Acquire) {
            STUDIO_LOGGER.emit(&self.entry());
        } else {
            log::info!(
                "⏱️  {} completed in {}ms",
                self.name,
                self.elapsed().as_millis()
            );
        }
    }
}

#[track_caller]
pub fn timer(name: &str) -> Timer {
    Timer::new(name)
}

pub fn log_startup_info(app_name: &str, version: &str) {
    log::info!("🚀 Starting {} v{}", app_name, version);
}

/// Logs the effective configuration. The API key itself is never printed.
pub fn log_config_info(config: &crate::config::Config) {
    log::info!("⚙️  Configuration loaded:");
    log::info!("   Model: {}", config.gemini.model);
    log::info!("   Endpoint: {}", config.gemini.endpoint());
    log::info!(
        "   API key: {}",
        if config.gemini.api_key.is_some() {
            "✅"
        } else {
            "❌ (set GEMINI_API_KEY)"
        }
    );
    log::info!("   Upload limit: {} bytes", config.max_upload_bytes);
}
