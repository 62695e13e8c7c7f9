// Copyright 2020 The Sparv Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Logging wrapper to be used throughout all crates in the workspace

use crate::Mutex;

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

/// Log levels for the wallet, as commonly understood
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
	/// Error
	Error,
	/// Warning
	Warning,
	/// Info
	Info,
	/// Debug
	Debug,
	/// Trace
	Trace,
}

/// Logging configuration
#[derive(Clone, Debug)]
pub struct LoggingConfig {
	/// log level for stdout
	pub stdout_log_level: LogLevel,
	/// whether to log to a file as well
	pub log_to_file: bool,
	/// log level for the file
	pub file_log_level: LogLevel,
	/// log file path
	pub log_file_path: String,
}

impl Default for LoggingConfig {
	fn default() -> LoggingConfig {
		LoggingConfig {
			stdout_log_level: LogLevel::Info,
			log_to_file: false,
			file_log_level: LogLevel::Debug,
			log_file_path: String::from("sparv.log"),
		}
	}
}

fn convert_log_level(in_level: &LogLevel) -> LevelFilter {
	match *in_level {
		LogLevel::Info => LevelFilter::Info,
		LogLevel::Warning => LevelFilter::Warn,
		LogLevel::Debug => LevelFilter::Debug,
		LogLevel::Trace => LevelFilter::Trace,
		LogLevel::Error => LevelFilter::Error,
	}
}

lazy_static! {
	/// Flag to observe whether logging was explicitly initialised (don't output otherwise)
	static ref WAS_INIT: Mutex<bool> = Mutex::new(false);
}

const LOGGING_PATTERN: &str = "{d(%Y%m%d %H:%M:%S%.3f)} {h({l})} {M} - {m}{n}";

/// Initialize the logger with the given configuration
pub fn init_logger(config: Option<LoggingConfig>) {
	let c = config.unwrap_or_default();

	let level_stdout = convert_log_level(&c.stdout_log_level);
	let level_file = convert_log_level(&c.file_log_level);
	let level_minimum = if c.log_to_file && level_file > level_stdout {
		level_file
	} else {
		level_stdout
	};

	let stdout = ConsoleAppender::builder()
		.encoder(Box::new(PatternEncoder::new(&LOGGING_PATTERN)))
		.build();

	let mut root = Root::builder().appender("stdout");
	let mut appenders = vec![Appender::builder().build("stdout", Box::new(stdout))];

	if c.log_to_file {
		let file = FileAppender::builder()
			.encoder(Box::new(PatternEncoder::new(&LOGGING_PATTERN)))
			.build(c.log_file_path.clone())
			.expect("failed to open log file");
		appenders.push(Appender::builder().build("file", Box::new(file)));
		root = root.appender("file");
	}

	let config = Config::builder()
		.appenders(appenders)
		.build(root.build(level_minimum))
		.expect("invalid logging config");

	let _ = log4rs::init_config(config);

	let mut was_init_ref = WAS_INIT.lock();
	*was_init_ref = true;
}

/// Initializes the logger for unit and integration tests
pub fn init_test_logger() {
	let was_init_ref = WAS_INIT.lock();
	if *was_init_ref {
		return;
	}
	let mut config = LoggingConfig::default();
	config.stdout_log_level = LogLevel::Debug;
	drop(was_init_ref);
	init_logger(Some(config));
}
