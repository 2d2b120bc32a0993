//! Centralized constants for layout, permissions, and defaults.

/// Prefix directory name under `$HOME` when nothing else is configured.
pub const DEFAULT_PREFIX_DIR: &str = ".venvtap";

/// Fallback prefix when `$HOME` is unset.
pub const FALLBACK_PREFIX: &str = "/usr/local/venvtap";

/// Environment variable overriding the install prefix.
pub const PREFIX_ENV: &str = "VENVTAP_PREFIX";

/// Environment variable overriding the Python interpreter.
pub const PYTHON_ENV: &str = "VENVTAP_PYTHON";

/// Environment variable holding the tracing filter.
pub const LOG_ENV: &str = "VENVTAP_LOG";

/// Settings file name inside the prefix.
pub const SETTINGS_FILE: &str = "venvtap.toml";

/// Receipt file written into every keg.
pub const RECEIPT_FILE: &str = "INSTALL_RECEIPT.json";

/// Environment directory inside a keg.
pub const ENV_DIR: &str = "libexec";

/// Suffix of a keg moved aside during reinstall.
pub const PREVIOUS_SUFFIX: &str = "previous";

/// Permission mode for prefix directories.
pub const PREFIX_DIR_MODE: u32 = 0o755;

/// Permission mode for settings and receipts.
pub const METADATA_FILE_MODE: u32 = 0o644;

/// Default smoke-test arguments.
pub const DEFAULT_TEST_ARGS: &[&str] = &["help"];

/// Subcommand the credential-rotation tool must advertise.
pub const DEFAULT_TEST_EXPECT: &str = "rotate";

/// Branch used for head installs when the formula names none.
pub const DEFAULT_HEAD_BRANCH: &str = "main";

/// Upper bound on conflict-removal passes before giving up.
pub const MAX_REMOVAL_PASSES: usize = 8;

/// Placeholders a formula template may carry.
pub const TEMPLATE_KEYS: &[&str] = &["version", "tarball_url", "sha256"];
