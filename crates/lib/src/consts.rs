/// Project configuration file, looked up in the project root.
pub const CONFIG_FILENAME: &str = "fnpush.toml";

/// Environment variable consulted before falling back to git.
pub const ENVIRONMENT_ENV_VAR: &str = "FNPUSH_ENVIRONMENT";

pub const DEFAULT_PAYLOAD_FILE: &str = "payload.json";
pub const DEFAULT_OUTPUT_FILE: &str = "output.json";
