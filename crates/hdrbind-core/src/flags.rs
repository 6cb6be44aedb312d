//! Compiler flag assembly for the AST provider.

/// Environment variable holding extra space-separated compiler flags.
pub const CFLAGS_ENV: &str = "HDRBIND_CFLAGS";

/// Split a flag string on single spaces, dropping the empty tokens that
/// consecutive spaces produce.
pub fn split_flags(raw: &str) -> Vec<String> {
    raw.split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// `base` followed by the flags found in `env_value`, in order.
pub fn compiler_args(base: &[String], env_value: Option<&str>) -> Vec<String> {
    let mut args = base.to_vec();
    if let Some(raw) = env_value {
        args.extend(split_flags(raw));
    }
    args
}

/// [`compiler_args`] with flags read from [`CFLAGS_ENV`].
pub fn compiler_args_from_env(base: &[String]) -> Vec<String> {
    let env_value = std::env::var(CFLAGS_ENV).ok();
    if let Some(raw) = &env_value {
        tracing::debug!(variable = CFLAGS_ENV, flags = %raw, "injecting compiler flags from environment");
    }
    compiler_args(base, env_value.as_deref())
}
