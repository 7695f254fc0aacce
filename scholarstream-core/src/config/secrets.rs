use super::ConfigError;

/// Backend for `${...}` placeholder resolution.
pub trait SecretResolver: Send + Sync {
    fn resolve(&self, reference: &str) -> Result<String, ConfigError>;
}

/// Default resolver: env vars and file references.
///
/// - `${VAR_NAME}` resolves from an environment variable
/// - `${env:VAR_NAME}` is the explicit form of the same
/// - `${file:/path/to/secret}` reads a file (trimmed), e.g. a mounted upload preset
pub struct DefaultSecretResolver;

impl SecretResolver for DefaultSecretResolver {
    fn resolve(&self, reference: &str) -> Result<String, ConfigError> {
        if let Some(path) = reference.strip_prefix("file:") {
            std::fs::read_to_string(path.trim())
                .map(|s| s.trim().to_string())
                .map_err(|e| ConfigError::Load(format!("Secret file '{}': {}", path.trim(), e)))
        } else {
            let var = reference.strip_prefix("env:").unwrap_or(reference).trim();
            std::env::var(var).map_err(|_| ConfigError::NotFound(var.to_string()))
        }
    }
}

/// Resolve every `${...}` placeholder in `value`.
pub fn resolve_placeholders(
    value: &str,
    resolver: &dyn SecretResolver,
) -> Result<String, ConfigError> {
    let mut result = value.to_string();
    while let Some(start) = result.find("${") {
        let end = result[start..]
            .find('}')
            .ok_or_else(|| ConfigError::Load(format!("Unclosed placeholder in: {value}")))?;
        let reference = &result[start + 2..start + end];
        let resolved = resolver.resolve(reference)?;
        result = format!("{}{}{}", &result[..start], resolved, &result[start + end + 1..]);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedResolver;

    impl SecretResolver for FixedResolver {
        fn resolve(&self, reference: &str) -> Result<String, ConfigError> {
            match reference {
                "HOST" => Ok("api.example.com".into()),
                "env:PORT" => Ok("8443".into()),
                other => Err(ConfigError::NotFound(other.into())),
            }
        }
    }

    #[test]
    fn resolves_multiple_placeholders() {
        let result = resolve_placeholders("https://${HOST}:${env:PORT}/", &FixedResolver).unwrap();
        assert_eq!(result, "https://api.example.com:8443/");
    }

    #[test]
    fn leaves_plain_values_alone() {
        assert_eq!(resolve_placeholders("plain", &FixedResolver).unwrap(), "plain");
    }

    #[test]
    fn unclosed_placeholder_is_a_load_error() {
        let err = resolve_placeholders("${HOST", &FixedResolver).unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn unknown_reference_is_not_found() {
        let err = resolve_placeholders("${NOPE}", &FixedResolver).unwrap_err();
        assert_eq!(err, ConfigError::NotFound("NOPE".into()));
    }

    #[test]
    fn file_reference_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preset.txt");
        std::fs::write(&path, "unsigned_preset\n").unwrap();

        let reference = format!("${{file:{}}}", path.display());
        let result = resolve_placeholders(&reference, &DefaultSecretResolver).unwrap();
        assert_eq!(result, "unsigned_preset");
    }
}
