/// Failures that stop an invocation before (or instead of) running a tool.
///
/// A tool that runs and exits nonzero is not an error here: its exit code
/// is relayed to the caller untouched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid {kind}: '{value}'")]
    InvalidFormat { kind: &'static str, value: String },

    #[error("unknown host '{0}'")]
    UnknownHost(String),

    #[error("no address known for host")]
    UnresolvedAddress,

    #[error("no MAC address known for host")]
    UnresolvedMac,

    #[error("registry value at '{key}' is not a number: '{value}'")]
    CorruptRegistryValue { key: String, value: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn invalid(kind: &'static str, value: &str) -> Self {
        Error::InvalidFormat {
            kind,
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_console_contract() {
        assert_eq!(
            Error::UnknownHost("nas".into()).to_string(),
            "unknown host 'nas'"
        );
        assert_eq!(
            Error::UnresolvedAddress.to_string(),
            "no address known for host"
        );
        assert_eq!(
            Error::UnresolvedMac.to_string(),
            "no MAC address known for host"
        );
    }

    #[test]
    fn invalid_names_the_value() {
        let err = Error::invalid("port", "70000");
        assert_eq!(err.to_string(), "invalid port: '70000'");
    }
}
