use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty label, duplicate file name, etc.).
    ConfigValidation(String),
    /// A palette entry whose value is not a `#RRGGBB` color.
    InvalidColor { label: String, value: String },
    /// A period label that cannot be used as a sheet name.
    InvalidPeriodLabel { label: String, reason: &'static str },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InvalidColor { label, value } => {
                write!(f, "palette entry '{label}': '{value}' is not a #RRGGBB color")
            }
            Self::InvalidPeriodLabel { label, reason } => {
                write!(f, "period label '{label}': {reason}")
            }
        }
    }
}

impl std::error::Error for ReconError {}
