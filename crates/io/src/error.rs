use std::fmt;

/// Failure while turning a report into an artifact.
#[derive(Debug)]
pub enum RenderError {
    /// A chart spec that cannot be drawn (mismatched lengths, non-finite values).
    InvalidChart { chart: String, reason: String },
    /// The xlsx writer rejected something.
    Workbook(String),
    /// plotters failed to paint a chart raster.
    Chart(String),
    /// The PDF writer rejected something.
    Document(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::InvalidChart { chart, reason } => {
                write!(f, "invalid chart '{chart}': {reason}")
            }
            RenderError::Workbook(msg) => write!(f, "workbook: {msg}"),
            RenderError::Chart(msg) => write!(f, "chart: {msg}"),
            RenderError::Document(msg) => write!(f, "document: {msg}"),
        }
    }
}

impl std::error::Error for RenderError {}

impl From<rust_xlsxwriter::XlsxError> for RenderError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        RenderError::Workbook(e.to_string())
    }
}

impl From<lopdf::Error> for RenderError {
    fn from(e: lopdf::Error) -> Self {
        RenderError::Document(e.to_string())
    }
}

impl<E> From<plotters::drawing::DrawingAreaErrorKind<E>> for RenderError
where
    E: std::error::Error + Send + Sync,
{
    fn from(e: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        RenderError::Chart(e.to_string())
    }
}
