//! Work items carried by the lanes.

use cs_core::BYTES_PER_MB;
use cs_format::{
    Document, DocumentKind, FormatChoice, FormatError, ParseOptions, StringifyOptions,
};

/// How much of a request to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Parse everything.
    #[default]
    Full,
    /// Replace text leaves above `max_leaf_bytes` with a redaction marker.
    ///
    /// Only requests honor this mode; other kinds are always parsed fully.
    Reduced {
        /// Largest text leaf kept verbatim.
        max_leaf_bytes: usize,
    },
}

/// What a task does.
#[derive(Debug, Clone)]
pub enum TaskPayload {
    /// Parse `content` as a document of `kind`.
    Parse {
        /// Raw file contents.
        content: String,
        /// Document kind to produce.
        kind: DocumentKind,
        /// Dialect, or detection.
        format: FormatChoice,
        /// Full or reduced parse.
        mode: ParseMode,
    },
    /// Serialize `document` in `format`.
    Stringify {
        /// The canonical document.
        document: Document,
        /// Target dialect; [`FormatChoice::Auto`] fails.
        format: FormatChoice,
    },
}

/// A payload plus the size used to pick its lane.
#[derive(Debug, Clone)]
pub struct ParseTask {
    /// The work to do.
    pub payload: TaskPayload,
    /// Size used for routing.
    pub size_bytes: u64,
    /// Free-form label carried into logs, typically the source path.
    pub label: Option<String>,
}

/// Result of running a [`ParseTask`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutput {
    /// A parsed document.
    Parsed {
        /// The document.
        document: Document,
        /// Whether a reduced parse dropped any leaf.
        redacted: bool,
    },
    /// Serialized text.
    Stringified(String),
}

impl TaskOutput {
    /// Returns the parsed document, if this is a parse result.
    #[must_use]
    pub fn into_document(self) -> Option<Document> {
        match self {
            Self::Parsed { document, .. } => Some(document),
            Self::Stringified(_) => None,
        }
    }
}

impl ParseTask {
    /// Creates a parse task sized by its content.
    ///
    /// # Examples
    ///
    /// ```
    /// use cs_format::{DocumentKind, FormatChoice};
    /// use cs_lanes::{ParseMode, ParseTask};
    ///
    /// let task = ParseTask::parse("meta {\n  name: a\n}\n", DocumentKind::Request, FormatChoice::Auto, ParseMode::Full);
    /// assert_eq!(task.size_bytes, 19);
    /// assert_eq!(task.script_identity(), "parse-request");
    /// ```
    #[must_use]
    pub fn parse(
        content: impl Into<String>,
        kind: DocumentKind,
        format: FormatChoice,
        mode: ParseMode,
    ) -> Self {
        let content = content.into();
        let size_bytes = content.len() as u64;
        Self {
            payload: TaskPayload::Parse {
                content,
                kind,
                format,
                mode,
            },
            size_bytes,
            label: None,
        }
    }

    /// Creates a stringify task.
    ///
    /// The output size is unknown up front, so the caller supplies a hint
    /// (for example the size of the file being replaced).
    #[must_use]
    pub fn stringify(document: Document, format: FormatChoice, size_hint: u64) -> Self {
        Self {
            payload: TaskPayload::Stringify { document, format },
            size_bytes: size_hint,
            label: None,
        }
    }

    /// Attaches a log label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Size in MB (1 MB = 1024 × 1024 bytes).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_MB as f64
    }

    /// Names the dispatcher routine this task runs.
    #[must_use]
    pub const fn script_identity(&self) -> &'static str {
        match &self.payload {
            TaskPayload::Parse { kind, .. } => match kind {
                DocumentKind::Request => "parse-request",
                DocumentKind::Folder => "parse-folder",
                DocumentKind::Collection => "parse-collection",
                DocumentKind::Environment => "parse-environment",
            },
            TaskPayload::Stringify { document, .. } => match document.kind() {
                DocumentKind::Request => "stringify-request",
                DocumentKind::Folder => "stringify-folder",
                DocumentKind::Collection => "stringify-collection",
                DocumentKind::Environment => "stringify-environment",
            },
        }
    }

    /// Runs the dispatcher on the current thread.
    ///
    /// # Errors
    ///
    /// Returns whatever the dispatcher returns.
    pub fn run(self) -> Result<TaskOutput, FormatError> {
        match self.payload {
            TaskPayload::Parse {
                content,
                kind: DocumentKind::Request,
                format,
                mode: ParseMode::Reduced { max_leaf_bytes },
            } => {
                let reduced =
                    cs_format::parse_request_reduced(&content, ParseOptions::new(format), max_leaf_bytes)?;
                Ok(TaskOutput::Parsed {
                    document: Document::Request(reduced.request),
                    redacted: reduced.redacted,
                })
            }
            TaskPayload::Parse {
                content, kind, format, ..
            } => {
                let document = cs_format::parse_document(kind, &content, ParseOptions::new(format))?;
                Ok(TaskOutput::Parsed {
                    document,
                    redacted: false,
                })
            }
            TaskPayload::Stringify { document, format } => {
                cs_format::stringify_document(&document, StringifyOptions::new(format))
                    .map(TaskOutput::Stringified)
            }
        }
    }
}
