//! Call arguments and their validation against an [`Endpoint`].

use bytes::Bytes;

use crate::{
    catalog::Endpoint,
    error::{TwitterError, TwitterResult},
};

/// Parameter names whose values are uploaded as file parts.
pub const FILE_PARAMS: &[&str] = &["image", "media", "banner"];

/// Binary payload sent as one `multipart/form-data` part.
#[derive(Clone, PartialEq, Eq)]
pub struct FilePart {
    pub file_name: String,
    pub bytes: Bytes,
    pub mime: Option<String>,
}

impl FilePart {
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
            mime: None,
        }
    }

    /// Set the part's content type, e.g. `image/png`.
    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

impl std::fmt::Debug for FilePart {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilePart")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .field("mime", &self.mime)
            .finish()
    }
}

/// One argument value before wire normalisation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Bool(bool),
    Int(i64),
    /// Sent comma-joined
    List(Vec<String>),
    File(FilePart),
}

impl ParamValue {
    /// `None` for values that are sent as absent.
    fn present(self) -> Option<Self> {
        match &self {
            Self::List(items) if items.is_empty() => None,
            _ => Some(self),
        }
    }

    fn into_wire(self) -> WireValue {
        match self {
            Self::Text(text) => WireValue::Text(text),
            Self::Bool(flag) => WireValue::Text(if flag { "true" } else { "false" }.into()),
            Self::Int(n) => WireValue::Text(n.to_string()),
            Self::List(items) => WireValue::Text(items.join(",")),
            Self::File(file) => WireValue::File(file),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<FilePart> for ParamValue {
    fn from(value: FilePart) -> Self {
        Self::File(value)
    }
}

impl<T: ToString> From<Vec<T>> for ParamValue {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.iter().map(ToString::to_string).collect())
    }
}

enum WireValue {
    Text(String),
    File(FilePart),
}

/// Arguments of one [`call`](crate::TwitterClient::call).
///
/// Positional values fill the endpoint's URL, required and optional
/// parameters in that order. `None` values and empty lists are dropped.
#[derive(Debug, Clone, Default)]
pub struct CallArgs {
    positional: Vec<Option<ParamValue>>,
    named: Vec<(String, Option<ParamValue>)>,
}

impl CallArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional value.
    #[must_use]
    pub fn arg(self, value: impl Into<ParamValue>) -> Self {
        self.arg_opt(Some(value))
    }

    /// Append a positional value that may be absent; it still takes a slot.
    #[must_use]
    pub fn arg_opt(mut self, value: Option<impl Into<ParamValue>>) -> Self {
        self.positional
            .push(value.map(Into::into).and_then(ParamValue::present));
        self
    }

    /// Set a named value, replacing an earlier one with the same key.
    #[must_use]
    pub fn param(self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.param_opt(key, Some(value))
    }

    /// Set a named value that may be absent.
    #[must_use]
    pub fn param_opt(mut self, key: impl Into<String>, value: Option<impl Into<ParamValue>>) -> Self {
        let key = key.into();
        let value = value.map(Into::into).and_then(ParamValue::present);
        match self.named.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.named.push((key, value)),
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// Arguments validated against an endpoint, ready to send.
#[derive(Debug, Clone, Default)]
pub struct PreparedCall {
    /// Values substituted into the path, in `url_params` order
    pub url_values: Vec<(String, String)>,

    /// Query or form parameters
    pub params: Vec<(String, String)>,

    /// File parts; non-empty makes the request multipart
    pub files: Vec<(String, FilePart)>,
}

impl PreparedCall {
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        !self.files.is_empty()
    }
}

#[derive(Default)]
struct Split {
    texts: Vec<(String, String)>,
    files: Vec<(String, FilePart)>,
}

impl Split {
    fn push(&mut self, key: String, value: ParamValue) -> TwitterResult<()> {
        let is_file_key = FILE_PARAMS.contains(&key.as_str());
        match (value.into_wire(), is_file_key) {
            (WireValue::File(file), true) => self.files.push((key, file)),
            (WireValue::Text(text), false) => self.texts.push((key, text)),
            (WireValue::File(_), false) => {
                return Err(TwitterError::Parameter(format!(
                    "Parameter {key} does not take a file"
                )));
            }
            (WireValue::Text(_), true) => {
                return Err(TwitterError::Parameter(format!(
                    "Parameter {key} expects a file"
                )));
            }
        }
        Ok(())
    }

    fn contains(&self, key: &str) -> bool {
        self.texts.iter().any(|(k, _)| k == key) || self.files.iter().any(|(k, _)| k == key)
    }

    fn keys(&self) -> impl Iterator<Item = &str> {
        self.texts
            .iter()
            .map(|(k, _)| k.as_str())
            .chain(self.files.iter().map(|(k, _)| k.as_str()))
    }
}

/// Validate `args` against `endpoint`.
///
/// Checks, in order: duplicates between positional and named values, missing
/// URL parameters, missing required parameters, unsupported parameters.
///
/// # Errors
///
/// [`TwitterError::Parameter`] naming the offending parameters.
pub fn prepare(endpoint: &Endpoint, args: CallArgs) -> TwitterResult<PreparedCall> {
    let mut split = Split::default();
    for (key, value) in args.named {
        if let Some(value) = value {
            split.push(key, value)?;
        }
    }

    if !args.positional.is_empty() {
        let names: Vec<&str> = endpoint.param_names().collect();
        if args.positional.len() > names.len() {
            return Err(TwitterError::Parameter(format!(
                "Too many positional arguments: {} accepts at most {}, got {}",
                endpoint.name,
                names.len(),
                args.positional.len()
            )));
        }

        let mut positional = Split::default();
        for (key, value) in names.into_iter().zip(args.positional) {
            if let Some(value) = value {
                positional.push(key.to_string(), value)?;
            }
        }

        let duplicates: Vec<&str> = positional.keys().filter(|k| split.contains(k)).collect();
        if !duplicates.is_empty() {
            return Err(TwitterError::Parameter(format!(
                "Duplicate values for parameters: {}",
                duplicates.join(", ")
            )));
        }

        split.texts.extend(positional.texts);
        split.files.extend(positional.files);
    }

    let mut url_values = Vec::with_capacity(endpoint.url_params.len());
    let mut missing = Vec::new();
    for &name in endpoint.url_params {
        match split.texts.iter().position(|(k, _)| k == name) {
            Some(index) => url_values.push(split.texts.remove(index)),
            None => missing.push(name),
        }
    }
    if !missing.is_empty() {
        return Err(TwitterError::Parameter(format!(
            "Missing URL parameters: {}",
            missing.join(", ")
        )));
    }

    let missing: Vec<&str> = endpoint
        .required_params
        .iter()
        .copied()
        .filter(|name| !split.contains(name))
        .collect();
    if !missing.is_empty() {
        return Err(TwitterError::Parameter(format!(
            "Missing required parameters: {}",
            missing.join(", ")
        )));
    }

    let unsupported: Vec<&str> = split.keys().filter(|k| !endpoint.accepts(k)).collect();
    if !unsupported.is_empty() {
        return Err(TwitterError::Parameter(format!(
            "Unsupported parameters specified: {}",
            unsupported.join(", ")
        )));
    }

    Ok(PreparedCall {
        url_values,
        params: split.texts,
        files: split.files,
    })
}
