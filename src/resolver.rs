use std::fmt;
use url::Url;

/// Resource kind of a mirrored asset; decides its directory under the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Image,
    Script,
    Stylesheet,
    Font,
}

impl AssetKind {
    pub const ALL: [AssetKind; 4] = [
        AssetKind::Image,
        AssetKind::Script,
        AssetKind::Stylesheet,
        AssetKind::Font,
    ];

    pub fn dir(self) -> &'static str {
        match self {
            AssetKind::Image => "images",
            AssetKind::Script => "js",
            AssetKind::Stylesheet => "css",
            AssetKind::Font => "fonts",
        }
    }

    fn default_name(self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Script => "script.js",
            AssetKind::Stylesheet => "style.css",
            AssetKind::Font => "font",
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir())
    }
}

/// Where a reference was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceOrigin {
    ImageSource,
    ScriptSource,
    StylesheetLink,
    CssUrl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    pub source_url: Url,
    pub kind: AssetKind,
    pub local_name: String,
}

impl ResolvedAsset {
    /// Path relative to the page output, e.g. `images/logo.png`.
    pub fn page_relative_path(&self) -> String {
        format!("{}/{}", self.kind.dir(), self.local_name)
    }

    /// Path relative to a stylesheet in `css/`, e.g. `../fonts/a.woff2`.
    pub fn stylesheet_relative_path(&self) -> String {
        format!("../{}/{}", self.kind.dir(), self.local_name)
    }
}

const FONT_EXTENSIONS: [&str; 3] = [".ttf", ".woff", ".woff2"];

#[derive(Debug, Default, Clone, Copy)]
pub struct AssetResolver;

impl AssetResolver {
    pub fn new() -> Self {
        Self
    }

    /// Joins `reference` against `base` and picks a kind and local name.
    ///
    /// Names come only from the last path segment, so two different URLs
    /// ending in the same segment map to the same file.
    pub fn resolve(
        &self,
        base: &Url,
        reference: &str,
        origin: ReferenceOrigin,
    ) -> Result<ResolvedAsset, url::ParseError> {
        let source_url = base.join(reference.trim())?;
        let segment = last_segment(&source_url);

        let kind = match origin {
            ReferenceOrigin::ImageSource => AssetKind::Image,
            ReferenceOrigin::ScriptSource => AssetKind::Script,
            ReferenceOrigin::StylesheetLink => AssetKind::Stylesheet,
            ReferenceOrigin::CssUrl => {
                let lower = segment.to_ascii_lowercase();
                if FONT_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
                    AssetKind::Font
                } else {
                    AssetKind::Image
                }
            }
        };

        let local_name = if segment.is_empty() {
            kind.default_name().to_string()
        } else {
            sanitize_file_name(&segment)
        };

        Ok(ResolvedAsset {
            source_url,
            kind,
            local_name,
        })
    }
}

pub(crate) fn last_segment(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("")
        .to_string()
}

/// Keeps a name usable both on disk and as an unescaped relative reference.
pub(crate) fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' => c,
            _ => '_',
        })
        .collect()
}
