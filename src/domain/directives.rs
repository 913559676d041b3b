//! Inline image directives embedded in chat content.
//!
//! A directive looks like `[CQ:image,file=abc.image,url=https://...]`: a
//! bracketed marker followed by comma-separated `key=value` parameters.

use std::ops::Range;

use once_cell::sync::Lazy;
use regex::Regex;

static IMAGE_DIRECTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[CQ:image,([^\]]+)\]").expect("image directive pattern is valid")
});

const URL_PARAM: &str = "url";
const FILE_PARAM: &str = "file";
const PARAM_SEPARATOR: char = ',';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDirective {
    /// Position among all image directives in the content, starting at zero.
    pub index: usize,
    /// Byte range of the whole directive in the scanned content.
    pub span: Range<usize>,
    params: Vec<String>,
}

impl ImageDirective {
    /// Value of the `url` parameter with `&amp;` decoded.
    pub fn url(&self) -> Option<String> {
        self.param(URL_PARAM)
            .map(|value| value.replace("&amp;", "&"))
            .filter(|value| !value.is_empty())
    }

    pub fn file(&self) -> Option<&str> {
        self.param(FILE_PARAM)
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .filter_map(|param| param.split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    /// Render the directive pointing at `file_url` instead of its remote `url`.
    ///
    /// Every `url` parameter is dropped. Existing `file` parameters are
    /// overwritten; when there is none, one is prepended.
    pub fn rewrite(&self, file_url: &str) -> String {
        let file_param = format!("{FILE_PARAM}={file_url}");
        let mut saw_file = false;
        let mut params: Vec<String> = self
            .params
            .iter()
            .filter(|param| param_key(param) != URL_PARAM)
            .map(|param| {
                if param_key(param) == FILE_PARAM {
                    saw_file = true;
                    file_param.clone()
                } else {
                    param.clone()
                }
            })
            .collect();

        if !saw_file {
            params.insert(0, file_param);
        }

        format!("[CQ:image,{}]", params.join(","))
    }
}

fn param_key(param: &str) -> &str {
    param.split_once('=').map_or(param, |(key, _)| key)
}

/// Find every image directive in `content`, in order of appearance.
pub fn find_image_directives(content: &str) -> Vec<ImageDirective> {
    IMAGE_DIRECTIVE
        .captures_iter(content)
        .enumerate()
        .filter_map(|(index, captures)| {
            let whole = captures.get(0)?;
            let raw = captures.get(1)?.as_str();
            let params = raw
                .split(PARAM_SEPARATOR)
                .map(str::trim)
                .filter(|param| !param.is_empty())
                .map(str::to_string)
                .collect();
            Some(ImageDirective {
                index,
                span: whole.range(),
                params,
            })
        })
        .collect()
}

/// Replace non-overlapping spans of `content`. `replacements` must be sorted by span start.
pub fn splice(content: &str, replacements: &[(Range<usize>, String)]) -> String {
    let mut output = String::with_capacity(content.len());
    let mut cursor = 0;
    for (span, replacement) in replacements {
        output.push_str(&content[cursor..span.start]);
        output.push_str(replacement);
        cursor = span.end;
    }
    output.push_str(&content[cursor..]);
    output
}
