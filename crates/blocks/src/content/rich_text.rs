//! Rich text feature allow-list.
//!
//! A rich text field enables a set of named editor features. Stored markup
//! may only use tags that one of those features produces; `<p>` and `<br>`
//! are always permitted. Sanitising the markup is left to the renderer.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::error::{UnknownFeature, ValidationError};

/// An editor feature that can be enabled on a rich text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RichTextFeature {
    #[serde(rename = "h2")]
    H2,
    #[serde(rename = "h3")]
    H3,
    #[serde(rename = "h4")]
    H4,
    #[serde(rename = "h5")]
    H5,
    #[serde(rename = "h6")]
    H6,
    #[serde(rename = "bold")]
    Bold,
    #[serde(rename = "italic")]
    Italic,
    #[serde(rename = "ol")]
    OrderedList,
    #[serde(rename = "ul")]
    UnorderedList,
    #[serde(rename = "hr")]
    HorizontalRule,
    #[serde(rename = "link")]
    Link,
    #[serde(rename = "document-link")]
    DocumentLink,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "embed")]
    Embed,
    #[serde(rename = "code")]
    Code,
    #[serde(rename = "superscript")]
    Superscript,
    #[serde(rename = "subscript")]
    Subscript,
    #[serde(rename = "strikethrough")]
    Strikethrough,
    #[serde(rename = "blockquote")]
    Blockquote,
    #[serde(rename = "ai")]
    Ai,
}

impl RichTextFeature {
    /// Every feature, in editor toolbar order.
    pub const ALL: [RichTextFeature; 20] = [
        Self::H2,
        Self::H3,
        Self::H4,
        Self::H5,
        Self::H6,
        Self::Bold,
        Self::Italic,
        Self::OrderedList,
        Self::UnorderedList,
        Self::HorizontalRule,
        Self::Link,
        Self::DocumentLink,
        Self::Image,
        Self::Embed,
        Self::Code,
        Self::Superscript,
        Self::Subscript,
        Self::Strikethrough,
        Self::Blockquote,
        Self::Ai,
    ];

    /// Feature name as used in configuration.
    pub fn name(&self) -> &'static str {
        match self {
            Self::H2 => "h2",
            Self::H3 => "h3",
            Self::H4 => "h4",
            Self::H5 => "h5",
            Self::H6 => "h6",
            Self::Bold => "bold",
            Self::Italic => "italic",
            Self::OrderedList => "ol",
            Self::UnorderedList => "ul",
            Self::HorizontalRule => "hr",
            Self::Link => "link",
            Self::DocumentLink => "document-link",
            Self::Image => "image",
            Self::Embed => "embed",
            Self::Code => "code",
            Self::Superscript => "superscript",
            Self::Subscript => "subscript",
            Self::Strikethrough => "strikethrough",
            Self::Blockquote => "blockquote",
            Self::Ai => "ai",
        }
    }
}

impl fmt::Display for RichTextFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RichTextFeature {
    type Err = UnknownFeature;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|feature| feature.name() == s)
            .ok_or_else(|| UnknownFeature(s.to_string()))
    }
}

/// What a tag needs to be allowed.
enum Requirement {
    Always,
    Feature(RichTextFeature),
    AnyOf(&'static [RichTextFeature]),
    Never,
}

/// Ordered, de-duplicated set of enabled features.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureSet {
    features: Vec<RichTextFeature>,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self::all()
    }
}

impl FeatureSet {
    /// Every feature enabled.
    pub fn all() -> Self {
        Self::new(RichTextFeature::ALL)
    }

    /// Create a set from features, dropping repeats.
    pub fn new(features: impl IntoIterator<Item = RichTextFeature>) -> Self {
        let mut set = Self {
            features: Vec::new(),
        };
        for feature in features {
            if !set.features.contains(&feature) {
                set.features.push(feature);
            }
        }
        set
    }

    /// Build a set from feature names, failing on the first unknown name.
    pub fn from_names<I, S>(names: I) -> Result<Self, UnknownFeature>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let features = names
            .into_iter()
            .map(|name| name.as_ref().trim().parse())
            .collect::<Result<Vec<RichTextFeature>, _>>()?;
        Ok(Self::new(features))
    }

    /// Check whether a feature is enabled.
    pub fn contains(&self, feature: RichTextFeature) -> bool {
        self.features.contains(&feature)
    }

    /// Enabled feature names, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.features.iter().map(RichTextFeature::name).collect()
    }

    /// Return the number of enabled features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Check if no feature is enabled.
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Check stored markup against the enabled features.
    ///
    /// Returns one `DisallowedMarkup` error per distinct offending tag, in
    /// order of first appearance.
    pub fn check_markup(&self, html: &str) -> Vec<ValidationError> {
        let mut rejected: Vec<String> = Vec::new();
        let html = COMMENT_RE.replace_all(html, "");

        for caps in TAG_RE.captures_iter(&html) {
            if !caps[1].is_empty() {
                continue; // closing tag
            }
            let tag = caps[2].to_ascii_lowercase();
            let attrs = caps.get(3).map_or("", |m| m.as_str());

            let allowed = match requirement(&tag, attrs) {
                Requirement::Always => true,
                Requirement::Feature(feature) => self.contains(feature),
                Requirement::AnyOf(features) => features.iter().any(|f| self.contains(*f)),
                Requirement::Never => false,
            };
            if !allowed && !rejected.contains(&tag) {
                rejected.push(tag);
            }
        }

        rejected
            .into_iter()
            .map(|tag| ValidationError::DisallowedMarkup { tag })
            .collect()
    }
}

#[allow(clippy::expect_used)]
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<\s*(/?)\s*([a-zA-Z][a-zA-Z0-9-]*)((?:"[^"]*"|'[^']*'|[^'">])*)>"#)
        .expect("tag pattern compiles")
});

#[allow(clippy::expect_used)]
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern compiles"));

#[allow(clippy::expect_used)]
static ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>/]+))"#)
        .expect("attribute pattern compiles")
});

/// Look up an attribute value inside the raw attribute text of a tag.
fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    ATTR_RE.captures_iter(attrs).find_map(|caps| {
        if !caps[1].eq_ignore_ascii_case(name) {
            return None;
        }
        caps.get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
    })
}

fn requirement(tag: &str, attrs: &str) -> Requirement {
    use RichTextFeature as F;

    match tag {
        "p" | "br" => Requirement::Always,
        "h2" => Requirement::Feature(F::H2),
        "h3" => Requirement::Feature(F::H3),
        "h4" => Requirement::Feature(F::H4),
        "h5" => Requirement::Feature(F::H5),
        "h6" => Requirement::Feature(F::H6),
        "b" | "strong" => Requirement::Feature(F::Bold),
        "i" | "em" => Requirement::Feature(F::Italic),
        "ol" => Requirement::Feature(F::OrderedList),
        "ul" => Requirement::Feature(F::UnorderedList),
        "li" => Requirement::AnyOf(&[F::OrderedList, F::UnorderedList]),
        "hr" => Requirement::Feature(F::HorizontalRule),
        "a" => match attribute(attrs, "linktype") {
            Some(linktype) if linktype.eq_ignore_ascii_case("document") => {
                Requirement::Feature(F::DocumentLink)
            }
            _ => Requirement::Feature(F::Link),
        },
        "img" => Requirement::Feature(F::Image),
        "iframe" => Requirement::Feature(F::Embed),
        "embed" => match attribute(attrs, "embedtype") {
            Some(kind) if kind.eq_ignore_ascii_case("image") => Requirement::Feature(F::Image),
            Some(kind) if kind.eq_ignore_ascii_case("media") => Requirement::Feature(F::Embed),
            _ => Requirement::Never,
        },
        "code" => Requirement::Feature(F::Code),
        "sup" => Requirement::Feature(F::Superscript),
        "sub" => Requirement::Feature(F::Subscript),
        "s" | "del" | "strike" => Requirement::Feature(F::Strikethrough),
        "blockquote" => Requirement::Feature(F::Blockquote),
        _ => Requirement::Never,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn disallowed(errors: &[ValidationError]) -> Vec<&str> {
        errors
            .iter()
            .map(|e| match e {
                ValidationError::DisallowedMarkup { tag } => tag.as_str(),
                other => panic!("unexpected error {other:?}"),
            })
            .collect()
    }

    #[test]
    fn feature_names_round_trip_through_from_str() {
        for feature in RichTextFeature::ALL {
            assert_eq!(feature.name().parse::<RichTextFeature>().unwrap(), feature);
        }
        assert_eq!(
            "table".parse::<RichTextFeature>(),
            Err(UnknownFeature("table".to_string()))
        );
    }

    #[test]
    fn from_names_dedupes_and_trims() {
        let set = FeatureSet::from_names(["bold", " italic ", "bold"]).unwrap();
        assert_eq!(set.names(), vec!["bold", "italic"]);
        assert!(FeatureSet::from_names(["bold", "marquee"]).is_err());
    }

    #[test]
    fn full_set_accepts_every_feature() {
        let html = concat!(
            "<h2>A</h2><h3>B</h3><h4>C</h4><h5>D</h5><h6>E</h6>",
            "<p><b>b</b><i>i</i></p><p><strong>s</strong></p><p><em>e</em></p>",
            "<ol><li>one</li></ol><ul><li>two</li></ul><hr/>",
            "<p><a href=\"https://example.com\">x</a>",
            "<a linktype=\"page\" id=\"3\">page</a>",
            "<a linktype=\"document\" id=\"7\">doc</a></p>",
            "<embed embedtype=\"image\" id=\"1\" format=\"left\" alt=\"\"/>",
            "<embed embedtype=\"media\" url=\"https://youtu.be/x\"/>",
            "<img src=\"/media/a.png\" alt=\"A\">",
            "<iframe src=\"https://player.vimeo.com/video/1\"></iframe>",
            "<p><code>x</code><sup>2</sup><sub>n</sub><s>old</s><br></p>",
            "<p><del>gone</del><strike>struck</strike></p>",
            "<blockquote>quoted</blockquote>",
        );
        assert!(FeatureSet::all().check_markup(html).is_empty());
    }

    #[test]
    fn each_mapped_tag_needs_its_feature() {
        use RichTextFeature as F;

        let cases: &[(&str, RichTextFeature)] = &[
            ("<strong>s</strong>", F::Bold),
            ("<em>e</em>", F::Italic),
            ("<img src=\"/a.png\">", F::Image),
            ("<iframe src=\"https://youtu.be/x\"></iframe>", F::Embed),
            ("<del>d</del>", F::Strikethrough),
            ("<strike>s</strike>", F::Strikethrough),
        ];
        for (html, feature) in cases {
            assert!(
                FeatureSet::new([*feature]).check_markup(html).is_empty(),
                "{html} should pass with {feature}"
            );
            assert_eq!(
                FeatureSet::new([]).check_markup(html).len(),
                1,
                "{html} should fail without {feature}"
            );
        }
    }

    #[test]
    fn quoted_angle_bracket_does_not_end_tag() {
        let set = FeatureSet::new([RichTextFeature::Link]);
        let html = "<a title=\">\" linktype=\"document\" id=\"4\">Report</a>";
        assert_eq!(disallowed(&set.check_markup(html)), vec!["a"]);

        let html = "<embed alt='a > b' embedtype=\"image\" id=\"1\"/>";
        assert!(FeatureSet::all().check_markup(html).is_empty());
    }

    #[test]
    fn commented_markup_is_ignored() {
        let set = FeatureSet::all();
        assert!(set.check_markup("<p>x</p><!-- <u>draft</u> -->").is_empty());
        assert!(
            set.check_markup("<!--\n<script>alert(1)</script>\n--><p>y</p>")
                .is_empty()
        );
        assert_eq!(
            disallowed(&set.check_markup("<!-- a --><u>b</u><!-- c -->")),
            vec!["u"]
        );
    }

    #[test]
    fn preview_paragraph_is_valid() {
        let html = "<h2>Our Mission</h2>\n<p>At our company, <b>quality</b> has \
                    <i>always</i> been our priority. <a href=\"#\">Our products</a></p>";
        assert!(FeatureSet::all().check_markup(html).is_empty());
    }

    #[test]
    fn rejects_tags_outside_allow_list() {
        let html = "<p>Hi</p><script>alert(1)</script><table><tr><td>x</td></tr></table>";
        let errors = FeatureSet::all().check_markup(html);
        assert_eq!(disallowed(&errors), vec!["script", "table", "tr", "td"]);
    }

    #[test]
    fn reports_each_tag_once() {
        let html = "<u>a</u> and <U>b</U>";
        let errors = FeatureSet::all().check_markup(html);
        assert_eq!(disallowed(&errors), vec!["u"]);
    }

    #[test]
    fn disabled_feature_rejects_its_markup() {
        let set = FeatureSet::from_names(["bold", "link"]).unwrap();
        assert!(set.check_markup("<p><b>ok</b> <a href=\"/\">ok</a></p>").is_empty());
        assert_eq!(
            disallowed(&set.check_markup("<h2>T</h2><i>x</i>")),
            vec!["h2", "i"]
        );
    }

    #[test]
    fn document_link_needs_its_own_feature() {
        let set = FeatureSet::new([RichTextFeature::Link]);
        let errors = set.check_markup("<a linktype='document' id='4'>Report</a>");
        assert_eq!(disallowed(&errors), vec!["a"]);

        let set = FeatureSet::new([RichTextFeature::DocumentLink]);
        assert!(set.check_markup("<a linktype=document id=4>Report</a>").is_empty());
        assert_eq!(disallowed(&set.check_markup("<a href=\"/x\">x</a>")), vec!["a"]);
    }

    #[test]
    fn list_items_need_a_list_feature() {
        let set = FeatureSet::new([RichTextFeature::UnorderedList]);
        assert!(set.check_markup("<ul><li>x</li></ul>").is_empty());
        assert_eq!(disallowed(&set.check_markup("<ol><li>x</li></ol>")), vec!["ol"]);
        assert_eq!(disallowed(&FeatureSet::new([]).check_markup("<li>x</li>")), vec!["li"]);
    }

    #[test]
    fn embed_without_known_type_is_rejected() {
        let errors = FeatureSet::all().check_markup("<embed src=\"x.swf\">");
        assert_eq!(disallowed(&errors), vec!["embed"]);
    }

    #[test]
    fn ai_feature_enables_no_markup() {
        let set = FeatureSet::new([RichTextFeature::Ai]);
        assert!(set.check_markup("<p>plain text only</p>").is_empty());
        assert_eq!(disallowed(&set.check_markup("<b>x</b>")), vec!["b"]);
    }

    #[test]
    fn plain_text_and_stray_angle_brackets_pass() {
        let set = FeatureSet::new([]);
        assert!(set.check_markup("1 < 2 and 3 > 2").is_empty());
        assert!(set.check_markup("<!-- note --><p>x</p>").is_empty());
    }

    #[test]
    fn serializes_as_name_list() {
        let set = FeatureSet::from_names(["document-link", "ol"]).unwrap();
        assert_eq!(
            serde_json::to_value(&set).unwrap(),
            serde_json::json!(["document-link", "ol"])
        );
    }
}
