//! Image reference matching and tag rewriting
//!
//! Values files describe container images in many ways. A mapping is treated
//! as an image reference when its `image`, `repository`, `registry` and `tag`
//! attributes (present = non-empty string) form one of six shapes:
//!
//! ```yaml
//! a: {image: app:1.0}                                   # image only
//! b: {repository: app:1.0}                              # repository only
//! c: {image: app, tag: "1.0"}                           # image + tag
//! d: {repository: app, tag: "1.0"}                      # repository + tag
//! e: {registry: reg.io, repository: app:1.0}            # repository + registry
//! f: {registry: reg.io, repository: app, tag: "1.0"}    # all three
//! ```
//!
//! Any other combination is simply not an image reference.

use indexmap::IndexSet;
use serde::Serialize;
use std::ops::Add;

use crate::document::{Mapping, Node, ScalarKind};
use crate::error::{CoreError, Result};

/// Set of image identifiers to retag (exact, case-sensitive match)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageSet(IndexSet<String>);

impl ImageSet {
    /// Parse a list such as `app,reg.io/worker` or `["app", 'reg.io/worker']`
    ///
    /// Entries are trimmed and empty entries dropped; an empty list is an error.
    pub fn parse(raw: &str) -> Result<Self> {
        let set: Self = raw
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .replace(['"', '\''], "")
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .collect();

        if set.is_empty() {
            return Err(CoreError::NoImages);
        }
        Ok(set)
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.0.contains(identifier)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ImageSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Result of checking one candidate mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    /// Not an image reference, or not one of the targets
    NotFound,
    /// Targeted, tag already at the desired version
    Found,
    /// Targeted, tag rewritten
    Updated,
}

/// Running count of targeted references
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    /// References that matched a target (changed or not)
    pub found: usize,
    /// References whose tag was rewritten
    pub updated: usize,
}

impl Tally {
    pub fn new(found: usize, updated: usize) -> Self {
        Self { found, updated }
    }

    /// Count one more outcome
    #[must_use]
    pub fn record(self, outcome: MatchOutcome) -> Self {
        match outcome {
            MatchOutcome::NotFound => self,
            MatchOutcome::Found => Self {
                found: self.found + 1,
                ..self
            },
            MatchOutcome::Updated => Self {
                found: self.found + 1,
                updated: self.updated + 1,
            },
        }
    }
}

impl Add for Tally {
    type Output = Tally;

    fn add(self, other: Tally) -> Tally {
        Tally {
            found: self.found + other.found,
            updated: self.updated + other.updated,
        }
    }
}

/// Join URL segments with `/`, stripping trailing (not leading) slashes from each
pub fn urljoin<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .map(|s| s.as_ref().trim_end_matches('/').to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Split a reference into base and tag on its last `:`
///
/// A reference without any colon is all base, with an empty tag.
pub fn split_reference(reference: &str) -> (&str, &str) {
    reference.rsplit_once(':').unwrap_or((reference, ""))
}

/// A mapping recognised as an image reference, by shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRef<'a> {
    /// `image: base:tag`
    ImageOnly { image: &'a str },
    /// `repository: base:tag`
    RepositoryOnly { repository: &'a str },
    /// `image: base` + `tag`
    ImageTag { image: &'a str, tag: &'a str },
    /// `repository: base` + `tag`
    RepositoryTag { repository: &'a str, tag: &'a str },
    /// `registry` + `repository: base:tag`
    RepositoryRegistry {
        registry: &'a str,
        repository: &'a str,
    },
    /// `registry` + `repository` + `tag`
    Full {
        registry: &'a str,
        repository: &'a str,
        tag: &'a str,
    },
}

/// Non-empty string attribute of a candidate
fn attribute<'a>(candidate: &'a Mapping, key: &str) -> Option<&'a str> {
    candidate.get_str(key).filter(|value| !value.is_empty())
}

impl<'a> ImageRef<'a> {
    /// Classify a mapping by which of its four attributes are present
    pub fn classify(candidate: &'a Mapping) -> Option<Self> {
        let image = attribute(candidate, "image");
        let repository = attribute(candidate, "repository");
        let registry = attribute(candidate, "registry");
        let tag = attribute(candidate, "tag");

        match (image, repository, registry, tag) {
            (Some(_), Some(_), Some(_), Some(_)) => None,
            (Some(image), _, None, None) => Some(Self::ImageOnly { image }),
            (None, Some(repository), None, None) => Some(Self::RepositoryOnly { repository }),
            (None, Some(repository), Some(registry), Some(tag)) => Some(Self::Full {
                registry,
                repository,
                tag,
            }),
            (Some(image), _, None, Some(tag)) => Some(Self::ImageTag { image, tag }),
            (None, Some(repository), None, Some(tag)) => {
                Some(Self::RepositoryTag { repository, tag })
            }
            (_, Some(repository), Some(registry), None) => Some(Self::RepositoryRegistry {
                registry,
                repository,
            }),
            _ => None,
        }
    }

    /// Identifier matched against the target set
    pub fn identifier(&self) -> String {
        match *self {
            Self::ImageOnly { image } => split_reference(image).0.to_string(),
            Self::RepositoryOnly { repository } => split_reference(repository).0.to_string(),
            Self::ImageTag { image, .. } => image.to_string(),
            Self::RepositoryTag { repository, .. } => repository.to_string(),
            Self::RepositoryRegistry {
                registry,
                repository,
            } => urljoin([registry, split_reference(repository).0]),
            Self::Full {
                registry,
                repository,
                ..
            } => urljoin([registry, repository]),
        }
    }

    /// Tag currently in effect
    pub fn current_tag(&self) -> &'a str {
        match *self {
            Self::ImageOnly { image } => split_reference(image).1,
            Self::RepositoryOnly { repository }
            | Self::RepositoryRegistry { repository, .. } => split_reference(repository).1,
            Self::ImageTag { tag, .. }
            | Self::RepositoryTag { tag, .. }
            | Self::Full { tag, .. } => tag,
        }
    }

    /// Field to overwrite, and its new value, to move to `version`
    fn retag(&self, version: &str) -> (&'static str, String) {
        match *self {
            Self::ImageOnly { image } => {
                ("image", format!("{}:{}", split_reference(image).0, version))
            }
            Self::RepositoryOnly { repository } | Self::RepositoryRegistry { repository, .. } => (
                "repository",
                format!("{}:{}", split_reference(repository).0, version),
            ),
            Self::ImageTag { .. } | Self::RepositoryTag { .. } | Self::Full { .. } => {
                ("tag", version.to_string())
            }
        }
    }
}

/// Check one candidate mapping and retag it if it is a target
pub fn process(candidate: &mut Mapping, targets: &ImageSet, version: &str) -> MatchOutcome {
    let line = candidate.line();
    let (field, value) = {
        let Some(reference) = ImageRef::classify(candidate) else {
            return MatchOutcome::NotFound;
        };
        let identifier = reference.identifier();
        if !targets.contains(&identifier) {
            tracing::trace!(line, %identifier, "image reference is not targeted");
            return MatchOutcome::NotFound;
        }
        if reference.current_tag().trim() == version {
            tracing::debug!(line, %identifier, version, "image tag already current");
            return MatchOutcome::Found;
        }
        tracing::debug!(
            line,
            %identifier,
            from = reference.current_tag(),
            to = version,
            "updating image tag"
        );
        reference.retag(version)
    };

    // classify only yields shapes whose retagged field is a string scalar
    let Some(Node::Scalar(scalar)) = candidate.get_mut(field) else {
        return MatchOutcome::NotFound;
    };
    scalar.set(value);
    MatchOutcome::Updated
}

/// How a mapping holds its `image` key
enum ImageField {
    /// `image: <string>`: the mapping itself is the candidate
    Inline,
    /// `image: {...}`: the nested mapping is the candidate
    Nested,
    Absent,
}

fn image_field(mapping: &Mapping) -> ImageField {
    match mapping.get("image") {
        Some(Node::Scalar(scalar)) if scalar.kind() == ScalarKind::String => ImageField::Inline,
        Some(Node::Mapping(_)) => ImageField::Nested,
        _ => ImageField::Absent,
    }
}

/// Retag every targeted image reference below `node`
///
/// A mapping with a string `image` is processed as a candidate and its other
/// keys are not visited. A mapping with a nested `image` mapping has that
/// mapping processed, then every mapping child is walked, the `image` mapping
/// included. Sequences are not traversed.
pub fn walk(node: &mut Node, targets: &ImageSet, version: &str) -> Tally {
    match node {
        Node::Mapping(mapping) => walk_mapping(mapping, targets, version),
        _ => Tally::default(),
    }
}

fn walk_mapping(mapping: &mut Mapping, targets: &ImageSet, version: &str) -> Tally {
    let start = match image_field(mapping) {
        ImageField::Inline => {
            return Tally::default().record(process(mapping, targets, version));
        }
        ImageField::Nested => {
            let outcome = mapping
                .get_mut("image")
                .and_then(Node::as_mapping_mut)
                .map_or(MatchOutcome::NotFound, |image| {
                    process(image, targets, version)
                });
            Tally::default().record(outcome)
        }
        ImageField::Absent => Tally::default(),
    };

    mapping.iter_mut().fold(start, |tally, (_, child)| match child {
        Node::Mapping(nested) => tally + walk_mapping(nested, targets, version),
        _ => tally,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, DocumentProcessor};

    fn parse(source: &str) -> (DocumentProcessor, Document) {
        let processor = DocumentProcessor::new();
        let doc = processor.parse(source).unwrap();
        (processor, doc)
    }

    fn targets(images: &[&str]) -> ImageSet {
        images.iter().copied().collect()
    }

    fn run(source: &str, images: &[&str], version: &str) -> (Tally, String) {
        let (processor, mut doc) = parse(source);
        let tally = walk(doc.root_mut().unwrap(), &targets(images), version);
        (tally, processor.render(&doc).unwrap())
    }

    fn classify(source: &str) -> Option<String> {
        let (_, doc) = parse(source);
        let mapping = doc.root().and_then(Node::as_mapping).unwrap();
        ImageRef::classify(mapping).map(|r| format!("{:?}", r))
    }

    #[test]
    fn test_split_reference() {
        assert_eq!(split_reference("myhost:5000/app:1.2.3"), ("myhost:5000/app", "1.2.3"));
        assert_eq!(split_reference("app:1.0"), ("app", "1.0"));
        assert_eq!(split_reference("app"), ("app", ""));
        assert_eq!(split_reference("myhost:5000/app"), ("myhost", "5000/app"));
    }

    #[test]
    fn test_urljoin() {
        assert_eq!(
            urljoin(["registry.example.com/", "team/app"]),
            "registry.example.com/team/app"
        );
        assert_eq!(urljoin(["reg.io//", "/app/"]), "reg.io//app");
        assert_eq!(urljoin(["reg.io", "app"]), "reg.io/app");
    }

    #[test]
    fn test_image_set_parse() {
        let set = ImageSet::parse(r#"["app", 'reg.io/worker' , ,other]"#).unwrap();
        assert_eq!(set.iter().collect::<Vec<_>>(), vec!["app", "reg.io/worker", "other"]);
        assert!(set.contains("reg.io/worker"));
        assert!(!set.contains("App"));

        assert!(matches!(ImageSet::parse("[]"), Err(CoreError::NoImages)));
        assert!(matches!(ImageSet::parse(" , "), Err(CoreError::NoImages)));
    }

    #[test]
    fn test_tally_accumulates() {
        let tally = Tally::default()
            .record(MatchOutcome::Updated)
            .record(MatchOutcome::Found)
            .record(MatchOutcome::NotFound);
        assert_eq!(tally, Tally::new(2, 1));
        assert_eq!(tally + Tally::new(1, 1), Tally::new(3, 2));
    }

    #[test]
    fn test_classify_shapes() {
        assert!(classify("image: app:1").unwrap().starts_with("ImageOnly"));
        assert!(classify("repository: app:1").unwrap().starts_with("RepositoryOnly"));
        assert!(classify("image: app\ntag: '1'").unwrap().starts_with("ImageTag"));
        assert!(classify("repository: app\ntag: '1'").unwrap().starts_with("RepositoryTag"));
        assert!(classify("registry: r\nrepository: app").unwrap().starts_with("RepositoryRegistry"));
        assert!(classify("registry: r\nrepository: app\ntag: '1'").unwrap().starts_with("Full"));
        assert!(classify("image: app\nrepository: other").unwrap().starts_with("ImageOnly"));
    }

    #[test]
    fn test_unrecognised_shapes_are_untouched() {
        let cases = [
            "registry: reg.io\n",
            "tag: 1.0.0\n",
            "image: app\nrepository: app\nregistry: reg.io\ntag: '1.0'\n",
            "name: app\n",
            "image: app\nregistry: reg.io\n",
            "repository: ''\ntag: '1.0'\n",
            "registry: reg.io\ntag: '1.0'\n",
        ];
        for source in cases {
            let (tally, rendered) = run(source, &["app", "reg.io/app"], "9.9.9");
            assert_eq!(tally, Tally::default(), "source: {}", source);
            assert_eq!(rendered, source);
        }
    }

    #[test]
    fn test_image_only_updated() {
        let (tally, rendered) = run("image: app:1.0.0\n", &["app"], "1.1.0");
        assert_eq!(tally, Tally::new(1, 1));
        assert_eq!(rendered, "image: app:1.1.0\n");
    }

    #[test]
    fn test_repository_tag_already_current() {
        let source = "repository: app\ntag: 1.0.0\n";
        let (tally, rendered) = run(source, &["app"], "1.0.0");
        assert_eq!(tally, Tally::new(1, 0));
        assert_eq!(rendered, source);
    }

    #[test]
    fn test_repository_registry_updated() {
        let (tally, rendered) = run("repository: app\nregistry: reg.io\n", &["reg.io/app"], "2.0");
        assert_eq!(tally, Tally::new(1, 1));
        assert_eq!(rendered, "repository: app:2.0\nregistry: reg.io\n");
    }

    #[test]
    fn test_full_reference_joins_registry() {
        let source = "image:\n  registry: reg.io/\n  repository: team/app\n  tag: \"1.0\"\n";
        let (tally, rendered) = run(source, &["reg.io/team/app"], "1.1");
        assert_eq!(tally, Tally::new(1, 1));
        assert_eq!(
            rendered,
            "image:\n  registry: reg.io/\n  repository: team/app\n  tag: \"1.1\"\n"
        );
    }

    #[test]
    fn test_split_uses_last_colon_only() {
        let (tally, rendered) = run("image: myhost:5000/app:1.2.3\n", &["myhost:5000/app"], "1.3.0");
        assert_eq!(tally, Tally::new(1, 1));
        assert_eq!(rendered, "image: myhost:5000/app:1.3.0\n");

        let (tally, rendered) = run("image: myhost:5000/app\n", &["myhost:5000/app"], "1.3.0");
        assert_eq!(tally, Tally::default());
        assert_eq!(rendered, "image: myhost:5000/app\n");

        let (tally, rendered) = run("image: myhost:5000/app\n", &["myhost"], "1.3.0");
        assert_eq!(tally, Tally::new(1, 1));
        assert_eq!(rendered, "image: myhost:1.3.0\n");
    }

    #[test]
    fn test_process_rewrites_only_the_tag_field() {
        let (processor, mut doc) = parse("repository: app # pinned\ntag: \"1.0\"\npullPolicy: Always\n");
        let candidate = doc.root_mut().and_then(Node::as_mapping_mut).unwrap();

        assert_eq!(process(candidate, &targets(&["app"]), "1.1"), MatchOutcome::Updated);
        assert_eq!(candidate.get_str("tag"), Some("1.1"));
        assert_eq!(process(candidate, &targets(&["app"]), "1.1"), MatchOutcome::Found);
        assert_eq!(process(candidate, &targets(&["other"]), "1.2"), MatchOutcome::NotFound);

        assert_eq!(
            processor.render(&doc).unwrap(),
            "repository: app # pinned\ntag: \"1.1\"\npullPolicy: Always\n"
        );
    }

    #[test]
    fn test_tag_compared_trimmed() {
        let source = "image: app\ntag: ' 1.0 '\n";
        let (tally, rendered) = run(source, &["app"], "1.0");
        assert_eq!(tally, Tally::new(1, 0));
        assert_eq!(rendered, source);
    }

    #[test]
    fn test_untargeted_reference() {
        let source = "repository: other\ntag: '1.0'\n";
        let (tally, rendered) = run(source, &["app"], "2.0");
        assert_eq!(tally, Tally::default());
        assert_eq!(rendered, source);
    }

    #[test]
    fn test_inline_image_short_circuits_siblings() {
        let source = "image: sidecar:1.0\nnested:\n  image: sidecar:1.0\n";
        let (tally, rendered) = run(source, &["sidecar"], "2.0");
        assert_eq!(tally, Tally::new(1, 1));
        assert_eq!(rendered, "image: sidecar:2.0\nnested:\n  image: sidecar:1.0\n");
    }

    #[test]
    fn test_inline_image_untargeted_still_short_circuits() {
        let source = "image: other:1.0\nnested:\n  image: sidecar:1.0\n";
        let (tally, rendered) = run(source, &["sidecar"], "2.0");
        assert_eq!(tally, Tally::default());
        assert_eq!(rendered, source);
    }

    #[test]
    fn test_nested_image_continues_to_siblings() {
        let source = "\
app:
  image:
    repository: app
    tag: 1.0.0
  worker:
    image: worker:1.0.0
";
        let (tally, rendered) = run(source, &["app", "worker"], "1.1.0");
        assert_eq!(tally, Tally::new(2, 2));
        assert_eq!(
            rendered,
            "app:\n  image:\n    repository: app\n    tag: 1.1.0\n  worker:\n    image: worker:1.1.0\n"
        );
    }

    #[test]
    fn test_nested_image_mapping_is_walked_too() {
        let source = "\
app:
  image:
    repository: app
    tag: \"1.0\"
    sidecar:
      image: side:1.0
";
        let (tally, rendered) = run(source, &["app", "side"], "2.0");
        assert_eq!(tally, Tally::new(2, 2));
        assert_eq!(
            rendered,
            "app:\n  image:\n    repository: app\n    tag: \"2.0\"\n    sidecar:\n      image: side:2.0\n"
        );
    }

    #[test]
    fn test_untargeted_nested_image_still_walked() {
        let source = "\
image:
  repository: other
  tag: \"1.0\"
  extra:
    image:
      repository: worker
      tag: 1.0.0
";
        let (tally, rendered) = run(source, &["worker"], "1.1.0");
        assert_eq!(tally, Tally::new(1, 1));
        assert_eq!(rendered, source.replace("tag: 1.0.0", "tag: 1.1.0"));
    }

    #[test]
    fn test_sequences_are_not_traversed() {
        let source = "containers:\n  - image: app:1.0\n";
        let (tally, rendered) = run(source, &["app"], "2.0");
        assert_eq!(tally, Tally::default());
        assert_eq!(rendered, source);
    }

    #[test]
    fn test_walk_is_idempotent() {
        let source = "\
# images
api:
  image:
    registry: ghcr.io
    repository: org/api # pinned
    tag: \"0.9.0\"
worker:
  image: ghcr.io/org/worker:0.9.0
";
        let images = ["ghcr.io/org/api", "ghcr.io/org/worker"];
        let (processor, mut doc) = parse(source);
        let set = targets(&images);

        let first = walk(doc.root_mut().unwrap(), &set, "1.0.0");
        assert_eq!(first, Tally::new(2, 2));
        let rendered = processor.render(&doc).unwrap();

        let mut again = processor.parse(&rendered).unwrap();
        let second = walk(again.root_mut().unwrap(), &set, "1.0.0");
        assert_eq!(second, Tally::new(2, 0));
        assert_eq!(processor.render(&again).unwrap(), rendered);

        insta::assert_snapshot!(rendered, @r#"
# images
api:
  image:
    registry: ghcr.io
    repository: org/api # pinned
    tag: "1.0.0"
worker:
  image: ghcr.io/org/worker:1.0.0
"#);
    }

    #[test]
    fn test_non_mapping_root() {
        let (_, mut doc) = parse("- image: app:1.0\n");
        assert_eq!(walk(doc.root_mut().unwrap(), &targets(&["app"]), "2.0"), Tally::default());
    }
}
