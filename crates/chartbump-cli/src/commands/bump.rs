//! Bump command - patch chart metadata and image tags

use chartbump_core::{ChartPatch, DocumentProcessor, FieldChange, ImageSet, Tally, walk};
use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args};
use std::path::{Path, PathBuf};

use crate::display::{BumpReport, ChartReport, ImageReport, Printer};
use crate::error::{CliError, Result};
use crate::util::{in_working_dir, resolve_version};

/// Options of the bump command
///
/// Every option can also be set through a `PLUGIN_*` environment variable.
#[derive(Args, Debug, Clone)]
pub struct BumpArgs {
    /// Chart directory; file paths are resolved against it
    #[arg(long, env = "PLUGIN_WORKING_DIR")]
    pub working_dir: PathBuf,

    /// Chart metadata file
    #[arg(long, env = "PLUGIN_CHART_FILE", default_value = "Chart.yaml")]
    pub chart_file: PathBuf,

    /// New chart version
    #[arg(long, env = "PLUGIN_CHART_VERSION")]
    pub chart_version: Option<String>,

    /// File whose first line is the new chart version
    #[arg(long, env = "PLUGIN_CHART_VERSION_FILE")]
    pub chart_version_file: Option<PathBuf>,

    /// Leave the chart version alone
    #[arg(
        long,
        env = "PLUGIN_SKIP_CHART_VERSION",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub skip_chart_version: bool,

    /// New app version
    #[arg(long, env = "PLUGIN_APP_VERSION")]
    pub app_version: Option<String>,

    /// File whose first line is the new app version
    #[arg(long, env = "PLUGIN_APP_VERSION_FILE")]
    pub app_version_file: Option<PathBuf>,

    /// Leave the app version alone
    #[arg(
        long,
        env = "PLUGIN_SKIP_APP_VERSION",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub skip_app_version: bool,

    /// Values file holding image references
    #[arg(long, env = "PLUGIN_VALUES_FILE", default_value = "values.yaml")]
    pub values_file: PathBuf,

    /// Images to retag, e.g. `app,registry.io/worker`
    #[arg(long, env = "PLUGIN_IMAGE")]
    pub image: Option<String>,

    /// New image tag
    #[arg(long, visible_alias = "version", env = "PLUGIN_IMAGE_VERSION")]
    pub image_version: Option<String>,

    /// File whose first line is the new image tag
    #[arg(long, visible_alias = "version-file", env = "PLUGIN_IMAGE_VERSION_FILE")]
    pub image_version_file: Option<PathBuf>,

    /// Fail when no chart version is given
    #[arg(
        long,
        env = "PLUGIN_ERROR_NO_CHART_VERSION",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub error_no_chart_version: bool,

    /// Fail when no app version is given
    #[arg(
        long,
        env = "PLUGIN_ERROR_NO_APP_VERSION",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub error_no_app_version: bool,

    /// Fail when images are given without a version
    #[arg(
        long,
        env = "PLUGIN_ERROR_NO_IMAGE_VERSION",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub error_no_image_version: bool,

    /// Fail when no image reference matches
    #[arg(
        long,
        env = "PLUGIN_ERROR_NO_TAGS",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "true",
        default_missing_value = "true"
    )]
    pub error_no_tags: bool,

    /// Fail when matching image tags are all already current
    #[arg(
        long,
        env = "PLUGIN_ERROR_NO_CHANGE",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub error_no_change: bool,

    /// Fail when nothing changed in chart, app or image versions
    #[arg(
        long,
        env = "PLUGIN_ERROR_NO_RELEASE",
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        num_args = 0..=1,
        default_value = "false",
        default_missing_value = "true"
    )]
    pub error_no_release: bool,

    /// Print a JSON report instead of progress output
    #[arg(long, env = "PLUGIN_JSON")]
    pub json: bool,
}

/// Images to retag and the tag to move them to
struct ImageTarget {
    images: ImageSet,
    version: String,
}

pub fn run(args: &BumpArgs) -> Result<BumpReport> {
    let printer = Printer::new(args.json);

    let chart_version = requested_version(
        &printer,
        args.skip_chart_version,
        args.chart_version.as_deref(),
        args.chart_version_file.as_deref(),
        args.error_no_chart_version,
        "chart-version",
        "chart",
    )?;
    let app_version = requested_version(
        &printer,
        args.skip_app_version,
        args.app_version.as_deref(),
        args.app_version_file.as_deref(),
        args.error_no_app_version,
        "app-version",
        "app",
    )?;
    let image_target = image_target(&printer, args)?;

    let working_dir = working_dir(&args.working_dir)?;
    tracing::debug!(
        working_dir = %working_dir.display(),
        chart_version = ?chart_version,
        app_version = ?app_version,
        image_version = ?image_target.as_ref().map(|t| t.version.as_str()),
        "resolved versions"
    );
    printer.step(format!("Bumping versions in {}", working_dir.display()));

    let processor = DocumentProcessor::new();
    let mut report = BumpReport::default();

    let patch = ChartPatch::new(chart_version, app_version);
    if !patch.is_empty() {
        let chart = bump_chart(&processor, &printer, &working_dir, &args.chart_file, patch)?;
        report.release |= chart.saved;
        report.chart = Some(chart);
    }

    if let Some(target) = image_target {
        let images = bump_images(&processor, &printer, &working_dir, &args.values_file, target)?;
        report.release |= images.saved;
        report.images = Some(images);
    }

    printer.finish(&report)?;
    enforce_policy(args, &report)?;
    Ok(report)
}

/// Resolve one chart field's desired version, applying its skip/error flags
fn requested_version(
    printer: &Printer,
    skip: bool,
    explicit: Option<&str>,
    file: Option<&Path>,
    required: bool,
    param: &str,
    label: &str,
) -> Result<Option<String>> {
    if skip {
        return Ok(None);
    }
    let version = resolve_version(explicit, file)?;
    if version.is_none() {
        if required {
            return Err(CliError::missing_version(param));
        }
        printer.warn(format!("No {} version found, skipping", label));
    }
    Ok(version)
}

fn image_target(printer: &Printer, args: &BumpArgs) -> Result<Option<ImageTarget>> {
    let Some(raw) = args.image.as_deref() else {
        return Ok(None);
    };
    let images = ImageSet::parse(raw)?;

    let version = resolve_version(
        args.image_version.as_deref(),
        args.image_version_file.as_deref(),
    )?
    .map(|v| v.trim().to_string())
    .filter(|v| !v.is_empty());

    match version {
        Some(version) => Ok(Some(ImageTarget { images, version })),
        None if args.error_no_image_version => Err(CliError::missing_version("image-version")),
        None => {
            printer.warn("Images provided, but no image version found, skipping");
            Ok(None)
        }
    }
}

fn working_dir(path: &Path) -> Result<PathBuf> {
    if !path.is_dir() {
        return Err(CliError::usage_with_help(
            format!("working directory {} does not exist", path.display()),
            "pass an existing chart directory with --working-dir",
        ));
    }
    path.canonicalize().map_err(|e| CliError::Io {
        message: format!("{}: {}", path.display(), e),
    })
}

fn bump_chart(
    processor: &DocumentProcessor,
    printer: &Printer,
    working_dir: &Path,
    chart_file: &Path,
    patch: ChartPatch,
) -> Result<ChartReport> {
    let path = in_working_dir(working_dir, chart_file);
    printer.step(format!("Loading {}", chart_file.display()));
    let mut doc = processor.load(&path)?;

    let changes = patch.apply(&mut doc)?;
    describe_field(printer, "chart version", patch.version.as_deref(), changes.version);
    describe_field(printer, "app version", patch.app_version.as_deref(), changes.app_version);

    let saved = changes.changed();
    if saved {
        processor.save(&path, &doc)?;
        printer.done(format!("Saved {}", chart_file.display()));
    }

    Ok(ChartReport {
        file: chart_file.display().to_string(),
        version: patch.version,
        app_version: patch.app_version,
        changes,
        saved,
    })
}

fn describe_field(printer: &Printer, label: &str, desired: Option<&str>, change: FieldChange) {
    let desired = desired.unwrap_or_default();
    match change {
        FieldChange::Updated => printer.done(format!("Updated {} to {}", label, desired)),
        FieldChange::Unchanged => printer.skip(format!("No changes to {} ({})", label, desired)),
        FieldChange::Skipped => {}
    }
}

fn bump_images(
    processor: &DocumentProcessor,
    printer: &Printer,
    working_dir: &Path,
    values_file: &Path,
    target: ImageTarget,
) -> Result<ImageReport> {
    let path = in_working_dir(working_dir, values_file);
    printer.step(format!("Loading {}", values_file.display()));
    let mut doc = processor.load(&path)?;

    let images: Vec<String> = target.images.iter().map(str::to_string).collect();
    printer.step(format!(
        "Searching for image tags [{}] in {}",
        images.join(", "),
        values_file.display()
    ));

    let tally = doc
        .root_mut()
        .map_or(Tally::default(), |root| walk(root, &target.images, &target.version));

    let saved = tally.updated > 0;
    if saved {
        processor.save(&path, &doc)?;
        printer.done(format!(
            "{} image tag(s) found and {} updated to {}",
            tally.found, tally.updated, target.version
        ));
        printer.done(format!("Saved {}", values_file.display()));
    } else if tally.found > 0 {
        printer.skip(format!(
            "{} image tag(s) found, all already at {}",
            tally.found, target.version
        ));
    } else {
        printer.warn("No image tags found");
    }

    Ok(ImageReport {
        file: values_file.display().to_string(),
        images,
        version: target.version,
        found: tally.found,
        updated: tally.updated,
        saved,
    })
}

/// Turn "nothing found" / "nothing changed" into errors where requested
fn enforce_policy(args: &BumpArgs, report: &BumpReport) -> Result<()> {
    if let Some(images) = &report.images {
        if images.found == 0 && args.error_no_tags {
            return Err(CliError::NoMatchFound {
                file: images.file.clone(),
            });
        }
        if images.found > 0 && images.updated == 0 && args.error_no_change {
            return Err(CliError::NoChangeNeeded {
                found: images.found,
                version: images.version.clone(),
            });
        }
    }
    if args.error_no_release && !report.release {
        return Err(CliError::NoRelease);
    }
    Ok(())
}
