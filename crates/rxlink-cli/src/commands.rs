use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rxlink_match::{
    FuzzyMatcher, LinkError, LinkOptions, LinkingOrchestrator, MatcherConfig,
    NameVariationGenerator, Variations,
};
use rxlink_model::{LinkingReport, MatchResult, ReferenceMedicineStore};
use rxlink_store::{LoadedCatalog, SqliteStore, load_catalog_csv, open_catalog};
use tracing::{info, info_span};

use rxlink_cli::batch::{ReportFile, read_batch, write_report};
use rxlink_cli::config::{Overrides, load_matcher_config, resolve_catalog};
use rxlink_cli::logging::redact_value;

use crate::cli::{ImportArgs, LinkArgs, MatchArgs, SearchArgs, VariationsArgs};

/// Catalog and config locations shared by every command.
pub struct Globals {
    pub catalog: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Outcome of `rxlink link`.
pub enum LinkRun {
    Linked(LinkingReport),
    Aborted(LinkError),
}

type Matcher = FuzzyMatcher<Box<dyn ReferenceMedicineStore>>;

pub fn run_search(globals: &Globals, args: &SearchArgs) -> Result<MatchResult> {
    let (matcher, config, _) = build_matcher(globals, &args.matching)?;
    let mut options = config.search_options();
    options.include_salt = args.salt.clone();
    info!(name = redact_value(&args.name), "searching catalog");
    let result = matcher
        .search(&args.name, &options)
        .context("search catalog")?;
    Ok(result)
}

pub fn run_link(globals: &Globals, args: &LinkArgs) -> Result<LinkRun> {
    let medicines = read_batch(&args.input)?;
    let (matcher, config, catalog) = build_matcher(globals, &args.matching)?;
    let span = info_span!("link", input = %args.input.display(), medicines = medicines.len());
    let _guard = span.enter();

    let options = LinkOptions {
        search: config.search_options(),
        require_link: args.require_link,
        auto_link: !args.no_auto_link,
        parallel: args.parallel,
    };
    let progress = progress_bar(medicines.len(), args.no_progress);
    let start = Instant::now();
    let outcome = LinkingOrchestrator::new(matcher).process_linking_with(
        &medicines,
        &options,
        |medicine| {
            progress.set_message(redact_value(&medicine.input.name).to_string());
            progress.inc(1);
        },
    );
    progress.finish_and_clear();

    let report = match outcome {
        Ok(report) => report,
        Err(error) => return Ok(LinkRun::Aborted(error)),
    };
    info!(
        duration_ms = start.elapsed().as_millis(),
        linked = report.statistics.linked(),
        "batch linked"
    );
    if let Some(output) = &args.output {
        write_report(output, &ReportFile::new(&report, &args.input, &catalog))?;
        info!(output = %output.display(), "report written");
    }
    Ok(LinkRun::Linked(report))
}

pub fn run_variations(globals: &Globals, args: &VariationsArgs) -> Result<Variations> {
    let ocr = match args.ocr {
        Some(ocr) => ocr,
        None => load_matcher_config(globals.config.as_deref(), &Overrides::default())?.ocr_confusion,
    };
    Ok(NameVariationGenerator::with_ocr_confusion(ocr).generate(&args.name))
}

pub fn run_import(args: &ImportArgs) -> Result<usize> {
    let catalog = load_catalog_csv(&args.csv)
        .with_context(|| format!("load catalog {}", args.csv.display()))?;
    let store = SqliteStore::open(&args.db)
        .with_context(|| format!("open database {}", args.db.display()))?;
    let count = store.import(&catalog).context("import catalog")?;
    Ok(count)
}

/// What `rxlink info` found at the catalog path.
pub enum CatalogInfo {
    Csv(LoadedCatalog),
    Sqlite {
        path: PathBuf,
        store: SqliteStore,
    },
}

pub fn run_info(globals: &Globals) -> Result<CatalogInfo> {
    let path = resolve_catalog(globals.catalog.as_deref())?;
    if is_csv(&path) {
        let loaded =
            load_catalog_csv(&path).with_context(|| format!("load catalog {}", path.display()))?;
        return Ok(CatalogInfo::Csv(loaded));
    }
    let store = SqliteStore::open_existing(&path)
        .with_context(|| format!("open catalog {}", path.display()))?;
    Ok(CatalogInfo::Sqlite { path, store })
}

fn build_matcher(globals: &Globals, args: &MatchArgs) -> Result<(Matcher, MatcherConfig, PathBuf)> {
    let overrides = Overrides {
        min_similarity: args.min_similarity,
        max_results: args.max_results,
        lookup_timeout_ms: args.timeout_ms,
        no_exact: args.no_exact,
    };
    let config = load_matcher_config(globals.config.as_deref(), &overrides)?;
    let catalog = resolve_catalog(globals.catalog.as_deref())?;
    let store =
        open_catalog(&catalog).with_context(|| format!("open catalog {}", catalog.display()))?;
    let matcher = FuzzyMatcher::new(store)
        .with_generator(NameVariationGenerator::with_ocr_confusion(config.ocr_confusion))
        .with_weights(config.weights());
    Ok((matcher, config, catalog))
}

fn progress_bar(len: usize, hidden: bool) -> ProgressBar {
    if hidden || !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("  [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}
