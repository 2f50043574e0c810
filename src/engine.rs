//! Analysis orchestration.
//!
//! [`Analyzer`] runs the parsers and analysis passes in dependency order and
//! assembles an [`AnalysisReport`]. Only a bad file header, an unreadable
//! file or an invalid filter pattern make a run fail; every other fault is
//! contained and shows up as an anomaly or an absent field.

use crate::analysis::{
    classify_imports, detect_anomalies, find_entry_candidates, hotspots, import_stats,
    FilterMatches, Hotspot, ImportStats, NameFilter,
};
use crate::config::AnalyzeOptions;
use crate::demangle::{
    is_mangled, AutoDemangler, DemangleOutcome, DemangleStatus, DemangleSummary, Demangler,
};
use crate::error::Result;
use crate::formats::elf::relocations::RelocationTable;
use crate::formats::elf::symbols::SymbolTable;
use crate::formats::elf::ElfParser;
use crate::io::{load_image, RawImage};
use crate::render::{MarkdownRenderer, ReportRenderer};
use crate::report::{
    AnalysisReport, HashSummaries, HeaderSummary, RelocationSummary, RenderedReport,
    SectionSummary, SegmentSummary,
};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, info_span, warn};

type BoxedDemangler = Box<dyn Demangler + Send + Sync>;
type BoxedRenderer = Box<dyn ReportRenderer + Send + Sync>;

/// Runs one analysis per call; holds no per-file state.
pub struct Analyzer {
    options: AnalyzeOptions,
    demangler: BoxedDemangler,
    renderer: Option<BoxedRenderer>,
}

impl Analyzer {
    /// Analyzer with the auto demangler and the Markdown renderer.
    pub fn new(options: AnalyzeOptions) -> Self {
        let demangler = AutoDemangler::new(options.demangle_timeout_ms);
        Self {
            options,
            demangler: Box::new(demangler),
            renderer: Some(Box::new(MarkdownRenderer)),
        }
    }

    pub fn with_demangler<D>(mut self, demangler: D) -> Self
    where
        D: Demangler + Send + Sync + 'static,
    {
        self.demangler = Box::new(demangler);
        self
    }

    pub fn with_renderer<R>(mut self, renderer: R) -> Self
    where
        R: ReportRenderer + Send + Sync + 'static,
    {
        self.renderer = Some(Box::new(renderer));
        self
    }

    /// Skip rendering; `report.render` stays `None`.
    pub fn without_renderer(mut self) -> Self {
        self.renderer = None;
        self
    }

    pub fn options(&self) -> &AnalyzeOptions {
        &self.options
    }

    /// Load `path` within the configured I/O limits and analyze it.
    pub fn analyze_path<P: AsRef<Path>>(&self, path: P) -> Result<AnalysisReport> {
        let filter = self.compile_filter()?;
        let image = load_image(path, &self.options.io)?;
        self.analyze_image(&image, filter.as_ref())
    }

    /// Analyze an in-memory image.
    pub fn analyze_bytes(&self, data: &[u8]) -> Result<AnalysisReport> {
        let filter = self.compile_filter()?;
        self.analyze_image(&RawImage::from_bytes(data.to_vec()), filter.as_ref())
    }

    fn compile_filter(&self) -> Result<Option<NameFilter>> {
        match self.options.active_filter() {
            Some(spec) => NameFilter::from_spec(spec),
            None => Ok(None),
        }
    }

    fn analyze_image(&self, image: &RawImage, filter: Option<&NameFilter>) -> Result<AnalysisReport> {
        let span = info_span!(
            "elf_analyze",
            path = image.path().map(|p| p.display().to_string()).unwrap_or_default(),
            size = image.size()
        );
        let _guard = span.enter();

        let opts = &self.options;
        let elf = ElfParser::parse(image.bytes())?;
        let header = elf.header();

        let sections: Vec<SectionSummary> = elf
            .sections()
            .sections()
            .iter()
            .take(opts.max_sections)
            .map(SectionSummary::from)
            .collect();
        let segments: Vec<SegmentSummary> = elf
            .segments()
            .segments()
            .iter()
            .map(SegmentSummary::from)
            .collect();

        let dynamic = elf.dynamic();
        let symbols = elf.dynamic_symbols();
        let empty_symbols = SymbolTable::default();
        let symtab = symbols.as_ref().unwrap_or(&empty_symbols);

        let mut imports = import_stats(symtab.imports(), opts.top_n);

        let plt = elf.plt_relocations().unwrap_or_default();
        let dyn_relocs = elf.dyn_relocations().unwrap_or_default();
        let mut relocations = RelocationSummary {
            plt_count: plt.count(),
            dyn_count: dyn_relocs.count(),
            top_plt_symbols: hotspots(plt.entries(), symtab, opts.top_n),
            top_dyn_symbols: hotspots(dyn_relocs.entries(), symtab, opts.top_n),
        };

        let hashes = HashSummaries {
            gnu_hash: elf.gnu_hash(),
            sysv_hash: elf.sysv_hash(),
        };

        let anomalies = detect_anomalies(
            header,
            elf.sections(),
            dynamic.as_ref(),
            image.size(),
            &opts.thresholds,
        );
        let suspicious_imports = classify_imports(symtab.imports().map(|s| s.name.as_str()));
        let entry_candidates = find_entry_candidates(symtab.exports(), elf.init_array_count());
        let security = elf.security_features(dynamic.as_ref(), symbols.as_ref());

        let demangle = if opts.demangle {
            Some(self.demangle_samples(&mut imports, &mut relocations))
        } else {
            None
        };

        let matches = filter.map(|f| match_names(f, symtab, &plt, &dyn_relocs));

        let mut summary = HeaderSummary::new(header);
        summary.imports = imports.count;
        summary.needed_libs = dynamic.as_ref().map_or(0, |d| d.needed.len());
        summary.plt_relocs = relocations.plt_count;
        summary.dyn_relocs = relocations.dyn_count;

        let mut report = AnalysisReport {
            header: summary,
            sections,
            segments,
            interpreter: elf.interpreter(),
            security,
            dynamic: dynamic.unwrap_or_default(),
            imports,
            relocations,
            hashes,
            anomalies,
            suspicious_imports,
            entry_candidates,
            matches,
            demangle,
            render: None,
        };

        if let Some(renderer) = &self.renderer {
            report.render = match renderer.render(&report) {
                Ok(markdown) => Some(RenderedReport { markdown }),
                Err(e) => {
                    warn!(error = %e, "Report rendering failed");
                    None
                }
            };
        }

        info!(
            sections = report.sections.len(),
            imports = report.imports.count,
            plt_relocs = report.relocations.plt_count,
            dyn_relocs = report.relocations.dyn_count,
            anomalies = report.anomalies.len(),
            "ELF analysis complete"
        );

        Ok(report)
    }

    /// Demangle the displayed samples and write the results back in place.
    fn demangle_samples(
        &self,
        imports: &mut ImportStats,
        relocations: &mut RelocationSummary,
    ) -> DemangleSummary {
        let request = demangle_request(imports, relocations, self.options.demangle_limit);
        let requested = request.len();
        let outcome = if request.is_empty() {
            DemangleOutcome::empty(DemangleStatus::Complete)
        } else {
            self.demangler.demangle(&request)
        };
        debug!(
            requested,
            resolved = outcome.names.len(),
            status = ?outcome.status,
            "Demangling finished"
        );

        imports.sample_demangled = display_all(&outcome, &imports.sample);
        imports.func_sample_demangled = display_all(&outcome, &imports.func_sample);
        for h in relocations
            .top_plt_symbols
            .iter_mut()
            .chain(relocations.top_dyn_symbols.iter_mut())
        {
            apply_to_hotspot(&outcome, h);
        }

        DemangleSummary {
            status: outcome.status,
            requested,
            resolved: outcome.names.len(),
        }
    }
}

/// Unique mangled names from the samples and hotspots, first-seen order,
/// at most `limit` of them.
fn demangle_request(
    imports: &ImportStats,
    relocations: &RelocationSummary,
    limit: usize,
) -> Vec<String> {
    let hotspot_names = relocations
        .top_plt_symbols
        .iter()
        .chain(relocations.top_dyn_symbols.iter())
        .map(|h| &h.name);

    let mut seen = HashSet::new();
    imports
        .sample
        .iter()
        .chain(imports.func_sample.iter())
        .chain(hotspot_names)
        .filter(|n| is_mangled(n))
        .filter(|n| seen.insert(n.as_str()))
        .take(limit)
        .cloned()
        .collect()
}

fn display_all(outcome: &DemangleOutcome, names: &[String]) -> Vec<String> {
    names.iter().map(|n| outcome.display(n).to_string()).collect()
}

fn apply_to_hotspot(outcome: &DemangleOutcome, hotspot: &mut Hotspot) {
    hotspot.demangled_name = outcome.display(&hotspot.name).to_string();
}

fn match_names(
    filter: &NameFilter,
    symbols: &SymbolTable,
    plt: &RelocationTable,
    dyn_relocs: &RelocationTable,
) -> FilterMatches {
    let resolve = |table: &RelocationTable| {
        filter.select(table.entries().iter().map(|r| symbols.name_of(r.symbol)))
    };
    FilterMatches {
        imports: filter.select(symbols.imports().map(|s| s.name.as_str())),
        plt: resolve(plt),
        dyn_: resolve(dyn_relocs),
    }
}

/// Analyze a file on disk with `options`.
pub fn analyze_path<P: AsRef<Path>>(path: P, options: AnalyzeOptions) -> Result<AnalysisReport> {
    Analyzer::new(options).analyze_path(path)
}
